//! The header model shared by both versions of the protocol.

use crate::error::{EncodeError, ParseError};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// The version of the proxy protocol header.
#[derive(Debug, Eq, PartialEq, PartialOrd, Ord, Copy, Clone, Hash)]
pub enum Version {
    One = 1,
    Two = 2,
}

impl Version {
    /// Create a new instance of a version.
    /// If the version is not supported, returns `None`.
    pub fn new(version: u8) -> Option<Version> {
        match version {
            1 => Some(Version::One),
            2 => Some(Version::Two),
            _ => None,
        }
    }
}

/// The type of connection received by the server from the proxy.
/// Only meaningful for version 2; version 1 headers are always `Proxy`.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum Command {
    /// Health check or other connection initiated by the proxy itself.
    /// Consumers should ignore the addresses.
    Local = 0,
    /// Relayed connection; the addresses are authoritative.
    Proxy = 1,
}

impl Command {
    /// Create a new instance of a command.
    /// If the command is not supported, returns `None`.
    pub fn new(command: u8) -> Option<Command> {
        match command {
            0 => Some(Command::Local),
            1 => Some(Command::Proxy),
            _ => None,
        }
    }
}

impl Default for Command {
    fn default() -> Self {
        Command::Proxy
    }
}

/// The transport protocol and address family of the relayed connection.
///
/// The discriminant is the binary tag used by version 2 headers.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum AddressFamily {
    Unspecified = 0x00,
    Tcp4 = 0x11,
    Udp4 = 0x12,
    Tcp6 = 0x21,
    Udp6 = 0x22,
    UnixStream = 0x31,
    UnixDatagram = 0x32,
}

/// Every known family, in tag order.
pub const ADDRESS_FAMILIES: [AddressFamily; 7] = [
    AddressFamily::Unspecified,
    AddressFamily::Tcp4,
    AddressFamily::Udp4,
    AddressFamily::Tcp6,
    AddressFamily::Udp6,
    AddressFamily::UnixStream,
    AddressFamily::UnixDatagram,
];

impl AddressFamily {
    /// Looks up a family by its version 2 tag.
    pub fn from_tag(tag: u8) -> Option<AddressFamily> {
        ADDRESS_FAMILIES
            .iter()
            .copied()
            .find(|family| family.tag() == tag)
    }

    /// The version 2 binary tag of this family.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Whether the family carries unix socket paths instead of IP addresses.
    /// Such families are recognized but not supported.
    pub fn is_unix(self) -> bool {
        matches!(self, AddressFamily::UnixStream | AddressFamily::UnixDatagram)
    }

    /// Whether an IP address belongs to this family.
    /// Always false for families that do not carry IP addresses.
    pub fn admits(self, address: &IpAddr) -> bool {
        match (self, address) {
            (AddressFamily::Tcp4 | AddressFamily::Udp4, IpAddr::V4(_)) => true,
            (AddressFamily::Tcp6 | AddressFamily::Udp6, IpAddr::V6(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressFamily::Unspecified => "unspecified",
            AddressFamily::Tcp4 => "TCP over IPv4",
            AddressFamily::Udp4 => "UDP over IPv4",
            AddressFamily::Tcp6 => "TCP over IPv6",
            AddressFamily::Udp6 => "UDP over IPv6",
            AddressFamily::UnixStream => "stream over unix socket",
            AddressFamily::UnixDatagram => "datagram over unix socket",
        };

        f.write_str(name)
    }
}

/// A PROXY protocol header.
///
/// Headers returned by the parser have already been re-encoded and compared byte for byte
/// against the input they were parsed from.
///
/// ## Examples
/// ```rust
/// use proxy_origin::{AddressFamily, Command, Header, Version};
///
/// let header = Header::new(
///     Version::Two,
///     AddressFamily::Tcp4,
///     "10.0.0.1:56324".parse().unwrap(),
///     "10.0.0.2:443".parse().unwrap(),
/// );
///
/// assert_eq!(header.command(), Command::Proxy);
/// assert_eq!(header.source_port(), 56324);
/// assert_eq!(header.target_address().to_string(), "10.0.0.2");
/// ```
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub struct Header {
    version: Version,
    command: Command,
    address_family: AddressFamily,
    source: SocketAddr,
    target: SocketAddr,
}

impl Header {
    /// Create a new header with the `Proxy` command.
    pub fn new(
        version: Version,
        address_family: AddressFamily,
        source: SocketAddr,
        target: SocketAddr,
    ) -> Self {
        Header {
            version,
            command: Command::default(),
            address_family,
            source,
            target,
        }
    }

    /// Replaces the command of this header.
    pub fn with_command(mut self, command: Command) -> Self {
        self.command = command;
        self
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn address_family(&self) -> AddressFamily {
        self.address_family
    }

    /// The address of the client.
    pub fn source_address(&self) -> IpAddr {
        self.source.ip()
    }

    /// The port of the client.
    pub fn source_port(&self) -> u16 {
        self.source.port()
    }

    /// The address the client connected to.
    pub fn target_address(&self) -> IpAddr {
        self.target.ip()
    }

    /// The port the client connected to.
    pub fn target_port(&self) -> u16 {
        self.target.port()
    }

    /// The address and port of the client.
    pub fn source(&self) -> SocketAddr {
        self.source
    }

    /// The address and port the client connected to.
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Encodes this header in the wire format of its version.
    ///
    /// Unix socket families always fail with [`EncodeError::Unsupported`].
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        if self.address_family.is_unix() {
            return Err(EncodeError::Unsupported(self.address_family));
        }

        match self.version {
            Version::One => crate::v1::encode(self),
            Version::Two => crate::v2::encode(self),
        }
    }

    /// Re-encodes this header and compares it to the start of `input`.
    /// Returns the number of bytes the header occupies when they match exactly.
    pub(crate) fn verify(&self, input: &[u8]) -> Result<usize, ParseError> {
        let encoded = match self.encode() {
            Ok(encoded) => encoded,
            Err(EncodeError::Unsupported(address_family)) => {
                return Err(ParseError::Unsupported(address_family))
            }
            Err(error) => {
                debug_assert!(false, "parsed header failed to encode: {}", error);
                return Err(ParseError::RoundTrip);
            }
        };

        match input.get(..encoded.len()) {
            Some(prefix) if prefix == encoded.as_slice() => Ok(encoded.len()),
            _ => Err(ParseError::RoundTrip),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_accessors() {
        let header = Header::new(
            Version::One,
            AddressFamily::Tcp6,
            "[::1]:80".parse().unwrap(),
            "[ffff::1]:443".parse().unwrap(),
        );

        assert_eq!(Version::One, header.version());
        assert_eq!(Command::Proxy, header.command());
        assert_eq!(AddressFamily::Tcp6, header.address_family());
        assert_eq!("::1".parse::<IpAddr>().unwrap(), header.source_address());
        assert_eq!(80, header.source_port());
        assert_eq!("ffff::1".parse::<IpAddr>().unwrap(), header.target_address());
        assert_eq!(443, header.target_port());
    }

    #[test]
    fn header_with_command() {
        let header = Header::new(
            Version::Two,
            AddressFamily::Udp4,
            "127.0.0.1:1".parse().unwrap(),
            "127.0.0.2:2".parse().unwrap(),
        )
        .with_command(Command::Local);

        assert_eq!(Command::Local, header.command());
    }

    #[test]
    fn version() {
        assert_eq!(None, Version::new(0));
        assert_eq!(Some(Version::One), Version::new(1));
        assert_eq!(Some(Version::Two), Version::new(2));
    }

    #[test]
    fn command() {
        assert_eq!(Some(Command::Local), Command::new(0));
        assert_eq!(Some(Command::Proxy), Command::new(1));
        assert_eq!(None, Command::new(3));
    }

    #[test]
    fn address_family_tags() {
        assert_eq!(Some(AddressFamily::Unspecified), AddressFamily::from_tag(0x00));
        assert_eq!(Some(AddressFamily::Tcp4), AddressFamily::from_tag(0x11));
        assert_eq!(Some(AddressFamily::Udp4), AddressFamily::from_tag(0x12));
        assert_eq!(Some(AddressFamily::Tcp6), AddressFamily::from_tag(0x21));
        assert_eq!(Some(AddressFamily::Udp6), AddressFamily::from_tag(0x22));
        assert_eq!(Some(AddressFamily::UnixStream), AddressFamily::from_tag(0x31));
        assert_eq!(Some(AddressFamily::UnixDatagram), AddressFamily::from_tag(0x32));
        assert_eq!(None, AddressFamily::from_tag(0x13));
        assert_eq!(None, AddressFamily::from_tag(0xFF));
    }

    #[test]
    fn address_family_admits() {
        let v4: IpAddr = "10.0.0.1".parse().unwrap();
        let v6: IpAddr = "::1".parse().unwrap();

        assert!(AddressFamily::Tcp4.admits(&v4));
        assert!(!AddressFamily::Udp4.admits(&v6));
        assert!(AddressFamily::Udp6.admits(&v6));
        assert!(!AddressFamily::Tcp6.admits(&v4));
        assert!(!AddressFamily::UnixStream.admits(&v4));
        assert!(!AddressFamily::Unspecified.admits(&v6));
    }

    #[test]
    fn encode_unix_is_unsupported() {
        let header = Header::new(
            Version::Two,
            AddressFamily::UnixStream,
            "127.0.0.1:1".parse().unwrap(),
            "127.0.0.1:2".parse().unwrap(),
        );

        assert_eq!(
            Err(EncodeError::Unsupported(AddressFamily::UnixStream)),
            header.encode()
        );
    }
}
