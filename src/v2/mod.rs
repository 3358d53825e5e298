//! Version 2 of the HAProxy protocol (binary version).
//!
//! See <https://haproxy.org/download/1.8/doc/proxy-protocol.txt>

mod builder;
mod model;

pub(crate) use builder::encode;
pub use builder::HeaderBuilder;
pub use model::{address_length, MINIMUM_LENGTH, PROTOCOL_PREFIX};
use model::{address_width, VERSION};

use crate::error::ParseError;
use crate::model::{AddressFamily, Command, Header, Version};
use nom::bytes::complete::{tag, take};
use nom::number::complete::{be_u16, be_u8};
use nom::sequence::{preceded, tuple};
use nom::IResult;
use std::convert::TryInto;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Parses the signature, the version and command byte, the address family byte and the length.
fn parse_prefix(input: &[u8]) -> IResult<&[u8], (u8, u8, u16)> {
    preceded(tag(PROTOCOL_PREFIX), tuple((be_u8, be_u8, be_u16)))(input)
}

/// Parses the source address, target address, source port and target port of an address block.
fn parse_addresses(input: &[u8], width: usize) -> IResult<&[u8], (&[u8], &[u8], u16, u16)> {
    tuple((take(width), take(width), be_u16, be_u16))(input)
}

/// Converts the raw bytes of an address into an IP address of the family's version.
fn decode_address(address_family: AddressFamily, bytes: &[u8]) -> Result<IpAddr, ParseError> {
    match address_family {
        AddressFamily::Tcp4 | AddressFamily::Udp4 => {
            let octets: [u8; 4] = bytes.try_into().map_err(|_| ParseError::Incomplete)?;
            Ok(Ipv4Addr::from(octets).into())
        }
        AddressFamily::Tcp6 | AddressFamily::Udp6 => {
            let octets: [u8; 16] = bytes.try_into().map_err(|_| ParseError::Incomplete)?;
            Ok(Ipv6Addr::from(octets).into())
        }
        AddressFamily::UnixStream | AddressFamily::UnixDatagram => {
            Err(ParseError::Unsupported(address_family))
        }
        AddressFamily::Unspecified => Err(ParseError::AddressFamily(address_family.tag())),
    }
}

/// Parses a binary PROXY protocol header from the start of the input.
///
/// The length field must match the address block size of the declared family;
/// type-length-value extensions are not accepted.
///
/// ## Examples
/// ```rust
/// use proxy_origin::{v2, AddressFamily, Command};
///
/// let mut input = b"\r\n\r\n\0\r\nQUIT\n".to_vec();
/// input.extend([0x21, 0x11, 0, 12, 10, 0, 0, 1, 10, 0, 0, 2, 0xDC, 0x04, 0x01, 0xBB]);
/// input.extend(b"payload");
///
/// let (header, length) = v2::parse(&input).unwrap();
///
/// assert_eq!(header.command(), Command::Proxy);
/// assert_eq!(header.address_family(), AddressFamily::Tcp4);
/// assert_eq!(header.source().to_string(), "10.0.0.1:56324");
/// assert_eq!(header.target().to_string(), "10.0.0.2:443");
/// assert_eq!(&input[length..], b"payload");
/// ```
pub fn parse(input: &[u8]) -> Result<(Header, usize), ParseError> {
    if !input.starts_with(PROTOCOL_PREFIX) {
        return Err(crate::signature_error(input, PROTOCOL_PREFIX));
    }

    let (rest, (version_command, family_tag, declared_length)) =
        parse_prefix(input).map_err(|_| ParseError::Incomplete)?;

    let version = version_command >> 4;
    if version != VERSION {
        return Err(ParseError::Version(version));
    }

    let command =
        Command::new(version_command & 0x0F).ok_or(ParseError::Command(version_command & 0x0F))?;
    let address_family =
        AddressFamily::from_tag(family_tag).ok_or(ParseError::AddressFamily(family_tag))?;

    if address_family.is_unix() {
        return Err(ParseError::Unsupported(address_family));
    }

    let length = address_length(address_family).ok_or(ParseError::AddressFamily(family_tag))?;
    if usize::from(declared_length) != length {
        return Err(ParseError::RoundTrip);
    }

    let (_, (source_address, target_address, source_port, target_port)) =
        parse_addresses(rest, address_width(length)).map_err(|_| ParseError::Incomplete)?;

    let source = SocketAddr::new(decode_address(address_family, source_address)?, source_port);
    let target = SocketAddr::new(decode_address(address_family, target_address)?, target_port);

    let header = Header::new(Version::Two, address_family, source, target).with_command(command);
    let length = header.verify(input)?;

    Ok((header, length))
}
