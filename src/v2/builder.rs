use crate::error::EncodeError;
use crate::model::{AddressFamily, Header};
use crate::v2::model::{address_length, MINIMUM_LENGTH, PROTOCOL_PREFIX, VERSION};
use std::net::IpAddr;

/// Writes a binary header field by field.
pub struct HeaderBuilder {
    header: Vec<u8>,
    address_family: AddressFamily,
}

impl HeaderBuilder {
    /// Writes the fixed 16 byte prefix.
    /// The length field is taken from the address family's entry in the length table.
    pub fn new(version_command: u8, address_family: AddressFamily) -> Result<Self, EncodeError> {
        let length = address_length(address_family)
            .ok_or(EncodeError::MalformedConstant(address_family))?;

        let mut header = Vec::with_capacity(MINIMUM_LENGTH + length);
        header.extend_from_slice(PROTOCOL_PREFIX);
        header.push(version_command);
        header.push(address_family.tag());
        header.extend_from_slice(&(length as u16).to_be_bytes());

        Ok(HeaderBuilder {
            header,
            address_family,
        })
    }

    pub fn write_address(mut self, address: IpAddr) -> Result<Self, EncodeError> {
        if self.address_family.is_unix() {
            return Err(EncodeError::Unsupported(self.address_family));
        }

        match address {
            IpAddr::V4(a) if self.address_family.admits(&address) => {
                self.header.extend_from_slice(&a.octets())
            }
            IpAddr::V6(a) if self.address_family.admits(&address) => {
                self.header.extend_from_slice(&a.octets())
            }
            _ => return Err(EncodeError::AddressMismatch(self.address_family)),
        }

        Ok(self)
    }

    pub fn write_port(mut self, port: u16) -> Self {
        self.header.extend_from_slice(&port.to_be_bytes());
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.header
    }
}

/// Encodes a header in the binary format.
pub(crate) fn encode(header: &Header) -> Result<Vec<u8>, EncodeError> {
    let version_command = VERSION << 4 | header.command() as u8;

    Ok(HeaderBuilder::new(version_command, header.address_family())?
        .write_address(header.source_address())?
        .write_address(header.target_address())?
        .write_port(header.source_port())
        .write_port(header.target_port())
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Command, Version};

    #[test]
    fn build_ipv4() {
        let mut expected = Vec::from(PROTOCOL_PREFIX);
        expected.extend([
            0x21, 0x12, 0, 12, 127, 0, 0, 1, 192, 168, 1, 1, 0, 80, 1, 187,
        ]);

        let header = Header::new(
            Version::Two,
            AddressFamily::Udp4,
            "127.0.0.1:80".parse().unwrap(),
            "192.168.1.1:443".parse().unwrap(),
        );

        assert_eq!(Ok(expected), encode(&header));
    }

    #[test]
    fn build_ipv6_local() {
        let source_address = [
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFF, 0xF2,
        ];
        let destination_address = [
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFF, 0xF1,
        ];
        let mut expected = Vec::from(PROTOCOL_PREFIX);
        expected.extend([0x20, 0x21, 0, 36]);
        expected.extend(source_address);
        expected.extend(destination_address);
        expected.extend([0, 80, 1, 187]);

        let header = Header::new(
            Version::Two,
            AddressFamily::Tcp6,
            (IpAddr::from(source_address), 80).into(),
            (IpAddr::from(destination_address), 443).into(),
        )
        .with_command(Command::Local);

        assert_eq!(Ok(expected), encode(&header));
    }

    #[test]
    fn build_unspecified() {
        let header = Header::new(
            Version::Two,
            AddressFamily::Unspecified,
            "127.0.0.1:80".parse().unwrap(),
            "127.0.0.1:443".parse().unwrap(),
        );

        assert_eq!(
            Err(EncodeError::MalformedConstant(AddressFamily::Unspecified)),
            encode(&header)
        );
    }

    #[test]
    fn build_unix() {
        let header = Header::new(
            Version::Two,
            AddressFamily::UnixStream,
            "127.0.0.1:80".parse().unwrap(),
            "127.0.0.1:443".parse().unwrap(),
        );

        assert_eq!(
            Err(EncodeError::Unsupported(AddressFamily::UnixStream)),
            encode(&header)
        );
    }

    #[test]
    fn build_mismatched_address() {
        let header = Header::new(
            Version::Two,
            AddressFamily::Tcp4,
            "127.0.0.1:80".parse().unwrap(),
            "[::1]:443".parse().unwrap(),
        );

        assert_eq!(
            Err(EncodeError::AddressMismatch(AddressFamily::Tcp4)),
            encode(&header)
        );
    }
}
