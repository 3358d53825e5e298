use crate::model::AddressFamily;

pub const PROTOCOL_PREFIX: &[u8] = b"\r\n\r\n\0\r\nQUIT\n";
pub const VERSION_COMMAND: usize = PROTOCOL_PREFIX.len();
pub const ADDRESS_FAMILY_PROTOCOL: usize = VERSION_COMMAND + 1;
pub const LENGTH: usize = ADDRESS_FAMILY_PROTOCOL + 1;
pub const MINIMUM_LENGTH: usize = LENGTH + 2;

/// The only version a binary header may declare, as found in the high nibble.
pub const VERSION: u8 = 0x2;

const IPV4_ADDRESSES_BYTES: usize = 12;
const IPV6_ADDRESSES_BYTES: usize = 36;
const UNIX_ADDRESSES_BYTES: usize = 216;

/// Total length of the address block (both addresses and both ports) of each family.
/// Families absent from the table cannot be parsed or encoded.
const ADDRESS_LENGTHS: [(AddressFamily, usize); 6] = [
    (AddressFamily::Tcp4, IPV4_ADDRESSES_BYTES),
    (AddressFamily::Udp4, IPV4_ADDRESSES_BYTES),
    (AddressFamily::Tcp6, IPV6_ADDRESSES_BYTES),
    (AddressFamily::Udp6, IPV6_ADDRESSES_BYTES),
    (AddressFamily::UnixStream, UNIX_ADDRESSES_BYTES),
    (AddressFamily::UnixDatagram, UNIX_ADDRESSES_BYTES),
];

/// The size of the address block of the given family.
pub fn address_length(address_family: AddressFamily) -> Option<usize> {
    ADDRESS_LENGTHS
        .iter()
        .find(|(family, _)| *family == address_family)
        .map(|(_, length)| *length)
}

/// The size of a single address within an address block of `length` bytes.
pub fn address_width(length: usize) -> usize {
    length / 2 - 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths() {
        assert_eq!(16, MINIMUM_LENGTH);
        assert_eq!(Some(12), address_length(AddressFamily::Udp4));
        assert_eq!(Some(36), address_length(AddressFamily::Tcp6));
        assert_eq!(Some(216), address_length(AddressFamily::UnixDatagram));
        assert_eq!(None, address_length(AddressFamily::Unspecified));
    }

    #[test]
    fn widths() {
        assert_eq!(4, address_width(IPV4_ADDRESSES_BYTES));
        assert_eq!(16, address_width(IPV6_ADDRESSES_BYTES));
    }
}
