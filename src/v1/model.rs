use crate::model::AddressFamily;

pub const PROTOCOL_SUFFIX: &str = "\r\n";
pub const PROTOCOL_PREFIX: &str = "PROXY";
pub const TCP4: &str = "TCP4";
pub const UDP4: &str = "UDP4";
pub const TCP6: &str = "TCP6";
pub const UDP6: &str = "UDP6";

/// The sperator of the header parts.
pub const SEPARATOR: char = ' ';

/// The maximum length of a header in bytes, including the trailer.
pub const MAX_LENGTH: usize = 107;

/// The number of separated parts before the trailer.
pub const PARTS: usize = 6;

/// Textual names of the address families a text header can carry.
const FAMILIES: [(&str, AddressFamily); 4] = [
    (TCP4, AddressFamily::Tcp4),
    (UDP4, AddressFamily::Udp4),
    (TCP6, AddressFamily::Tcp6),
    (UDP6, AddressFamily::Udp6),
];

/// Looks up the address family named by a header token. Matching is case-sensitive.
pub fn family(token: &str) -> Option<AddressFamily> {
    FAMILIES
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, family)| *family)
}

/// The header token of an address family, if it has one.
pub fn token(family: AddressFamily) -> Option<&'static str> {
    FAMILIES
        .iter()
        .find(|(_, known)| *known == family)
        .map(|(name, _)| *name)
}
