//! Errors for parsing and encoding PROXY protocol headers.

use crate::model::AddressFamily;

/// An error occurred while parsing a header.
///
/// Every variant except [`ParseError::Unsupported`] means the input is not a trustworthy header.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Input does not start with a PROXY protocol signature.")]
    NoSignature,
    #[error("Input ends before the header is complete.")]
    Incomplete,
    #[error("Header does not fit within the maximum text header length of 107 bytes.")]
    HeaderTooLong,
    #[error("Header must start with 'PROXY'.")]
    InvalidPrefix,
    #[error("Header is not valid UTF-8.")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("Header has {0} fields, expected 7 including the trailer.")]
    FieldCount(usize),
    #[error("Header has an invalid address family '{0}'.")]
    InvalidAddressFamily(String),
    #[error("Header contains invalid IP address for the source.")]
    InvalidSourceAddress(#[source] std::net::AddrParseError),
    #[error("Header contains invalid IP address for the target.")]
    InvalidTargetAddress(#[source] std::net::AddrParseError),
    #[error("Header contains invalid port for the source.")]
    InvalidSourcePort(#[source] std::num::ParseIntError),
    #[error("Header contains invalid port for the target.")]
    InvalidTargetPort(#[source] std::num::ParseIntError),
    #[error("Expected version {0:X} to be equal to 2.")]
    Version(u8),
    #[error("Invalid command {0:X}. Command must be one of: Local, Proxy.")]
    Command(u8),
    #[error("Invalid address family {0:#04X}; no address length is defined for it.")]
    AddressFamily(u8),
    #[error("Address family '{0}' is not supported.")]
    Unsupported(AddressFamily),
    #[error("Header does not re-encode to the bytes it was parsed from.")]
    RoundTrip,
}

impl ParseError {
    /// A predicate that tests whether the header was recognized but uses an address family
    /// this crate does not implement, as opposed to being malformed.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ParseError::Unsupported(..))
    }

    /// Whether the input merely lacked a signature, i.e. is ordinary application data.
    pub fn is_no_signature(&self) -> bool {
        matches!(self, ParseError::NoSignature)
    }
}

/// An error occurred while encoding a header.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Address family '{0}' is not supported.")]
    Unsupported(AddressFamily),
    /// The header was built with a family that has no wire representation for its version.
    /// This indicates misuse of [`Header::new`](crate::Header::new), never bad input.
    #[error("Address family '{0}' has no encoding for this protocol version.")]
    MalformedConstant(AddressFamily),
    /// The header was built with addresses of the wrong IP version for its family.
    #[error("Addresses do not belong to address family '{0}'.")]
    AddressMismatch(AddressFamily),
}
