//! Recovers the real client address of connections relayed through a proxy that speaks the
//! PROXY protocol. Supports both text (version 1) and binary (version 2) headers.
//!
//! A header is only accepted after it has been parsed, re-encoded and compared byte for byte
//! with the input it was parsed from. Anything else, including input that merely starts with a
//! signature, is reported as no match so the caller can treat the bytes as ordinary data.
//!
//! ## Examples
//! ```rust
//! use proxy_origin::{parse_header, Version};
//!
//! let input = b"PROXY TCP4 192.168.0.1 192.168.0.11 56324 443\r\nhello";
//! let (header, length) = parse_header(input).unwrap();
//!
//! assert_eq!(header.version(), Version::One);
//! assert_eq!(header.source().to_string(), "192.168.0.1:56324");
//! assert_eq!(&input[length..], b"hello");
//!
//! assert_eq!(parse_header(b"GET / HTTP/1.1\r\n"), None);
//! ```

mod association;
mod config;
mod error;
mod model;
mod session;

pub mod v1;
pub mod v2;

pub use association::AssociationTable;
pub use config::{AssociationConfig, Config, ConfigError};
pub use error::{EncodeError, ParseError};
pub use model::{AddressFamily, Command, Header, Version, ADDRESS_FAMILIES};
pub use session::{OriginTracker, Session, Verdict};

use tracing::trace;

/// Signatures of each version, in the order they are tried.
pub const SIGNATURES: [(Version, &[u8]); 2] = [
    (Version::Two, v2::PROTOCOL_PREFIX),
    (Version::One, v1::PROTOCOL_PREFIX.as_bytes()),
];

/// Tells a caller reading a stream whether parsing again once more bytes arrive could succeed.
/// Servers may wait for the rest of a split header or drop the connection instead.
pub trait PartialResult {
    /// True when the outcome is final: either a header, or an error that no additional
    /// input can turn into a header.
    fn is_complete(&self) -> bool {
        !self.is_incomplete()
    }

    /// True when the input ended before a decision could be made.
    /// The same input always yields the same outcome; only a longer input may differ.
    fn is_incomplete(&self) -> bool;
}

impl<T, E: PartialResult> PartialResult for Result<T, E> {
    fn is_incomplete(&self) -> bool {
        match self {
            Ok(_) => false,
            Err(error) => error.is_incomplete(),
        }
    }
}

impl PartialResult for ParseError {
    fn is_incomplete(&self) -> bool {
        matches!(self, ParseError::Incomplete)
    }
}

/// The error for input that does not start with `signature`.
/// Input that is a strict prefix of the signature may still become a header.
pub(crate) fn signature_error(input: &[u8], signature: &[u8]) -> ParseError {
    if signature.starts_with(input) {
        ParseError::Incomplete
    } else {
        ParseError::NoSignature
    }
}

/// Determines the version of the header at the start of the input from its signature alone.
///
/// ## Examples
/// ```rust
/// use proxy_origin::{detect, ParseError, Version};
///
/// assert_eq!(detect(b"PROXY TCP4"), Ok(Version::One));
/// assert_eq!(detect(b"\r\n\r\n\0\r\nQUIT\n\x21"), Ok(Version::Two));
/// assert_eq!(detect(b"\r\n\r\n"), Err(ParseError::Incomplete));
/// assert_eq!(detect(b"SSH-2.0"), Err(ParseError::NoSignature));
/// ```
pub fn detect(input: &[u8]) -> Result<Version, ParseError> {
    if let Some((version, _)) = SIGNATURES
        .iter()
        .find(|(_, signature)| input.starts_with(signature))
    {
        return Ok(*version);
    }

    if SIGNATURES
        .iter()
        .any(|(_, signature)| signature.starts_with(input))
    {
        Err(ParseError::Incomplete)
    } else {
        Err(ParseError::NoSignature)
    }
}

/// Parses a header of either version from the start of the input.
///
/// On success, returns the header and the number of bytes to strip from the input.
/// Use [`parse_header`] when the reason for a rejection does not matter.
pub fn try_parse_header(input: &[u8]) -> Result<(Header, usize), ParseError> {
    let result = match detect(input)? {
        Version::One => v1::parse(input),
        Version::Two => v2::parse(input),
    };

    if let Err(error) = &result {
        trace!(%error, "rejected signature-matched input");
    }

    result
}

/// Parses a header of either version from the start of the input,
/// returning `None` when the input does not begin with a valid header.
pub fn parse_header(input: &[u8]) -> Option<(Header, usize)> {
    try_parse_header(input).ok()
}
