//! Version 1 of the HAProxy protocol (text version).
//!
//! See <https://haproxy.org/download/1.8/doc/proxy-protocol.txt>

mod model;

pub use model::{MAX_LENGTH, PROTOCOL_PREFIX, PROTOCOL_SUFFIX, TCP4, TCP6, UDP4, UDP6};
use model::{PARTS, SEPARATOR};

use crate::error::{EncodeError, ParseError};
use crate::model::{AddressFamily, Header, Version};
use std::net::{AddrParseError, IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::{from_utf8, FromStr};

/// Parses the addresses and ports of a text header as the IP version `T`.
fn parse_addresses<T>(parts: &[&str]) -> Result<(SocketAddr, SocketAddr), ParseError>
where
    T: FromStr<Err = AddrParseError> + Into<IpAddr>,
{
    let source_address = parts[2]
        .parse::<T>()
        .map_err(ParseError::InvalidSourceAddress)?;
    let target_address = parts[3]
        .parse::<T>()
        .map_err(ParseError::InvalidTargetAddress)?;
    let source_port = parts[4]
        .parse::<u16>()
        .map_err(ParseError::InvalidSourcePort)?;
    let target_port = parts[5]
        .parse::<u16>()
        .map_err(ParseError::InvalidTargetPort)?;

    Ok((
        SocketAddr::new(source_address.into(), source_port),
        SocketAddr::new(target_address.into(), target_port),
    ))
}

/// Parses a text PROXY protocol header from the start of the input.
///
/// On success, returns the header and the number of bytes it occupies (through the trailing `\r\n`).
/// Any bytes after the trailer are left untouched.
///
/// ## Examples
/// ```rust
/// use proxy_origin::{v1, AddressFamily};
///
/// let input = b"PROXY TCP4 192.168.0.1 192.168.0.11 56324 443\r\nGET / HTTP/1.1\r\n";
/// let (header, length) = v1::parse(input).unwrap();
///
/// assert_eq!(header.address_family(), AddressFamily::Tcp4);
/// assert_eq!(header.source().to_string(), "192.168.0.1:56324");
/// assert_eq!(&input[length..], b"GET / HTTP/1.1\r\n");
/// ```
pub fn parse(input: &[u8]) -> Result<(Header, usize), ParseError> {
    if !input.starts_with(PROTOCOL_PREFIX.as_bytes()) {
        return Err(crate::signature_error(input, PROTOCOL_PREFIX.as_bytes()));
    }

    let end = input
        .windows(PROTOCOL_SUFFIX.len())
        .take(MAX_LENGTH - 1)
        .position(|window| window == PROTOCOL_SUFFIX.as_bytes())
        .ok_or(if input.len() >= MAX_LENGTH {
            ParseError::HeaderTooLong
        } else {
            ParseError::Incomplete
        })?;

    let line = from_utf8(&input[..end])?;
    let parts: Vec<&str> = line.split(SEPARATOR).collect();

    if parts.len() != PARTS {
        return Err(ParseError::FieldCount(parts.len() + 1));
    }

    if parts[0] != PROTOCOL_PREFIX {
        return Err(ParseError::InvalidPrefix);
    }

    let address_family = model::family(parts[1])
        .ok_or_else(|| ParseError::InvalidAddressFamily(parts[1].to_string()))?;

    let (source, target) = match address_family {
        AddressFamily::Tcp6 | AddressFamily::Udp6 => parse_addresses::<Ipv6Addr>(&parts)?,
        _ => parse_addresses::<Ipv4Addr>(&parts)?,
    };

    let header = Header::new(Version::One, address_family, source, target);
    let length = header.verify(input)?;

    Ok((header, length))
}

/// Encodes a header as a single line of text terminated by `\r\n`.
pub(crate) fn encode(header: &Header) -> Result<Vec<u8>, EncodeError> {
    let address_family = header.address_family();
    let token =
        model::token(address_family).ok_or(EncodeError::MalformedConstant(address_family))?;

    if !address_family.admits(&header.source_address())
        || !address_family.admits(&header.target_address())
    {
        return Err(EncodeError::AddressMismatch(address_family));
    }

    let text = format!(
        "{prefix} {token} {} {} {} {}{suffix}",
        header.source_address(),
        header.target_address(),
        header.source_port(),
        header.target_port(),
        prefix = PROTOCOL_PREFIX,
        token = token,
        suffix = PROTOCOL_SUFFIX,
    );

    Ok(text.into_bytes())
}
