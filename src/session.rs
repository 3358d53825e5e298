//! Applies the real client endpoint declared by a PROXY protocol header to the session
//! of the connection it arrived on.
//!
//! The host reports two events: raw data arriving on a connection (which may start with a
//! header), and a session producing its first identifying packet. Between the two, the real
//! endpoint waits in an [`AssociationTable`] keyed by the endpoint the host observed.

use crate::association::AssociationTable;
use crate::config::Config;
use crate::error::ParseError;
use crate::model::{Command, Header};
use std::net::SocketAddr;
use tracing::{debug, warn};

/// A host session whose peer address can be corrected once the real client is known.
pub trait Session {
    /// The peer address as currently known to the session.
    fn peer_addr(&self) -> SocketAddr;

    fn set_peer_addr(&mut self, addr: SocketAddr);
}

/// The outcome of inspecting raw connection data for a header.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The data is not (or not treated as) a header and was left untouched.
    Passthrough,
    /// A header was accepted and stripped from the data.
    Accepted(Header),
    /// The data started with a signature but held no valid header.
    /// Only returned when `reject_invalid` is configured; the data is left untouched.
    Rejected(ParseError),
}

/// Tracks real client endpoints from PROXY protocol headers until their sessions identify.
///
/// ## Examples
/// ```rust
/// use proxy_origin::{Config, OriginTracker, Session, Verdict};
/// use std::net::SocketAddr;
///
/// struct Player {
///     address: SocketAddr,
/// }
///
/// impl Session for Player {
///     fn peer_addr(&self) -> SocketAddr {
///         self.address
///     }
///
///     fn set_peer_addr(&mut self, addr: SocketAddr) {
///         self.address = addr;
///     }
/// }
///
/// let tracker = OriginTracker::new(Config::default());
/// let observed: SocketAddr = "10.0.0.1:40000".parse().unwrap();
/// let mut packet = b"PROXY UDP4 203.0.113.7 10.0.0.2 56324 19132\r\nlogin".to_vec();
///
/// assert!(matches!(tracker.on_raw_packet(observed, &mut packet), Verdict::Accepted(..)));
/// assert_eq!(packet, b"login");
///
/// let mut player = Player { address: observed };
///
/// assert_eq!(tracker.on_identified(&mut player), Some(observed));
/// assert_eq!(player.address.to_string(), "203.0.113.7:56324");
/// ```
#[derive(Debug)]
pub struct OriginTracker {
    config: Config,
    associations: AssociationTable,
}

impl OriginTracker {
    pub fn new(config: Config) -> Self {
        let associations = AssociationTable::new(&config.association);

        OriginTracker {
            config,
            associations,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn associations(&self) -> &AssociationTable {
        &self.associations
    }

    /// Inspects data received from `observed`, stripping and recording a leading header.
    ///
    /// Data that does not start with a complete signature is always passed through, even when
    /// it is a prefix of one.
    pub fn on_raw_packet(&self, observed: SocketAddr, buffer: &mut Vec<u8>) -> Verdict {
        if crate::detect(buffer.as_slice()).is_err() {
            return Verdict::Passthrough;
        }

        match crate::try_parse_header(buffer.as_slice()) {
            Ok((header, length)) => {
                buffer.drain(..length);
                self.record(observed, &header);

                Verdict::Accepted(header)
            }
            Err(error) => {
                if error.is_unsupported() {
                    warn!(observed = %observed, %error, "header uses an unsupported address family");
                } else {
                    debug!(observed = %observed, %error, "ignoring invalid header");
                }

                if self.config.reject_invalid {
                    Verdict::Rejected(error)
                } else {
                    Verdict::Passthrough
                }
            }
        }
    }

    fn record(&self, observed: SocketAddr, header: &Header) {
        if self.config.ignore_local && header.command() == Command::Local {
            debug!(observed = %observed, "not recording header with LOCAL command");
            return;
        }

        if !self.config.trust_loopback
            && (header.source_address().is_loopback() || header.target_address().is_loopback())
        {
            debug!(observed = %observed, source = %header.source(), "not recording loopback header");
            return;
        }

        debug!(observed = %observed, real = %header.source(), "recorded real client address");
        self.associations.insert(observed, header.source());
    }

    /// Corrects the peer address of a session that produced its first identifying packet.
    /// Returns the address the session was observed from when a correction was applied.
    pub fn on_identified<S: Session + ?Sized>(&self, session: &mut S) -> Option<SocketAddr> {
        let observed = session.peer_addr();
        let real = self.associations.take(&observed)?;

        session.set_peer_addr(real);
        debug!(observed = %observed, real = %real, "corrected session address");

        Some(observed)
    }

    /// Forgets any pending association of a connection that closed.
    pub fn on_disconnect(&self, observed: &SocketAddr) -> bool {
        self.associations.remove(observed)
    }
}
