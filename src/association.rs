//! Short-lived associations between the endpoint a connection was observed from (the proxy)
//! and the real client endpoint declared by its PROXY protocol header.
//!
//! Entries are consumed once. Entries that are never consumed expire after a TTL, and the
//! table is bounded by evicting the oldest entry once full, so connections that send a header
//! but never identify themselves cannot grow it without limit.

use crate::config::AssociationConfig;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Entry {
    real: SocketAddr,
    added_at: Instant,
    sequence: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<SocketAddr, Entry>,
    /// Insertion order for FIFO eviction. May hold keys already removed from `entries`.
    insertion_order: VecDeque<(SocketAddr, u64)>,
    next_sequence: u64,
}

impl Inner {
    /// Drops queue keys whose entry is gone or was replaced by a newer insertion.
    fn compact(&mut self) {
        while let Some((key, sequence)) = self.insertion_order.front() {
            match self.entries.get(key) {
                Some(entry) if entry.sequence == *sequence => break,
                _ => {
                    self.insertion_order.pop_front();
                }
            }
        }

        // Replaced keys behind a live front entry are only dropped here.
        if self.insertion_order.len() > 2 * self.entries.len() + 16 {
            let entries = &self.entries;
            self.insertion_order.retain(|(key, sequence)| {
                matches!(entries.get(key), Some(entry) if entry.sequence == *sequence)
            });
        }
    }
}

/// A bounded, thread-safe map from proxy-observed endpoints to real client endpoints.
///
/// ## Examples
/// ```rust
/// use proxy_origin::{AssociationConfig, AssociationTable};
///
/// let table = AssociationTable::new(&AssociationConfig::default());
/// let observed = "10.0.0.1:40000".parse().unwrap();
/// let real = "203.0.113.7:56324".parse().unwrap();
///
/// table.insert(observed, real);
///
/// assert_eq!(table.take(&observed), Some(real));
/// assert_eq!(table.take(&observed), None);
/// ```
#[derive(Debug)]
pub struct AssociationTable {
    inner: Mutex<Inner>,
    ttl: Duration,
    capacity: usize,
}

impl AssociationTable {
    pub fn new(config: &AssociationConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ttl: config.ttl_duration(),
            capacity: config.capacity.max(1),
        }
    }

    /// Associates `observed` with `real`, replacing any earlier association.
    pub fn insert(&self, observed: SocketAddr, real: SocketAddr) {
        self.insert_at(observed, real, Instant::now())
    }

    fn insert_at(&self, observed: SocketAddr, real: SocketAddr, now: Instant) {
        let mut inner = self.inner.lock();

        if !inner.entries.contains_key(&observed) {
            let mut evicted = 0;

            while inner.entries.len() >= self.capacity {
                inner.compact();

                match inner.insertion_order.pop_front() {
                    Some((key, _)) => {
                        inner.entries.remove(&key);
                        evicted += 1;
                    }
                    None => break,
                }
            }

            if evicted > 0 {
                debug!(evicted, "evicted oldest associations at capacity");
            }
        }

        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.entries.insert(
            observed,
            Entry {
                real,
                added_at: now,
                sequence,
            },
        );
        inner.insertion_order.push_back((observed, sequence));
        inner.compact();
    }

    /// Removes and returns the real endpoint associated with `observed`.
    /// Expired associations are removed without being returned.
    pub fn take(&self, observed: &SocketAddr) -> Option<SocketAddr> {
        self.take_at(observed, Instant::now())
    }

    fn take_at(&self, observed: &SocketAddr, now: Instant) -> Option<SocketAddr> {
        let mut inner = self.inner.lock();
        let entry = inner.entries.remove(observed)?;
        inner.compact();

        if now.saturating_duration_since(entry.added_at) >= self.ttl {
            debug!(observed = %observed, "association expired before use");
            return None;
        }

        Some(entry.real)
    }

    /// Forgets the association for `observed`, e.g. when its connection closes.
    pub fn remove(&self, observed: &SocketAddr) -> bool {
        let mut inner = self.inner.lock();
        let removed = inner.entries.remove(observed).is_some();
        inner.compact();

        removed
    }

    /// Removes every expired association, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let mut inner = self.inner.lock();
        let initial_count = inner.entries.len();
        let ttl = self.ttl;

        inner
            .entries
            .retain(|_, entry| now.saturating_duration_since(entry.added_at) < ttl);
        inner.compact();

        let removed = initial_count - inner.entries.len();
        if removed > 0 {
            debug!(removed, "purged expired associations");
        }

        removed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn table(capacity: usize, ttl: u64) -> AssociationTable {
        AssociationTable::new(&AssociationConfig { capacity, ttl })
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([10, 0, 0, 1], port))
    }

    #[test]
    fn take_once() {
        let table = table(4, 30);
        table.insert(addr(1), addr(101));

        assert_eq!(1, table.len());
        assert_eq!(Some(addr(101)), table.take(&addr(1)));
        assert_eq!(None, table.take(&addr(1)));
        assert!(table.is_empty());
    }

    #[test]
    fn replace() {
        let table = table(4, 30);
        table.insert(addr(1), addr(101));
        table.insert(addr(1), addr(102));

        assert_eq!(1, table.len());
        assert_eq!(Some(addr(102)), table.take(&addr(1)));
    }

    #[test]
    fn evict_oldest() {
        let table = table(2, 30);
        table.insert(addr(1), addr(101));
        table.insert(addr(2), addr(102));
        table.insert(addr(3), addr(103));

        assert_eq!(2, table.len());
        assert_eq!(None, table.take(&addr(1)));
        assert_eq!(Some(addr(102)), table.take(&addr(2)));
        assert_eq!(Some(addr(103)), table.take(&addr(3)));
    }

    #[test]
    fn evict_skips_replaced() {
        let table = table(2, 30);
        table.insert(addr(1), addr(101));
        table.insert(addr(2), addr(102));
        table.insert(addr(1), addr(111));
        table.insert(addr(3), addr(103));

        assert_eq!(None, table.take(&addr(2)));
        assert_eq!(Some(addr(111)), table.take(&addr(1)));
        assert_eq!(Some(addr(103)), table.take(&addr(3)));
    }

    #[test]
    fn expired_is_not_returned() {
        let table = table(4, 30);
        let start = Instant::now();
        table.insert_at(addr(1), addr(101), start);

        assert_eq!(None, table.take_at(&addr(1), start + Duration::from_secs(30)));
        assert!(table.is_empty());
    }

    #[test]
    fn purge() {
        let table = table(4, 30);
        let start = Instant::now();
        table.insert_at(addr(1), addr(101), start);
        table.insert_at(addr(2), addr(102), start + Duration::from_secs(20));

        assert_eq!(1, table.purge_expired_at(start + Duration::from_secs(31)));
        assert_eq!(
            Some(addr(102)),
            table.take_at(&addr(2), start + Duration::from_secs(31))
        );
    }

    #[test]
    fn remove() {
        let table = table(4, 30);
        table.insert(addr(1), addr(101));

        assert!(table.remove(&addr(1)));
        assert!(!table.remove(&addr(1)));
        assert!(table.is_empty());
    }

    #[test]
    fn concurrent() {
        let table = Arc::new(table(1024, 30));
        let handles: Vec<_> = (0..8u16)
            .map(|worker| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    for i in 0..100u16 {
                        let port = worker * 100 + i;
                        table.insert(addr(port), addr(port + 10_000));
                        assert_eq!(Some(addr(port + 10_000)), table.take(&addr(port)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(table.is_empty());
    }
}
