//! Insertion-ordered unique set of peers this session has seen deliver a
//! block, or that the provider oracle has surfaced: a set for O(1)
//! membership plus a parallel vector for deterministic iteration order when
//! the want set is broadcast to "peers this session has found useful".

use ahash::AHashSet;
use libp2p::PeerId;

#[derive(Debug, Default)]
pub struct PeerSet {
    seen: AHashSet<PeerId>,
    ordered: Vec<PeerId>,
}

impl PeerSet {
    pub fn new() -> Self {
        PeerSet::default()
    }

    /// Adds `peer` if not already present. Returns whether it was newly
    /// inserted.
    pub fn insert(&mut self, peer: PeerId) -> bool {
        if self.seen.insert(peer) {
            self.ordered.push(peer);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.seen.contains(peer)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Snapshot in insertion order, handed to the want-manager so peer
    /// hints are deterministic across repeated promotions.
    pub fn snapshot(&self) -> Vec<PeerId> {
        self.ordered.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut set = PeerSet::new();
        let (a, b, c) = (PeerId::random(), PeerId::random(), PeerId::random());
        assert!(set.insert(a));
        assert!(set.insert(b));
        assert!(!set.insert(a));
        assert!(set.insert(c));
        assert_eq!(set.snapshot(), vec![a, b, c]);
        assert_eq!(set.len(), 3);
    }
}
