//! Lazy-deletion queue: a `VecDeque` of identifiers paired with a set,
//! where `remove` only touches the set and a later `pop` skips over
//! entries the set no longer contains. This trades a bounded amount of
//! dead storage in the deque for amortized O(1) push and remove without
//! pointer plumbing.

use std::collections::VecDeque;

use ahash::AHashSet;
use cid::Cid;

#[derive(Debug, Default)]
pub struct CidQueue {
    elems: VecDeque<Cid>,
    set: AHashSet<Cid>,
}

impl CidQueue {
    pub fn new() -> Self {
        CidQueue::default()
    }

    /// Appends `c` to the tail, unless it is already present.
    pub fn push(&mut self, c: Cid) {
        if self.set.insert(c) {
            self.elems.push_back(c);
        }
    }

    /// Takes from the head until it finds an element still in the set, or
    /// the sequence is exhausted.
    pub fn pop(&mut self) -> Option<Cid> {
        while let Some(front) = self.elems.pop_front() {
            if self.set.remove(&front) {
                return Some(front);
            }
        }
        None
    }

    /// Deletes `c` from the set only; the stale deque entry, if any, is
    /// cleaned up by a later `pop`.
    pub fn remove(&mut self, c: &Cid) {
        self.set.remove(c);
    }

    pub fn contains(&self, c: &Cid) -> bool {
        self.set.contains(c)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multihash::Code;

    fn cid(n: u8) -> Cid {
        // deterministic, distinct Cids for test fixtures
        Cid::new_v1(0x55, Code::Sha2_256.digest(&[n]))
    }

    #[test]
    fn push_dedups() {
        let mut q = CidQueue::new();
        let a = cid(1);
        q.push(a);
        q.push(a);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn pop_skips_removed() {
        let mut q = CidQueue::new();
        let (a, b, c) = (cid(1), cid(2), cid(3));
        q.push(a);
        q.push(b);
        q.push(c);
        q.remove(&b);
        assert_eq!(q.pop(), Some(a));
        assert_eq!(q.pop(), Some(c));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn remove_then_push_again() {
        let mut q = CidQueue::new();
        let a = cid(1);
        q.push(a);
        q.remove(&a);
        assert!(!q.contains(&a));
        q.push(a);
        assert_eq!(q.pop(), Some(a));
    }

    #[test]
    fn contains_matches_future_pop() {
        let mut q = CidQueue::new();
        let a = cid(1);
        assert!(!q.contains(&a));
        q.push(a);
        assert!(q.contains(&a));
        assert_eq!(q.pop(), Some(a));
        assert!(!q.contains(&a));
    }

    proptest::proptest! {
        #[test]
        fn set_matches_eventual_pop(ops in proptest::collection::vec((0usize..6, proptest::bool::ANY), 0..200)) {
            let mut q = CidQueue::new();
            let ids: Vec<Cid> = (0..6).map(cid).collect();
            let mut expected: std::collections::HashSet<Cid> = std::collections::HashSet::new();
            for (idx, do_push) in ops {
                let id = ids[idx];
                if do_push {
                    q.push(id);
                    expected.insert(id);
                } else {
                    q.remove(&id);
                    expected.remove(&id);
                }
                assert_eq!(q.contains(&id), expected.contains(&id));
            }
            let mut drained = std::collections::HashSet::new();
            while let Some(c) = q.pop() {
                assert!(drained.insert(c), "pop produced a duplicate");
            }
            assert_eq!(drained, expected);
        }
    }
}
