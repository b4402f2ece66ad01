//! Bounded LRU remembering every identifier this session has ever asked
//! about.
//!
//! Wraps `linked_hash_map::LinkedHashMap`: a hash map with insertion order
//! preserved, which is exactly what a simple LRU set needs — eviction pops
//! the front.

use cid::Cid;
use linked_hash_map::LinkedHashMap;

pub struct InterestCache {
    capacity: usize,
    entries: LinkedHashMap<Cid, ()>,
}

impl InterestCache {
    pub fn new(capacity: usize) -> Self {
        InterestCache {
            capacity,
            entries: LinkedHashMap::new(),
        }
    }

    /// Records interest in `c`, evicting the least-recently-used entry if
    /// the cache is over capacity.
    pub fn insert(&mut self, c: Cid) {
        self.entries.insert(c, ());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Fast affirmative answer to "was this session ever interested in
    /// `c`?" without consulting the session loop. Does not refresh recency:
    /// a cache hit here is just a read, not a new expression of interest.
    pub fn contains(&self, c: &Cid) -> bool {
        self.entries.contains_key(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multihash::Code;

    fn cid(n: u8) -> Cid {
        Cid::new_v1(0x55, Code::Sha2_256.digest(&[n]))
    }

    #[test]
    fn remembers_recent_interest() {
        let mut cache = InterestCache::new(2);
        let (a, b, c) = (cid(1), cid(2), cid(3));
        cache.insert(a);
        cache.insert(b);
        assert!(cache.contains(&a));
        assert!(cache.contains(&b));

        cache.insert(c);
        assert_eq!(cache.entries.len(), 2);
        assert!(!cache.contains(&a), "oldest entry should have been evicted");
        assert!(cache.contains(&b));
        assert!(cache.contains(&c));
    }
}
