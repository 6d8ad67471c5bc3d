//! Adaptive Replacement Cache (ARC) directory.
//!
//! Four LRU-ordered lists are maintained:
//!
//! - **T1**: resident keys seen once recently
//! - **T2**: resident keys seen at least twice
//! - **B1**: ghost keys recently evicted from T1
//! - **B2**: ghost keys recently evicted from T2
//!
//! The target size `p` of T1 moves towards recency when a ghost hit lands in
//! B1 and towards frequency when it lands in B2. A burst of one-off keys only
//! churns T1, so keys promoted to T2 survive scans.
//!
//! Every list is an [`LruCache`], so promotion, removal and eviction of the
//! least recently used key are constant time.

use lru::LruCache;

/// Point-in-time view of the directory shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArcShape {
    pub capacity: usize,
    pub target_recent: usize,
    pub recent: usize,
    pub frequent: usize,
    pub recent_ghosts: usize,
    pub frequent_ghosts: usize,
}

#[derive(Debug)]
pub struct ArcDirectory<V> {
    capacity: usize,
    p: usize,
    t1: LruCache<String, V>,
    t2: LruCache<String, V>,
    b1: LruCache<String, ()>,
    b2: LruCache<String, ()>,
}

impl<V> ArcDirectory<V> {
    /// Creates a directory holding at most `capacity` resident entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            p: 0,
            t1: LruCache::unbounded(),
            t2: LruCache::unbounded(),
            b1: LruCache::unbounded(),
            b2: LruCache::unbounded(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.t1.len() + self.t2.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> ArcShape {
        ArcShape {
            capacity: self.capacity,
            target_recent: self.p,
            recent: self.t1.len(),
            frequent: self.t2.len(),
            recent_ghosts: self.b1.len(),
            frequent_ghosts: self.b2.len(),
        }
    }

    /// Looks up a resident entry without touching recency.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.t1.peek(key).or_else(|| self.t2.peek(key))
    }

    /// Looks up a resident entry and records the hit (T1 -> T2, or T2 -> MRU).
    pub fn touch(&mut self, key: &str) -> Option<&V> {
        if let Some(value) = self.t1.pop(key) {
            self.t2.put(key.to_string(), value);
            return self.t2.peek(key);
        }
        self.t2.get(key)
    }

    /// Inserts or replaces `key`.
    ///
    /// Returns the key of the resident entry evicted to make room, if any.
    pub fn insert(&mut self, key: String, value: V) -> Option<String> {
        // Resident: replace in place and treat as a repeat access.
        if self.t1.pop(&key).is_some() || self.t2.pop(&key).is_some() {
            self.t2.put(key, value);
            return None;
        }

        if self.b1.contains(&key) {
            let delta = (self.b2.len() / self.b1.len()).max(1);
            self.p = (self.p + delta).min(self.capacity);
            let evicted = self.make_room(false);
            self.b1.pop(&key);
            self.t2.put(key, value);
            return evicted;
        }

        if self.b2.contains(&key) {
            let delta = (self.b1.len() / self.b2.len()).max(1);
            self.p = self.p.saturating_sub(delta);
            let evicted = self.make_room(true);
            self.b2.pop(&key);
            self.t2.put(key, value);
            return evicted;
        }

        let mut evicted = None;
        if self.t1.len() + self.b1.len() >= self.capacity {
            if self.t1.len() < self.capacity {
                self.b1.pop_lru();
                evicted = self.make_room(false);
            } else {
                evicted = self.t1.pop_lru().map(|(k, _)| k);
            }
        } else {
            let total = self.t1.len() + self.t2.len() + self.b1.len() + self.b2.len();
            if total >= self.capacity {
                if total >= 2 * self.capacity {
                    self.b2.pop_lru();
                }
                evicted = self.make_room(false);
            }
        }

        self.t1.put(key, value);
        evicted
    }

    /// Removes a resident entry and forgets any ghost of the key.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.b1.pop(key);
        self.b2.pop(key);
        self.t1.pop(key).or_else(|| self.t2.pop(key))
    }

    /// Removes every resident entry matching `predicate`, without ghosting.
    pub fn purge(&mut self, mut predicate: impl FnMut(&V) -> bool) -> usize {
        purge_list(&mut self.t1, &mut predicate) + purge_list(&mut self.t2, &mut predicate)
    }

    pub fn clear(&mut self) {
        self.p = 0;
        self.t1.clear();
        self.t2.clear();
        self.b1.clear();
        self.b2.clear();
    }

    /// Evicts one resident entry when the cache is full.
    fn make_room(&mut self, hit_in_b2: bool) -> Option<String> {
        if self.len() < self.capacity {
            return None;
        }
        self.replace(hit_in_b2)
    }

    fn replace(&mut self, hit_in_b2: bool) -> Option<String> {
        let t1_len = self.t1.len();
        let take_recent = t1_len > 0
            && (t1_len > self.p || (hit_in_b2 && t1_len == self.p) || self.t2.is_empty());

        if take_recent {
            let (key, _) = self.t1.pop_lru()?;
            self.b1.put(key.clone(), ());
            Some(key)
        } else {
            let (key, _) = self.t2.pop_lru()?;
            self.b2.put(key.clone(), ());
            Some(key)
        }
    }
}

fn purge_list<V>(list: &mut LruCache<String, V>, predicate: &mut impl FnMut(&V) -> bool) -> usize {
    let doomed: Vec<String> = list
        .iter()
        .filter(|&(_, value)| predicate(value))
        .map(|(key, _)| key.clone())
        .collect();
    for key in &doomed {
        list.pop(key);
    }
    doomed.len()
}
