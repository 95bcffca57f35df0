/// How a stored score relates to the true value of a position
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    /// the true score is at least the stored one (search failed high)
    Lower,
    /// the true score is at most the stored one (search failed low)
    Upper,
}

#[derive(Copy, Clone, Debug)]
struct Entry {
    key: u64,
    score: i32,
    depth: u32,
    bound: Bound,
}

const WAYS: usize = 2;

/// Default number of buckets, a prime just below 2^20
pub const DEFAULT_CAPACITY: usize = (1 << 20) - 3;

/// Fixed size cache of search results keyed by position
///
/// Each bucket holds two entries. A new entry replaces an existing one for the
/// same key unless that one was searched deeper, otherwise it takes a free
/// slot or evicts the shallower of the two.
#[derive(Clone)]
pub struct TranspositionTable {
    buckets: Vec<[Option<Entry>; WAYS]>,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(buckets: usize) -> Self {
        Self {
            buckets: vec![[None; WAYS]; buckets.max(1)],
        }
    }

    fn bucket(&self, key: u64) -> usize {
        // keys are column-packed, so fold and scramble them before reducing
        let mixed = (key ^ (key >> 32)).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        ((mixed >> 32) % self.buckets.len() as u64) as usize
    }

    /// Returns the stored score and bound if it was searched at least `required_depth` deep
    pub fn get(&self, key: u64, required_depth: u32) -> Option<(i32, Bound)> {
        self.buckets[self.bucket(key)]
            .iter()
            .flatten()
            .find(|entry| entry.key == key)
            .filter(|entry| entry.depth >= required_depth)
            .map(|entry| (entry.score, entry.bound))
    }

    pub fn set(&mut self, key: u64, score: i32, depth: u32, bound: Bound) {
        let entry = Entry {
            key,
            score,
            depth,
            bound,
        };
        let index = self.bucket(key);
        let bucket = &mut self.buckets[index];

        if let Some(slot) = bucket
            .iter_mut()
            .find(|slot| matches!(slot, Some(current) if current.key == key))
        {
            if slot.map_or(true, |current| depth >= current.depth) {
                *slot = Some(entry);
            }
            return;
        }
        if let Some(slot) = bucket.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(entry);
            return;
        }
        // evict the shallowest entry
        let victim = (0..WAYS)
            .min_by_key(|&i| bucket[i].map_or(0, |current| current.depth))
            .unwrap_or(0);
        bucket[victim] = Some(entry);
    }

    pub fn clear(&mut self) {
        for bucket in self.buckets.iter_mut() {
            *bucket = [None; WAYS];
        }
    }

    /// Number of occupied entries
    pub fn len(&self) -> usize {
        self.buckets.iter().flatten().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BitBoard;
    use std::collections::HashSet;

    #[test]
    fn entries_are_only_trusted_at_sufficient_depth() {
        let mut table = TranspositionTable::with_capacity(64);
        table.set(42, 17, 5, Bound::Exact);

        assert_eq!(table.get(42, 5), Some((17, Bound::Exact)));
        assert_eq!(table.get(42, 3), Some((17, Bound::Exact)));
        assert_eq!(table.get(42, 6), None);
        assert_eq!(table.get(43, 0), None);
    }

    #[test]
    fn deeper_entries_are_kept() {
        let mut table = TranspositionTable::with_capacity(64);
        table.set(7, 100, 8, Bound::Lower);
        table.set(7, -3, 2, Bound::Exact);
        assert_eq!(table.get(7, 0), Some((100, Bound::Lower)));

        table.set(7, 55, 8, Bound::Upper);
        assert_eq!(table.get(7, 8), Some((55, Bound::Upper)));
    }

    #[test]
    fn collisions_evict_the_shallowest_entry() {
        let mut table = TranspositionTable::with_capacity(1);
        table.set(1, 10, 6, Bound::Exact);
        table.set(2, 20, 3, Bound::Exact);
        table.set(3, 30, 4, Bound::Exact);

        assert_eq!(table.get(1, 0), Some((10, Bound::Exact)));
        assert_eq!(table.get(2, 0), None);
        assert_eq!(table.get(3, 0), Some((30, Bound::Exact)));
        assert_eq!(table.len(), 2);

        table.clear();
        assert!(table.is_empty());
    }

    #[test]
    fn power_of_two_tables_spread_real_positions() {
        // every position of the first four plies
        let mut keys = HashSet::new();
        let mut frontier = vec![BitBoard::new()];
        for _ in 0..4 {
            let mut next = vec![];
            for board in frontier {
                for column in board.legal_moves() {
                    let child = board.apply(column).unwrap();
                    if keys.insert(child.key()) {
                        next.push(child);
                    }
                }
            }
            frontier = next;
        }

        let mut table = TranspositionTable::with_capacity(1 << 16);
        for &key in &keys {
            table.set(key, 0, 1, Bound::Exact);
        }
        assert!(keys.len() > 1000);
        assert!(table.len() * 100 >= keys.len() * 99, "{} of {}", table.len(), keys.len());
    }
}
