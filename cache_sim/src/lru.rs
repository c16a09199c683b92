use crate::store::Set;

impl Set {
    /// makes line `index` the most recently used one.
    ///
    /// only lines used more recently than `index` age by one, which keeps
    /// recency a permutation.
    pub fn touch(&mut self, index: usize) {
        let pivot = self.lines[index].recency;
        for line in self.lines.iter_mut() {
            if line.recency < pivot {
                line.recency += 1;
            }
        }
        self.lines[index].recency = 0;
        debug_assert!(self.recency_is_permutation());
    }

    /// index of the least recently used line.
    pub fn select_victim(&self) -> usize {
        let mut victim = 0;
        for (i, line) in self.lines.iter().enumerate() {
            if line.recency > self.lines[victim].recency {
                victim = i;
            }
        }
        debug_assert_eq!(self.lines.len() - 1, self.lines[victim].recency);
        victim
    }

    /// reuses the least recently used line for `tag` and returns its index.
    ///
    /// the block is left untouched; the caller fills it.
    pub fn evict(&mut self, tag: u64) -> usize {
        let victim = self.select_victim();
        self.touch(victim);
        let line = &mut self.lines[victim];
        line.tag = tag;
        line.valid = true;
        victim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recencies(set: &Set) -> Vec<usize> {
        set.lines().iter().map(|l| l.recency()).collect()
    }

    #[test]
    fn test_touch() {
        let mut set = Set::new(4, 8);
        set.touch(2);
        assert_eq!(vec![1, 2, 0, 3], recencies(&set));
        set.touch(3);
        assert_eq!(vec![2, 3, 1, 0], recencies(&set));
        // touching the most recent line changes nothing
        set.touch(3);
        assert_eq!(vec![2, 3, 1, 0], recencies(&set));
    }
    #[test]
    fn test_touch_keeps_relative_order() {
        let mut set = Set::new(5, 8);
        set.touch(1);
        set.touch(4);
        let before = recencies(&set);
        set.touch(2);
        let after = recencies(&set);
        assert_eq!(0, after[2]);
        for i in 0..5 {
            for j in 0..5 {
                if i == 2 || j == 2 {
                    continue;
                }
                assert_eq!(
                    before[i] < before[j],
                    after[i] < after[j],
                    "lines {i} and {j} swapped: {before:?} -> {after:?}"
                );
            }
        }
    }
    #[test]
    fn test_cold_eviction_order() {
        let mut set = Set::new(4, 8);
        let order: Vec<usize> = (0..4u64).map(|tag| set.evict(tag)).collect();
        assert_eq!(vec![3, 2, 1, 0], order);
        // all lines are now valid and the first filled line is the oldest
        assert!(set.lines().iter().all(|l| l.is_valid()));
        assert_eq!(3, set.select_victim());
        assert_eq!(Some(3), set.find(0));
    }
    #[test]
    fn test_evict_after_touch() {
        let mut set = Set::new(2, 8);
        let a = set.evict(10);
        let b = set.evict(11);
        set.touch(a);
        let c = set.evict(12);
        assert_eq!(b, c);
        assert_eq!(None, set.find(11));
        assert_eq!(Some(a), set.find(10));
        assert_eq!(0, set.lines()[c].recency());
    }
    #[test]
    fn test_single_line() {
        let mut set = Set::new(1, 8);
        assert_eq!(0, set.evict(1));
        assert_eq!(0, set.evict(2));
        assert_eq!(None, set.find(1));
        assert_eq!(Some(0), set.find(2));
    }
    #[test]
    fn test_permutation_under_churn() {
        let mut set = Set::new(6, 8);
        let mut seed = 0x2545_f491u64;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let tag = seed % 9;
            match set.find(tag) {
                Some(i) => set.touch(i),
                None => {
                    set.evict(tag);
                }
            }
            assert!(set.recency_is_permutation(), "{:?}", recencies(&set));
        }
    }
}
