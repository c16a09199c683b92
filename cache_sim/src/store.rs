/// one line of the cache: metadata plus the cached block.
#[derive(Clone, Debug)]
pub struct Line {
    pub(crate) recency: usize,
    pub(crate) valid: bool,
    pub(crate) tag: u64,
    pub(crate) block: Box<[u8]>,
}

impl Line {
    fn new(recency: usize, block_size: usize) -> Self {
        Self {
            recency,
            valid: false,
            tag: 0,
            block: vec![0; block_size].into_boxed_slice(),
        }
    }
    /// 0 is the most recently used line.
    pub fn recency(&self) -> usize {
        self.recency
    }
    pub fn is_valid(&self) -> bool {
        self.valid
    }
    pub fn tag(&self) -> u64 {
        self.tag
    }
    pub fn block(&self) -> &[u8] {
        &self.block
    }
    #[inline]
    pub(crate) fn holds(&self, tag: u64) -> bool {
        self.valid && self.tag == tag
    }
}

/// the lines of a fully associative cache.
///
/// recency values over the lines always form a permutation of `0..len`.
/// the recency bookkeeping lives in `lru.rs`.
pub struct Set {
    pub(crate) lines: Vec<Line>,
}

impl Set {
    /// cold set; line `i` starts with recency `i`, so the last line is evicted first.
    pub fn new(num_lines: usize, block_size: usize) -> Self {
        Self {
            lines: (0..num_lines)
                .map(|recency| Line::new(recency, block_size))
                .collect(),
        }
    }
    pub fn len(&self) -> usize {
        self.lines.len()
    }
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }
    /// index of the valid line holding `tag`.
    pub fn find(&self, tag: u64) -> Option<usize> {
        self.lines.iter().position(|line| line.holds(tag))
    }
    pub fn block(&self, index: usize) -> &[u8] {
        &self.lines[index].block
    }
    pub(crate) fn block_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.lines[index].block
    }
    pub fn recency_is_permutation(&self) -> bool {
        let mut seen = vec![false; self.lines.len()];
        for line in &self.lines {
            match seen.get_mut(line.recency) {
                Some(s) if !*s => *s = true,
                _ => return false,
            }
        }
        true
    }
}
