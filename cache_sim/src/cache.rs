use std::fmt;

use thiserror::Error;

use crate::{
    addr::{Addr, Decomposed},
    config::{CacheConfig, Geometry},
    memory::{BackingMemory, MemoryAccessError},
    store::{Line, Set},
    word::{self, WordAssembler},
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to fill line from block {addr}")]
    BackingRead {
        addr: Addr,
        #[source]
        source: MemoryAccessError,
    },
    #[error("block size {block_size} is not a power of two of at least one word")]
    InvalidBlockSize { block_size: usize },
    #[error("arena of {arena_size} bytes cannot hold a single line ({required} bytes needed)")]
    ArenaTooSmall { arena_size: usize, required: usize },
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Probe {
    Hit,
    Miss,
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::Hit => write!(f, "hit"),
            Probe::Miss => write!(f, "miss"),
        }
    }
}

/// outcome of one word read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Access {
    pub value: u64,
    /// probe of the block holding the first byte
    pub first: Probe,
    /// probe of the following block, for words crossing a block boundary
    pub second: Option<Probe>,
}

impl Access {
    pub fn is_hit(&self) -> bool {
        self.first == Probe::Hit && self.second.map_or(true, |p| p == Probe::Hit)
    }
}

/// fully associative cache with LRU replacement in front of `M`.
pub struct Cache<M> {
    geometry: Geometry,
    set: Set,
    memory: M,
    #[cfg(feature = "stat")]
    c_stat: stat::CacheStat,
}

impl<M: BackingMemory> Cache<M> {
    pub fn new(config: &CacheConfig, memory: M) -> Result<Self> {
        let geometry = Geometry::new(config)?;
        log::debug!(
            "cache laid out: {} lines of {} bytes in an arena of {} bytes",
            geometry.num_lines(),
            geometry.block_size(),
            config.arena_size
        );
        Ok(Self {
            set: Set::new(geometry.num_lines(), geometry.block_size()),
            geometry,
            memory,
            #[cfg(feature = "stat")]
            c_stat: Default::default(),
        })
    }

    /// reads the word at `addr`.
    pub fn get(&mut self, addr: u64) -> Result<u64> {
        self.access(addr).map(|a| a.value)
    }

    /// reads the word at `addr`, reporting how each block was found.
    ///
    /// on a crossing word both blocks are resolved independently. when the
    /// second fill fails the first stays installed.
    pub fn access(&mut self, addr: u64) -> Result<Access> {
        let block_size = self.geometry.block_size();
        let Decomposed { offset, tag } = self.geometry.decompose(addr);
        let mut asm = WordAssembler::new();

        #[cfg(feature = "stat")]
        self.c_stat.on_request(word::crosses(block_size, offset));

        if !word::crosses(block_size, offset) {
            let (index, first) = match self.probe(tag) {
                Some(index) => (index, Probe::Hit),
                None => (self.fill(tag)?, Probe::Miss),
            };
            asm.take_head(self.set.block(index), offset);
            return Ok(Access {
                value: asm.finish(),
                first,
                second: None,
            });
        }

        let split = word::split_at(block_size, offset);
        let next_addr = addr.wrapping_add(split as u64);
        let Decomposed { tag: next_tag, .. } = self.geometry.decompose(next_addr);
        log::trace!(
            "word at {} crosses into block {}",
            Addr::new(addr),
            Addr::new(self.geometry.block_addr(next_tag))
        );

        // both probes run before either fill, so a hit on one half is
        // touched before the other half picks its victim
        let head = self.probe(tag);
        if let Some(index) = head {
            asm.take_head(self.set.block(index), offset);
        }
        let tail = self.probe(next_tag);
        if let Some(index) = tail {
            asm.take_tail(self.set.block(index), split);
        }
        if head.is_none() {
            let index = self.fill(tag)?;
            asm.take_head(self.set.block(index), offset);
        }
        if tail.is_none() {
            let index = self.fill(next_tag)?;
            asm.take_tail(self.set.block(index), split);
        }
        Ok(Access {
            value: asm.finish(),
            first: probe_of(head),
            second: Some(probe_of(tail)),
        })
    }

    /// index of the line holding `tag`, made most recently used.
    fn probe(&mut self, tag: u64) -> Option<usize> {
        let index = self.set.find(tag)?;
        self.set.touch(index);
        log::trace!("hit on block {} in line {index}", self.block_addr(tag));
        #[cfg(feature = "stat")]
        self.c_stat.on_probe(Probe::Hit);
        Some(index)
    }

    /// installs `tag` in the least recently used line and reads its block.
    ///
    /// the line is installed before the read, so after a failure it holds
    /// `tag` with stale bytes.
    fn fill(&mut self, tag: u64) -> Result<usize> {
        let victim = self.set.select_victim();
        let replaced = &self.set.lines()[victim];
        if replaced.is_valid() {
            log::debug!(
                "evicting block {} from line {victim}",
                self.block_addr(replaced.tag())
            );
            #[cfg(feature = "stat")]
            self.c_stat.on_eviction();
        }
        #[cfg(feature = "stat")]
        self.c_stat.on_probe(Probe::Miss);

        let index = self.set.evict(tag);
        let addr = self.block_addr(tag);
        log::debug!("miss on block {addr}, filling line {index}");
        if let Err(source) = self
            .memory
            .read_block(addr.inner(), self.set.block_mut(index))
        {
            log::warn!("fill of line {index} from block {addr} failed: {source}");
            #[cfg(feature = "stat")]
            self.c_stat.on_failed_fill();
            return Err(CacheError::BackingRead { addr, source });
        }
        Ok(index)
    }

    fn block_addr(&self, tag: u64) -> Addr {
        Addr::new(self.geometry.block_addr(tag))
    }
}

impl<M> Cache<M> {
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
    pub fn lines(&self) -> &[Line] {
        self.set.lines()
    }
    /// whether the block with `tag` is cached; does not count as a use.
    pub fn contains(&self, tag: u64) -> bool {
        self.set.find(tag).is_some()
    }
    pub fn memory(&self) -> &M {
        &self.memory
    }
    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }
    pub fn into_memory(self) -> M {
        self.memory
    }
    #[cfg(feature = "stat")]
    pub fn stat(&self) -> &CacheStat {
        &self.c_stat
    }
}

fn probe_of(found: Option<usize>) -> Probe {
    match found {
        Some(_) => Probe::Hit,
        None => Probe::Miss,
    }
}

#[cfg(feature = "stat")]
pub use self::stat::CacheStat;

#[cfg(feature = "stat")]
impl<M> AddStats for Cache<M> {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.c_stat));
    }
}

#[cfg(feature = "stat")]
impl<M: AddStats> Cache<M> {
    pub fn collect_stat(&self) -> Stats {
        let mut ss = Stats::default();
        self.add_stats(&mut ss);
        self.memory.add_stats(&mut ss);
        ss
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::fmt;

    use super::Probe;
    use crate::stat::*;

    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CacheStat {
        requests: usize,
        crossing: usize,
        hit_count: usize,
        miss_count: usize,
        evictions: usize,
        failed_fills: usize,
    }

    impl CacheStat {
        pub(super) fn on_request(&mut self, crossing: bool) {
            self.requests += 1;
            if crossing {
                self.crossing += 1;
            }
        }
        pub(super) fn on_probe(&mut self, result: Probe) {
            match result {
                Probe::Hit => self.hit_count += 1,
                Probe::Miss => self.miss_count += 1,
            }
        }
        pub(super) fn on_eviction(&mut self) {
            self.evictions += 1;
        }
        pub(super) fn on_failed_fill(&mut self) {
            self.failed_fills += 1;
        }
        pub fn requests(&self) -> usize {
            self.requests
        }
        pub fn crossing(&self) -> usize {
            self.crossing
        }
        pub fn hits(&self) -> usize {
            self.hit_count
        }
        pub fn misses(&self) -> usize {
            self.miss_count
        }
        pub fn evictions(&self) -> usize {
            self.evictions
        }
        pub fn failed_fills(&self) -> usize {
            self.failed_fills
        }
        /// hits over block probes, 0.0 before the first probe
        pub fn hit_ratio(&self) -> f64 {
            let total = self.hit_count + self.miss_count;
            if total == 0 {
                0.0
            } else {
                self.hit_count as f64 / total as f64
            }
        }
    }

    impl Stat for CacheStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(CacheStatView::new(self))
        }
    }

    pub struct CacheStatView<'a> {
        stat: &'a CacheStat,
    }

    impl<'a> CacheStatView<'a> {
        pub fn new(stat: &'a CacheStat) -> Self {
            Self { stat }
        }
    }

    impl StatView for CacheStatView<'_> {
        fn header(&self) -> &'static str {
            "cache stat (hit/miss counted per block probe)"
        }
        fn width(&self) -> usize {
            36
        }
    }

    impl fmt::Display for CacheStatView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let hit = self.stat.hit_count;
            let miss = self.stat.miss_count;
            let total = hit + miss;
            let hit_pct = percent(hit, total);
            let miss_pct = percent(miss, total);
            writeln!(f, "      requests: {:>10}", self.stat.requests)?;
            writeln!(f, "      crossing: {:>10}", self.stat.crossing)?;
            writeln!(f, "           hit: {hit:>10} ({hit_pct:>8}%)")?;
            writeln!(f, "          miss: {miss:>10} ({miss_pct:>8}%)")?;
            writeln!(f, "     evictions: {:>10}", self.stat.evictions)?;
            writeln!(f, "  failed fills: {:>10}", self.stat.failed_fills)
        }
    }
}
