use anyhow::Result;
use serde::Deserialize;

use crate::{
    addr::{self, Decomposed},
    cache::CacheError,
    word::WORD_SIZE,
};

pub const DEFAULT_ARENA_SIZE: usize = 1024usize;
pub const DEFAULT_BLOCK_SIZE: usize = 64usize;

/// bytes in front of the set: initialized flag and pointer to the set array.
pub const BASE_OVERHEAD: usize = 16usize;
/// bytes of set metadata: pointer to the line array.
pub const SET_OVERHEAD: usize = 8usize;
/// bytes of line metadata: recency counter, valid flag and tag.
pub const LINE_OVERHEAD: usize = 12usize;
const LINE_ALIGN: usize = 4usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// total size of the fast memory the cache lives in
    pub arena_size: usize,
    pub block_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            arena_size: DEFAULT_ARENA_SIZE,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl CacheConfig {
    pub fn new(arena_size: usize, block_size: usize) -> Self {
        Self {
            arena_size,
            block_size,
        }
    }
    /// config whose arena holds exactly `num_lines` lines.
    pub fn with_lines(num_lines: usize, block_size: usize) -> Self {
        Self::new(Geometry::arena_size_for(num_lines, block_size), block_size)
    }
    pub fn from_reader(file: impl std::io::Read) -> Result<Self> {
        Ok(serde_json::from_reader(file)?)
    }
}

/// layout of the arena derived from a validated [`CacheConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    block_size: usize,
    offset_bits: u32,
    num_lines: usize,
}

impl Geometry {
    pub fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let CacheConfig {
            arena_size,
            block_size,
        } = *config;
        if !block_size.is_power_of_two() || block_size < WORD_SIZE {
            return Err(CacheError::InvalidBlockSize { block_size });
        }
        let required = Self::arena_size_for(1, block_size);
        if arena_size < required {
            return Err(CacheError::ArenaTooSmall {
                arena_size,
                required,
            });
        }
        Ok(Self {
            block_size,
            offset_bits: addr::offset_bits(block_size),
            num_lines: (arena_size - BASE_OVERHEAD - SET_OVERHEAD) / Self::line_size(block_size),
        })
    }
    /// bytes one line occupies in the arena.
    pub const fn line_size(block_size: usize) -> usize {
        (LINE_OVERHEAD + block_size).next_multiple_of(LINE_ALIGN)
    }
    pub const fn arena_size_for(num_lines: usize, block_size: usize) -> usize {
        BASE_OVERHEAD + SET_OVERHEAD + num_lines * Self::line_size(block_size)
    }
    pub fn block_size(&self) -> usize {
        self.block_size
    }
    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }
    pub fn num_lines(&self) -> usize {
        self.num_lines
    }
    #[inline]
    pub fn decompose(&self, addr: u64) -> Decomposed {
        addr::decompose_bits(addr, self.offset_bits)
    }
    #[inline]
    pub fn block_addr(&self, tag: u64) -> u64 {
        tag << self.offset_bits
    }
}
