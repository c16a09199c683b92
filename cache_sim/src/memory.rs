use std::collections::HashSet;

#[cfg(feature = "stat")]
use std::cell::RefCell;

use thiserror::Error;

use crate::addr::Addr;

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

#[derive(Error, Debug)]
pub enum MemoryAccessError {
    #[error("block {addr} ({len} bytes) out of range for memory of {size} bytes")]
    OutOfBounds { addr: Addr, len: usize, size: usize },
    #[error("backing memory refused to read block {addr}")]
    Refused { addr: Addr },
}

pub type Result<T> = std::result::Result<T, MemoryAccessError>;

/// memory behind the cache.
pub trait BackingMemory {
    /// reads the block at `addr` into all of `buf`. contents of `buf` are
    /// unspecified on failure.
    fn read_block(&mut self, addr: u64, buf: &mut [u8]) -> Result<()>;
}

/// a plain read function: `true` when `buf` was filled.
impl<F> BackingMemory for F
where
    F: FnMut(u64, &mut [u8]) -> bool,
{
    fn read_block(&mut self, addr: u64, buf: &mut [u8]) -> Result<()> {
        if (self)(addr, buf) {
            Ok(())
        } else {
            Err(MemoryAccessError::Refused {
                addr: Addr::new(addr),
            })
        }
    }
}

/// backing memory over a byte image starting at address 0.
pub struct FlatMemory {
    inner: Vec<u8>,
    refused: HashSet<u64>,
    #[cfg(feature = "stat")]
    stat_mem: RefCell<stat::MemoryStat>,
}

impl FlatMemory {
    pub fn new(size: usize) -> Self {
        Self::from_image(vec![0; size])
    }
    pub fn from_image(image: Vec<u8>) -> Self {
        Self {
            inner: image,
            refused: HashSet::new(),
            #[cfg(feature = "stat")]
            stat_mem: RefCell::default(),
        }
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    /// makes every later read of the block at `addr` fail.
    pub fn refuse(&mut self, addr: u64) {
        self.refused.insert(addr);
    }
    pub fn accept(&mut self, addr: u64) {
        self.refused.remove(&addr);
    }
    pub fn write(&mut self, addr: usize, bytes: &[u8]) {
        self.inner[addr..addr + bytes.len()].copy_from_slice(bytes);
    }
    pub fn set_u64(&mut self, addr: usize, val: u64) {
        self.write(addr, &val.to_le_bytes());
    }
    fn on_read(&self, _ok: bool) {
        #[cfg(feature = "stat")]
        self.stat_mem.borrow_mut().on_read(_ok);
    }
}

impl BackingMemory for FlatMemory {
    fn read_block(&mut self, addr: u64, buf: &mut [u8]) -> Result<()> {
        if self.refused.contains(&addr) {
            self.on_read(false);
            return Err(MemoryAccessError::Refused {
                addr: Addr::new(addr),
            });
        }
        let size = self.inner.len();
        let range = usize::try_from(addr)
            .ok()
            .and_then(|start| Some(start..start.checked_add(buf.len())?))
            .filter(|r| r.end <= size);
        let Some(range) = range else {
            self.on_read(false);
            return Err(MemoryAccessError::OutOfBounds {
                addr: Addr::new(addr),
                len: buf.len(),
                size,
            });
        };
        buf.copy_from_slice(&self.inner[range]);
        self.on_read(true);
        Ok(())
    }
}

#[cfg(feature = "stat")]
impl AddStats for FlatMemory {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat_mem.borrow().to_owned()));
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::fmt;

    use crate::stat::*;

    #[derive(Clone, Copy, Default)]
    pub struct MemoryStat {
        read: usize,
        refused: usize,
    }

    impl MemoryStat {
        pub fn on_read(&mut self, ok: bool) {
            if ok {
                self.read += 1;
            } else {
                self.refused += 1;
            }
        }
    }

    impl Stat for MemoryStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(MemoryStatView::new(self))
        }
    }

    pub struct MemoryStatView<'a> {
        stat: &'a MemoryStat,
    }

    impl<'a> MemoryStatView<'a> {
        pub fn new(stat: &'a MemoryStat) -> Self {
            Self { stat }
        }
    }

    impl StatView for MemoryStatView<'_> {
        fn header(&self) -> &'static str {
            "backing memory block reads"
        }
        fn width(&self) -> usize {
            26
        }
    }

    impl fmt::Display for MemoryStatView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "     read: {:>11}", self.stat.read)?;
            writeln!(f, "  refused: {:>11}", self.stat.refused)
        }
    }
}
