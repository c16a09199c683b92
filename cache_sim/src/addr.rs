use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// to unify displaying addresses in logs and errors
pub struct Addr(u64);

impl Addr {
    pub fn new(v: u64) -> Self {
        Self(v)
    }
    pub fn inner(self) -> u64 {
        self.0
    }
    pub fn disp(&self, amount: u64) -> Self {
        Self(self.0.wrapping_add(amount))
    }
}

impl Display for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// mask covering the lowest `bits` bits.
#[inline]
pub const fn mask_lower(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << bits).wrapping_sub(1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decomposed {
    pub offset: usize,
    pub tag: u64,
}

/// number of offset bits for `block_size`. assumes a power of two.
#[inline]
pub const fn offset_bits(block_size: usize) -> u32 {
    block_size.ilog2()
}

#[inline]
pub const fn decompose_bits(addr: u64, offset_bits: u32) -> Decomposed {
    Decomposed {
        offset: (addr & mask_lower(offset_bits)) as usize,
        tag: addr >> offset_bits,
    }
}

/// splits `addr` into intra-block offset and block tag.
pub const fn decompose(addr: u64, block_size: usize) -> Decomposed {
    decompose_bits(addr, offset_bits(block_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_lower() {
        assert_eq!(0, mask_lower(0));
        assert_eq!(0b111111, mask_lower(6));
        assert_eq!(u64::MAX, mask_lower(64));
    }
    #[test]
    fn test_decompose() {
        let d = decompose(0x1234, 64);
        assert_eq!(0x34 & 0x3f, d.offset);
        assert_eq!(0x1234 >> 6, d.tag);
        let d = decompose(0x40, 64);
        assert_eq!(Decomposed { offset: 0, tag: 1 }, d);
        let d = decompose(0x7f, 64);
        assert_eq!(Decomposed { offset: 63, tag: 1 }, d);
    }
    #[test]
    fn test_decompose_other_block_sizes() {
        assert_eq!(Decomposed { offset: 5, tag: 0x2 }, decompose(0x15, 8));
        assert_eq!(
            Decomposed {
                offset: 0x0ff,
                tag: 0xab
            },
            decompose(0xab0ff, 4096)
        );
        // a one-byte block has no offset bits
        assert_eq!(Decomposed { offset: 0, tag: 99 }, decompose(99, 1));
    }
    #[test]
    fn test_addr_display() {
        assert_eq!("0x00000040", format!("{}", Addr::new(0x40)));
        assert_eq!(Addr::new(0x48), Addr::new(0x40).disp(8));
    }
}
