/// bytes in one requested word.
pub const WORD_SIZE: usize = 8usize;

pub type WordBuf = [u8; WORD_SIZE];

/// decodes `buf` walking it back to front, so `buf[0]` ends up as the lowest byte.
pub fn reverse_endian(buf: &WordBuf) -> u64 {
    buf.iter().rev().fold(0, |value, &b| (value << 8) | b as u64)
}

/// builds a word from one block, or from the tail of a block and the head of the next.
#[derive(Default)]
pub struct WordAssembler {
    buf: WordBuf,
}

impl WordAssembler {
    pub fn new() -> Self {
        Self::default()
    }
    /// copies from `block[offset..]` into the front of the word. returns the number of
    /// bytes taken, which is short of [`WORD_SIZE`] when the word leaves the block.
    pub fn take_head(&mut self, block: &[u8], offset: usize) -> usize {
        let len = WORD_SIZE.min(block.len() - offset);
        self.buf[..len].copy_from_slice(&block[offset..offset + len]);
        len
    }
    /// copies the start of the following block into the word from `split` on.
    pub fn take_tail(&mut self, block: &[u8], split: usize) {
        let len = WORD_SIZE - split;
        self.buf[split..].copy_from_slice(&block[..len]);
    }
    pub fn bytes(&self) -> &WordBuf {
        &self.buf
    }
    pub fn finish(self) -> u64 {
        reverse_endian(&self.buf)
    }
}

/// number of bytes of a word at `offset` that still lie in its own block.
#[inline]
pub fn split_at(block_size: usize, offset: usize) -> usize {
    block_size - offset
}

/// whether a word at `offset` runs into the next block.
#[inline]
pub fn crosses(block_size: usize, offset: usize) -> bool {
    offset + WORD_SIZE > block_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_endian() {
        let buf = [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef];
        assert_eq!(0xefcdab8967452301, reverse_endian(&buf));
        assert_eq!(u64::from_le_bytes(buf), reverse_endian(&buf));
        assert_eq!(0, reverse_endian(&[0; 8]));
        assert_eq!(0xff, reverse_endian(&[0xff, 0, 0, 0, 0, 0, 0, 0]));
    }
    #[test]
    fn test_within_block() {
        let block: Vec<u8> = (0..64).collect();
        let mut asm = WordAssembler::new();
        assert_eq!(8, asm.take_head(&block, 8));
        assert_eq!(&[8, 9, 10, 11, 12, 13, 14, 15], asm.bytes());
        assert_eq!(0x0f0e0d0c0b0a0908, asm.finish());
        // last word that fits
        let mut asm = WordAssembler::new();
        assert_eq!(8, asm.take_head(&block, 56));
        assert_eq!(0x3f3e3d3c3b3a3938, asm.finish());
    }
    #[test]
    fn test_across_blocks() {
        let first: Vec<u8> = (0..64).collect();
        let second: Vec<u8> = (0x80..0xc0).collect();
        let mut asm = WordAssembler::new();
        let split = asm.take_head(&first, 60);
        assert_eq!(split_at(64, 60), split);
        asm.take_tail(&second, split);
        assert_eq!(&[60, 61, 62, 63, 0x80, 0x81, 0x82, 0x83], asm.bytes());
        assert_eq!(0x838281803f3e3d3c, asm.finish());
    }
    #[test]
    fn test_across_blocks_tail_first() {
        // the second half may be resolved before the first
        let first = [0xaau8; 8];
        let second = [0x11u8, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
        let mut asm = WordAssembler::new();
        asm.take_tail(&second, 1);
        asm.take_head(&first, 7);
        assert_eq!(0x77665544332211aa, asm.finish());
    }
    #[test]
    fn test_crosses() {
        assert!(!crosses(64, 0));
        assert!(!crosses(64, 56));
        assert!(crosses(64, 57));
        assert!(crosses(64, 63));
        assert!(crosses(8, 1));
        assert!(!crosses(8, 0));
    }
}
