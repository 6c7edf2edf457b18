//! Machine word helpers shared by the mover and the filler

/// The bulk-transfer unit: the native pointer-sized integer.
pub type Word = usize;

/// Bytes per word (4 or 8 on every supported target)
pub const WORD_SIZE: usize = std::mem::size_of::<Word>();

/// Mask selecting the residue of an address modulo [`WORD_SIZE`]
pub const WORD_MASK: usize = WORD_SIZE - 1;

/// Residue of an address modulo the word size.
#[inline]
pub fn word_residue(addr: usize) -> usize {
    addr & WORD_MASK
}

/// Bytes needed to advance `addr` to the next word boundary (0 if aligned).
#[inline]
pub fn bytes_to_word_boundary(addr: usize) -> usize {
    addr.wrapping_neg() & WORD_MASK
}

/// A word in which every byte holds the same value.
///
/// Only the low 8 bits of the input are significant, matching the
/// `int value truncated to byte` convention of the fill family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WordPattern(Word);

impl WordPattern {
    /// Replicate `pattern & 0xFF` into every byte of a word.
    ///
    /// The byte is doubled by OR-shifting: 1 byte -> 2 -> 4 -> word width.
    pub fn from_pattern(pattern: i32) -> Self {
        let mut word = (pattern & 0xff) as Word;
        let mut shift = 8;
        while shift < Word::BITS {
            word |= word << shift;
            shift <<= 1;
        }
        Self(word)
    }

    /// The byte replicated by this pattern
    pub fn byte(self) -> u8 {
        self.0 as u8
    }

    pub fn word(self) -> Word {
        self.0
    }
}
