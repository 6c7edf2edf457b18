//! Reference word-wise fill
//!
//! The destination is brought to a word boundary with single byte stores,
//! the bulk is written with a replicated [`WordPattern`], and the tail is
//! finished byte by byte. When the whole span fits inside the unaligned
//! prefix, alignment is skipped and every byte is written individually.

use crate::candidate::Filler;
use crate::word::{WORD_MASK, WORD_SIZE, Word, WordPattern, bytes_to_word_boundary};

/// Set `len` bytes at `dest` to `pattern & 0xFF`.
///
/// Returns `dest`.
///
/// # Safety
/// `dest` must be valid for writes of `len` bytes.
pub unsafe fn word_fill(dest: *mut u8, pattern: i32, len: usize) -> *mut u8 {
    let byte = pattern as u8;
    let mut xs = dest;
    let mut count = len;
    let lead = bytes_to_word_boundary(dest as usize);

    unsafe {
        if count > lead {
            count -= lead;
            let word = WordPattern::from_pattern(pattern).word();

            for _ in 0..lead {
                *xs = byte;
                xs = xs.add(1);
            }

            for _ in 0..count / WORD_SIZE {
                xs.cast::<Word>().write(word);
                xs = xs.add(WORD_SIZE);
            }

            count &= WORD_MASK;
        }

        for _ in 0..count {
            *xs = byte;
            xs = xs.add(1);
        }
    }

    dest
}

/// Safe fill of a whole slice.
pub fn fill_slice(buf: &mut [u8], pattern: i32) {
    // SAFETY: the slice is valid for writes of its own length
    unsafe {
        word_fill(buf.as_mut_ptr(), pattern, buf.len());
    }
}

/// The reference filler as a candidate value
#[derive(Debug, Clone, Copy, Default)]
pub struct WordFiller;

impl Filler for WordFiller {
    fn name(&self) -> &str {
        "reference"
    }

    unsafe fn fill_bytes(&self, dest: *mut u8, pattern: i32, len: usize) -> *mut u8 {
        unsafe { word_fill(dest, pattern, len) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canary::{DEST_SEED, seed_canary};
    use crate::region::MemoryRegion;

    fn seeded(len: usize) -> MemoryRegion {
        let mut region = MemoryRegion::new(len, 64).unwrap();
        seed_canary(region.as_mut_slice(), DEST_SEED);
        region
    }

    #[test]
    fn test_zero_length_is_noop() {
        let mut dst = seeded(64);
        let before = dst.as_slice().to_vec();
        for offset in 0..16 {
            unsafe { word_fill(dst.as_mut_ptr().add(offset), 0x5a, 0) };
        }
        assert_eq!(dst.as_slice(), &before[..]);
    }

    #[test]
    fn test_fill_scenario() {
        let mut dst = seeded(512);
        let before = dst.as_slice().to_vec();

        let ret = unsafe { word_fill(dst.as_mut_ptr().add(17), 0xa5, 100) };

        assert_eq!(ret, unsafe { dst.as_mut_ptr().add(17) });
        let out = dst.as_slice();
        assert!(out[17..117].iter().all(|&b| b == 0xa5));
        assert_eq!(&out[..17], &before[..17]);
        assert_eq!(&out[117..], &before[117..]);
    }

    #[test]
    fn test_negative_sentinel_matches_ff() {
        let mut a = seeded(64);
        let mut b = seeded(64);
        unsafe {
            word_fill(a.as_mut_ptr(), -1, 10);
            word_fill(b.as_mut_ptr(), 0xff, 10);
        }
        assert_eq!(a.as_slice(), b.as_slice());
        assert!(a.as_slice()[..10].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn test_upper_sentinel_wraps_to_zero() {
        let mut a = seeded(64);
        let mut b = seeded(64);
        unsafe {
            word_fill(a.as_mut_ptr().add(3), 256, 40);
            word_fill(b.as_mut_ptr().add(3), 0, 40);
        }
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_all_alignments_and_lengths() {
        for offset in 0..2 * WORD_SIZE {
            for len in 0..80 {
                let mut dst = seeded(128);
                let before = dst.as_slice().to_vec();
                unsafe { word_fill(dst.as_mut_ptr().add(offset), 0x3c, len) };

                let out = dst.as_slice();
                assert!(
                    out[offset..offset + len].iter().all(|&b| b == 0x3c),
                    "offset {} len {}",
                    offset,
                    len
                );
                assert_eq!(&out[..offset], &before[..offset]);
                assert_eq!(&out[offset + len..], &before[offset + len..]);
            }
        }
    }

    #[test]
    fn test_fill_slice() {
        let mut buf = vec![1u8; 37];
        fill_slice(&mut buf[5..30], 0x1_07);
        assert!(buf[5..30].iter().all(|&b| b == 0x07));
        assert!(buf[..5].iter().chain(&buf[30..]).all(|&b| b == 1));
    }
}
