//! Reference overlap-safe move
//!
//! Bytes are moved a word at a time once the destination is word aligned.
//! The copy direction follows the address order of the two ranges so that an
//! overlapping move never overwrites source bytes it has not read yet:
//!
//! - `dest < src`: forward, low to high addresses
//! - otherwise: backward, high to low addresses
//!
//! Word-wise transfer is only possible when `dest` and `src` share the same
//! residue modulo the word size; otherwise the offsets never realign and the
//! whole transfer is done byte by byte.

use memprim_error::{MemError, MemResult};

use crate::candidate::Mover;
use crate::word::{WORD_MASK, WORD_SIZE, Word, word_residue};

/// Move `len` bytes from `src` to `dest`, tolerating overlap.
///
/// Returns `dest` so calls can be chained like the C routine.
///
/// # Safety
/// - `src` must be valid for reads of `len` bytes
/// - `dest` must be valid for writes of `len` bytes
/// - the ranges may overlap
pub unsafe fn word_move(dest: *mut u8, src: *const u8, len: usize) -> *mut u8 {
    if len == 0 || std::ptr::eq(dest.cast_const(), src) {
        return dest;
    }

    unsafe {
        if (dest as usize) < (src as usize) {
            move_forward(dest, src, len);
        } else {
            move_backward(dest, src, len);
        }
    }

    dest
}

/// Copy `len` non-overlapping bytes from `src` to `dest`.
///
/// A move is always a valid copy, so this shares the mover's algorithm.
///
/// # Safety
/// Same as [`word_move`]; in addition the ranges are expected not to overlap.
pub unsafe fn word_copy(dest: *mut u8, src: *const u8, len: usize) -> *mut u8 {
    unsafe { word_move(dest, src, len) }
}

unsafe fn move_forward(mut d: *mut u8, mut s: *const u8, mut count: usize) {
    unsafe {
        if word_residue(d as usize | s as usize) != 0 {
            // Misaligned residues never line up; short transfers are not worth aligning.
            let lead = if word_residue(d as usize ^ s as usize) != 0 || count < WORD_SIZE {
                count
            } else {
                WORD_SIZE - word_residue(d as usize)
            };

            count -= lead;
            for _ in 0..lead {
                *d = *s;
                d = d.add(1);
                s = s.add(1);
            }
        }

        for _ in 0..count / WORD_SIZE {
            d.cast::<Word>().write(s.cast::<Word>().read());
            d = d.add(WORD_SIZE);
            s = s.add(WORD_SIZE);
        }

        for _ in 0..count & WORD_MASK {
            *d = *s;
            d = d.add(1);
            s = s.add(1);
        }
    }
}

unsafe fn move_backward(dest: *mut u8, src: *const u8, mut count: usize) {
    unsafe {
        let mut d = dest.add(count);
        let mut s = src.add(count);

        if word_residue(d as usize | s as usize) != 0 {
            let trail = if word_residue(d as usize ^ s as usize) != 0 || count <= WORD_SIZE {
                count
            } else {
                word_residue(d as usize)
            };

            count -= trail;
            for _ in 0..trail {
                d = d.sub(1);
                s = s.sub(1);
                *d = *s;
            }
        }

        for _ in 0..count / WORD_SIZE {
            d = d.sub(WORD_SIZE);
            s = s.sub(WORD_SIZE);
            d.cast::<Word>().write(s.cast::<Word>().read());
        }

        for _ in 0..count & WORD_MASK {
            d = d.sub(1);
            s = s.sub(1);
            *d = *s;
        }
    }
}

/// Bounds-checked move inside one buffer (ranges may overlap).
pub fn move_within(
    buf: &mut [u8],
    src_offset: usize,
    dest_offset: usize,
    len: usize,
) -> MemResult<()> {
    MemError::check_bounds(src_offset, len, buf.len())?;
    MemError::check_bounds(dest_offset, len, buf.len())?;

    let base = buf.as_mut_ptr();
    // SAFETY: both ranges were checked against the buffer length
    unsafe {
        word_move(base.add(dest_offset), base.add(src_offset), len);
    }
    Ok(())
}

/// Bounds-checked copy between two distinct slices of equal length.
pub fn copy_into(dest: &mut [u8], src: &[u8]) -> MemResult<()> {
    if dest.len() != src.len() {
        return Err(MemError::LengthMismatch {
            dest: dest.len(),
            source_len: src.len(),
        });
    }

    // SAFETY: lengths match and `&mut` guarantees the slices are disjoint
    unsafe {
        word_copy(dest.as_mut_ptr(), src.as_ptr(), src.len());
    }
    Ok(())
}

/// The reference mover as a candidate value
#[derive(Debug, Clone, Copy, Default)]
pub struct WordMover;

impl Mover for WordMover {
    fn name(&self) -> &str {
        "reference"
    }

    unsafe fn move_bytes(&self, dest: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        unsafe { word_move(dest, src, len) }
    }
}
