//! Candidate implementations of the move/fill contracts
//!
//! The validator and the benchmark driver never resolve an implementation at
//! build time: they take a `&dyn Mover` / `&dyn Filler`, so several
//! candidates can be checked in one run. Any routine with the C-shaped
//! signature can be wrapped with [`RoutineMover`] / [`RoutineFiller`].

use memprim_error::{MemError, MemResult};

use crate::word_filler::WordFiller;
use crate::word_mover::WordMover;

/// `memmove`/`memcpy` shaped routine
pub type MoveRoutine = unsafe fn(*mut u8, *const u8, usize) -> *mut u8;

/// `memset` shaped routine
pub type FillRoutine = unsafe fn(*mut u8, i32, usize) -> *mut u8;

/// A move-like transfer implementation.
pub trait Mover {
    /// Short name used in reports and on the command line
    fn name(&self) -> &str;

    /// Transfer `len` bytes from `src` to `dest` and return `dest`.
    ///
    /// # Safety
    /// - `src` must be valid for reads of `len` bytes
    /// - `dest` must be valid for writes of `len` bytes
    /// - the ranges may only overlap if [`Mover::handles_overlap`] is true
    unsafe fn move_bytes(&self, dest: *mut u8, src: *const u8, len: usize) -> *mut u8;

    /// Whether the implementation promises memmove semantics.
    fn handles_overlap(&self) -> bool {
        true
    }
}

/// A fill-like implementation.
pub trait Filler {
    fn name(&self) -> &str;

    /// Set `len` bytes at `dest` to `pattern & 0xFF` and return `dest`.
    ///
    /// # Safety
    /// `dest` must be valid for writes of `len` bytes.
    unsafe fn fill_bytes(&self, dest: *mut u8, pattern: i32, len: usize) -> *mut u8;
}

/// Forward byte-at-a-time copy.
///
/// # Safety
/// Same as `memcpy`: valid, non-overlapping ranges of `len` bytes.
pub unsafe fn byte_copy(dest: *mut u8, src: *const u8, len: usize) -> *mut u8 {
    let mut d = dest;
    let mut s = src;
    unsafe {
        for _ in 0..len {
            *d = *s;
            d = d.add(1);
            s = s.add(1);
        }
    }
    dest
}

/// Byte-at-a-time fill.
///
/// # Safety
/// `dest` must be valid for writes of `len` bytes.
pub unsafe fn byte_fill(dest: *mut u8, pattern: i32, len: usize) -> *mut u8 {
    let mut d = dest;
    unsafe {
        for _ in 0..len {
            *d = pattern as u8;
            d = d.add(1);
        }
    }
    dest
}

/// Copy through the standard library (`memmove` semantics).
///
/// # Safety
/// Valid ranges of `len` bytes; overlap allowed.
pub unsafe fn std_move(dest: *mut u8, src: *const u8, len: usize) -> *mut u8 {
    unsafe { std::ptr::copy(src, dest, len) };
    dest
}

/// Fill through the standard library (`memset` semantics).
///
/// # Safety
/// `dest` must be valid for writes of `len` bytes.
pub unsafe fn std_fill(dest: *mut u8, pattern: i32, len: usize) -> *mut u8 {
    unsafe { std::ptr::write_bytes(dest, pattern as u8, len) };
    dest
}

/// Simple forward byte loop, the slowest correct memcpy
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteMover;

impl Mover for ByteMover {
    fn name(&self) -> &str {
        "bytewise"
    }

    unsafe fn move_bytes(&self, dest: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        unsafe { byte_copy(dest, src, len) }
    }

    fn handles_overlap(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ByteFiller;

impl Filler for ByteFiller {
    fn name(&self) -> &str {
        "bytewise"
    }

    unsafe fn fill_bytes(&self, dest: *mut u8, pattern: i32, len: usize) -> *mut u8 {
        unsafe { byte_fill(dest, pattern, len) }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdMover;

impl Mover for StdMover {
    fn name(&self) -> &str {
        "std"
    }

    unsafe fn move_bytes(&self, dest: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        unsafe { std_move(dest, src, len) }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdFiller;

impl Filler for StdFiller {
    fn name(&self) -> &str {
        "std"
    }

    unsafe fn fill_bytes(&self, dest: *mut u8, pattern: i32, len: usize) -> *mut u8 {
        unsafe { std_fill(dest, pattern, len) }
    }
}

/// A mover that transfers nothing.
///
/// Only meaningful as the call-overhead baseline of the benchmark; it fails
/// validation for every non-empty length.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMover;

impl Mover for NullMover {
    fn name(&self) -> &str {
        "null"
    }

    unsafe fn move_bytes(&self, dest: *mut u8, _src: *const u8, _len: usize) -> *mut u8 {
        dest
    }
}

/// Adapter for an externally supplied move routine
#[derive(Debug, Clone)]
pub struct RoutineMover {
    name: String,
    routine: MoveRoutine,
    overlap: bool,
}

impl RoutineMover {
    /// Wrap a routine with memmove semantics.
    pub fn new(name: impl Into<String>, routine: MoveRoutine) -> Self {
        Self {
            name: name.into(),
            routine,
            overlap: true,
        }
    }

    /// Wrap a routine that only promises memcpy semantics.
    pub fn copy_only(name: impl Into<String>, routine: MoveRoutine) -> Self {
        Self {
            overlap: false,
            ..Self::new(name, routine)
        }
    }
}

impl Mover for RoutineMover {
    fn name(&self) -> &str {
        &self.name
    }

    unsafe fn move_bytes(&self, dest: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        unsafe { (self.routine)(dest, src, len) }
    }

    fn handles_overlap(&self) -> bool {
        self.overlap
    }
}

/// Adapter for an externally supplied fill routine
#[derive(Debug, Clone)]
pub struct RoutineFiller {
    name: String,
    routine: FillRoutine,
}

impl RoutineFiller {
    pub fn new(name: impl Into<String>, routine: FillRoutine) -> Self {
        Self {
            name: name.into(),
            routine,
        }
    }
}

impl Filler for RoutineFiller {
    fn name(&self) -> &str {
        &self.name
    }

    unsafe fn fill_bytes(&self, dest: *mut u8, pattern: i32, len: usize) -> *mut u8 {
        unsafe { (self.routine)(dest, pattern, len) }
    }
}

/// Names accepted by [`lookup_mover`]
pub const MOVER_NAMES: &[&str] = &["reference", "bytewise", "std", "simd", "null"];

/// Names accepted by [`lookup_filler`]
pub const FILLER_NAMES: &[&str] = &["reference", "bytewise", "std", "simd"];

/// Resolve a built-in mover by name.
pub fn lookup_mover(name: &str) -> MemResult<Box<dyn Mover>> {
    match name {
        "reference" => Ok(Box::new(WordMover)),
        "bytewise" => Ok(Box::new(ByteMover)),
        "std" => Ok(Box::new(StdMover)),
        "null" => Ok(Box::new(NullMover)),
        #[cfg(feature = "opt-simd")]
        "simd" => Ok(Box::new(crate::simd::SimdMover)),
        other => Err(MemError::UnknownCandidate(other.to_string())),
    }
}

/// Resolve a built-in filler by name.
pub fn lookup_filler(name: &str) -> MemResult<Box<dyn Filler>> {
    match name {
        "reference" => Ok(Box::new(WordFiller)),
        "bytewise" => Ok(Box::new(ByteFiller)),
        "std" => Ok(Box::new(StdFiller)),
        #[cfg(feature = "opt-simd")]
        "simd" => Ok(Box::new(crate::simd::SimdFiller)),
        other => Err(MemError::UnknownCandidate(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_names() {
        for name in MOVER_NAMES {
            #[cfg(not(feature = "opt-simd"))]
            if *name == "simd" {
                continue;
            }
            let mover = lookup_mover(name).unwrap();
            assert_eq!(mover.name(), *name);
        }
        for name in FILLER_NAMES {
            #[cfg(not(feature = "opt-simd"))]
            if *name == "simd" {
                continue;
            }
            let filler = lookup_filler(name).unwrap();
            assert_eq!(filler.name(), *name);
        }
    }

    #[test]
    fn test_lookup_unknown() {
        assert_eq!(
            lookup_mover("turbo").err(),
            Some(MemError::UnknownCandidate("turbo".to_string()))
        );
        assert!(lookup_filler("null").is_err());
    }

    #[test]
    fn test_overlap_capabilities() {
        assert!(WordMover.handles_overlap());
        assert!(StdMover.handles_overlap());
        assert!(!ByteMover.handles_overlap());
        assert!(!RoutineMover::copy_only("c", byte_copy).handles_overlap());
        assert!(RoutineMover::new("m", std_move).handles_overlap());
    }

    #[test]
    fn test_byte_routines() {
        let src = [9u8, 8, 7, 6, 5];
        let mut dst = [0u8; 5];
        let ret = unsafe { byte_copy(dst.as_mut_ptr(), src.as_ptr(), 5) };
        assert_eq!(ret, dst.as_mut_ptr());
        assert_eq!(dst, src);

        unsafe { byte_fill(dst.as_mut_ptr().add(1), -1, 3) };
        assert_eq!(dst, [9, 0xff, 0xff, 0xff, 5]);
    }

    #[test]
    fn test_routine_adapters_forward_calls() {
        let mover = RoutineMover::new("std-move", std_move);
        let filler = RoutineFiller::new("std-fill", std_fill);
        assert_eq!(mover.name(), "std-move");
        assert_eq!(filler.name(), "std-fill");

        let mut buf = [1u8, 2, 3, 4, 5, 6];
        unsafe {
            let base = buf.as_mut_ptr();
            mover.move_bytes(base.add(1), base, 4);
        }
        assert_eq!(buf, [1, 1, 2, 3, 4, 6]);

        unsafe { filler.fill_bytes(buf.as_mut_ptr(), 0x1ff, 2) };
        assert_eq!(&buf[..2], &[0xff, 0xff]);
    }

    #[test]
    fn test_null_mover_touches_nothing() {
        let src = [1u8; 8];
        let mut dst = [0u8; 8];
        let ret = unsafe { NullMover.move_bytes(dst.as_mut_ptr(), src.as_ptr(), 8) };
        assert_eq!(ret, dst.as_mut_ptr());
        assert_eq!(dst, [0u8; 8]);
    }
}
