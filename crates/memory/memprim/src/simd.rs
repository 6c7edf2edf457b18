//! SIMD candidate implementations
//!
//! Runtime-dispatched vector copy and fill routines. They are the kind of
//! hardware-accelerated candidate the validator exists to check: fast, but
//! with their own head/tail handling that has to match the reference byte
//! for byte.
//!
//! # Architecture Support
//! - **x86_64**: AVX2, SSE2
//! - **ARM64**: NEON
//! - **Fallback**: `copy_nonoverlapping` / `write_bytes`
//!
//! # Safety
//! The copy routines have memcpy semantics: source and destination ranges
//! must not overlap.

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::{vdupq_n_u8, vld1q_u8, vst1q_u8};
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::{
    __m128i, __m256i, _mm_loadu_si128, _mm_set1_epi8, _mm_storeu_si128, _mm256_loadu_si256,
    _mm256_set1_epi8, _mm256_storeu_si256,
};
use std::sync::atomic::{AtomicU8, Ordering};

use crate::candidate::{Filler, Mover};

/// SIMD feature detection result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(dead_code)] // variants are per-architecture
enum SimdFeature {
    /// No SIMD acceleration available
    None = 0,
    /// SSE2 available (128-bit)
    Sse2 = 1,
    /// AVX2 available (256-bit)
    Avx2 = 2,
    /// NEON available (128-bit)
    Neon = 3,
}

impl SimdFeature {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(SimdFeature::None),
            1 => Some(SimdFeature::Sse2),
            2 => Some(SimdFeature::Avx2),
            3 => Some(SimdFeature::Neon),
            _ => None,
        }
    }
}

const UNDETECTED: u8 = u8::MAX;

/// Cached after first detection to avoid repeated CPUID calls.
static SIMD_FEATURE: AtomicU8 = AtomicU8::new(UNDETECTED);

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        fn detect_simd_features() -> SimdFeature {
            if is_x86_feature_detected!("avx2") {
                SimdFeature::Avx2
            } else if is_x86_feature_detected!("sse2") {
                SimdFeature::Sse2
            } else {
                SimdFeature::None
            }
        }
    } else if #[cfg(target_arch = "aarch64")] {
        // NEON is always available on ARM64
        fn detect_simd_features() -> SimdFeature {
            SimdFeature::Neon
        }
    } else {
        fn detect_simd_features() -> SimdFeature {
            SimdFeature::None
        }
    }
}

#[inline]
fn simd_feature() -> SimdFeature {
    if let Some(cached) = SimdFeature::from_u8(SIMD_FEATURE.load(Ordering::Relaxed)) {
        return cached;
    }
    let detected = detect_simd_features();
    SIMD_FEATURE.store(detected as u8, Ordering::Relaxed);
    log::debug!("SIMD candidate dispatch: {:?}", detected);
    detected
}

/// Name of the active SIMD level, for reports
pub fn simd_feature_name() -> &'static str {
    match simd_feature() {
        SimdFeature::None => "None (fallback)",
        SimdFeature::Sse2 => "SSE2 (128-bit)",
        SimdFeature::Avx2 => "AVX2 (256-bit)",
        SimdFeature::Neon => "NEON (128-bit)",
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn copy_avx2(dst: *mut u8, src: *const u8, len: usize) {
    let mut i = 0;
    let avx2_end = len.saturating_sub(31);

    unsafe {
        while i < avx2_end {
            let vec = _mm256_loadu_si256(src.add(i).cast::<__m256i>());
            _mm256_storeu_si256(dst.add(i).cast::<__m256i>(), vec);
            i += 32;
        }

        if i < len {
            std::ptr::copy_nonoverlapping(src.add(i), dst.add(i), len - i);
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn copy_sse2(dst: *mut u8, src: *const u8, len: usize) {
    let mut i = 0;
    let sse2_end = len.saturating_sub(15);

    unsafe {
        while i < sse2_end {
            let vec = _mm_loadu_si128(src.add(i).cast::<__m128i>());
            _mm_storeu_si128(dst.add(i).cast::<__m128i>(), vec);
            i += 16;
        }

        if i < len {
            std::ptr::copy_nonoverlapping(src.add(i), dst.add(i), len - i);
        }
    }
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn copy_neon(dst: *mut u8, src: *const u8, len: usize) {
    let mut i = 0;
    // four q registers per iteration
    let neon_end = len - (len % 64);

    unsafe {
        while i < neon_end {
            let vec0 = vld1q_u8(src.add(i));
            let vec1 = vld1q_u8(src.add(i + 16));
            let vec2 = vld1q_u8(src.add(i + 32));
            let vec3 = vld1q_u8(src.add(i + 48));

            vst1q_u8(dst.add(i), vec0);
            vst1q_u8(dst.add(i + 16), vec1);
            vst1q_u8(dst.add(i + 32), vec2);
            vst1q_u8(dst.add(i + 48), vec3);
            i += 64;
        }

        if i < len {
            std::ptr::copy_nonoverlapping(src.add(i), dst.add(i), len - i);
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn fill_avx2(dst: *mut u8, value: u8, len: usize) {
    let mut offset = 0;

    unsafe {
        let fill_value = _mm256_set1_epi8(value as i8);
        while offset + 32 <= len {
            _mm256_storeu_si256(dst.add(offset).cast::<__m256i>(), fill_value);
            offset += 32;
        }

        if offset < len {
            std::ptr::write_bytes(dst.add(offset), value, len - offset);
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn fill_sse2(dst: *mut u8, value: u8, len: usize) {
    let mut offset = 0;

    unsafe {
        let fill_value = _mm_set1_epi8(value as i8);
        while offset + 16 <= len {
            _mm_storeu_si128(dst.add(offset).cast::<__m128i>(), fill_value);
            offset += 16;
        }

        if offset < len {
            std::ptr::write_bytes(dst.add(offset), value, len - offset);
        }
    }
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn fill_neon(dst: *mut u8, value: u8, len: usize) {
    let mut offset = 0;

    unsafe {
        let fill_value = vdupq_n_u8(value);
        while offset + 16 <= len {
            vst1q_u8(dst.add(offset), fill_value);
            offset += 16;
        }

        if offset < len {
            std::ptr::write_bytes(dst.add(offset), value, len - offset);
        }
    }
}

/// Vector copy with runtime dispatch.
///
/// # Safety
/// - `src` valid for reads and `dst` valid for writes of `len` bytes
/// - the ranges must not overlap
pub unsafe fn simd_copy(dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
    if len == 0 {
        return dst;
    }

    unsafe {
        match simd_feature() {
            #[cfg(target_arch = "x86_64")]
            SimdFeature::Avx2 => copy_avx2(dst, src, len),
            #[cfg(target_arch = "x86_64")]
            SimdFeature::Sse2 => copy_sse2(dst, src, len),
            #[cfg(target_arch = "aarch64")]
            SimdFeature::Neon => copy_neon(dst, src, len),
            _ => std::ptr::copy_nonoverlapping(src, dst, len),
        }
    }

    dst
}

/// Vector fill with runtime dispatch; only the low byte of `pattern` is used.
///
/// # Safety
/// `dst` must be valid for writes of `len` bytes.
pub unsafe fn simd_fill(dst: *mut u8, pattern: i32, len: usize) -> *mut u8 {
    let value = pattern as u8;
    if len == 0 {
        return dst;
    }

    unsafe {
        match simd_feature() {
            #[cfg(target_arch = "x86_64")]
            SimdFeature::Avx2 => fill_avx2(dst, value, len),
            #[cfg(target_arch = "x86_64")]
            SimdFeature::Sse2 => fill_sse2(dst, value, len),
            #[cfg(target_arch = "aarch64")]
            SimdFeature::Neon => fill_neon(dst, value, len),
            _ => std::ptr::write_bytes(dst, value, len),
        }
    }

    dst
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimdMover;

impl Mover for SimdMover {
    fn name(&self) -> &str {
        "simd"
    }

    unsafe fn move_bytes(&self, dest: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        unsafe { simd_copy(dest, src, len) }
    }

    fn handles_overlap(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimdFiller;

impl Filler for SimdFiller {
    fn name(&self) -> &str {
        "simd"
    }

    unsafe fn fill_bytes(&self, dest: *mut u8, pattern: i32, len: usize) -> *mut u8 {
        unsafe { simd_fill(dest, pattern, len) }
    }
}
