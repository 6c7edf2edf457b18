//! Aligned, owned working buffers
//!
//! A [`MemoryRegion`] is a fixed-capacity byte buffer whose base address is
//! aligned to a known boundary (64 bytes by default, one cache line). Trial
//! offsets are byte displacements from that base, so every alignment
//! residue the validator sweeps is reproducible run to run.

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::ptr::NonNull;

use memprim_error::{MemError, MemResult};

/// Default base alignment of working regions
pub const DEFAULT_REGION_ALIGN: usize = 64;

/// Owned, aligned, zero-initialised byte buffer.
pub struct MemoryRegion {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

impl MemoryRegion {
    /// Allocate `len` bytes aligned to `align`.
    ///
    /// The memory is zeroed on allocation, which also faults every page in
    /// before any timing or comparison runs against it.
    pub fn new(len: usize, align: usize) -> MemResult<Self> {
        // A zero-sized layout cannot be handed to the allocator.
        let size = len.max(1);
        let layout = Layout::from_size_align(size, align)
            .map_err(|_| MemError::InvalidLayout { size: len, align })?;

        // SAFETY: layout has a non-zero size
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(MemError::AllocationFailed { size: len, align })?;

        log::trace!("allocated region {:p}: {} bytes, align {}", raw, len, align);
        Ok(Self { ptr, len, layout })
    }

    /// Allocate with [`DEFAULT_REGION_ALIGN`].
    pub fn with_default_align(len: usize) -> MemResult<Self> {
        Self::new(len, DEFAULT_REGION_ALIGN)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn align(&self) -> usize {
        self.layout.align()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for len initialised bytes
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self gives exclusive access
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for MemoryRegion {
    fn drop(&mut self) {
        // SAFETY: ptr came from alloc_zeroed with this exact layout
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

impl std::fmt::Debug for MemoryRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRegion")
            .field("ptr", &self.ptr)
            .field("len", &self.len())
            .field("align", &self.align())
            .finish()
    }
}

// The region owns its allocation exclusively, like a Box<[u8]>.
unsafe impl Send for MemoryRegion {}
