//! Process heap as a backing region.
//!
//! C `malloc` has no portable size query, so this backing pairs with the
//! header-tracked adapter.

use std::ptr::NonNull;

use crate::backing::RegionAllocator;

/// Alignment glibc and musl guarantee for every `malloc` result.
pub const MALLOC_ALIGN: usize = 2 * std::mem::size_of::<usize>();

#[derive(Debug, Default, Clone, Copy)]
pub struct LibcRegion;

impl LibcRegion {
    /// Bytes actually usable in a block, which may exceed the request.
    ///
    /// # Safety
    ///
    /// `ptr` must be live and issued by this backing.
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    pub unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize {
        // SAFETY: caller guarantees ptr came from malloc.
        unsafe { libc::malloc_usable_size(ptr.as_ptr().cast()) }
    }
}

unsafe impl RegionAllocator for LibcRegion {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        // SAFETY: malloc has no preconditions. Zero is bumped to one so the
        // result is never the implementation-defined null.
        NonNull::new(unsafe { libc::malloc(size.max(1)) }.cast())
    }

    unsafe fn reallocate(&self, ptr: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
        // SAFETY: caller guarantees ptr came from malloc; realloc leaves it
        // intact when it returns null.
        NonNull::new(unsafe { libc::realloc(ptr.as_ptr().cast(), new_size.max(1)) }.cast())
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        // SAFETY: caller guarantees ptr came from malloc and is live.
        unsafe { libc::free(ptr.as_ptr().cast()) }
    }

    fn min_align(&self) -> usize {
        MALLOC_ALIGN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_malloc_aligned() {
        let region = LibcRegion;
        let p = region.allocate(24).unwrap();
        assert!(p.as_ptr().addr().is_multiple_of(MALLOC_ALIGN));
        let q = unsafe { region.reallocate(p, 4096) }.unwrap();
        unsafe { region.free(q) };
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn usable_size_covers_request() {
        let region = LibcRegion;
        let p = region.allocate(100).unwrap();
        assert!(unsafe { region.usable_size(p) } >= 100);
        unsafe { region.free(p) };
    }
}
