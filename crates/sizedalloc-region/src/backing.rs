//! Contract of the backing region allocator.
//!
//! Every backing offers allocate / reallocate / free. Size queries are split
//! into separate capability traits so each adapter states exactly what it
//! needs from its backing at compile time.

use std::ptr::NonNull;

/// Lower-level allocator managing one memory region.
///
/// Failure is reported as `None`, never retried.
///
/// # Safety
///
/// Implementations must hand out blocks valid for the requested size and
/// aligned to at least [`min_align`](Self::min_align). `reallocate` must keep
/// the first `min(old, new)` bytes and, when it fails, leave the original
/// block allocated and unchanged.
pub unsafe trait RegionAllocator {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// # Safety
    ///
    /// `ptr` must have been issued by this allocator and not yet freed.
    unsafe fn reallocate(&self, ptr: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>>;

    /// # Safety
    ///
    /// `ptr` must have been issued by this allocator and not yet freed.
    unsafe fn free(&self, ptr: NonNull<u8>);

    /// Alignment every returned block is guaranteed to have.
    fn min_align(&self) -> usize;

    /// False until the surrounding runtime has brought the region up.
    fn is_ready(&self) -> bool {
        true
    }
}

/// Backing that can report the size of any block it issued.
///
/// # Safety
///
/// `size_of` must never report more bytes than the block can hold.
pub unsafe trait AllocatorSizeQuery: RegionAllocator {
    /// # Safety
    ///
    /// `ptr` must be a live block issued by this allocator.
    unsafe fn size_of(&self, ptr: NonNull<u8>) -> usize;
}

/// Backing whose size query needs the pool that owns the block.
///
/// # Safety
///
/// `size_in` must never report more bytes than the block can hold.
pub unsafe trait PoolSizeQuery: RegionAllocator {
    /// Handle identifying one arena of this backing.
    type Pool: Copy + Send + Sync;

    /// # Safety
    ///
    /// `ptr` must be a live block issued from `pool`.
    unsafe fn size_in(&self, pool: Self::Pool, ptr: NonNull<u8>) -> usize;
}

unsafe impl<R: RegionAllocator + ?Sized> RegionAllocator for &R {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        (**self).allocate(size)
    }

    unsafe fn reallocate(&self, ptr: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).reallocate(ptr, new_size) }
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).free(ptr) }
    }

    fn min_align(&self) -> usize {
        (**self).min_align()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

unsafe impl<R: AllocatorSizeQuery + ?Sized> AllocatorSizeQuery for &R {
    unsafe fn size_of(&self, ptr: NonNull<u8>) -> usize {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).size_of(ptr) }
    }
}

unsafe impl<R: PoolSizeQuery + ?Sized> PoolSizeQuery for &R {
    type Pool = R::Pool;

    unsafe fn size_in(&self, pool: Self::Pool, ptr: NonNull<u8>) -> usize {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).size_in(pool, ptr) }
    }
}
