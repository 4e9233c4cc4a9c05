//! Sized allocator adapters.
//!
//! An adapter turns a backing [`RegionAllocator`](crate::backing::RegionAllocator)
//! into the seven-operation contract the consumer expects: allocate, free,
//! reallocate, size-of, round-up, init and shutdown. Three strategies exist,
//! one per way the size of a live block can be recovered:
//!
//! - [`HeaderTracked`]: a hidden size header in front of every payload.
//! - [`PassThrough`]: the backing reports sizes itself.
//! - [`PoolScoped`]: the backing reports sizes for a fixed pool.

mod header;
mod pass_through;
mod pool;

use std::ptr::NonNull;

use sizedalloc_core::{AdapterError, TrackingMode};

pub use header::HeaderTracked;
pub use pass_through::PassThrough;
pub use pool::PoolScoped;

/// The contract the consumer's memory table is built on.
///
/// Pointers passed back in must come from the same adapter instance. Sizes
/// are byte counts; the C layer deals with the consumer's signed `int`.
pub trait SizedAllocator {
    /// How this adapter recovers block sizes.
    fn tracking(&self) -> TrackingMode;

    /// `None` when the backing is exhausted or the size is unrepresentable.
    /// A zero-byte request yields a valid, freeable pointer.
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// # Safety
    ///
    /// `ptr` must be live and issued by this adapter.
    unsafe fn free(&self, ptr: NonNull<u8>);

    /// Resize a block. `None` as input behaves as [`allocate`](Self::allocate).
    /// On failure the old block is untouched and still owned by the caller.
    ///
    /// # Safety
    ///
    /// A `Some` pointer must be live and issued by this adapter.
    unsafe fn reallocate(&self, ptr: Option<NonNull<u8>>, new_size: usize)
    -> Option<NonNull<u8>>;

    /// Usable size of a live block, 0 for `None`.
    ///
    /// # Safety
    ///
    /// A `Some` pointer must be live and issued by this adapter.
    unsafe fn size_of(&self, ptr: Option<NonNull<u8>>) -> usize;

    /// Size that a request for `size` bytes would actually be given.
    fn round_up(&self, size: usize) -> usize;

    /// Succeeds once the backing region is usable.
    fn init(&self) -> Result<(), AdapterError>;

    /// Release adapter-owned resources. Blocks still live are left alone.
    fn shutdown(&self) {}
}

pub(crate) fn backing_ready(ready: bool) -> Result<(), AdapterError> {
    if ready {
        Ok(())
    } else {
        Err(AdapterError::BackingUnavailable)
    }
}
