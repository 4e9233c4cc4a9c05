//! Pass-through adapter for backings with a global size query.

use std::ptr::NonNull;

use sizedalloc_core::{AdapterError, RoundingPolicy, TrackingMode};

use super::{SizedAllocator, backing_ready};
use crate::backing::AllocatorSizeQuery;

/// Forwards every call; pointers are the backing's own.
pub struct PassThrough<B> {
    backing: B,
    rounding: RoundingPolicy,
}

impl<B: AllocatorSizeQuery> PassThrough<B> {
    pub fn new(backing: B) -> Self {
        Self::with_rounding(backing, RoundingPolicy::Identity)
    }

    pub fn with_rounding(backing: B, rounding: RoundingPolicy) -> Self {
        Self { backing, rounding }
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }
}

impl<B: AllocatorSizeQuery> SizedAllocator for PassThrough<B> {
    fn tracking(&self) -> TrackingMode {
        TrackingMode::Allocator
    }

    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.backing.allocate(size)
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        // SAFETY: forwarded caller contract.
        unsafe { self.backing.free(ptr) }
    }

    unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        match ptr {
            None => self.backing.allocate(new_size),
            // SAFETY: forwarded caller contract.
            Some(ptr) => unsafe { self.backing.reallocate(ptr, new_size) },
        }
    }

    unsafe fn size_of(&self, ptr: Option<NonNull<u8>>) -> usize {
        match ptr {
            None => 0,
            // SAFETY: forwarded caller contract.
            Some(ptr) => unsafe { self.backing.size_of(ptr) },
        }
    }

    fn round_up(&self, size: usize) -> usize {
        self.rounding.round_up(size)
    }

    fn init(&self) -> Result<(), AdapterError> {
        backing_ready(self.backing.is_ready())
    }
}

impl<B> std::fmt::Debug for PassThrough<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassThrough")
            .field("rounding", &self.rounding)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracked::TrackedRegion;

    #[test]
    fn pointers_are_the_backings_own() {
        let region = TrackedRegion::new(1024);
        let adapter = PassThrough::new(&region);
        let p = adapter.allocate(64).unwrap();
        assert!(region.is_live(p.as_ptr()));
        assert_eq!(region.block_size(p.as_ptr()), Some(64));
        assert_eq!(region.stats().live_bytes, 64);
        unsafe { adapter.free(p) };
        assert!(!region.is_live(p.as_ptr()));
    }

    #[test]
    fn size_query_is_forwarded() {
        let region = TrackedRegion::new(1024);
        let adapter = PassThrough::new(&region);
        let p = adapter.allocate(33).unwrap();
        assert_eq!(unsafe { adapter.size_of(Some(p)) }, 33);
        assert_eq!(unsafe { adapter.size_of(None) }, 0);
        unsafe { adapter.free(p) };
    }

    #[test]
    fn rounding_policy_applies() {
        let region = TrackedRegion::new(1024);
        let adapter = PassThrough::with_rounding(&region, RoundingPolicy::Granule(8));
        assert_eq!(adapter.round_up(13), 16);
        assert_eq!(PassThrough::new(&region).round_up(13), 13);
    }
}
