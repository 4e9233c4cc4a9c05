//! Pass-through adapter bound to one pool of a multi-pool backing.

use std::ptr::NonNull;

use sizedalloc_core::{AdapterError, RoundingPolicy, TrackingMode};

use super::{SizedAllocator, backing_ready};
use crate::backing::PoolSizeQuery;

/// Like [`PassThrough`](super::PassThrough), but size queries go to the pool
/// chosen at construction. Every pointer it sees must come from that pool.
pub struct PoolScoped<B: PoolSizeQuery> {
    backing: B,
    pool: B::Pool,
    rounding: RoundingPolicy,
}

impl<B: PoolSizeQuery> PoolScoped<B> {
    pub fn new(backing: B, pool: B::Pool) -> Self {
        Self::with_rounding(backing, pool, RoundingPolicy::Identity)
    }

    pub fn with_rounding(backing: B, pool: B::Pool, rounding: RoundingPolicy) -> Self {
        Self {
            backing,
            pool,
            rounding,
        }
    }

    pub fn pool(&self) -> B::Pool {
        self.pool
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }
}

impl<B: PoolSizeQuery> SizedAllocator for PoolScoped<B> {
    fn tracking(&self) -> TrackingMode {
        TrackingMode::Pool
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
            // SAFETY: every pointer this adapter issued lives in `self.pool`.
            Some(ptr) => unsafe { self.backing.size_in(self.pool, ptr) },
        }
    }

    fn round_up(&self, size: usize) -> usize {
        self.rounding.round_up(size)
    }

    fn init(&self) -> Result<(), AdapterError> {
        backing_ready(self.backing.is_ready())
    }
}

impl<B: PoolSizeQuery> std::fmt::Debug for PoolScoped<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolScoped")
            .field("rounding", &self.rounding)
            .finish_non_exhaustive()
    }
}
