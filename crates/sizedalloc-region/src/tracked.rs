//! Capacity-bounded host region with exact size tracking.
//!
//! Stands in for an external memory region on hosted targets. Blocks come
//! from the global allocator; the region keeps a table of every live block
//! and its requested size, so it can answer both the global and the
//! pool-scoped size query.
//!
//! Thread-safe via `parking_lot::Mutex`.

use parking_lot::Mutex;
use sizedalloc_core::ConfigError;
use std::alloc::{self, Layout};
use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::backing::{AllocatorSizeQuery, PoolSizeQuery, RegionAllocator};

/// Block alignment of [`TrackedRegion::new`].
pub const DEFAULT_REGION_ALIGN: usize = 8;

/// Identifier of the pool a region represents.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolId(pub u32);

/// Counters kept by a [`TrackedRegion`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegionStats {
    pub live_allocations: usize,
    pub live_bytes: usize,
    /// High-water mark of `live_bytes`.
    pub peak_bytes: usize,
    pub allocations: u64,
    pub reallocations: u64,
    pub frees: u64,
    /// Requests refused for lack of capacity.
    pub exhausted: u64,
    /// Frees of pointers this region never issued (ignored).
    pub foreign_frees: u64,
}

struct RegionState {
    /// Block address (provenance exposed) -> requested size.
    live: HashMap<usize, usize>,
    stats: RegionStats,
}

impl RegionState {
    fn charge(&mut self, live_bytes: usize) {
        self.stats.live_bytes = live_bytes;
        self.stats.peak_bytes = self.stats.peak_bytes.max(live_bytes);
        self.stats.live_allocations = self.live.len();
    }
}

pub struct TrackedRegion {
    pool: PoolId,
    capacity: usize,
    align: usize,
    online: AtomicBool,
    state: Mutex<RegionState>,
}

impl TrackedRegion {
    /// Online region holding at most `capacity` requested bytes at a time.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::from_parts(capacity, DEFAULT_REGION_ALIGN)
    }

    /// `align` is raised to the next power of two; fails when there is none
    /// in `usize`.
    pub fn with_align(capacity: usize, align: usize) -> Result<Self, ConfigError> {
        let align = align
            .max(1)
            .checked_next_power_of_two()
            .ok_or(ConfigError::AlignmentTooLarge(align))?;
        Ok(Self::from_parts(capacity, align))
    }

    fn from_parts(capacity: usize, align: usize) -> Self {
        Self {
            pool: PoolId::default(),
            capacity,
            align,
            online: AtomicBool::new(true),
            state: Mutex::new(RegionState {
                live: HashMap::new(),
                stats: RegionStats::default(),
            }),
        }
    }

    /// Region that refuses every request until [`bring_online`](Self::bring_online).
    #[must_use]
    pub fn offline(capacity: usize) -> Self {
        let region = Self::new(capacity);
        region.online.store(false, Ordering::Release);
        region
    }

    #[must_use]
    pub fn in_pool(mut self, pool: PoolId) -> Self {
        self.pool = pool;
        self
    }

    pub fn bring_online(&self) {
        self.online.store(true, Ordering::Release);
    }

    pub fn take_offline(&self) {
        self.online.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn stats(&self) -> RegionStats {
        self.state.lock().stats
    }

    #[must_use]
    pub fn is_live(&self, ptr: *const u8) -> bool {
        self.state.lock().live.contains_key(&ptr.addr())
    }

    /// Requested size of the live block starting at `ptr`.
    #[must_use]
    pub fn block_size(&self, ptr: *const u8) -> Option<usize> {
        self.state.lock().live.get(&ptr.addr()).copied()
    }

    fn layout_for(&self, size: usize) -> Option<Layout> {
        Layout::from_size_align(size.max(1), self.align).ok()
    }
}

unsafe impl RegionAllocator for TrackedRegion {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        if !self.is_ready() {
            return None;
        }
        let mut state = self.state.lock();
        let projected = state
            .stats
            .live_bytes
            .checked_add(size)
            .filter(|&total| total <= self.capacity);
        let (Some(projected), Some(layout)) = (projected, self.layout_for(size)) else {
            state.stats.exhausted += 1;
            return None;
        };
        // SAFETY: layout has non-zero size.
        let Some(block) = NonNull::new(unsafe { alloc::alloc(layout) }) else {
            state.stats.exhausted += 1;
            return None;
        };
        state.live.insert(block.as_ptr().expose_provenance(), size);
        state.stats.allocations += 1;
        state.charge(projected);
        Some(block)
    }

    unsafe fn reallocate(&self, ptr: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
        if !self.is_ready() {
            return None;
        }
        let mut state = self.state.lock();
        let addr = ptr.as_ptr().addr();
        let old_size = *state.live.get(&addr)?;
        let projected = (state.stats.live_bytes - old_size)
            .checked_add(new_size)
            .filter(|&total| total <= self.capacity);
        let (Some(projected), Some(old_layout), Some(_)) = (
            projected,
            self.layout_for(old_size),
            self.layout_for(new_size),
        ) else {
            state.stats.exhausted += 1;
            return None;
        };
        // SAFETY: ptr is live in this region and was allocated with
        // old_layout; the new size was validated as a layout above.
        let raw = unsafe { alloc::realloc(ptr.as_ptr(), old_layout, new_size.max(1)) };
        let Some(moved) = NonNull::new(raw) else {
            state.stats.exhausted += 1;
            return None;
        };
        state.live.remove(&addr);
        state.live.insert(moved.as_ptr().expose_provenance(), new_size);
        state.stats.reallocations += 1;
        state.charge(projected);
        Some(moved)
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        let mut state = self.state.lock();
        let Some(size) = state.live.remove(&ptr.as_ptr().addr()) else {
            state.stats.foreign_frees += 1;
            return;
        };
        if let Some(layout) = self.layout_for(size) {
            // SAFETY: the block was live and allocated with this layout.
            unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
        }
        state.stats.frees += 1;
        let live_bytes = state.stats.live_bytes - size;
        state.charge(live_bytes);
    }

    fn min_align(&self) -> usize {
        self.align
    }

    fn is_ready(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }
}

unsafe impl AllocatorSizeQuery for TrackedRegion {
    unsafe fn size_of(&self, ptr: NonNull<u8>) -> usize {
        self.block_size(ptr.as_ptr()).unwrap_or(0)
    }
}

unsafe impl PoolSizeQuery for TrackedRegion {
    type Pool = PoolId;

    unsafe fn size_in(&self, pool: PoolId, ptr: NonNull<u8>) -> usize {
        if pool != self.pool {
            return 0;
        }
        self.block_size(ptr.as_ptr()).unwrap_or(0)
    }
}

impl Drop for TrackedRegion {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for (addr, size) in state.live.drain() {
            if let Ok(layout) = Layout::from_size_align(size.max(1), self.align) {
                // SAFETY: every entry in `live` is an outstanding block of
                // this region allocated with exactly this layout.
                unsafe { alloc::dealloc(std::ptr::with_exposed_provenance_mut(addr), layout) };
            }
        }
    }
}

impl std::fmt::Debug for TrackedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedRegion")
            .field("pool", &self.pool)
            .field("capacity", &self.capacity)
            .field("align", &self.align)
            .field("online", &self.is_ready())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_enforced() {
        let region = TrackedRegion::new(100);
        let a = region.allocate(60).unwrap();
        assert!(region.allocate(41).is_none());
        assert_eq!(region.stats().exhausted, 1);
        let b = region.allocate(40).unwrap();
        assert_eq!(region.stats().live_bytes, 100);
        unsafe {
            region.free(a);
            region.free(b);
        }
        let stats = region.stats();
        assert_eq!(stats.live_bytes, 0);
        assert_eq!(stats.peak_bytes, 100);
        assert_eq!(stats.frees, 2);
    }

    #[test]
    fn failed_realloc_keeps_block() {
        let region = TrackedRegion::new(100);
        let a = region.allocate(50).unwrap();
        unsafe { a.as_ptr().write_bytes(7, 50) };
        assert!(unsafe { region.reallocate(a, 200) }.is_none());
        assert_eq!(region.block_size(a.as_ptr()), Some(50));
        assert_eq!(unsafe { *a.as_ptr().add(49) }, 7);
        unsafe { region.free(a) };
    }

    #[test]
    fn realloc_tracks_new_size() {
        let region = TrackedRegion::new(1000);
        let a = region.allocate(10).unwrap();
        let b = unsafe { region.reallocate(a, 500) }.unwrap();
        assert_eq!(region.block_size(b.as_ptr()), Some(500));
        assert_eq!(region.stats().live_bytes, 500);
        assert_eq!(region.stats().reallocations, 1);
        unsafe { region.free(b) };
    }

    #[test]
    fn foreign_pointers_are_ignored() {
        let region = TrackedRegion::new(100);
        let mut local = [0_u8; 4];
        let foreign = NonNull::new(local.as_mut_ptr()).unwrap();
        unsafe { region.free(foreign) };
        assert!(unsafe { region.reallocate(foreign, 2) }.is_none());
        assert_eq!(region.stats().foreign_frees, 1);
        assert_eq!(unsafe { AllocatorSizeQuery::size_of(&region, foreign) }, 0);
    }

    #[test]
    fn offline_region_refuses_until_online() {
        let region = TrackedRegion::offline(64);
        assert!(!region.is_ready());
        assert!(region.allocate(8).is_none());
        region.bring_online();
        let p = region.allocate(8).unwrap();
        unsafe { region.free(p) };
    }

    #[test]
    fn blocks_honour_alignment() {
        let region = TrackedRegion::with_align(4096, 24).unwrap();
        assert_eq!(region.min_align(), 32);
        let p = region.allocate(3).unwrap();
        assert!(p.as_ptr().addr().is_multiple_of(32));
        unsafe { region.free(p) };
    }

    #[test]
    fn unrepresentable_alignment_is_rejected() {
        let top = 1_usize << (usize::BITS - 1);
        assert_eq!(TrackedRegion::with_align(64, top).unwrap().min_align(), top);
        assert_eq!(
            TrackedRegion::with_align(64, top + 1).unwrap_err(),
            ConfigError::AlignmentTooLarge(top + 1)
        );
        assert_eq!(
            TrackedRegion::with_align(64, usize::MAX).unwrap_err(),
            ConfigError::AlignmentTooLarge(usize::MAX)
        );
        assert_eq!(TrackedRegion::with_align(64, 0).unwrap().min_align(), 1);
    }

    #[test]
    fn drop_releases_outstanding_blocks() {
        let region = TrackedRegion::new(1024);
        let _ = region.allocate(16).unwrap();
        let _ = region.allocate(0).unwrap();
        assert_eq!(region.stats().live_allocations, 2);
        drop(region);
    }
}
