//! Board-specific backing regions.
//!
//! Bindings only; the symbols are provided by the board support package the
//! final firmware links against.

#[cfg(any(feature = "teensy", feature = "esp-idf"))]
use std::ffi::c_void;
#[cfg(any(feature = "teensy", feature = "esp-idf"))]
use std::ptr::NonNull;

#[cfg(any(feature = "teensy", feature = "esp-idf"))]
use crate::backing::RegionAllocator;
#[cfg(feature = "esp-idf")]
use crate::backing::{AllocatorSizeQuery, PoolSizeQuery};

#[cfg(feature = "teensy")]
pub use teensy::ExtmemRegion;

#[cfg(feature = "esp-idf")]
pub use esp_idf::{
    HeapCapsRegion, MALLOC_CAP_8BIT, MALLOC_CAP_SPIRAM, MultiHeapHandle, MultiHeapRegion,
};

#[cfg(feature = "teensy")]
mod teensy {
    use super::*;

    unsafe extern "C" {
        fn extmem_malloc(size: usize) -> *mut c_void;
        fn extmem_realloc(ptr: *mut c_void, size: usize) -> *mut c_void;
        fn extmem_free(ptr: *mut c_void);
    }

    /// Teensy 4.1 external PSRAM (falls back to internal RAM when no chip
    /// is fitted). No size query: use with the header-tracked adapter and
    /// a compact header.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct ExtmemRegion;

    unsafe impl RegionAllocator for ExtmemRegion {
        fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
            // SAFETY: extmem_malloc has no preconditions.
            NonNull::new(unsafe { extmem_malloc(size) }.cast())
        }

        unsafe fn reallocate(&self, ptr: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
            // SAFETY: caller guarantees ptr came from extmem_malloc.
            NonNull::new(unsafe { extmem_realloc(ptr.as_ptr().cast(), new_size) }.cast())
        }

        unsafe fn free(&self, ptr: NonNull<u8>) {
            // SAFETY: caller guarantees ptr came from extmem_malloc.
            unsafe { extmem_free(ptr.as_ptr().cast()) }
        }

        /// smalloc, behind `extmem_malloc`, places a 12-byte block header in
        /// front of each allocation on this 32-bit target, so only word
        /// alignment is guaranteed. Pair with [`HeaderLayout::compact`].
        ///
        /// [`HeaderLayout::compact`]: sizedalloc_core::HeaderLayout::compact
        fn min_align(&self) -> usize {
            4
        }
    }
}

#[cfg(feature = "esp-idf")]
mod esp_idf {
    use super::*;

    /// `MALLOC_CAP_SPIRAM`
    pub const MALLOC_CAP_SPIRAM: u32 = 1 << 10;
    /// `MALLOC_CAP_8BIT`
    pub const MALLOC_CAP_8BIT: u32 = 1 << 2;

    unsafe extern "C" {
        fn heap_caps_malloc(size: usize, caps: u32) -> *mut c_void;
        fn heap_caps_realloc(ptr: *mut c_void, size: usize, caps: u32) -> *mut c_void;
        fn heap_caps_free(ptr: *mut c_void);
        fn heap_caps_get_allocated_size(ptr: *mut c_void) -> usize;

        fn multi_heap_malloc(heap: *mut c_void, size: usize) -> *mut c_void;
        fn multi_heap_realloc(heap: *mut c_void, ptr: *mut c_void, size: usize) -> *mut c_void;
        fn multi_heap_free(heap: *mut c_void, ptr: *mut c_void);
        fn multi_heap_get_allocated_size(heap: *mut c_void, ptr: *mut c_void) -> usize;
    }

    /// Capability-selected heap with a global size query.
    #[derive(Debug, Clone, Copy)]
    pub struct HeapCapsRegion {
        caps: u32,
    }

    impl HeapCapsRegion {
        pub const fn new(caps: u32) -> Self {
            Self { caps }
        }

        /// External SPI RAM, byte addressable.
        pub const fn spiram() -> Self {
            Self::new(MALLOC_CAP_SPIRAM | MALLOC_CAP_8BIT)
        }
    }

    unsafe impl RegionAllocator for HeapCapsRegion {
        fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
            // SAFETY: heap_caps_malloc has no preconditions.
            NonNull::new(unsafe { heap_caps_malloc(size, self.caps) }.cast())
        }

        unsafe fn reallocate(&self, ptr: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
            // SAFETY: caller guarantees ptr came from heap_caps_malloc.
            NonNull::new(unsafe { heap_caps_realloc(ptr.as_ptr().cast(), new_size, self.caps) }.cast())
        }

        unsafe fn free(&self, ptr: NonNull<u8>) {
            // SAFETY: caller guarantees ptr came from heap_caps_malloc.
            unsafe { heap_caps_free(ptr.as_ptr().cast()) }
        }

        fn min_align(&self) -> usize {
            4
        }
    }

    unsafe impl AllocatorSizeQuery for HeapCapsRegion {
        unsafe fn size_of(&self, ptr: NonNull<u8>) -> usize {
            // SAFETY: caller guarantees ptr is a live heap_caps block.
            unsafe { heap_caps_get_allocated_size(ptr.as_ptr().cast()) }
        }
    }

    /// Opaque `multi_heap_handle_t`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MultiHeapHandle(NonNull<c_void>);

    // SAFETY: the handle is an opaque token; multi_heap_* locks internally.
    unsafe impl Send for MultiHeapHandle {}
    unsafe impl Sync for MultiHeapHandle {}

    impl MultiHeapHandle {
        /// # Safety
        ///
        /// `raw` must come from `multi_heap_register` and outlive every
        /// region built on it.
        pub unsafe fn from_raw(raw: *mut c_void) -> Option<Self> {
            NonNull::new(raw).map(Self)
        }

        fn as_ptr(self) -> *mut c_void {
            self.0.as_ptr()
        }
    }

    /// One registered `multi_heap` arena.
    #[derive(Debug, Clone, Copy)]
    pub struct MultiHeapRegion {
        heap: MultiHeapHandle,
    }

    impl MultiHeapRegion {
        pub const fn new(heap: MultiHeapHandle) -> Self {
            Self { heap }
        }

        pub const fn handle(&self) -> MultiHeapHandle {
            self.heap
        }
    }

    unsafe impl RegionAllocator for MultiHeapRegion {
        fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
            // SAFETY: the handle is a registered heap.
            NonNull::new(unsafe { multi_heap_malloc(self.heap.as_ptr(), size) }.cast())
        }

        unsafe fn reallocate(&self, ptr: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
            // SAFETY: caller guarantees ptr came from this heap.
            NonNull::new(
                unsafe { multi_heap_realloc(self.heap.as_ptr(), ptr.as_ptr().cast(), new_size) }
                    .cast(),
            )
        }

        unsafe fn free(&self, ptr: NonNull<u8>) {
            // SAFETY: caller guarantees ptr came from this heap.
            unsafe { multi_heap_free(self.heap.as_ptr(), ptr.as_ptr().cast()) }
        }

        fn min_align(&self) -> usize {
            4
        }
    }

    unsafe impl PoolSizeQuery for MultiHeapRegion {
        type Pool = MultiHeapHandle;

        unsafe fn size_in(&self, pool: MultiHeapHandle, ptr: NonNull<u8>) -> usize {
            // SAFETY: caller guarantees ptr is a live block of `pool`.
            unsafe { multi_heap_get_allocated_size(pool.as_ptr(), ptr.as_ptr().cast()) }
        }
    }
}
