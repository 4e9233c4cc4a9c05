//! Header-tracked adapter.
//!
//! Works on any backing, including ones with no size query. Each block is
//! over-allocated by the layout prefix and the requested size is stored in
//! the four bytes just before the payload.

use std::ptr::{self, NonNull};

use sizedalloc_core::header::decode_header;
use sizedalloc_core::{
    AdapterConfig, AdapterError, AllocationRecord, ConfigError, HEADER_WIDTH, HeaderLayout,
    RoundingPolicy, TrackingMode,
};

use super::{SizedAllocator, backing_ready};
use crate::backing::RegionAllocator;

pub struct HeaderTracked<B> {
    backing: B,
    layout: HeaderLayout,
    rounding: RoundingPolicy,
}

impl<B: RegionAllocator> HeaderTracked<B> {
    /// Default layout: 4-byte header padded to keep 8-byte payload alignment.
    pub fn new(backing: B) -> Result<Self, ConfigError> {
        Self::with_config(backing, &AdapterConfig::default())
    }

    /// Fails if the backing's alignment cannot carry the requested payload
    /// alignment through the prefix.
    pub fn with_config(backing: B, config: &AdapterConfig) -> Result<Self, ConfigError> {
        config.header.check_backing(backing.min_align())?;
        Ok(Self {
            backing,
            layout: config.header,
            rounding: config.rounding,
        })
    }

    #[must_use]
    pub fn layout(&self) -> HeaderLayout {
        self.layout
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    /// Backing block behind a payload.
    ///
    /// # Safety
    ///
    /// `payload` must have been produced by [`Self::place`].
    unsafe fn block_of(&self, payload: NonNull<u8>) -> NonNull<u8> {
        let addr = payload.as_ptr().addr();
        let back = addr - self.layout.true_start_of(addr);
        // SAFETY: payloads sit exactly `prefix` bytes into their block.
        unsafe { payload.sub(back) }
    }

    /// Write the size header into `block` and return the payload pointer.
    ///
    /// # Safety
    ///
    /// `block` must be valid for `prefix + requested` bytes.
    unsafe fn place(&self, block: NonNull<u8>, requested: usize) -> Option<NonNull<u8>> {
        let record = self.layout.record_at(block.as_ptr().addr(), requested)?;
        let header = record.header_bytes();
        // SAFETY: header_offset + HEADER_WIDTH == prefix, inside the block.
        // The header may be unaligned for a compact layout on a byte-aligned
        // backing, hence the byte copy.
        unsafe {
            ptr::copy_nonoverlapping(
                header.as_ptr(),
                block.as_ptr().add(record.header_offset()),
                HEADER_WIDTH,
            );
            Some(block.add(record.payload_offset()))
        }
    }

    /// Record for a live payload, recovered from its stored header.
    ///
    /// # Safety
    ///
    /// `payload` must be live and issued by this adapter.
    unsafe fn record_of(&self, payload: NonNull<u8>) -> AllocationRecord {
        let addr = payload.as_ptr().addr();
        let back = addr - self.layout.header_start_of(addr);
        let mut bytes = [0_u8; HEADER_WIDTH];
        // SAFETY: the header occupies the HEADER_WIDTH bytes before the payload.
        unsafe {
            ptr::copy_nonoverlapping(
                payload.as_ptr().sub(back),
                bytes.as_mut_ptr(),
                HEADER_WIDTH,
            );
        }
        self.layout.record_from_payload(addr, decode_header(bytes))
    }
}

impl<B: RegionAllocator> SizedAllocator for HeaderTracked<B> {
    fn tracking(&self) -> TrackingMode {
        TrackingMode::Header
    }

    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        let request = self.layout.backing_request(size)?;
        let block = self.backing.allocate(request)?;
        // SAFETY: block is valid for `request` = prefix + size bytes.
        match unsafe { self.place(block, size) } {
            Some(payload) => Some(payload),
            None => {
                // SAFETY: block came from the backing just above.
                unsafe { self.backing.free(block) };
                None
            }
        }
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        // SAFETY: caller guarantees ptr is a live payload of this adapter.
        unsafe { self.backing.free(self.block_of(ptr)) }
    }

    unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        let Some(payload) = ptr else {
            return self.allocate(new_size);
        };
        let request = self.layout.backing_request(new_size)?;
        // SAFETY: caller guarantees payload is live; the backing keeps the
        // old block intact if it cannot satisfy the request.
        unsafe {
            let moved = self.backing.reallocate(self.block_of(payload), request)?;
            // The backing copied the old header along with the payload; it
            // must describe the new size before the pointer is handed out.
            self.place(moved, new_size)
        }
    }

    unsafe fn size_of(&self, ptr: Option<NonNull<u8>>) -> usize {
        match ptr {
            None => 0,
            // SAFETY: caller guarantees ptr is a live payload of this adapter.
            Some(payload) => unsafe { self.record_of(payload).requested_size },
        }
    }

    fn round_up(&self, size: usize) -> usize {
        self.rounding.round_up(size)
    }

    fn init(&self) -> Result<(), AdapterError> {
        backing_ready(self.backing.is_ready())
    }
}

impl<B> std::fmt::Debug for HeaderTracked<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderTracked")
            .field("layout", &self.layout)
            .field("rounding", &self.rounding)
            .finish_non_exhaustive()
    }
}
