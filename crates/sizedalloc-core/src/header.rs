//! Size-header placement for header-tracked allocations.
//!
//! A header-tracked block is laid out as
//!
//! ```text
//! true_start                         payload_start
//! |<------------- prefix ------------>|<---- requested_size ---->|
//! |   padding   |  size header (u32)  |         payload          |
//! ```
//!
//! The header always occupies the [`HEADER_WIDTH`] bytes immediately before
//! the payload. The prefix is the header width padded up to the payload
//! alignment, so a backing allocator that hands out `A`-aligned blocks still
//! yields `A`-aligned payloads.
//!
//! Everything here is plain address arithmetic; the adapters in
//! `sizedalloc-region` do the actual reads and writes.

use crate::error::ConfigError;

/// Integer type stored in the size header.
pub type SizeHeader = u32;

/// Width in bytes of the stored size header.
pub const HEADER_WIDTH: usize = std::mem::size_of::<SizeHeader>();

/// Payload alignment of [`HeaderLayout::default`].
pub const DEFAULT_PAYLOAD_ALIGN: usize = 8;

/// Largest request a size header can describe.
pub const MAX_REQUEST: usize = SizeHeader::MAX as usize;

/// Geometry of the hidden prefix in front of every header-tracked payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeaderLayout {
    prefix: usize,
    align: usize,
}

impl HeaderLayout {
    /// Bare 4-byte header with no padding.
    ///
    /// Payloads are only guaranteed 4-byte alignment, even when the backing
    /// allocator returns more strictly aligned blocks.
    #[must_use]
    pub const fn compact() -> Self {
        Self {
            prefix: HEADER_WIDTH,
            align: HEADER_WIDTH,
        }
    }

    /// Header padded so payloads keep `align`-byte alignment.
    ///
    /// Alignments below the header width are raised to the header width.
    pub fn aligned(align: usize) -> Result<Self, ConfigError> {
        if !align.is_power_of_two() {
            return Err(ConfigError::AlignmentNotPowerOfTwo(align));
        }
        let align = align.max(HEADER_WIDTH);
        Ok(Self {
            prefix: align,
            align,
        })
    }

    /// Distance between the backing block and the payload.
    #[must_use]
    pub const fn prefix(self) -> usize {
        self.prefix
    }

    /// Payload alignment this layout is meant to preserve.
    #[must_use]
    pub const fn payload_align(self) -> usize {
        self.align
    }

    /// Alignment payloads actually get on a backing that returns
    /// `backing_align`-aligned blocks.
    #[must_use]
    pub fn effective_align(self, backing_align: usize) -> usize {
        let prefix_align = 1_usize << self.prefix.trailing_zeros();
        backing_align.min(prefix_align)
    }

    /// Fails when a backing with `backing_align` cannot deliver this layout's
    /// payload alignment.
    pub fn check_backing(self, backing_align: usize) -> Result<(), ConfigError> {
        if !backing_align.is_power_of_two() {
            return Err(ConfigError::AlignmentNotPowerOfTwo(backing_align));
        }
        if self.effective_align(backing_align) < self.align {
            return Err(ConfigError::AlignmentUnsatisfiable {
                required: self.align,
                backing: backing_align,
            });
        }
        Ok(())
    }

    /// Bytes to request from the backing allocator for a `requested`-byte
    /// payload, or `None` when the size cannot be described by the header.
    #[must_use]
    pub fn backing_request(self, requested: usize) -> Option<usize> {
        if requested > MAX_REQUEST {
            return None;
        }
        requested.checked_add(self.prefix)
    }

    /// Record for a block the backing allocator placed at `true_start`.
    #[must_use]
    pub fn record_at(self, true_start: usize, requested: usize) -> Option<AllocationRecord> {
        self.backing_request(requested)?;
        let payload_start = true_start.checked_add(self.prefix)?;
        Some(AllocationRecord {
            true_start,
            payload_start,
            requested_size: requested,
        })
    }

    /// Record recovered from a payload address and the header stored before it.
    #[must_use]
    pub fn record_from_payload(self, payload_start: usize, header: SizeHeader) -> AllocationRecord {
        AllocationRecord {
            true_start: self.true_start_of(payload_start),
            payload_start,
            requested_size: header as usize,
        }
    }

    /// Backing block address for a payload issued under this layout.
    #[must_use]
    pub const fn true_start_of(self, payload_start: usize) -> usize {
        payload_start.wrapping_sub(self.prefix)
    }

    /// Address of the size header for a payload issued under this layout.
    #[must_use]
    pub const fn header_start_of(self, payload_start: usize) -> usize {
        payload_start.wrapping_sub(HEADER_WIDTH)
    }
}

impl Default for HeaderLayout {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PAYLOAD_ALIGN,
            align: DEFAULT_PAYLOAD_ALIGN,
        }
    }
}

/// Relationship between a pointer handed to the consumer and its backing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationRecord {
    /// Address the backing allocator returned.
    pub true_start: usize,
    /// Address handed to the consumer.
    pub payload_start: usize,
    /// Size the consumer asked for.
    pub requested_size: usize,
}

impl AllocationRecord {
    #[must_use]
    pub const fn payload_offset(&self) -> usize {
        self.payload_start - self.true_start
    }

    /// Offset of the size header from `true_start`.
    #[must_use]
    pub const fn header_offset(&self) -> usize {
        self.payload_offset() - HEADER_WIDTH
    }

    /// Total bytes reserved from the backing allocator.
    #[must_use]
    pub const fn backing_size(&self) -> usize {
        self.payload_offset() + self.requested_size
    }

    /// Header bytes as stored in memory (native endian).
    #[must_use]
    pub fn header_bytes(&self) -> [u8; HEADER_WIDTH] {
        // record_at rejects requests above MAX_REQUEST.
        (self.requested_size as SizeHeader).to_ne_bytes()
    }

    #[must_use]
    pub fn is_payload_aligned(&self, align: usize) -> bool {
        self.payload_start.is_multiple_of(align)
    }
}

/// Decode header bytes read from memory.
#[must_use]
pub fn decode_header(bytes: [u8; HEADER_WIDTH]) -> SizeHeader {
    SizeHeader::from_ne_bytes(bytes)
}
