//! Contract tests shared by every adapter variant.
//!
//! Each variant is driven through the same deterministic op sequence against
//! a shadow model of live blocks, checking after every step that:
//! - `size_of` reports exactly the last requested size,
//! - `round_up(n) >= n` and `size_of(allocate(n)) <= round_up(n)`,
//! - payload bytes survive reallocation up to the smaller size,
//! - live payloads never overlap,
//! - every backing byte is returned once all blocks are freed.

use std::ptr::NonNull;

use sizedalloc_core::{AdapterConfig, AdapterError, HeaderLayout, RoundingPolicy, TrackingMode};
use sizedalloc_region::{
    HeaderTracked, LibcRegion, PassThrough, PoolId, PoolScoped, SizedAllocator, TrackedRegion,
};

#[derive(Clone, Copy, Debug)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}

struct Live {
    ptr: NonNull<u8>,
    size: usize,
    fill: u8,
}

fn fill(ptr: NonNull<u8>, size: usize, byte: u8) {
    unsafe { ptr.as_ptr().write_bytes(byte, size) };
}

fn check_fill(ptr: NonNull<u8>, size: usize, byte: u8) -> bool {
    let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), size) };
    bytes.iter().all(|&b| b == byte)
}

fn assert_disjoint(live: &[Live]) {
    let mut spans: Vec<(usize, usize)> = live
        .iter()
        .map(|l| (l.ptr.as_ptr().addr(), l.ptr.as_ptr().addr() + l.size))
        .collect();
    spans.sort_unstable();
    for pair in spans.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "live payloads overlap: {pair:?}");
    }
}

fn assert_within_round_up<A: SizedAllocator>(adapter: &A, ptr: NonNull<u8>, requested: usize) {
    let rounded = adapter.round_up(requested);
    assert!(rounded >= requested, "round_up({requested}) = {rounded}");
    assert!(unsafe { adapter.size_of(Some(ptr)) } <= rounded);
}

fn drive<A: SizedAllocator>(adapter: &A, seed: u64, steps: usize) {
    let mut rng = XorShift64::new(seed);
    let mut live: Vec<Live> = Vec::new();
    for step in 0..steps {
        match rng.below(4) {
            0 | 1 => {
                let size = rng.below(600) as usize;
                let ptr = adapter
                    .allocate(size)
                    .expect("region sized to never run out in this test");
                assert_within_round_up(adapter, ptr, size);
                let byte = (step % 251) as u8;
                fill(ptr, size, byte);
                live.push(Live {
                    ptr,
                    size,
                    fill: byte,
                });
            }
            2 if !live.is_empty() => {
                let idx = rng.below(live.len() as u64) as usize;
                let entry = live.swap_remove(idx);
                assert!(check_fill(entry.ptr, entry.size, entry.fill));
                unsafe { adapter.free(entry.ptr) };
            }
            3 if !live.is_empty() => {
                let idx = rng.below(live.len() as u64) as usize;
                let new_size = rng.below(900) as usize;
                let entry = &mut live[idx];
                let moved = unsafe { adapter.reallocate(Some(entry.ptr), new_size) }
                    .expect("realloc within capacity");
                assert_within_round_up(adapter, moved, new_size);
                assert!(check_fill(moved, entry.size.min(new_size), entry.fill));
                fill(moved, new_size, entry.fill);
                entry.ptr = moved;
                entry.size = new_size;
            }
            _ => {}
        }
        for entry in &live {
            assert_eq!(
                unsafe { adapter.size_of(Some(entry.ptr)) },
                entry.size,
                "size mismatch at step {step}"
            );
        }
        assert_disjoint(&live);
    }
    for entry in live {
        unsafe { adapter.free(entry.ptr) };
    }
}

#[test]
fn header_tracked_contract_on_tracked_region() {
    let region = TrackedRegion::new(1 << 24);
    let adapter = HeaderTracked::new(&region).expect("8-byte backing");
    drive(&adapter, 0x9E37_79B9_7F4A_7C15, 2_000);
    assert_eq!(region.stats().live_allocations, 0);
    assert_eq!(region.stats().live_bytes, 0);
}

#[test]
fn header_tracked_contract_with_compact_header() {
    let region = TrackedRegion::with_align(1 << 24, 4).expect("power of two");
    let config = AdapterConfig {
        header: HeaderLayout::compact(),
        ..AdapterConfig::default()
    };
    let adapter = HeaderTracked::with_config(&region, &config).expect("4-byte backing");
    drive(&adapter, 0xDEAD_BEEF, 1_000);
    assert_eq!(region.stats().live_bytes, 0);
}

#[test]
fn header_tracked_contract_on_libc() {
    let adapter = HeaderTracked::new(LibcRegion).expect("malloc alignment suffices");
    drive(&adapter, 0x1234_5678, 1_000);
}

#[test]
fn pass_through_contract() {
    let region = TrackedRegion::new(1 << 24);
    let adapter = PassThrough::new(&region);
    drive(&adapter, 0x0BAD_F00D, 2_000);
    assert_eq!(region.stats().live_bytes, 0);
}

#[test]
fn pool_scoped_contract() {
    let region = TrackedRegion::new(1 << 24).in_pool(PoolId(7));
    let adapter = PoolScoped::new(&region, PoolId(7));
    drive(&adapter, 0xC0FF_EE00, 2_000);
    assert_eq!(region.stats().live_bytes, 0);
}

#[test]
fn contract_holds_under_granule_rounding() {
    let granule = RoundingPolicy::granule(64).expect("power of two");
    let region = TrackedRegion::new(1 << 24).in_pool(PoolId(3));
    let config = AdapterConfig {
        rounding: granule,
        ..AdapterConfig::default()
    };

    let header = HeaderTracked::with_config(&region, &config).expect("8-byte backing");
    drive(&header, 0x5EED_0001, 1_000);
    drive(&PassThrough::with_rounding(&region, granule), 0x5EED_0002, 1_000);
    drive(
        &PoolScoped::with_rounding(&region, PoolId(3), granule),
        0x5EED_0003,
        1_000,
    );
    assert_eq!(region.stats().live_bytes, 0);
}

#[test]
fn grow_free_reuse_scenario() {
    let region = TrackedRegion::new(4096);
    let adapter = HeaderTracked::new(&region).expect("8-byte backing");

    let p = adapter.allocate(100).expect("allocate 100");
    assert_eq!(unsafe { adapter.size_of(Some(p)) }, 100);
    assert_eq!(region.stats().live_bytes, 108);

    let q = unsafe { adapter.reallocate(Some(p), 250) }.expect("grow to 250");
    assert_eq!(unsafe { adapter.size_of(Some(q)) }, 250);
    assert_eq!(region.stats().live_bytes, 258);

    unsafe { adapter.free(q) };
    assert_eq!(region.stats().live_bytes, 0);

    let r = adapter.allocate(100).expect("allocate after free");
    assert_eq!(unsafe { adapter.size_of(Some(r)) }, 100);
    unsafe { adapter.free(r) };
}

#[test]
fn stale_header_never_leaks_through_reuse() {
    let region = TrackedRegion::new(4096);
    let adapter = HeaderTracked::new(&region).expect("8-byte backing");
    for size in [512_usize, 7, 300, 0, 64] {
        let p = adapter.allocate(size).expect("allocate");
        assert_eq!(unsafe { adapter.size_of(Some(p)) }, size);
        let q = unsafe { adapter.reallocate(Some(p), size / 2) }.expect("shrink");
        assert_eq!(unsafe { adapter.size_of(Some(q)) }, size / 2);
        unsafe { adapter.free(q) };
    }
}

#[test]
fn realloc_of_null_allocates() {
    let region = TrackedRegion::new(4096);
    let header = HeaderTracked::new(&region).expect("8-byte backing");
    let pass = PassThrough::new(&region);
    let adapters: [&dyn SizedAllocator; 2] = [&header, &pass];
    for adapter in adapters {
        let p = unsafe { adapter.reallocate(None, 32) }.expect("acts as allocate");
        assert_eq!(unsafe { adapter.size_of(Some(p)) }, 32);
        assert_eq!(unsafe { adapter.size_of(None) }, 0);
        unsafe { adapter.free(p) };
    }
    assert_eq!(region.stats().live_allocations, 0);
}

#[test]
fn zero_byte_allocation_is_freeable() {
    let region = TrackedRegion::new(64);
    let adapter = HeaderTracked::new(&region).expect("8-byte backing");
    let p = adapter.allocate(0).expect("zero-byte block");
    assert_eq!(unsafe { adapter.size_of(Some(p)) }, 0);
    unsafe { adapter.free(p) };
    assert_eq!(region.stats().live_allocations, 0);
}

#[test]
fn exhaustion_reports_none_and_keeps_old_block() {
    let region = TrackedRegion::new(256);
    let adapter = HeaderTracked::new(&region).expect("8-byte backing");
    let p = adapter.allocate(100).expect("fits");
    fill(p, 100, 0xAB);
    assert!(adapter.allocate(200).is_none());
    assert!(unsafe { adapter.reallocate(Some(p), 300) }.is_none());
    assert_eq!(unsafe { adapter.size_of(Some(p)) }, 100);
    assert!(check_fill(p, 100, 0xAB));
    assert_eq!(region.stats().exhausted, 2);
    unsafe { adapter.free(p) };
}

#[test]
fn payloads_keep_configured_alignment() {
    let region = TrackedRegion::with_align(1 << 20, 16).expect("power of two");
    for align in [8_usize, 16] {
        let config = AdapterConfig {
            header: HeaderLayout::aligned(align).expect("power of two"),
            ..AdapterConfig::default()
        };
        let adapter = HeaderTracked::with_config(&region, &config).expect("16-byte backing");
        let mut ptrs = Vec::new();
        for size in 1..64 {
            let p = adapter.allocate(size).expect("allocate");
            assert!(p.as_ptr().addr().is_multiple_of(align));
            ptrs.push(p);
        }
        for p in ptrs {
            unsafe { adapter.free(p) };
        }
    }
}

#[test]
fn init_reflects_backing_readiness() {
    let region = TrackedRegion::offline(1024);
    let header = HeaderTracked::new(&region).expect("8-byte backing");
    let pass = PassThrough::new(&region);
    let pool = PoolScoped::new(&region, PoolId::default());

    let adapters: [&dyn SizedAllocator; 3] = [&header, &pass, &pool];
    for adapter in adapters {
        assert_eq!(adapter.init(), Err(AdapterError::BackingUnavailable));
    }
    region.bring_online();
    for adapter in adapters {
        assert_eq!(adapter.init(), Ok(()));
        adapter.shutdown();
    }
}

#[test]
fn tracking_modes_and_round_up() {
    let region = TrackedRegion::new(64);
    let config = AdapterConfig {
        rounding: RoundingPolicy::Granule(16),
        ..AdapterConfig::default()
    };
    let header = HeaderTracked::with_config(&region, &config).expect("8-byte backing");
    assert_eq!(header.tracking(), TrackingMode::Header);
    assert_eq!(header.round_up(17), 32);
    assert_eq!(PassThrough::new(&region).tracking(), TrackingMode::Allocator);
    assert_eq!(
        PoolScoped::new(&region, PoolId(0)).tracking(),
        TrackingMode::Pool
    );
    for n in [0_usize, 1, 100, 4097] {
        assert_eq!(PassThrough::new(&region).round_up(n), n);
    }
}
