#![no_main]
use libfuzzer_sys::fuzz_target;

use std::ptr::NonNull;

use sizedalloc_core::{AdapterConfig, HeaderLayout};
use sizedalloc_region::{HeaderTracked, SizedAllocator, TrackedRegion};

// Each 4-byte chunk is one op: [op, size_lo, size_hi, pick].
fuzz_target!(|data: &[u8]| {
    if data.len() < 5 {
        return;
    }

    let header = if data[0] & 1 == 0 {
        HeaderLayout::default()
    } else {
        HeaderLayout::compact()
    };
    let config = AdapterConfig {
        header,
        ..AdapterConfig::default()
    };
    let region = TrackedRegion::new(1 << 20);
    let Ok(adapter) = HeaderTracked::with_config(&region, &config) else {
        return;
    };
    let mut live: Vec<(NonNull<u8>, usize)> = Vec::new();

    for chunk in data[1..].chunks_exact(4) {
        let size = u16::from_le_bytes([chunk[1], chunk[2]]) as usize;
        let pick = chunk[3] as usize;

        match chunk[0] % 3 {
            0 => {
                if let Some(p) = adapter.allocate(size) {
                    assert_eq!(unsafe { adapter.size_of(Some(p)) }, size);
                    live.push((p, size));
                }
            }
            1 if !live.is_empty() => {
                let (p, _) = live.swap_remove(pick % live.len());
                unsafe { adapter.free(p) };
            }
            2 if !live.is_empty() => {
                let idx = pick % live.len();
                let (p, _) = live[idx];
                if let Some(q) = unsafe { adapter.reallocate(Some(p), size) } {
                    assert_eq!(unsafe { adapter.size_of(Some(q)) }, size);
                    live[idx] = (q, size);
                } else {
                    assert_eq!(unsafe { adapter.size_of(Some(p)) }, live[idx].1);
                }
            }
            _ => {}
        }
    }

    for (p, _) in live {
        unsafe { adapter.free(p) };
    }
    assert_eq!(region.stats().live_bytes, 0);
});
