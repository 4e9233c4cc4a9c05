//! Cost of going through the C table, with and without the journal.

use std::ffi::c_int;

use criterion::{Criterion, criterion_group, criterion_main};
use sizedalloc_abi::{Installation, MemMethods, MemoryConfigurator, adapter_slot, install};
use sizedalloc_core::status::SQLITE_OK;
use sizedalloc_region::{HeaderTracked, TrackedRegion};

struct AcceptAll;

impl MemoryConfigurator for AcceptAll {
    fn configure_malloc(&mut self, _methods: &'static MemMethods) -> c_int {
        SQLITE_OK
    }
}

adapter_slot!(QuietSlot => HeaderTracked<TrackedRegion>);
adapter_slot!(TracedSlot => HeaderTracked<TrackedRegion>);

fn table(trace: bool) -> &'static MemMethods {
    let adapter = HeaderTracked::new(TrackedRegion::new(1 << 26)).expect("8-byte region");
    let installation = Installation::new(adapter).with_trace(trace);
    let mut consumer = AcceptAll;
    if trace {
        install::<TracedSlot>(installation, &mut consumer).expect("fresh slot")
    } else {
        install::<QuietSlot>(installation, &mut consumer).expect("fresh slot")
    }
}

fn bench_table_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_malloc_size_free");
    for (name, trace) in [("quiet", false), ("traced", true)] {
        let m = table(trace);
        group.bench_function(name, |b| {
            b.iter(|| unsafe {
                let p = (m.x_malloc)(128);
                criterion::black_box((m.x_size)(p));
                (m.x_free)(p);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_table_cycle);
criterion_main!(benches);
