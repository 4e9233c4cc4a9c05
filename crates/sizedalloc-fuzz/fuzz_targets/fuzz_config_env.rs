#![no_main]
use libfuzzer_sys::fuzz_target;

use sizedalloc_core::AdapterConfig;
use sizedalloc_core::config::{ENV_HEADER_ALIGN, ENV_ROUNDUP, ENV_TRACE};

// Input is split on 0xFF into the three environment values.
fuzz_target!(|data: &[u8]| {
    let mut parts = data.split(|&b| b == 0xFF);
    let values: Vec<Option<String>> = [ENV_HEADER_ALIGN, ENV_ROUNDUP, ENV_TRACE]
        .iter()
        .map(|_| parts.next().map(|raw| String::from_utf8_lossy(raw).into_owned()))
        .collect();

    let lookup = |key: &str| match key {
        ENV_HEADER_ALIGN => values[0].clone(),
        ENV_ROUNDUP => values[1].clone(),
        ENV_TRACE => values[2].clone(),
        _ => None,
    };

    if let Ok(config) = AdapterConfig::from_lookup(lookup) {
        let layout = config.header;
        assert!(layout.prefix() >= 4);
        assert!(layout.payload_align().is_power_of_two());
        for n in [0_usize, 1, 100, usize::MAX] {
            assert!(config.rounding.round_up(n) >= n);
        }
    }
});
