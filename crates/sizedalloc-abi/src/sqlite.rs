//! SQLite binding and the exported install entry points.
//!
//! The symbols are resolved against the SQLite build the final binary links.

use std::ffi::c_int;

use sizedalloc_core::AdapterConfig;
use sizedalloc_core::status::{SQLITE_CONFIG_MALLOC, SQLITE_OK};
use sizedalloc_region::{HeaderTracked, LibcRegion};

use crate::install::{Installation, MemoryConfigurator, install};
use crate::mem_methods::MemMethods;
use crate::slot::AdapterSlot;

unsafe extern "C" {
    fn sqlite3_config(op: c_int, ...) -> c_int;
}

/// Registers tables through `sqlite3_config(SQLITE_CONFIG_MALLOC, ...)`.
///
/// SQLite only accepts this before `sqlite3_initialize` (or after
/// `sqlite3_shutdown`); otherwise it answers `SQLITE_MISUSE`, which
/// surfaces as [`InstallError::Rejected`](sizedalloc_core::InstallError::Rejected).
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteConfigurator;

impl MemoryConfigurator for SqliteConfigurator {
    fn configure_malloc(&mut self, methods: &'static MemMethods) -> c_int {
        // SAFETY: SQLITE_CONFIG_MALLOC takes one `sqlite3_mem_methods*`, whose
        // layout MemMethods mirrors. SQLite copies the struct.
        unsafe { sqlite3_config(SQLITE_CONFIG_MALLOC, std::ptr::from_ref(methods)) }
    }
}

/// Install a slot into SQLite and flatten the outcome to a status code.
fn install_status<S: AdapterSlot>(installation: Installation<S::Adapter>) -> c_int {
    match install::<S>(installation, &mut SqliteConfigurator) {
        Ok(_) => SQLITE_OK,
        Err(err) => err.result_code(),
    }
}

crate::adapter_slot! {
    /// Header-tracked process heap.
    pub LibcHeapSlot => HeaderTracked<LibcRegion>
}

/// Route SQLite's allocations through the header-tracked process heap.
///
/// Configuration comes from `SIZEDALLOC_*` environment variables.
#[unsafe(no_mangle)]
pub extern "C" fn sizedalloc_use_libc_heap() -> c_int {
    let config = match AdapterConfig::from_env() {
        Ok(config) => config,
        Err(err) => return err.result_code(),
    };
    match HeaderTracked::with_config(LibcRegion, &config) {
        Ok(adapter) => install_status::<LibcHeapSlot>(Installation::from_config(adapter, &config)),
        Err(err) => err.result_code(),
    }
}

#[cfg(feature = "teensy")]
pub use extmem::{ExtmemSlot, sizedalloc_use_extmem};

#[cfg(feature = "teensy")]
mod extmem {
    use super::*;
    use sizedalloc_core::HeaderLayout;
    use sizedalloc_region::platform::ExtmemRegion;

    crate::adapter_slot! {
        /// Header-tracked Teensy PSRAM.
        pub ExtmemSlot => HeaderTracked<ExtmemRegion>
    }

    /// Route SQLite's allocations to external PSRAM.
    ///
    /// Call from `setup()`, before any database is opened. There is no
    /// environment on the board; the header is the bare 4-byte form because
    /// PSRAM blocks are only word aligned.
    #[unsafe(no_mangle)]
    pub extern "C" fn sizedalloc_use_extmem() -> c_int {
        let config = AdapterConfig {
            header: HeaderLayout::compact(),
            ..AdapterConfig::default()
        };
        match HeaderTracked::with_config(ExtmemRegion, &config) {
            Ok(adapter) => {
                install_status::<ExtmemSlot>(Installation::from_config(adapter, &config))
            }
            Err(err) => err.result_code(),
        }
    }
}
