// Trampolines take raw pointers from the consumer and forward its contract
// to the adapter; per-function safety sections would only repeat that.
#![allow(clippy::missing_safety_doc)]
//! # sizedalloc-abi
//!
//! C boundary of the sized allocator adapter.
//!
//! ```text
//! consumer (xMalloc, ...) -> MemMethods trampoline -> slot -> SizedAllocator -> backing
//! ```
//!
//! A slot is declared once with [`adapter_slot!`], installed once with
//! [`install`], and from then on its [`MemMethods`] table is what the
//! consumer calls. With the `sqlite` feature the table is registered through
//! `sqlite3_config(SQLITE_CONFIG_MALLOC, ...)` and ready-made C entry points
//! are exported.

#[macro_use]
mod macros;

pub mod install;
pub mod journal;
pub mod mem_methods;
pub mod slot;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use install::{Installation, MemoryConfigurator, install};
pub use journal::{EventJournal, JournalEvent};
pub use mem_methods::MemMethods;
pub use slot::{AdapterCell, AdapterSlot, SlotState};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteConfigurator;
