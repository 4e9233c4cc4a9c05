//! The consumer's seven-function memory table and its trampolines.
//!
//! Layout matches `sqlite3_mem_methods`:
//!
//! ```c
//! struct sqlite3_mem_methods {
//!   void *(*xMalloc)(int);
//!   void (*xFree)(void*);
//!   void *(*xRealloc)(void*,int);
//!   int (*xSize)(void*);
//!   int (*xRoundup)(int);
//!   int (*xInit)(void*);
//!   void (*xShutdown)(void*);
//!   void *pAppData;
//! };
//! ```
//!
//! Every entry is a monomorphized trampoline that looks up its slot's
//! adapter, converts between `int` and `usize`, and optionally journals the
//! call. A negative size is never passed on: allocation entries return null
//! for it. Sizes reported back saturate at `INT_MAX`.

use std::ffi::{c_int, c_void};
use std::ptr::{self, NonNull};

use sizedalloc_core::status::{SQLITE_MISUSE, SQLITE_OK};
use sizedalloc_core::{AdapterLogLevel, Outcome};
use sizedalloc_region::SizedAllocator;

use crate::journal::JournalEvent;
use crate::slot::{AdapterSlot, NO_ADAPTER};

pub const SYM_MALLOC: &str = "xMalloc";
pub const SYM_FREE: &str = "xFree";
pub const SYM_REALLOC: &str = "xRealloc";
pub const SYM_SIZE: &str = "xSize";
pub const SYM_ROUNDUP: &str = "xRoundup";
pub const SYM_INIT: &str = "xInit";
pub const SYM_SHUTDOWN: &str = "xShutdown";

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MemMethods {
    pub x_malloc: unsafe extern "C" fn(c_int) -> *mut c_void,
    pub x_free: unsafe extern "C" fn(*mut c_void),
    pub x_realloc: unsafe extern "C" fn(*mut c_void, c_int) -> *mut c_void,
    pub x_size: unsafe extern "C" fn(*mut c_void) -> c_int,
    pub x_roundup: unsafe extern "C" fn(c_int) -> c_int,
    pub x_init: unsafe extern "C" fn(*mut c_void) -> c_int,
    pub x_shutdown: unsafe extern "C" fn(*mut c_void),
    pub p_app_data: *mut c_void,
}

// SAFETY: the table is immutable after construction and `p_app_data` is
// always null; the trampolines reach shared state only through their slot.
unsafe impl Send for MemMethods {}
unsafe impl Sync for MemMethods {}

impl MemMethods {
    /// Table whose entries all dispatch to slot `S`.
    #[must_use]
    pub const fn for_slot<S: AdapterSlot>() -> Self {
        Self {
            x_malloc: x_malloc::<S>,
            x_free: x_free::<S>,
            x_realloc: x_realloc::<S>,
            x_size: x_size::<S>,
            x_roundup: x_roundup::<S>,
            x_init: x_init::<S>,
            x_shutdown: x_shutdown::<S>,
            p_app_data: ptr::null_mut(),
        }
    }
}

fn clamp_to_int(n: usize) -> c_int {
    c_int::try_from(n).unwrap_or(c_int::MAX)
}

fn out_ptr(ptr: Option<NonNull<u8>>) -> *mut c_void {
    ptr.map_or(ptr::null_mut(), |p| p.as_ptr().cast())
}

fn not_installed<S: AdapterSlot>(symbol: &'static str) {
    S::cell().note(JournalEvent::new(symbol, NO_ADAPTER, Outcome::NotInstalled));
}

unsafe extern "C" fn x_malloc<S: AdapterSlot>(n: c_int) -> *mut c_void {
    let cell = S::cell();
    let Some(adapter) = cell.adapter() else {
        not_installed::<S>(SYM_MALLOC);
        return ptr::null_mut();
    };
    let tracking = adapter.tracking().as_str();
    let Ok(size) = usize::try_from(n) else {
        cell.trace(JournalEvent::new(SYM_MALLOC, tracking, Outcome::Rejected));
        return ptr::null_mut();
    };
    let block = adapter.allocate(size);
    let outcome = if block.is_some() {
        Outcome::Ok
    } else {
        Outcome::Exhausted
    };
    let out = out_ptr(block);
    cell.trace(
        JournalEvent::new(SYM_MALLOC, tracking, outcome)
            .with_ptr(out.addr())
            .with_size(size),
    );
    out
}

unsafe extern "C" fn x_free<S: AdapterSlot>(p: *mut c_void) {
    let cell = S::cell();
    let Some(adapter) = cell.adapter() else {
        not_installed::<S>(SYM_FREE);
        return;
    };
    let tracking = adapter.tracking().as_str();
    let Some(block) = NonNull::new(p.cast::<u8>()) else {
        return;
    };
    // SAFETY: the consumer only frees pointers this table handed out.
    unsafe { adapter.free(block) };
    cell.trace(JournalEvent::new(SYM_FREE, tracking, Outcome::Ok).with_ptr(p.addr()));
}

unsafe extern "C" fn x_realloc<S: AdapterSlot>(p: *mut c_void, n: c_int) -> *mut c_void {
    let cell = S::cell();
    let Some(adapter) = cell.adapter() else {
        not_installed::<S>(SYM_REALLOC);
        return ptr::null_mut();
    };
    let tracking = adapter.tracking().as_str();
    let Ok(size) = usize::try_from(n) else {
        cell.trace(JournalEvent::new(SYM_REALLOC, tracking, Outcome::Rejected).with_ptr(p.addr()));
        return ptr::null_mut();
    };
    // SAFETY: the consumer only resizes pointers this table handed out.
    let block = unsafe { adapter.reallocate(NonNull::new(p.cast::<u8>()), size) };
    let outcome = if block.is_some() {
        Outcome::Ok
    } else {
        Outcome::Exhausted
    };
    let out = out_ptr(block);
    cell.trace(
        JournalEvent::new(SYM_REALLOC, tracking, outcome)
            .with_ptr(out.addr())
            .with_size(size),
    );
    out
}

unsafe extern "C" fn x_size<S: AdapterSlot>(p: *mut c_void) -> c_int {
    let cell = S::cell();
    let Some(adapter) = cell.adapter() else {
        not_installed::<S>(SYM_SIZE);
        return 0;
    };
    // SAFETY: the consumer only queries pointers this table handed out.
    let size = unsafe { adapter.size_of(NonNull::new(p.cast::<u8>())) };
    cell.trace(
        JournalEvent::new(SYM_SIZE, adapter.tracking().as_str(), Outcome::Ok)
            .with_ptr(p.addr())
            .with_size(size),
    );
    clamp_to_int(size)
}

unsafe extern "C" fn x_roundup<S: AdapterSlot>(n: c_int) -> c_int {
    let cell = S::cell();
    let Some(adapter) = cell.adapter() else {
        not_installed::<S>(SYM_ROUNDUP);
        return n;
    };
    let Ok(size) = usize::try_from(n) else {
        return n;
    };
    let rounded = adapter.round_up(size);
    cell.trace(
        JournalEvent::new(SYM_ROUNDUP, adapter.tracking().as_str(), Outcome::Ok)
            .with_size(rounded),
    );
    clamp_to_int(rounded)
}

unsafe extern "C" fn x_init<S: AdapterSlot>(_ctx: *mut c_void) -> c_int {
    let cell = S::cell();
    let Some(adapter) = cell.adapter() else {
        not_installed::<S>(SYM_INIT);
        return SQLITE_MISUSE;
    };
    let tracking = adapter.tracking().as_str();
    match adapter.init() {
        Ok(()) => {
            cell.trace(
                JournalEvent::new(SYM_INIT, tracking, Outcome::Ok).with_level(AdapterLogLevel::Info),
            );
            SQLITE_OK
        }
        Err(err) => {
            cell.note(JournalEvent::new(SYM_INIT, tracking, Outcome::Failed));
            err.result_code()
        }
    }
}

unsafe extern "C" fn x_shutdown<S: AdapterSlot>(_ctx: *mut c_void) {
    let cell = S::cell();
    let Some(adapter) = cell.adapter() else {
        not_installed::<S>(SYM_SHUTDOWN);
        return;
    };
    adapter.shutdown();
    cell.trace(
        JournalEvent::new(SYM_SHUTDOWN, adapter.tracking().as_str(), Outcome::Ok)
            .with_level(AdapterLogLevel::Info),
    );
}
