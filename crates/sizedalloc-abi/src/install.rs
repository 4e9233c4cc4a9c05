//! Installation of an adapter into the consumer.

use std::ffi::c_int;

use sizedalloc_core::status::SQLITE_OK;
use sizedalloc_core::{AdapterConfig, AdapterLogLevel, InstallError, Outcome};
use sizedalloc_region::SizedAllocator;

use crate::journal::JournalEvent;
use crate::mem_methods::MemMethods;
use crate::slot::AdapterSlot;

const SYM_INSTALL: &str = "install";
const SYM_REINSTALL: &str = "reinstall";

/// The consumer's configuration hook.
pub trait MemoryConfigurator {
    /// Hand the table to the consumer; returns its status code.
    fn configure_malloc(&mut self, methods: &'static MemMethods) -> c_int;
}

/// Everything fixed at install time for one slot.
#[derive(Debug)]
pub struct Installation<A> {
    adapter: A,
    trace: bool,
}

impl<A: SizedAllocator> Installation<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            trace: false,
        }
    }

    /// Take the trace flag from a resolved configuration.
    pub fn from_config(adapter: A, config: &AdapterConfig) -> Self {
        Self::new(adapter).with_trace(config.trace)
    }

    #[must_use]
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

/// Install `installation` into slot `S` and register the slot's table with
/// the consumer.
///
/// Must run before the consumer's first allocation. The first attempt on a
/// slot stores the adapter; any failure leaves the slot permanently failed.
///
/// Once the slot is installed, a later call drops the new adapter and hands
/// the slot's existing table to the consumer again. This is the path taken
/// after the consumer shut down and wants its allocator back; whether that
/// is allowed is the consumer's call, and a refusal leaves the slot as it was.
pub fn install<S: AdapterSlot>(
    installation: Installation<S::Adapter>,
    configurator: &mut impl MemoryConfigurator,
) -> Result<&'static MemMethods, InstallError> {
    let cell = S::cell();
    let Installation { adapter, trace } = installation;
    let tracking = adapter.tracking().as_str();

    match cell.begin_install() {
        Ok(()) => {}
        Err(InstallError::AlreadyInstalled) => {
            return reregister::<S>(trace, configurator);
        }
        Err(err) => {
            cell.note(JournalEvent::new(SYM_INSTALL, tracking, Outcome::Rejected));
            return Err(err);
        }
    }
    cell.set_tracing(trace);

    if let Err(err) = adapter.init() {
        cell.fail_install();
        cell.note(JournalEvent::new(SYM_INSTALL, tracking, Outcome::Failed));
        return Err(err.into());
    }
    if let Err(err) = cell.store(adapter) {
        cell.fail_install();
        cell.note(JournalEvent::new(SYM_INSTALL, tracking, Outcome::Failed));
        return Err(err);
    }

    let methods = cell.methods();
    let code = configurator.configure_malloc(methods);
    if code != SQLITE_OK {
        cell.fail_install();
        cell.note(JournalEvent::new(SYM_INSTALL, tracking, Outcome::Rejected));
        return Err(InstallError::Rejected { code });
    }

    cell.finish_install();
    cell.note(
        JournalEvent::new(SYM_INSTALL, tracking, Outcome::Ok).with_level(AdapterLogLevel::Info),
    );
    Ok(methods)
}

/// Hand an installed slot's table to the consumer again.
fn reregister<S: AdapterSlot>(
    trace: bool,
    configurator: &mut impl MemoryConfigurator,
) -> Result<&'static MemMethods, InstallError> {
    let cell = S::cell();
    let tracking = cell.tracking_label();
    cell.set_tracing(trace);

    let methods = cell.methods();
    let code = configurator.configure_malloc(methods);
    if code != SQLITE_OK {
        cell.note(JournalEvent::new(SYM_REINSTALL, tracking, Outcome::Rejected));
        return Err(InstallError::Rejected { code });
    }
    cell.note(
        JournalEvent::new(SYM_REINSTALL, tracking, Outcome::Ok).with_level(AdapterLogLevel::Info),
    );
    Ok(methods)
}
