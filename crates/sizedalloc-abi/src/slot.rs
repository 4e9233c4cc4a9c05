//! Adapter slots: compile-time registration points for one adapter type.
//!
//! The C table carries no context pointer the consumer hands back, so the
//! trampolines must find their adapter through a static. Each slot type
//! (declared with [`adapter_slot!`](crate::adapter_slot)) owns one static
//! [`AdapterCell`] holding the adapter, its prebuilt method table, the
//! install state and the event journal.
//!
//! Install state machine: `UNINSTALLED -> INSTALLING -> INSTALLED`, or
//! `INSTALLING -> FAILED`. Both end states are final.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use sizedalloc_core::InstallError;
use sizedalloc_region::SizedAllocator;

use crate::journal::{EventJournal, JournalEvent};
use crate::mem_methods::MemMethods;

const STATE_UNINSTALLED: u8 = 0;
const STATE_INSTALLING: u8 = 1;
const STATE_INSTALLED: u8 = 2;
const STATE_FAILED: u8 = 3;

/// Tracking label used before an adapter is present.
pub(crate) const NO_ADAPTER: &str = "none";

/// Observable install state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Uninstalled,
    Installing,
    Installed,
    Failed,
}

impl SlotState {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            STATE_UNINSTALLED => Self::Uninstalled,
            STATE_INSTALLING => Self::Installing,
            STATE_INSTALLED => Self::Installed,
            _ => Self::Failed,
        }
    }
}

/// A type naming one static adapter cell.
pub trait AdapterSlot: 'static {
    type Adapter: SizedAllocator + Send + Sync + 'static;

    fn cell() -> &'static AdapterCell<Self::Adapter>;
}

pub struct AdapterCell<A> {
    state: AtomicU8,
    trace: AtomicBool,
    adapter: OnceLock<A>,
    methods: MemMethods,
    journal: EventJournal,
}

impl<A: SizedAllocator> AdapterCell<A> {
    /// `methods` must be the table built for the slot owning this cell.
    #[must_use]
    pub const fn new(methods: MemMethods) -> Self {
        Self {
            state: AtomicU8::new(STATE_UNINSTALLED),
            trace: AtomicBool::new(false),
            adapter: OnceLock::new(),
            methods,
            journal: EventJournal::new(),
        }
    }

    pub fn state(&self) -> SlotState {
        SlotState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Method table handed to the consumer.
    pub fn methods(&'static self) -> &'static MemMethods {
        &self.methods
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    pub fn is_tracing(&self) -> bool {
        self.trace.load(Ordering::Relaxed)
    }

    pub fn set_tracing(&self, on: bool) {
        self.trace.store(on, Ordering::Relaxed);
    }

    /// Adapter serving calls: present from the moment installation stores
    /// it until the slot is marked failed.
    pub fn adapter(&self) -> Option<&A> {
        if self.state.load(Ordering::Acquire) == STATE_FAILED {
            return None;
        }
        self.adapter.get()
    }

    pub(crate) fn tracking_label(&self) -> &'static str {
        self.adapter().map_or(NO_ADAPTER, |a| a.tracking().as_str())
    }

    /// Claim the slot for installation.
    pub(crate) fn begin_install(&self) -> Result<(), InstallError> {
        match self.state.compare_exchange(
            STATE_UNINSTALLED,
            STATE_INSTALLING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(()),
            Err(STATE_INSTALLING) => Err(InstallError::InstallInProgress),
            Err(STATE_INSTALLED) => Err(InstallError::AlreadyInstalled),
            Err(_) => Err(InstallError::PreviouslyFailed),
        }
    }

    /// Store the adapter. Only valid while this caller holds the install claim.
    pub(crate) fn store(&self, adapter: A) -> Result<&A, InstallError> {
        self.adapter
            .set(adapter)
            .map_err(|_| InstallError::AlreadyInstalled)?;
        self.adapter.get().ok_or(InstallError::AlreadyInstalled)
    }

    pub(crate) fn finish_install(&self) {
        self.state.store(STATE_INSTALLED, Ordering::Release);
    }

    pub(crate) fn fail_install(&self) {
        self.state.store(STATE_FAILED, Ordering::Release);
    }

    /// Record a per-call event if tracing is on.
    pub(crate) fn trace(&self, event: JournalEvent) {
        if self.is_tracing() {
            self.journal.record(event);
        }
    }

    /// Record an event regardless of the trace flag.
    pub(crate) fn note(&self, event: JournalEvent) {
        self.journal.record(event);
    }
}

impl<A> std::fmt::Debug for AdapterCell<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterCell")
            .field("state", &SlotState::from_raw(self.state.load(Ordering::Acquire)))
            .field("installed", &self.adapter.get().is_some())
            .field("journal", &self.journal)
            .finish_non_exhaustive()
    }
}
