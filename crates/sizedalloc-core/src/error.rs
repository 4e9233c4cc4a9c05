//! Error types for configuration, adapter start-up and installation.
//!
//! None of these cross the C boundary as objects: the ABI layer turns them
//! into the consumer's integer status codes via `result_code()`.

use std::ffi::c_int;

use thiserror::Error;

use crate::status::{SQLITE_ERROR, SQLITE_MISUSE, result_code_name};

/// Invalid adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("alignment {0} is not a power of two")]
    AlignmentNotPowerOfTwo(usize),
    #[error("alignment {0} has no power of two above it in usize")]
    AlignmentTooLarge(usize),
    #[error("payload alignment {required} cannot be kept on a backing aligned to {backing}")]
    AlignmentUnsatisfiable { required: usize, backing: usize },
    #[error("round-up granule {0} is not a power of two")]
    GranuleNotPowerOfTwo(usize),
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },
}

impl ConfigError {
    /// A deployment that cannot be configured is treated as API misuse.
    #[must_use]
    pub const fn result_code(&self) -> c_int {
        SQLITE_MISUSE
    }
}

/// Adapter could not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("backing region allocator is not initialized")]
    BackingUnavailable,
}

impl AdapterError {
    /// Status code reported through the consumer's init hook.
    #[must_use]
    pub const fn result_code(self) -> c_int {
        match self {
            Self::BackingUnavailable => SQLITE_ERROR,
        }
    }
}

/// One-time installation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstallError {
    #[error("an allocator is already installed in this slot")]
    AlreadyInstalled,
    #[error("another installation of this slot is in progress")]
    InstallInProgress,
    #[error("an earlier installation of this slot failed")]
    PreviouslyFailed,
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error("consumer rejected the allocator with {} ({code})", result_code_name(*.code))]
    Rejected { code: c_int },
}

impl InstallError {
    /// Status code to hand back to C callers of an install entry point.
    #[must_use]
    pub const fn result_code(&self) -> c_int {
        match self {
            Self::AlreadyInstalled | Self::InstallInProgress | Self::PreviouslyFailed => {
                SQLITE_MISUSE
            }
            Self::Adapter(err) => err.result_code(),
            Self::Rejected { code } => *code,
        }
    }
}
