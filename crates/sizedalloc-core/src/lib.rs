//! # sizedalloc-core
//!
//! Safe building blocks of the sized allocator adapter: size-header geometry,
//! configuration, error types, status codes and structured log records.
//!
//! No `unsafe` code is permitted at the crate level. Memory is touched only in
//! `sizedalloc-region` and `sizedalloc-abi`.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod header;
pub mod log;
pub mod status;

pub use config::{AdapterConfig, RoundingPolicy, TrackingMode};
pub use error::{AdapterError, ConfigError, InstallError};
pub use header::{AllocationRecord, HEADER_WIDTH, HeaderLayout, SizeHeader};
pub use log::{AdapterLogLevel, AdapterLogRecord, Outcome};
