//! Adapter configuration.
//!
//! Configuration is fixed per deployment and read once, before installation.
//! On hosted targets it can come from the environment:
//! - `SIZEDALLOC_HEADER_ALIGN`: `compact` for a bare 4-byte header, or a
//!   power-of-two payload alignment (default `8`).
//! - `SIZEDALLOC_ROUNDUP`: `identity` (default) or a power-of-two granule.
//! - `SIZEDALLOC_TRACE`: `1`/`on`/`true` records one journal event per call.

use std::fmt;

use crate::error::ConfigError;
use crate::header::HeaderLayout;

pub const ENV_HEADER_ALIGN: &str = "SIZEDALLOC_HEADER_ALIGN";
pub const ENV_ROUNDUP: &str = "SIZEDALLOC_ROUNDUP";
pub const ENV_TRACE: &str = "SIZEDALLOC_TRACE";

/// How an adapter learns the size of a live allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingMode {
    /// Size stored in a header in front of the payload.
    Header,
    /// Backing allocator answers size queries for any pointer it issued.
    Allocator,
    /// Backing allocator answers size queries per pool.
    Pool,
}

impl TrackingMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Allocator => "allocator",
            Self::Pool => "pool",
        }
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy behind the round-up operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundingPolicy {
    /// `round_up(n) == n`.
    #[default]
    Identity,
    /// Round to a multiple of a power-of-two granule.
    Granule(usize),
}

impl RoundingPolicy {
    pub fn granule(granule: usize) -> Result<Self, ConfigError> {
        if !granule.is_power_of_two() {
            return Err(ConfigError::GranuleNotPowerOfTwo(granule));
        }
        Ok(Self::Granule(granule))
    }

    /// Never below `size`; falls back to `size` when rounding would overflow.
    #[must_use]
    pub fn round_up(self, size: usize) -> usize {
        match self {
            Self::Identity => size,
            Self::Granule(granule) => size.checked_next_multiple_of(granule).unwrap_or(size),
        }
    }
}

/// Everything an adapter needs besides its backing allocator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Header geometry, used by header-tracked adapters only.
    pub header: HeaderLayout,
    pub rounding: RoundingPolicy,
    /// Record a journal event for every call through the C table.
    pub trace: bool,
}

impl AdapterConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup. Missing keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_HEADER_ALIGN) {
            config.header = parse_header_align(&raw)?;
        }
        if let Some(raw) = lookup(ENV_ROUNDUP) {
            config.rounding = parse_rounding(&raw)?;
        }
        if let Some(raw) = lookup(ENV_TRACE) {
            config.trace = parse_flag(ENV_TRACE, &raw)?;
        }
        Ok(config)
    }
}

fn invalid(key: &'static str, raw: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        key,
        value: raw.to_string(),
    }
}

fn parse_header_align(raw: &str) -> Result<HeaderLayout, ConfigError> {
    let value = raw.trim().to_ascii_lowercase();
    match value.as_str() {
        "compact" | "packed" | "none" => Ok(HeaderLayout::compact()),
        "" | "default" => Ok(HeaderLayout::default()),
        digits => {
            let align = digits
                .parse::<usize>()
                .map_err(|_| invalid(ENV_HEADER_ALIGN, raw))?;
            HeaderLayout::aligned(align)
        }
    }
}

fn parse_rounding(raw: &str) -> Result<RoundingPolicy, ConfigError> {
    let value = raw.trim().to_ascii_lowercase();
    match value.as_str() {
        "" | "identity" | "none" | "off" => Ok(RoundingPolicy::Identity),
        digits => {
            let granule = digits
                .parse::<usize>()
                .map_err(|_| invalid(ENV_ROUNDUP, raw))?;
            RoundingPolicy::granule(granule)
        }
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Ok(true),
        "" | "0" | "off" | "false" | "no" => Ok(false),
        _ => Err(invalid(key, raw)),
    }
}
