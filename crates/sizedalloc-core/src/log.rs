//! Structured adapter lifecycle records.
//!
//! One record per traced call through the C table, plus install outcomes.
//! Records hold only `'static` strings and integers so they can be produced
//! from inside allocator callbacks; rendering to JSONL happens later.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Outcome label attached to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    /// Backing allocator returned null.
    Exhausted,
    /// Call arrived before the slot was installed.
    NotInstalled,
    /// Argument outside what the adapter can represent (e.g. negative size).
    Rejected,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterLogRecord {
    /// Monotonic per-journal sequence id.
    pub seq: u64,
    pub level: AdapterLogLevel,
    /// C table entry (`xMalloc`, `xFree`, ...) or `install`.
    pub symbol: &'static str,
    /// Tracking mode of the adapter behind the call.
    pub tracking: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptr: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    pub outcome: Outcome,
}

impl AdapterLogRecord {
    /// Render as one JSON line (no trailing newline).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Render records as JSONL, one record per line.
pub fn render_jsonl(records: &[AdapterLogRecord]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.to_json_line()?);
        out.push('\n');
    }
    Ok(out)
}
