//! Result codes of the consuming library's configuration and init hooks.
//!
//! Values match SQLite's primary result codes.

use std::ffi::c_int;

pub const SQLITE_OK: c_int = 0;
pub const SQLITE_ERROR: c_int = 1;
pub const SQLITE_NOMEM: c_int = 7;
pub const SQLITE_MISUSE: c_int = 21;

/// `sqlite3_config` verb that installs a `sqlite3_mem_methods` table.
pub const SQLITE_CONFIG_MALLOC: c_int = 4;

/// Short symbolic name for logs.
#[must_use]
pub const fn result_code_name(code: c_int) -> &'static str {
    match code {
        SQLITE_OK => "SQLITE_OK",
        SQLITE_ERROR => "SQLITE_ERROR",
        SQLITE_NOMEM => "SQLITE_NOMEM",
        SQLITE_MISUSE => "SQLITE_MISUSE",
        _ => "SQLITE_UNKNOWN",
    }
}
