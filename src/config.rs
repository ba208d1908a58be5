//! Runtime configuration resolved from flags and environment.

use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "CASCADE_DB_PATH";
pub const LOG_ENV: &str = "CASCADE_LOG";

/// Determine the default database path.
///
/// Resolution order:
/// 1. CASCADE_DB_PATH env var (if set)
/// 2. CWD/.cascade/tasks.db
pub fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        return PathBuf::from(path);
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    cwd.join(".cascade").join("tasks.db")
}

/// Log filter directive: CASCADE_LOG wins, otherwise derived from `-v` count.
pub fn log_directive(verbose: u8) -> String {
    if let Ok(directive) = std::env::var(LOG_ENV) {
        if !directive.trim().is_empty() {
            return directive;
        }
    }
    match verbose {
        0 => "warn",
        1 => "cascade=debug",
        _ => "cascade=trace",
    }
    .to_string()
}
