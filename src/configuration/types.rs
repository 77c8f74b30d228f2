use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_WORKERS: usize = 16;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const MAX_WORKERS: usize = 4096;

/// `[scan]` table: what to connect to and how many connections run at once.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSettings {
    pub port: u16,
    pub workers: usize,
    pub connect_timeout_secs: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

/// `[io]` table. A missing path means stdin or stdout.
#[derive(Debug, PartialEq, Eq, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IoSettings {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
}
