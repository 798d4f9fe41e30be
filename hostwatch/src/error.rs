use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain one counter family for the current tick.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{} unavailable: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{what}: {detail}")]
    ParseAnomaly { what: &'static str, detail: String },
}

impl CollectError {
    pub fn unavailable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            source,
        }
    }

    pub fn anomaly(what: &'static str, detail: impl Into<String>) -> Self {
        Self::ParseAnomaly {
            what,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalError {
    #[error("permission denied signalling pid {0}")]
    PermissionDenied(u32),

    #[error("no such process: {0}")]
    NoSuchProcess(u32),

    #[error("signalling pid {pid} failed (errno {errno})")]
    Os { pid: u32, errno: i32 },
}

#[derive(Debug, Error)]
pub enum MonitorError {
    /// A mandatory family (aggregate CPU or memory total) was missing before
    /// any baseline existed.
    #[error("no baseline for `{family}` on first sample: {source}")]
    MissingBaseline {
        family: &'static str,
        #[source]
        source: CollectError,
    },
}
