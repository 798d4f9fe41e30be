use crate::history::History;
use crate::process::{ProcessRecord, SortKey};
use crate::types::DerivedMetrics;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// CPU threshold breach, attached to the snapshot of the tick it was seen in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuAlert {
    pub total_percent: f32,
    pub threshold: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_process: Option<ProcessRecord>,
}

/// Immutable view of one tick, handed to renderers.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub tick: u64,
    pub metrics: DerivedMetrics,
    pub history: History,
    pub sort_key: SortKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// The displayed process list (filtered when a filter is active).
    pub processes: Vec<ProcessRecord>,
    pub total_processes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<CpuAlert>,
    /// Result of the last user action, shown once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Consumer of snapshots. Implementations never mutate the core.
pub trait Renderer {
    fn render(&mut self, snapshot: &Snapshot) -> anyhow::Result<()>;
}
