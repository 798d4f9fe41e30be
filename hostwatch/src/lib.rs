pub mod collectors;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod input;
pub mod monitor;
pub mod process;
pub mod render;
pub mod snapshot;
pub mod termination;
pub mod types;

pub use collectors::{CounterSource, ProcSource};
pub use config::{AlertConfig, Config, LoggingConfig, RuntimeConfig, TerminationConfig};
pub use engine::Engine;
pub use error::{CollectError, MonitorError, SignalError};
pub use history::{History, HistorySeries};
pub use monitor::{Command, Monitor, MonitorSettings};
pub use process::{ProcessRecord, ProcessTable, SortKey};
pub use snapshot::{Renderer, Snapshot};
pub use termination::{LibcSignaller, Phase, TerminationOutcome, TerminationPolicy, Terminator};
pub use types::DerivedMetrics;
