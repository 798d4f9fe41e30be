use crate::collectors::{LoadAvg, Temperature};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuMetrics {
    /// Busy percentage of the aggregate `cpu` line.
    pub total_percent: f32,
    /// Busy percentage per core, indexed by core ordinal.
    pub core_percent: Vec<f32>,
}

impl CpuMetrics {
    pub fn num_cores(&self) -> usize {
        self.core_percent.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryMetrics {
    pub total_kb: u64,
    pub free_kb: u64,
    pub available_kb: u64,
    pub used_kb: u64,
    pub cached_kb: u64,
    pub buffers_kb: u64,
    pub percent_used: f32,
    pub swap_total_kb: u64,
    pub swap_free_kb: u64,
    pub swap_used_kb: u64,
    pub swap_percent_used: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MountMetrics {
    pub device: String,
    pub mount_point: String,
    pub total_kb: u64,
    pub free_kb: u64,
    pub used_kb: u64,
    pub percent_used: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskIoMetrics {
    pub read_mb_per_sec: f32,
    pub write_mb_per_sec: f32,
    pub read_ops_per_sec: f32,
    pub write_ops_per_sec: f32,
    /// Share of wall-clock time with at least one request in flight.
    pub busy_percent: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkMetrics {
    pub rx_kb_per_sec: f32,
    pub tx_kb_per_sec: f32,
    /// Bytes since the first sample of this session.
    pub session_rx_bytes: u64,
    pub session_tx_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemMetrics {
    pub uptime_seconds: f64,
    pub load_avg: LoadAvg,
    pub total_ctx_switches: u64,
    pub total_interrupts: u64,
    pub ctx_switches_per_sec: f32,
    pub interrupts_per_sec: f32,
}

/// Everything the engine derives in one tick. Replaced wholesale each tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub mounts: Vec<MountMetrics>,
    pub disk_io: DiskIoMetrics,
    pub network: NetworkMetrics,
    pub system: SystemMetrics,
    pub temperatures: Vec<Temperature>,
}
