//! Counter readers.
//!
//! Every parser here is a pure function from the text of one kernel
//! interface to a typed record of cumulative counters. Reading the files is
//! the job of a [`CounterSource`]; [`ProcSource`] is the procfs-backed one.
//!
//! Parsing is line oriented and tolerant. Unknown or malformed lines are
//! skipped. Only the aggregate `cpu` line of `/proc/stat` and `MemTotal` of
//! `/proc/meminfo` are mandatory for their family.

mod diskstats;
mod meminfo;
mod mounts;
mod netdev;
mod procstat;
mod source;

pub use diskstats::{is_aggregated_device, parse_diskstats};
pub use meminfo::parse_meminfo;
pub use mounts::{MountEntry, is_pseudo_fs, parse_mounts};
pub use netdev::parse_netdev;
pub use procstat::{parse_cpu, parse_loadavg, parse_system_counters, parse_uptime};
pub use source::ProcSource;

use crate::error::CollectError;
use serde::Serialize;

/// Jiffy counters of one `cpu` line, in `/proc/stat` column order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    /// Sum of all columns, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .into_iter()
        .fold(0, u64::saturating_add)
    }

    /// Idle time including time spent waiting on I/O.
    pub fn idle_all(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuCounters {
    /// The synthetic all-cores `cpu` line.
    pub aggregate: CpuTimes,
    /// Per-core lines in file order; the index is the core ordinal.
    pub cores: Vec<CpuTimes>,
}

/// Context switch and interrupt totals since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemCounters {
    pub ctx_switches: u64,
    pub interrupts: u64,
}

/// `/proc/meminfo` values, all in KiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemCounters {
    pub total_kb: u64,
    pub free_kb: u64,
    pub available_kb: u64,
    pub cached_kb: u64,
    pub buffers_kb: u64,
    pub swap_total_kb: u64,
    pub swap_free_kb: u64,
}

/// I/O counters summed over whole block devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub reads: u64,
    pub writes: u64,
    pub read_sectors: u64,
    pub write_sectors: u64,
    pub io_ticks_ms: u64,
}

/// Byte counters summed over non-loopback interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Capacity of one mounted filesystem as reported by `statvfs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountUsage {
    pub device: String,
    pub mount_point: String,
    pub total_kb: u64,
    pub free_kb: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadAvg {
    pub one: f32,
    pub five: f32,
    pub fifteen: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Temperature {
    pub label: String,
    pub celsius: f32,
}

/// Cumulative accounting for one process at the time it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    /// utime + stime, in clock ticks.
    pub cpu_ticks: u64,
    pub rss_kb: u64,
}

/// One tick's worth of raw counters. Each family fails independently.
#[derive(Debug)]
pub struct RawCounters {
    pub cpu: Result<CpuCounters, CollectError>,
    pub memory: Result<MemCounters, CollectError>,
    pub system: Result<SystemCounters, CollectError>,
    pub disks: Result<DiskCounters, CollectError>,
    pub network: Result<NetCounters, CollectError>,
    pub mounts: Result<Vec<MountUsage>, CollectError>,
    pub load: Result<LoadAvg, CollectError>,
    pub uptime: Result<f64, CollectError>,
    pub temperatures: Vec<Temperature>,
}

/// Somewhere kernel counters can be read from.
pub trait CounterSource {
    /// Read every system-wide counter family once.
    fn sample(&mut self) -> RawCounters;

    /// Enumerate live processes with their cumulative accounting.
    fn processes(&mut self) -> Result<Vec<ProcessSample>, CollectError>;
}
