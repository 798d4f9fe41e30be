//! Delta/rate engine.
//!
//! Owns the previous raw sample of every counter family and turns each new
//! sample into [`DerivedMetrics`]. Percentages are clamped to [0, 100] and
//! rates are never negative: a counter that goes backwards (reset or wrap)
//! contributes a zero delta. A family without a previous sample derives
//! zeros.

use crate::collectors::{
    CpuCounters, CpuTimes, DiskCounters, MemCounters, MountUsage, NetCounters, RawCounters,
    SystemCounters,
};
use crate::error::{CollectError, MonitorError};
use crate::types::{
    CpuMetrics, DerivedMetrics, DiskIoMetrics, MemoryMetrics, MountMetrics, NetworkMetrics,
};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Bytes per sector in `/proc/diskstats`, regardless of the device.
pub const SECTOR_SIZE: u64 = 512;
const MIB: f64 = 1024.0 * 1024.0;
const KIB: f64 = 1024.0;
/// Elapsed times beyond this (suspend, debugger) are replaced by one second.
const MAX_ELAPSED: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
struct Stamped<T> {
    counters: T,
    at: Instant,
}

#[derive(Debug, Default)]
pub struct Engine {
    baseline: bool,
    prev_cpu: Option<CpuCounters>,
    prev_system: Option<Stamped<SystemCounters>>,
    prev_disks: Option<Stamped<DiskCounters>>,
    prev_network: Option<Stamped<NetCounters>>,
    network_origin: Option<NetCounters>,
    aggregate_jiffies: Option<u64>,
    failing: HashSet<&'static str>,
    metrics: DerivedMetrics,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> &DerivedMetrics {
        &self.metrics
    }

    /// Cumulative jiffies of the aggregate `cpu` line read this tick, or
    /// `None` when the CPU family failed. Process accounting measures its
    /// deltas against this clock.
    pub fn aggregate_jiffies(&self) -> Option<u64> {
        self.aggregate_jiffies
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline
    }

    /// Fold one tick of raw counters into a fresh set of derived metrics.
    ///
    /// Families that failed to read keep their previous derived values. On
    /// the very first tick the aggregate CPU line and the memory total are
    /// mandatory; without them there is no baseline and nothing is updated.
    pub fn update(&mut self, raw: RawCounters, now: Instant) -> Result<(), MonitorError> {
        let RawCounters {
            cpu,
            memory,
            system,
            disks,
            network,
            mounts,
            load,
            uptime,
            temperatures,
        } = raw;

        if !self.baseline {
            if let Err(source) = cpu {
                return Err(MonitorError::MissingBaseline {
                    family: "cpu",
                    source,
                });
            }
            if let Err(source) = memory {
                return Err(MonitorError::MissingBaseline {
                    family: "memory",
                    source,
                });
            }
        }

        let mut next = self.metrics.clone();

        match cpu {
            Ok(counters) => {
                self.recovered("cpu");
                next.cpu = self.derive_cpu(counters);
            }
            Err(e) => {
                self.degrade("cpu", &e);
                self.aggregate_jiffies = None;
            }
        }

        match memory {
            Ok(counters) => {
                self.recovered("memory");
                next.memory = memory_metrics(&counters);
            }
            Err(e) => self.degrade("memory", &e),
        }

        match system {
            Ok(counters) => {
                self.recovered("system");
                let (ctx, intr) = match self.prev_system.replace(Stamped { counters, at: now }) {
                    Some(prev) => {
                        let secs = elapsed_seconds(prev.at, now);
                        (
                            rate(prev.counters.ctx_switches, counters.ctx_switches, secs),
                            rate(prev.counters.interrupts, counters.interrupts, secs),
                        )
                    }
                    None => (0.0, 0.0),
                };
                next.system.total_ctx_switches = counters.ctx_switches;
                next.system.total_interrupts = counters.interrupts;
                next.system.ctx_switches_per_sec = ctx;
                next.system.interrupts_per_sec = intr;
            }
            Err(e) => self.degrade("system", &e),
        }

        match disks {
            Ok(counters) => {
                self.recovered("disks");
                next.disk_io = match self.prev_disks.replace(Stamped { counters, at: now }) {
                    Some(prev) => disk_rates(
                        &prev.counters,
                        &counters,
                        elapsed_seconds(prev.at, now),
                    ),
                    None => DiskIoMetrics::default(),
                };
            }
            Err(e) => self.degrade("disks", &e),
        }

        match network {
            Ok(counters) => {
                self.recovered("network");
                let origin = *self.network_origin.get_or_insert(counters);
                let mut metrics = match self.prev_network.replace(Stamped { counters, at: now }) {
                    Some(prev) => {
                        let secs = elapsed_seconds(prev.at, now);
                        NetworkMetrics {
                            rx_kb_per_sec: rate(prev.counters.rx_bytes, counters.rx_bytes, secs)
                                / KIB as f32,
                            tx_kb_per_sec: rate(prev.counters.tx_bytes, counters.tx_bytes, secs)
                                / KIB as f32,
                            ..NetworkMetrics::default()
                        }
                    }
                    None => NetworkMetrics::default(),
                };
                metrics.session_rx_bytes = counters.rx_bytes.saturating_sub(origin.rx_bytes);
                metrics.session_tx_bytes = counters.tx_bytes.saturating_sub(origin.tx_bytes);
                next.network = metrics;
            }
            Err(e) => self.degrade("network", &e),
        }

        match mounts {
            Ok(usage) => {
                self.recovered("mounts");
                next.mounts = usage.iter().map(mount_metrics).collect();
            }
            Err(e) => self.degrade("mounts", &e),
        }

        match load {
            Ok(load) => next.system.load_avg = load,
            Err(e) => self.degrade("loadavg", &e),
        }
        match uptime {
            Ok(secs) => next.system.uptime_seconds = secs,
            Err(e) => self.degrade("uptime", &e),
        }
        next.temperatures = temperatures;

        self.metrics = next;
        self.baseline = true;
        Ok(())
    }

    fn derive_cpu(&mut self, counters: CpuCounters) -> CpuMetrics {
        let metrics = match &self.prev_cpu {
            Some(prev) => {
                if prev.cores.len() != counters.cores.len() {
                    info!(
                        "[engine] core count changed {} -> {}",
                        prev.cores.len(),
                        counters.cores.len()
                    );
                }
                CpuMetrics {
                    total_percent: busy_percent(&prev.aggregate, &counters.aggregate),
                    core_percent: counters
                        .cores
                        .iter()
                        .enumerate()
                        .map(|(i, curr)| prev.cores.get(i).map_or(0.0, |p| busy_percent(p, curr)))
                        .collect(),
                }
            }
            None => CpuMetrics {
                total_percent: 0.0,
                core_percent: vec![0.0; counters.cores.len()],
            },
        };
        self.aggregate_jiffies = Some(counters.aggregate.total());
        self.prev_cpu = Some(counters);
        metrics
    }

    fn degrade(&mut self, family: &'static str, err: &CollectError) {
        if self.failing.insert(family) {
            warn!("[engine] {family} unavailable, keeping previous values: {err}");
        } else {
            debug!("[engine] {family} still unavailable: {err}");
        }
    }

    fn recovered(&mut self, family: &'static str) {
        if self.failing.remove(family) {
            info!("[engine] {family} available again");
        }
    }
}

/// 100 × (Δtotal − Δidle) / Δtotal, with the divisor floored at one jiffy.
pub fn busy_percent(prev: &CpuTimes, curr: &CpuTimes) -> f32 {
    let total = curr.total().saturating_sub(prev.total());
    let idle = curr.idle_all().saturating_sub(prev.idle_all());
    percent(total.saturating_sub(idle), total.max(1))
}

pub fn memory_metrics(mem: &MemCounters) -> MemoryMetrics {
    let used_kb = mem.total_kb.saturating_sub(mem.available_kb);
    let swap_used_kb = mem.swap_total_kb.saturating_sub(mem.swap_free_kb);
    MemoryMetrics {
        total_kb: mem.total_kb,
        free_kb: mem.free_kb,
        available_kb: mem.available_kb,
        used_kb,
        cached_kb: mem.cached_kb,
        buffers_kb: mem.buffers_kb,
        percent_used: percent(used_kb, mem.total_kb),
        swap_total_kb: mem.swap_total_kb,
        swap_free_kb: mem.swap_free_kb,
        swap_used_kb,
        swap_percent_used: percent(swap_used_kb, mem.swap_total_kb),
    }
}

fn mount_metrics(usage: &MountUsage) -> MountMetrics {
    let used_kb = usage.total_kb.saturating_sub(usage.free_kb);
    MountMetrics {
        device: usage.device.clone(),
        mount_point: usage.mount_point.clone(),
        total_kb: usage.total_kb,
        free_kb: usage.free_kb,
        used_kb,
        percent_used: percent(used_kb, usage.total_kb),
    }
}

pub fn disk_rates(prev: &DiskCounters, curr: &DiskCounters, secs: f64) -> DiskIoMetrics {
    let bytes = |p: u64, c: u64| c.saturating_sub(p).saturating_mul(SECTOR_SIZE) as f64;
    let io_ticks = curr.io_ticks_ms.saturating_sub(prev.io_ticks_ms) as f64;
    DiskIoMetrics {
        read_mb_per_sec: (bytes(prev.read_sectors, curr.read_sectors) / secs / MIB) as f32,
        write_mb_per_sec: (bytes(prev.write_sectors, curr.write_sectors) / secs / MIB) as f32,
        read_ops_per_sec: rate(prev.reads, curr.reads, secs),
        write_ops_per_sec: rate(prev.writes, curr.writes, secs),
        busy_percent: (io_ticks / (secs * 10.0)).clamp(0.0, 100.0) as f32,
    }
}

/// Seconds between two samples, or 1.0 when the clock went backwards, did
/// not move, or jumped past [`MAX_ELAPSED`].
pub fn elapsed_seconds(prev: Instant, now: Instant) -> f64 {
    match now.checked_duration_since(prev) {
        Some(d) if !d.is_zero() && d <= MAX_ELAPSED => d.as_secs_f64(),
        _ => 1.0,
    }
}

fn rate(prev: u64, curr: u64, secs: f64) -> f32 {
    (curr.saturating_sub(prev) as f64 / secs) as f32
}

fn percent(part: u64, whole: u64) -> f32 {
    if whole == 0 {
        return 0.0;
    }
    (100.0 * part as f64 / whole as f64).clamp(0.0, 100.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::LoadAvg;
    use proptest::array::{uniform4, uniform5, uniform8};
    use proptest::prelude::*;

    fn times(user: u64, idle: u64) -> CpuTimes {
        CpuTimes {
            user,
            idle,
            ..CpuTimes::default()
        }
    }

    fn mem(total_kb: u64, available_kb: u64) -> MemCounters {
        MemCounters {
            total_kb,
            available_kb,
            ..MemCounters::default()
        }
    }

    fn raw(cpu: CpuCounters, memory: MemCounters) -> RawCounters {
        RawCounters {
            cpu: Ok(cpu),
            memory: Ok(memory),
            system: Ok(SystemCounters {
                ctx_switches: 1000,
                interrupts: 500,
            }),
            disks: Ok(DiskCounters {
                reads: 10,
                writes: 10,
                read_sectors: 1000,
                write_sectors: 1000,
                io_ticks_ms: 100,
            }),
            network: Ok(NetCounters {
                rx_bytes: 4096,
                tx_bytes: 4096,
            }),
            mounts: Ok(Vec::new()),
            load: Ok(LoadAvg::default()),
            uptime: Ok(10.0),
            temperatures: Vec::new(),
        }
    }

    fn cpu(aggregate: CpuTimes, cores: Vec<CpuTimes>) -> CpuCounters {
        CpuCounters { aggregate, cores }
    }

    fn unavailable() -> CollectError {
        CollectError::unavailable("/proc/x", std::io::Error::other("gone"))
    }

    #[test]
    fn idle_only_delta_is_zero_busy() {
        // Δtotal = 50, Δidle = 50
        assert_eq!(busy_percent(&times(100, 900), &times(100, 950)), 0.0);
    }

    #[test]
    fn equal_user_and_idle_deltas_are_half_busy() {
        assert_eq!(busy_percent(&times(100, 900), &times(150, 950)), 50.0);
    }

    #[test]
    fn unchanged_idle_is_fully_busy() {
        assert_eq!(busy_percent(&times(100, 900), &times(200, 900)), 100.0);
    }

    #[test]
    fn iowait_counts_as_idle() {
        let prev = CpuTimes::default();
        let curr = CpuTimes {
            user: 50,
            iowait: 50,
            ..CpuTimes::default()
        };
        assert_eq!(busy_percent(&prev, &curr), 50.0);
    }

    #[test]
    fn memory_uses_available_not_free() {
        let m = memory_metrics(&mem(1000, 800));
        assert_eq!(m.used_kb, 200);
        assert_eq!(m.percent_used, 20.0);
        let m = memory_metrics(&mem(1000, 200));
        assert_eq!(m.percent_used, 80.0);
    }

    #[test]
    fn zero_totals_give_zero_percent() {
        let m = memory_metrics(&MemCounters::default());
        assert_eq!(m.percent_used, 0.0);
        assert_eq!(m.swap_percent_used, 0.0);
    }

    #[test]
    fn swap_percentage() {
        let m = memory_metrics(&MemCounters {
            total_kb: 100,
            available_kb: 100,
            swap_total_kb: 400,
            swap_free_kb: 300,
            ..MemCounters::default()
        });
        assert_eq!(m.swap_used_kb, 100);
        assert_eq!(m.swap_percent_used, 25.0);
    }

    #[test]
    fn disk_read_throughput() {
        let prev = DiskCounters {
            read_sectors: 1000,
            ..DiskCounters::default()
        };
        let curr = DiskCounters {
            read_sectors: 3000,
            ..DiskCounters::default()
        };
        let rates = disk_rates(&prev, &curr, 1.0);
        assert!((rates.read_mb_per_sec - 0.9765625).abs() < 1e-6);
        assert_eq!(rates.write_mb_per_sec, 0.0);
    }

    #[test]
    fn disk_busy_is_clamped() {
        let prev = DiskCounters::default();
        let curr = DiskCounters {
            io_ticks_ms: 5000,
            reads: 20,
            ..DiskCounters::default()
        };
        let rates = disk_rates(&prev, &curr, 2.0);
        assert_eq!(rates.busy_percent, 100.0);
        assert_eq!(rates.read_ops_per_sec, 10.0);

        let half = DiskCounters {
            io_ticks_ms: 500,
            ..DiskCounters::default()
        };
        assert_eq!(disk_rates(&prev, &half, 1.0).busy_percent, 50.0);
    }

    #[test]
    fn elapsed_is_sanity_clamped() {
        let t0 = Instant::now();
        assert_eq!(elapsed_seconds(t0, t0 + Duration::from_millis(500)), 0.5);
        assert_eq!(elapsed_seconds(t0, t0), 1.0);
        assert_eq!(elapsed_seconds(t0 + Duration::from_secs(1), t0), 1.0);
        assert_eq!(elapsed_seconds(t0, t0 + Duration::from_secs(60)), 1.0);
    }

    #[test]
    fn first_tick_derives_zeros() {
        let mut engine = Engine::new();
        let sample = cpu(times(100, 900), vec![times(50, 450), times(50, 450)]);
        engine.update(raw(sample, mem(1000, 800)), Instant::now()).unwrap();

        let m = engine.metrics();
        assert_eq!(m.cpu.total_percent, 0.0);
        assert_eq!(m.cpu.core_percent, vec![0.0, 0.0]);
        assert_eq!(m.disk_io, DiskIoMetrics::default());
        assert_eq!(m.network.rx_kb_per_sec, 0.0);
        assert_eq!(m.system.ctx_switches_per_sec, 0.0);
        assert_eq!(engine.aggregate_jiffies(), Some(1000));
        // Non-delta families are available immediately.
        assert_eq!(m.memory.percent_used, 20.0);
    }

    #[test]
    fn identical_samples_derive_zero_rates() {
        let mut engine = Engine::new();
        let t0 = Instant::now();
        let sample = cpu(times(100, 900), vec![times(100, 900)]);
        engine.update(raw(sample.clone(), mem(1000, 800)), t0).unwrap();
        engine
            .update(raw(sample, mem(1000, 800)), t0 + Duration::from_secs(1))
            .unwrap();

        let m = engine.metrics();
        assert_eq!(m.cpu.total_percent, 0.0);
        assert_eq!(m.cpu.core_percent, vec![0.0]);
        assert_eq!(m.disk_io, DiskIoMetrics::default());
        assert_eq!(m.network.rx_kb_per_sec, 0.0);
        assert_eq!(m.network.tx_kb_per_sec, 0.0);
        assert_eq!(m.system.ctx_switches_per_sec, 0.0);
        assert_eq!(m.system.interrupts_per_sec, 0.0);
    }

    #[test]
    fn aggregate_is_not_an_average_of_cores() {
        let mut engine = Engine::new();
        let t0 = Instant::now();
        engine
            .update(
                raw(
                    cpu(times(0, 0), vec![times(0, 0), times(0, 0)]),
                    mem(1000, 800),
                ),
                t0,
            )
            .unwrap();
        // Core 0 fully busy over 100 jiffies, core 1 idle over 300.
        engine
            .update(
                raw(
                    cpu(times(100, 300), vec![times(100, 0), times(0, 300)]),
                    mem(1000, 800),
                ),
                t0 + Duration::from_secs(1),
            )
            .unwrap();

        let m = engine.metrics();
        assert_eq!(m.cpu.core_percent, vec![100.0, 0.0]);
        assert_eq!(m.cpu.total_percent, 25.0);
        assert_eq!(engine.aggregate_jiffies(), Some(400));
    }

    #[test]
    fn rates_use_measured_elapsed_time() {
        let mut engine = Engine::new();
        let t0 = Instant::now();
        let mut first = raw(cpu(times(0, 0), vec![]), mem(1000, 800));
        first.network = Ok(NetCounters {
            rx_bytes: 0,
            tx_bytes: 0,
        });
        engine.update(first, t0).unwrap();

        let mut second = raw(cpu(times(0, 0), vec![]), mem(1000, 800));
        second.network = Ok(NetCounters {
            rx_bytes: 2048,
            tx_bytes: 1024,
        });
        second.system = Ok(SystemCounters {
            ctx_switches: 2000,
            interrupts: 1500,
        });
        engine.update(second, t0 + Duration::from_secs(2)).unwrap();

        let m = engine.metrics();
        assert_eq!(m.network.rx_kb_per_sec, 1.0);
        assert_eq!(m.network.tx_kb_per_sec, 0.5);
        assert_eq!(m.network.session_rx_bytes, 2048);
        assert_eq!(m.system.ctx_switches_per_sec, 500.0);
        assert_eq!(m.system.interrupts_per_sec, 500.0);
        assert_eq!(m.system.total_ctx_switches, 2000);
    }

    #[test]
    fn counter_reset_yields_zero_rate() {
        let mut engine = Engine::new();
        let t0 = Instant::now();
        engine
            .update(raw(cpu(times(500, 500), vec![]), mem(1000, 800)), t0)
            .unwrap();
        let mut second = raw(cpu(times(10, 10), vec![]), mem(1000, 800));
        second.disks = Ok(DiskCounters::default());
        engine.update(second, t0 + Duration::from_secs(1)).unwrap();

        let m = engine.metrics();
        assert_eq!(m.cpu.total_percent, 0.0);
        assert_eq!(m.disk_io, DiskIoMetrics::default());
    }

    #[test]
    fn first_tick_without_cpu_is_fatal() {
        let mut engine = Engine::new();
        let mut sample = raw(cpu(times(1, 1), vec![]), mem(1000, 800));
        sample.cpu = Err(unavailable());
        let err = engine.update(sample, Instant::now()).unwrap_err();
        assert!(matches!(
            err,
            MonitorError::MissingBaseline { family: "cpu", .. }
        ));
        assert!(!engine.has_baseline());
    }

    #[test]
    fn first_tick_without_memory_is_fatal() {
        let mut engine = Engine::new();
        let mut sample = raw(cpu(times(1, 1), vec![]), mem(1000, 800));
        sample.memory = Err(CollectError::anomaly("/proc/meminfo", "no MemTotal line"));
        let err = engine.update(sample, Instant::now()).unwrap_err();
        assert!(matches!(
            err,
            MonitorError::MissingBaseline {
                family: "memory",
                ..
            }
        ));
    }

    #[test]
    fn later_missing_families_keep_previous_values() {
        let mut engine = Engine::new();
        let t0 = Instant::now();
        engine
            .update(raw(cpu(times(0, 0), vec![times(0, 0)]), mem(1000, 800)), t0)
            .unwrap();
        engine
            .update(
                raw(cpu(times(50, 50), vec![times(50, 50)]), mem(1000, 500)),
                t0 + Duration::from_secs(1),
            )
            .unwrap();
        let before = engine.metrics().clone();
        assert_eq!(before.cpu.total_percent, 50.0);

        let mut broken = raw(cpu(times(0, 0), vec![]), mem(1, 1));
        broken.cpu = Err(unavailable());
        broken.memory = Err(unavailable());
        broken.disks = Err(unavailable());
        engine.update(broken, t0 + Duration::from_secs(2)).unwrap();

        let after = engine.metrics();
        assert_eq!(after.cpu, before.cpu);
        assert_eq!(after.memory, before.memory);
        assert_eq!(after.disk_io, before.disk_io);
        assert_eq!(engine.aggregate_jiffies(), None);
    }

    #[test]
    fn core_topology_change_reallocates() {
        let mut engine = Engine::new();
        let t0 = Instant::now();
        engine
            .update(raw(cpu(times(0, 0), vec![times(0, 0)]), mem(1000, 800)), t0)
            .unwrap();
        engine
            .update(
                raw(
                    cpu(times(100, 100), vec![times(50, 50), times(50, 50)]),
                    mem(1000, 800),
                ),
                t0 + Duration::from_secs(1),
            )
            .unwrap();
        // The new core has no previous sample yet.
        assert_eq!(engine.metrics().cpu.core_percent, vec![50.0, 0.0]);
    }

    fn counter() -> impl Strategy<Value = u64> + Clone {
        prop_oneof![0u64..10_000_000, any::<u64>()]
    }

    /// A sample and a later one whose every column is at least as large,
    /// saturating at `u64::MAX`.
    fn cpu_pair() -> impl Strategy<Value = (CpuTimes, CpuTimes)> {
        (uniform8(counter()), uniform8(counter())).prop_map(|(base, step)| {
            let at = |v: [u64; 8]| CpuTimes {
                user: v[0],
                nice: v[1],
                system: v[2],
                idle: v[3],
                iowait: v[4],
                irq: v[5],
                softirq: v[6],
                steal: v[7],
            };
            let mut next = base;
            for (n, s) in next.iter_mut().zip(step) {
                *n = n.saturating_add(s);
            }
            (at(base), at(next))
        })
    }

    fn disk_pair() -> impl Strategy<Value = (DiskCounters, DiskCounters)> {
        (uniform5(counter()), uniform5(counter())).prop_map(|(base, step)| {
            let at = |v: [u64; 5]| DiskCounters {
                reads: v[0],
                writes: v[1],
                read_sectors: v[2],
                write_sectors: v[3],
                io_ticks_ms: v[4],
            };
            let mut next = base;
            for (n, s) in next.iter_mut().zip(step) {
                *n = n.saturating_add(s);
            }
            (at(base), at(next))
        })
    }

    fn mem_counters() -> impl Strategy<Value = MemCounters> {
        uniform4(counter()).prop_map(|[total_kb, available_kb, swap_total_kb, swap_free_kb]| {
            MemCounters {
                total_kb,
                available_kb,
                swap_total_kb,
                swap_free_kb,
                ..MemCounters::default()
            }
        })
    }

    proptest! {
        #[test]
        fn non_decreasing_counters_stay_in_range(
            (agg_prev, agg_next) in cpu_pair(),
            (core_prev, core_next) in cpu_pair(),
            (disk_prev, disk_next) in disk_pair(),
            memory in mem_counters(),
            elapsed_ms in 0u64..20_000,
        ) {
            let mut engine = Engine::new();
            let t0 = Instant::now();

            let mut first = raw(cpu(agg_prev, vec![core_prev]), memory);
            first.disks = Ok(disk_prev);
            engine.update(first, t0).unwrap();

            let mut second = raw(cpu(agg_next, vec![core_next]), memory);
            second.disks = Ok(disk_next);
            engine
                .update(second, t0 + Duration::from_millis(elapsed_ms))
                .unwrap();

            let m = engine.metrics();
            for pct in [
                m.cpu.total_percent,
                m.cpu.core_percent[0],
                m.memory.percent_used,
                m.memory.swap_percent_used,
                m.disk_io.busy_percent,
            ] {
                prop_assert!((0.0..=100.0).contains(&pct), "{pct}");
            }
            for rate in [
                m.disk_io.read_mb_per_sec,
                m.disk_io.write_mb_per_sec,
                m.disk_io.read_ops_per_sec,
                m.disk_io.write_ops_per_sec,
            ] {
                prop_assert!(rate >= 0.0, "{rate}");
            }
        }
    }
}
