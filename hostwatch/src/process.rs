//! Process table builder.
//!
//! CPU share is derived from per-process tick deltas against the aggregate
//! jiffy delta over the same interval, scaled by core count so one
//! saturated core reads 100%.
//! A PID seen for the first time has no previous sample and reads 0% for
//! that tick. Accounting for PIDs that disappear is pruned every tick.

use crate::collectors::ProcessSample;
use log::debug;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Cpu,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub mem_percent: f32,
}

/// Clock the per-process deltas are measured against.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuWindow {
    /// Cumulative jiffies of the aggregate `cpu` line this tick, `None` when
    /// it could not be read.
    pub aggregate_jiffies: Option<u64>,
    pub num_cores: usize,
}

/// A process's tick count together with the aggregate clock it was read at,
/// so both sides of the share always span the same interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Baseline {
    cpu_ticks: u64,
    aggregate_jiffies: u64,
}

#[derive(Debug, Default)]
pub struct ProcessTable {
    accounting: HashMap<u32, Baseline>,
    records: Vec<ProcessRecord>,
    filtered: Option<Vec<ProcessRecord>>,
    filter: String,
    sort_key: SortKey,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the table from a fresh enumeration.
    ///
    /// Without an aggregate clock every process reads 0% and existing
    /// baselines are kept as they are, so the next tick measures the whole
    /// gap on both sides.
    pub fn update(&mut self, samples: Vec<ProcessSample>, window: CpuWindow, mem_total_kb: u64) {
        let cores = window.num_cores.max(1);
        let mut seen = HashSet::with_capacity(samples.len());
        let mut accounting = HashMap::with_capacity(samples.len());
        let mut records = Vec::with_capacity(samples.len());

        for sample in samples {
            if !seen.insert(sample.pid) {
                continue;
            }

            let prev = self.accounting.get(&sample.pid).copied();
            let (cpu_percent, baseline) = match (prev, window.aggregate_jiffies) {
                (Some(prev), Some(now)) => (
                    cpu_share(prev, sample.cpu_ticks, now, cores),
                    Some(Baseline {
                        cpu_ticks: sample.cpu_ticks,
                        aggregate_jiffies: now,
                    }),
                ),
                (None, Some(now)) => (
                    0.0,
                    Some(Baseline {
                        cpu_ticks: sample.cpu_ticks,
                        aggregate_jiffies: now,
                    }),
                ),
                (prev, None) => (0.0, prev),
            };
            if let Some(baseline) = baseline {
                accounting.insert(sample.pid, baseline);
            }

            let mem_percent = if mem_total_kb == 0 {
                0.0
            } else {
                (100.0 * sample.rss_kb as f64 / mem_total_kb as f64).clamp(0.0, 100.0) as f32
            };

            records.push(ProcessRecord {
                pid: sample.pid,
                name: sample.name,
                cpu_percent,
                mem_percent,
            });
        }

        let exited = self
            .accounting
            .keys()
            .filter(|pid| !seen.contains(*pid))
            .count();
        if exited > 0 {
            debug!("[procs] pruning {exited} exited pids, {} tracked", accounting.len());
        }
        self.accounting = accounting;

        self.records = records;
        self.resort();
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        if self.sort_key != key {
            self.sort_key = key;
            self.resort();
        }
    }

    pub fn filter(&self) -> Option<&str> {
        (!self.filter.is_empty()).then_some(self.filter.as_str())
    }

    /// Case-insensitive substring filter on the process name. An empty
    /// string clears it.
    pub fn set_filter(&mut self, text: &str) {
        self.filter = text.trim().to_string();
        self.refilter();
    }

    /// The list currently on display: filtered if a filter is set, else the
    /// full table. Index-based selection must resolve against this.
    pub fn displayed(&self) -> &[ProcessRecord] {
        self.filtered.as_deref().unwrap_or(&self.records)
    }

    pub fn all(&self) -> &[ProcessRecord] {
        &self.records
    }

    pub fn get_displayed(&self, index: usize) -> Option<&ProcessRecord> {
        self.displayed().get(index)
    }

    /// Highest CPU consumer in the full table.
    pub fn top_cpu(&self) -> Option<&ProcessRecord> {
        self.records
            .iter()
            .min_by(|a, b| compare(SortKey::Cpu, a, b))
    }

    pub fn is_tracked(&self, pid: u32) -> bool {
        self.accounting.contains_key(&pid)
    }

    pub fn tracked_count(&self) -> usize {
        self.accounting.len()
    }

    fn resort(&mut self) {
        let key = self.sort_key;
        self.records.sort_by(|a, b| compare(key, a, b));
        self.refilter();
    }

    fn refilter(&mut self) {
        if self.filter.is_empty() {
            self.filtered = None;
            return;
        }
        let needle = self.filter.to_lowercase();
        self.filtered = Some(
            self.records
                .iter()
                .filter(|r| r.name.to_lowercase().contains(&needle))
                .cloned()
                .collect(),
        );
    }
}

/// 100 × Δticks × cores / Δaggregate, clamped to one full core per core.
fn cpu_share(prev: Baseline, cpu_ticks: u64, aggregate_jiffies: u64, cores: usize) -> f32 {
    let window = aggregate_jiffies.saturating_sub(prev.aggregate_jiffies);
    if window == 0 {
        return 0.0;
    }
    let delta = cpu_ticks.saturating_sub(prev.cpu_ticks);
    let pct = 100.0 * delta as f64 * cores as f64 / window as f64;
    pct.clamp(0.0, 100.0 * cores as f64) as f32
}

/// Descending by the primary key, ties broken by the other key descending.
fn compare(key: SortKey, a: &ProcessRecord, b: &ProcessRecord) -> Ordering {
    match key {
        SortKey::Cpu => b
            .cpu_percent
            .total_cmp(&a.cpu_percent)
            .then_with(|| b.mem_percent.total_cmp(&a.mem_percent)),
        SortKey::Memory => b
            .mem_percent
            .total_cmp(&a.mem_percent)
            .then_with(|| b.cpu_percent.total_cmp(&a.cpu_percent)),
    }
}
