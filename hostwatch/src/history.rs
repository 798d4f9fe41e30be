use crate::types::DerivedMetrics;
use log::info;
use serde::Serialize;
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 120;

/// Fixed-capacity FIFO of samples. Index 0 is the oldest retained sample,
/// not a fixed point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySeries {
    capacity: usize,
    samples: VecDeque<f32>,
}

impl HistorySeries {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<f32> {
        self.samples.back().copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = f32> + ExactSizeIterator + '_ {
        self.samples.iter().copied()
    }
}

/// All tracked series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct History {
    capacity: usize,
    pub total_cpu: HistorySeries,
    pub per_core: Vec<HistorySeries>,
    pub memory: HistorySeries,
    pub swap: HistorySeries,
    pub disk_read: HistorySeries,
    pub disk_write: HistorySeries,
    pub net_rx: HistorySeries,
    pub net_tx: HistorySeries,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            total_cpu: HistorySeries::new(capacity),
            per_core: Vec::new(),
            memory: HistorySeries::new(capacity),
            swap: HistorySeries::new(capacity),
            disk_read: HistorySeries::new(capacity),
            disk_write: HistorySeries::new(capacity),
            net_rx: HistorySeries::new(capacity),
            net_tx: HistorySeries::new(capacity),
        }
    }

    /// Append the current values of every tracked metric.
    ///
    /// When the number of cores changes, per-core series are rebuilt empty.
    pub fn record(&mut self, metrics: &DerivedMetrics) {
        let cores = metrics.cpu.num_cores();
        if self.per_core.len() != cores {
            if !self.per_core.is_empty() {
                info!(
                    "[history] core topology changed {} -> {cores}, resetting per-core series",
                    self.per_core.len()
                );
            }
            self.per_core = (0..cores).map(|_| HistorySeries::new(self.capacity)).collect();
        }

        self.total_cpu.push(metrics.cpu.total_percent);
        for (series, value) in self.per_core.iter_mut().zip(&metrics.cpu.core_percent) {
            series.push(*value);
        }
        self.memory.push(metrics.memory.percent_used);
        self.swap.push(metrics.memory.swap_percent_used);
        self.disk_read.push(metrics.disk_io.read_mb_per_sec);
        self.disk_write.push(metrics.disk_io.write_mb_per_sec);
        self.net_rx.push(metrics.network.rx_kb_per_sec);
        self.net_tx.push(metrics.network.tx_kb_per_sec);
    }
}
