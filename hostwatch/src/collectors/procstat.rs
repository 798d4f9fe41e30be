//! Parsers for `/proc/stat`, `/proc/loadavg` and `/proc/uptime`.
//!
//! Format from /proc/stat:
//!   cpu  4705 356 584 3699176 23060 0 277 0 0 0
//!   cpu0 1393 280 161 917647 6046 0 76 0 0 0
//!   ...
//!   intr 1462898 ...
//!   ctxt 115315

use super::{CpuCounters, CpuTimes, LoadAvg, SystemCounters};
use crate::error::CollectError;
use log::debug;

/// Parse the aggregate and per-core CPU lines.
///
/// Core lines keep their file order. A missing aggregate line fails the
/// whole family.
pub fn parse_cpu(content: &str) -> Result<CpuCounters, CollectError> {
    let mut aggregate = None;
    let mut cores = Vec::new();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let Some(label) = parts.next() else {
            continue;
        };
        let Some(suffix) = label.strip_prefix("cpu") else {
            continue;
        };

        let Some(times) = parse_cpu_times(parts) else {
            debug!("[collect] skipping malformed cpu line: {line}");
            continue;
        };

        if suffix.is_empty() {
            aggregate = Some(times);
        } else if suffix.bytes().all(|b| b.is_ascii_digit()) {
            cores.push(times);
        }
    }

    let aggregate =
        aggregate.ok_or_else(|| CollectError::anomaly("/proc/stat", "no aggregate cpu line"))?;
    Ok(CpuCounters { aggregate, cores })
}

fn parse_cpu_times<'a>(fields: impl Iterator<Item = &'a str>) -> Option<CpuTimes> {
    let values: Vec<u64> = fields
        .take(8)
        .map(|f| f.parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;

    // user nice system idle are present on every kernel; the rest came later.
    if values.len() < 4 {
        return None;
    }
    let field = |i: usize| values.get(i).copied().unwrap_or(0);

    Some(CpuTimes {
        user: field(0),
        nice: field(1),
        system: field(2),
        idle: field(3),
        iowait: field(4),
        irq: field(5),
        softirq: field(6),
        steal: field(7),
    })
}

/// Parse the `ctxt` and `intr` totals. Only the first `intr` column (the
/// grand total) is used.
pub fn parse_system_counters(content: &str) -> Result<SystemCounters, CollectError> {
    let mut ctx_switches = None;
    let mut interrupts = None;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("ctxt") => ctx_switches = parts.next().and_then(|v| v.parse().ok()),
            Some("intr") => interrupts = parts.next().and_then(|v| v.parse().ok()),
            _ => {}
        }
    }

    if ctx_switches.is_none() && interrupts.is_none() {
        return Err(CollectError::anomaly("/proc/stat", "no ctxt or intr line"));
    }

    Ok(SystemCounters {
        ctx_switches: ctx_switches.unwrap_or(0),
        interrupts: interrupts.unwrap_or(0),
    })
}

/// Input: "0.52 0.58 0.59 1/389 12345"
pub fn parse_loadavg(content: &str) -> Result<LoadAvg, CollectError> {
    let values: Vec<f32> = content
        .split_whitespace()
        .take(3)
        .filter_map(|v| v.parse().ok())
        .collect();

    match values[..] {
        [one, five, fifteen] => Ok(LoadAvg { one, five, fifteen }),
        _ => Err(CollectError::anomaly(
            "/proc/loadavg",
            format!("unexpected content {:?}", content.trim()),
        )),
    }
}

pub fn parse_uptime(content: &str) -> Result<f64, CollectError> {
    content
        .split_whitespace()
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .ok_or_else(|| {
            CollectError::anomaly("/proc/uptime", format!("unexpected content {:?}", content.trim()))
        })
}
