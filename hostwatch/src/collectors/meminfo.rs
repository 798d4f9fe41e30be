use super::MemCounters;
use crate::error::CollectError;

/// Parse `/proc/meminfo`.
///
/// Input lines look like "MemAvailable:    8123456 kB". `MemTotal` is
/// mandatory. Kernels older than 3.14 have no `MemAvailable`; there it is
/// approximated as free + buffers + cached.
pub fn parse_meminfo(content: &str) -> Result<MemCounters, CollectError> {
    let mut total = None;
    let mut available = None;
    let mut counters = MemCounters::default();

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(value) = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
        else {
            continue;
        };

        match key.trim() {
            "MemTotal" => total = Some(value),
            "MemFree" => counters.free_kb = value,
            "MemAvailable" => available = Some(value),
            "Cached" => counters.cached_kb = value,
            "Buffers" => counters.buffers_kb = value,
            "SwapTotal" => counters.swap_total_kb = value,
            "SwapFree" => counters.swap_free_kb = value,
            _ => {}
        }
    }

    counters.total_kb =
        total.ok_or_else(|| CollectError::anomaly("/proc/meminfo", "no MemTotal line"))?;
    counters.available_kb = available
        .unwrap_or(
            counters
                .free_kb
                .saturating_add(counters.buffers_kb)
                .saturating_add(counters.cached_kb),
        )
        .min(counters.total_kb);
    Ok(counters)
}
