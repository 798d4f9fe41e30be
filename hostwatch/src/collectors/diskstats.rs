//! Parser for `/proc/diskstats`.
//!
//!   259       0 nvme0n1 120 0 9000 50 300 10 24000 400 0 380 450 ...
//!   major minor name    reads merged sectors_read ms_read writes merged
//!   sectors_written ms_written in_flight io_ticks ...

use super::DiskCounters;
use crate::error::CollectError;

const NAME: usize = 2;
const READS: usize = 3;
const READ_SECTORS: usize = 5;
const WRITES: usize = 7;
const WRITE_SECTORS: usize = 9;
const IO_TICKS: usize = 12;

/// Whether a device contributes to the aggregate. Loop devices, ram disks
/// and anything ending in a digit (partitions) are left out so a disk and
/// its partitions are not counted twice.
pub fn is_aggregated_device(name: &str) -> bool {
    if name.is_empty() || name.starts_with("loop") || name.starts_with("ram") {
        return false;
    }
    !name.ends_with(|c: char| c.is_ascii_digit())
}

pub fn parse_diskstats(content: &str) -> Result<DiskCounters, CollectError> {
    let mut total = DiskCounters::default();

    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() <= IO_TICKS || !is_aggregated_device(fields[NAME]) {
            continue;
        }

        let num = |i: usize| fields[i].parse::<u64>().ok();
        let (Some(reads), Some(read_sectors), Some(writes), Some(write_sectors), Some(io_ticks)) = (
            num(READS),
            num(READ_SECTORS),
            num(WRITES),
            num(WRITE_SECTORS),
            num(IO_TICKS),
        ) else {
            continue;
        };

        total.reads = total.reads.saturating_add(reads);
        total.read_sectors = total.read_sectors.saturating_add(read_sectors);
        total.writes = total.writes.saturating_add(writes);
        total.write_sectors = total.write_sectors.saturating_add(write_sectors);
        total.io_ticks_ms = total.io_ticks_ms.saturating_add(io_ticks);
    }

    Ok(total)
}
