use super::mounts::statvfs_kb;
use super::{
    CounterSource, MountUsage, ProcessSample, RawCounters, Temperature, parse_cpu,
    parse_diskstats, parse_loadavg, parse_meminfo, parse_mounts, parse_netdev,
    parse_system_counters, parse_uptime,
};
use crate::error::CollectError;
use log::{debug, warn};
use procfs::process::all_processes_with_root;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const THERMAL_ZONES: usize = 8;

/// Reads counters from a procfs mount (normally `/proc`) and sysfs.
#[derive(Debug, Clone)]
pub struct ProcSource {
    proc_root: PathBuf,
    sys_root: PathBuf,
}

impl Default for ProcSource {
    fn default() -> Self {
        Self::new("/proc", "/sys")
    }
}

impl ProcSource {
    pub fn new(proc_root: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
        }
    }

    fn read(&self, name: &str) -> Result<String, CollectError> {
        let path = self.proc_root.join(name);
        fs::read_to_string(&path).map_err(|e| CollectError::unavailable(path, e))
    }

    fn mounts(&self) -> Result<Vec<MountUsage>, CollectError> {
        let content = self.read("mounts")?;
        Ok(parse_mounts(&content)
            .into_iter()
            .filter_map(|entry| {
                let (total_kb, free_kb) = statvfs_kb(Path::new(&entry.mount_point))?;
                Some(MountUsage {
                    device: entry.device,
                    mount_point: entry.mount_point,
                    total_kb,
                    free_kb,
                })
            })
            .collect())
    }

    fn temperatures(&self) -> Vec<Temperature> {
        let base = self.sys_root.join("class/thermal");
        (0..THERMAL_ZONES)
            .filter_map(|i| {
                let zone = base.join(format!("thermal_zone{i}"));
                let label = fs::read_to_string(zone.join("type")).ok()?;
                let millis: i64 = fs::read_to_string(zone.join("temp"))
                    .ok()?
                    .trim()
                    .parse()
                    .ok()?;
                Some(Temperature {
                    label: label.trim().to_string(),
                    celsius: millis as f32 / 1000.0,
                })
            })
            .collect()
    }
}

impl CounterSource for ProcSource {
    fn sample(&mut self) -> RawCounters {
        let stat = self.read("stat");
        let (cpu, system) = match &stat {
            Ok(content) => (parse_cpu(content), parse_system_counters(content)),
            Err(e) => (Err(rewrap(e)), Err(rewrap(e))),
        };

        RawCounters {
            cpu,
            system,
            memory: self.read("meminfo").and_then(|c| parse_meminfo(&c)),
            disks: self.read("diskstats").and_then(|c| parse_diskstats(&c)),
            network: self.read("net/dev").and_then(|c| parse_netdev(&c)),
            mounts: self.mounts(),
            load: self.read("loadavg").and_then(|c| parse_loadavg(&c)),
            uptime: self.read("uptime").and_then(|c| parse_uptime(&c)),
            temperatures: self.temperatures(),
        }
    }

    fn processes(&mut self) -> Result<Vec<ProcessSample>, CollectError> {
        let iter = all_processes_with_root(&self.proc_root).map_err(|e| {
            CollectError::unavailable(&self.proc_root, io::Error::other(e.to_string()))
        })?;

        let mut samples = Vec::new();
        for process in iter {
            // Processes routinely exit between readdir and the reads below.
            let Ok(process) = process else {
                continue;
            };
            let stat = match process.stat() {
                Ok(stat) => stat,
                Err(e) => {
                    debug!("[collect] skipping pid {}: {e}", process.pid());
                    continue;
                }
            };
            let rss_kb = process
                .status()
                .ok()
                .and_then(|status| status.vmrss)
                .unwrap_or(0);
            let Ok(pid) = u32::try_from(stat.pid) else {
                warn!("[collect] negative pid {} in {}", stat.pid, self.proc_root.display());
                continue;
            };

            samples.push(ProcessSample {
                pid,
                name: stat.comm,
                cpu_ticks: stat.utime.saturating_add(stat.stime),
                rss_kb,
            });
        }
        Ok(samples)
    }
}

// io::Error is not Clone; the stat file feeds two families.
fn rewrap(err: &CollectError) -> CollectError {
    match err {
        CollectError::SourceUnavailable { path, source } => CollectError::unavailable(
            path.clone(),
            io::Error::new(source.kind(), source.to_string()),
        ),
        CollectError::ParseAnomaly { what, detail } => CollectError::anomaly(*what, detail.clone()),
    }
}
