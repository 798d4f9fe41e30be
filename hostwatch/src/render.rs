use crate::history::HistorySeries;
use crate::process::SortKey;
use crate::snapshot::{Renderer, Snapshot};
use colored::*;
use std::fmt::Write as _;
use std::io::Write;

const BAR_WIDTH: usize = 30;
const SPARK: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Human-readable terminal output.
pub struct TextRenderer<W: Write> {
    out: W,
    color: bool,
    clear_screen: bool,
    max_rows: usize,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            clear_screen: false,
            max_rows: 20,
        }
    }

    /// Redraw in place instead of scrolling.
    pub fn live(mut self) -> Self {
        self.clear_screen = true;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn strong(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn gauge(&self, percent: f32) -> String {
        let color = match percent {
            p if p >= 90.0 => Color::Red,
            p if p >= 60.0 => Color::Yellow,
            _ => Color::Green,
        };
        self.paint(&bar(percent, BAR_WIDTH), color)
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, snap: &Snapshot) -> anyhow::Result<()> {
        let m = &snap.metrics;
        let h = &snap.history;
        let mut buf = String::new();

        if self.clear_screen {
            buf.push_str("\x1b[2J\x1b[H");
        }

        writeln!(
            buf,
            "{}  up {}  load {:.2} {:.2} {:.2}  {}",
            self.strong("hostwatch", Color::Cyan),
            format_uptime(m.system.uptime_seconds),
            m.system.load_avg.one,
            m.system.load_avg.five,
            m.system.load_avg.fifteen,
            snap.taken_at.format("%H:%M:%S"),
        )?;

        writeln!(
            buf,
            "CPU  {} {}",
            self.gauge(m.cpu.total_percent),
            sparkline(&h.total_cpu, Some(100.0), BAR_WIDTH)
        )?;
        for (i, pct) in m.cpu.core_percent.iter().enumerate() {
            let spark = h
                .per_core
                .get(i)
                .map(|s| sparkline(s, Some(100.0), BAR_WIDTH))
                .unwrap_or_default();
            writeln!(buf, "  {:<3}{} {}", i, self.gauge(*pct), spark)?;
        }

        writeln!(
            buf,
            "MEM  {}  {} / {}  cached {}  buffers {}",
            self.gauge(m.memory.percent_used),
            format_size(m.memory.used_kb),
            format_size(m.memory.total_kb),
            format_size(m.memory.cached_kb),
            format_size(m.memory.buffers_kb),
        )?;
        writeln!(
            buf,
            "SWAP {}  {} / {}",
            self.gauge(m.memory.swap_percent_used),
            format_size(m.memory.swap_used_kb),
            format_size(m.memory.swap_total_kb),
        )?;

        for mount in &m.mounts {
            writeln!(
                buf,
                "DISK {}  {} / {}  {}",
                self.gauge(mount.percent_used),
                format_size(mount.used_kb),
                format_size(mount.total_kb),
                mount.mount_point,
            )?;
        }

        let io = &m.disk_io;
        writeln!(
            buf,
            "IO   read {:.2} MB/s ({:.0} ops/s)  write {:.2} MB/s ({:.0} ops/s)  busy {:.1}%  {}",
            io.read_mb_per_sec,
            io.read_ops_per_sec,
            io.write_mb_per_sec,
            io.write_ops_per_sec,
            io.busy_percent,
            sparkline(&h.disk_read, None, BAR_WIDTH / 2),
        )?;

        let net = &m.network;
        writeln!(
            buf,
            "NET  rx {:.1} KB/s  tx {:.1} KB/s  session rx {} tx {}",
            net.rx_kb_per_sec,
            net.tx_kb_per_sec,
            format_size(net.session_rx_bytes / 1024),
            format_size(net.session_tx_bytes / 1024),
        )?;
        writeln!(
            buf,
            "SYS  ctxt {:.0}/s  intr {:.0}/s",
            m.system.ctx_switches_per_sec, m.system.interrupts_per_sec
        )?;

        if !m.temperatures.is_empty() {
            let temps: Vec<String> = m
                .temperatures
                .iter()
                .map(|t| format!("{} {:.1}°C", t.label, t.celsius))
                .collect();
            writeln!(buf, "TEMP {}", temps.join("  "))?;
        }

        if let Some(alert) = &snap.alert {
            let who = alert
                .top_process
                .as_ref()
                .map(|p| format!(" (top: {} pid {} at {:.1}%)", p.name, p.pid, p.cpu_percent))
                .unwrap_or_default();
            let line = format!(
                "ALERT CPU {:.1}% >= {:.1}%{who}",
                alert.total_percent, alert.threshold
            );
            writeln!(buf, "{}", self.strong(&line, Color::Red))?;
        }
        if let Some(message) = &snap.message {
            writeln!(buf, "{}", self.paint(message, Color::Yellow))?;
        }

        let sort = match snap.sort_key {
            SortKey::Cpu => "CPU",
            SortKey::Memory => "MEM",
        };
        let filter = snap
            .filter
            .as_ref()
            .map(|f| format!(", search \"{f}\""))
            .unwrap_or_default();
        writeln!(
            buf,
            "\nProcesses (sorted by {sort}{filter}, {}/{})",
            snap.processes.len(),
            snap.total_processes
        )?;
        writeln!(buf, "{:>4} {:<8} {:>6} {:>6} NAME", "#", "PID", "CPU%", "MEM%")?;
        for (i, p) in snap.processes.iter().take(self.max_rows).enumerate() {
            writeln!(
                buf,
                "{:>4} {:<8} {:>6.1} {:>6.1} {}",
                i, p.pid, p.cpu_percent, p.mem_percent, p.name
            )?;
        }

        self.out.write_all(buf.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

/// One JSON document per snapshot, newline delimited.
pub struct JsonRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn render(&mut self, snapshot: &Snapshot) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.out, snapshot)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

pub fn format_size(size_kb: u64) -> String {
    const MB: u64 = 1024;
    const GB: u64 = 1024 * 1024;
    match size_kb {
        s if s < MB => format!("{s} KB"),
        s if s < GB => format!("{:.1} MB", s as f64 / MB as f64),
        s => format!("{:.1} GB", s as f64 / GB as f64),
    }
}

fn format_uptime(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (days, rem) = (total / 86_400, total % 86_400);
    let (hours, rem) = (rem / 3600, rem % 3600);
    let (mins, secs) = (rem / 60, rem % 60);
    if days > 0 {
        format!("{days}d {hours:02}:{mins:02}:{secs:02}")
    } else {
        format!("{hours:02}:{mins:02}:{secs:02}")
    }
}

/// "[#####     ]  50.0%"
pub fn bar(percent: f32, width: usize) -> String {
    let pct = percent.clamp(0.0, 100.0);
    let fill = ((width as f32 * pct / 100.0).round() as usize).min(width);
    format!(
        "[{}{}] {:>5.1}%",
        "#".repeat(fill),
        " ".repeat(width - fill),
        pct
    )
}

/// Render the newest `width` samples. `ceiling` fixes the scale (100 for
/// percentages); without it the series maximum is used.
pub fn sparkline(series: &HistorySeries, ceiling: Option<f32>, width: usize) -> String {
    let skip = series.len().saturating_sub(width);
    let top = ceiling
        .unwrap_or_else(|| series.iter().fold(0.0, f32::max))
        .max(f32::EPSILON);
    series
        .iter()
        .skip(skip)
        .map(|v| {
            let level = ((v / top).clamp(0.0, 1.0) * (SPARK.len() - 1) as f32).round() as usize;
            SPARK[level]
        })
        .collect()
}
