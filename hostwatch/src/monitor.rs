//! Tick loop and command handling.
//!
//! One task owns the [`Monitor`]; everything else talks to it through
//! [`Command`]s on an mpsc channel and sees its state only as published
//! [`Snapshot`]s. A kill is awaited inline, so no tick starts while a
//! termination sequence is in flight.

use crate::collectors::CounterSource;
use crate::engine::Engine;
use crate::error::MonitorError;
use crate::history::History;
use crate::process::{CpuWindow, ProcessRecord, ProcessTable, SortKey};
use crate::snapshot::{CpuAlert, Renderer, Snapshot};
use crate::termination::{TerminationOutcome, Terminator};
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval_at};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Refresh,
    SetSort(SortKey),
    /// Empty text clears the filter.
    SetFilter(String),
    Kill(u32),
    /// Row index into the displayed list.
    KillSelected(usize),
    KillTop,
    Stop,
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub history_length: usize,
    /// `None` disables the CPU alert.
    pub cpu_threshold: Option<f32>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            history_length: crate::history::DEFAULT_CAPACITY,
            cpu_threshold: Some(80.0),
        }
    }
}

pub struct Monitor<C: CounterSource> {
    source: C,
    engine: Engine,
    history: History,
    processes: ProcessTable,
    terminator: Terminator,
    cpu_threshold: Option<f32>,
    tick: u64,
    message: Option<String>,
    snapshot: Arc<Snapshot>,
    stopping: bool,
}

impl<C: CounterSource> Monitor<C> {
    /// Take the baseline sample. Fails if the aggregate CPU line or the
    /// memory total cannot be read.
    pub fn new(
        source: C,
        terminator: Terminator,
        settings: MonitorSettings,
    ) -> Result<Self, MonitorError> {
        let history = History::new(settings.history_length);
        let snapshot = Arc::new(Snapshot {
            taken_at: Utc::now(),
            tick: 0,
            metrics: Default::default(),
            history: history.clone(),
            sort_key: SortKey::default(),
            filter: None,
            processes: Vec::new(),
            total_processes: 0,
            alert: None,
            message: None,
        });

        let mut monitor = Self {
            source,
            engine: Engine::new(),
            history,
            processes: ProcessTable::new(),
            terminator,
            cpu_threshold: settings.cpu_threshold,
            tick: 0,
            message: None,
            snapshot,
            stopping: false,
        };
        monitor.collect()?;
        info!("[monitor] baseline taken");
        Ok(monitor)
    }

    /// Sample, derive, record history, rebuild the process table and
    /// publish a new snapshot.
    pub fn collect(&mut self) -> Result<(), MonitorError> {
        let raw = self.source.sample();
        self.engine.update(raw, Instant::now())?;

        let metrics = self.engine.metrics();
        self.history.record(metrics);

        match self.source.processes() {
            Ok(samples) => {
                let window = CpuWindow {
                    aggregate_jiffies: self.engine.aggregate_jiffies(),
                    num_cores: metrics.cpu.num_cores(),
                };
                self.processes
                    .update(samples, window, metrics.memory.total_kb);
            }
            Err(e) => warn!("[procs] enumeration failed, keeping previous table: {e}"),
        }

        self.tick += 1;
        debug!(
            "[monitor] tick {} cpu={:.1}% procs={}",
            self.tick,
            metrics.cpu.total_percent,
            self.processes.all().len()
        );
        self.publish();
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    /// The list index-based selection resolves against.
    pub fn displayed(&self) -> &[ProcessRecord] {
        self.processes.displayed()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    pub fn stop(&mut self) {
        self.stopping = true;
    }

    pub fn refresh(&mut self) {
        if let Err(e) = self.collect() {
            warn!("[monitor] refresh failed: {e}");
        }
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        self.processes.set_sort_key(key);
        self.publish();
    }

    pub fn set_filter(&mut self, text: &str) {
        self.processes.set_filter(text);
        self.publish();
    }

    /// Run the termination sequence to completion, then refresh so the
    /// table no longer shows a process that is gone.
    pub async fn request_kill(&mut self, pid: u32) -> TerminationOutcome {
        info!("[monitor] kill requested for pid {pid}");
        let outcome = self.terminator.terminate(pid).await;
        self.message = Some(outcome.message.clone());
        self.refresh();
        outcome
    }

    pub async fn kill_selected(&mut self, index: usize) -> Option<TerminationOutcome> {
        let Some(pid) = self.processes.get_displayed(index).map(|p| p.pid) else {
            self.notify(format!("No process at row {index}."));
            return None;
        };
        Some(self.request_kill(pid).await)
    }

    pub async fn kill_top(&mut self) -> Option<TerminationOutcome> {
        let Some(pid) = self.processes.top_cpu().map(|p| p.pid) else {
            self.notify("No process to terminate.".to_string());
            return None;
        };
        Some(self.request_kill(pid).await)
    }

    pub async fn handle(&mut self, command: Command) {
        debug!("[monitor] command {command:?}");
        match command {
            Command::Refresh => self.refresh(),
            Command::SetSort(key) => self.set_sort_key(key),
            Command::SetFilter(text) => self.set_filter(&text),
            Command::Kill(pid) => {
                self.request_kill(pid).await;
            }
            Command::KillSelected(index) => {
                self.kill_selected(index).await;
            }
            Command::KillTop => {
                self.kill_top().await;
            }
            Command::Stop => self.stop(),
        }
    }

    /// Drive the loop until `Stop` arrives or every command sender is gone.
    /// Each tick and each command is followed by a render.
    pub async fn run<R: Renderer>(
        &mut self,
        renderer: &mut R,
        mut commands: mpsc::Receiver<Command>,
        period: Duration,
    ) -> anyhow::Result<()> {
        renderer.render(&self.snapshot)?;

        let start = tokio::time::Instant::now() + period;
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.stopping {
                info!("[monitor] stopping after tick {}", self.tick);
                break;
            }

            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => {
                        debug!("[monitor] command channel closed");
                        self.stop();
                    }
                },
                _ = ticker.tick() => self.refresh(),
            }

            if !self.stopping {
                renderer.render(&self.snapshot)?;
            }
        }
        Ok(())
    }

    fn notify(&mut self, message: String) {
        self.message = Some(message);
        self.publish();
    }

    fn alert(&self) -> Option<CpuAlert> {
        let threshold = self.cpu_threshold?;
        let total = self.engine.metrics().cpu.total_percent;
        (total >= threshold).then(|| CpuAlert {
            total_percent: total,
            threshold,
            top_process: self.processes.top_cpu().cloned(),
        })
    }

    fn publish(&mut self) {
        let alert = self.alert();
        self.snapshot = Arc::new(Snapshot {
            taken_at: Utc::now(),
            tick: self.tick,
            metrics: self.engine.metrics().clone(),
            history: self.history.clone(),
            sort_key: self.processes.sort_key(),
            filter: self.processes.filter().map(str::to_string),
            processes: self.processes.displayed().to_vec(),
            total_processes: self.processes.all().len(),
            alert,
            message: self.message.take(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::{
        CpuCounters, CpuTimes, DiskCounters, LoadAvg, MemCounters, NetCounters, ProcessSample,
        RawCounters, SystemCounters,
    };
    use crate::error::{CollectError, SignalError};
    use crate::termination::{Phase, SignalKind, Signaller, TerminationPolicy};
    use std::sync::Mutex;

    type ProcessList = Arc<Mutex<Vec<ProcessSample>>>;

    /// Each tick adds `busy` user jiffies and `100 - busy` idle jiffies per
    /// core on a two-core machine.
    struct FakeSource {
        ticks: u64,
        busy: u64,
        cpu_missing: bool,
        procs_missing: bool,
        procs: ProcessList,
    }

    impl FakeSource {
        fn new(busy: u64, procs: &ProcessList) -> Self {
            Self {
                ticks: 0,
                busy,
                cpu_missing: false,
                procs_missing: false,
                procs: Arc::clone(procs),
            }
        }
    }

    impl CounterSource for FakeSource {
        fn sample(&mut self) -> RawCounters {
            self.ticks += 1;
            let core = CpuTimes {
                user: self.busy * self.ticks,
                idle: (100 - self.busy) * self.ticks,
                ..CpuTimes::default()
            };
            let aggregate = CpuTimes {
                user: core.user * 2,
                idle: core.idle * 2,
                ..CpuTimes::default()
            };
            let cpu = if self.cpu_missing {
                Err(CollectError::anomaly("cpu", "no aggregate line"))
            } else {
                Ok(CpuCounters {
                    aggregate,
                    cores: vec![core, core],
                })
            };
            RawCounters {
                cpu,
                memory: Ok(MemCounters {
                    total_kb: 1000,
                    available_kb: 500,
                    ..MemCounters::default()
                }),
                system: Ok(SystemCounters::default()),
                disks: Ok(DiskCounters::default()),
                network: Ok(NetCounters::default()),
                mounts: Ok(Vec::new()),
                load: Ok(LoadAvg::default()),
                uptime: Ok(100.0),
                temperatures: Vec::new(),
            }
        }

        fn processes(&mut self) -> Result<Vec<ProcessSample>, CollectError> {
            let mut procs = self.procs.lock().unwrap();
            // Every process burns 10 ticks per sample.
            for p in procs.iter_mut() {
                p.cpu_ticks += 10 * p.pid as u64;
            }
            if self.procs_missing {
                return Err(CollectError::anomaly("processes", "enumeration failed"));
            }
            Ok(procs.clone())
        }
    }

    /// Removes the process from the shared list on SIGTERM.
    struct ObedientSignaller {
        procs: ProcessList,
    }

    impl Signaller for ObedientSignaller {
        fn signal(&self, pid: u32, _kind: SignalKind) -> Result<(), SignalError> {
            let mut procs = self.procs.lock().unwrap();
            let before = procs.len();
            procs.retain(|p| p.pid != pid);
            if procs.len() == before {
                return Err(SignalError::NoSuchProcess(pid));
            }
            Ok(())
        }

        fn is_alive(&self, pid: u32) -> bool {
            self.procs.lock().unwrap().iter().any(|p| p.pid == pid)
        }
    }

    fn process_list(names: &[(u32, &str)]) -> ProcessList {
        Arc::new(Mutex::new(
            names
                .iter()
                .map(|&(pid, name)| ProcessSample {
                    pid,
                    name: name.to_string(),
                    cpu_ticks: 0,
                    rss_kb: 10 * pid as u64,
                })
                .collect(),
        ))
    }

    fn monitor(busy: u64, procs: &ProcessList, threshold: Option<f32>) -> Monitor<FakeSource> {
        let terminator = Terminator::new(
            Arc::new(ObedientSignaller {
                procs: Arc::clone(procs),
            }),
            TerminationPolicy::default(),
        );
        let settings = MonitorSettings {
            history_length: 5,
            cpu_threshold: threshold,
        };
        Monitor::new(FakeSource::new(busy, procs), terminator, settings).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        snapshots: Vec<Snapshot>,
    }

    impl Renderer for Recorder {
        fn render(&mut self, snapshot: &Snapshot) -> anyhow::Result<()> {
            self.snapshots.push(snapshot.clone());
            Ok(())
        }
    }

    #[test]
    fn missing_cpu_on_first_tick_is_fatal() {
        let procs = process_list(&[]);
        let mut source = FakeSource::new(50, &procs);
        source.cpu_missing = true;
        let terminator = Terminator::new(
            Arc::new(ObedientSignaller { procs }),
            TerminationPolicy::default(),
        );

        let err = Monitor::new(source, terminator, MonitorSettings::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            MonitorError::MissingBaseline { family: "cpu", .. }
        ));
    }

    #[test]
    fn each_collect_publishes_a_new_tick() {
        let procs = process_list(&[(1, "init"), (2, "bash")]);
        let mut monitor = monitor(50, &procs, None);
        assert_eq!(monitor.snapshot().tick, 1);

        monitor.collect().unwrap();
        monitor.collect().unwrap();
        let snap = monitor.snapshot();
        assert_eq!(snap.tick, 3);
        assert_eq!(snap.metrics.cpu.total_percent, 50.0);
        assert_eq!(snap.history.total_cpu.len(), 3);
        assert_eq!(snap.total_processes, 2);
    }

    fn cpu_of(monitor: &Monitor<FakeSource>, pid: u32) -> f32 {
        monitor
            .snapshot()
            .processes
            .iter()
            .find(|p| p.pid == pid)
            .map(|p| p.cpu_percent)
            .unwrap()
    }

    #[test]
    fn process_share_is_stable_across_a_cpu_outage() {
        let procs = process_list(&[(5, "steady")]);
        let mut monitor = monitor(50, &procs, None);
        monitor.collect().unwrap();
        let before = cpu_of(&monitor, 5);
        assert_eq!(before, 50.0);

        monitor.source.cpu_missing = true;
        monitor.collect().unwrap();
        assert_eq!(cpu_of(&monitor, 5), 0.0);

        monitor.source.cpu_missing = false;
        monitor.collect().unwrap();
        assert_eq!(cpu_of(&monitor, 5), before);
    }

    #[test]
    fn process_share_is_stable_across_a_missed_enumeration() {
        let procs = process_list(&[(5, "steady")]);
        let mut monitor = monitor(50, &procs, None);
        monitor.collect().unwrap();
        let before = cpu_of(&monitor, 5);

        monitor.source.procs_missing = true;
        monitor.collect().unwrap();
        monitor.source.procs_missing = false;
        monitor.collect().unwrap();
        assert_eq!(cpu_of(&monitor, 5), before);
    }

    #[test]
    fn history_is_bounded_by_configured_length() {
        let procs = process_list(&[]);
        let mut monitor = monitor(10, &procs, None);
        for _ in 0..10 {
            monitor.collect().unwrap();
        }
        assert_eq!(monitor.snapshot().history.total_cpu.len(), 5);
    }

    #[test]
    fn alert_names_the_top_cpu_process() {
        let procs = process_list(&[(1, "idle"), (9, "hog")]);
        let mut monitor = monitor(90, &procs, Some(80.0));
        monitor.collect().unwrap();

        let alert = monitor.snapshot().alert.clone().unwrap();
        assert_eq!(alert.threshold, 80.0);
        assert_eq!(alert.top_process.map(|p| p.pid), Some(9));
    }

    #[test]
    fn no_alert_below_threshold_or_when_disabled() {
        let procs = process_list(&[(1, "a")]);
        let mut quiet = monitor(10, &procs, Some(80.0));
        quiet.collect().unwrap();
        assert!(quiet.snapshot().alert.is_none());

        let mut disabled = monitor(95, &procs, None);
        disabled.collect().unwrap();
        assert!(disabled.snapshot().alert.is_none());
    }

    #[test]
    fn sort_and_filter_republish_without_sampling() {
        let procs = process_list(&[(1, "bash"), (2, "vim"), (3, "zsh")]);
        let mut monitor = monitor(50, &procs, None);

        monitor.set_filter("SH");
        monitor.set_sort_key(SortKey::Memory);
        let snap = monitor.snapshot();
        assert_eq!(snap.tick, 1);
        assert_eq!(snap.filter.as_deref(), Some("SH"));
        let pids: Vec<u32> = snap.processes.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![3, 1]);
        assert_eq!(snap.total_processes, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn kill_selected_resolves_against_the_filtered_list() {
        let procs = process_list(&[(1, "bash"), (2, "vim"), (3, "zsh")]);
        let mut monitor = monitor(50, &procs, None);
        monitor.set_filter("vim");

        let outcome = monitor.kill_selected(0).await.unwrap();
        assert_eq!(outcome.pid, 2);
        assert_eq!(outcome.phase, Phase::Confirmed);

        let snap = monitor.snapshot();
        assert_eq!(
            snap.message.as_deref(),
            Some("Process 2 terminated successfully.")
        );
        assert!(snap.processes.is_empty());
        assert_eq!(snap.total_processes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn kill_selected_out_of_range_only_reports() {
        let procs = process_list(&[(1, "bash")]);
        let mut monitor = monitor(50, &procs, None);

        assert!(monitor.kill_selected(5).await.is_none());
        let snap = monitor.snapshot();
        assert_eq!(snap.message.as_deref(), Some("No process at row 5."));
        assert_eq!(snap.tick, 1);
        assert_eq!(procs.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn kill_top_targets_highest_cpu_regardless_of_view() {
        let procs = process_list(&[(1, "small"), (7, "big")]);
        let mut monitor = monitor(50, &procs, None);
        monitor.collect().unwrap();
        monitor.set_sort_key(SortKey::Memory);
        monitor.set_filter("small");

        let outcome = monitor.kill_top().await.unwrap();
        assert_eq!(outcome.pid, 7);
        assert!(!procs.lock().unwrap().iter().any(|p| p.pid == 7));
    }

    #[tokio::test(start_paused = true)]
    async fn message_is_shown_once() {
        let procs = process_list(&[(4, "x")]);
        let mut monitor = monitor(50, &procs, None);
        monitor.request_kill(4).await;
        assert!(monitor.snapshot().message.is_some());

        monitor.collect().unwrap();
        assert!(monitor.snapshot().message.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn run_renders_commands_until_stop() {
        let procs = process_list(&[(1, "a"), (2, "b")]);
        let mut monitor = monitor(50, &procs, None);
        let (tx, rx) = mpsc::channel(8);
        tx.send(Command::SetSort(SortKey::Memory)).await.unwrap();
        tx.send(Command::SetFilter("b".into())).await.unwrap();
        tx.send(Command::Stop).await.unwrap();

        let mut recorder = Recorder::default();
        monitor
            .run(&mut recorder, rx, Duration::from_secs(1))
            .await
            .unwrap();

        assert!(monitor.is_stopping());
        assert_eq!(recorder.snapshots.len(), 3);
        let last = recorder.snapshots.last().unwrap();
        assert_eq!(last.sort_key, SortKey::Memory);
        assert_eq!(last.filter.as_deref(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_on_the_interval() {
        let procs = process_list(&[(1, "a")]);
        let mut monitor = monitor(50, &procs, None);
        let (tx, rx) = mpsc::channel(8);

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3500)).await;
            tx.send(Command::Stop).await.unwrap();
        });

        let mut recorder = Recorder::default();
        monitor
            .run(&mut recorder, rx, Duration::from_secs(1))
            .await
            .unwrap();
        stopper.await.unwrap();

        let ticks: Vec<u64> = recorder.snapshots.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_channel_stops_the_loop() {
        let procs = process_list(&[]);
        let mut monitor = monitor(50, &procs, None);
        let (tx, rx) = mpsc::channel::<Command>(1);
        drop(tx);

        let mut recorder = Recorder::default();
        monitor
            .run(&mut recorder, rx, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(recorder.snapshots.len(), 1);
    }
}
