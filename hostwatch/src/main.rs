use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hostwatch::input::spawn_stdin_reader;
use hostwatch::render::{JsonRenderer, TextRenderer};
use hostwatch::{
    Command, Config, LibcSignaller, Monitor, MonitorSettings, ProcSource, Renderer, Terminator,
};
use log::{debug, info, warn};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(version, about = "Live terminal host monitor")]
struct Args {
    /// Path to a TOML config file (falls back to $HOSTWATCH_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Refresh interval in milliseconds
    #[arg(short = 'r', long)]
    refresh_rate: Option<u64>,

    /// Total CPU percentage that raises an alert
    #[arg(short = 't', long)]
    threshold: Option<f32>,

    /// Disable the CPU alert
    #[arg(short = 'a', long)]
    no_alert: bool,

    /// Log at debug level
    #[arg(short = 'd', long)]
    debug: bool,

    /// Collect one interval, print a single snapshot and exit
    #[arg(short = 'o', long)]
    debug_only: bool,

    /// Emit snapshots as JSON lines
    #[arg(long)]
    json: bool,

    /// Disable colorized output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug, Clone)]
enum Cmd {
    /// Print one snapshot and exit
    Snapshot,
    /// Terminate a process (SIGTERM, then SIGKILL) and report the result
    Kill {
        /// Target process id
        pid: u32,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let config_path = Config::resolve_path(args.config.as_deref());
    let config = load_config(&args, config_path.as_deref())?;
    init_logging(&config, args.debug)?;
    match &config_path {
        Some(path) => debug!("[config] loaded {}", path.display()),
        None => debug!("[config] no config file, using defaults"),
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let result = runtime.block_on(run(args, config));
    // A blocking stdin read cannot be cancelled; don't wait for it.
    runtime.shutdown_background();
    result
}

fn load_config(args: &Args, path: Option<&Path>) -> Result<Config> {
    let mut config = Config::load(path)?;
    if let Some(ms) = args.refresh_rate {
        config.runtime.refresh_rate_ms = ms;
    }
    if let Some(threshold) = args.threshold {
        config.alert.cpu_threshold = threshold;
    }
    if args.no_alert {
        config.alert.enabled = false;
    }
    config.validate().context("invalid settings")?;
    Ok(config)
}

fn init_logging(config: &Config, debug: bool) -> Result<()> {
    let level = if debug {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));

    if let Some(path) = &config.logging.file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

async fn run(args: Args, config: Config) -> Result<ExitCode> {
    let terminator = Terminator::new(Arc::new(LibcSignaller), config.termination_policy());

    if let Some(Cmd::Kill { pid }) = args.command {
        let outcome = terminator.terminate(pid).await;
        println!("{}", outcome.message);
        return Ok(if outcome.confirmed() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let source = ProcSource::new(&config.runtime.proc_root, &config.runtime.sys_root);
    let settings = MonitorSettings {
        history_length: config.runtime.history_length,
        cpu_threshold: config
            .alert
            .enabled
            .then_some(config.alert.cpu_threshold),
    };
    let mut monitor = Monitor::new(source, terminator, settings)?;
    let interval = config.refresh_interval();
    let color = !args.no_color && std::io::stdout().is_terminal();

    let one_shot = args.debug_only || matches!(args.command, Some(Cmd::Snapshot));
    if one_shot {
        tokio::time::sleep(interval).await;
        monitor.collect()?;
        let snapshot = monitor.snapshot();
        if args.json {
            JsonRenderer::new(std::io::stdout()).render(&snapshot)?;
        } else {
            TextRenderer::new(std::io::stdout(), color).render(&snapshot)?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let (tx, rx) = mpsc::channel(32);
    spawn_stdin_reader(tx.clone());
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("[monitor] interrupted");
                let _ = tx.send(Command::Stop).await;
            }
            Err(e) => warn!("[monitor] cannot listen for Ctrl-C: {e}"),
        }
    });

    info!(
        "[monitor] starting, refresh every {} ms",
        config.runtime.refresh_rate_ms
    );
    if args.json {
        let mut renderer = JsonRenderer::new(std::io::stdout());
        monitor.run(&mut renderer, rx, interval).await?;
    } else {
        let mut renderer = TextRenderer::new(std::io::stdout(), color).live();
        monitor.run(&mut renderer, rx, interval).await?;
    }
    Ok(ExitCode::SUCCESS)
}
