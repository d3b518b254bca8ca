//! `fswatch`: a command-line front-end over `fswatch-debounce`.
//!
//! Two subcommands: `watch` prints batches as they arrive, `run` drives a
//! subprocess reload loop.

mod filters;
mod runner;
mod target;

use clap::{Args, Parser, Subcommand};
use fswatch_debounce::{StopHandle, Watch, WatchConfig};
use fswatch_types::ChangeBatch;
use runner::RunningProcess;
use std::path::PathBuf;
use std::time::Duration;
use target::ReloadTarget;

/// Watch paths and print, or reload a command on, filesystem changes.
#[derive(Parser, Debug)]
#[command(name = "fswatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch paths and print each change batch as JSON, one per line.
    Watch(WatchArgs),
    /// Watch paths and re-run a command every time something changes.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct WatchOptions {
    /// Filesystem paths to watch.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Only watch each root's immediate children, not its whole subtree.
    #[arg(long)]
    non_recursive: bool,

    /// Force the polling backend even if a native one is available.
    #[arg(long)]
    force_polling: bool,

    /// Skip permission-denied errors while enumerating a root instead of
    /// failing.
    #[arg(long)]
    ignore_permission_denied: bool,

    /// Trace every raw backend event at debug level, before filtering.
    #[arg(long)]
    debug: bool,

    /// Sample interval for the polling backend, in milliseconds, when it
    /// ends up being the one in use. Defaults to `WATCHFILES_POLL_DELAY_MS`
    /// if set, otherwise 300ms.
    #[arg(long)]
    poll_delay_ms: Option<u64>,

    /// Quiescence window, in milliseconds, before a settled batch fires.
    #[arg(long, default_value_t = fswatch_debounce::config::DEFAULT_DEBOUNCE_MS)]
    debounce_ms: u64,

    /// Stop-check / quiet-detection granularity, in milliseconds.
    #[arg(long, default_value_t = fswatch_debounce::config::DEFAULT_STEP_MS)]
    step_ms: u64,

    /// Which paths to watch.
    #[arg(long, value_enum, default_value_t = FilterKind::Default)]
    filter: FilterKind,

    /// Extra file extensions to watch (only used with `--filter extension`).
    #[arg(long)]
    extensions: Vec<String>,

    /// Extra directory names to ignore, beyond the built-in defaults.
    #[arg(long)]
    ignore_paths: Vec<String>,

    /// Log verbosity.
    #[arg(long, value_enum, default_value_t = Verbosity::Info)]
    verbosity: Verbosity,
}

#[derive(Args, Debug)]
struct WatchArgs {
    #[command(flatten)]
    options: WatchOptions,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    options: WatchOptions,

    /// Grace period, in milliseconds, between interrupting the old process
    /// and forcibly killing it.
    #[arg(long, default_value_t = runner::DEFAULT_GRACE_PERIOD.as_millis() as u64)]
    grace_period_ms: u64,

    /// The command to run, and re-run on every reload, given after a
    /// literal `--` (e.g. `fswatch run src -- cargo run`). A bare
    /// `"namespace::action"` token (e.g. `cargo::test`) resolves against
    /// the built-in reload-target registry instead of being exec'd
    /// literally.
    #[arg(last = true, required = true)]
    command: Vec<String>,
}

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum FilterKind {
    /// No filtering: every change is delivered.
    All,
    /// Ignore VCS/editor/build noise (the default ignore set).
    Default,
    /// `Default` plus an extension allow-list from `--extensions`.
    Extension,
}

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum Verbosity {
    Warning,
    Info,
    Debug,
}

fn init_logging(verbosity: Verbosity) {
    let level = match verbosity {
        Verbosity::Warning => log::LevelFilter::Warn,
        Verbosity::Info => log::LevelFilter::Info,
        Verbosity::Debug => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_default_env().filter_level(level).init();
}

fn build_config(options: &WatchOptions) -> anyhow::Result<WatchConfig> {
    let mut config = WatchConfig::default()
        .with_debounce(Duration::from_millis(options.debounce_ms))
        .with_step(Duration::from_millis(options.step_ms))
        .with_force_polling(options.force_polling)
        .with_ignore_permission_denied(options.ignore_permission_denied)
        .with_debug(options.debug);

    if let Some(poll_delay_ms) = options.poll_delay_ms {
        config = config.with_poll_delay(Duration::from_millis(poll_delay_ms));
    }

    for path in &options.paths {
        if !path.exists() {
            anyhow::bail!("path \"{}\" does not exist", path.display());
        }
        config = if options.non_recursive {
            config.with_path_non_recursive(path)
        } else {
            config.with_path(path)
        };
    }

    match options.filter {
        FilterKind::All => {}
        FilterKind::Default => {
            let filter = filters::DefaultFilter::with_extra_ignore_dirs(&options.ignore_paths)?;
            config = config.with_filter(filter.into_predicate());
        }
        FilterKind::Extension => {
            if options.extensions.is_empty() {
                anyhow::bail!("--filter extension requires at least one --extensions value");
            }
            let base = filters::DefaultFilter::with_extra_ignore_dirs(&options.ignore_paths)?;
            let filter = filters::ExtensionFilter::new(base, options.extensions.clone());
            config = config.with_filter(filter.into_predicate());
        }
    }

    Ok(config)
}

fn print_batch(batch: &ChangeBatch) -> anyhow::Result<()> {
    let pairs: Vec<(&str, String)> = batch
        .iter()
        .map(|r| (r.kind.as_str(), r.path.display().to_string()))
        .collect();
    println!("{}", serde_json::to_string(&pairs)?);
    Ok(())
}

fn run_watch(args: WatchArgs) -> anyhow::Result<()> {
    init_logging(args.options.verbosity);
    let config = build_config(&args.options)?;

    let watch = Watch::open(config)?;
    let stop = watch.stop_handle();
    register_ctrlc(stop);

    log::info!("watching {} path(s)...", args.options.paths.len());
    for batch in watch {
        let batch = batch?;
        print_batch(&batch)?;
    }
    Ok(())
}

fn run_run(args: RunArgs) -> anyhow::Result<()> {
    init_logging(args.options.verbosity);
    let config = build_config(&args.options)?;
    let grace_period = Duration::from_millis(args.grace_period_ms);
    let target = ReloadTarget::parse(&args.command);

    let watch = Watch::open(config)?.raise_interrupt(false);
    let stop = watch.stop_handle();
    register_ctrlc(stop);

    log::info!("watching {} path(s)...", args.options.paths.len());
    let mut process = RunningProcess::spawn(target.resolve()?, None)?;
    let mut reloads: u64 = 0;

    for batch in watch {
        let batch = batch?;
        process.stop(grace_period)?;
        process = RunningProcess::spawn(target.resolve()?, Some(&batch))?;
        reloads += 1;
        log::info!("reloaded ({reloads} reload(s) so far)");
    }

    process.stop(grace_period)?;
    Ok(())
}

fn register_ctrlc(stop: StopHandle) {
    let result = ctrlc::set_handler(move || stop.signal());
    if let Err(e) = result {
        log::warn!("failed to install Ctrl-C handler: {e}");
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Watch(args) => run_watch(args),
        Commands::Run(args) => run_run(args),
    }
}
