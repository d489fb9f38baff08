//! jstatbeat - JVM garbage-collection sampler.
//!
//! Finds a JVM by name with `jps`, samples it with `jstat -gc -t`, and
//! publishes each sample as a JSON line on stdout (or to a file).

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use jstatbeat_core::beat::{BeatError, JstatBeat, SessionReport};
use jstatbeat_core::collector::ToolCommand;
use jstatbeat_core::config::{
    DEFAULT_INTERVAL, DEFAULT_LISTING_TOOL, DEFAULT_SAMPLING_TOOL, TargetSpec, ToolSettings,
};
use jstatbeat_core::sink::{BeatInfo, JsonLinesSink};

/// JVM garbage-collection sampler.
#[derive(Parser)]
#[command(name = "jstatbeat", about = "JVM GC statistics sampler", version)]
struct Args {
    /// Name of the target JVM as printed by `jps` (main class or jar).
    #[arg(short, long, env = "JSTATBEAT_NAME")]
    name: String,

    /// Sampling interval in milliseconds.
    #[arg(short, long, env = "JSTATBEAT_INTERVAL", default_value = DEFAULT_INTERVAL)]
    interval: String,

    /// Path to the `jps` executable.
    #[arg(long, default_value = DEFAULT_LISTING_TOOL)]
    jps: String,

    /// Path to the `jstat` executable.
    #[arg(long, default_value = DEFAULT_SAMPLING_TOOL)]
    jstat: String,

    /// Append events to this file instead of writing them to stdout.
    #[arg(short, long, value_name = "PATH")]
    output: Option<String>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber on stderr; stdout carries events.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["jstatbeat", "jstatbeat_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Opens the event destination.
fn open_output(path: Option<&str>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Ok(Box::new(io::BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn run(args: &Args, beat: &mut JstatBeat) -> Result<SessionReport, BeatError> {
    let writer = open_output(args.output.as_deref()).map_err(BeatError::Output)?;
    let sink = JsonLinesSink::new(writer, BeatInfo::current());

    let process = beat.setup()?;
    info!("Target '{}' resolved to pid {}", args.name, process);

    beat.run(sink)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    info!("jstatbeat {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: name={}, interval={}ms, jps={}, jstat={}, output={}",
        args.name,
        args.interval,
        args.jps,
        args.jstat,
        args.output.as_deref().unwrap_or("stdout")
    );

    let target = match TargetSpec::new(args.name.as_str(), args.interval.as_str()) {
        Ok(t) => t,
        Err(e) => {
            error!("{}", BeatError::from(e));
            return ExitCode::FAILURE;
        }
    };
    let tools = ToolSettings {
        listing: ToolCommand::new(args.jps.as_str()),
        sampling: ToolCommand::new(args.jstat.as_str()),
    };
    let mut beat = JstatBeat::new(target, tools);

    // Setup graceful shutdown
    let stop = beat.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        stop.stop();
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    match run(&args, &mut beat) {
        Ok(report) => {
            info!("Shutdown complete ({:?})", report.end);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
