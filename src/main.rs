//! CLI entrypoint for `ssh-trial`.
//!
//! Parses command-line arguments into a `TrialConfig`, opens the credential
//! source (stdin or a wordlist file), runs the trial coordinator against the
//! target with the SSH transport, and maps the result to an exit status.
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::{LevelFilter, error, info};
use ssh_trial::{
    coordinator::{CoordinatorError, TrialConfig, TrialCoordinator},
    io::{DEFAULT_MMAP_THRESHOLD_BYTES, iter_lines_auto, iter_lines_stdin},
    report::Reporter,
    ssh::SshTransport,
    stream::{CredentialStream, MalformedLinePolicy},
};

const EXIT_NOT_FOUND: i32 = 1;
const EXIT_SOURCE: i32 = 2;
const EXIT_SETUP: i32 = 3;
const EXIT_POOL: i32 = 4;

const AFTER_HELP: &str = "\
Note: usernames / passwords are read from stdin unless --wordlist is given.
The format is one username:password pair per line.";

#[derive(Parser, Debug)]
#[command(
    name = "ssh-trial",
    version,
    about = "Concurrent SSH password trials",
    after_help = AFTER_HELP
)]
struct Args {
    /// Host to try
    #[arg(short = 't', long = "target", default_value = "localhost")]
    host: String,

    /// Port to connect on
    #[arg(short = 'p', long = "port", default_value_t = 22,
          value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Number of worker threads
    #[arg(short = 'n', long = "threads", default_value_t = 1,
          value_parser = clap::value_parser!(u64).range(1..))]
    threads: u64,

    /// Increase verbosity (-v failures, -vv attempts, -vvv parsed pairs)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Read credentials from this file instead of stdin
    #[arg(short = 'w', long = "wordlist")]
    wordlist: Option<PathBuf>,

    /// Override mmap threshold in bytes for --wordlist. If zero, disable mmap.
    #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
    mmap_threshold: u64,

    /// Skip malformed lines instead of stopping the worker that read them
    #[arg(long = "skip-malformed")]
    skip_malformed: bool,

    /// Per-operation transport timeout in milliseconds. Without it, a fatal
    /// session setup error still waits for in-flight trials to finish, which
    /// can take as long as the OS TCP timeout.
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Exit with status 1 when no credential was found
    #[arg(long = "exit-code")]
    exit_code: bool,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Suppress the run summary
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl Args {
    fn trial_config(&self) -> TrialConfig {
        TrialConfig {
            host: self.host.clone(),
            port: self.port,
            thread_count: self.threads as usize,
            verbosity: self.verbose,
            timeout: self.timeout_ms.map(Duration::from_millis),
        }
    }

    fn malformed_policy(&self) -> MalformedLinePolicy {
        if self.skip_malformed {
            MalformedLinePolicy::Skip
        } else {
            MalformedLinePolicy::StopWorker
        }
    }
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn open_stream(args: &Args) -> anyhow::Result<CredentialStream> {
    let lines = match &args.wordlist {
        Some(path) => {
            let threshold = if args.mmap_threshold == 0 {
                u64::MAX
            } else {
                args.mmap_threshold
            };
            iter_lines_auto(path, threshold)?
        }
        None => iter_lines_stdin(),
    };
    Ok(CredentialStream::new(lines, args.malformed_policy()))
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }

    let stream = match open_stream(&args) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to open credential source: {:#}", e);
            std::process::exit(EXIT_SOURCE);
        }
    };

    let config = args.trial_config();
    let reporter = Reporter::stdout(config.verbosity);
    let coordinator = TrialCoordinator::new(config);

    let summary = match coordinator.run(&stream, &SshTransport, &reporter) {
        Ok(s) => s,
        Err(CoordinatorError::Setup(e)) => {
            error!("libssh2: {}", e);
            std::process::exit(EXIT_SETUP);
        }
        Err(e @ CoordinatorError::Pool(_)) => {
            error!("{}", e);
            std::process::exit(EXIT_POOL);
        }
    };

    if !args.quiet {
        reporter.summary(&summary);
    }

    if summary.found.is_none() {
        info!("credential source exhausted without a valid login");
        // Exhaustion exits 0 unless --exit-code is given.
        if args.exit_code {
            std::process::exit(EXIT_NOT_FOUND);
        }
    }
}
