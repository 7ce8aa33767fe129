//! Trial coordinator: a fixed pool of workers draining one credential stream
//! until a login succeeds or the stream runs out.
//!
//! Each worker loops:
//!
//! 1. stop if the shared [`StopFlag`] is raised;
//! 2. draw the next credential, stopping on exhaustion (without raising the
//!    flag);
//! 3. run one trial; on success raise the flag and stop, otherwise loop.
//!
//! Cancellation is cooperative. The flag is only read between trials, so
//! after a success the other workers finish whatever trial they are in before
//! they notice it. [`TrialCoordinator::run`] returns once every worker has
//! stopped.
//!
//! ```no_run
//! use ssh_trial::coordinator::{TrialConfig, TrialCoordinator};
//! use ssh_trial::report::Reporter;
//! use ssh_trial::ssh::SshTransport;
//! use ssh_trial::stream::{CredentialStream, MalformedLinePolicy};
//! # fn main() -> anyhow::Result<()> {
//! let config = TrialConfig::new("10.0.0.5", 22, 4, 0);
//! let stream = CredentialStream::from_text("root:toor\n", MalformedLinePolicy::Skip);
//! let reporter = Reporter::stdout(config.verbosity);
//! let summary = TrialCoordinator::new(config).run(&stream, &SshTransport, &reporter)?;
//! println!("{:?}", summary.found);
//! # Ok(())
//! # }
//! ```
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::auth::{Authenticator, SetupError, Target, Transport, TrialOutcome};
use crate::credential::Credential;
use crate::report::Reporter;
use crate::stats::{StatsSnapshot, TrialStats};
use crate::stream::CredentialStream;

/// Run parameters shared read-only by every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialConfig {
    pub host: String,
    pub port: u16,
    pub thread_count: usize,
    pub verbosity: u8,
    pub timeout: Option<Duration>,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 22,
            thread_count: 1,
            verbosity: 0,
            timeout: None,
        }
    }
}

impl TrialConfig {
    pub fn new(host: &str, port: u16, thread_count: usize, verbosity: u8) -> Self {
        Self {
            host: host.to_string(),
            port,
            thread_count,
            verbosity,
            timeout: None,
        }
    }

    pub fn target(&self) -> Target {
        Target {
            host: self.host.clone(),
            port: self.port,
            timeout: self.timeout,
        }
    }
}

/// One-way stop signal. Once raised it stays raised.
#[derive(Debug, Default)]
pub struct StopFlag(AtomicBool);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Raise the flag. Returns `true` only for the call that flipped it.
    pub fn raise(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub found: Option<Credential>,
    pub stats: StatsSnapshot,
    pub lines_consumed: usize,
    pub malformed_lines: usize,
    pub workers: usize,
    pub elapsed: Duration,
}

pub struct TrialCoordinator {
    config: TrialConfig,
    stop: StopFlag,
    stats: TrialStats,
}

impl TrialCoordinator {
    pub fn new(config: TrialConfig) -> Self {
        Self {
            config,
            stop: StopFlag::new(),
            stats: TrialStats::new(),
        }
    }

    pub fn stop_flag(&self) -> &StopFlag {
        &self.stop
    }

    /// Run `thread_count` workers to completion. A setup error in any worker
    /// stops the others at their next loop boundary and is returned.
    ///
    /// Returning waits for every sibling's in-flight trial, including after a
    /// setup error. Without a transport timeout (`TrialConfig::timeout`) that
    /// wait is bounded only by the operating system's TCP timeouts.
    pub fn run<T: Transport>(
        &self,
        stream: &CredentialStream,
        transport: &T,
        reporter: &Reporter,
    ) -> Result<RunSummary, CoordinatorError> {
        let started = Instant::now();
        let workers = self.config.thread_count.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("trial-worker-{i}"))
            .build()?;
        let target = self.config.target();
        info!(
            "starting {} worker(s) against {}:{}",
            workers, target.host, target.port
        );

        let results = pool.broadcast(|ctx| {
            let auth = Authenticator::new(transport, reporter);
            self.work(ctx.index(), stream, &auth, &target, reporter)
        });

        let mut found = None;
        for result in results {
            if let Some(c) = result? {
                found = Some(c);
            }
        }

        Ok(RunSummary {
            found,
            stats: self.stats.snapshot(),
            lines_consumed: stream.lines_consumed(),
            malformed_lines: stream.malformed_lines(),
            workers,
            elapsed: started.elapsed(),
        })
    }

    fn work<T: Transport>(
        &self,
        id: usize,
        stream: &CredentialStream,
        auth: &Authenticator<'_, T>,
        target: &Target,
        reporter: &Reporter,
    ) -> Result<Option<Credential>, SetupError> {
        debug!("worker {} running", id);
        while !self.stop.is_raised() {
            let Some(credential) = stream.next() else {
                debug!("worker {} stopped: stream exhausted", id);
                return Ok(None);
            };
            reporter.parsed(&credential);

            let outcome = match auth.attempt(target, &credential) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.stop.raise();
                    return Err(e);
                }
            };
            self.stats.record(&outcome);

            if let TrialOutcome::Success(c) = outcome {
                if self.stop.raise() {
                    reporter.success(&c);
                    debug!("worker {} stopped: credential found", id);
                    return Ok(Some(c));
                }
                info!("worker {} also accepted {} after stop", id, c);
                return Ok(None);
            }
        }
        debug!("worker {} stopped: stop flag raised", id);
        Ok(None)
    }
}
