//! One authentication trial against the target.
//!
//! The wire protocol lives behind two capability traits:
//!
//! - [`Transport`] opens a configured [`Session`] for a username.
//! - [`Session`] connects and submits a password.
//!
//! Releasing a session is its `Drop`, so every session opened by
//! [`Authenticator::attempt`] is released exactly once on every path, success
//! or failure. A trial that is already running cannot be cancelled.
use std::time::Duration;

use log::debug;

use crate::credential::Credential;
use crate::report::Reporter;

/// Where to connect and how long the transport may block per operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub timeout: Option<Duration>,
}

/// Result of a single trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialOutcome {
    Success(Credential),
    Failure,
    ConnectionFailed,
}

/// A session could not be created or configured. Not retryable: it points at
/// the environment, not at the credential.
#[derive(Debug, thiserror::Error)]
#[error("cannot set up session for {host}:{port}: {reason}")]
pub struct SetupError {
    pub host: String,
    pub port: u16,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("cannot resolve {0}")]
    Resolve(String),
    #[error("connect failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("handshake failed: {0}")]
    Handshake(String),
}

pub trait Session {
    fn connect(&mut self) -> Result<(), ConnectError>;

    /// `Ok(true)` only when the server accepted the password. Errors are
    /// treated as a rejected login.
    fn authenticate(&mut self, username: &str, password: &str) -> Result<bool, String>;
}

pub trait Transport: Sync {
    type Session: Session;

    fn open(&self, target: &Target, username: &str) -> Result<Self::Session, SetupError>;
}

/// Runs trials through a [`Transport`] and reports progress.
pub struct Authenticator<'a, T: Transport> {
    transport: &'a T,
    reporter: &'a Reporter,
}

impl<'a, T: Transport> Authenticator<'a, T> {
    pub fn new(transport: &'a T, reporter: &'a Reporter) -> Self {
        Self {
            transport,
            reporter,
        }
    }

    pub fn attempt(
        &self,
        target: &Target,
        credential: &Credential,
    ) -> Result<TrialOutcome, SetupError> {
        self.reporter.trying(&target.host, credential);

        let mut session = self.transport.open(target, &credential.username)?;

        if let Err(e) = session.connect() {
            debug!("{}:{} {}: {}", target.host, target.port, credential, e);
            self.reporter.connection_failed(credential);
            return Ok(TrialOutcome::ConnectionFailed);
        }

        match session.authenticate(&credential.username, &credential.password) {
            Ok(true) => Ok(TrialOutcome::Success(credential.clone())),
            Ok(false) => {
                self.reporter.failed(credential);
                Ok(TrialOutcome::Failure)
            }
            Err(e) => {
                debug!("authentication error for {}: {}", credential, e);
                self.reporter.failed(credential);
                Ok(TrialOutcome::Failure)
            }
        }
    }
}
