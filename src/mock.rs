//! Counting in-memory transport and output capture for tests.
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::auth::{ConnectError, Session, SetupError, Target, Transport};
use crate::credential::Credential;

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    released: AtomicUsize,
    connects: AtomicUsize,
    authentications: AtomicUsize,
    tried: Mutex<Vec<Credential>>,
}

pub struct MockTransport {
    valid: Credential,
    refuse_connect: bool,
    fail_setup: bool,
    error_auth: bool,
    delay: Duration,
    counters: Arc<Counters>,
}

impl MockTransport {
    /// Accepts exactly one username/password pair.
    pub fn accepting(username: &str, password: &str) -> Self {
        Self {
            valid: Credential::new(username, password),
            refuse_connect: false,
            fail_setup: false,
            error_auth: false,
            delay: Duration::ZERO,
            counters: Arc::default(),
        }
    }

    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    pub fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    pub fn erroring_auth(mut self) -> Self {
        self.error_auth = true;
        self
    }

    /// Sleep inside every authentication to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    pub fn authentications(&self) -> usize {
        self.counters.authentications.load(Ordering::SeqCst)
    }

    /// Every credential submitted for authentication, in completion order.
    pub fn tried(&self) -> Vec<Credential> {
        self.counters.tried.lock().unwrap().clone()
    }
}

pub struct MockSession {
    username: String,
    valid: Credential,
    refuse_connect: bool,
    error_auth: bool,
    delay: Duration,
    counters: Arc<Counters>,
}

impl Transport for MockTransport {
    type Session = MockSession;

    fn open(&self, target: &Target, username: &str) -> Result<MockSession, SetupError> {
        if self.fail_setup {
            return Err(SetupError {
                host: target.host.clone(),
                port: target.port,
                reason: "cannot set user option".into(),
            });
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            username: username.to_string(),
            valid: self.valid.clone(),
            refuse_connect: self.refuse_connect,
            error_auth: self.error_auth,
            delay: self.delay,
            counters: Arc::clone(&self.counters),
        })
    }
}

impl Session for MockSession {
    fn connect(&mut self) -> Result<(), ConnectError> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse_connect {
            return Err(ConnectError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            )));
        }
        Ok(())
    }

    fn authenticate(&mut self, username: &str, password: &str) -> Result<bool, String> {
        self.counters.authentications.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.counters
            .tried
            .lock()
            .unwrap()
            .push(Credential::new(username, password));
        if self.error_auth {
            return Err("channel closed".into());
        }
        Ok(self.username == self.valid.username && password == self.valid.password)
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Cloneable in-memory writer for capturing reporter output.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
