//! Serialised credential stream shared by every worker.
//!
//! [`CredentialStream::next`] holds the lock only for "read one line, parse,
//! release"; callers perform network I/O after the guard is dropped. Each
//! line is handed to exactly one caller and is never re-read.
//!
//! Malformed lines (no `:`, an empty password, a NUL byte, or invalid UTF-8)
//! are handled according to
//! [`MalformedLinePolicy`]. The default, [`MalformedLinePolicy::StopWorker`],
//! reports the stream as exhausted to the caller that read the bad line, so
//! that worker quits even if well-formed lines follow. This matches the
//! historical behaviour of the tool and is a known defect; use
//! [`MalformedLinePolicy::Skip`] to step over bad lines instead.
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, warn};

use crate::credential::{Credential, parse_credential_bytes};
use crate::io::LineIter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedLinePolicy {
    /// Treat a malformed line as end of input for the worker that read it.
    #[default]
    StopWorker,
    /// Drop the malformed line and keep reading.
    Skip,
}

pub struct CredentialStream {
    lines: Mutex<LineIter>,
    policy: MalformedLinePolicy,
    consumed: AtomicUsize,
    malformed: AtomicUsize,
}

impl CredentialStream {
    pub fn new(lines: LineIter, policy: MalformedLinePolicy) -> Self {
        Self {
            lines: Mutex::new(lines),
            policy,
            consumed: AtomicUsize::new(0),
            malformed: AtomicUsize::new(0),
        }
    }

    /// Convenience constructor over an in-memory buffer.
    pub fn from_text(text: &str, policy: MalformedLinePolicy) -> Self {
        Self::from_bytes(text.as_bytes(), policy)
    }

    pub fn from_bytes(bytes: &[u8], policy: MalformedLinePolicy) -> Self {
        let reader = std::io::Cursor::new(bytes.to_vec());
        Self::new(crate::io::iter_lines_reader(reader), policy)
    }

    /// Draw the next credential, or `None` when this caller should stop.
    pub fn next(&self) -> Option<Credential> {
        loop {
            let line = {
                // Poisoning leaves the iterator intact.
                let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
                match lines.next() {
                    Some(Ok(line)) => line,
                    Some(Err(e)) => {
                        warn!("credential source read failed: {}", e);
                        return None;
                    }
                    None => return None,
                }
            };
            self.consumed.fetch_add(1, Ordering::Relaxed);

            match parse_credential_bytes(&line) {
                Ok(c) => return Some(c),
                Err(e) => {
                    self.malformed.fetch_add(1, Ordering::Relaxed);
                    match self.policy {
                        MalformedLinePolicy::StopWorker => {
                            warn!("{}; stopping this worker", e);
                            return None;
                        }
                        MalformedLinePolicy::Skip => {
                            debug!("{}; skipped", e);
                        }
                    }
                }
            }
        }
    }

    /// Lines read so far, well-formed or not.
    pub fn lines_consumed(&self) -> usize {
        self.consumed.load(Ordering::Relaxed)
    }

    pub fn malformed_lines(&self) -> usize {
        self.malformed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn yields_lines_in_order_then_exhausts() {
        let s = CredentialStream::from_text("a:1\nb:2\n", MalformedLinePolicy::StopWorker);
        assert_eq!(s.next(), Some(Credential::new("a", "1")));
        assert_eq!(s.next(), Some(Credential::new("b", "2")));
        assert_eq!(s.next(), None);
        assert_eq!(s.next(), None);
        assert_eq!(s.lines_consumed(), 2);
    }

    // Historical behaviour: the malformed line ends this caller's run and
    // "bob:pw2" is never seen by it.
    #[test]
    fn malformed_line_stops_caller_by_default() {
        let s = CredentialStream::from_text(
            "alice:secret\nmalformedline\nbob:pw2\n",
            MalformedLinePolicy::default(),
        );
        assert_eq!(s.next(), Some(Credential::new("alice", "secret")));
        assert_eq!(s.next(), None);
        assert_eq!(s.lines_consumed(), 2);
        assert_eq!(s.malformed_lines(), 1);
    }

    #[test]
    fn skip_policy_steps_over_malformed_lines() {
        let s = CredentialStream::from_text(
            "alice:secret\nmalformedline\nbob:\nbob:pw2\n",
            MalformedLinePolicy::Skip,
        );
        assert_eq!(s.next(), Some(Credential::new("alice", "secret")));
        assert_eq!(s.next(), Some(Credential::new("bob", "pw2")));
        assert_eq!(s.next(), None);
        assert_eq!(s.malformed_lines(), 2);
        assert_eq!(s.lines_consumed(), 4);
    }

    #[test]
    fn skip_policy_steps_over_invalid_utf8() {
        let s = CredentialStream::from_bytes(b"a:1\nb:caf\xe9\nc:3\n", MalformedLinePolicy::Skip);
        assert_eq!(s.next(), Some(Credential::new("a", "1")));
        assert_eq!(s.next(), Some(Credential::new("c", "3")));
        assert_eq!(s.next(), None);
        assert_eq!(s.lines_consumed(), 3);
        assert_eq!(s.malformed_lines(), 1);
    }

    #[test]
    fn invalid_utf8_counts_as_malformed_under_stop_policy() {
        let s = CredentialStream::from_bytes(
            b"a:1\nb:caf\xe9\nc:3\n",
            MalformedLinePolicy::StopWorker,
        );
        assert_eq!(s.next(), Some(Credential::new("a", "1")));
        assert_eq!(s.next(), None);
        assert_eq!(s.malformed_lines(), 1);
        assert_eq!(s.next(), Some(Credential::new("c", "3")));
    }

    #[test]
    fn nul_in_username_is_skipped_not_tried() {
        let s = CredentialStream::from_bytes(b"ro\0ot:pw\nroot:pw\n", MalformedLinePolicy::Skip);
        assert_eq!(s.next(), Some(Credential::new("root", "pw")));
        assert_eq!(s.malformed_lines(), 1);
    }

    #[test]
    fn concurrent_callers_never_share_a_line() {
        let text: String = (0..2000).map(|i| format!("user{i}:pw{i}\n")).collect();
        let s = CredentialStream::from_text(&text, MalformedLinePolicy::StopWorker);

        let seen: Vec<Credential> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        let mut mine = Vec::new();
                        while let Some(c) = s.next() {
                            mine.push(c);
                        }
                        mine
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        assert_eq!(seen.len(), 2000);
        let unique: HashSet<_> = seen.iter().collect();
        assert_eq!(unique.len(), 2000);
        assert_eq!(s.lines_consumed(), 2000);
    }
}
