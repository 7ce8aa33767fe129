//! libssh2-backed [`Transport`].
//!
//! `open` only builds and configures the session; the TCP connection and SSH
//! handshake happen in `connect`, so an unreachable host is a per-trial
//! [`ConnectError`] rather than a fatal one. Dropping an [`SshSession`] sends
//! a disconnect if the handshake completed and frees the libssh2 session.
use std::net::{TcpStream, ToSocketAddrs};

use log::debug;
use ssh2::{DisconnectCode, Session as Ssh2Session};

use crate::auth::{ConnectError, Session, SetupError, Target, Transport};

/// Password authentication over SSH.
#[derive(Debug, Default, Clone, Copy)]
pub struct SshTransport;

pub struct SshSession {
    inner: Ssh2Session,
    target: Target,
    connected: bool,
}

impl Transport for SshTransport {
    type Session = SshSession;

    fn open(&self, target: &Target, _username: &str) -> Result<SshSession, SetupError> {
        let setup_err = |reason: String| SetupError {
            host: target.host.clone(),
            port: target.port,
            reason,
        };
        if target.host.is_empty() {
            return Err(setup_err("empty host".into()));
        }
        if target.port == 0 {
            return Err(setup_err("port 0".into()));
        }
        let inner = Ssh2Session::new().map_err(|e| setup_err(e.to_string()))?;
        if let Some(t) = target.timeout {
            inner.set_timeout(u32::try_from(t.as_millis()).unwrap_or(u32::MAX));
        }
        Ok(SshSession {
            inner,
            target: target.clone(),
            connected: false,
        })
    }
}

impl Session for SshSession {
    fn connect(&mut self) -> Result<(), ConnectError> {
        let addr = format!("{}:{}", self.target.host, self.target.port);
        let addrs: Vec<_> = (self.target.host.as_str(), self.target.port)
            .to_socket_addrs()
            .map_err(|_| ConnectError::Resolve(addr.clone()))?
            .collect();
        if addrs.is_empty() {
            return Err(ConnectError::Resolve(addr));
        }

        let mut last_err = None;
        let mut tcp = None;
        for a in &addrs {
            let attempt = match self.target.timeout {
                Some(t) => TcpStream::connect_timeout(a, t),
                None => TcpStream::connect(a),
            };
            match attempt {
                Ok(s) => {
                    tcp = Some(s);
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }
        let tcp = match tcp {
            Some(s) => s,
            None => {
                return Err(ConnectError::Io(last_err.unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::NotConnected, addr)
                })));
            }
        };

        self.inner.set_tcp_stream(tcp);
        self.inner
            .handshake()
            .map_err(|e| ConnectError::Handshake(e.to_string()))?;
        self.connected = true;
        Ok(())
    }

    fn authenticate(&mut self, username: &str, password: &str) -> Result<bool, String> {
        match self.inner.userauth_password(username, password) {
            Ok(()) => Ok(self.inner.authenticated()),
            // libssh2 reports a rejected password as an error too.
            Err(e) if matches!(e.code(), ssh2::ErrorCode::Session(-18)) => Ok(false),
            Err(e) => Err(e.to_string()),
        }
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if self.connected {
            if let Err(e) = self
                .inner
                .disconnect(Some(DisconnectCode::ByApplication), "done", None)
            {
                debug!("disconnect from {}: {}", self.target.host, e);
            }
        }
    }
}
