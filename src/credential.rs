//! Credential value type and the `username:password` line parser.
//!
//! A line splits on its first `:`; everything after it, minus the line
//! terminator, is the password, colons included. Lines without a separator,
//! with an empty password, with a NUL byte, or that are not valid UTF-8 are
//! rejected with [`CredentialError`].

/// A username/password pair to be tried against the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.username, self.password)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("missing ':' separator: {0}")]
    MissingSeparator(String),
    #[error("empty password: {0}")]
    EmptyPassword(String),
    #[error("NUL byte in line: {0:?}")]
    NulByte(String),
    #[error("line is not valid UTF-8: {0}")]
    InvalidUtf8(String),
}

/// Decode a raw line from a [`crate::io::LineIter`] and parse it.
pub fn parse_credential_bytes(line: &[u8]) -> Result<Credential, CredentialError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| CredentialError::InvalidUtf8(String::from_utf8_lossy(line).into_owned()))?;
    parse_credential_line(text)
}

pub fn parse_credential_line(line: &str) -> Result<Credential, CredentialError> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    let (username, password) = line
        .split_once(':')
        .ok_or_else(|| CredentialError::MissingSeparator(line.to_string()))?;
    if password.is_empty() {
        return Err(CredentialError::EmptyPassword(line.to_string()));
    }
    if line.contains('\0') {
        return Err(CredentialError::NulByte(line.to_string()));
    }
    Ok(Credential::new(username, password))
}
