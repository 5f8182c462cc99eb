//! Error types for lookups and configuration.

use std::io;

use thiserror::Error;

use crate::dns::{DecodeError, EncodeError, ResponseCode};

/// A failed lookup.
///
/// Carries what went wrong together with the domain and server the lookup was
/// made for, so a single value is enough to report the failure.
#[derive(Debug, Error)]
#[error("lookup {domain} on {server}: {kind}")]
pub struct DnsError {
    kind: ErrorKind,
    domain: String,
    server: String,
}

impl DnsError {
    pub fn new(kind: ErrorKind, domain: impl Into<String>, server: impl Into<String>) -> Self {
        DnsError {
            kind,
            domain: domain.into(),
            server: server.into(),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// Description of the failure without the domain/server prefix.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// True if the lookup ran out of time.
    pub fn is_timeout(&self) -> bool {
        self.kind.is_timeout()
    }

    /// True if retrying the same lookup later may succeed: timeouts and
    /// `SERVFAIL` replies.
    pub fn is_temporary(&self) -> bool {
        self.kind.is_timeout()
            || matches!(self.kind, ErrorKind::ResponseCode(ResponseCode::ServerFailure))
    }
}

/// What went wrong during a lookup.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid domain name: {0}")]
    InvalidName(#[from] EncodeError),

    #[error("dial failed: {0}")]
    Dial(#[source] io::Error),

    #[error("write failed: {source}")]
    Write {
        #[source]
        source: io::Error,
        timeout: bool,
    },

    #[error("read failed: {source}")]
    Read {
        #[source]
        source: io::Error,
        timeout: bool,
    },

    #[error("response id {received} does not match request id {expected}")]
    IdMismatch { expected: u16, received: u16 },

    #[error("server responded with {0}")]
    ResponseCode(ResponseCode),

    #[error("expected one question in response, got {0}")]
    UnexpectedQuestionCount(u16),

    #[error("response carries no answers")]
    NoAnswers,

    #[error("malformed response: {0}")]
    Truncated(#[from] DecodeError),
}

impl ErrorKind {
    /// Wraps a failed write, flagging it as a timeout from its I/O error kind.
    pub fn write(source: io::Error) -> Self {
        let timeout = is_timeout_io(&source);
        ErrorKind::Write { source, timeout }
    }

    /// Wraps a failed read, flagging it as a timeout from its I/O error kind.
    pub fn read(source: io::Error) -> Self {
        let timeout = is_timeout_io(&source);
        ErrorKind::Read { source, timeout }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ErrorKind::Write { timeout: true, .. } | ErrorKind::Read { timeout: true, .. }
        )
    }
}

/// Socket timeouts surface as `WouldBlock` on Unix and `TimedOut` on Windows.
fn is_timeout_io(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Validation errors for configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server cannot be empty")]
    EmptyServer,

    #[error("server {server:?} must not carry a port, lookups always use port 53")]
    ServerHasPort { server: String },

    #[error("timeout_secs must be greater than 0")]
    ZeroTimeout,
}
