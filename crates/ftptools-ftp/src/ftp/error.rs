//! FTP-specific error type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorised FTP error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FtpError {
    pub kind: FtpErrorKind,
    pub message: String,
    /// FTP response code that triggered the error, if any.
    pub code: Option<u16>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FtpErrorKind {
    /// TCP / DNS resolution failure at connect time.
    ConnectionFailed,
    /// Wrong username/password.
    AuthFailed,
    /// Identifier already registered when creating a session.
    DuplicateConnection,
    /// No session registered under the given identifier.
    UnknownConnection,
    /// The call omitted an identifier and no session is active.
    NoActiveConnection,
    /// The session exists but is not authenticated.
    NotConnected,
    /// Mid-operation network failure and the reconnection attempt failed too.
    ConnectionLost,
    /// An in-memory download exceeded its size ceiling.
    ContentTooLarge,
    /// Server lacks the queried capability and no fallback produced a value.
    NotSupported,
    /// Server returned a 4xx/5xx for a command.
    CommandRejected,
    /// Data channel could not be established (PASV/PORT failed).
    DataChannelFailed,
    /// Transfer aborted or incomplete.
    TransferFailed,
    /// Server sent an un-parseable or unexpected response.
    ProtocolError,
    /// An I/O error on the local side (file read/write).
    IoError,
    /// Operation timed out.
    Timeout,
    /// Control connection closed by the peer.
    Disconnected,
    /// Permission denied on the server.
    PermissionDenied,
    /// File/directory not found on the server.
    NotFound,
    /// Disk quota exceeded.
    QuotaExceeded,
    /// Config / parameter validation error.
    InvalidConfig,
    /// Catch-all.
    Unknown,
}

pub type FtpResult<T> = Result<T, FtpError>;

// ── Construction helpers ─────────────────────────────────────────────

impl FtpError {
    pub fn new(kind: FtpErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            code: None,
            session_id: None,
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_session(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    // ── Convenience constructors ─────────────────────────────────

    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::ConnectionFailed, msg)
    }

    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::AuthFailed, msg)
    }

    pub fn duplicate_connection(id: &str) -> Self {
        Self::new(
            FtpErrorKind::DuplicateConnection,
            format!(
                "Connection '{}' already exists; disconnect it first or pick another id",
                id
            ),
        )
        .with_session(id)
    }

    pub fn unknown_connection(id: &str) -> Self {
        Self::new(
            FtpErrorKind::UnknownConnection,
            format!("Connection '{}' not found", id),
        )
        .with_session(id)
    }

    pub fn no_active_connection() -> Self {
        Self::new(
            FtpErrorKind::NoActiveConnection,
            "No active FTP connection. Use ftp_connect or ftp_switch_connection first.",
        )
    }

    pub fn not_connected(id: &str, status: impl fmt::Debug) -> Self {
        Self::new(
            FtpErrorKind::NotConnected,
            format!("Connection '{}' is not authenticated (status {:?})", id, status),
        )
        .with_session(id)
    }

    pub fn connection_lost(id: &str, cause: &FtpError) -> Self {
        Self::new(
            FtpErrorKind::ConnectionLost,
            format!(
                "Connection '{}' lost and reconnection failed: {}",
                id, cause.message
            ),
        )
        .with_session(id)
    }

    pub fn content_too_large(size: u64, ceiling: u64) -> Self {
        Self::new(
            FtpErrorKind::ContentTooLarge,
            format!(
                "File too large ({} bytes). Maximum allowed: {} bytes",
                size, ceiling
            ),
        )
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::NotSupported, msg)
    }

    pub fn command_rejected(code: u16, msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::CommandRejected, msg).with_code(code)
    }

    pub fn data_channel(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::DataChannelFailed, msg)
    }

    pub fn transfer_failed(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::TransferFailed, msg)
    }

    pub fn protocol_error(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::ProtocolError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::IoError, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::Timeout, msg)
    }

    pub fn disconnected(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::Disconnected, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::NotFound, msg)
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::InvalidConfig, msg)
    }

    pub fn pool_exhausted(limit: usize) -> Self {
        Self::new(
            FtpErrorKind::InvalidConfig,
            format!("Session limit reached ({})", limit),
        )
    }

    /// Classify an FTP reply code into the most appropriate error kind.
    /// The server text is kept verbatim as the message.
    pub fn from_reply(code: u16, text: &str) -> Self {
        let kind = match code {
            421 => FtpErrorKind::Disconnected,
            425 | 426 => FtpErrorKind::DataChannelFailed,
            430 | 530 => FtpErrorKind::AuthFailed,
            450 | 550 => {
                let lower = text.to_lowercase();
                if lower.contains("permission") || lower.contains("denied") {
                    FtpErrorKind::PermissionDenied
                } else if lower.contains("not found") || lower.contains("no such") {
                    FtpErrorKind::NotFound
                } else if lower.contains("quota") {
                    FtpErrorKind::QuotaExceeded
                } else {
                    FtpErrorKind::CommandRejected
                }
            }
            451 | 452 | 552 => FtpErrorKind::TransferFailed,
            500..=504 => FtpErrorKind::CommandRejected,
            _ if code >= 400 => FtpErrorKind::CommandRejected,
            _ => FtpErrorKind::ProtocolError,
        };
        Self {
            kind,
            message: text.to_string(),
            code: Some(code),
            session_id: None,
        }
    }

    // ── Classification ───────────────────────────────────────────

    /// Failures that mean the control connection can no longer be trusted.
    ///
    /// A data-channel failure the server answered with a reply (425/426, a
    /// rejected PASV) leaves the control channel in step, so only local
    /// data-socket failures count.
    pub fn is_connectivity(&self) -> bool {
        match self.kind {
            FtpErrorKind::ConnectionFailed | FtpErrorKind::Disconnected | FtpErrorKind::Timeout => true,
            FtpErrorKind::DataChannelFailed => self.code.is_none(),
            _ => false,
        }
    }

    /// The server does not implement the command (500/502/504 or a
    /// "not understood" style reply).
    pub fn is_unsupported_command(&self) -> bool {
        if !matches!(self.code, Some(500) | Some(502) | Some(504)) {
            return false;
        }
        let lower = self.message.to_lowercase();
        self.code != Some(500)
            || lower.contains("not understood")
            || lower.contains("not implemented")
            || lower.contains("unknown command")
            || lower.contains("unrecognized")
    }

    /// MKD reply meaning the directory is already there.
    pub fn is_already_exists(&self) -> bool {
        let lower = self.message.to_lowercase();
        self.code.map_or(false, |c| c >= 500) && lower.contains("exist")
    }
}

impl fmt::Display for FtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code {
            write!(f, "[FTP {:?} {}] {}", self.kind, code, self.message)
        } else {
            write!(f, "[FTP {:?}] {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for FtpError {}

impl From<std::io::Error> for FtpError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut => Self::timeout(format!("I/O timeout: {}", e)),
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof => Self::disconnected(e.to_string()),
            _ => Self::io_error(e.to_string()),
        }
    }
}

impl From<FtpError> for String {
    fn from(e: FtpError) -> String {
        e.message
    }
}
