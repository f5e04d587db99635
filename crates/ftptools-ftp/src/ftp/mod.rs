//! # ftptools-ftp: multi-session FTP client
//!
//! Plain FTP (RFC 959) with the RFC 3659 extensions the tools use
//! (MLSD, SIZE, MDTM), FEAT negotiation (RFC 2389) and EPSV (RFC 2428).
//!
//! Architecture:
//! - `types`: data structures, enums, config
//! - `error`: FTP-specific error type
//! - `protocol`: low-level command/response codec
//! - `connection`: TCP connect and greeting
//! - `client`: stateful FTP client (login, CWD, TYPE, LIST, ...)
//! - `parser`: Unix/DOS/MLSD listing and MDTM parsing
//! - `transfer`: data channel setup (PASV/EPSV/PORT/EPRT)
//! - `directory`: mkdir, rmdir, delete, rename
//! - `file_ops`: RETR/STOR streaming with an optional size ceiling
//! - `transport`: `Transport`/`Connector` seam over the client
//! - `session`: one named connection record
//! - `registry`: records by id plus the active pointer
//! - `service`: operations with stale detection and one-shot reconnect
//! - `commands`: tool-call decoding, validation and dispatch

pub mod types;
pub mod error;
pub mod protocol;
pub mod connection;
pub mod client;
pub mod parser;
pub mod transfer;
pub mod directory;
pub mod file_ops;
pub mod transport;
pub mod session;
pub mod registry;
pub mod service;
pub mod commands;

pub use types::*;
pub use error::{FtpError, FtpErrorKind, FtpResult};
pub use transport::{Connector, TcpConnector, Transport};
pub use session::FtpSession;
pub use registry::SessionRegistry;
pub use service::{ConnectRequest, FtpService, FtpServiceState};
pub use commands::{
    dispatch, tool_catalog, FtpToolRequest, ToolCall, ToolDescriptor, ToolResponse, TransferTopic,
};
