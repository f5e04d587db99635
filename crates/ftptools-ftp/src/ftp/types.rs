//! Shared types for the FTP crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─── Service configuration ───────────────────────────────────────────

/// Process-wide defaults for the session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpServiceConfig {
    /// TCP connect + login timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_sec: u64,
    /// Timeout for each control-channel reply in seconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_sec: u64,
    /// Data-channel open / read / write timeout in seconds.
    #[serde(default = "default_data_timeout")]
    pub data_timeout_sec: u64,
    /// Ceiling for in-memory downloads when the caller does not give one.
    #[serde(default = "default_max_download")]
    pub max_download_bytes: u64,
    /// Maximum number of registered sessions (0 = unlimited).
    #[serde(default)]
    pub max_sessions: usize,
    /// Prefer MLSD over LIST when the server advertises it.
    #[serde(default = "default_true")]
    pub prefer_mlsd: bool,
    /// Send OPTS UTF8 ON when the server advertises UTF8.
    #[serde(default = "default_true")]
    pub utf8: bool,
}

fn default_connect_timeout() -> u64 {
    30
}
fn default_command_timeout() -> u64 {
    30
}
fn default_data_timeout() -> u64 {
    30
}
fn default_max_download() -> u64 {
    10 * 1024 * 1024
}
fn default_true() -> bool {
    true
}

impl Default for FtpServiceConfig {
    fn default() -> Self {
        Self {
            connect_timeout_sec: default_connect_timeout(),
            command_timeout_sec: default_command_timeout(),
            data_timeout_sec: default_data_timeout(),
            max_download_bytes: default_max_download(),
            max_sessions: 0,
            prefer_mlsd: true,
            utf8: true,
        }
    }
}

// ─── Connection / Session ────────────────────────────────────────────

/// Transfer type (RFC 959 TYPE command).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TransferType {
    Ascii,
    Binary,
}

impl Default for TransferType {
    fn default() -> Self {
        Self::Binary
    }
}

impl TransferType {
    pub fn from_binary(binary: bool) -> Self {
        if binary {
            Self::Binary
        } else {
            Self::Ascii
        }
    }

    pub fn command(self) -> &'static str {
        match self {
            Self::Ascii => "TYPE A",
            Self::Binary => "TYPE I",
        }
    }
}

/// Transfer mode selected for the data channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DataChannelMode {
    Passive,
    ExtendedPassive,
    Active,
    ExtendedActive,
}

impl Default for DataChannelMode {
    fn default() -> Self {
        Self::Passive
    }
}

impl DataChannelMode {
    pub fn is_passive(self) -> bool {
        matches!(self, Self::Passive | Self::ExtendedPassive)
    }

    /// Flip between passive and active, keeping the extended (RFC 2428)
    /// flavour if it was selected.
    pub fn with_passive(self, passive: bool) -> Self {
        let extended = matches!(self, Self::ExtendedPassive | Self::ExtendedActive);
        match (passive, extended) {
            (true, false) => Self::Passive,
            (true, true) => Self::ExtendedPassive,
            (false, false) => Self::Active,
            (false, true) => Self::ExtendedActive,
        }
    }
}

/// Configuration for a single control connection. Carries no password;
/// credentials travel separately as a secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub transfer_type: TransferType,
    #[serde(default)]
    pub data_channel_mode: DataChannelMode,
    /// Remote directory to CWD into after login.
    #[serde(default)]
    pub initial_directory: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_sec: u64,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_sec: u64,
    #[serde(default = "default_data_timeout")]
    pub data_timeout_sec: u64,
    /// UTF-8 encoding (OPTS UTF8 ON).
    #[serde(default = "default_true")]
    pub utf8: bool,
    /// Local address to bind for active-mode data connections.
    #[serde(default)]
    pub active_bind_address: Option<String>,
}

impl Default for FtpConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 21,
            username: "anonymous".into(),
            transfer_type: TransferType::Binary,
            data_channel_mode: DataChannelMode::Passive,
            initial_directory: None,
            connect_timeout_sec: default_connect_timeout(),
            command_timeout_sec: default_command_timeout(),
            data_timeout_sec: default_data_timeout(),
            utf8: true,
            active_bind_address: None,
        }
    }
}

/// Health of a connection record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Authenticated,
    /// Last network operation failed; the next call tries to reconnect.
    Stale,
    /// Terminal. The record is gone from the registry.
    Closed,
}

impl ConnectionStatus {
    /// Allowed moves of the record state machine. Staying put is always allowed.
    pub fn can_transition_to(self, next: ConnectionStatus) -> bool {
        use ConnectionStatus::*;
        if self == next {
            return true;
        }
        match (self, next) {
            (Connecting, Connected) | (Connecting, Authenticated) => true,
            (Connected, Authenticated) => true,
            (Authenticated, Stale) => true,
            (Stale, Authenticated) => true,
            (Closed, _) => false,
            (_, Closed) => true,
            _ => false,
        }
    }
}

/// Read-only snapshot of one registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub connection_id: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub status: ConnectionStatus,
    pub current_directory: String,
    pub passive: bool,
    pub active: bool,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub bytes_uploaded: u64,
    pub bytes_downloaded: u64,
}

/// Result of a successful connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectInfo {
    #[serde(flatten)]
    pub summary: ConnectionSummary,
    pub welcome: Option<String>,
}

// ─── Directory Listing ───────────────────────────────────────────────

/// Type of a remote filesystem entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FtpEntryKind {
    #[serde(rename = "file")]
    File,
    #[serde(rename = "dir")]
    Directory,
    #[serde(rename = "link")]
    Symlink,
    #[serde(rename = "unknown")]
    Unknown,
}

/// One entry from a directory listing (parsed from LIST or MLSD output).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FtpEntryKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub permissions: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub link_target: Option<String>,
    /// Raw line from the server (for debugging).
    pub raw: Option<String>,
    /// MLSD fact map (e.g. "type" → "file", "size" → "1234").
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub facts: HashMap<String, String>,
}

impl FtpEntry {
    /// Best-effort entry carrying only a name, used for lines no parser understood.
    pub fn name_only(line: &str) -> Self {
        Self {
            name: line.to_string(),
            kind: FtpEntryKind::Unknown,
            size: 0,
            modified: None,
            permissions: None,
            owner: None,
            group: None,
            link_target: None,
            raw: Some(line.to_string()),
            facts: HashMap::new(),
        }
    }
}

/// Sorting field for directory listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum FtpSortField {
    Name,
    Size,
    Modified,
    Kind,
}

/// Sort order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum FtpSortOrder {
    Asc,
    Desc,
}

/// Options for listing a directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    /// Filter by glob pattern (e.g. "*.txt").
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub sort_by: Option<FtpSortField>,
    #[serde(default)]
    pub sort_order: Option<FtpSortOrder>,
    /// Show hidden ("dot") files.
    #[serde(default = "default_true")]
    pub show_hidden: bool,
    /// Overrides the service-wide MLSD preference.
    #[serde(default)]
    pub prefer_mlsd: Option<bool>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            filter: None,
            sort_by: None,
            sort_order: None,
            show_hidden: true,
            prefer_mlsd: None,
        }
    }
}

/// A listed directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    /// Working directory of the session when the listing ran.
    pub current_directory: String,
    /// Path that was listed (`None` = the working directory).
    pub path: Option<String>,
    pub entries: Vec<FtpEntry>,
    pub total_files: usize,
    pub total_directories: usize,
}

/// Outcome of probing a directory without staying in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreReport {
    /// Resolved path when accessible, otherwise the requested one.
    pub directory: String,
    pub original_directory: String,
    pub accessible: bool,
    pub can_go_up: bool,
    pub parent_accessible: bool,
    pub status: String,
    pub message: String,
    /// Literal server reply when the change was refused.
    pub error: Option<String>,
}

/// Created / already-present segments of a directory tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryTreeReport {
    pub path: String,
    pub created: Vec<String>,
    pub existing: Vec<String>,
}

// ─── Transfer ────────────────────────────────────────────────────────

/// Direction of a file transfer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum TransferDirection {
    Upload,
    Download,
}

/// Summary of a finished transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReport {
    pub direction: TransferDirection,
    pub remote_path: String,
    /// Local file for path-based transfers, `None` for in-memory ones.
    pub local_path: Option<String>,
    pub bytes: u64,
    pub elapsed_ms: u64,
    pub transfer_type: TransferType,
}

/// Bytes fetched by an in-memory download.
#[derive(Debug, Clone)]
pub struct ContentDownload {
    pub remote_path: String,
    pub data: Vec<u8>,
    pub elapsed_ms: u64,
}

/// Where a metadata value came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MetadataSource {
    /// Dedicated command (SIZE / MDTM).
    Command,
    /// Parsed out of the parent directory's listing.
    Listing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSize {
    pub file: String,
    pub size: u64,
    pub size_mb: f64,
    pub source: MetadataSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationTime {
    pub file: String,
    pub modified: DateTime<Utc>,
    /// `YYYYMMDDHHMMSS`.
    pub raw_time: String,
    /// `YYYY-MM-DD HH:MM:SS UTC`.
    pub modification_time: String,
    pub source: MetadataSource,
}

// ─── FTP Response ────────────────────────────────────────────────────

/// A single FTP response (may be multi-line).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpResponse {
    pub code: u16,
    pub lines: Vec<String>,
}

impl FtpResponse {
    /// Full response text (all lines joined).
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Whether the response code indicates success (1xx–3xx).
    pub fn is_success(&self) -> bool {
        self.code < 400
    }

    /// Whether this is a positive-preliminary reply (1xx).
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// Whether this is a positive-completion reply (2xx).
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Whether this is a positive-intermediate reply (3xx).
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }
}

// ─── Server Capabilities ─────────────────────────────────────────────

/// Parsed FEAT response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerFeatures {
    pub mlsd: bool,
    pub mlst: bool,
    pub size: bool,
    pub mdtm: bool,
    pub rest_stream: bool,
    pub utf8: bool,
    pub epsv: bool,
    pub eprt: bool,
    pub raw_features: Vec<String>,
}

/// SYST / STAT / FEAT replies plus the login banner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub system: Option<String>,
    pub status: Option<String>,
    pub features: Option<String>,
    pub welcome: Option<String>,
}
