//! A named connection record.
//!
//! The transport sits behind an async mutex so one record runs one
//! command at a time while other records proceed in parallel. The
//! summary fields live behind their own short-lived lock, so listing
//! sessions never waits for network I/O.

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::transport::Transport;
use crate::ftp::types::{
    ConnectionStatus, ConnectionSummary, DataChannelMode, FtpConnectionConfig, TransferType,
};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Mutex, MutexGuard};

/// The slot holding the live transport (`None` once dropped or closed).
pub type TransportSlot = Option<Box<dyn Transport>>;

#[derive(Debug, Clone)]
struct RecordState {
    status: ConnectionStatus,
    current_directory: String,
    data_mode: DataChannelMode,
    transfer_type: TransferType,
    welcome: Option<String>,
    connected_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    bytes_uploaded: u64,
    bytes_downloaded: u64,
}

pub struct FtpSession {
    id: String,
    config: FtpConnectionConfig,
    password: SecretString,
    state: RwLock<RecordState>,
    transport: Mutex<TransportSlot>,
}

impl std::fmt::Debug for FtpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpSession")
            .field("id", &self.id)
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("username", &self.config.username)
            .field("status", &self.status())
            .finish()
    }
}

impl FtpSession {
    /// A record in `Connecting` state with no transport yet.
    pub fn new(id: impl Into<String>, config: FtpConnectionConfig, password: SecretString) -> Self {
        let now = Utc::now();
        let state = RecordState {
            status: ConnectionStatus::Connecting,
            current_directory: "/".into(),
            data_mode: config.data_channel_mode,
            transfer_type: config.transfer_type,
            welcome: None,
            connected_at: now,
            last_activity: now,
            bytes_uploaded: 0,
            bytes_downloaded: 0,
        };
        Self {
            id: id.into(),
            config,
            password,
            state: RwLock::new(state),
            transport: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn username(&self) -> &str {
        &self.config.username
    }

    pub(crate) fn password(&self) -> &SecretString {
        &self.password
    }

    fn read(&self) -> RwLockReadGuard<'_, RecordState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RecordState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ─── Status machine ──────────────────────────────────────────

    pub fn status(&self) -> ConnectionStatus {
        self.read().status
    }

    /// Move to `next` if the state machine allows it.
    pub fn set_status(&self, next: ConnectionStatus) -> FtpResult<()> {
        let mut state = self.write();
        if !state.status.can_transition_to(next) {
            return Err(FtpError::protocol_error(format!(
                "Connection '{}' cannot move from {:?} to {:?}",
                self.id, state.status, next
            ))
            .with_session(&self.id));
        }
        if state.status != next {
            log::debug!("[{}] {:?} -> {:?}", self.id, state.status, next);
        }
        state.status = next;
        Ok(())
    }

    /// Flag the record after a connectivity failure. No-op unless authenticated.
    pub fn mark_stale(&self, cause: &FtpError) {
        let mut state = self.write();
        if state.status == ConnectionStatus::Authenticated {
            log::warn!("[{}] connection marked stale: {}", self.id, cause.message);
            state.status = ConnectionStatus::Stale;
        }
    }

    // ─── Transport ───────────────────────────────────────────────

    /// Wait for exclusive use of the transport.
    pub async fn lock_transport(&self) -> MutexGuard<'_, TransportSlot> {
        self.transport.lock().await
    }

    /// Record a freshly authenticated transport in the given slot.
    pub(crate) fn attach(&self, slot: &mut TransportSlot, transport: Box<dyn Transport>) -> FtpResult<()> {
        self.set_status(ConnectionStatus::Authenticated)?;
        {
            let mut state = self.write();
            state.current_directory = transport.current_directory();
            let welcome = transport.welcome();
            if !welcome.is_empty() {
                state.welcome = Some(welcome);
            }
            state.last_activity = Utc::now();
        }
        *slot = Some(transport);
        Ok(())
    }

    /// Connection parameters for re-establishing this record: the original
    /// settings plus the current directory, mode and type.
    pub(crate) fn reconnect_config(&self) -> FtpConnectionConfig {
        let state = self.read();
        let mut config = self.config.clone();
        config.data_channel_mode = state.data_mode;
        config.transfer_type = state.transfer_type;
        config.initial_directory = Some(state.current_directory.clone());
        config
    }

    pub(crate) fn connect_config(&self) -> &FtpConnectionConfig {
        &self.config
    }

    /// Quit the transport and move to `Closed`. Safe to call repeatedly.
    pub async fn close(&self) {
        let mut slot = self.lock_transport().await;
        if let Some(mut transport) = slot.take() {
            transport.quit().await;
        }
        let mut state = self.write();
        if state.status != ConnectionStatus::Closed {
            log::debug!("[{}] {:?} -> Closed", self.id, state.status);
            state.status = ConnectionStatus::Closed;
        }
    }

    // ─── Summary fields ──────────────────────────────────────────

    pub fn touch(&self) {
        self.write().last_activity = Utc::now();
    }

    pub fn current_directory(&self) -> String {
        self.read().current_directory.clone()
    }

    pub fn set_current_directory(&self, dir: impl Into<String>) {
        self.write().current_directory = dir.into();
    }

    pub fn data_mode(&self) -> DataChannelMode {
        self.read().data_mode
    }

    pub fn set_data_mode(&self, mode: DataChannelMode) {
        self.write().data_mode = mode;
    }

    pub fn transfer_type(&self) -> TransferType {
        self.read().transfer_type
    }

    pub fn set_transfer_type(&self, tt: TransferType) {
        self.write().transfer_type = tt;
    }

    pub fn welcome(&self) -> Option<String> {
        self.read().welcome.clone()
    }

    pub fn add_uploaded(&self, n: u64) {
        self.write().bytes_uploaded += n;
    }

    pub fn add_downloaded(&self, n: u64) {
        self.write().bytes_downloaded += n;
    }

    pub fn summary(&self, active: bool) -> ConnectionSummary {
        let state = self.read();
        ConnectionSummary {
            connection_id: self.id.clone(),
            host: self.config.host.clone(),
            port: self.config.port,
            username: self.config.username.clone(),
            status: state.status,
            current_directory: state.current_directory.clone(),
            passive: state.data_mode.is_passive(),
            active,
            connected_at: state.connected_at,
            last_activity: state.last_activity,
            bytes_uploaded: state.bytes_uploaded,
            bytes_downloaded: state.bytes_downloaded,
        }
    }
}
