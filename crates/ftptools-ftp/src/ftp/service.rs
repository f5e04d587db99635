//! High-level façade: resolves a session, drives its transport through one
//! operation and keeps the record's state in step.
//!
//! A connectivity failure marks the record stale, reconnects once with the
//! stored credentials and retries the operation once. A record that is
//! already stale reconnects before the operation runs.

use crate::ftp::error::{FtpError, FtpErrorKind, FtpResult};
use crate::ftp::parser;
use crate::ftp::registry::SessionRegistry;
use crate::ftp::session::{FtpSession, TransportSlot};
use crate::ftp::transport::{Connector, TcpConnector, Transport};
use crate::ftp::types::*;
use futures::future::BoxFuture;
use secrecy::SecretString;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;

/// Shared handle used by the dispatch layer.
pub type FtpServiceState = Arc<FtpService>;

/// Parameters for opening a new session.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub connection_id: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub passive: bool,
    /// Overrides the service connect timeout.
    pub timeout_sec: Option<u64>,
    /// Make the new session active even if another one is.
    pub make_active: bool,
    pub initial_directory: Option<String>,
}

/// What to do when an operation hits a connectivity failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    /// Reconnect once and retry.
    Reconnect,
    /// Only flag the record as stale (keep-alive).
    MarkStale,
}

pub struct FtpService {
    registry: SessionRegistry,
    config: FtpServiceConfig,
}

impl FtpService {
    pub fn new(config: FtpServiceConfig) -> Self {
        Self::with_connector(config, Arc::new(TcpConnector))
    }

    /// Build a service on top of a custom connector.
    pub fn with_connector(config: FtpServiceConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            registry: SessionRegistry::new(connector, config.max_sessions),
            config,
        }
    }

    pub fn config(&self) -> &FtpServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    // ─── Core ────────────────────────────────────────────────────

    /// Run `op` against the session's transport under its lock.
    async fn run<T, F>(
        &self,
        id: Option<&str>,
        recovery: Recovery,
        mut op: F,
    ) -> FtpResult<(Arc<FtpSession>, T)>
    where
        T: Send,
        F: for<'a> FnMut(&'a mut dyn Transport) -> BoxFuture<'a, FtpResult<T>> + Send,
    {
        let session = self.registry.get(id)?;
        let sid = session.id().to_string();
        let mut slot = session.lock_transport().await;
        let mut reconnected = self.ensure_ready(&session, &mut slot).await?;

        loop {
            let transport = slot
                .as_mut()
                .ok_or_else(|| FtpError::not_connected(&sid, session.status()))?;
            let result = op(&mut **transport).await;
            let healthy = slot.as_ref().map_or(false, |t| t.is_connected());

            match result {
                Ok(value) => {
                    session.touch();
                    drop(slot);
                    return Ok((session, value));
                }
                Err(e) if e.is_connectivity() => {
                    session.mark_stale(&e);
                    if recovery == Recovery::MarkStale {
                        return Err(e.with_session(&sid));
                    }
                    if reconnected {
                        return Err(FtpError::connection_lost(&sid, &e));
                    }
                    if let Err(cause) = self.reconnect(&session, &mut slot).await {
                        return Err(FtpError::connection_lost(&sid, &cause));
                    }
                    reconnected = true;
                }
                Err(e) => {
                    if healthy {
                        session.touch();
                    } else {
                        session.mark_stale(&e);
                    }
                    return Err(e.with_session(&sid));
                }
            }
        }
    }

    /// Make sure the record can take a command. Returns whether a
    /// reconnection happened.
    async fn ensure_ready(&self, session: &FtpSession, slot: &mut TransportSlot) -> FtpResult<bool> {
        match session.status() {
            ConnectionStatus::Authenticated if slot.is_some() => Ok(false),
            ConnectionStatus::Authenticated | ConnectionStatus::Stale => {
                session.mark_stale(&FtpError::disconnected("transport missing"));
                self.reconnect(session, slot)
                    .await
                    .map_err(|cause| FtpError::connection_lost(session.id(), &cause))?;
                Ok(true)
            }
            // Removed while this call was waiting for the lock.
            ConnectionStatus::Closed => Err(FtpError::unknown_connection(session.id())),
            status => Err(FtpError::not_connected(session.id(), status)),
        }
    }

    /// Replace the transport with a fresh login, restoring directory,
    /// data mode and representation type.
    async fn reconnect(&self, session: &FtpSession, slot: &mut TransportSlot) -> FtpResult<()> {
        slot.take();
        let config = session.reconnect_config();
        log::warn!(
            "[{}] reconnecting to {}:{}",
            session.id(),
            config.host,
            config.port
        );
        let transport = self
            .registry
            .connector()
            .connect(&config, session.password())
            .await
            .map_err(|e| {
                log::warn!("[{}] reconnection failed: {}", session.id(), e.message);
                e
            })?;
        session.attach(slot, transport)?;
        log::info!("[{}] reconnected", session.id());
        Ok(())
    }

    fn is_active(&self, session: &FtpSession) -> bool {
        self.registry.active_id().as_deref() == Some(session.id())
    }

    // ─── Lifecycle ───────────────────────────────────────────────

    pub async fn connect(&self, request: ConnectRequest) -> FtpResult<ConnectInfo> {
        let config = FtpConnectionConfig {
            host: request.host,
            port: request.port,
            username: request.username,
            transfer_type: TransferType::Binary,
            data_channel_mode: DataChannelMode::Passive.with_passive(request.passive),
            initial_directory: request.initial_directory,
            connect_timeout_sec: request.timeout_sec.unwrap_or(self.config.connect_timeout_sec),
            command_timeout_sec: self.config.command_timeout_sec,
            data_timeout_sec: self.config.data_timeout_sec,
            utf8: self.config.utf8,
            active_bind_address: None,
        };
        log::info!(
            "[{}] connecting to {}:{}",
            request.connection_id,
            config.host,
            config.port
        );
        let session = self
            .registry
            .create(&request.connection_id, config, request.password, request.make_active)
            .await?;
        Ok(ConnectInfo {
            summary: session.summary(self.is_active(&session)),
            welcome: session.welcome(),
        })
    }

    /// Disconnect `id`, or the active session when `None`. Returns the
    /// identifier that was closed.
    pub async fn disconnect(&self, id: Option<&str>) -> FtpResult<String> {
        let id = match id {
            Some(id) => id.to_string(),
            None => self
                .registry
                .active_id()
                .ok_or_else(FtpError::no_active_connection)?,
        };
        self.registry.remove(&id).await?;
        Ok(id)
    }

    pub fn list_connections(&self) -> Vec<ConnectionSummary> {
        self.registry.list()
    }

    pub fn active_connection(&self) -> Option<String> {
        self.registry.active_id()
    }

    pub fn switch_connection(&self, id: &str) -> FtpResult<ConnectionSummary> {
        let session = self.registry.switch_active(id)?;
        Ok(session.summary(true))
    }

    /// Close every session. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }

    // ─── Navigation ──────────────────────────────────────────────

    pub async fn pwd(&self, id: Option<&str>) -> FtpResult<String> {
        let (session, dir) = self
            .run(id, Recovery::Reconnect, |t| Box::pin(async move { t.pwd().await }))
            .await?;
        session.set_current_directory(dir.as_str());
        Ok(dir)
    }

    pub async fn change_directory(&self, id: Option<&str>, path: &str) -> FtpResult<String> {
        let (session, dir) = self
            .run(id, Recovery::Reconnect, |t| {
                let path = path.to_string();
                Box::pin(async move { t.cwd(&path).await })
            })
            .await?;
        session.set_current_directory(dir.as_str());
        Ok(dir)
    }

    /// Probe `path` and come back to where we started.
    pub async fn explore_directory(&self, id: Option<&str>, path: &str) -> FtpResult<ExploreReport> {
        let (session, report) = self
            .run(id, Recovery::Reconnect, |t| {
                let target = path.to_string();
                Box::pin(async move { explore(t, target).await })
            })
            .await?;
        session.set_current_directory(report.original_directory.as_str());
        Ok(report)
    }

    // ─── Listing ─────────────────────────────────────────────────

    pub async fn list_directory(
        &self,
        id: Option<&str>,
        path: Option<&str>,
        options: &ListOptions,
    ) -> FtpResult<DirectoryListing> {
        let pattern = match options.filter.as_deref() {
            Some(f) => Some(glob::Pattern::new(f).map_err(|e| {
                FtpError::invalid_config(format!("Invalid filter '{}': {}", f, e))
            })?),
            None => None,
        };
        let prefer_mlsd = options.prefer_mlsd.unwrap_or(self.config.prefer_mlsd);

        let (session, (mut entries, current_directory)) = self
            .run(id, Recovery::Reconnect, |t| {
                let path = path.map(str::to_string);
                Box::pin(async move {
                    let entries = t.list(path.as_deref(), prefer_mlsd).await?;
                    Ok((entries, t.current_directory()))
                })
            })
            .await?;
        session.set_current_directory(current_directory.as_str());

        if let Some(pattern) = &pattern {
            entries.retain(|e| pattern.matches(&e.name));
        }
        if !options.show_hidden {
            entries.retain(|e| !e.name.starts_with('.'));
        }
        sort_entries(&mut entries, options.sort_by.as_ref(), options.sort_order.as_ref());

        let total_files = entries.iter().filter(|e| e.kind == FtpEntryKind::File).count();
        let total_directories = entries
            .iter()
            .filter(|e| e.kind == FtpEntryKind::Directory)
            .count();

        Ok(DirectoryListing {
            current_directory,
            path: path.map(str::to_string),
            entries,
            total_files,
            total_directories,
        })
    }

    // ─── Entries ─────────────────────────────────────────────────

    pub async fn make_directory(&self, id: Option<&str>, path: &str) -> FtpResult<String> {
        let (_, created) = self
            .run(id, Recovery::Reconnect, |t| {
                let path = path.to_string();
                Box::pin(async move { t.mkdir(&path).await })
            })
            .await?;
        Ok(created)
    }

    pub async fn remove_directory(&self, id: Option<&str>, path: &str) -> FtpResult<()> {
        self.run(id, Recovery::Reconnect, |t| {
            let path = path.to_string();
            Box::pin(async move { t.rmdir(&path).await })
        })
        .await?;
        Ok(())
    }

    pub async fn delete_file(&self, id: Option<&str>, path: &str) -> FtpResult<()> {
        self.run(id, Recovery::Reconnect, |t| {
            let path = path.to_string();
            Box::pin(async move { t.delete(&path).await })
        })
        .await?;
        Ok(())
    }

    pub async fn rename(&self, id: Option<&str>, from: &str, to: &str) -> FtpResult<()> {
        self.run(id, Recovery::Reconnect, |t| {
            let (from, to) = (from.to_string(), to.to_string());
            Box::pin(async move { t.rename(&from, &to).await })
        })
        .await?;
        Ok(())
    }

    /// `mkdir -p`: create every missing segment of `path` in order.
    pub async fn create_directory_tree(&self, id: Option<&str>, path: &str) -> FtpResult<DirectoryTreeReport> {
        let segments = tree_segments(path);
        if segments.is_empty() {
            return Err(FtpError::invalid_config("Directory path must name at least one segment"));
        }
        let (_, report) = self
            .run(id, Recovery::Reconnect, |t| {
                let path = path.to_string();
                let segments = segments.clone();
                Box::pin(async move { build_tree(t, path, segments).await })
            })
            .await?;
        Ok(report)
    }

    // ─── Transfers ───────────────────────────────────────────────

    /// Upload a local file. The remote name defaults to the local file name.
    pub async fn upload_file(
        &self,
        id: Option<&str>,
        local_path: &str,
        remote_path: Option<&str>,
        binary: bool,
    ) -> FtpResult<TransferReport> {
        let remote = match remote_path {
            Some(r) => r.to_string(),
            None => Path::new(local_path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    FtpError::invalid_config(format!("Cannot derive a file name from '{}'", local_path))
                })?,
        };
        let tt = TransferType::from_binary(binary);

        let (session, (bytes, elapsed)) = self
            .run(id, Recovery::Reconnect, |t| {
                let (local, remote) = (local_path.to_string(), remote.clone());
                Box::pin(async move {
                    let meta = fs::metadata(&local).await.map_err(|e| {
                        FtpError::io_error(format!("Local file '{}' does not exist: {}", local, e))
                    })?;
                    if !meta.is_file() {
                        return Err(FtpError::invalid_config(format!(
                            "Local path '{}' is not a regular file",
                            local
                        )));
                    }
                    t.set_type(tt).await?;
                    let mut file = fs::File::open(&local).await.map_err(|e| {
                        FtpError::io_error(format!("Cannot open '{}': {}", local, e))
                    })?;
                    let started = Instant::now();
                    let bytes = t.store(&remote, &mut file).await?;
                    Ok((bytes, started.elapsed()))
                })
            })
            .await?;
        session.set_transfer_type(tt);
        session.add_uploaded(bytes);

        Ok(TransferReport {
            direction: TransferDirection::Upload,
            remote_path: remote,
            local_path: Some(local_path.to_string()),
            bytes,
            elapsed_ms: elapsed.as_millis() as u64,
            transfer_type: tt,
        })
    }

    /// Download to a local file, creating missing parent directories. The
    /// local name defaults to the remote file name. A partial file is
    /// removed on failure.
    pub async fn download_file(
        &self,
        id: Option<&str>,
        remote_path: &str,
        local_path: Option<&str>,
        binary: bool,
    ) -> FtpResult<TransferReport> {
        let local = match local_path {
            Some(l) => l.to_string(),
            None => {
                let (_, name) = parser::split_remote_path(remote_path);
                if name.is_empty() {
                    return Err(FtpError::invalid_config(format!(
                        "Cannot derive a file name from '{}'",
                        remote_path
                    )));
                }
                name
            }
        };
        let tt = TransferType::from_binary(binary);

        let (session, (bytes, elapsed)) = self
            .run(id, Recovery::Reconnect, |t| {
                let (remote, local) = (remote_path.to_string(), local.clone());
                Box::pin(async move {
                    if let Some(parent) = Path::new(&local).parent().filter(|p| !p.as_os_str().is_empty()) {
                        fs::create_dir_all(parent).await.map_err(|e| {
                            FtpError::io_error(format!("Cannot create '{}': {}", parent.display(), e))
                        })?;
                    }
                    t.set_type(tt).await?;
                    let mut file = fs::File::create(&local).await.map_err(|e| {
                        FtpError::io_error(format!("Cannot create '{}': {}", local, e))
                    })?;
                    let started = Instant::now();
                    match t.retrieve(&remote, &mut file, None).await {
                        Ok(bytes) => Ok((bytes, started.elapsed())),
                        Err(e) => {
                            drop(file);
                            if let Err(rm) = fs::remove_file(&local).await {
                                log::debug!("could not remove partial file '{}': {}", local, rm);
                            }
                            Err(e)
                        }
                    }
                })
            })
            .await?;
        session.set_transfer_type(tt);
        session.add_downloaded(bytes);

        Ok(TransferReport {
            direction: TransferDirection::Download,
            remote_path: remote_path.to_string(),
            local_path: Some(local),
            bytes,
            elapsed_ms: elapsed.as_millis() as u64,
            transfer_type: tt,
        })
    }

    /// Store an in-memory buffer under the given representation type.
    pub async fn upload_content(
        &self,
        id: Option<&str>,
        remote_path: &str,
        data: Vec<u8>,
        tt: TransferType,
    ) -> FtpResult<TransferReport> {
        let data = Arc::new(data);
        let (session, (bytes, elapsed)) = self
            .run(id, Recovery::Reconnect, |t| {
                let (remote, data) = (remote_path.to_string(), Arc::clone(&data));
                Box::pin(async move {
                    t.set_type(tt).await?;
                    let started = Instant::now();
                    let mut reader: &[u8] = data.as_slice();
                    let bytes = t.store(&remote, &mut reader).await?;
                    Ok((bytes, started.elapsed()))
                })
            })
            .await?;
        session.set_transfer_type(tt);
        session.add_uploaded(bytes);

        Ok(TransferReport {
            direction: TransferDirection::Upload,
            remote_path: remote_path.to_string(),
            local_path: None,
            bytes,
            elapsed_ms: elapsed.as_millis() as u64,
            transfer_type: tt,
        })
    }

    /// Fetch a file into memory, refusing anything above `max_bytes`
    /// (default from the service config).
    pub async fn download_content(
        &self,
        id: Option<&str>,
        remote_path: &str,
        max_bytes: Option<u64>,
        tt: TransferType,
    ) -> FtpResult<ContentDownload> {
        let ceiling = max_bytes.unwrap_or(self.config.max_download_bytes);
        if ceiling == 0 {
            return Err(FtpError::invalid_config("Download ceiling must be positive"));
        }

        let (session, (data, elapsed)) = self
            .run(id, Recovery::Reconnect, |t| {
                let remote = remote_path.to_string();
                Box::pin(async move {
                    t.set_type(tt).await?;
                    match t.size(&remote).await {
                        Ok(size) if size > ceiling => {
                            return Err(FtpError::content_too_large(size, ceiling));
                        }
                        Err(e) if e.is_connectivity() => return Err(e),
                        _ => {}
                    }
                    let started = Instant::now();
                    let mut buf: Vec<u8> = Vec::new();
                    t.retrieve(&remote, &mut buf, Some(ceiling)).await?;
                    Ok((buf, started.elapsed()))
                })
            })
            .await?;
        session.set_transfer_type(tt);
        session.add_downloaded(data.len() as u64);

        Ok(ContentDownload {
            remote_path: remote_path.to_string(),
            data,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    // ─── Metadata ────────────────────────────────────────────────

    /// SIZE, or the parent listing when the server lacks SIZE.
    pub async fn file_size(&self, id: Option<&str>, path: &str) -> FtpResult<FileSize> {
        let prefer_mlsd = self.config.prefer_mlsd;
        let (_, (size, source)) = self
            .run(id, Recovery::Reconnect, |t| {
                let path = path.to_string();
                Box::pin(async move {
                    t.set_type(TransferType::Binary).await?;
                    match t.size(&path).await {
                        Ok(size) => Ok((size, MetadataSource::Command)),
                        Err(e) if e.is_unsupported_command() => {
                            let entry = lookup_in_parent(t, &path, prefer_mlsd, "SIZE").await?;
                            Ok((entry.size, MetadataSource::Listing))
                        }
                        Err(e) => Err(e),
                    }
                })
            })
            .await?;

        Ok(FileSize {
            file: path.to_string(),
            size,
            size_mb: (size as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
            source,
        })
    }

    /// MDTM, or the parent listing when the server lacks MDTM.
    pub async fn modification_time(&self, id: Option<&str>, path: &str) -> FtpResult<ModificationTime> {
        let prefer_mlsd = self.config.prefer_mlsd;
        let (_, (modified, source)) = self
            .run(id, Recovery::Reconnect, |t| {
                let path = path.to_string();
                Box::pin(async move {
                    match t.mdtm(&path).await {
                        Ok(reply) => parser::parse_mdtm_reply(&reply)
                            .map(|(_, dt)| (dt, MetadataSource::Command))
                            .ok_or_else(|| {
                                FtpError::protocol_error(format!("Cannot parse MDTM reply: {}", reply))
                            }),
                        Err(e) if e.is_unsupported_command() => {
                            let entry = lookup_in_parent(t, &path, prefer_mlsd, "MDTM").await?;
                            entry
                                .modified
                                .map(|dt| (dt, MetadataSource::Listing))
                                .ok_or_else(|| {
                                    FtpError::not_supported(format!(
                                        "MDTM unsupported and the listing of '{}' carries no parseable date",
                                        path
                                    ))
                                })
                        }
                        Err(e) => Err(e),
                    }
                })
            })
            .await?;

        Ok(ModificationTime {
            file: path.to_string(),
            modified,
            raw_time: parser::format_mdtm(&modified),
            modification_time: modified.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            source,
        })
    }

    // ─── Session settings ────────────────────────────────────────

    /// Switch between passive and active data connections. Applies from
    /// the next transfer; a transfer already running keeps its channel.
    pub async fn set_passive_mode(&self, id: Option<&str>, passive: bool) -> FtpResult<ConnectionSummary> {
        let session = self.registry.get(id)?;
        let mode = session.data_mode().with_passive(passive);
        {
            let mut slot = session.lock_transport().await;
            if session.status() == ConnectionStatus::Closed {
                return Err(FtpError::unknown_connection(session.id()));
            }
            session.set_data_mode(mode);
            if let Some(t) = slot.as_mut() {
                t.set_data_mode(mode);
            }
        }
        log::debug!("[{}] data channel mode set to {:?}", session.id(), mode);
        Ok(session.summary(self.is_active(&session)))
    }

    /// NOOP. A failure leaves the record stale for the next call to repair.
    pub async fn send_noop(&self, id: Option<&str>) -> FtpResult<String> {
        let (_, reply) = self
            .run(id, Recovery::MarkStale, |t| Box::pin(async move { t.noop().await }))
            .await?;
        Ok(reply)
    }

    pub async fn system_info(&self, id: Option<&str>) -> FtpResult<SystemInfo> {
        let (session, mut info) = self
            .run(id, Recovery::Reconnect, |t| Box::pin(async move { t.system_info().await }))
            .await?;
        if info.welcome.as_deref().map_or(true, str::is_empty) {
            info.welcome = session.welcome();
        }
        Ok(info)
    }
}

// ─── Operation bodies ────────────────────────────────────────────────

async fn explore(t: &mut dyn Transport, target: String) -> FtpResult<ExploreReport> {
    let original = t.pwd().await?;

    match t.cwd(&target).await {
        Ok(resolved) => {
            let (parent_accessible, can_go_up) = match t.cdup().await {
                Ok(parent) => (true, parent != resolved),
                Err(e) if e.is_connectivity() => return Err(e),
                Err(_) => (false, false),
            };
            t.cwd(&original).await?;
            Ok(ExploreReport {
                message: format!("Directory '{}' is accessible", resolved),
                directory: resolved,
                original_directory: original,
                accessible: true,
                can_go_up,
                parent_accessible,
                status: "accessible".into(),
                error: None,
            })
        }
        Err(e) if e.is_connectivity() => Err(e),
        Err(e) => {
            if t.pwd().await? != original {
                t.cwd(&original).await?;
            }
            let (status, message) = classify_access_error(&e);
            Ok(ExploreReport {
                directory: target,
                original_directory: original,
                accessible: false,
                can_go_up: false,
                parent_accessible: false,
                status: status.into(),
                message,
                error: Some(e.message),
            })
        }
    }
}

/// Map a refused CWD to a status tag and a readable message.
fn classify_access_error(e: &FtpError) -> (&'static str, String) {
    let lower = e.message.to_lowercase();
    if lower.contains("not a directory") {
        ("not_a_directory", "Path is not a directory".into())
    } else if e.kind == FtpErrorKind::NotFound
        || lower.contains("no such")
        || lower.contains("not found")
        || lower.contains("does not exist")
    {
        ("not_found", "Directory does not exist".into())
    } else if e.kind == FtpErrorKind::PermissionDenied
        || lower.contains("permission")
        || lower.contains("denied")
    {
        ("permission_denied", "Permission denied".into())
    } else {
        ("error", format!("Access error: {}", e.message))
    }
}

/// Cumulative segments of `path`: `/a/b` → [`/a`, `/a/b`].
fn tree_segments(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let mut current = String::new();
    let mut out = Vec::new();
    for part in path.split('/').filter(|p| !p.is_empty() && *p != ".") {
        if absolute || !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);
        out.push(current.clone());
    }
    out
}

async fn build_tree(t: &mut dyn Transport, path: String, segments: Vec<String>) -> FtpResult<DirectoryTreeReport> {
    let mut created = Vec::new();
    let mut existing = Vec::new();

    for segment in segments {
        match t.mkdir(&segment).await {
            Ok(_) => created.push(segment),
            Err(e) if e.is_connectivity() => return Err(e),
            Err(e) if e.is_already_exists() => existing.push(segment),
            Err(e) => {
                // Many servers answer a bare 550 for an existing directory.
                if directory_exists(t, &segment).await? {
                    existing.push(segment);
                    continue;
                }
                return Err(FtpError {
                    message: format!(
                        "Failed to create '{}': {} (created: [{}])",
                        segment,
                        e.message,
                        created.join(", ")
                    ),
                    ..e
                });
            }
        }
    }

    Ok(DirectoryTreeReport { path, created, existing })
}

/// Probe with CWD and return to where we were.
async fn directory_exists(t: &mut dyn Transport, path: &str) -> FtpResult<bool> {
    let original = t.current_directory();
    match t.cwd(path).await {
        Ok(_) => {
            t.cwd(&original).await?;
            Ok(true)
        }
        Err(e) if e.is_connectivity() => Err(e),
        Err(_) => Ok(false),
    }
}

/// Best-effort metadata from the parent's detailed listing.
async fn lookup_in_parent(
    t: &mut dyn Transport,
    path: &str,
    prefer_mlsd: bool,
    command: &str,
) -> FtpResult<FtpEntry> {
    let (parent, name) = parser::split_remote_path(path);
    let entries = match t.list(parent.as_deref(), prefer_mlsd).await {
        Ok(entries) => entries,
        Err(e) if e.is_connectivity() => return Err(e),
        Err(e) => {
            return Err(FtpError::not_supported(format!(
                "{} unsupported and listing the parent of '{}' failed: {}",
                command, path, e.message
            )))
        }
    };
    parser::find_entry(&entries, &name)
        .filter(|e| e.kind != FtpEntryKind::Unknown)
        .cloned()
        .ok_or_else(|| {
            FtpError::not_supported(format!(
                "{} unsupported and '{}' was not found in the parent listing",
                command, path
            ))
        })
}

fn sort_entries(entries: &mut [FtpEntry], field: Option<&FtpSortField>, order: Option<&FtpSortOrder>) {
    let by_name = |a: &FtpEntry, b: &FtpEntry| a.name.to_lowercase().cmp(&b.name.to_lowercase());
    match field {
        None => entries.sort_by(|a, b| {
            let a_dir = a.kind == FtpEntryKind::Directory;
            let b_dir = b.kind == FtpEntryKind::Directory;
            b_dir.cmp(&a_dir).then_with(|| by_name(a, b))
        }),
        Some(FtpSortField::Name) => entries.sort_by(by_name),
        Some(FtpSortField::Size) => entries.sort_by(|a, b| a.size.cmp(&b.size).then_with(|| by_name(a, b))),
        Some(FtpSortField::Modified) => entries.sort_by(|a, b| a.modified.cmp(&b.modified)),
        Some(FtpSortField::Kind) => entries.sort_by(|a, b| kind_rank(a.kind).cmp(&kind_rank(b.kind)).then_with(|| by_name(a, b))),
    }
    if order == Some(&FtpSortOrder::Desc) {
        entries.reverse();
    }
}

fn kind_rank(kind: FtpEntryKind) -> u8 {
    match kind {
        FtpEntryKind::Directory => 0,
        FtpEntryKind::Symlink => 1,
        FtpEntryKind::File => 2,
        FtpEntryKind::Unknown => 3,
    }
}
