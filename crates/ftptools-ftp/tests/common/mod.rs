//! In-memory FTP server used by the integration tests.
//!
//! `MemoryConnector` hands out `MemoryTransport`s that share one
//! `MemoryServer` filesystem. The server can drop every live control
//! connection (`kill_sessions`) or refuse new ones (`set_reachable`).
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ftptools_ftp::ftp::{
    Connector, DataChannelMode, FtpConnectionConfig, FtpEntry, FtpEntryKind, FtpError, FtpResult,
    FtpService, FtpServiceConfig, SystemInfo, TransferType, Transport,
};
use secrecy::{ExposeSecret, SecretString};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const PASSWORD: &str = "hunter2";

struct StoredFile {
    data: Vec<u8>,
    modified: DateTime<Utc>,
}

#[derive(Default)]
struct Fs {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, StoredFile>,
}

pub struct MemoryServer {
    fs: Mutex<Fs>,
    reachable: AtomicBool,
    generation: AtomicUsize,
    connects: AtomicUsize,
    quits: AtomicUsize,
    supports_size: AtomicBool,
    supports_mdtm: AtomicBool,
    connect_delay: Mutex<Duration>,
    last_mode: Mutex<Option<DataChannelMode>>,
    last_type: Mutex<Option<TransferType>>,
    last_initial_directory: Mutex<Option<String>>,
}

impl MemoryServer {
    pub fn new() -> Arc<Self> {
        let mut fs = Fs::default();
        fs.dirs.insert("/".into());
        Arc::new(Self {
            fs: Mutex::new(fs),
            reachable: AtomicBool::new(true),
            generation: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
            quits: AtomicUsize::new(0),
            supports_size: AtomicBool::new(true),
            supports_mdtm: AtomicBool::new(true),
            connect_delay: Mutex::new(Duration::ZERO),
            last_mode: Mutex::new(None),
            last_type: Mutex::new(None),
            last_initial_directory: Mutex::new(None),
        })
    }

    pub fn add_dir(&self, path: &str) {
        self.fs.lock().unwrap().dirs.insert(path.to_string());
    }

    pub fn add_file(&self, path: &str, data: &[u8]) {
        let modified = Utc.with_ymd_and_hms(2024, 3, 15, 8, 30, 0).unwrap();
        self.fs.lock().unwrap().files.insert(
            path.to_string(),
            StoredFile {
                data: data.to_vec(),
                modified,
            },
        );
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.fs.lock().unwrap().files.get(path).map(|f| f.data.clone())
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.fs.lock().unwrap().dirs.contains(path)
    }

    /// Refuse (or accept again) new connections and fail live ones.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Drop every live control connection; new logins still work.
    pub fn kill_sessions(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn disable_size_and_mdtm(&self) {
        self.supports_size.store(false, Ordering::SeqCst);
        self.supports_mdtm.store(false, Ordering::SeqCst);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock().unwrap() = delay;
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }

    pub fn last_mode(&self) -> Option<DataChannelMode> {
        *self.last_mode.lock().unwrap()
    }

    pub fn last_type(&self) -> Option<TransferType> {
        *self.last_type.lock().unwrap()
    }

    pub fn last_initial_directory(&self) -> Option<String> {
        self.last_initial_directory.lock().unwrap().clone()
    }
}

fn normalize(cwd: &str, path: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", cwd, path)
    };
    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            p => parts.push(p),
        }
    }
    format!("/{}", parts.join("/"))
}

fn parent_of(path: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
    }
}

fn is_child(parent: &str, candidate: &str) -> bool {
    candidate != "/" && parent_of(candidate) == parent
}

fn no_such(path: &str) -> FtpError {
    FtpError::from_reply(550, &format!("550 {}: No such file or directory", path))
}

pub struct MemoryTransport {
    server: Arc<MemoryServer>,
    generation: usize,
    cwd: String,
    connected: bool,
}

impl MemoryTransport {
    fn check(&mut self) -> FtpResult<()> {
        let alive = self.server.reachable.load(Ordering::SeqCst)
            && self.server.generation.load(Ordering::SeqCst) == self.generation;
        if !alive || !self.connected {
            self.connected = false;
            return Err(FtpError::disconnected("Connection reset by peer"));
        }
        Ok(())
    }

    fn resolve(&self, path: &str) -> String {
        normalize(&self.cwd, path)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn welcome(&self) -> String {
        "220 Memory FTP ready".into()
    }

    fn current_directory(&self) -> String {
        self.cwd.clone()
    }

    fn set_data_mode(&mut self, mode: DataChannelMode) {
        *self.server.last_mode.lock().unwrap() = Some(mode);
    }

    async fn noop(&mut self) -> FtpResult<String> {
        self.check()?;
        Ok("200 NOOP ok.".into())
    }

    async fn pwd(&mut self) -> FtpResult<String> {
        self.check()?;
        Ok(self.cwd.clone())
    }

    async fn cwd(&mut self, path: &str) -> FtpResult<String> {
        self.check()?;
        let target = self.resolve(path);
        let fs = self.server.fs.lock().unwrap();
        if fs.dirs.contains(&target) {
            drop(fs);
            self.cwd = target.clone();
            Ok(target)
        } else if fs.files.contains_key(&target) {
            Err(FtpError::from_reply(550, &format!("550 {}: Not a directory", target)))
        } else {
            Err(no_such(&target))
        }
    }

    async fn cdup(&mut self) -> FtpResult<String> {
        self.cwd("..").await
    }

    async fn list(&mut self, path: Option<&str>, _prefer_mlsd: bool) -> FtpResult<Vec<FtpEntry>> {
        self.check()?;
        let dir = self.resolve(path.unwrap_or("."));
        let fs = self.server.fs.lock().unwrap();
        if !fs.dirs.contains(&dir) {
            return Err(no_such(&dir));
        }
        let mut out = Vec::new();
        for d in fs.dirs.iter().filter(|d| is_child(&dir, d)) {
            let name = d.rsplit('/').next().unwrap_or_default();
            out.push(FtpEntry {
                kind: FtpEntryKind::Directory,
                ..FtpEntry::name_only(name)
            });
        }
        for (path, file) in fs.files.iter().filter(|(p, _)| is_child(&dir, p)) {
            let name = path.rsplit('/').next().unwrap_or_default();
            out.push(FtpEntry {
                kind: FtpEntryKind::File,
                size: file.data.len() as u64,
                modified: Some(file.modified),
                ..FtpEntry::name_only(name)
            });
        }
        Ok(out)
    }

    async fn mkdir(&mut self, path: &str) -> FtpResult<String> {
        self.check()?;
        let target = self.resolve(path);
        let mut fs = self.server.fs.lock().unwrap();
        if fs.dirs.contains(&target) || fs.files.contains_key(&target) {
            return Err(FtpError::from_reply(550, &format!("550 {}: File exists", target)));
        }
        if !fs.dirs.contains(&parent_of(&target)) {
            return Err(no_such(&target));
        }
        fs.dirs.insert(target.clone());
        Ok(target)
    }

    async fn rmdir(&mut self, path: &str) -> FtpResult<()> {
        self.check()?;
        let target = self.resolve(path);
        let mut fs = self.server.fs.lock().unwrap();
        if !fs.dirs.contains(&target) {
            return Err(no_such(&target));
        }
        let busy = fs.dirs.iter().any(|d| is_child(&target, d))
            || fs.files.keys().any(|f| is_child(&target, f));
        if busy {
            return Err(FtpError::from_reply(550, &format!("550 {}: Directory not empty", target)));
        }
        fs.dirs.remove(&target);
        Ok(())
    }

    async fn delete(&mut self, path: &str) -> FtpResult<()> {
        self.check()?;
        let target = self.resolve(path);
        match self.server.fs.lock().unwrap().files.remove(&target) {
            Some(_) => Ok(()),
            None => Err(no_such(&target)),
        }
    }

    async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()> {
        self.check()?;
        let (from, to) = (self.resolve(from), self.resolve(to));
        let mut fs = self.server.fs.lock().unwrap();
        if let Some(file) = fs.files.remove(&from) {
            fs.files.insert(to, file);
            Ok(())
        } else if fs.dirs.remove(&from) {
            fs.dirs.insert(to);
            Ok(())
        } else {
            Err(no_such(&from))
        }
    }

    async fn size(&mut self, path: &str) -> FtpResult<u64> {
        self.check()?;
        if !self.server.supports_size.load(Ordering::SeqCst) {
            return Err(FtpError::from_reply(502, "502 Command not implemented."));
        }
        let target = self.resolve(path);
        let fs = self.server.fs.lock().unwrap();
        fs.files
            .get(&target)
            .map(|f| f.data.len() as u64)
            .ok_or_else(|| no_such(&target))
    }

    async fn mdtm(&mut self, path: &str) -> FtpResult<String> {
        self.check()?;
        if !self.server.supports_mdtm.load(Ordering::SeqCst) {
            return Err(FtpError::from_reply(502, "502 Command not implemented."));
        }
        let target = self.resolve(path);
        let fs = self.server.fs.lock().unwrap();
        fs.files
            .get(&target)
            .map(|f| format!("213 {}", f.modified.format("%Y%m%d%H%M%S")))
            .ok_or_else(|| no_such(&target))
    }

    async fn set_type(&mut self, tt: TransferType) -> FtpResult<()> {
        self.check()?;
        *self.server.last_type.lock().unwrap() = Some(tt);
        Ok(())
    }

    async fn retrieve(
        &mut self,
        path: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
        limit: Option<u64>,
    ) -> FtpResult<u64> {
        self.check()?;
        let target = self.resolve(path);
        let data = {
            let fs = self.server.fs.lock().unwrap();
            fs.files.get(&target).map(|f| f.data.clone()).ok_or_else(|| no_such(&target))?
        };
        if let Some(limit) = limit {
            if data.len() as u64 > limit {
                return Err(FtpError::content_too_large(data.len() as u64, limit));
            }
        }
        sink.write_all(&data).await?;
        sink.flush().await?;
        Ok(data.len() as u64)
    }

    async fn store(&mut self, path: &str, source: &mut (dyn AsyncRead + Unpin + Send)) -> FtpResult<u64> {
        self.check()?;
        let target = self.resolve(path);
        if !self.server.has_dir(&parent_of(&target)) {
            return Err(no_such(&target));
        }
        let mut data = Vec::new();
        source.read_to_end(&mut data).await?;
        let len = data.len() as u64;
        self.server.fs.lock().unwrap().files.insert(
            target,
            StoredFile {
                data,
                modified: Utc::now(),
            },
        );
        Ok(len)
    }

    async fn system_info(&mut self) -> FtpResult<SystemInfo> {
        self.check()?;
        Ok(SystemInfo {
            system: Some("215 UNIX Type: L8".into()),
            status: Some("211 Memory FTP status".into()),
            features: Some("211-Features:\n SIZE\n MDTM\n211 End".into()),
            welcome: None,
        })
    }

    async fn quit(&mut self) {
        if self.connected {
            self.server.quits.fetch_add(1, Ordering::SeqCst);
        }
        self.connected = false;
    }
}

pub struct MemoryConnector {
    pub server: Arc<MemoryServer>,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        config: &FtpConnectionConfig,
        password: &SecretString,
    ) -> FtpResult<Box<dyn Transport>> {
        let delay = *self.server.connect_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if !self.server.reachable.load(Ordering::SeqCst) {
            return Err(FtpError::connection_failed(format!(
                "Connection refused: {}:{}",
                config.host, config.port
            )));
        }
        if password.expose_secret() != PASSWORD {
            return Err(FtpError::auth_failed("530 Login incorrect."));
        }
        self.server.connects.fetch_add(1, Ordering::SeqCst);
        *self.server.last_mode.lock().unwrap() = Some(config.data_channel_mode);
        *self.server.last_type.lock().unwrap() = Some(config.transfer_type);
        *self.server.last_initial_directory.lock().unwrap() = config.initial_directory.clone();

        let cwd = config
            .initial_directory
            .as_deref()
            .filter(|d| self.server.has_dir(d))
            .unwrap_or("/")
            .to_string();
        Ok(Box::new(MemoryTransport {
            server: Arc::clone(&self.server),
            generation: self.server.generation.load(Ordering::SeqCst),
            cwd,
            connected: true,
        }))
    }
}

pub fn service_with(server: &Arc<MemoryServer>, config: FtpServiceConfig) -> FtpService {
    FtpService::with_connector(
        config,
        Arc::new(MemoryConnector {
            server: Arc::clone(server),
        }),
    )
}

pub fn service(server: &Arc<MemoryServer>) -> FtpService {
    service_with(server, FtpServiceConfig::default())
}

/// `ftp_connect` arguments for the in-memory server.
pub fn connect_args(id: &str) -> serde_json::Value {
    serde_json::json!({
        "connection_id": id,
        "host": "ftp.example.com",
        "username": "alice",
        "password": PASSWORD,
    })
}
