//! Session registry: named connection records plus the "active" pointer.
//!
//! The map lives behind a std mutex that is only held for map and pointer
//! updates. Connecting, quitting and every other network step happen with
//! the lock released; an identifier that is still logging in is reserved
//! so a concurrent create for the same name is refused.

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::session::FtpSession;
use crate::ftp::transport::Connector;
use crate::ftp::types::{ConnectionSummary, FtpConnectionConfig};
use secrecy::SecretString;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<String, Arc<FtpSession>>,
    /// Identifiers currently logging in.
    pending: HashSet<String>,
    active: Option<String>,
}

pub struct SessionRegistry {
    inner: Mutex<RegistryInner>,
    connector: Arc<dyn Connector>,
    /// Maximum number of sessions (0 = unlimited).
    max_sessions: usize,
}

/// Releases a pending identifier however `create` exits.
struct Reservation<'a> {
    registry: &'a SessionRegistry,
    id: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.registry.lock().pending.remove(&self.id);
    }
}

impl SessionRegistry {
    pub fn new(connector: Arc<dyn Connector>, max_sessions: usize) -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            connector,
            max_sessions,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    fn reserve(&self, id: &str) -> FtpResult<Reservation<'_>> {
        let mut inner = self.lock();
        if inner.sessions.contains_key(id) || inner.pending.contains(id) {
            return Err(FtpError::duplicate_connection(id));
        }
        if self.max_sessions > 0 && inner.sessions.len() + inner.pending.len() >= self.max_sessions {
            return Err(FtpError::pool_exhausted(self.max_sessions));
        }
        inner.pending.insert(id.to_string());
        Ok(Reservation {
            registry: self,
            id: id.to_string(),
        })
    }

    /// Connect, authenticate and register a new session.
    ///
    /// The new record becomes active when nothing else is, or when
    /// `make_active` is set.
    pub async fn create(
        &self,
        id: &str,
        config: FtpConnectionConfig,
        password: SecretString,
        make_active: bool,
    ) -> FtpResult<Arc<FtpSession>> {
        if id.trim().is_empty() {
            return Err(FtpError::invalid_config("Connection id must not be empty"));
        }
        let reservation = self.reserve(id)?;

        let session = Arc::new(FtpSession::new(id, config, password));
        let transport = self
            .connector
            .connect(session.connect_config(), session.password())
            .await
            .map_err(|e| e.with_session(id))?;
        {
            let mut slot = session.lock_transport().await;
            session.attach(&mut slot, transport)?;
        }

        let mut inner = self.lock();
        inner.sessions.insert(id.to_string(), Arc::clone(&session));
        if make_active || inner.active.is_none() {
            inner.active = Some(id.to_string());
        }
        drop(inner);
        drop(reservation);

        log::info!(
            "[{}] connected to {}:{} as {}",
            id,
            session.host(),
            session.connect_config().port,
            session.username()
        );
        Ok(session)
    }

    /// Resolve an explicit identifier, or the active one when `None`.
    pub fn get(&self, id: Option<&str>) -> FtpResult<Arc<FtpSession>> {
        let inner = self.lock();
        let key = match id {
            Some(id) => id.to_string(),
            None => inner
                .active
                .clone()
                .ok_or_else(FtpError::no_active_connection)?,
        };
        inner
            .sessions
            .get(&key)
            .cloned()
            .ok_or_else(|| FtpError::unknown_connection(&key))
    }

    pub fn active_id(&self) -> Option<String> {
        self.lock().active.clone()
    }

    pub fn switch_active(&self, id: &str) -> FtpResult<Arc<FtpSession>> {
        let mut inner = self.lock();
        let session = inner
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| FtpError::unknown_connection(id))?;
        inner.active = Some(id.to_string());
        log::info!("[{}] is now the active connection", id);
        Ok(session)
    }

    /// Unregister and close a session. Clears the active pointer if it
    /// named this session.
    pub async fn remove(&self, id: &str) -> FtpResult<()> {
        let session = {
            let mut inner = self.lock();
            let session = inner
                .sessions
                .remove(id)
                .ok_or_else(|| FtpError::unknown_connection(id))?;
            if inner.active.as_deref() == Some(id) {
                inner.active = None;
            }
            session
        };
        session.close().await;
        log::info!("[{}] disconnected", id);
        Ok(())
    }

    /// Snapshot of every session ordered by identifier.
    pub fn list(&self) -> Vec<ConnectionSummary> {
        let (sessions, active) = {
            let inner = self.lock();
            let sessions: Vec<Arc<FtpSession>> = inner.sessions.values().cloned().collect();
            (sessions, inner.active.clone())
        };
        let mut out: Vec<ConnectionSummary> = sessions
            .iter()
            .map(|s| s.summary(active.as_deref() == Some(s.id())))
            .collect();
        out.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));
        out
    }

    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close and remove every session. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        let drained: Vec<Arc<FtpSession>> = {
            let mut inner = self.lock();
            inner.active = None;
            inner.sessions.drain().map(|(_, s)| s).collect()
        };
        if drained.is_empty() {
            return;
        }
        let count = drained.len();
        futures::future::join_all(drained.iter().map(|s| s.close())).await;
        log::info!("closed {} FTP session(s)", count);
    }
}
