//! The seam between connection records and the wire.
//!
//! Records hold a `Box<dyn Transport>` produced by a [`Connector`]. The
//! production pair is [`FtpClient`] / [`TcpConnector`]; tests plug in an
//! in-memory server instead.

use crate::ftp::client::FtpClient;
use crate::ftp::error::FtpResult;
use crate::ftp::types::{DataChannelMode, FtpConnectionConfig, FtpEntry, SystemInfo, TransferType};
use async_trait::async_trait;
use secrecy::SecretString;
use tokio::io::{AsyncRead, AsyncWrite};

/// One logged-in control connection.
#[async_trait]
pub trait Transport: Send {
    /// Whether the control channel is still believed usable.
    fn is_connected(&self) -> bool;
    fn welcome(&self) -> String;
    /// Working directory as last reported by the server.
    fn current_directory(&self) -> String;
    /// Takes effect on the next data transfer.
    fn set_data_mode(&mut self, mode: DataChannelMode);

    async fn noop(&mut self) -> FtpResult<String>;
    async fn pwd(&mut self) -> FtpResult<String>;
    /// Change directory and return the resulting working directory.
    async fn cwd(&mut self, path: &str) -> FtpResult<String>;
    async fn cdup(&mut self) -> FtpResult<String>;
    async fn list(&mut self, path: Option<&str>, prefer_mlsd: bool) -> FtpResult<Vec<FtpEntry>>;
    async fn mkdir(&mut self, path: &str) -> FtpResult<String>;
    async fn rmdir(&mut self, path: &str) -> FtpResult<()>;
    async fn delete(&mut self, path: &str) -> FtpResult<()>;
    async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()>;
    async fn size(&mut self, path: &str) -> FtpResult<u64>;
    /// Raw MDTM reply.
    async fn mdtm(&mut self, path: &str) -> FtpResult<String>;
    async fn set_type(&mut self, tt: TransferType) -> FtpResult<()>;
    async fn retrieve(
        &mut self,
        path: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
        limit: Option<u64>,
    ) -> FtpResult<u64>;
    async fn store(&mut self, path: &str, source: &mut (dyn AsyncRead + Unpin + Send)) -> FtpResult<u64>;
    async fn system_info(&mut self) -> FtpResult<SystemInfo>;
    async fn quit(&mut self);
}

/// Opens and authenticates new transports.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        config: &FtpConnectionConfig,
        password: &SecretString,
    ) -> FtpResult<Box<dyn Transport>>;
}

/// Plain-TCP FTP connector.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(
        &self,
        config: &FtpConnectionConfig,
        password: &SecretString,
    ) -> FtpResult<Box<dyn Transport>> {
        let client = FtpClient::connect(config.clone(), password).await?;
        Ok(Box::new(client))
    }
}

impl FtpClient {
    /// Drop the connected flag when an error means the channel is gone.
    fn track<T>(&mut self, result: FtpResult<T>) -> FtpResult<T> {
        if let Err(e) = &result {
            if e.is_connectivity() {
                self.connected = false;
            }
        }
        result
    }
}

#[async_trait]
impl Transport for FtpClient {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn welcome(&self) -> String {
        FtpClient::welcome(self).to_string()
    }

    fn current_directory(&self) -> String {
        FtpClient::current_directory(self).to_string()
    }

    fn set_data_mode(&mut self, mode: DataChannelMode) {
        FtpClient::set_data_mode(self, mode)
    }

    async fn noop(&mut self) -> FtpResult<String> {
        let r = FtpClient::noop(self).await;
        self.track(r)
    }

    async fn pwd(&mut self) -> FtpResult<String> {
        let r = FtpClient::pwd(self).await;
        self.track(r)
    }

    async fn cwd(&mut self, path: &str) -> FtpResult<String> {
        let r = FtpClient::cwd(self, path).await;
        self.track(r)
    }

    async fn cdup(&mut self) -> FtpResult<String> {
        let r = FtpClient::cdup(self).await;
        self.track(r)
    }

    async fn list(&mut self, path: Option<&str>, prefer_mlsd: bool) -> FtpResult<Vec<FtpEntry>> {
        let r = FtpClient::list(self, path, prefer_mlsd).await;
        self.track(r)
    }

    async fn mkdir(&mut self, path: &str) -> FtpResult<String> {
        let r = FtpClient::mkdir(self, path).await;
        self.track(r)
    }

    async fn rmdir(&mut self, path: &str) -> FtpResult<()> {
        let r = FtpClient::rmdir(self, path).await;
        self.track(r)
    }

    async fn delete(&mut self, path: &str) -> FtpResult<()> {
        let r = FtpClient::delete(self, path).await;
        self.track(r)
    }

    async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()> {
        let r = FtpClient::rename(self, from, to).await;
        self.track(r)
    }

    async fn size(&mut self, path: &str) -> FtpResult<u64> {
        let r = FtpClient::size(self, path).await;
        self.track(r)
    }

    async fn mdtm(&mut self, path: &str) -> FtpResult<String> {
        let r = FtpClient::mdtm(self, path).await;
        self.track(r)
    }

    async fn set_type(&mut self, tt: TransferType) -> FtpResult<()> {
        let r = FtpClient::set_type(self, tt).await;
        self.track(r)
    }

    async fn retrieve(
        &mut self,
        path: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
        limit: Option<u64>,
    ) -> FtpResult<u64> {
        let r = FtpClient::retrieve(self, path, sink, limit).await;
        self.track(r)
    }

    async fn store(&mut self, path: &str, source: &mut (dyn AsyncRead + Unpin + Send)) -> FtpResult<u64> {
        let r = FtpClient::store(self, path, source).await;
        self.track(r)
    }

    async fn system_info(&mut self) -> FtpResult<SystemInfo> {
        let r = FtpClient::system_info(self).await;
        self.track(r)
    }

    async fn quit(&mut self) {
        FtpClient::quit(self).await
    }
}
