//! TCP transport: establishes the FTP control connection under the
//! connect timeout from `FtpConnectionConfig`.

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::protocol::FtpCodec;
use crate::ftp::types::{FtpConnectionConfig, FtpResponse};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Establish the control connection and return a ready-to-use codec
/// **plus** the server welcome banner.
pub async fn connect(config: &FtpConnectionConfig) -> FtpResult<(FtpCodec, FtpResponse)> {
    let addr = format!("{}:{}", config.host, config.port);
    let dur = Duration::from_secs(config.connect_timeout_sec);

    let tcp = timeout(dur, TcpStream::connect(&addr))
        .await
        .map_err(|_| FtpError::connection_failed(format!("TCP connect to {} timed out", addr)))?
        .map_err(|e| FtpError::connection_failed(format!("TCP connect to {}: {}", addr, e)))?;

    tcp.set_nodelay(true).ok();

    let mut codec = FtpCodec::from_tcp(tcp, Duration::from_secs(config.command_timeout_sec));
    let banner = codec.read_response().await.map_err(|e| {
        FtpError::connection_failed(format!("No greeting from {}: {}", addr, e.message))
    })?;
    if !banner.is_completion() {
        return Err(FtpError::connection_failed(format!(
            "Server {} refused the session: {}",
            addr,
            banner.text()
        ))
        .with_code(banner.code));
    }
    log::debug!("FTP control connection to {} established", addr);
    Ok((codec, banner))
}
