//! Data-channel management for FTP transfers.
//!
//! Supports four modes (RFC 959 + RFC 2428):
//! - **PASV**: server opens a port, client connects
//! - **EPSV**: extended passive (IPv6-ready)
//! - **PORT**: client opens a port, tells server
//! - **EPRT**: extended active (IPv6-ready)
//!
//! Active modes cannot accept until the transfer command has been sent,
//! so opening yields a [`PendingData`] that is finished afterwards.

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::protocol::FtpCodec;
use crate::ftp::types::DataChannelMode;
use lazy_static::lazy_static;
use regex::Regex;
use std::net::{IpAddr, SocketAddr};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};

lazy_static! {
    static ref PASV_RE: Regex =
        Regex::new(r"\((\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)").expect("static regex");
    static ref EPSV_RE: Regex = Regex::new(r"\|\|\|(\d+)\|").expect("static regex");
}

/// A data channel that is either already connected (passive) or still
/// waiting for the server to dial in (active).
pub enum PendingData {
    Connected(TcpStream),
    Listening(TcpListener),
}

impl PendingData {
    /// Finish establishing the data connection.
    pub async fn establish(self, data_timeout: Duration) -> FtpResult<TcpStream> {
        match self {
            PendingData::Connected(tcp) => Ok(tcp),
            PendingData::Listening(listener) => {
                let (tcp, peer) = timeout(data_timeout, listener.accept())
                    .await
                    .map_err(|_| FtpError::data_channel("Active-mode accept timed out"))?
                    .map_err(|e| FtpError::data_channel(format!("Active-mode accept: {}", e)))?;
                log::trace!("data connection accepted from {}", peer);
                Ok(tcp)
            }
        }
    }
}

/// Open a data channel according to the configured mode.
pub async fn open_data_channel(
    codec: &mut FtpCodec,
    mode: DataChannelMode,
    host: &str,
    data_timeout: Duration,
    active_bind: Option<&str>,
) -> FtpResult<PendingData> {
    match mode {
        DataChannelMode::Passive => open_pasv(codec, data_timeout).await.map(PendingData::Connected),
        DataChannelMode::ExtendedPassive => open_epsv(codec, host, data_timeout)
            .await
            .map(PendingData::Connected),
        DataChannelMode::Active => open_port(codec, active_bind).await.map(PendingData::Listening),
        DataChannelMode::ExtendedActive => {
            open_eprt(codec, active_bind).await.map(PendingData::Listening)
        }
    }
}

/// Reject replies to PASV/EPSV/PORT/EPRT as data-channel failures carrying
/// the server's code.
async fn expect_data_reply(codec: &mut FtpCodec, cmd: &str) -> FtpResult<String> {
    let resp = codec.execute(cmd).await?;
    if !resp.is_completion() {
        return Err(FtpError::data_channel(resp.text()).with_code(resp.code));
    }
    Ok(resp.text())
}

// ─── PASV ────────────────────────────────────────────────────────────

/// Issue `PASV`, parse the response, connect to the returned address.
///
/// Response format: `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`
async fn open_pasv(codec: &mut FtpCodec, data_timeout: Duration) -> FtpResult<TcpStream> {
    let text = expect_data_reply(codec, "PASV").await?;
    let mut addr = parse_pasv_response(&text)?;
    // Some servers answer 0.0.0.0; use the control peer instead.
    if addr.ip().is_unspecified() {
        if let Some(peer) = codec.peer_addr() {
            addr.set_ip(peer.ip());
        }
    }
    let tcp = timeout(data_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| FtpError::data_channel("PASV data connect timed out"))?
        .map_err(|e| FtpError::data_channel(format!("PASV data connect: {}", e)))?;
    Ok(tcp)
}

/// Parse `(h1,h2,h3,h4,p1,p2)` from a 227 response.
fn parse_pasv_response(text: &str) -> FtpResult<SocketAddr> {
    let caps = PASV_RE
        .captures(text)
        .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse PASV: {}", text)))?;

    let nums: Vec<u8> = (1..=6)
        .map(|i| {
            caps[i]
                .parse::<u8>()
                .map_err(|_| FtpError::protocol_error("PASV number out of range"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ip = IpAddr::from([nums[0], nums[1], nums[2], nums[3]]);
    let port = (nums[4] as u16) * 256 + (nums[5] as u16);
    Ok(SocketAddr::new(ip, port))
}

// ─── EPSV ────────────────────────────────────────────────────────────

/// Issue `EPSV`, parse port, connect to the *same host* on that port.
///
/// Response format: `229 Entering Extended Passive Mode (|||port|)`
async fn open_epsv(codec: &mut FtpCodec, host: &str, data_timeout: Duration) -> FtpResult<TcpStream> {
    let text = expect_data_reply(codec, "EPSV").await?;
    let port = parse_epsv_response(&text)?;
    let addr = match codec.peer_addr() {
        Some(peer) => SocketAddr::new(peer.ip(), port).to_string(),
        None => format!("{}:{}", host, port),
    };
    let tcp = timeout(data_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| FtpError::data_channel("EPSV data connect timed out"))?
        .map_err(|e| FtpError::data_channel(format!("EPSV data connect: {}", e)))?;
    Ok(tcp)
}

fn parse_epsv_response(text: &str) -> FtpResult<u16> {
    let caps = EPSV_RE
        .captures(text)
        .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse EPSV: {}", text)))?;
    caps[1]
        .parse::<u16>()
        .map_err(|_| FtpError::protocol_error("EPSV port out of range"))
}

// ─── PORT / EPRT ─────────────────────────────────────────────────────

/// Bind on the interface the control connection uses unless overridden.
async fn bind_listener(codec: &FtpCodec, bind_addr: Option<&str>) -> FtpResult<TcpListener> {
    let bind = match bind_addr {
        Some(b) => b.to_string(),
        None => codec
            .local_addr()
            .map(|a| a.ip().to_string())
            .unwrap_or_else(|| "0.0.0.0".into()),
    };
    let target = if bind.contains(':') {
        format!("[{}]:0", bind)
    } else {
        format!("{}:0", bind)
    };
    TcpListener::bind(target)
        .await
        .map_err(|e| FtpError::data_channel(format!("Data listener bind: {}", e)))
}

/// Bind a local TCP listener and announce it via `PORT`.
async fn open_port(codec: &mut FtpCodec, bind_addr: Option<&str>) -> FtpResult<TcpListener> {
    let listener = bind_listener(codec, bind_addr).await?;
    let local = listener
        .local_addr()
        .map_err(|e| FtpError::data_channel(format!("PORT local_addr: {}", e)))?;

    let ip = match local.ip() {
        IpAddr::V4(v4) => v4,
        _ => return Err(FtpError::data_channel("PORT requires IPv4, use extended active mode")),
    };
    let octets = ip.octets();
    let port = local.port();

    let cmd = format!(
        "PORT {},{},{},{},{},{}",
        octets[0],
        octets[1],
        octets[2],
        octets[3],
        port / 256,
        port % 256
    );
    expect_data_reply(codec, &cmd).await?;
    Ok(listener)
}

/// Bind a local listener and announce it via `EPRT`.
///
/// Command format: `EPRT |1|ip|port|` (1 = IPv4, 2 = IPv6)
async fn open_eprt(codec: &mut FtpCodec, bind_addr: Option<&str>) -> FtpResult<TcpListener> {
    let listener = bind_listener(codec, bind_addr).await?;
    let local = listener
        .local_addr()
        .map_err(|e| FtpError::data_channel(format!("EPRT local_addr: {}", e)))?;

    let af = match local.ip() {
        IpAddr::V4(_) => 1,
        IpAddr::V6(_) => 2,
    };
    let cmd = format!("EPRT |{}|{}|{}|", af, local.ip(), local.port());
    expect_data_reply(codec, &cmd).await?;
    Ok(listener)
}
