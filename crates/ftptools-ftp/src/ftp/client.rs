//! Stateful FTP client: owns the control connection and issues commands.
//!
//! Lifecycle: `connect()` → USER/PASS → FEAT/SYST/PWD probing → set TYPE
//! → optionally CWD into the initial directory.
//!
//! Higher-level operations live in `directory.rs` and `file_ops.rs`.

use crate::ftp::connection;
use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::parser;
use crate::ftp::protocol::FtpCodec;
use crate::ftp::transfer::{self, PendingData};
use crate::ftp::types::*;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// A logged-in FTP control connection.
pub struct FtpClient {
    pub(crate) codec: FtpCodec,
    pub(crate) config: FtpConnectionConfig,
    pub(crate) features: ServerFeatures,
    welcome: String,
    current_directory: String,
    /// Representation type last acknowledged by the server.
    transfer_type: Option<TransferType>,
    pub(crate) connected: bool,
}

impl FtpClient {
    /// Connect and log in.
    pub async fn connect(config: FtpConnectionConfig, password: &SecretString) -> FtpResult<Self> {
        if config.host.is_empty() {
            return Err(FtpError::invalid_config("Host must not be empty"));
        }

        let (mut codec, banner) = connection::connect(&config).await?;

        // ── Authenticate ─────────────────────────────────────────
        let user_resp = codec.execute(&format!("USER {}", config.username)).await?;
        match user_resp.code {
            230 => {}
            331 => {
                let pass_resp = codec
                    .execute(&format!("PASS {}", password.expose_secret()))
                    .await?;
                if !pass_resp.is_completion() {
                    return Err(FtpError::auth_failed(format!(
                        "Login failed: {}",
                        pass_resp.text()
                    ))
                    .with_code(pass_resp.code));
                }
            }
            code => {
                return Err(FtpError::auth_failed(format!(
                    "USER rejected: {}",
                    user_resp.text()
                ))
                .with_code(code));
            }
        }
        log::debug!("logged in to {}:{} as {}", config.host, config.port, config.username);

        let features = Self::probe_features(&mut codec).await?;

        if config.utf8 && features.utf8 {
            let _ = codec.execute("OPTS UTF8 ON").await?;
        }

        let mut client = Self {
            codec,
            welcome: banner.text(),
            features,
            current_directory: "/".into(),
            transfer_type: None,
            connected: true,
            config,
        };

        client.set_type(client.config.transfer_type).await?;

        if let Some(dir) = client.config.initial_directory.clone() {
            if let Err(e) = client.cwd(&dir).await {
                if e.is_connectivity() {
                    return Err(e);
                }
                log::warn!("could not restore directory '{}': {}", dir, e.message);
            }
        }
        client.current_directory = client.pwd().await.unwrap_or_else(|_| "/".into());

        Ok(client)
    }

    /// Login banner.
    pub fn welcome(&self) -> &str {
        &self.welcome
    }

    pub fn current_directory(&self) -> &str {
        &self.current_directory
    }

    pub fn features(&self) -> &ServerFeatures {
        &self.features
    }

    pub fn set_data_mode(&mut self, mode: DataChannelMode) {
        self.config.data_channel_mode = mode;
    }

    /// Send a NOOP.
    pub async fn noop(&mut self) -> FtpResult<String> {
        let resp = self.codec.expect_ok("NOOP").await?;
        Ok(resp.text())
    }

    // ─── PWD / CWD / CDUP ───────────────────────────────────────

    pub async fn pwd(&mut self) -> FtpResult<String> {
        let resp = self.codec.expect_ok("PWD").await?;
        let dir = parse_pwd(&resp.text())?;
        self.current_directory = dir.clone();
        Ok(dir)
    }

    /// Change into `path` and return the resulting working directory.
    pub async fn cwd(&mut self, path: &str) -> FtpResult<String> {
        self.codec.expect_ok(&format!("CWD {}", path)).await?;
        self.pwd().await
    }

    /// Move to the parent directory.
    pub async fn cdup(&mut self) -> FtpResult<String> {
        self.codec.expect_ok("CDUP").await?;
        self.pwd().await
    }

    // ─── FEAT probe ──────────────────────────────────────────────

    async fn probe_features(codec: &mut FtpCodec) -> FtpResult<ServerFeatures> {
        let resp = codec.execute("FEAT").await?;
        if !resp.is_completion() {
            return Ok(ServerFeatures::default());
        }

        let raw: Vec<String> = resp
            .lines
            .iter()
            .skip(1)
            .filter(|l| !l.starts_with("211"))
            .map(|l| l.trim().to_uppercase())
            .collect();

        let has = |feat: &str| raw.iter().any(|l| l.starts_with(feat));

        Ok(ServerFeatures {
            mlsd: has("MLSD"),
            mlst: has("MLST"),
            size: has("SIZE"),
            mdtm: has("MDTM"),
            rest_stream: has("REST STREAM"),
            utf8: has("UTF8"),
            epsv: has("EPSV"),
            eprt: has("EPRT"),
            raw_features: raw,
        })
    }

    // ─── TYPE ────────────────────────────────────────────────────

    /// Switch representation type; skipped when already selected.
    pub async fn set_type(&mut self, tt: TransferType) -> FtpResult<()> {
        if self.transfer_type == Some(tt) {
            return Ok(());
        }
        self.codec.expect_ok(tt.command()).await?;
        self.transfer_type = Some(tt);
        Ok(())
    }

    // ─── Data channel ────────────────────────────────────────────

    pub(crate) fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.config.data_timeout_sec)
    }

    pub(crate) async fn open_data_channel(&mut self) -> FtpResult<PendingData> {
        let timeout = self.data_timeout();
        transfer::open_data_channel(
            &mut self.codec,
            self.config.data_channel_mode,
            &self.config.host,
            timeout,
            self.config.active_bind_address.as_deref(),
        )
        .await
    }

    /// Open a data channel, send `cmd`, and wait for the server to accept it.
    pub(crate) async fn start_transfer(&mut self, cmd: &str) -> FtpResult<(TcpStream, FtpResponse)> {
        let pending = self.open_data_channel().await?;
        let resp = self.codec.execute(cmd).await?;
        if !resp.is_preliminary() && !resp.is_completion() {
            return Err(FtpError::from_reply(resp.code, &resp.text()));
        }
        let stream = pending.establish(self.data_timeout()).await?;
        Ok((stream, resp))
    }

    /// Read the completion reply unless the opening reply already was one.
    pub(crate) async fn finish_transfer(&mut self, opening: &FtpResponse) -> FtpResult<()> {
        if opening.is_completion() {
            return Ok(());
        }
        let done = self.codec.read_response().await?;
        if !done.is_completion() {
            return Err(FtpError::from_reply(done.code, &done.text()));
        }
        Ok(())
    }

    // ─── Listing ─────────────────────────────────────────────────

    /// Retrieve a directory listing (MLSD when preferred and advertised).
    pub async fn list(&mut self, path: Option<&str>, prefer_mlsd: bool) -> FtpResult<Vec<FtpEntry>> {
        let verb = if prefer_mlsd && self.features.mlsd {
            "MLSD"
        } else {
            "LIST"
        };
        let cmd = match path {
            Some(p) if !p.is_empty() => format!("{} {}", verb, p),
            _ => verb.to_string(),
        };
        let data = self.retrieve_listing(&cmd).await?;
        Ok(parser::parse_listing(&String::from_utf8_lossy(&data)))
    }

    async fn retrieve_listing(&mut self, cmd: &str) -> FtpResult<Vec<u8>> {
        let (mut stream, opening) = self.start_transfer(cmd).await?;
        let mut buf = Vec::new();
        timeout(self.data_timeout(), stream.read_to_end(&mut buf))
            .await
            .map_err(|_| FtpError::timeout("Listing data timed out"))??;
        drop(stream);
        self.finish_transfer(&opening).await?;
        Ok(buf)
    }

    // ─── SIZE / MDTM ────────────────────────────────────────────

    /// Size of a remote file (RFC 3659 SIZE).
    pub async fn size(&mut self, path: &str) -> FtpResult<u64> {
        let resp = self.codec.expect_ok(&format!("SIZE {}", path)).await?;
        let text = resp.text();
        text.split_whitespace()
            .nth(1)
            .and_then(|n| n.trim().parse::<u64>().ok())
            .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse SIZE: {}", text)))
    }

    /// Raw MDTM reply text (RFC 3659 MDTM).
    pub async fn mdtm(&mut self, path: &str) -> FtpResult<String> {
        let resp = self.codec.expect_ok(&format!("MDTM {}", path)).await?;
        Ok(resp.text())
    }

    // ─── SYST / STAT / FEAT ─────────────────────────────────────

    /// Collect SYST, STAT and FEAT replies. Refused commands leave the
    /// field empty.
    pub async fn system_info(&mut self) -> FtpResult<SystemInfo> {
        let mut info = SystemInfo {
            welcome: Some(self.welcome.clone()),
            ..Default::default()
        };
        let syst = self.codec.execute("SYST").await?;
        if syst.is_completion() {
            info.system = Some(strip_code(&syst.text()));
        }
        let stat = self.codec.execute("STAT").await?;
        if stat.is_completion() {
            info.status = Some(strip_code(&stat.text()));
        }
        let feat = self.codec.execute("FEAT").await?;
        if feat.is_completion() {
            info.features = Some(feat.text());
        }
        Ok(info)
    }

    // ─── QUIT ────────────────────────────────────────────────────

    /// Politely end the session. Errors are ignored; the socket is closed
    /// when the client drops.
    pub async fn quit(&mut self) {
        if self.connected {
            if let Err(e) = self.codec.execute("QUIT").await {
                log::debug!("QUIT failed: {}", e.message);
            }
        }
        self.connected = false;
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Parse `257 "/some/path"` into the path string. Doubled quotes inside
/// the name are un-escaped (RFC 959 appendix II).
pub(crate) fn parse_pwd(text: &str) -> FtpResult<String> {
    let start = text
        .find('"')
        .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse PWD: {}", text)))?;
    let mut out = String::new();
    let mut chars = text[start + 1..].chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                out.push('"');
                continue;
            }
            return Ok(out);
        }
        out.push(c);
    }
    Err(FtpError::protocol_error(format!("Cannot parse PWD: {}", text)))
}

/// Drop the reply code prefix of each line (`215 UNIX Type: L8` → `UNIX Type: L8`).
fn strip_code(text: &str) -> String {
    text.lines()
        .map(|l| {
            let b = l.as_bytes();
            if b.len() > 4 && b[..3].iter().all(u8::is_ascii_digit) && (b[3] == b' ' || b[3] == b'-') {
                &l[4..]
            } else {
                l.trim()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
