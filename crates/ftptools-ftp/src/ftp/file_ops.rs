//! Streaming transfers over the data channel (RETR / STOR).
//!
//! Both directions move data in fixed-size chunks, so neither side is
//! buffered whole by the client. Local sinks and sources are any tokio
//! reader or writer: files for path-based transfers, byte buffers for
//! in-memory ones.

use crate::ftp::client::FtpClient;
use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::types::FtpResponse;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, Duration};

/// Chunk size for streaming transfers (64 KiB).
const DEFAULT_CHUNK: usize = 65_536;

/// How long to wait for a second reply after ABOR.
const ABORT_GRACE: Duration = Duration::from_millis(500);

impl FtpClient {
    // ─── DOWNLOAD (RETR) ─────────────────────────────────────────

    /// Stream `remote_path` into `sink`.
    ///
    /// With a `limit`, at most `limit + 1` bytes are read from the data
    /// channel. Crossing the limit aborts the transfer (ABOR) and fails
    /// with `ContentTooLarge`.
    pub async fn retrieve(
        &mut self,
        remote_path: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
        limit: Option<u64>,
    ) -> FtpResult<u64> {
        let (mut stream, opening) = self.start_transfer(&format!("RETR {}", remote_path)).await?;
        let data_timeout = self.data_timeout();

        let mut transferred: u64 = 0;
        let mut buf = vec![0u8; DEFAULT_CHUNK];
        loop {
            let want = match limit {
                Some(max) => (max - transferred + 1).min(buf.len() as u64) as usize,
                None => buf.len(),
            };
            let n = timeout(data_timeout, stream.read(&mut buf[..want]))
                .await
                .map_err(|_| FtpError::timeout("Data channel read timed out"))??;
            if n == 0 {
                break;
            }
            if let Some(max) = limit {
                if transferred + n as u64 > max {
                    drop(stream);
                    self.abort_transfer().await;
                    return Err(FtpError::content_too_large(transferred + n as u64, max));
                }
            }
            if let Err(e) = sink.write_all(&buf[..n]).await {
                drop(stream);
                self.abort_transfer().await;
                return Err(FtpError::io_error(format!("Local write failed: {}", e)));
            }
            transferred += n as u64;
        }
        drop(stream);
        if let Err(e) = sink.flush().await {
            // All data arrived; only the completion reply is outstanding.
            self.drain_completion(&opening).await;
            return Err(FtpError::io_error(format!("Local flush failed: {}", e)));
        }

        self.finish_transfer(&opening).await?;
        log::debug!("RETR {} complete ({} bytes)", remote_path, transferred);
        Ok(transferred)
    }

    // ─── UPLOAD (STOR) ───────────────────────────────────────────

    /// Stream everything from `source` into `remote_path`.
    pub async fn store(
        &mut self,
        remote_path: &str,
        source: &mut (dyn AsyncRead + Unpin + Send),
    ) -> FtpResult<u64> {
        let (mut stream, opening) = self.start_transfer(&format!("STOR {}", remote_path)).await?;
        let data_timeout = self.data_timeout();

        let mut transferred: u64 = 0;
        let mut buf = vec![0u8; DEFAULT_CHUNK];
        loop {
            let n = match source.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    drop(stream);
                    self.abort_transfer().await;
                    self.discard_partial_upload(remote_path).await;
                    return Err(FtpError::io_error(format!("Local read failed: {}", e)));
                }
            };
            if n == 0 {
                break;
            }
            timeout(data_timeout, stream.write_all(&buf[..n]))
                .await
                .map_err(|_| FtpError::timeout("Data channel write timed out"))??;
            transferred += n as u64;
        }
        timeout(data_timeout, stream.shutdown())
            .await
            .map_err(|_| FtpError::timeout("Data channel close timed out"))??;
        drop(stream);

        self.finish_transfer(&opening).await?;
        log::debug!("STOR {} complete ({} bytes)", remote_path, transferred);
        Ok(transferred)
    }

    // ─── ABORT ───────────────────────────────────────────────────

    /// Remove whatever the server kept of an upload cut short locally.
    async fn discard_partial_upload(&mut self, remote_path: &str) {
        if !self.connected {
            return;
        }
        if let Err(e) = self.delete(remote_path).await {
            log::debug!("could not remove partial upload '{}': {}", remote_path, e.message);
            if e.code.is_none() {
                self.connected = false;
            }
        }
    }

    /// Consume the completion reply of a transfer that failed locally after
    /// the data channel closed.
    async fn drain_completion(&mut self, opening: &FtpResponse) {
        if let Err(e) = self.finish_transfer(opening).await {
            log::warn!("transfer completion not received: {}", e.message);
            if e.code.is_none() {
                self.connected = false;
            }
        }
    }

    /// Send ABOR and drain its replies (426 then 226, or a lone 225/226).
    /// A control channel that cannot be drained is treated as lost.
    pub(crate) async fn abort_transfer(&mut self) {
        let drained = async {
            let first = self.codec.execute("ABOR").await?;
            if first.code == 426 || first.code == 451 || first.is_preliminary() {
                self.codec.read_response().await?;
            } else if let Some(extra) = self.codec.poll_response(ABORT_GRACE).await? {
                // RETR finished before ABOR arrived; both replies are queued.
                log::trace!("drained trailing reply {}", extra.code);
            }
            Ok::<_, FtpError>(())
        }
        .await;
        if let Err(e) = drained {
            log::warn!("ABOR did not complete cleanly: {}", e.message);
            self.connected = false;
        }
    }
}
