//! Directory and entry operations: mkdir, rmdir, delete, rename.

use crate::ftp::client::{parse_pwd, FtpClient};
use crate::ftp::error::{FtpError, FtpResult};

impl FtpClient {
    // ─── MKD ─────────────────────────────────────────────────────

    /// Create a directory; returns the path the server reports.
    pub async fn mkdir(&mut self, path: &str) -> FtpResult<String> {
        let resp = self.codec.expect_ok(&format!("MKD {}", path)).await?;
        // "257 \"/new/dir\" created"
        Ok(parse_pwd(&resp.text()).unwrap_or_else(|_| path.to_string()))
    }

    // ─── RMD ─────────────────────────────────────────────────────

    /// Remove an empty directory.
    pub async fn rmdir(&mut self, path: &str) -> FtpResult<()> {
        self.codec.expect_ok(&format!("RMD {}", path)).await?;
        Ok(())
    }

    // ─── DELE ────────────────────────────────────────────────────

    pub async fn delete(&mut self, path: &str) -> FtpResult<()> {
        self.codec.expect_ok(&format!("DELE {}", path)).await?;
        Ok(())
    }

    // ─── RNFR / RNTO ─────────────────────────────────────────────

    /// Rename or move an entry. RNFR must answer 350 before RNTO is sent.
    pub async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()> {
        let resp = self.codec.execute(&format!("RNFR {}", from)).await?;
        if resp.code != 350 {
            return Err(FtpError::from_reply(resp.code, &resp.text()));
        }
        self.codec.expect_ok(&format!("RNTO {}", to)).await?;
        Ok(())
    }
}
