//! `ftptools`: reads one JSON tool call per line on stdin and answers with
//! one JSON envelope per line on stdout. Logs go to stderr.

use ftptools_ftp::ftp::{dispatch, tool_catalog, FtpService, FtpServiceConfig, ToolCall, ToolResponse};
use serde_json::json;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

/// Env var naming a JSON `FtpServiceConfig` file.
const CONFIG_ENV: &str = "FTPTOOLS_CONFIG";

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config() -> Result<FtpServiceConfig, String> {
    let path = match std::env::var(CONFIG_ENV) {
        Ok(path) => path,
        Err(_) => return Ok(FtpServiceConfig::default()),
    };
    let raw = std::fs::read_to_string(&path).map_err(|e| format!("Cannot read {}: {}", path, e))?;
    serde_json::from_str(&raw).map_err(|e| format!("Invalid config in {}: {}", path, e))
}

async fn handle_line(service: &FtpService, line: &str) -> ToolResponse {
    match serde_json::from_str::<ToolCall>(line) {
        Ok(call) => dispatch(service, call).await,
        Err(e) => ToolResponse::failure(format!("Malformed tool call: {}", e)),
    }
}

fn encode(resp: &ToolResponse) -> String {
    serde_json::to_string(resp).unwrap_or_else(|e| {
        json!({ "success": false, "error": format!("Cannot encode response: {}", e) }).to_string()
    })
}

async fn serve(service: &FtpService) -> io::Result<()> {
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut out = BufWriter::new(io::stdout());
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let resp = handle_line(service, &line).await;
        out.write_all(encode(&resp).as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();

    if std::env::args().nth(1).as_deref() == Some("--list-tools") {
        println!("{}", json!(tool_catalog()));
        return;
    }

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };
    let service = FtpService::new(config);
    tracing::info!("ftptools ready, reading tool calls from stdin");

    tokio::select! {
        res = serve(&service) => {
            if let Err(e) = res {
                tracing::error!("stdio loop failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }

    service.shutdown().await;
    tracing::info!("all FTP sessions closed");
}
