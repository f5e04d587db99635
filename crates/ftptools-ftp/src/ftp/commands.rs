//! Tool-call surface for the FTP crate.
//!
//! A [`ToolCall`] (tool name + JSON arguments) becomes a typed
//! [`FtpToolRequest`], is validated, runs against [`FtpService`], and comes
//! back as a [`ToolResponse`] envelope. Errors never escape as anything but
//! a `success: false` envelope.

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::service::{ConnectRequest, FtpService};
use crate::ftp::types::{FtpSortField, FtpSortOrder, ListOptions, TransferType};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Longest path accepted from a caller.
const MAX_PATH_LEN: usize = 4096;

// ── Envelope ─────────────────────────────────────────────────────────────────

/// An incoming tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Uniform result shape returned for every tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResponse {
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// A failure that still carries a report.
    pub fn failure_with(error: impl Into<String>, result: Value) -> Self {
        Self {
            success: false,
            result: Some(result),
            error: Some(error.into()),
        }
    }
}

// ── Requests ─────────────────────────────────────────────────────────────────

fn default_port() -> u16 {
    21
}
fn default_true() -> bool {
    true
}
fn default_encoding() -> String {
    "utf-8".into()
}
fn default_max_size_mb() -> u64 {
    10
}

/// What `ftp_transfer_progress` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferTopic {
    /// Data-channel mode and representation type of the record.
    Modes,
    /// FEAT reply.
    Capabilities,
    /// STAT reply.
    Status,
}

/// Typed arguments of every tool, tagged by tool name.
#[derive(Debug, Deserialize)]
#[serde(tag = "tool")]
pub enum FtpToolRequest {
    #[serde(rename = "ftp_connect")]
    Connect {
        connection_id: String,
        host: String,
        username: String,
        password: SecretString,
        #[serde(default = "default_port")]
        port: u16,
        #[serde(default = "default_true")]
        passive: bool,
        /// Connect timeout in seconds.
        #[serde(default)]
        timeout: Option<u64>,
        #[serde(default)]
        make_active: bool,
    },
    #[serde(rename = "ftp_disconnect")]
    Disconnect {
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_list_connections")]
    ListConnections {},
    #[serde(rename = "ftp_switch_connection")]
    SwitchConnection { connection_id: String },
    #[serde(rename = "ftp_pwd")]
    Pwd {
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_cwd")]
    Cwd {
        directory: String,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_explore_directory")]
    ExploreDirectory {
        directory: String,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_list_directory")]
    ListDirectory {
        #[serde(default)]
        directory: Option<String>,
        #[serde(default)]
        filter: Option<String>,
        #[serde(default)]
        sort_by: Option<FtpSortField>,
        #[serde(default)]
        sort_order: Option<FtpSortOrder>,
        #[serde(default = "default_true")]
        show_hidden: bool,
        #[serde(default)]
        prefer_mlsd: Option<bool>,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_mkdir")]
    Mkdir {
        directory: String,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_rmdir")]
    Rmdir {
        directory: String,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_delete_file")]
    DeleteFile {
        filename: String,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_rename")]
    Rename {
        old_name: String,
        new_name: String,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_upload_file")]
    UploadFile {
        local_path: String,
        #[serde(default)]
        remote_path: Option<String>,
        #[serde(default = "default_true")]
        binary_mode: bool,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_upload_content")]
    UploadContent {
        content: String,
        remote_path: String,
        /// `content` is base64 when set.
        #[serde(default)]
        binary_mode: bool,
        #[serde(default = "default_encoding")]
        encoding: String,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_download_file")]
    DownloadFile {
        remote_path: String,
        #[serde(default)]
        local_path: Option<String>,
        #[serde(default = "default_true")]
        binary_mode: bool,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_download_content")]
    DownloadContent {
        remote_path: String,
        /// Return base64 instead of text.
        #[serde(default)]
        binary_mode: bool,
        #[serde(default = "default_encoding")]
        encoding: String,
        #[serde(default = "default_max_size_mb")]
        max_size_mb: u64,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_get_file_size")]
    GetFileSize {
        remote_path: String,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_get_modification_time")]
    GetModificationTime {
        remote_path: String,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_set_passive_mode")]
    SetPassiveMode {
        passive: bool,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_send_noop")]
    SendNoop {
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_get_system_info")]
    GetSystemInfo {
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_transfer_progress")]
    TransferProgress {
        operation: TransferTopic,
        #[serde(default)]
        connection_id: Option<String>,
    },
    #[serde(rename = "ftp_create_directory_tree")]
    CreateDirectoryTree {
        directory_path: String,
        #[serde(default)]
        connection_id: Option<String>,
    },
}

impl ToolCall {
    /// Decode the arguments into a typed request.
    pub fn into_request(self) -> FtpResult<FtpToolRequest> {
        let mut args = match self.arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                return Err(FtpError::invalid_config(format!(
                    "{}: arguments must be a JSON object",
                    self.name
                )))
            }
        };
        // Keep a mistyped password out of serde's error text.
        if matches!(args.get("password"), Some(v) if !v.is_string()) {
            return Err(FtpError::invalid_config(format!("{}: password must be a string", self.name)));
        }
        args.insert("tool".into(), Value::String(self.name.clone()));
        serde_json::from_value(Value::Object(args))
            .map_err(|e| FtpError::invalid_config(format!("{}: {}", self.name, e)))
    }
}

fn require(param: &str, value: &str) -> FtpResult<()> {
    if value.trim().is_empty() {
        return Err(FtpError::invalid_config(format!("{} must not be empty", param)));
    }
    if value.contains('\0') {
        return Err(FtpError::invalid_config(format!("{} contains null bytes", param)));
    }
    if value.len() > MAX_PATH_LEN {
        return Err(FtpError::invalid_config(format!(
            "{} exceeds {} characters",
            param, MAX_PATH_LEN
        )));
    }
    Ok(())
}

fn require_opt(param: &str, value: &Option<String>) -> FtpResult<()> {
    match value {
        Some(v) => require(param, v),
        None => Ok(()),
    }
}

impl FtpToolRequest {
    /// Tool name this request was decoded from.
    pub fn name(&self) -> &'static str {
        use FtpToolRequest::*;
        match self {
            Connect { .. } => "ftp_connect",
            Disconnect { .. } => "ftp_disconnect",
            ListConnections {} => "ftp_list_connections",
            SwitchConnection { .. } => "ftp_switch_connection",
            Pwd { .. } => "ftp_pwd",
            Cwd { .. } => "ftp_cwd",
            ExploreDirectory { .. } => "ftp_explore_directory",
            ListDirectory { .. } => "ftp_list_directory",
            Mkdir { .. } => "ftp_mkdir",
            Rmdir { .. } => "ftp_rmdir",
            DeleteFile { .. } => "ftp_delete_file",
            Rename { .. } => "ftp_rename",
            UploadFile { .. } => "ftp_upload_file",
            UploadContent { .. } => "ftp_upload_content",
            DownloadFile { .. } => "ftp_download_file",
            DownloadContent { .. } => "ftp_download_content",
            GetFileSize { .. } => "ftp_get_file_size",
            GetModificationTime { .. } => "ftp_get_modification_time",
            SetPassiveMode { .. } => "ftp_set_passive_mode",
            SendNoop { .. } => "ftp_send_noop",
            GetSystemInfo { .. } => "ftp_get_system_info",
            TransferProgress { .. } => "ftp_transfer_progress",
            CreateDirectoryTree { .. } => "ftp_create_directory_tree",
        }
    }

    /// Reject empty or malformed parameters before any network work.
    pub fn validate(&self) -> FtpResult<()> {
        use FtpToolRequest::*;
        match self {
            Connect {
                connection_id,
                host,
                username,
                port,
                timeout,
                ..
            } => {
                require("connection_id", connection_id)?;
                require("host", host)?;
                require("username", username)?;
                if *port == 0 {
                    return Err(FtpError::invalid_config("port must be between 1 and 65535"));
                }
                if *timeout == Some(0) {
                    return Err(FtpError::invalid_config("timeout must be positive"));
                }
                Ok(())
            }
            SwitchConnection { connection_id } => require("connection_id", connection_id),
            Disconnect { connection_id }
            | Pwd { connection_id }
            | SendNoop { connection_id }
            | GetSystemInfo { connection_id }
            | TransferProgress { connection_id, .. }
            | SetPassiveMode { connection_id, .. } => require_opt("connection_id", connection_id),
            ListConnections {} => Ok(()),
            Cwd { directory, connection_id }
            | ExploreDirectory { directory, connection_id }
            | Mkdir { directory, connection_id }
            | Rmdir { directory, connection_id } => {
                require("directory", directory)?;
                require_opt("connection_id", connection_id)
            }
            ListDirectory {
                directory,
                filter,
                connection_id,
                ..
            } => {
                require_opt("directory", directory)?;
                if let Some(f) = filter {
                    glob::Pattern::new(f)
                        .map_err(|e| FtpError::invalid_config(format!("filter: {}", e)))?;
                }
                require_opt("connection_id", connection_id)
            }
            DeleteFile { filename, connection_id } => {
                require("filename", filename)?;
                require_opt("connection_id", connection_id)
            }
            Rename {
                old_name,
                new_name,
                connection_id,
            } => {
                require("old_name", old_name)?;
                require("new_name", new_name)?;
                require_opt("connection_id", connection_id)
            }
            UploadFile {
                local_path,
                remote_path,
                connection_id,
                ..
            } => {
                require("local_path", local_path)?;
                require_opt("remote_path", remote_path)?;
                require_opt("connection_id", connection_id)
            }
            UploadContent {
                remote_path,
                encoding,
                connection_id,
                ..
            } => {
                require("remote_path", remote_path)?;
                check_encoding(encoding)?;
                require_opt("connection_id", connection_id)
            }
            DownloadFile {
                remote_path,
                local_path,
                connection_id,
                ..
            } => {
                require("remote_path", remote_path)?;
                require_opt("local_path", local_path)?;
                require_opt("connection_id", connection_id)
            }
            DownloadContent {
                remote_path,
                encoding,
                max_size_mb,
                connection_id,
                ..
            } => {
                require("remote_path", remote_path)?;
                check_encoding(encoding)?;
                if *max_size_mb == 0 {
                    return Err(FtpError::invalid_config("max_size_mb must be positive"));
                }
                require_opt("connection_id", connection_id)
            }
            GetFileSize {
                remote_path,
                connection_id,
            }
            | GetModificationTime {
                remote_path,
                connection_id,
            } => {
                require("remote_path", remote_path)?;
                require_opt("connection_id", connection_id)
            }
            CreateDirectoryTree {
                directory_path,
                connection_id,
            } => {
                require("directory_path", directory_path)?;
                if directory_path.split('/').all(|p| p.is_empty() || p == ".") {
                    return Err(FtpError::invalid_config("directory_path names no directory"));
                }
                require_opt("connection_id", connection_id)
            }
        }
    }
}

/// Only UTF-8 text is supported.
fn check_encoding(encoding: &str) -> FtpResult<()> {
    match encoding.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => Ok(()),
        other => Err(FtpError::invalid_config(format!(
            "Unsupported encoding '{}', only utf-8 is available",
            other
        ))),
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────────────

/// Decode, validate and run one tool call.
pub async fn dispatch(service: &FtpService, call: ToolCall) -> ToolResponse {
    let request = match call.into_request().and_then(|r| r.validate().map(|_| r)) {
        Ok(r) => r,
        Err(e) => return ToolResponse::failure(e.message),
    };
    let name = request.name();
    log::debug!("tool {} invoked", name);
    match execute(service, request).await {
        Ok(resp) => resp,
        Err(e) => {
            log::warn!("tool {} failed: {}", name, e);
            ToolResponse::failure(e.message)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> FtpResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| FtpError::protocol_error(format!("Cannot serialize result: {}", e)))
}

async fn execute(service: &FtpService, request: FtpToolRequest) -> FtpResult<ToolResponse> {
    use FtpToolRequest::*;
    let result = match request {
        Connect {
            connection_id,
            host,
            username,
            password,
            port,
            passive,
            timeout,
            make_active,
        } => {
            let info = service
                .connect(ConnectRequest {
                    connection_id,
                    host,
                    port,
                    username,
                    password,
                    passive,
                    timeout_sec: timeout,
                    make_active,
                    initial_directory: None,
                })
                .await?;
            to_json(&info)?
        }
        Disconnect { connection_id } => {
            let closed = service.disconnect(connection_id.as_deref()).await?;
            json!({ "connectionId": closed, "message": format!("Disconnected from {}", closed) })
        }
        ListConnections {} => json!({
            "active": service.active_connection(),
            "connections": to_json(&service.list_connections())?,
        }),
        SwitchConnection { connection_id } => to_json(&service.switch_connection(&connection_id)?)?,
        Pwd { connection_id } => {
            let dir = service.pwd(connection_id.as_deref()).await?;
            json!({ "currentDirectory": dir })
        }
        Cwd {
            directory,
            connection_id,
        } => {
            let dir = service.change_directory(connection_id.as_deref(), &directory).await?;
            json!({ "currentDirectory": dir })
        }
        ExploreDirectory {
            directory,
            connection_id,
        } => {
            let report = service.explore_directory(connection_id.as_deref(), &directory).await?;
            if !report.accessible {
                return Ok(ToolResponse::failure_with(report.message.clone(), to_json(&report)?));
            }
            to_json(&report)?
        }
        ListDirectory {
            directory,
            filter,
            sort_by,
            sort_order,
            show_hidden,
            prefer_mlsd,
            connection_id,
        } => {
            let options = ListOptions {
                filter,
                sort_by,
                sort_order,
                show_hidden,
                prefer_mlsd,
            };
            let listing = service
                .list_directory(connection_id.as_deref(), directory.as_deref(), &options)
                .await?;
            to_json(&listing)?
        }
        Mkdir {
            directory,
            connection_id,
        } => {
            let created = service.make_directory(connection_id.as_deref(), &directory).await?;
            json!({ "directory": created, "message": format!("Created directory {}", created) })
        }
        Rmdir {
            directory,
            connection_id,
        } => {
            service.remove_directory(connection_id.as_deref(), &directory).await?;
            json!({ "directory": directory, "message": format!("Removed directory {}", directory) })
        }
        DeleteFile {
            filename,
            connection_id,
        } => {
            service.delete_file(connection_id.as_deref(), &filename).await?;
            json!({ "file": filename, "message": format!("Deleted {}", filename) })
        }
        Rename {
            old_name,
            new_name,
            connection_id,
        } => {
            service.rename(connection_id.as_deref(), &old_name, &new_name).await?;
            json!({ "oldName": old_name, "newName": new_name })
        }
        UploadFile {
            local_path,
            remote_path,
            binary_mode,
            connection_id,
        } => to_json(
            &service
                .upload_file(connection_id.as_deref(), &local_path, remote_path.as_deref(), binary_mode)
                .await?,
        )?,
        UploadContent {
            content,
            remote_path,
            binary_mode,
            connection_id,
            ..
        } => {
            let data = if binary_mode {
                STANDARD
                    .decode(content.trim())
                    .map_err(|e| FtpError::invalid_config(format!("content is not valid base64: {}", e)))?
            } else {
                content.into_bytes()
            };
            to_json(
                &service
                    .upload_content(
                        connection_id.as_deref(),
                        &remote_path,
                        data,
                        TransferType::from_binary(binary_mode),
                    )
                    .await?,
            )?
        }
        DownloadFile {
            remote_path,
            local_path,
            binary_mode,
            connection_id,
        } => to_json(
            &service
                .download_file(connection_id.as_deref(), &remote_path, local_path.as_deref(), binary_mode)
                .await?,
        )?,
        DownloadContent {
            remote_path,
            binary_mode,
            max_size_mb,
            connection_id,
            ..
        } => {
            let ceiling = max_size_mb
                .checked_mul(1024 * 1024)
                .ok_or_else(|| FtpError::invalid_config("max_size_mb is too large"))?;
            let download = service
                .download_content(
                    connection_id.as_deref(),
                    &remote_path,
                    Some(ceiling),
                    TransferType::from_binary(binary_mode),
                )
                .await?;
            let size = download.data.len();
            let (content, encoding) = if binary_mode {
                (STANDARD.encode(&download.data), "base64")
            } else {
                let text = String::from_utf8(download.data).map_err(|_| {
                    FtpError::protocol_error(format!(
                        "{} is not valid UTF-8 text; retry with binary_mode",
                        remote_path
                    ))
                })?;
                (text, "utf-8")
            };
            json!({
                "remotePath": download.remote_path,
                "content": content,
                "size": size,
                "binaryMode": binary_mode,
                "encoding": encoding,
                "elapsedMs": download.elapsed_ms,
            })
        }
        GetFileSize {
            remote_path,
            connection_id,
        } => to_json(&service.file_size(connection_id.as_deref(), &remote_path).await?)?,
        GetModificationTime {
            remote_path,
            connection_id,
        } => to_json(
            &service
                .modification_time(connection_id.as_deref(), &remote_path)
                .await?,
        )?,
        SetPassiveMode {
            passive,
            connection_id,
        } => {
            let summary = service.set_passive_mode(connection_id.as_deref(), passive).await?;
            json!({
                "connectionId": summary.connection_id,
                "passive": summary.passive,
                "message": format!("Passive mode {}", if passive { "enabled" } else { "disabled" }),
            })
        }
        SendNoop { connection_id } => {
            let reply = service.send_noop(connection_id.as_deref()).await?;
            json!({ "reply": reply })
        }
        GetSystemInfo { connection_id } => {
            to_json(&service.system_info(connection_id.as_deref()).await?)?
        }
        TransferProgress {
            operation: TransferTopic::Modes,
            connection_id,
        } => {
            let session = service.registry().get(connection_id.as_deref())?;
            let mode = session.data_mode();
            json!({
                "operation": TransferTopic::Modes,
                "connectionId": session.id(),
                "passive": mode.is_passive(),
                "dataChannelMode": mode,
                "transferType": session.transfer_type(),
            })
        }
        TransferProgress {
            operation,
            connection_id,
        } => {
            let info = service.system_info(connection_id.as_deref()).await?;
            let reply = match operation {
                TransferTopic::Capabilities => info.features,
                _ => info.status,
            };
            json!({
                "operation": operation,
                "reply": reply,
            })
        }
        CreateDirectoryTree {
            directory_path,
            connection_id,
        } => to_json(
            &service
                .create_directory_tree(connection_id.as_deref(), &directory_path)
                .await?,
        )?,
    };
    Ok(ToolResponse::success(result))
}

// ── Catalog ──────────────────────────────────────────────────────────────────

/// Name and one-line description of a tool.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
}

const CATALOG: &[(&str, &str)] = &[
    ("ftp_connect", "Connect to an FTP server and authenticate under a connection id"),
    ("ftp_disconnect", "Close a connection (the active one when no id is given)"),
    ("ftp_list_connections", "List open connections and which one is active"),
    ("ftp_switch_connection", "Make another connection the active one"),
    ("ftp_pwd", "Print the remote working directory"),
    ("ftp_cwd", "Change the remote working directory"),
    ("ftp_explore_directory", "Check whether a directory is accessible without staying in it"),
    ("ftp_list_directory", "List a directory with optional filter and sorting"),
    ("ftp_mkdir", "Create a remote directory"),
    ("ftp_rmdir", "Remove an empty remote directory"),
    ("ftp_delete_file", "Delete a remote file"),
    ("ftp_rename", "Rename or move a remote entry"),
    ("ftp_upload_file", "Upload a local file"),
    ("ftp_upload_content", "Upload text or base64 content to a remote file"),
    ("ftp_download_file", "Download a remote file to a local path"),
    ("ftp_download_content", "Download a remote file into the response (size-limited)"),
    ("ftp_get_file_size", "Get the size of a remote file"),
    ("ftp_get_modification_time", "Get the modification time of a remote file"),
    ("ftp_set_passive_mode", "Switch between passive and active data connections"),
    ("ftp_send_noop", "Send a keep-alive NOOP"),
    ("ftp_get_system_info", "Report SYST, STAT, FEAT and the welcome banner"),
    ("ftp_transfer_progress", "Report data modes, server capabilities (FEAT) or status (STAT)"),
    ("ftp_create_directory_tree", "Create a directory and any missing parents"),
];

pub fn tool_catalog() -> Vec<ToolDescriptor> {
    CATALOG
        .iter()
        .map(|&(name, description)| ToolDescriptor { name, description })
        .collect()
}
