//! Wire types for the request/response bridge between a running sandboxed
//! script and the host capabilities (filesystem, network, sub-shell).
//!
//! The embedded engine is single-threaded and every bridge call blocks the
//! script until the host responds, so this module does not need to model
//! the original design's raw shared-memory header/path-buffer/data-buffer
//! layout byte-for-byte: a plain enum carries the same information across
//! the same synchronous boundary. `BridgeOp` still lines up one-to-one with
//! the operation set the policy has to reason about.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One bridge call a sandboxed script can make back into the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeOp {
    ReadFile { path: String },
    WriteFile { path: String, data: Vec<u8> },
    AppendFile { path: String, data: Vec<u8> },
    Stat { path: String },
    Lstat { path: String },
    Readdir { path: String },
    Mkdir { path: String, recursive: bool },
    Rm { path: String, recursive: bool, force: bool },
    Exists { path: String },
    Symlink { target: String, link_path: String },
    Readlink { path: String },
    Chmod { path: String, mode: u32 },
    Realpath { path: String },
    Rename { from: String, to: String },
    CopyFile { from: String, to: String },
    WriteStdout { data: String },
    WriteStderr { data: String },
    Exit { code: i32 },
    HttpRequest {
        url: String,
        method: String,
        headers: HashMap<String, String>,
        body: Option<String>,
    },
    ExecCommand { command: String, stdin: Option<String> },
}

/// Result of a stat/lstat call, mirrored into the JS side as a plain object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatResult {
    pub is_file: bool,
    pub is_directory: bool,
    pub is_symlink: bool,
    pub size: u64,
    pub mode: u32,
    pub mtime_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeError {
    None,
    NotFound,
    IsDirectory,
    NotDirectory,
    Exists,
    PermissionDenied,
    InvalidPath,
    IoError,
    Timeout,
    NetworkError,
    NetworkNotConfigured,
}

impl BridgeError {
    pub fn from_fs_error(e: &crate::fs::FsError) -> Self {
        use crate::fs::FsError;
        match e {
            FsError::NotFound { .. } => BridgeError::NotFound,
            FsError::IsDirectory { .. } => BridgeError::IsDirectory,
            FsError::NotDirectory { .. } => BridgeError::NotDirectory,
            FsError::AlreadyExists { .. } => BridgeError::Exists,
            FsError::PermissionDenied { .. } | FsError::ReadOnly { .. } => BridgeError::PermissionDenied,
            FsError::InvalidArgument { .. } | FsError::SymlinkLoop { .. } => BridgeError::InvalidPath,
            FsError::NotEmpty { .. } | FsError::Other { .. } => BridgeError::IoError,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub seq: u64,
    pub op: BridgeOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub seq: u64,
    pub error: BridgeError,
    pub data: Option<serde_json::Value>,
}

impl BridgeResponse {
    pub fn ok(seq: u64, data: serde_json::Value) -> Self {
        Self { seq, error: BridgeError::None, data: Some(data) }
    }

    pub fn err(seq: u64, error: BridgeError) -> Self {
        Self { seq, error, data: None }
    }
}
