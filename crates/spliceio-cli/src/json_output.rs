//! JSON output structures for the spliceio CLI

use serde::{Deserialize, Serialize};
use spliceio_types::{Completion, TransferPath};
use std::path::Path;
use std::time::Duration;

/// Complete JSON output for one engine operation
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationJson {
    /// Operation metadata
    pub metadata: OperationMetadata,
    /// Engine completion
    pub completion: CompletionJson,
    /// Overall result
    pub result: OperationResult,
}

/// Operation metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationMetadata {
    /// spliceio version
    pub version: String,
    /// Engine name
    pub engine: String,
    /// Operation type
    pub operation: String,
    /// Target file
    pub path: String,
    /// Byte offset within the file
    pub offset: u64,
}

/// Completion record in JSON format
#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionJson {
    /// Path that executed the request
    pub path: PathJson,
    /// Bytes requested
    pub requested: usize,
    /// Bytes transferred
    pub transferred: usize,
    /// Bytes short of the request
    pub residual: usize,
    /// Raw OS error number on failure
    pub errno: Option<i32>,
    /// Diagnostic label on failure
    pub context: Option<String>,
    /// Wall-clock time in seconds
    pub duration_seconds: f64,
    /// Transfer rate in MB/s
    pub transfer_rate_mbps: f64,
}

/// Transfer path in JSON format
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathJson {
    ZeroCopyRead,
    CopyRead,
    StagedWrite,
    Sync,
    None,
}

impl From<TransferPath> for PathJson {
    fn from(path: TransferPath) -> Self {
        match path {
            TransferPath::ZeroCopyRead => PathJson::ZeroCopyRead,
            TransferPath::CopyRead => PathJson::CopyRead,
            TransferPath::StagedWrite => PathJson::StagedWrite,
            TransferPath::Sync => PathJson::Sync,
            TransferPath::None => PathJson::None,
        }
    }
}

/// Overall operation result
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationResult {
    /// Whether the operation was successful
    pub success: bool,
    /// Result message
    pub message: String,
}

impl OperationJson {
    /// Create a new OperationJson from a completion
    pub fn new(
        engine: &str,
        operation: &str,
        path: &Path,
        offset: u64,
        completion: &Completion,
        elapsed: Duration,
    ) -> Self {
        let seconds = elapsed.as_secs_f64();
        let transfer_rate_mbps = if seconds > 0.0 {
            completion.transferred as f64 / seconds / 1024.0 / 1024.0
        } else {
            0.0
        };

        let message = match completion.error {
            Some(error) => format!("{} failed: {}", operation, error.to_io_error()),
            None if completion.residual > 0 => format!(
                "{} completed short by {} bytes",
                operation, completion.residual
            ),
            None => format!("{} completed", operation),
        };

        Self {
            metadata: OperationMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                engine: engine.to_string(),
                operation: operation.to_string(),
                path: path.display().to_string(),
                offset,
            },
            completion: CompletionJson {
                path: completion.path.into(),
                requested: completion.requested,
                transferred: completion.transferred,
                residual: completion.residual,
                errno: completion.error.map(|e| e.errno),
                context: completion.error.map(|e| e.context.to_string()),
                duration_seconds: seconds,
                transfer_rate_mbps,
            },
            result: OperationResult {
                success: completion.is_success(),
                message,
            },
        }
    }

    /// Convert to pretty-printed JSON string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
