//! Core data types for spliceio
//!
//! Transfer directions, completion records and engine capability flags shared between the
//! engine and its hosts.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::TransferError;

/// Byte offset within a file
pub type FileOffset = u64;

/// Direction of a transfer request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, serde::Deserialize))]
pub enum Direction {
    /// File to buffer
    Read,
    /// Buffer to file
    Write,
    /// Flush file data to stable storage
    Sync,
}

/// Which transfer path produced a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum TransferPath {
    /// File → pipe → user memory without a user-space copy
    ZeroCopyRead,
    /// File → pipe → explicit `read` into the caller's buffer
    CopyRead,
    /// User memory → pipe → file
    StagedWrite,
    /// Delegated to `fsync`
    Sync,
    /// Nothing was issued (zero-length or refused request)
    None,
}

impl TransferPath {
    /// Whether this path may leave the buffer pipe-backed
    pub fn is_pipe_backed(self) -> bool {
        matches!(self, Self::ZeroCopyRead)
    }
}

/// Outcome of one submitted request
///
/// Completions are always final: an engine never returns a pending status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Completion {
    /// Path that executed the request
    pub path: TransferPath,
    /// Bytes requested
    pub requested: usize,
    /// Bytes actually transferred
    pub transferred: usize,
    /// `requested - transferred`, meaningful only when `error` is `None`
    pub residual: usize,
    /// Failure record for fatal errors
    pub error: Option<TransferError>,
}

impl Completion {
    /// Successful completion of `transferred` out of `requested` bytes
    pub fn success(path: TransferPath, requested: usize, transferred: usize) -> Self {
        Self {
            path,
            requested,
            transferred,
            residual: requested.saturating_sub(transferred),
            error: None,
        }
    }

    /// Failed completion carrying `errno`
    pub fn failure(path: TransferPath, requested: usize, errno: i32) -> Self {
        Self {
            path,
            requested,
            transferred: 0,
            residual: 0,
            error: Some(TransferError::xfer(errno)),
        }
    }

    /// Whether the request completed without a fatal error
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the request completed short of its requested length
    pub fn is_partial(&self) -> bool {
        self.is_success() && self.residual > 0
    }

    /// Convert into a `Result`, yielding the transferred byte count on success
    pub fn into_result(self) -> Result<usize, TransferError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.transferred),
        }
    }
}

/// Capability flags an engine advertises to its host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, serde::Deserialize))]
pub struct EngineFlags {
    /// Every submission blocks until complete; the host must not expect async progress
    pub sync_io: bool,
}

impl EngineFlags {
    /// Strictly synchronous engine
    pub const SYNC_IO: Self = Self { sync_io: true };
}
