//! Core type system and error handling for spliceio
//!
//! This crate provides the foundational types shared by the splice engine, its configuration
//! layer and its hosts:
//!
//! - **Error handling**: Structured errors with severity levels, plus the errno record attached
//!   to failed transfers
//! - **Core types**: Transfer directions, completions and engine flags
//! - **Configuration**: Validated configuration primitives
//!
//! # Features
//!
//! - `std` (default): Enable standard library features
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use spliceio_types::{Completion, TransferPath};
//!
//! let completion = Completion::success(TransferPath::CopyRead, 8192, 8192);
//! assert!(completion.is_success());
//! assert_eq!(completion.residual, 0);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use config::{CapabilityScope, ChunkSize};
pub use error::{Error, ErrorKind, ErrorSeverity, TransferError};
pub use result::Result;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_accounting() {
        let completion = Completion::success(TransferPath::ZeroCopyRead, 1000, 1000);
        assert_eq!(completion.transferred + completion.residual, 1000);
    }

    #[test]
    fn test_error_severity() {
        let io_error = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "test"));
        assert_eq!(io_error.severity(), ErrorSeverity::Medium);

        let config_error = Error::config("invalid config");
        assert_eq!(config_error.severity(), ErrorSeverity::High);
        assert!(!config_error.is_recoverable());
    }

    #[test]
    fn test_chunk_size_validation() {
        assert!(ChunkSize::new(4096).is_ok());
        assert!(ChunkSize::new(8192).is_ok());
        assert!(ChunkSize::new(1024).is_err()); // Too small
        assert!(ChunkSize::new(5000).is_err()); // Not power of two
    }
}
