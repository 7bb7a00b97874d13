//! Error types and handling for spliceio
//!
//! Two layers live here. [`Error`] is the structured error returned by fallible setup and
//! management operations (pipe allocation, configuration, registry). [`TransferError`] is the
//! record attached to a failed transfer completion: a raw errno plus a short diagnostic label.

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Low severity - operation can continue
    Low,
    /// Medium severity - operation may be retried by the host
    Medium,
    /// High severity - the engine instance is unusable
    High,
    /// Critical severity - entire process should be terminated
    Critical,
}

/// Main error type for spliceio operations
#[derive(thiserror::Error, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// Staging pipe could not be created or configured
    #[error("pipe: os error {errno}")]
    Pipe {
        /// Raw OS error number
        errno: i32,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Engine registry error
    #[error("Registry error: {message}")]
    Registry {
        /// Error message describing the registry issue
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O related errors
    Io,
    /// Pipe allocation errors
    Pipe,
    /// Configuration errors
    Config,
    /// Registry errors
    Registry,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::Pipe { .. } => ErrorKind::Pipe,
            Self::Config { .. } => ErrorKind::Config,
            Self::Registry { .. } => ErrorKind::Registry,
        }
    }

    /// Get the error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Io { .. } => ErrorSeverity::Medium,
            Self::Pipe { .. } => ErrorSeverity::High,
            Self::Config { .. } => ErrorSeverity::High,
            Self::Registry { .. } => ErrorSeverity::High,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io { message } => {
                message.contains("Interrupted")
                    || message.contains("would block")
                    || message.contains("temporarily unavailable")
            }
            Self::Pipe { errno } => *errno == EMFILE || *errno == ENFILE,
            Self::Config { .. } | Self::Registry { .. } => false,
        }
    }

    /// Raw OS error number carried by this error, if any
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Pipe { errno } => Some(*errno),
            _ => None,
        }
    }

    /// Create a new pipe error from a raw OS error number
    pub fn pipe(errno: i32) -> Self {
        Self::Pipe { errno }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new registry error
    pub fn registry<S: Into<String>>(message: S) -> Self {
        Self::Registry {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

// Descriptor exhaustion is the only pipe failure worth retrying later.
const EMFILE: i32 = 24;
const ENFILE: i32 = 23;

/// Failure record attached to a transfer completion
///
/// `errno` is the raw OS error number of the failing kernel call and `context` a short label
/// for diagnostics (`"xfer"` for transfers).
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[error("{context}: os error {errno}")]
pub struct TransferError {
    /// Raw OS error number
    pub errno: i32,
    /// Diagnostic label
    pub context: &'static str,
}

impl TransferError {
    /// Label attached to every failed transfer
    pub const XFER: &'static str = "xfer";

    /// Create a transfer failure record for `errno`
    pub fn xfer(errno: i32) -> Self {
        Self {
            errno,
            context: Self::XFER,
        }
    }

    /// Convert into a standard I/O error for display or propagation
    pub fn to_io_error(self) -> std::io::Error {
        std::io::Error::from_raw_os_error(self.errno)
    }
}

impl From<TransferError> for Error {
    fn from(error: TransferError) -> Self {
        Self::Io {
            message: format!("{}: {}", error.context, error.to_io_error()),
        }
    }
}
