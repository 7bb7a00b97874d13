//! Result type alias for spliceio operations

use crate::Error;

/// Result type alias for spliceio operations
pub type Result<T> = std::result::Result<T, Error>;
