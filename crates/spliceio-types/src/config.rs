//! Configuration types for spliceio
//!
//! This module provides validated configuration primitives shared by the engine and the
//! configuration loader.

/// Per-call ceiling for a single file-to-pipe move
///
/// Must be a power of two between [`ChunkSize::MIN`] and [`ChunkSize::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "usize", into = "usize")
)]
pub struct ChunkSize(usize);

impl ChunkSize {
    /// Minimum chunk size (one page)
    pub const MIN: usize = 4 * 1024;
    /// Maximum chunk size (1MB)
    pub const MAX: usize = 1024 * 1024;
    /// Default chunk size (64KB, the default pipe capacity)
    pub const DEFAULT: usize = 64 * 1024;

    /// Create a new chunk size with validation
    pub fn new(size: usize) -> Result<Self, String> {
        if size < Self::MIN {
            Err(format!("Chunk size {} is below minimum {}", size, Self::MIN))
        } else if size > Self::MAX {
            Err(format!("Chunk size {} exceeds maximum {}", size, Self::MAX))
        } else if !size.is_power_of_two() {
            Err(format!("Chunk size {} must be a power of two", size))
        } else {
            Ok(Self(size))
        }
    }

    /// Get the chunk size value
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<usize> for ChunkSize {
    type Error = String;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        Self::new(size)
    }
}

impl From<ChunkSize> for usize {
    fn from(size: ChunkSize) -> Self {
        size.get()
    }
}

/// Where a detected lack of zero-copy-to-user support is remembered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum CapabilityScope {
    /// Each engine instance probes and records on its own
    #[default]
    Instance,
    /// The first instance to observe the loss records it for the whole process
    Process,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(4096, true)]
    #[case(65536, true)]
    #[case(1024 * 1024, true)]
    #[case(1024, false)]
    #[case(5000, false)]
    #[case(2 * 1024 * 1024, false)]
    fn test_chunk_size_validation(#[case] size: usize, #[case] valid: bool) {
        assert_eq!(ChunkSize::new(size).is_ok(), valid);
    }

    #[test]
    fn test_chunk_size_default() {
        assert_eq!(ChunkSize::default().get(), 64 * 1024);
        assert_eq!(usize::from(ChunkSize::default()), ChunkSize::DEFAULT);
    }

    #[test]
    fn test_capability_scope_default() {
        assert_eq!(CapabilityScope::default(), CapabilityScope::Instance);
    }
}
