//! Unified test utilities for spliceio tests and benchmarks

use spliceio_config::EngineConfig;
use spliceio_engine::testing::Recorder;
use spliceio_engine::{IoEngine, SpliceEngine};
use spliceio_types::ChunkSize;
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use tempfile::TempDir;

/// Test data generation patterns
#[derive(Debug, Clone, Copy)]
pub enum TestDataPattern {
    /// All zeros
    Zeros,
    /// All ones
    Ones,
    /// Deterministic pseudo-random bytes
    Random,
    /// Repeating structured bytes
    Realistic,
}

/// Generate test data with specified pattern
///
/// Every pattern is deterministic so failures reproduce.
pub fn generate_test_data(size: usize, pattern: TestDataPattern) -> Vec<u8> {
    match pattern {
        TestDataPattern::Zeros => vec![0u8; size],
        TestDataPattern::Ones => vec![0xFFu8; size],
        TestDataPattern::Random => {
            let mut state: u32 = 0x1234_5678;
            (0..size)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 17;
                    state ^= state << 5;
                    (state >> 24) as u8
                })
                .collect()
        }
        TestDataPattern::Realistic => (0..size).map(|i| ((i * 7 + 13) % 256) as u8).collect(),
    }
}

/// Create a file in `temp_dir` holding `size` bytes of `pattern`
pub fn create_test_file(
    temp_dir: &TempDir,
    name: &str,
    size: usize,
    pattern: TestDataPattern,
) -> PathBuf {
    let file_path = temp_dir.path().join(name);
    let data = generate_test_data(size, pattern);
    fs::write(&file_path, data).expect("Failed to write test file");
    file_path
}

/// Open (creating if needed) a read-write scratch file in `temp_dir`
pub fn open_scratch(temp_dir: &TempDir, name: &str) -> File {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(temp_dir.path().join(name))
        .expect("Failed to open scratch file")
}

/// Engine configuration with the given chunk size
pub fn engine_config(chunk_size: usize) -> EngineConfig {
    EngineConfig {
        chunk_size: ChunkSize::new(chunk_size).expect("invalid chunk size"),
        ..EngineConfig::default()
    }
}

/// Initialised engine over the real kernel
pub fn kernel_engine(config: EngineConfig) -> SpliceEngine {
    let mut engine = SpliceEngine::new(config);
    engine.initialize().expect("Failed to initialise engine");
    engine
}

/// Initialised engine whose kernel calls are counted
pub fn recording_engine(config: EngineConfig) -> SpliceEngine<Recorder> {
    let mut engine = SpliceEngine::with_sys(config, Recorder::kernel());
    engine.initialize().expect("Failed to initialise engine");
    engine
}

/// Lengths around chunk boundaries worth round-tripping
pub fn boundary_lengths(chunk: usize) -> Vec<usize> {
    vec![1, chunk - 1, chunk, chunk + 1, 3 * chunk, 5 * chunk + 7]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_test_data_patterns() {
        let size = 1024;

        let zeros = generate_test_data(size, TestDataPattern::Zeros);
        assert_eq!(zeros.len(), size);
        assert!(zeros.iter().all(|&b| b == 0));

        let ones = generate_test_data(size, TestDataPattern::Ones);
        assert!(ones.iter().all(|&b| b == 0xFF));

        let random = generate_test_data(size, TestDataPattern::Random);
        assert_eq!(random, generate_test_data(size, TestDataPattern::Random));
        assert!(random.iter().any(|&b| b != random[0]));

        let realistic = generate_test_data(size, TestDataPattern::Realistic);
        assert_eq!(realistic.len(), size);
    }

    #[test]
    fn test_create_test_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = create_test_file(&temp_dir, "test.dat", 1024, TestDataPattern::Zeros);

        assert!(file_path.exists());
        assert_eq!(fs::metadata(&file_path).unwrap().len(), 1024);
    }

    #[test]
    fn test_boundary_lengths() {
        assert_eq!(
            boundary_lengths(4096),
            vec![1, 4095, 4096, 4097, 12288, 20487]
        );
    }
}
