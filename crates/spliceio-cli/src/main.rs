//! spliceio - drive the splice engine against a file
//!
//! A minimal host for the pipe-staged splice/vmsplice engine: it loads the layered
//! configuration, looks the engine up in a registry, opens the target file and prints the
//! completion of each request.

mod display;
mod json_output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use display::{display_completion, display_error, display_success, format_bytes};
use json_output::OperationJson;
use spliceio_config::{Config, ConfigLoader};
use spliceio_engine::{EngineRegistry, IoEngine, OwnedBuffer, TransferRequest, ENGINE_NAME};
use spliceio_types::Completion;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// spliceio - pipe-staged zero-copy file I/O
#[derive(Parser)]
#[command(
    name = "spliceio",
    version = env!("CARGO_PKG_VERSION"),
    about = "Pipe-staged zero-copy file I/O",
    long_about = "spliceio moves data between files and memory through a kernel pipe using\n\
                  splice(2) and vmsplice(2), falling back to a copying read when the kernel\n\
                  cannot vmsplice into user memory."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a deterministic byte pattern to a file
    Write {
        /// Target file, created if missing
        file: PathBuf,
        /// Bytes to write (accepts K, M and G suffixes)
        #[arg(short, long, value_parser = parse_size, default_value = "64K")]
        size: usize,
        /// Byte offset within the file
        #[arg(short, long, default_value = "0")]
        offset: u64,
        /// Seed for the byte pattern
        #[arg(long, default_value = "0")]
        pattern_seed: u64,
    },
    /// Read a byte range from a file
    Read {
        /// Source file
        file: PathBuf,
        /// Bytes to read (accepts K, M and G suffixes)
        #[arg(short, long, value_parser = parse_size, default_value = "64K")]
        size: usize,
        /// Byte offset within the file
        #[arg(short, long, default_value = "0")]
        offset: u64,
    },
    /// Write a pattern, read it back and compare
    Verify {
        /// Scratch file, created if missing
        file: PathBuf,
        /// Bytes to round-trip (accepts K, M and G suffixes)
        #[arg(short, long, value_parser = parse_size, default_value = "64K")]
        size: usize,
        /// Byte offset within the file
        #[arg(short, long, default_value = "0")]
        offset: u64,
        /// Seed for the byte pattern
        #[arg(long, default_value = "0")]
        pattern_seed: u64,
    },
    /// Flush a file to stable storage
    Sync {
        /// File to flush
        file: PathBuf,
    },
    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => ConfigLoader::load_default().context("failed to load configuration")?,
    };

    init_logging(&config, cli.debug, cli.json_logs)?;

    info!("spliceio v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Write {
            file,
            size,
            offset,
            pattern_seed,
        } => {
            let mut host = Host::start(&config)?;
            let result = write_command(&mut host, &file, size, offset, pattern_seed, cli.json);
            host.stop();
            result
        }
        Commands::Read { file, size, offset } => {
            let mut host = Host::start(&config)?;
            let result = read_command(&mut host, &file, size, offset, cli.json);
            host.stop();
            result
        }
        Commands::Verify {
            file,
            size,
            offset,
            pattern_seed,
        } => {
            let mut host = Host::start(&config)?;
            let result = verify_command(&mut host, &file, size, offset, pattern_seed, cli.json);
            host.stop();
            result
        }
        Commands::Sync { file } => {
            let mut host = Host::start(&config)?;
            let result = sync_command(&mut host, &file, cli.json);
            host.stop();
            result
        }
        Commands::Config { default } => config_command(&config, default),
    }
}

fn init_logging(config: &Config, debug: bool, json_logs: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("invalid log filter")?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    if json_logs || config.logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

/// Registry plus one initialised engine instance
struct Host {
    registry: EngineRegistry,
    engine: Box<dyn IoEngine + Send>,
}

impl Host {
    fn start(config: &Config) -> Result<Self> {
        let mut registry = EngineRegistry::new();
        spliceio_engine::register(&mut registry)?;

        let mut engine = registry.create(ENGINE_NAME, &config.engine)?;
        engine
            .initialize()
            .context("failed to initialise splice engine")?;
        debug!(
            engine = engine.name(),
            chunk_size = config.engine.chunk_size.get(),
            zero_copy = config.engine.zero_copy,
            "engine ready"
        );

        Ok(Self { registry, engine })
    }

    fn stop(mut self) {
        self.engine.cleanup();
        spliceio_engine::unregister(&mut self.registry);
    }
}

fn write_command(
    host: &mut Host,
    path: &Path,
    size: usize,
    offset: u64,
    seed: u64,
    json: bool,
) -> Result<()> {
    let file = open_for_write(path)?;
    let mut data = vec![0u8; size];
    fill_pattern(&mut data, seed);

    if !json {
        println!(
            "{} Writing {} to {} at offset {}",
            style("→").green().bold(),
            style(format_bytes(size as u64)).cyan(),
            style(path.display()).cyan(),
            offset
        );
    }

    let mut request = TransferRequest::write(&file, offset, OwnedBuffer::from(data));
    let completion = run(host, &mut request, "write", path, json)?;
    completion
        .into_result()
        .with_context(|| format!("write to {} failed", path.display()))?;
    Ok(())
}

fn read_command(host: &mut Host, path: &Path, size: usize, offset: u64, json: bool) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    if !json {
        println!(
            "{} Reading {} from {} at offset {}",
            style("←").green().bold(),
            style(format_bytes(size as u64)).cyan(),
            style(path.display()).cyan(),
            offset
        );
    }

    let mut request = TransferRequest::read(&file, offset, OwnedBuffer::new(size));
    let completion = run(host, &mut request, "read", path, json)?;
    host.engine.release_buffer(&mut request);
    completion
        .into_result()
        .with_context(|| format!("read from {} failed", path.display()))?;
    Ok(())
}

fn verify_command(
    host: &mut Host,
    path: &Path,
    size: usize,
    offset: u64,
    seed: u64,
    json: bool,
) -> Result<()> {
    let file = open_for_write(path)?;
    let mut expected = vec![0u8; size];
    fill_pattern(&mut expected, seed);

    let mut write = TransferRequest::write(&file, offset, OwnedBuffer::from(expected.clone()));
    let written = run(host, &mut write, "write", path, json)?
        .into_result()
        .with_context(|| format!("write to {} failed", path.display()))?;

    let mut read = TransferRequest::read(&file, offset, OwnedBuffer::new(size));
    let completion = run(host, &mut read, "read", path, json)?;
    let mismatch = first_mismatch(read.data(), &expected);
    host.engine.release_buffer(&mut read);
    let read_back = completion
        .into_result()
        .with_context(|| format!("read from {} failed", path.display()))?;

    if written != size || read_back != size {
        bail!(
            "short transfer: wrote {} and read {} of {} bytes",
            written,
            read_back,
            size
        );
    }
    if let Some(at) = mismatch {
        if !json {
            display_error(&format!("data differs at offset {}", offset + at as u64));
        }
        bail!("verification failed at offset {}", offset + at as u64);
    }

    if !json {
        display_success(&format!("{} verified", format_bytes(size as u64)));
    }
    Ok(())
}

fn sync_command(host: &mut Host, path: &Path, json: bool) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    let mut request = TransferRequest::sync(&file);
    let completion = run(host, &mut request, "sync", path, json)?;
    completion
        .into_result()
        .with_context(|| format!("sync of {} failed", path.display()))?;
    Ok(())
}

fn config_command(config: &Config, default: bool) -> Result<()> {
    let shown = if default {
        println!("{} Default configuration:", style("⚙").blue().bold());
        Config::default()
    } else {
        println!("{} Current configuration:", style("⚙").blue().bold());
        if let Some(path) = ConfigLoader::config_exists() {
            println!("# loaded from {}", path.display());
        }
        config.clone()
    };

    print!("{}", serde_yaml::to_string(&shown)?);
    Ok(())
}

/// Submit one request and report its completion
fn run(
    host: &mut Host,
    request: &mut TransferRequest<'_>,
    operation: &str,
    path: &Path,
    json: bool,
) -> Result<Completion> {
    let offset = request.offset();
    let started = Instant::now();
    let completion = host.engine.submit(request);
    let elapsed = started.elapsed();

    if json {
        let output = OperationJson::new(
            host.engine.name(),
            operation,
            path,
            offset,
            &completion,
            elapsed,
        );
        println!("{}", output.to_json_pretty()?);
    } else {
        display_completion(operation, &completion, elapsed);
    }

    Ok(completion)
}

fn open_for_write(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))
}

/// Fill `buf` with the xorshift64* stream for `seed`
fn fill_pattern(buf: &mut [u8], seed: u64) {
    let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
    if state == 0 {
        state = 1;
    }

    for chunk in buf.chunks_mut(8) {
        state ^= state >> 12;
        state ^= state << 25;
        state ^= state >> 27;
        let word = state.wrapping_mul(0x2545_F491_4F6C_DD1D).to_le_bytes();
        chunk.copy_from_slice(&word[..chunk.len()]);
    }
}

fn first_mismatch(actual: &[u8], expected: &[u8]) -> Option<usize> {
    actual
        .iter()
        .zip(expected)
        .position(|(a, e)| a != e)
        .or_else(|| (actual.len() != expected.len()).then_some(actual.len().min(expected.len())))
}

/// Parse a byte count with an optional binary K, M or G suffix
fn parse_size(input: &str) -> std::result::Result<usize, String> {
    let input = input.trim();
    let (digits, multiplier) = match input.char_indices().last() {
        Some((at, 'k' | 'K')) => (&input[..at], 1usize << 10),
        Some((at, 'm' | 'M')) => (&input[..at], 1 << 20),
        Some((at, 'g' | 'G')) => (&input[..at], 1 << 30),
        _ => (input, 1),
    };

    let count: usize = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid size '{input}'"))?;
    count
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size '{input}' is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Read;

    #[rstest]
    #[case("0", 0)]
    #[case("4096", 4096)]
    #[case("64K", 64 * 1024)]
    #[case("2m", 2 * 1024 * 1024)]
    #[case(" 1G ", 1024 * 1024 * 1024)]
    fn test_parse_size(#[case] input: &str, #[case] expected: usize) {
        assert_eq!(parse_size(input), Ok(expected));
    }

    #[rstest]
    #[case("")]
    #[case("K")]
    #[case("12Q")]
    #[case("-1")]
    fn test_parse_size_rejects(#[case] input: &str) {
        assert!(parse_size(input).is_err());
    }

    #[test]
    fn test_pattern_is_deterministic() {
        let mut a = vec![0u8; 1001];
        let mut b = vec![0u8; 1001];
        fill_pattern(&mut a, 7);
        fill_pattern(&mut b, 7);
        assert_eq!(a, b);

        fill_pattern(&mut b, 8);
        assert_ne!(a, b);
    }

    #[test]
    fn test_first_mismatch() {
        assert_eq!(first_mismatch(b"abc", b"abc"), None);
        assert_eq!(first_mismatch(b"abd", b"abc"), Some(2));
        assert_eq!(first_mismatch(b"ab", b"abc"), Some(2));
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "spliceio", "read", "data.bin", "--size", "8K", "--offset", "512", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Read { size, offset, .. } => {
                assert_eq!(size, 8192);
                assert_eq!(offset, 512);
            }
            _ => panic!("expected read command"),
        }
    }

    #[test]
    fn test_verify_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verify.bin");
        let config = Config::default();

        let mut host = Host::start(&config).unwrap();
        verify_command(&mut host, &path, 100_000, 4096, 3, true).unwrap();
        sync_command(&mut host, &path, true).unwrap();
        host.stop();

        let mut contents = Vec::new();
        File::open(&path)
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        let mut expected = vec![0u8; 100_000];
        fill_pattern(&mut expected, 3);
        assert_eq!(&contents[4096..], &expected[..]);
    }
}
