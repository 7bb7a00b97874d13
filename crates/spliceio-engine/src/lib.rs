//! Pipe-staged zero-copy file I/O for spliceio
//!
//! This crate moves data between regular files and caller memory through a private kernel pipe
//! instead of copying it through user space. It includes:
//!
//! - **Zero-copy reads**: `splice` file → pipe, then `vmsplice` pipe → caller memory
//! - **Copying fallback**: the same staging followed by a plain `read`, used permanently once the
//!   kernel refuses `vmsplice` into user memory
//! - **Staged writes**: `vmsplice` caller memory → pipe, then `splice` pipe → file
//! - **Buffer ownership**: pipe-backed read results must go back through the engine's release
//!   operation before the memory is owned again
//! - **Engine registry**: explicit registration with a host-owned table
//!
//! # Features
//!
//! - `serde`: Enable serialization support for statistics
//! - `testing`: Expose the call-recording kernel layer used by integration tests
//!
//! # Platform Support
//!
//! Linux only; `splice(2)` and `vmsplice(2)` have no equivalent elsewhere.
//!
//! # Examples
//!
//! ```rust,no_run
//! use spliceio_config::EngineConfig;
//! use spliceio_engine::{IoEngine, OwnedBuffer, SpliceEngine, TransferRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = std::fs::File::open("data.bin")?;
//! let mut engine = SpliceEngine::new(EngineConfig::default());
//! engine.initialize()?;
//!
//! let mut request = TransferRequest::read(&file, 0, OwnedBuffer::new(4096));
//! let completion = engine.submit(&mut request);
//! println!("read {} bytes via {:?}", completion.transferred, completion.path);
//!
//! engine.release_buffer(&mut request);
//! engine.cleanup();
//! # Ok(())
//! # }
//! ```

#![cfg(target_os = "linux")]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod capability;
pub mod engine;
pub mod error;
pub mod pipe;
pub mod registry;
pub mod request;
pub mod sys;

mod read;
mod write;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types
pub use buffer::{OwnedBuffer, PipeBackedBuffer, XferBuffer};
pub use capability::{Capability, CapabilityState};
pub use engine::{IoEngine, SpliceEngine, SpliceStats, ENGINE_NAME};
pub use error::XferError;
pub use pipe::PipePair;
pub use registry::{descriptor, register, unregister, EngineDescriptor, EngineFactory, EngineRegistry};
pub use request::TransferRequest;
pub use sys::{KernelSplice, SpliceSys};
