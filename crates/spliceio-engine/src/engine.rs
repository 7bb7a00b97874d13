//! Splice engine and the host-facing engine trait

use crate::buffer::{OwnedBuffer, PipeBackedBuffer};
use crate::capability::Capability;
use crate::error::XferError;
use crate::pipe::PipePair;
use crate::read;
use crate::request::TransferRequest;
use crate::sys::{KernelSplice, SpliceSys, SPLICE_F_NONBLOCK, SPLICE_F_UNMAP};
use crate::write;
use spliceio_config::EngineConfig;
use spliceio_types::{Completion, Direction, EngineFlags, Result, TransferPath};
use std::os::fd::AsFd;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Name the splice engine registers under
pub const ENGINE_NAME: &str = "splice";

/// Operations a host drives an I/O engine through
///
/// Every method runs to completion on the calling thread.
pub trait IoEngine {
    /// Registry name
    fn name(&self) -> &'static str;

    /// Capabilities advertised to the host scheduler
    fn flags(&self) -> EngineFlags;

    /// Acquire per-instance kernel resources
    ///
    /// No other operation is valid until this succeeds.
    fn initialize(&mut self) -> Result<()>;

    /// Execute one request and report its outcome
    ///
    /// The outcome is also recorded on the request.
    fn submit(&mut self, request: &mut TransferRequest<'_>) -> Completion;

    /// Hand a pipe-backed result back to the kernel and restore an owned buffer
    ///
    /// A no-op when the request's buffer is already owned.
    fn release_buffer(&mut self, request: &mut TransferRequest<'_>);

    /// Release per-instance kernel resources; idempotent
    fn cleanup(&mut self);
}

/// Splice engine statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpliceStats {
    /// Reads completed without a user-space copy
    pub zero_copy_reads: u64,
    /// Reads completed through the copying path
    pub copy_reads: u64,
    /// Writes completed
    pub writes: u64,
    /// Syncs completed
    pub syncs: u64,
    /// Bytes delivered by reads
    pub bytes_read: u64,
    /// Bytes delivered by writes
    pub bytes_written: u64,
    /// Requests that completed with an error
    pub failures: u64,
    /// Times this instance gave up on zero-copy reads
    pub capability_downgrades: u64,
    /// Pipe-backed buffers returned through release
    pub releases: u64,
}

impl SpliceStats {
    /// Share of read bytes that avoided a user-space copy
    pub fn zero_copy_ratio(&self) -> f64 {
        let reads = self.zero_copy_reads + self.copy_reads;
        if reads == 0 {
            0.0
        } else {
            self.zero_copy_reads as f64 / reads as f64
        }
    }

    fn record(&mut self, completion: &Completion) {
        if !completion.is_success() {
            self.failures += 1;
            return;
        }

        let bytes = completion.transferred as u64;
        match completion.path {
            TransferPath::ZeroCopyRead => {
                self.zero_copy_reads += 1;
                self.bytes_read += bytes;
            }
            TransferPath::CopyRead => {
                self.copy_reads += 1;
                self.bytes_read += bytes;
            }
            TransferPath::StagedWrite => {
                self.writes += 1;
                self.bytes_written += bytes;
            }
            TransferPath::Sync => self.syncs += 1,
            TransferPath::None => {}
        }
    }
}

/// Pipe-staged splice/vmsplice engine
///
/// One instance per worker: the pipe pair is private and every call takes `&mut self`.
#[derive(Debug)]
pub struct SpliceEngine<S: SpliceSys = KernelSplice> {
    config: EngineConfig,
    sys: S,
    pipe: Option<PipePair>,
    capability: Capability,
    stats: SpliceStats,
}

impl SpliceEngine {
    /// Create an uninitialised engine issuing real syscalls
    pub fn new(config: EngineConfig) -> Self {
        Self::with_sys(config, KernelSplice)
    }
}

impl<S: SpliceSys> SpliceEngine<S> {
    /// Create an uninitialised engine over a custom kernel layer
    pub fn with_sys(config: EngineConfig, sys: S) -> Self {
        let capability = Capability::new(config.zero_copy, config.capability_scope);
        Self {
            config,
            sys,
            pipe: None,
            capability,
            stats: SpliceStats::default(),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Kernel layer
    pub fn sys(&self) -> &S {
        &self.sys
    }

    /// Zero-copy read capability
    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    /// Accumulated statistics
    pub fn stats(&self) -> &SpliceStats {
        &self.stats
    }

    /// Reset accumulated statistics
    pub fn reset_stats(&mut self) {
        self.stats = SpliceStats::default();
    }

    /// Whether the pipe pair is allocated
    pub fn is_initialized(&self) -> bool {
        self.pipe.is_some()
    }

    /// Return a detached pipe-backed buffer to the kernel
    pub fn release(&mut self, mut buffer: PipeBackedBuffer) -> OwnedBuffer {
        unmap(&self.sys, self.pipe.as_ref(), buffer.region_mut());
        self.stats.releases += 1;
        buffer.into_owned()
    }

    fn dispatch(&mut self, request: &mut TransferRequest<'_>) -> Completion {
        let requested = request.length();

        let Some(pipe) = self.pipe.as_ref() else {
            warn!(direction = ?request.direction(), "submit on uninitialised engine");
            return Completion::failure(TransferPath::None, requested, libc::EBADF);
        };

        if request.direction() == Direction::Sync {
            return match self.sys.fsync(request.file()) {
                Ok(()) => Completion::success(TransferPath::Sync, 0, 0),
                Err(errno) => Completion::failure(TransferPath::Sync, 0, errno as i32),
            };
        }

        if request.needs_release() {
            warn!("request still holds a pipe-backed buffer; release it before reuse");
            return Completion::failure(TransferPath::None, requested, libc::EBUSY);
        }

        if requested == 0 {
            return Completion::success(TransferPath::None, 0, 0);
        }

        let Ok(offset) = libc::loff_t::try_from(request.offset()) else {
            return Completion::failure(TransferPath::None, requested, libc::EOVERFLOW);
        };

        let file = request.file();
        let chunk = self.config.chunk_size.get();

        if request.direction() == Direction::Write {
            let Some(data) = request.buffer().as_owned() else {
                return Completion::failure(TransferPath::None, requested, libc::EBUSY);
            };
            return match write::staged(&self.sys, pipe, file.as_fd(), offset, data.as_slice()) {
                Ok(n) => Completion::success(TransferPath::StagedWrite, requested, n),
                Err(err) => Completion::failure(TransferPath::StagedWrite, requested, err.errno()),
            };
        }

        let Some(buf) = request.buffer_mut() else {
            return Completion::failure(TransferPath::None, requested, libc::EBUSY);
        };

        if self.capability.is_capable() {
            match read::zero_copy(&self.sys, pipe, file.as_fd(), offset, buf, chunk) {
                Ok(0) => return Completion::success(TransferPath::ZeroCopyRead, requested, 0),
                Ok(n) => {
                    request.slot_mut().mark_pipe_backed(n);
                    return Completion::success(TransferPath::ZeroCopyRead, requested, n);
                }
                Err(XferError::NotSupported(errno)) => {
                    if self.capability.mark_incapable() {
                        self.stats.capability_downgrades += 1;
                        warn!(
                            %errno,
                            scope = ?self.capability.scope(),
                            "vmsplice into user memory unsupported, falling back to copying reads"
                        );
                    }
                }
                Err(err) => {
                    return Completion::failure(TransferPath::ZeroCopyRead, requested, err.errno())
                }
            }
        }

        let Some(buf) = request.buffer_mut() else {
            return Completion::failure(TransferPath::None, requested, libc::EBUSY);
        };
        match read::copy(&self.sys, pipe, file.as_fd(), offset, buf, chunk) {
            Ok(n) => Completion::success(TransferPath::CopyRead, requested, n),
            Err(err) => Completion::failure(TransferPath::CopyRead, requested, err.errno()),
        }
    }
}

impl<S: SpliceSys> IoEngine for SpliceEngine<S> {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn flags(&self) -> EngineFlags {
        EngineFlags::SYNC_IO
    }

    fn initialize(&mut self) -> Result<()> {
        if self.pipe.is_some() {
            debug!("engine already initialised");
            return Ok(());
        }

        self.pipe = Some(PipePair::open(&self.sys)?);
        self.capability = Capability::new(self.config.zero_copy, self.config.capability_scope);
        debug!(
            chunk_size = self.config.chunk_size.get(),
            capable = self.capability.is_capable(),
            "splice engine initialised"
        );
        Ok(())
    }

    fn submit(&mut self, request: &mut TransferRequest<'_>) -> Completion {
        let completion = self.dispatch(request);
        debug!(
            direction = ?request.direction(),
            offset = request.offset(),
            path = ?completion.path,
            requested = completion.requested,
            transferred = completion.transferred,
            errno = completion.error.map(|e| e.errno),
            "request completed"
        );
        request.record(&completion);
        self.stats.record(&completion);
        completion
    }

    fn release_buffer(&mut self, request: &mut TransferRequest<'_>) {
        let sys = &self.sys;
        let pipe = self.pipe.as_ref();
        if request
            .slot_mut()
            .release_with(|region| unmap(sys, pipe, region))
        {
            self.stats.releases += 1;
        }
    }

    fn cleanup(&mut self) {
        if self.pipe.take().is_some() {
            debug!("splice engine pipe closed");
        }
    }
}

/// Best-effort return of pipe pages backing `region`
fn unmap<S: SpliceSys>(sys: &S, pipe: Option<&PipePair>, region: &mut [u8]) {
    let Some(pipe) = pipe else {
        debug!(len = region.len(), "pipe already closed; nothing to unmap");
        return;
    };
    if region.is_empty() {
        return;
    }

    match sys.vmsplice_from_pipe(pipe.read_end(), region, SPLICE_F_UNMAP | SPLICE_F_NONBLOCK) {
        Ok(n) => debug!(len = region.len(), returned = n, "released pipe-backed buffer"),
        Err(errno) => debug!(%errno, len = region.len(), "kernel ignored unmap directive"),
    }
}
