//! Staging pipe owned by one engine instance

use crate::sys::SpliceSys;
use spliceio_types::{Error, Result};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use tracing::debug;

const DRAIN_SCRATCH: usize = 4096;

/// Both ends of the instance's kernel pipe
///
/// Dropping the pair closes both descriptors.
#[derive(Debug)]
pub struct PipePair {
    read: OwnedFd,
    write: OwnedFd,
}

impl PipePair {
    /// Allocate a new pipe
    pub fn open<S: SpliceSys>(sys: &S) -> Result<Self> {
        let (read, write) = sys.pipe().map_err(|errno| Error::pipe(errno as i32))?;
        Ok(Self { read, write })
    }

    /// End the kernel moves data out of
    pub fn read_end(&self) -> BorrowedFd<'_> {
        self.read.as_fd()
    }

    /// End the kernel moves data into
    pub fn write_end(&self) -> BorrowedFd<'_> {
        self.write.as_fd()
    }

    /// Discard up to `pending` staged bytes left behind by an aborted transfer
    ///
    /// Best-effort; returns the number of bytes discarded.
    pub(crate) fn drain<S: SpliceSys>(&self, sys: &S, pending: usize) -> usize {
        let mut scratch = [0u8; DRAIN_SCRATCH];
        let mut drained = 0;

        while drained < pending {
            let want = (pending - drained).min(DRAIN_SCRATCH);
            match sys.read(self.read_end(), &mut scratch[..want]) {
                Ok(0) => break,
                Ok(n) => drained += n,
                Err(nix::errno::Errno::EINTR) => continue,
                Err(errno) => {
                    debug!(%errno, pending, drained, "pipe drain stopped early");
                    break;
                }
            }
        }

        drained
    }
}
