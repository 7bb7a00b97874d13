//! Pipe-staged writes

use crate::error::XferError;
use crate::pipe::PipePair;
use crate::sys::{SpliceSys, SPLICE_F_NONBLOCK};
use nix::errno::Errno;
use std::os::fd::BorrowedFd;
use tracing::trace;

/// Write `data` to `file` at `offset` through the pipe
///
/// Returns the bytes written; fewer than `data.len()` only if the file stops accepting data.
pub(crate) fn staged<S: SpliceSys>(
    sys: &S,
    pipe: &PipePair,
    file: BorrowedFd<'_>,
    mut offset: libc::loff_t,
    data: &[u8],
) -> Result<usize, XferError> {
    let mut done = 0;

    while done < data.len() {
        match sys.wait_writable(pipe.write_end()) {
            Ok(()) => {}
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(XferError::Os(errno)),
        }

        let staged = match sys.vmsplice_to_pipe(pipe.write_end(), &data[done..], SPLICE_F_NONBLOCK)
        {
            Ok(0) => return Err(XferError::NoData),
            Ok(staged) => staged,
            Err(Errno::EAGAIN | Errno::EINTR) => continue,
            Err(errno) => return Err(XferError::Os(errno)),
        };

        let mut flushed = 0;
        while flushed < staged {
            match sys.splice(
                pipe.read_end(),
                None,
                file,
                Some(&mut offset),
                staged - flushed,
                0,
            ) {
                Ok(0) => {
                    pipe.drain(sys, staged - flushed);
                    trace!(written = done + flushed, "file accepted no more data");
                    return Ok(done + flushed);
                }
                Ok(n) => flushed += n,
                Err(Errno::EINTR) => continue,
                Err(errno) => {
                    pipe.drain(sys, staged - flushed);
                    return Err(XferError::Os(errno));
                }
            }
        }

        done += staged;
    }

    Ok(done)
}
