//! Pipe-staged reads
//!
//! Both variants stage each chunk with `splice(file → pipe)`. The zero-copy variant then
//! vmsplices the pipe into the caller's memory; the copying variant `read`s it.

use crate::error::{is_transient, XferError};
use crate::pipe::PipePair;
use crate::sys::{SpliceSys, SPLICE_F_MORE, SPLICE_F_MOVE};
use std::os::fd::BorrowedFd;
use tracing::trace;

/// Move up to `len` bytes of `file` at `offset` into the pipe
///
/// Returns 0 at end of file.
fn stage_from_file<S: SpliceSys>(
    sys: &S,
    pipe: &PipePair,
    file: BorrowedFd<'_>,
    offset: &mut libc::loff_t,
    len: usize,
) -> Result<usize, XferError> {
    loop {
        match sys.splice(file, Some(offset), pipe.write_end(), None, len, SPLICE_F_MORE) {
            Ok(staged) => return Ok(staged),
            Err(errno) if is_transient(errno) => continue,
            Err(errno) => return Err(XferError::Os(errno)),
        }
    }
}

/// Read into `buf` without a user-space copy
///
/// Returns the bytes delivered; fewer than `buf.len()` only at end of file.
pub(crate) fn zero_copy<S: SpliceSys>(
    sys: &S,
    pipe: &PipePair,
    file: BorrowedFd<'_>,
    mut offset: libc::loff_t,
    buf: &mut [u8],
    chunk: usize,
) -> Result<usize, XferError> {
    let mut done = 0;

    while done < buf.len() {
        let this_len = (buf.len() - done).min(chunk);
        let staged = stage_from_file(sys, pipe, file, &mut offset, this_len)?;
        if staged == 0 {
            trace!(done, "end of file during zero-copy read");
            break;
        }

        let mut consumed = 0;
        while consumed < staged {
            let region = &mut buf[done + consumed..done + staged];
            match sys.vmsplice_from_pipe(pipe.read_end(), region, SPLICE_F_MOVE) {
                Ok(0) => {
                    pipe.drain(sys, staged - consumed);
                    return Err(XferError::NoData);
                }
                Ok(moved) => consumed += moved,
                Err(errno) => {
                    pipe.drain(sys, staged - consumed);
                    return Err(XferError::from_user_move(errno));
                }
            }
        }

        done += staged;
    }

    Ok(done)
}

/// Read into `buf` through an explicit copy out of the pipe
///
/// Returns the bytes delivered; fewer than `buf.len()` only at end of file.
pub(crate) fn copy<S: SpliceSys>(
    sys: &S,
    pipe: &PipePair,
    file: BorrowedFd<'_>,
    mut offset: libc::loff_t,
    buf: &mut [u8],
    chunk: usize,
) -> Result<usize, XferError> {
    let mut done = 0;

    while done < buf.len() {
        let this_len = (buf.len() - done).min(chunk);
        let staged = stage_from_file(sys, pipe, file, &mut offset, this_len)?;
        if staged == 0 {
            trace!(done, "end of file during copying read");
            break;
        }

        let mut consumed = 0;
        while consumed < staged {
            match sys.read(pipe.read_end(), &mut buf[done + consumed..done + staged]) {
                // We hold the write end, so EOF on the pipe means the kernel lost our data
                Ok(0) => return Err(XferError::NoData),
                Ok(n) => consumed += n,
                Err(nix::errno::Errno::EINTR) => continue,
                Err(errno) => {
                    pipe.drain(sys, staged - consumed);
                    return Err(XferError::Os(errno));
                }
            }
        }

        done += staged;
    }

    Ok(done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::KernelSplice;
    use std::io::Write;
    use std::os::fd::AsFd;

    fn file_with(data: &[u8]) -> std::fs::File {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(data).unwrap();
        file
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn test_copy_read_spans_chunks() {
        let sys = KernelSplice;
        let pipe = PipePair::open(&sys).unwrap();
        let data = pattern(3 * 4096 + 17);
        let file = file_with(&data);

        let mut buf = vec![0u8; data.len() - 100];
        let n = copy(&sys, &pipe, file.as_fd(), 100, &mut buf, 4096).unwrap();

        assert_eq!(n, buf.len());
        assert_eq!(buf, &data[100..]);
    }

    #[test]
    fn test_zero_copy_read_spans_chunks() {
        let sys = KernelSplice;
        let pipe = PipePair::open(&sys).unwrap();
        let data = pattern(2 * 4096 + 1);
        let file = file_with(&data);

        let mut buf = vec![0u8; data.len()];
        let n = zero_copy(&sys, &pipe, file.as_fd(), 0, &mut buf, 4096).unwrap();

        assert_eq!(n, data.len());
        assert_eq!(buf, data);
    }

    #[test]
    fn test_short_read_at_end_of_file() {
        let sys = KernelSplice;
        let pipe = PipePair::open(&sys).unwrap();
        let data = pattern(1000);
        let file = file_with(&data);

        let mut buf = vec![0u8; 4096];
        assert_eq!(
            copy(&sys, &pipe, file.as_fd(), 0, &mut buf, 4096).unwrap(),
            1000
        );
        assert_eq!(&buf[..1000], &data[..]);

        let mut buf = vec![0u8; 10];
        assert_eq!(
            zero_copy(&sys, &pipe, file.as_fd(), 5000, &mut buf, 4096).unwrap(),
            0
        );
    }
}
