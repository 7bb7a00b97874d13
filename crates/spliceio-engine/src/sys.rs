//! Kernel call layer
//!
//! Every syscall the engine issues goes through [`SpliceSys`]. [`KernelSplice`] is the real
//! implementation; tests wrap it to count calls or inject failures.

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::fs::File;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use std::ptr;

/// Attempt to move pages instead of copying
pub const SPLICE_F_MOVE: libc::c_uint = libc::SPLICE_F_MOVE;
/// Do not block on pipe I/O
pub const SPLICE_F_NONBLOCK: libc::c_uint = libc::SPLICE_F_NONBLOCK;
/// More data will follow in a subsequent splice
pub const SPLICE_F_MORE: libc::c_uint = libc::SPLICE_F_MORE;
/// Return vmsplice-mapped pages to the pipe
///
/// Not part of the upstream flag set; kernels without the unmap extension reject it with
/// `EINVAL`.
pub const SPLICE_F_UNMAP: libc::c_uint = 0x10;

/// Kernel operations used by the splice engine
pub trait SpliceSys {
    /// Create a close-on-exec pipe, returning `(read_end, write_end)`
    fn pipe(&self) -> nix::Result<(OwnedFd, OwnedFd)>;

    /// `splice(2)` between two descriptors
    ///
    /// A supplied offset is advanced by the kernel by the number of bytes moved.
    fn splice(
        &self,
        fd_in: BorrowedFd<'_>,
        off_in: Option<&mut libc::loff_t>,
        fd_out: BorrowedFd<'_>,
        off_out: Option<&mut libc::loff_t>,
        len: usize,
        flags: libc::c_uint,
    ) -> nix::Result<usize>;

    /// `vmsplice(2)` user memory into the write end of a pipe
    fn vmsplice_to_pipe(
        &self,
        pipe_in: BorrowedFd<'_>,
        data: &[u8],
        flags: libc::c_uint,
    ) -> nix::Result<usize>;

    /// `vmsplice(2)` the read end of a pipe into user memory
    fn vmsplice_from_pipe(
        &self,
        pipe_out: BorrowedFd<'_>,
        region: &mut [u8],
        flags: libc::c_uint,
    ) -> nix::Result<usize>;

    /// `read(2)`
    fn read(&self, fd: BorrowedFd<'_>, buf: &mut [u8]) -> nix::Result<usize>;

    /// Block without timeout until `fd` is writable
    fn wait_writable(&self, fd: BorrowedFd<'_>) -> nix::Result<()>;

    /// Flush file data and metadata to stable storage
    fn fsync(&self, file: &File) -> nix::Result<()>;
}

/// Direct syscall implementation of [`SpliceSys`]
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelSplice;

impl SpliceSys for KernelSplice {
    fn pipe(&self) -> nix::Result<(OwnedFd, OwnedFd)> {
        nix::unistd::pipe2(OFlag::O_CLOEXEC)
    }

    fn splice(
        &self,
        fd_in: BorrowedFd<'_>,
        off_in: Option<&mut libc::loff_t>,
        fd_out: BorrowedFd<'_>,
        off_out: Option<&mut libc::loff_t>,
        len: usize,
        flags: libc::c_uint,
    ) -> nix::Result<usize> {
        let off_in = off_in.map_or(ptr::null_mut(), |off| off as *mut libc::loff_t);
        let off_out = off_out.map_or(ptr::null_mut(), |off| off as *mut libc::loff_t);

        // SAFETY: both descriptors are borrowed for the call and the offset pointers are
        // either null or derived from live exclusive references.
        let moved = unsafe {
            libc::splice(
                fd_in.as_raw_fd(),
                off_in,
                fd_out.as_raw_fd(),
                off_out,
                len,
                flags,
            )
        };

        Errno::result(moved).map(|n| n as usize)
    }

    fn vmsplice_to_pipe(
        &self,
        pipe_in: BorrowedFd<'_>,
        data: &[u8],
        flags: libc::c_uint,
    ) -> nix::Result<usize> {
        let iov = libc::iovec {
            iov_base: data.as_ptr() as *mut libc::c_void,
            iov_len: data.len(),
        };

        // SAFETY: the iovec describes a live shared slice; without SPLICE_F_GIFT the kernel
        // only reads from it.
        let moved = unsafe { libc::vmsplice(pipe_in.as_raw_fd(), &iov, 1, flags) };

        Errno::result(moved).map(|n| n as usize)
    }

    fn vmsplice_from_pipe(
        &self,
        pipe_out: BorrowedFd<'_>,
        region: &mut [u8],
        flags: libc::c_uint,
    ) -> nix::Result<usize> {
        let iov = libc::iovec {
            iov_base: region.as_mut_ptr().cast(),
            iov_len: region.len(),
        };

        // SAFETY: the iovec describes a live exclusive slice the kernel may fill.
        let moved = unsafe { libc::vmsplice(pipe_out.as_raw_fd(), &iov, 1, flags) };

        Errno::result(moved).map(|n| n as usize)
    }

    fn read(&self, fd: BorrowedFd<'_>, buf: &mut [u8]) -> nix::Result<usize> {
        nix::unistd::read(fd, buf)
    }

    fn wait_writable(&self, fd: BorrowedFd<'_>) -> nix::Result<()> {
        let mut fds = [PollFd::new(fd, PollFlags::POLLOUT)];
        poll(&mut fds, PollTimeout::NONE)?;

        let revents = fds[0].revents().unwrap_or_else(PollFlags::empty);
        if revents.contains(PollFlags::POLLNVAL) {
            return Err(Errno::EBADF);
        }
        if revents.contains(PollFlags::POLLERR) {
            return Err(Errno::EPIPE);
        }
        Ok(())
    }

    fn fsync(&self, file: &File) -> nix::Result<()> {
        nix::unistd::fsync(file.as_fd())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_pipe_round_trip() {
        let sys = KernelSplice;
        let (read_end, write_end) = sys.pipe().unwrap();

        let written = sys
            .vmsplice_to_pipe(write_end.as_fd(), b"hello", 0)
            .unwrap();
        assert_eq!(written, 5);

        let mut buf = [0u8; 5];
        assert_eq!(sys.read(read_end.as_fd(), &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_splice_advances_offset() {
        let sys = KernelSplice;
        let (read_end, write_end) = sys.pipe().unwrap();

        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"0123456789").unwrap();

        let mut offset: libc::loff_t = 4;
        let moved = sys
            .splice(
                file.as_fd(),
                Some(&mut offset),
                write_end.as_fd(),
                None,
                3,
                SPLICE_F_MORE,
            )
            .unwrap();
        assert_eq!(moved, 3);
        assert_eq!(offset, 7);

        let mut buf = [0u8; 3];
        sys.read(read_end.as_fd(), &mut buf).unwrap();
        assert_eq!(&buf, b"456");
    }

    #[test]
    fn test_write_end_is_writable() {
        let sys = KernelSplice;
        let (_read_end, write_end) = sys.pipe().unwrap();
        sys.wait_writable(write_end.as_fd()).unwrap();
    }

    #[test]
    fn test_fsync_flushes_regular_file() {
        let sys = KernelSplice;
        let file = tempfile::tempfile().unwrap();
        sys.fsync(&file).unwrap();
    }

    #[test]
    fn test_read_from_empty_write_end_fails() {
        let sys = KernelSplice;
        let (_read_end, write_end) = sys.pipe().unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(sys.read(write_end.as_fd(), &mut buf), Err(Errno::EBADF));
    }

    #[test]
    fn test_unmap_flag_outside_upstream_set() {
        let upstream = SPLICE_F_MOVE | SPLICE_F_NONBLOCK | SPLICE_F_MORE | libc::SPLICE_F_GIFT;
        assert_eq!(upstream & SPLICE_F_UNMAP, 0);
    }
}
