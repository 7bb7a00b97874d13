//! Call-recording kernel layer for tests
//!
//! [`Recorder`] forwards to an inner [`SpliceSys`] while counting every call, and can inject the
//! failures the engine must cope with.

use crate::sys::{KernelSplice, SpliceSys, SPLICE_F_MORE, SPLICE_F_UNMAP};
use nix::errno::Errno;
use std::fs::File;
use std::os::fd::{BorrowedFd, OwnedFd};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

/// Kernel operations counted by [`Recorder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    /// Pipe creation
    Pipe,
    /// `splice(2)` in either direction
    Splice,
    /// `vmsplice(2)` of user memory into the pipe
    VmspliceToPipe,
    /// `vmsplice(2)` of the pipe into user memory
    VmspliceFromPipe,
    /// `vmsplice(2)` carrying the unmap directive
    Unmap,
    /// `read(2)` from the pipe
    Read,
    /// Wait for pipe writability
    WaitWritable,
    /// `fsync(2)`
    Fsync,
}

const CALL_KINDS: usize = 8;

impl Call {
    const ALL: [Self; CALL_KINDS] = [
        Self::Pipe,
        Self::Splice,
        Self::VmspliceToPipe,
        Self::VmspliceFromPipe,
        Self::Unmap,
        Self::Read,
        Self::WaitWritable,
        Self::Fsync,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Counting, fault-injecting wrapper around a kernel layer
#[derive(Debug)]
pub struct Recorder<S = KernelSplice> {
    inner: S,
    counts: [AtomicUsize; CALL_KINDS],
    unsupported_skip: AtomicUsize,
    unsupported_remaining: AtomicUsize,
    zero_length_vmsplice: AtomicBool,
    transient_splices: AtomicUsize,
    more_splices: AtomicUsize,
    pipe_errno: AtomicI32,
    fsync_errno: AtomicI32,
}

impl Recorder {
    /// Wrap the real kernel layer
    pub fn kernel() -> Self {
        Self::new(KernelSplice)
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::kernel()
    }
}

impl<S: SpliceSys> Recorder<S> {
    /// Wrap `inner`
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counts: Default::default(),
            unsupported_skip: AtomicUsize::new(0),
            unsupported_remaining: AtomicUsize::new(0),
            zero_length_vmsplice: AtomicBool::new(false),
            transient_splices: AtomicUsize::new(0),
            more_splices: AtomicUsize::new(0),
            pipe_errno: AtomicI32::new(0),
            fsync_errno: AtomicI32::new(0),
        }
    }

    /// Number of `call`s issued so far
    pub fn calls(&self, call: Call) -> usize {
        self.counts[call.index()].load(Ordering::Relaxed)
    }

    /// Number of kernel calls of any kind issued so far
    pub fn total_calls(&self) -> usize {
        Call::ALL.iter().map(|&call| self.calls(call)).sum()
    }

    /// Fail the next `n` vmsplice moves into user memory with `EBADF`
    ///
    /// Unmap directives are not affected.
    pub fn force_unsupported(&self, n: usize) {
        self.force_unsupported_after(0, n);
    }

    /// Let `skip` vmsplice moves into user memory through, then fail the next `n`
    pub fn force_unsupported_after(&self, skip: usize, n: usize) {
        self.unsupported_skip.store(skip, Ordering::Relaxed);
        self.unsupported_remaining.store(n, Ordering::Relaxed);
    }

    /// Make every vmsplice into user memory accept nothing without an error
    pub fn force_zero_length_vmsplice(&self) {
        self.zero_length_vmsplice.store(true, Ordering::Relaxed);
    }

    /// Fail the next `n` splices with `EAGAIN`
    pub fn force_transient_splice(&self, n: usize) {
        self.transient_splices.store(n, Ordering::Relaxed);
    }

    /// Number of splices issued with `SPLICE_F_MORE`
    pub fn more_flagged_splices(&self) -> usize {
        self.more_splices.load(Ordering::Relaxed)
    }

    /// Fail every pipe creation with `errno`
    pub fn fail_pipe_creation(&self, errno: i32) {
        self.pipe_errno.store(errno, Ordering::Relaxed);
    }

    /// Fail every fsync with `errno`
    pub fn fail_fsync(&self, errno: i32) {
        self.fsync_errno.store(errno, Ordering::Relaxed);
    }

    fn count(&self, call: Call) {
        self.counts[call.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn injected(slot: &AtomicI32) -> nix::Result<()> {
        match slot.load(Ordering::Relaxed) {
            0 => Ok(()),
            errno => Err(Errno::from_raw(errno)),
        }
    }

    fn take_unsupported(&self) -> bool {
        if self
            .unsupported_skip
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
        {
            return false;
        }
        self.unsupported_remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl<S: SpliceSys> SpliceSys for Recorder<S> {
    fn pipe(&self) -> nix::Result<(OwnedFd, OwnedFd)> {
        self.count(Call::Pipe);
        Self::injected(&self.pipe_errno)?;
        self.inner.pipe()
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
        self.count(Call::Splice);
        if flags & SPLICE_F_MORE != 0 {
            self.more_splices.fetch_add(1, Ordering::Relaxed);
        }
        if self
            .transient_splices
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Errno::EAGAIN);
        }
        self.inner.splice(fd_in, off_in, fd_out, off_out, len, flags)
    }

    fn vmsplice_to_pipe(
        &self,
        pipe_in: BorrowedFd<'_>,
        data: &[u8],
        flags: libc::c_uint,
    ) -> nix::Result<usize> {
        self.count(Call::VmspliceToPipe);
        self.inner.vmsplice_to_pipe(pipe_in, data, flags)
    }

    fn vmsplice_from_pipe(
        &self,
        pipe_out: BorrowedFd<'_>,
        region: &mut [u8],
        flags: libc::c_uint,
    ) -> nix::Result<usize> {
        if flags & SPLICE_F_UNMAP != 0 {
            self.count(Call::Unmap);
        } else {
            self.count(Call::VmspliceFromPipe);
            if self.take_unsupported() {
                return Err(Errno::EBADF);
            }
            if self.zero_length_vmsplice.load(Ordering::Relaxed) {
                return Ok(0);
            }
        }
        self.inner.vmsplice_from_pipe(pipe_out, region, flags)
    }

    fn read(&self, fd: BorrowedFd<'_>, buf: &mut [u8]) -> nix::Result<usize> {
        self.count(Call::Read);
        self.inner.read(fd, buf)
    }

    fn wait_writable(&self, fd: BorrowedFd<'_>) -> nix::Result<()> {
        self.count(Call::WaitWritable);
        self.inner.wait_writable(fd)
    }

    fn fsync(&self, file: &File) -> nix::Result<()> {
        self.count(Call::Fsync);
        Self::injected(&self.fsync_errno)?;
        self.inner.fsync(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::AsFd;

    #[test]
    fn test_counts_and_faults() {
        let recorder = Recorder::kernel();
        let (read_end, write_end) = recorder.pipe().unwrap();
        assert_eq!(recorder.calls(Call::Pipe), 1);

        recorder.force_unsupported(1);
        let mut buf = [0u8; 4];
        let first = recorder.vmsplice_from_pipe(read_end.as_fd(), &mut buf, 0);
        assert_eq!(first, Err(Errno::EBADF));

        recorder.vmsplice_to_pipe(write_end.as_fd(), b"data", 0).unwrap();
        assert_eq!(
            recorder.vmsplice_from_pipe(read_end.as_fd(), &mut buf, 0),
            Ok(4)
        );
        assert_eq!(&buf, b"data");
        assert_eq!(recorder.calls(Call::VmspliceFromPipe), 2);
        assert_eq!(recorder.total_calls(), 4);
    }

    #[test]
    fn test_transient_and_zero_length_faults() {
        let recorder = Recorder::kernel();
        let (read_end, write_end) = recorder.pipe().unwrap();
        let mut file = tempfile::tempfile().unwrap();
        std::io::Write::write_all(&mut file, b"abcd").unwrap();

        recorder.force_transient_splice(1);
        let mut offset = 0;
        let first = recorder.splice(
            file.as_fd(),
            Some(&mut offset),
            write_end.as_fd(),
            None,
            4,
            SPLICE_F_MORE,
        );
        assert_eq!(first, Err(Errno::EAGAIN));
        assert_eq!(offset, 0);

        let second = recorder.splice(
            file.as_fd(),
            Some(&mut offset),
            write_end.as_fd(),
            None,
            4,
            0,
        );
        assert_eq!(second, Ok(4));
        assert_eq!(recorder.calls(Call::Splice), 2);
        assert_eq!(recorder.more_flagged_splices(), 1);

        recorder.force_zero_length_vmsplice();
        let mut buf = [0u8; 4];
        assert_eq!(
            recorder.vmsplice_from_pipe(read_end.as_fd(), &mut buf, 0),
            Ok(0)
        );
        assert_eq!(recorder.read(read_end.as_fd(), &mut buf), Ok(4));
        assert_eq!(&buf, b"abcd");
    }
}
