//! Transfer-path error classification

use nix::errno::Errno;

/// Why a pipe-staged transfer stopped
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum XferError {
    /// The kernel cannot vmsplice from a pipe into user memory
    #[error("vmsplice into user memory is not supported: {0}")]
    NotSupported(Errno),
    /// A vmsplice accepted nothing without reporting an error
    #[error("vmsplice moved no data")]
    NoData,
    /// Any other kernel failure
    #[error(transparent)]
    Os(#[from] Errno),
}

impl XferError {
    /// Raw errno recorded on the failed completion
    pub fn errno(self) -> i32 {
        match self {
            Self::NotSupported(errno) | Self::Os(errno) => errno as i32,
            Self::NoData => libc::ENODATA,
        }
    }

    /// Classify a failed vmsplice from the pipe into user memory
    ///
    /// Kernels that predate vmsplice-to-user refuse the read end of a pipe with `EBADF`.
    pub(crate) fn from_user_move(errno: Errno) -> Self {
        match errno {
            Errno::EBADF | Errno::EOPNOTSUPP | Errno::ENOSYS => Self::NotSupported(errno),
            other => Self::Os(other),
        }
    }
}

/// Conditions the staging loops retry instead of surfacing
pub(crate) fn is_transient(errno: Errno) -> bool {
    matches!(errno, Errno::EAGAIN | Errno::ENODATA | Errno::EINTR)
}
