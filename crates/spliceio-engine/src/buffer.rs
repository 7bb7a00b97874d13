//! Transfer buffer ownership
//!
//! A request's memory is either an [`OwnedBuffer`] supplied by the caller or a
//! [`PipeBackedBuffer`] produced by a zero-copy read. The latter can only become owned again
//! through [`SpliceEngine::release`](crate::SpliceEngine::release) or
//! [`IoEngine::release_buffer`](crate::IoEngine::release_buffer), which return its pages to the
//! pipe first.

/// Caller-owned transfer memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedBuffer {
    data: Vec<u8>,
}

impl OwnedBuffer {
    /// Zero-filled buffer of `len` bytes
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0; len],
        }
    }

    /// Buffer length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Buffer contents
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable buffer contents
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume into the underlying vector
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub(crate) fn into_pipe_backed(self, filled: usize) -> PipeBackedBuffer {
        debug_assert!(filled <= self.data.len());
        PipeBackedBuffer {
            data: self.data,
            filled,
        }
    }
}

impl From<Vec<u8>> for OwnedBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

/// Memory filled by a zero-copy read whose pages alias the engine's pipe
///
/// Readable like any slice, but not clonable and not convertible back to an [`OwnedBuffer`]
/// except through the engine's release operation.
#[must_use = "pipe-backed buffers must be returned through the engine's release operation"]
#[derive(Debug, PartialEq, Eq)]
pub struct PipeBackedBuffer {
    data: Vec<u8>,
    filled: usize,
}

impl PipeBackedBuffer {
    /// Bytes delivered by the read
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.filled]
    }

    /// Number of bytes delivered by the read
    pub fn len(&self) -> usize {
        self.filled
    }

    /// Whether the read delivered nothing
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Size of the underlying allocation
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Address of the first segment the kernel filled
    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    pub(crate) fn region_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.filled]
    }

    pub(crate) fn into_owned(self) -> OwnedBuffer {
        OwnedBuffer { data: self.data }
    }
}

/// Buffer slot carried by a transfer request
#[derive(Debug, PartialEq, Eq)]
pub enum XferBuffer {
    /// Caller-supplied memory
    Owned(OwnedBuffer),
    /// Zero-copy read result awaiting release
    PipeBacked(PipeBackedBuffer),
}

impl XferBuffer {
    /// Whether the slot must be released before reuse
    pub fn is_pipe_backed(&self) -> bool {
        matches!(self, Self::PipeBacked(_))
    }

    /// Size of the slot's memory
    pub fn capacity(&self) -> usize {
        match self {
            Self::Owned(owned) => owned.len(),
            Self::PipeBacked(backed) => backed.capacity(),
        }
    }

    /// Owned memory, if the slot is not pipe-backed
    pub fn as_owned(&self) -> Option<&OwnedBuffer> {
        match self {
            Self::Owned(owned) => Some(owned),
            Self::PipeBacked(_) => None,
        }
    }

    /// Pipe-backed result, if any
    pub fn as_pipe_backed(&self) -> Option<&PipeBackedBuffer> {
        match self {
            Self::Owned(_) => None,
            Self::PipeBacked(backed) => Some(backed),
        }
    }

    pub(crate) fn owned_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::Owned(owned) => Some(owned.as_mut_slice()),
            Self::PipeBacked(_) => None,
        }
    }

    /// Re-tag owned memory as pipe-backed after a zero-copy read of `filled` bytes
    pub(crate) fn mark_pipe_backed(&mut self, filled: usize) {
        if let Self::Owned(owned) = self {
            let owned = std::mem::take(owned);
            *self = Self::PipeBacked(owned.into_pipe_backed(filled));
        }
    }

    /// Run `unmap` over a pipe-backed region and hand the memory back as owned
    ///
    /// Returns `false` without calling `unmap` when the slot is already owned.
    pub(crate) fn release_with(&mut self, unmap: impl FnOnce(&mut [u8])) -> bool {
        let Self::PipeBacked(backed) = self else {
            return false;
        };

        unmap(backed.region_mut());
        let backed = std::mem::replace(backed, OwnedBuffer::default().into_pipe_backed(0));
        *self = Self::Owned(backed.into_owned());
        true
    }
}

impl From<OwnedBuffer> for XferBuffer {
    fn from(owned: OwnedBuffer) -> Self {
        Self::Owned(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_buffer_basics() {
        let mut buffer = OwnedBuffer::new(8);
        assert_eq!(buffer.len(), 8);
        buffer.as_mut_slice()[0] = 7;
        assert_eq!(buffer.as_slice()[0], 7);
        assert_eq!(OwnedBuffer::from(vec![1, 2]).into_vec(), vec![1, 2]);
    }

    #[test]
    fn test_mark_pipe_backed_keeps_memory() {
        let owned = OwnedBuffer::from(vec![1, 2, 3, 4]);
        let mut slot = XferBuffer::from(owned);
        let before = slot.as_owned().unwrap().as_slice().as_ptr();

        slot.mark_pipe_backed(3);

        let backed = slot.as_pipe_backed().unwrap();
        assert_eq!(backed.as_ptr(), before);
        assert_eq!(backed.as_slice(), &[1, 2, 3]);
        assert_eq!(backed.capacity(), 4);
        assert!(slot.owned_mut().is_none());
    }

    #[test]
    fn test_release_with_runs_once() {
        let mut slot = XferBuffer::from(OwnedBuffer::from(vec![9; 16]));
        slot.mark_pipe_backed(10);

        let mut unmapped = Vec::new();
        assert!(slot.release_with(|region| unmapped.push(region.len())));
        assert!(!slot.release_with(|region| unmapped.push(region.len())));

        assert_eq!(unmapped, vec![10]);
        assert_eq!(slot.as_owned().unwrap().len(), 16);
    }

    #[test]
    fn test_release_on_owned_is_noop() {
        let mut slot = XferBuffer::from(OwnedBuffer::new(4));
        assert!(!slot.release_with(|_| panic!("owned buffers are never unmapped")));
        assert!(!slot.is_pipe_backed());
    }
}
