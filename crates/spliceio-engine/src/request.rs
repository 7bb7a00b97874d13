//! Transfer requests

use crate::buffer::{OwnedBuffer, XferBuffer};
use spliceio_types::{Completion, Direction, FileOffset, TransferError};
use std::fs::File;

/// One unit of work submitted to an engine
///
/// The host owns the request and the file; the engine borrows the request mutably for the
/// duration of a submission and records the outcome on it.
#[derive(Debug)]
pub struct TransferRequest<'f> {
    file: &'f File,
    offset: FileOffset,
    direction: Direction,
    buffer: XferBuffer,
    transferred: usize,
    residual: usize,
    error: Option<TransferError>,
}

impl<'f> TransferRequest<'f> {
    fn new(file: &'f File, offset: FileOffset, direction: Direction, buffer: OwnedBuffer) -> Self {
        Self {
            file,
            offset,
            direction,
            buffer: XferBuffer::Owned(buffer),
            transferred: 0,
            residual: 0,
            error: None,
        }
    }

    /// Read `buffer.len()` bytes from `file` at `offset` into `buffer`
    pub fn read(file: &'f File, offset: FileOffset, buffer: OwnedBuffer) -> Self {
        Self::new(file, offset, Direction::Read, buffer)
    }

    /// Write the whole of `buffer` to `file` at `offset`
    pub fn write(file: &'f File, offset: FileOffset, buffer: OwnedBuffer) -> Self {
        Self::new(file, offset, Direction::Write, buffer)
    }

    /// Flush `file` to stable storage
    pub fn sync(file: &'f File) -> Self {
        Self::new(file, 0, Direction::Sync, OwnedBuffer::default())
    }

    /// Target file
    pub fn file(&self) -> &'f File {
        self.file
    }

    /// Byte offset within the file
    pub fn offset(&self) -> FileOffset {
        self.offset
    }

    /// Retarget the request at another offset
    pub fn set_offset(&mut self, offset: FileOffset) {
        self.offset = offset;
    }

    /// Transfer direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Requested length in bytes (zero for sync requests)
    pub fn length(&self) -> usize {
        match self.direction {
            Direction::Sync => 0,
            Direction::Read | Direction::Write => self.buffer.capacity(),
        }
    }

    /// The request's buffer slot
    pub fn buffer(&self) -> &XferBuffer {
        &self.buffer
    }

    /// Owned memory for filling a write or inspecting a copied read
    ///
    /// `None` while the slot holds a pipe-backed result.
    pub fn buffer_mut(&mut self) -> Option<&mut [u8]> {
        self.buffer.owned_mut()
    }

    /// Whether the buffer must go through release before the request is reused
    pub fn needs_release(&self) -> bool {
        self.buffer.is_pipe_backed()
    }

    /// Bytes moved by the last submission
    pub fn data(&self) -> &[u8] {
        match &self.buffer {
            XferBuffer::Owned(owned) => &owned.as_slice()[..self.transferred.min(owned.len())],
            XferBuffer::PipeBacked(backed) => backed.as_slice(),
        }
    }

    /// Bytes actually transferred by the last submission
    pub fn transferred(&self) -> usize {
        self.transferred
    }

    /// Requested minus transferred, valid only when [`error`](Self::error) is `None`
    pub fn residual(&self) -> usize {
        self.residual
    }

    /// Failure record of the last submission
    pub fn error(&self) -> Option<TransferError> {
        self.error
    }

    /// Detach the buffer slot, ending the request
    pub fn into_buffer(self) -> XferBuffer {
        self.buffer
    }

    pub(crate) fn slot_mut(&mut self) -> &mut XferBuffer {
        &mut self.buffer
    }

    pub(crate) fn record(&mut self, completion: &Completion) {
        self.transferred = completion.transferred;
        self.residual = completion.residual;
        self.error = completion.error;
    }
}
