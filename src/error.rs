use thiserror::Error;

/// Why [`Reader::try_recv`](crate::Reader::try_recv) returned no item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryRecvError {
    /// The stream is open but the reader has caught up with the writer.
    #[error("no item is ready to read")]
    Empty,
    /// The stream is closed and the reader has consumed every item.
    #[error("stream closed")]
    Closed,
}

impl TryRecvError {
    /// Returns `true` if more items may still arrive.
    pub fn is_empty(&self) -> bool {
        matches!(self, TryRecvError::Empty)
    }

    /// Returns `true` if the stream has ended for this reader.
    pub fn is_closed(&self) -> bool {
        matches!(self, TryRecvError::Closed)
    }
}
