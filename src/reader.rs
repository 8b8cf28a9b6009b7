use futures_util::stream::{FusedStream, Stream};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::cancel::CancelToken;
use crate::error::TryRecvError;
use crate::state::Shared;
use crate::trace::debug;

/// One attached reading end of a fan-out stream.
///
/// Each reader has a private cursor and receives every item from its starting
/// position onward, in write order, exactly once, at its own pace. Reading
/// moves the cursor forward and lets the stream discard items no other reader
/// still needs.
///
/// Readers are created with [`Writer::reader`](crate::Writer::reader) and
/// retired with [`detach`](Self::detach) or by dropping them. A retired reader
/// no longer holds back compaction.
///
/// A reader can be consumed three ways: blocking ([`read`](Self::read),
/// [`recv`](Self::recv)), non-blocking ([`try_read`](Self::try_read),
/// [`try_recv`](Self::try_recv)), or asynchronously through its [`Stream`]
/// implementation.
///
/// # Examples
///
/// ```
/// use stream_fanout::Writer;
/// use futures_util::StreamExt;
///
/// # tokio_test::block_on(async {
/// let writer = Writer::new(0);
/// let reader = writer.reader();
///
/// writer.write(1);
/// writer.write(2);
/// writer.close();
///
/// let items: Vec<i32> = reader.collect().await;
/// assert_eq!(items, vec![1, 2]);
/// # });
/// ```
pub struct Reader<T> {
    shared: Arc<Shared<T>>,
    id: usize,
    // Global position of the next item to read.
    pos: u64,
    terminated: bool,
}

impl<T> Reader<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>, id: usize, pos: u64) -> Self {
        Self {
            shared,
            id,
            pos,
            terminated: false,
        }
    }

    /// Returns the global position of the next item this reader will receive.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Retires this reader.
    ///
    /// Items only this reader was holding back are discarded immediately.
    /// Dropping a reader has the same effect.
    pub fn detach(self) {}

    /// Returns an iterator that blocks on each item until the stream ends.
    pub fn blocking_iter(&mut self) -> BlockingIter<'_, T> {
        BlockingIter { reader: self }
    }
}

impl<T: Clone> Reader<T> {
    /// Reads the next item without blocking.
    ///
    /// Returns the stream's empty value and `false` whenever no item is ready,
    /// whether or not the stream is closed.
    pub fn try_read(&mut self) -> (T, bool) {
        let mut state = self.shared.lock();
        if self.pos < state.end() {
            let item = state.take(self.id, self.pos);
            self.pos += 1;
            (item, true)
        } else {
            (state.empty(), false)
        }
    }

    /// Receives the next item, blocking until one is available.
    ///
    /// Returns `None` once the stream is closed and this reader has consumed
    /// everything.
    pub fn recv(&mut self) -> Option<T> {
        self.next_blocking(None)
    }

    /// Receives the next item without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Empty`] if the stream is open but nothing is
    /// ready, and [`TryRecvError::Closed`] once the stream is closed and drained.
    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        let mut state = self.shared.lock();
        if self.pos < state.end() {
            let item = state.take(self.id, self.pos);
            self.pos += 1;
            Ok(item)
        } else if state.is_closed() {
            Err(TryRecvError::Closed)
        } else {
            Err(TryRecvError::Empty)
        }
    }

    fn next_blocking(&mut self, cancel: Option<&CancelToken>) -> Option<T> {
        let mut state = self.shared.lock();
        loop {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                debug!(id = self.id, pos = self.pos, "read cancelled");
                return None;
            }
            if self.pos < state.end() {
                let item = state.take(self.id, self.pos);
                self.pos += 1;
                return Some(item);
            }
            if state.is_closed() {
                return None;
            }
            state = self.shared.wait(state);
        }
    }
}

/// Cancellable reads. The cancel callback holds the stream, so it must be
/// able to move to whichever thread calls [`CancelToken::cancel`].
impl<T: Clone + Send + 'static> Reader<T> {
    /// Reads the next item, blocking until one is available.
    ///
    /// Returns `(item, true)` on success. Returns the stream's empty value and
    /// `false` once the stream is closed and drained, or when `cancel` is
    /// triggered. The two cases are told apart by checking the token.
    pub fn read(&mut self, cancel: Option<&CancelToken>) -> (T, bool) {
        match self.next_cancellable(cancel) {
            Some(item) => (item, true),
            None => (self.shared.lock().empty(), false),
        }
    }

    /// Like [`recv`](Self::recv), but gives up with `None` as soon as `cancel`
    /// is triggered.
    ///
    /// Cancelling wakes only to re-check; other readers parked on the same
    /// stream go back to waiting and lose nothing.
    pub fn recv_with(&mut self, cancel: &CancelToken) -> Option<T> {
        self.next_cancellable(Some(cancel))
    }

    fn next_cancellable(&mut self, cancel: Option<&CancelToken>) -> Option<T> {
        // Registered before locking: an already-cancelled token runs the
        // callback inline, and the callback takes the lock itself.
        let _subscription = cancel.map(|token| {
            let shared = Arc::clone(&self.shared);
            token.on_cancel(move || shared.nudge())
        });
        self.next_blocking(cancel)
    }
}

impl<T: Clone> Stream for Reader<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.terminated {
            return Poll::Ready(None);
        }

        let this = &mut *self;
        let mut state = this.shared.lock();
        if this.pos < state.end() {
            let item = state.take(this.id, this.pos);
            this.pos += 1;
            Poll::Ready(Some(item))
        } else if state.is_closed() {
            drop(state);
            this.terminated = true;
            Poll::Ready(None)
        } else {
            state.park(this.id, cx.waker());
            Poll::Pending
        }
    }
}

impl<T: Clone> FusedStream for Reader<T> {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl<T> fmt::Debug for Reader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("id", &self.id)
            .field("position", &self.pos)
            .finish()
    }
}

impl<T> Drop for Reader<T> {
    fn drop(&mut self) {
        self.shared.lock().detach(self.id);
    }
}

/// Blocking iterator over a [`Reader`], returned by
/// [`Reader::blocking_iter`].
#[derive(Debug)]
pub struct BlockingIter<'a, T> {
    reader: &'a mut Reader<T>,
}

impl<T: Clone> Iterator for BlockingIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.reader.recv()
    }
}
