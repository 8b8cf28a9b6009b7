//! Cooperative cancellation for blocking reads.
//!
//! A [`CancelToken`] is a flag plus a list of callbacks. Cancelling sets the
//! flag and then runs every registered callback once. A blocking
//! [`Reader::read`](crate::Reader::read) registers a callback that wakes the
//! stream it is parked on, so the parked call re-checks and sees the flag.

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback = Box<dyn FnOnce() + Send>;

/// A cloneable cancellation signal. All clones observe the same state.
///
/// # Examples
///
/// ```
/// use stream_fanout::{CancelToken, Writer};
/// use std::thread;
///
/// let writer = Writer::new(0u32);
/// let mut reader = writer.reader();
/// let token = CancelToken::new();
///
/// let canceller = token.clone();
/// let handle = thread::spawn(move || reader.read(Some(&token)));
/// canceller.cancel();
///
/// assert_eq!(handle.join().unwrap(), (0, false));
/// ```
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    callbacks: Mutex<Callbacks>,
}

#[derive(Default)]
struct Callbacks {
    next_id: u64,
    pending: Vec<(u64, Callback)>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and runs every registered callback.
    ///
    /// Calling this more than once has no further effect.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let pending = {
            let mut callbacks = self.inner.lock();
            mem::take(&mut callbacks.pending)
        };
        for (_, callback) in pending {
            callback();
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Registers `callback` to run once when the token is cancelled.
    ///
    /// If the token is already cancelled the callback runs immediately on the
    /// calling thread. Dropping the returned [`Subscription`] before
    /// cancellation unregisters the callback.
    pub fn on_cancel<F>(&self, callback: F) -> Subscription
    where
        F: FnOnce() + Send + 'static,
    {
        let mut callbacks = self.inner.lock();
        if self.is_cancelled() {
            drop(callbacks);
            callback();
            return Subscription {
                token: Weak::new(),
                id: 0,
            };
        }
        let id = callbacks.next_id;
        callbacks.next_id += 1;
        callbacks.pending.push((id, Box::new(callback)));
        Subscription {
            token: Arc::downgrade(&self.inner),
            id,
        }
    }
}

impl Inner {
    fn lock(&self) -> std::sync::MutexGuard<'_, Callbacks> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Registration handle returned by [`CancelToken::on_cancel`].
///
/// Dropping it removes the callback if it has not run yet.
#[must_use = "dropping a Subscription unregisters its callback"]
#[derive(Debug)]
pub struct Subscription {
    token: Weak<Inner>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.token.upgrade() {
            inner.lock().pending.retain(|(id, _)| *id != self.id);
        }
    }
}
