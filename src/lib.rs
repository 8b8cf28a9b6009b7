//! A one-to-many in-memory broadcast stream.
//!
//! A single [`Writer`] appends items; any number of [`Reader`]s attach at any
//! time and each consumes every item still relevant to it, in write order, at
//! its own pace. The writer never blocks and never learns how many readers
//! exist or how fast they drain.
//!
//! # Examples
//!
//! ```
//! use stream_fanout::Writer;
//! use std::thread;
//!
//! let writer = Writer::new(0);
//! let readers: Vec<_> = (0..3).map(|_| writer.reader()).collect();
//!
//! let handles: Vec<_> = readers
//!     .into_iter()
//!     .map(|mut reader| thread::spawn(move || reader.blocking_iter().collect::<Vec<i32>>()))
//!     .collect();
//!
//! for i in 1..=5 {
//!     writer.write(i);
//! }
//! writer.close();
//!
//! for handle in handles {
//!     assert_eq!(handle.join().unwrap(), vec![1, 2, 3, 4, 5]);
//! }
//! ```
//!
//! # Behavior
//!
//! Items are buffered exactly as long as some attached reader still needs
//! them. Every read, write and detach compacts the buffer synchronously, so
//! there is no background sweep:
//!
//! - A reader attached later starts at the oldest item still buffered. It may
//!   therefore see items written before it attached, if a slower reader is
//!   still holding them, but never an item that was already discarded.
//! - With no readers attached, written items are discarded immediately.
//! - Detaching (or dropping) a lagging reader lets the items only it was
//!   holding back be discarded at once.
//!
//! ```
//! use stream_fanout::Writer;
//!
//! let writer = Writer::new(0);
//! writer.write(1); // nobody is listening: discarded
//!
//! let mut reader = writer.reader();
//! writer.write(2);
//!
//! assert_eq!(reader.read(None), (2, true));
//! ```
//!
//! # End of stream and cancellation
//!
//! [`Reader::read`] and [`Reader::try_read`] return the empty value given to
//! [`Writer::new`] together with `false` when there is nothing to deliver.
//! The idiomatic [`Reader::recv`] and [`Reader::try_recv`] return
//! [`Option`]/[`Result`] instead. A blocking read can be abandoned from
//! another thread with a [`CancelToken`]:
//!
//! ```
//! use stream_fanout::{CancelToken, Writer};
//! use std::thread;
//!
//! let writer = Writer::<u8>::default();
//! let mut reader = writer.reader();
//! let token = CancelToken::new();
//!
//! let handle = {
//!     let token = token.clone();
//!     thread::spawn(move || reader.recv_with(&token))
//! };
//! token.cancel();
//! assert_eq!(handle.join().unwrap(), None);
//! ```
//!
//! # Async
//!
//! [`Reader`] implements [`Stream`](futures_util::Stream), and any stream can
//! be forwarded into a [`Writer`] with [`StreamFanoutExt::fan_out`].
//!
//! ```
//! use stream_fanout::{StreamFanoutExt, Writer};
//! use futures_util::{stream, StreamExt};
//!
//! # tokio_test::block_on(async {
//! let writer = Writer::new(0);
//! let consumer1 = writer.reader();
//! let consumer2 = writer.reader();
//!
//! stream::iter(vec![1, 2, 3]).fan_out(writer).await;
//!
//! let (result1, result2) = tokio::join!(
//!     consumer1.collect::<Vec<i32>>(),
//!     consumer2.collect::<Vec<i32>>()
//! );
//! assert_eq!(result1, vec![1, 2, 3]);
//! assert_eq!(result2, vec![1, 2, 3]);
//! # });
//! ```
//!
//! # Thread Safety
//!
//! `Writer` and `Reader` are [`Send`] and [`Sync`] when the item type is
//! [`Send`]. Every operation takes one internal mutex; only a blocking read
//! ever waits, and it releases the mutex while it does.
//!
//! # Performance Considerations
//!
//! - **Memory**: items are cloned out for each reader; prefer cheap-to-clone
//!   items (consider `Arc<T>` for large data).
//! - **Growth**: the writer never blocks, so a reader that stops reading
//!   without detaching makes the buffer grow without bound.
//! - **Contention**: all readers share one lock and one wake condition; every
//!   write wakes every waiting reader.
//!
//! # Features
//!
//! - `stats`: exposes [`Writer::stats`] and the `Stats` counters handle.
//! - `tracing`: emits `tracing` events on attach, detach, close, compaction
//!   and cancellation, and makes [`init_tracing`] install a subscriber.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod cancel;
mod config;
mod error;
mod ext;
mod reader;
mod state;
#[cfg(feature = "stats")]
mod stats;
mod trace;
mod writer;

pub use cancel::{CancelToken, Subscription};
pub use config::Config;
pub use error::TryRecvError;
pub use ext::{FanOut, StreamFanoutExt};
pub use reader::{BlockingIter, Reader};
#[cfg(feature = "stats")]
pub use stats::Stats;
pub use trace::init_tracing;
pub use writer::{channel, Writer};
