//! Extension trait for forwarding a stream into a [`Writer`].
//!
//! This module provides the `StreamFanoutExt` trait which adds a `fan_out`
//! method to any `Stream + Unpin`, turning an async source into a fan-out
//! stream that any number of readers can attach to.

use crate::Writer;
use futures_util::stream::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Extension trait for [`Stream`] that provides the `fan_out` method.
pub trait StreamFanoutExt: Stream {
    /// Returns a future that writes every item of this stream into `writer`
    /// and closes it when the stream ends.
    ///
    /// Readers should be attached before the future is first polled if they
    /// must see every item.
    ///
    /// ```
    /// use stream_fanout::{StreamFanoutExt, Writer};
    /// use futures_util::{stream, StreamExt};
    ///
    /// # tokio_test::block_on(async {
    /// let writer = Writer::new("");
    /// let first = writer.reader();
    /// let second = writer.reader();
    ///
    /// stream::iter(vec!["hello", "world"]).fan_out(writer).await;
    ///
    /// assert_eq!(first.collect::<Vec<_>>().await, vec!["hello", "world"]);
    /// assert_eq!(second.collect::<Vec<_>>().await, vec!["hello", "world"]);
    /// # });
    /// ```
    fn fan_out(self, writer: Writer<Self::Item>) -> FanOut<Self>
    where
        Self: Sized + Unpin,
    {
        FanOut {
            stream: self,
            writer: Some(writer),
        }
    }
}

impl<S> StreamFanoutExt for S where S: Stream {}

/// Future returned by [`StreamFanoutExt::fan_out`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
#[derive(Debug)]
pub struct FanOut<S>
where
    S: Stream + Unpin,
{
    stream: S,
    writer: Option<Writer<S::Item>>,
}

impl<S> Future for FanOut<S>
where
    S: Stream + Unpin,
{
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let writer = match this.writer.as_ref() {
            Some(w) => w,
            None => return Poll::Ready(()),
        };

        loop {
            match Pin::new(&mut this.stream).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(item)) => writer.write(item),
                Poll::Ready(None) => {
                    // Dropping the writer closes the stream.
                    this.writer.take();
                    return Poll::Ready(());
                }
            }
        }
    }
}
