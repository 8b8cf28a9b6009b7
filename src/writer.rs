use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::reader::Reader;
use crate::state::Shared;
use crate::trace::debug;

/// The single writing end of a fan-out stream.
///
/// Every item written stays buffered until the slowest attached [`Reader`] has
/// consumed it, and is discarded the moment no reader needs it anymore. The
/// writer never blocks and is not told how many readers exist.
///
/// Dropping the writer closes the stream.
///
/// # Examples
///
/// ```
/// use stream_fanout::Writer;
///
/// let writer = Writer::new(0);
/// let mut first = writer.reader();
/// let mut second = writer.reader();
///
/// writer.write(1);
/// writer.write(2);
/// writer.close();
///
/// assert_eq!(first.read(None), (1, true));
/// assert_eq!(first.read(None), (2, true));
/// assert_eq!(first.read(None), (0, false));
///
/// let rest: Vec<i32> = second.blocking_iter().collect();
/// assert_eq!(rest, vec![1, 2]);
/// ```
pub struct Writer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Writer<T> {
    /// Creates a new stream.
    ///
    /// `empty` is what readers get back from [`Reader::read`] and
    /// [`Reader::try_read`] when there is nothing to deliver.
    pub fn new(empty: T) -> Self {
        Self::with_config(empty, Config::default())
    }

    /// Creates a new stream with explicit settings.
    pub fn with_config(empty: T, config: Config) -> Self {
        Self {
            shared: Arc::new(Shared::new(empty, config)),
        }
    }

    /// Appends `item` to the stream and wakes every waiting reader.
    ///
    /// If no reader is attached, the item is discarded right away.
    ///
    /// # Panics
    ///
    /// Panics if the stream has been closed.
    pub fn write(&self, item: T) {
        let wakers = self.shared.lock().push(item);
        self.shared.broadcast(wakers);
    }

    /// Marks the end of the stream.
    ///
    /// Readers still receive every item they have not consumed yet, then end
    /// of stream. Closing twice is a no-op.
    pub fn close(&self) {
        let wakers = self.shared.lock().close();
        self.shared.broadcast(wakers);
    }

    /// Attaches a new reader.
    ///
    /// The reader starts at the oldest item still buffered. It will see items
    /// written before it attached if a slower reader is still holding them, and
    /// never sees an item that was already discarded.
    pub fn reader(&self) -> Reader<T> {
        let (id, start) = self.shared.lock().attach();
        Reader::new(Arc::clone(&self.shared), id, start)
    }

    /// Returns the number of items currently buffered.
    pub fn buffered(&self) -> usize {
        self.shared.lock().buffered()
    }

    /// Returns the total number of items written so far.
    pub fn len_written(&self) -> u64 {
        self.shared.lock().end()
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().is_closed()
    }

    /// Returns the number of attached readers.
    pub fn reader_count(&self) -> usize {
        self.shared.lock().active_readers()
    }

    /// Returns a live view of this stream's counters.
    ///
    /// # Examples
    ///
    /// ```
    /// use stream_fanout::Writer;
    ///
    /// let writer = Writer::new(0);
    /// let stats = writer.stats();
    ///
    /// let mut reader = writer.reader();
    /// writer.write(7);
    /// assert_eq!(stats.active_readers(), 1);
    /// assert_eq!(stats.retained(), 1);
    ///
    /// reader.try_read();
    /// assert_eq!(stats.retained(), 0);
    /// assert_eq!(stats.discarded(), 1);
    /// ```
    #[cfg(feature = "stats")]
    #[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
    pub fn stats(&self) -> crate::stats::Stats {
        self.shared.lock().stats()
    }
}

impl<T: Default> Default for Writer<T> {
    /// Creates a stream whose empty value is `T::default()`.
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Extend<T> for Writer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.write(item);
        }
    }
}

impl<T> fmt::Debug for Writer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Writer")
            .field("written", &state.end())
            .field("buffered", &state.buffered())
            .field("readers", &state.active_readers())
            .field("closed", &state.is_closed())
            .finish()
    }
}

impl<T> Drop for Writer<T> {
    fn drop(&mut self) {
        debug!("writer dropped, closing stream");
        self.close();
    }
}

/// Creates a stream and attaches its first reader.
///
/// # Examples
///
/// ```
/// let (writer, mut reader) = stream_fanout::channel(String::new());
/// writer.write("hello".to_string());
/// drop(writer);
///
/// assert_eq!(reader.recv().as_deref(), Some("hello"));
/// assert_eq!(reader.recv(), None);
/// ```
pub fn channel<T>(empty: T) -> (Writer<T>, Reader<T>) {
    let writer = Writer::new(empty);
    let reader = writer.reader();
    (writer, reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_without_readers_is_discarded() {
        let writer = Writer::new(0);
        writer.write(1);
        writer.write(2);
        assert_eq!(writer.buffered(), 0);
        assert_eq!(writer.len_written(), 2);
    }

    #[test]
    fn test_close_is_idempotent() {
        let writer = Writer::new(0);
        let mut reader = writer.reader();
        writer.write(5);
        writer.close();
        writer.close();

        assert!(writer.is_closed());
        assert_eq!(reader.read(None), (5, true));
        assert_eq!(reader.read(None), (0, false));
    }

    #[test]
    #[should_panic(expected = "write to a closed stream")]
    fn test_write_after_close_panics() {
        let writer = Writer::new(0);
        writer.close();
        writer.write(1);
    }

    #[test]
    fn test_drop_closes_stream() {
        let writer = Writer::new(0);
        let mut reader = writer.reader();
        writer.write(3);
        drop(writer);

        assert_eq!(reader.recv(), Some(3));
        assert_eq!(reader.recv(), None);
    }

    #[test]
    fn test_reader_count_tracks_attach_and_detach() {
        let writer = Writer::new(0);
        let first = writer.reader();
        let second = writer.reader();
        assert_eq!(writer.reader_count(), 2);

        first.detach();
        assert_eq!(writer.reader_count(), 1);
        drop(second);
        assert_eq!(writer.reader_count(), 0);
    }

    #[test]
    fn test_extend_writes_every_item() {
        let mut writer = Writer::default();
        let mut reader = writer.reader();
        writer.extend(vec![1u8, 2, 3]);
        writer.close();

        let items: Vec<u8> = reader.blocking_iter().collect();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn test_with_config_keeps_semantics() {
        let writer = Writer::with_config(0, Config::new().capacity(4).shrink(false));
        let mut reader = writer.reader();
        for i in 1..=10 {
            writer.write(i);
        }
        assert_eq!(writer.buffered(), 10);
        let items: Vec<i32> = (0..10).map(|_| reader.try_read().0).collect();
        assert_eq!(items, (1..=10).collect::<Vec<_>>());
        assert_eq!(writer.buffered(), 0);
    }

    #[test]
    fn test_debug_output() {
        let writer = Writer::new(0);
        let _reader = writer.reader();
        writer.write(1);
        assert_eq!(
            format!("{writer:?}"),
            "Writer { written: 1, buffered: 1, readers: 1, closed: false }"
        );
    }

    #[test]
    fn test_channel_attaches_first_reader() {
        let (writer, mut reader) = channel(-1);
        writer.write(10);
        assert_eq!(writer.reader_count(), 1);
        assert_eq!(reader.try_read(), (10, true));
        assert_eq!(reader.try_read(), (-1, false));
    }

    #[test]
    fn test_send_sync_bounds() {
        static_assertions::assert_impl_all!(Writer<i32>: Send, Sync);
        static_assertions::assert_impl_all!(Writer<String>: Send, Sync);
        static_assertions::assert_not_impl_any!(Writer<i32>: Clone);
    }
}
