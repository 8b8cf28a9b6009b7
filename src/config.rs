//! Construction-time settings for a stream.

/// Settings for [`Writer::with_config`](crate::Writer::with_config).
///
/// # Examples
///
/// ```
/// use stream_fanout::{Config, Writer};
///
/// let config = Config::new().capacity(1024).shrink(false);
/// let writer = Writer::with_config(0u32, config);
/// assert!(!writer.is_closed());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Config {
    capacity: usize,
    shrink: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 0,
            shrink: true,
        }
    }
}

impl Config {
    /// Returns the default configuration: no preallocation, shrinking on.
    pub fn new() -> Self {
        Self::default()
    }

    /// Preallocates room for `capacity` buffered items. The buffer is never
    /// shrunk below this.
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Whether compaction hands spare buffer memory back to the allocator
    /// once the buffer occupies less than a quarter of it.
    #[must_use]
    pub fn shrink(mut self, shrink: bool) -> Self {
        self.shrink = shrink;
        self
    }

    /// Returns the configured minimum capacity.
    pub fn min_capacity(&self) -> usize {
        self.capacity
    }

    /// Returns whether shrinking is enabled.
    pub fn shrinks(&self) -> bool {
        self.shrink
    }
}
