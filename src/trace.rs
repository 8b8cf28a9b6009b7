//! Logging hooks.
//!
//! Enable with `--features tracing`. All log macros become no-ops when the
//! feature is disabled.

/// Initialize a `tracing` subscriber that prints this crate's events.
///
/// Honors `RUST_LOG`; defaults to `stream_fanout=trace`. Does nothing if the
/// `tracing` feature is not enabled. Safe to call more than once.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stream_fanout=trace"));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}

#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
macro_rules! trace_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use debug_noop as debug;
#[cfg(not(feature = "tracing"))]
pub(crate) use trace_noop as trace;

#[cfg(test)]
mod tests {
    use crate::Writer;

    #[test]
    fn test_init_tracing_is_repeatable() {
        super::init_tracing();
        super::init_tracing();

        // Exercise the logged paths with a subscriber installed.
        let writer = Writer::new(0);
        let mut reader = writer.reader();
        writer.write(1);
        assert_eq!(reader.try_read(), (1, true));
        drop(reader);
        writer.close();
    }
}
