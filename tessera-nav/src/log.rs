//! Pluggable sink for human-readable navigation log lines.
//!
//! ## Usage
//!
//! Pick [`SilentLog`] for production builds and [`ConsoleLog`] while
//! debugging navigation. Any `Fn(&str)` closure is a sink as well, which is
//! handy for capturing lines in tests.

use std::sync::Arc;

use tracing::info;

/// Receives one line per navigation event (no-ops, system pops, replays).
pub trait LogSink: Send + Sync {
    /// Records a single line.
    fn log(&self, message: &str);
}

/// Discards every line.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentLog;

impl LogSink for SilentLog {
    fn log(&self, _message: &str) {}
}

/// Forwards lines to the `tracing` subscriber at `info` level.
///
/// Install a subscriber (for example `tracing_subscriber::fmt()`) to see them
/// on the console.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleLog;

impl LogSink for ConsoleLog {
    fn log(&self, message: &str) {
        info!(target: "tessera_nav", "{message}");
    }
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, message: &str) {
        self(message)
    }
}

/// Shared sink handle.
pub type SharedLogSink = Arc<dyn LogSink>;

/// Returns the built-in sink selected by the `debug_logging` switch.
pub fn sink_for(debug_logging: bool) -> SharedLogSink {
    if debug_logging {
        Arc::new(ConsoleLog)
    } else {
        Arc::new(SilentLog)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::SharedLogSink;

    #[test]
    fn closures_act_as_sinks() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = lines.clone();
        let sink: SharedLogSink = Arc::new(move |line: &str| captured.lock().push(line.to_owned()));

        sink.log("first");
        sink.log("second");

        assert_eq!(*lines.lock(), vec!["first".to_owned(), "second".to_owned()]);
    }
}
