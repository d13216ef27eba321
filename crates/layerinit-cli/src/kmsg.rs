//! Kernel log sink.
//!
//! A [`Layer`] that renders each event as a single kernel log record:
//! `<priority>group: message key=value ...`. Records the kernel refuses are
//! written to the fallback stream without the priority prefix.

use std::fmt::{self, Write as _};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use layerinit_common::constants::APP_NAME;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Kernel syslog priorities.
// Priorities above ERROR are never produced by `tracing`.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KernelLevel {
    /// System is unusable.
    Emergency = 0,
    /// Action must be taken immediately.
    Alert = 1,
    /// Critical conditions.
    Critical = 2,
    /// Error conditions.
    Error = 3,
    /// Warning conditions.
    Warning = 4,
    /// Normal but significant condition.
    Notice = 5,
    /// Informational.
    Info = 6,
    /// Debug-level messages.
    Debug = 7,
}

impl From<Level> for KernelLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warning,
            Level::INFO => Self::Info,
            _ => Self::Debug,
        }
    }
}

/// Writes one record per event to the kernel log.
pub struct KmsgLayer<W> {
    writer: Mutex<W>,
    fallback: Mutex<Box<dyn Write + Send>>,
    group: &'static str,
}

impl KmsgLayer<File> {
    /// Opens the kernel log device at `path` for writing.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened.
    pub fn open(path: &Path) -> io::Result<Self> {
        OpenOptions::new().write(true).open(path).map(Self::new)
    }
}

impl<W: Write> KmsgLayer<W> {
    /// Wraps `writer`; records are tagged with the application name and
    /// fall back to stderr.
    pub fn new(writer: W) -> Self {
        Self::with_fallback(writer, io::stderr())
    }

    /// Wraps `writer`; records it rejects are written to `fallback`.
    pub fn with_fallback(writer: W, fallback: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(writer),
            fallback: Mutex::new(Box::new(fallback)),
            group: APP_NAME,
        }
    }
}

impl<S, W> Layer<S> for KmsgLayer<W>
where
    S: Subscriber,
    W: Write + Send + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut line = LineVisitor::default();
        event.record(&mut line);

        let priority = KernelLevel::from(*event.metadata().level()) as u8;
        let body = format!("{}: {}{}\n", self.group, line.message, line.fields);
        let record = format!("<{priority}>{body}");

        // The kernel takes one record per write.
        let written = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_all(record.as_bytes());
        if written.is_err() {
            let mut fallback = self.fallback.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = fallback.write_all(body.as_bytes());
        }
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::test_util::SharedBuf;

    struct RejectingWriter;

    impl Write for RejectingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from_raw_os_error(28))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn emit_to<W: Write + Send + 'static>(layer: KmsgLayer<W>, emit: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, emit);
    }

    fn capture(emit: impl FnOnce()) -> String {
        let buf = SharedBuf::default();
        emit_to(KmsgLayer::new(buf.clone()), emit);
        buf.contents()
    }

    #[test]
    fn formats_priority_group_message_and_fields() {
        let out = capture(|| tracing::info!(dir = "/etc", count = 2, "mounting overlay"));
        assert_eq!(out, "<6>layerinit: mounting overlay dir=/etc count=2\n");
    }

    #[test]
    fn one_record_per_event() {
        let out = capture(|| {
            tracing::error!("first");
            tracing::warn!(path = %"/tmp", "second");
            tracing::debug!("third");
        });
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(
            lines,
            vec!["<3>layerinit: first", "<4>layerinit: second path=/tmp", "<7>layerinit: third"]
        );
    }

    #[test]
    fn rejected_record_goes_to_fallback_without_priority() {
        let fallback = SharedBuf::default();
        let layer = KmsgLayer::with_fallback(RejectingWriter, fallback.clone());
        emit_to(layer, || tracing::error!(error = "boot failed", "fatal"));
        assert_eq!(fallback.contents(), "layerinit: fatal error=boot failed\n");
    }

    #[test]
    fn accepted_record_skips_fallback() {
        let kernel = SharedBuf::default();
        let fallback = SharedBuf::default();
        let layer = KmsgLayer::with_fallback(kernel.clone(), fallback.clone());
        emit_to(layer, || tracing::info!("mounted"));
        assert_eq!(kernel.contents(), "<6>layerinit: mounted\n");
        assert!(fallback.contents().is_empty());
    }

    #[test]
    fn poisoned_writer_still_records() {
        let kernel = SharedBuf::default();
        let layer = KmsgLayer::new(kernel.clone());
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = layer.writer.lock().unwrap();
            panic!("writer poisoned");
        }));
        assert!(layer.writer.is_poisoned());
        emit_to(layer, || tracing::warn!("still here"));
        assert_eq!(kernel.contents(), "<4>layerinit: still here\n");
    }

    #[test]
    fn level_mapping() {
        assert_eq!(KernelLevel::from(Level::ERROR) as u8, 3);
        assert_eq!(KernelLevel::from(Level::WARN) as u8, 4);
        assert_eq!(KernelLevel::from(Level::INFO) as u8, 6);
        assert_eq!(KernelLevel::from(Level::DEBUG) as u8, 7);
        assert_eq!(KernelLevel::from(Level::TRACE) as u8, 7);
    }
}
