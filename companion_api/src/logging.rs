//! Tap formatted log lines into a broadcast channel for `WS /ws/logs`.
//!
//! `tracing_subscriber::fmt`'s `MakeWriter` trait is the standard seam for
//! this: every formatted event is handed a `Write` implementation, and
//! ours forwards each completed line onward instead of writing to a file
//! or stderr.

use std::io;
use std::sync::Arc;

use tokio::sync::broadcast;

/// Cloneable `MakeWriter` that publishes each formatted line onto a
/// broadcast channel. Lines with no active `/ws/logs` subscriber are
/// dropped by `broadcast::Sender::send`'s usual semantics — there is
/// nothing buffering history for a client that connects late.
#[derive(Clone)]
pub struct BroadcastWriter {
    tx: Arc<broadcast::Sender<String>>,
}

impl BroadcastWriter {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx: Arc::new(tx) }
    }
}

impl io::Write for BroadcastWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(line) = std::str::from_utf8(buf) {
            let _ = self.tx.send(line.trim_end().to_string());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for BroadcastWriter {
    type Writer = BroadcastWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// A `tracing_subscriber` layer that formats events compactly (no ANSI,
/// one line each) and forwards them onto `log_tx`, for
/// `companion_supervisor` to add alongside its normal stdout layer.
pub fn layer<S>(log_tx: broadcast::Sender<String>) -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(BroadcastWriter::new(log_tx))
}
