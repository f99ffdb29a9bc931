//! Structured, queue-backed logging.
//!
//! [`setup`] installs a global `tracing` subscriber that formats every
//! event as one JSON object per line. Formatting happens on the thread
//! that emits the event; writing does not. Each record is pushed onto a
//! channel and a dedicated drain thread writes it out, so a slow sink
//! never stalls the worker.
//!
//! ```rust,ignore
//! fn main() -> Result<(), ferry::Error> {
//!     let _logs = ferry::logging::setup()?;
//!
//!     tracing::info!(answer = 42, "ready");
//!     Ok(())
//! }
//! ```
//!
//! The level filter is read from `RUST_LOG` and defaults to `info`.

use crate::error::Error;

use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "info";

/// Name of the drain thread.
const DRAIN_THREAD_NAME: &str = "ferry-log";

enum Message {
    Record(Vec<u8>),
    Shutdown,
}

/// Installs the JSON logging pipeline writing to stderr.
///
/// Keep the returned guard alive for as long as logs should be written;
/// dropping it flushes pending records and stops the drain thread.
///
/// # Errors
///
/// - [`Error::ResourceExhausted`] if the drain thread cannot be spawned.
/// - [`Error::Logging`] if a global subscriber is already installed.
pub fn setup() -> Result<LogGuard, Error> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    setup_with_filter(filter)
}

/// Like [`setup`], with an explicit filter.
pub fn setup_with_filter(filter: EnvFilter) -> Result<LogGuard, Error> {
    let (writer, guard) = queue(io::stderr())?;

    tracing_subscriber::registry()
        .with(json_layer(writer))
        .with(filter)
        .try_init()?;

    Ok(guard)
}

/// Creates a queue-backed writer draining into `sink`.
///
/// The writer can be cloned and shared between threads; records are
/// written to `sink` in the order they were queued.
pub fn queue<W>(sink: W) -> Result<(QueueWriter, LogGuard), Error>
where
    W: Write + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();

    let drain = thread::Builder::new()
        .name(DRAIN_THREAD_NAME.to_owned())
        .spawn(move || drain(receiver, sink))
        .map_err(Error::ResourceExhausted)?;

    Ok((
        QueueWriter {
            sender: sender.clone(),
        },
        LogGuard {
            sender,
            drain: Some(drain),
        },
    ))
}

/// The JSON formatting layer used by [`setup`].
///
/// Records carry `timestamp`, `level`, `target`, `filename`,
/// `line_number`, `threadName` and the event fields, `message` included,
/// at the top level.
pub fn json_layer<S>(writer: QueueWriter) -> impl Layer<S> + Send + Sync + 'static
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_writer(writer)
}

fn drain<W: Write>(receiver: Receiver<Message>, mut sink: W) {
    for message in receiver {
        match message {
            Message::Record(bytes) => {
                // Nowhere left to report a failing sink.
                let _ = sink.write_all(&bytes);
            }
            Message::Shutdown => break,
        }
    }

    let _ = sink.flush();
}

/// A [`MakeWriter`] that queues formatted records for the drain thread.
#[derive(Clone)]
pub struct QueueWriter {
    sender: Sender<Message>,
}

impl<'a> MakeWriter<'a> for QueueWriter {
    type Writer = Record;

    fn make_writer(&'a self) -> Self::Writer {
        Record {
            bytes: Vec::new(),
            sender: self.sender.clone(),
        }
    }
}

/// One formatted record, queued when dropped.
pub struct Record {
    bytes: Vec<u8>,
    sender: Sender<Message>,
}

impl Write for Record {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for Record {
    fn drop(&mut self) {
        if self.bytes.is_empty() {
            return;
        }

        let bytes = std::mem::take(&mut self.bytes);
        let _ = self.sender.send(Message::Record(bytes));
    }
}

/// Keeps the drain thread alive.
///
/// Dropping the guard writes out every queued record, flushes the sink
/// and joins the drain thread. Records emitted afterwards are discarded.
pub struct LogGuard {
    sender: Sender<Message>,
    drain: Option<JoinHandle<()>>,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        let _ = self.sender.send(Message::Shutdown);

        if let Some(drain) = self.drain.take() {
            let _ = drain.join();
        }
    }
}
