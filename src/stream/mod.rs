//! Row streaming engine
//!
//! Four read modes share one pipeline: bytes go through a [`LineBuffer`],
//! each complete line is decoded into a [`Row`] and delivered over a bounded
//! queue to a single consumer holding the [`RowStream`].
//!
//! - [`StreamReader::read_all`] / [`StreamReader::read_tail`]: bounded reads
//!   of a file (whole, or the last N bytes) that end at end-of-file.
//! - [`StreamReader::watch_file`]: follows data appended to a file, driven by
//!   filesystem notifications.
//! - [`StreamReader::watch_stream`]: follows an open byte source such as
//!   stdin until it ends.
//!
//! Every stream runs on its own worker thread, which owns the file handle or
//! watcher and is the only writer to the queue. Malformed and overlong lines
//! are delivered in-band as error rows. Cancelling the [`CancelScope`] stops
//! the worker, releases its resources and closes the queue.

mod bounded;
pub mod cancel;
pub mod decode;
pub mod error;
pub mod lines;
mod watch;

pub use cancel::CancelScope;
pub use error::StreamError;
pub use lines::{Line, LineBuffer, MAX_LINE_BYTES};

use crate::filter::Filter;
use crate::row::Row;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, select};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Tunables of the streaming engine, read from the `[stream]` settings table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Rows buffered between a worker and its consumer
    pub queue_capacity: usize,
    /// Size of a single read from the source
    pub read_chunk_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            read_chunk_bytes: 8 * 1024,
        }
    }
}

/// Lifecycle of a stream. `Eof`, `Error` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StreamState {
    Init = 0,
    Streaming = 1,
    Eof = 2,
    Error = 3,
    Cancelled = 4,
}

impl StreamState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => StreamState::Init,
            1 => StreamState::Streaming,
            2 => StreamState::Eof,
            3 => StreamState::Error,
            _ => StreamState::Cancelled,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StreamState::Eof | StreamState::Error | StreamState::Cancelled
        )
    }
}

/// Consumer end of a stream
///
/// Yields rows until the worker finishes or the stream's scope is cancelled.
/// Dropping it makes the worker stop at its next delivery.
#[derive(Debug)]
pub struct RowStream {
    rows: Receiver<Row>,
    cancel: CancelScope,
    state: Arc<AtomicU8>,
    worker: Option<JoinHandle<()>>,
}

impl RowStream {
    /// Block until the next row. `None` once the stream is closed or cancelled.
    pub fn recv(&self) -> Option<Row> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let row = select! {
            recv(self.rows) -> row => row.ok(),
            recv(self.cancel.signal()) -> _ => None,
        };
        row.filter(|_| !self.cancel.is_cancelled())
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Row, RecvTimeoutError> {
        if self.cancel.is_cancelled() {
            return Err(RecvTimeoutError::Disconnected);
        }
        let row = select! {
            recv(self.rows) -> row => row.map_err(|_| RecvTimeoutError::Disconnected),
            recv(self.cancel.signal()) -> _ => Err(RecvTimeoutError::Disconnected),
            default(timeout) => Err(RecvTimeoutError::Timeout),
        };
        if self.cancel.is_cancelled() {
            return Err(RecvTimeoutError::Disconnected);
        }
        row
    }

    pub fn state(&self) -> StreamState {
        StreamState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Stop consuming and wait for the worker to release its resources.
    /// A watch worker idle between notifications only stops once cancelled.
    pub fn join(mut self) -> StreamState {
        let worker = self.worker.take();
        let state = Arc::clone(&self.state);
        drop(self);
        if let Some(worker) = worker
            && worker.join().is_err()
        {
            tracing::warn!("stream worker panicked");
            return StreamState::Error;
        }
        StreamState::from_u8(state.load(Ordering::SeqCst))
    }
}

impl Iterator for RowStream {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.recv()
    }
}

/// Opens streams over files and byte sources
#[derive(Debug, Clone, Default)]
pub struct StreamReader {
    config: StreamConfig,
}

impl StreamReader {
    pub fn new(config: StreamConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

/// Producer end handed to a stream worker
pub(crate) struct Emitter {
    rows: Sender<Row>,
    cancel: CancelScope,
}

impl Emitter {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn cancel_signal(&self) -> &Receiver<()> {
        self.cancel.signal()
    }

    /// Deliver a row, waiting while the queue is full. Returns `false` when the
    /// stream was cancelled or the consumer has gone away.
    pub(crate) fn send(&self, row: Row) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        select! {
            send(self.rows, row) -> sent => sent.is_ok(),
            recv(self.cancel.signal()) -> _ => false,
        }
    }

    /// Decode and deliver lines. Data rows rejected by `filter` are dropped;
    /// error rows always go through.
    pub(crate) fn deliver(
        &self,
        lines: impl IntoIterator<Item = Line>,
        filter: Option<&Filter>,
    ) -> bool {
        for line in lines {
            let Some(row) = decode::line_to_row(line) else {
                continue;
            };
            if !row.is_error() && !filter.is_none_or(|f| f.matches(&row)) {
                continue;
            }
            if !self.send(row) {
                return false;
            }
        }
        true
    }
}

/// Run `work` on a new named thread feeding a fresh bounded queue
pub(crate) fn spawn_worker<F>(
    name: &str,
    config: &StreamConfig,
    cancel: &CancelScope,
    work: F,
) -> Result<RowStream, StreamError>
where
    F: FnOnce(&Emitter) -> StreamState + Send + 'static,
{
    let (rows_tx, rows_rx) = bounded(config.queue_capacity.max(1));
    let state = Arc::new(AtomicU8::new(StreamState::Init as u8));
    let emitter = Emitter {
        rows: rows_tx,
        cancel: cancel.clone(),
    };

    let worker_state = Arc::clone(&state);
    let worker = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            worker_state.store(StreamState::Streaming as u8, Ordering::SeqCst);
            let end = work(&emitter);
            worker_state.store(end as u8, Ordering::SeqCst);
            tracing::debug!(state = ?end, "stream worker finished");
            // closes the queue
            drop(emitter);
        })
        .map_err(StreamError::Spawn)?;

    Ok(RowStream {
        rows: rows_rx,
        cancel: cancel.clone(),
        state,
        worker: Some(worker),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trip_and_terminal() {
        for state in [
            StreamState::Init,
            StreamState::Streaming,
            StreamState::Eof,
            StreamState::Error,
            StreamState::Cancelled,
        ] {
            assert_eq!(StreamState::from_u8(state as u8), state);
        }
        assert!(!StreamState::Streaming.is_terminal());
        assert!(StreamState::Cancelled.is_terminal());
    }

    #[test]
    fn test_worker_closes_queue_on_return() {
        let cancel = CancelScope::new();
        let stream = spawn_worker("test", &StreamConfig::default(), &cancel, |emitter| {
            emitter.send(Row::default());
            StreamState::Eof
        })
        .unwrap();

        let rows: Vec<Row> = stream.collect();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_send_refused_after_cancel() {
        let cancel = CancelScope::new();
        let stream = spawn_worker("test", &StreamConfig::default(), &cancel, |emitter| {
            while !emitter.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            if emitter.send(Row::default()) {
                StreamState::Eof
            } else {
                StreamState::Cancelled
            }
        })
        .unwrap();

        cancel.cancel();
        assert!(stream.recv().is_none());
        assert_eq!(stream.join(), StreamState::Cancelled);
    }

    #[test]
    fn test_dropping_stream_stops_worker() {
        let cancel = CancelScope::new();
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let stream = spawn_worker("test", &StreamConfig::default(), &cancel, move |emitter| {
            while emitter.send(Row::default()) {}
            let _ = done_tx.send(());
            StreamState::Cancelled
        })
        .unwrap();

        assert!(stream.recv().is_some());
        drop(stream);
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_producer_blocks_on_full_queue_until_cancelled() {
        let cancel = CancelScope::new();
        let config = StreamConfig {
            queue_capacity: 1,
            ..StreamConfig::default()
        };
        let stream = spawn_worker("test", &config, &cancel, |emitter| {
            loop {
                if !emitter.send(Row::default()) {
                    return StreamState::Cancelled;
                }
            }
        })
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        assert_eq!(stream.state(), StreamState::Streaming);
        cancel.cancel();
        assert_eq!(stream.join(), StreamState::Cancelled);
    }
}
