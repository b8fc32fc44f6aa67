use super::{Emitter, LineBuffer, RowStream, StreamError, StreamReader, StreamState, spawn_worker};
use crate::row::{Row, RowError};
use crate::stream::CancelScope;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::thread;
use tracing::{debug, warn};

/// Pending notifications; one queued event already guarantees a full read
const EVENT_QUEUE: usize = 64;

impl StreamReader {
    /// Follow rows appended to a file from now on.
    ///
    /// The file is opened at its current end and subscribed to before this
    /// returns, so anything written afterwards is seen.
    pub fn watch_file(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancelScope,
    ) -> Result<RowStream, StreamError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| StreamError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        file.seek(SeekFrom::End(0))
            .map_err(|source| StreamError::Seek {
                path: path.to_path_buf(),
                source,
            })?;

        let (events_tx, events_rx) = bounded(EVENT_QUEUE);
        let subscribe_err = |source: notify::Error| StreamError::Subscribe {
            path: path.to_path_buf(),
            source,
        };
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            if let Err(TrySendError::Disconnected(_)) = events_tx.try_send(event) {
                debug!("file watch worker is gone, dropping notification");
            }
        })
        .map_err(subscribe_err)?;
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(subscribe_err)?;
        debug!(path = %path.display(), "watching file");

        let chunk_bytes = self.config.read_chunk_bytes;
        spawn_worker("logview-watch", &self.config, cancel, move |emitter| {
            // owned by the worker so the subscription ends with it
            let _watcher = watcher;
            follow_file(file, events_rx, chunk_bytes, emitter)
        })
    }

    /// Follow rows arriving on an open byte source until it ends.
    ///
    /// The source is read on a helper thread, so a read blocked waiting for
    /// data never delays cancellation; the helper exits after its next read.
    pub fn watch_stream<R>(&self, reader: R, cancel: &CancelScope) -> Result<RowStream, StreamError>
    where
        R: Read + Send + 'static,
    {
        let (chunks_tx, chunks_rx) = bounded(1);
        let chunk_bytes = self.config.read_chunk_bytes;
        thread::Builder::new()
            .name("logview-source".to_string())
            .spawn(move || pump_chunks(reader, chunk_bytes, chunks_tx))
            .map_err(StreamError::Spawn)?;
        debug!("watching open stream");

        spawn_worker("logview-stream", &self.config, cancel, move |emitter| {
            follow_stream(chunks_rx, emitter)
        })
    }
}

fn is_data_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(_) | EventKind::Access(AccessKind::Close(AccessMode::Write))
    )
}

fn follow_file(
    mut file: File,
    events: Receiver<notify::Result<Event>>,
    chunk_bytes: usize,
    emitter: &Emitter,
) -> StreamState {
    let mut lines = LineBuffer::new();
    let mut buf = vec![0u8; chunk_bytes.max(1)];

    loop {
        select! {
            recv(emitter.cancel_signal()) -> _ => {
                debug!("file watch cancelled");
                return StreamState::Cancelled;
            }
            recv(events) -> event => {
                match event {
                    Ok(Ok(event)) if is_data_change(&event.kind) => {
                        if let Some(end) = read_available(&mut file, &mut lines, &mut buf, emitter) {
                            return end;
                        }
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => {
                        warn!(error = %err, "file notification failed");
                        if !emitter.send(Row::from_error(RowError::Watch(err.to_string()))) {
                            return StreamState::Cancelled;
                        }
                    }
                    Err(_) => {
                        warn!("file notifications stopped");
                        return StreamState::Error;
                    }
                }
            }
        }
    }
}

/// Read everything appended since the last call. `Some` ends the stream.
fn read_available(
    file: &mut File,
    lines: &mut LineBuffer,
    buf: &mut [u8],
    emitter: &Emitter,
) -> Option<StreamState> {
    loop {
        if emitter.is_cancelled() {
            return Some(StreamState::Cancelled);
        }
        match file.read(buf) {
            Ok(0) => return None,
            Ok(n) => {
                if !emitter.deliver(lines.push(&buf[..n]), None) {
                    return Some(StreamState::Cancelled);
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => {
                emitter.send(Row::from_error(RowError::Read(err.to_string())));
                return Some(StreamState::Error);
            }
        }
    }
}

fn pump_chunks(mut reader: impl Read, chunk_bytes: usize, chunks: Sender<io::Result<Vec<u8>>>) {
    let mut buf = vec![0u8; chunk_bytes.max(1)];
    loop {
        let chunk = match reader.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => Ok(buf[..n].to_vec()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => Err(err),
        };
        let failed = chunk.is_err();
        if chunks.send(chunk).is_err() || failed {
            return;
        }
    }
}

fn follow_stream(chunks: Receiver<io::Result<Vec<u8>>>, emitter: &Emitter) -> StreamState {
    let mut lines = LineBuffer::new();

    loop {
        select! {
            recv(emitter.cancel_signal()) -> _ => {
                debug!("stream watch cancelled");
                return StreamState::Cancelled;
            }
            recv(chunks) -> chunk => {
                match chunk {
                    Ok(Ok(bytes)) => {
                        if !emitter.deliver(lines.push(&bytes), None) {
                            return StreamState::Cancelled;
                        }
                    }
                    Ok(Err(err)) => {
                        emitter.send(Row::from_error(RowError::Read(err.to_string())));
                        return StreamState::Error;
                    }
                    // source ended
                    Err(_) => {
                        return if emitter.deliver(lines.finish(), None) {
                            StreamState::Eof
                        } else {
                            StreamState::Cancelled
                        };
                    }
                }
            }
        }
    }
}
