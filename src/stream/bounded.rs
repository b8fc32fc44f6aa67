use super::{Emitter, LineBuffer, RowStream, StreamError, StreamReader, StreamState, spawn_worker};
use crate::filter::Filter;
use crate::row::{Row, RowError};
use crate::stream::CancelScope;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

impl StreamReader {
    /// Stream every row of a file that matches `filter`, then close
    pub fn read_all(
        &self,
        path: impl AsRef<Path>,
        filter: &Filter,
        cancel: &CancelScope,
    ) -> Result<RowStream, StreamError> {
        self.read_tail(path, 0, filter, cancel)
    }

    /// Stream the rows found in the last `byte_offset` bytes of a file.
    ///
    /// The line cut by the offset is skipped. An offset of 0, or one covering
    /// the whole file, reads everything.
    pub fn read_tail(
        &self,
        path: impl AsRef<Path>,
        byte_offset: u64,
        filter: &Filter,
        cancel: &CancelScope,
    ) -> Result<RowStream, StreamError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| StreamError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| StreamError::Metadata {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        let mut lines = LineBuffer::new();
        if byte_offset > 0 && byte_offset < len {
            file.seek(SeekFrom::Start(len - byte_offset))
                .map_err(|source| StreamError::Seek {
                    path: path.to_path_buf(),
                    source,
                })?;
            lines = lines.skip_first_line();
        }
        debug!(path = %path.display(), byte_offset, len, "reading file");

        let filter = filter.clone();
        let chunk_bytes = self.config.read_chunk_bytes;
        spawn_worker("logview-read", &self.config, cancel, move |emitter| {
            read_to_end(file, lines, chunk_bytes, &filter, emitter)
        })
    }
}

fn read_to_end(
    mut source: impl Read,
    mut lines: LineBuffer,
    chunk_bytes: usize,
    filter: &Filter,
    emitter: &Emitter,
) -> StreamState {
    let mut buf = vec![0u8; chunk_bytes.max(1)];
    loop {
        if emitter.is_cancelled() {
            return StreamState::Cancelled;
        }
        match source.read(&mut buf) {
            Ok(0) => {
                return if emitter.deliver(lines.finish(), Some(filter)) {
                    StreamState::Eof
                } else {
                    StreamState::Cancelled
                };
            }
            Ok(n) => {
                if !emitter.deliver(lines.push(&buf[..n]), Some(filter)) {
                    return StreamState::Cancelled;
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => {
                emitter.send(Row::from_error(RowError::Read(err.to_string())));
                return StreamState::Error;
            }
        }
    }
}
