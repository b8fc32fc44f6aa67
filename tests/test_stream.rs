use logview::filter::Filter;
use logview::row::{Row, RowError};
use logview::stream::{CancelScope, MAX_LINE_BYTES, StreamError, StreamReader, StreamState};
use serde_json::json;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Cursor, Read, Write};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

const ROW_TIMEOUT: Duration = Duration::from_secs(5);
const QUIET_PERIOD: Duration = Duration::from_millis(300);

fn append(path: &Path, content: &[u8]) {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .expect("open for append");
    file.write_all(content).expect("append");
    file.flush().expect("flush");
}

fn field(row: &Row, name: &str) -> serde_json::Value {
    row.get(name).cloned().unwrap_or(serde_json::Value::Null)
}

#[test]
fn test_read_all_yields_every_row_then_eof() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("app.log");
    fs::write(
        &path,
        "{\"n\":1}\n\n{\"n\":2}\nnot json\n{\"n\":3}",
    )
    .expect("write log");

    let cancel = CancelScope::new();
    let mut stream = StreamReader::default()
        .read_all(&path, &Filter::all(), &cancel)
        .expect("stream");
    let rows: Vec<Row> = stream.by_ref().collect();

    assert_eq!(rows.len(), 4);
    assert_eq!(field(&rows[0], "n"), json!(1));
    assert_eq!(field(&rows[1], "n"), json!(2));
    assert!(matches!(rows[2].error(), Some(RowError::Decode(_))));
    assert_eq!(field(&rows[3], "n"), json!(3));
    assert_eq!(stream.join(), StreamState::Eof);
}

#[test]
fn test_read_tail_skips_cut_line_and_filters() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("app.log");
    let content = "{\"level\":\"info\",\"n\":1}\n{\"level\":\"error\",\"n\":2}\n{\"level\":\"info\",\"n\":3}\n{\"level\":\"error\",\"n\":4}\n";
    fs::write(&path, content).expect("write log");

    let cancel = CancelScope::new();
    let filter = Filter::compile("level = error").expect("filter");
    // starts inside the second line, which must be skipped even though it matches
    let offset = (content.len() - 30) as u64;
    let rows: Vec<Row> = StreamReader::default()
        .read_tail(&path, offset, &filter, &cancel)
        .expect("stream")
        .collect();

    let numbers: Vec<_> = rows.iter().map(|row| field(row, "n")).collect();
    assert_eq!(numbers, vec![json!(4)]);
}

#[test]
fn test_read_tail_offset_beyond_length_reads_whole_file() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("app.log");
    fs::write(&path, "{\"n\":1}\n{\"n\":2}\n").expect("write log");

    let cancel = CancelScope::new();
    let rows: Vec<Row> = StreamReader::default()
        .read_tail(&path, 10_000, &Filter::all(), &cancel)
        .expect("stream")
        .collect();
    assert_eq!(rows.len(), 2);
}

#[test]
fn test_filtered_read_keeps_error_rows() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("app.log");
    fs::write(&path, "{\"level\":\"info\"}\n{broken\n").expect("write log");

    let cancel = CancelScope::new();
    let filter = Filter::compile("level = error").expect("filter");
    let rows: Vec<Row> = StreamReader::default()
        .read_all(&path, &filter, &cancel)
        .expect("stream")
        .collect();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_error());
}

#[test]
fn test_missing_file_fails_before_streaming() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("missing.log");
    let cancel = CancelScope::new();
    let reader = StreamReader::default();

    assert!(matches!(
        reader.read_all(&path, &Filter::all(), &cancel),
        Err(StreamError::Open { .. })
    ));
    assert!(matches!(
        reader.watch_file(&path, &cancel),
        Err(StreamError::Open { .. })
    ));
}

#[test]
fn test_watch_file_yields_appended_row() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("app.log");
    fs::write(&path, "{\"field\":\"old\"}\n").expect("write log");

    let cancel = CancelScope::new();
    let stream = StreamReader::default()
        .watch_file(&path, &cancel)
        .expect("stream");

    append(&path, b"{\"field\":\"456\"}\n");
    let row = stream.recv_timeout(ROW_TIMEOUT).expect("appended row");
    assert_eq!(field(&row, "field"), json!("456"));
    assert!(stream.recv_timeout(QUIET_PERIOD).is_err());

    cancel.cancel();
    assert_eq!(stream.join(), StreamState::Cancelled);
}

#[test]
fn test_watch_file_joins_split_write() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("app.log");
    File::create(&path).expect("create log");

    let cancel = CancelScope::new();
    let stream = StreamReader::default()
        .watch_file(&path, &cancel)
        .expect("stream");

    append(&path, b"{\"field\":\"45");
    thread::sleep(QUIET_PERIOD);
    append(&path, b"6\"}\n");

    let row = stream.recv_timeout(ROW_TIMEOUT).expect("joined row");
    assert_eq!(field(&row, "field"), json!("456"));
    assert!(stream.recv_timeout(QUIET_PERIOD).is_err());
    cancel.cancel();
}

#[test]
fn test_watch_file_ignores_empty_line() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("app.log");
    File::create(&path).expect("create log");

    let cancel = CancelScope::new();
    let stream = StreamReader::default()
        .watch_file(&path, &cancel)
        .expect("stream");

    append(&path, b"\n");
    assert!(stream.recv_timeout(QUIET_PERIOD).is_err());
    cancel.cancel();
}

#[test]
fn test_watch_file_reports_overlong_line_once() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("app.log");
    File::create(&path).expect("create log");

    let cancel = CancelScope::new();
    let stream = StreamReader::default()
        .watch_file(&path, &cancel)
        .expect("stream");

    let mut overlong = b"{\"field\":\"".to_vec();
    overlong.extend(std::iter::repeat_n(b'x', MAX_LINE_BYTES + 10));
    overlong.extend_from_slice(b"\"}\n");
    append(&path, &overlong);
    append(&path, b"{\"field\":\"after\"}\n");

    let first = stream.recv_timeout(ROW_TIMEOUT).expect("error row");
    assert_eq!(first.error(), Some(&RowError::Overlong));
    assert_eq!(first.error().map(ToString::to_string).as_deref(), Some("line is overlong"));

    let second = stream.recv_timeout(ROW_TIMEOUT).expect("following row");
    assert_eq!(field(&second, "field"), json!("after"));
    assert!(stream.recv_timeout(QUIET_PERIOD).is_err());
    cancel.cancel();
}

#[test]
fn test_cancelled_watch_delivers_nothing_more() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("app.log");
    File::create(&path).expect("create log");

    let cancel = CancelScope::new();
    let stream = StreamReader::default()
        .watch_file(&path, &cancel)
        .expect("stream");

    cancel.cancel();
    append(&path, b"{\"field\":\"late\"}\n");
    assert!(stream.recv().is_none());

    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || done_tx.send(stream.join()));
    assert_eq!(
        done_rx.recv_timeout(ROW_TIMEOUT).expect("worker exits promptly"),
        StreamState::Cancelled
    );
}

#[test]
fn test_watch_stream_reads_until_source_ends() {
    let source = Cursor::new(b"{\"n\":1}\n\n{\"n\":2}\n{\"n\":3}".to_vec());
    let cancel = CancelScope::new();
    let mut stream = StreamReader::default()
        .watch_stream(source, &cancel)
        .expect("stream");

    let numbers: Vec<_> = stream.by_ref().map(|row| field(&row, "n")).collect();
    assert_eq!(numbers, vec![json!(1), json!(2), json!(3)]);
    assert_eq!(stream.join(), StreamState::Eof);
}

/// Byte source fed by a channel; reads block until a chunk arrives
struct ChannelSource {
    chunks: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl Read for ChannelSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.chunks.recv() {
                Ok(chunk) => self.pending = chunk,
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

#[test]
fn test_watch_stream_cancel_while_read_blocks() {
    let (chunks_tx, chunks_rx) = mpsc::channel();
    let source = ChannelSource {
        chunks: chunks_rx,
        pending: Vec::new(),
    };
    let cancel = CancelScope::new();
    let stream = StreamReader::default()
        .watch_stream(source, &cancel)
        .expect("stream");

    chunks_tx.send(b"{\"field\":\"45".to_vec()).expect("send");
    chunks_tx.send(b"6\"}\n".to_vec()).expect("send");
    let row = stream.recv_timeout(ROW_TIMEOUT).expect("row");
    assert_eq!(field(&row, "field"), json!("456"));

    // the source now blocks with nothing to read
    cancel.cancel();
    assert!(stream.recv().is_none());
    assert_eq!(stream.join(), StreamState::Cancelled);
}
