use std::mem;

/// Longest line the splitter buffers before giving up on it
pub const MAX_LINE_BYTES: usize = 16 * 1024;

/// Output of the splitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Line content without the terminating newline
    Complete(Vec<u8>),
    /// A line exceeded the limit; its bytes up to the next newline are dropped
    Overlong,
}

/// Turns an incremental byte stream into complete lines.
///
/// Bytes after the last newline stay buffered until the next [`push`] so a
/// record written in several pieces comes out as one line. A line growing past
/// the limit is reported once as [`Line::Overlong`] and skipped up to its
/// newline.
///
/// [`push`]: LineBuffer::push
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    max_line_bytes: usize,
    /// Dropping bytes until the next newline
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::with_max_line_bytes(MAX_LINE_BYTES)
    }

    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line_bytes,
            discarding: false,
        }
    }

    /// Silently drop everything up to the first newline, for readers that
    /// start in the middle of a line
    pub fn skip_first_line(mut self) -> Self {
        self.discarding = true;
        self
    }

    /// Bytes of the incomplete trailing line held so far
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn push(&mut self, mut chunk: &[u8]) -> Vec<Line> {
        let mut lines = Vec::new();

        while !chunk.is_empty() {
            let (segment, rest) = match chunk.iter().position(|&b| b == b'\n') {
                Some(i) => (&chunk[..i], Some(&chunk[i + 1..])),
                None => (chunk, None),
            };

            if self.discarding {
                self.discarding = rest.is_none();
            } else if self.pending.len() + segment.len() > self.max_line_bytes {
                self.pending.clear();
                self.discarding = rest.is_none();
                lines.push(Line::Overlong);
            } else {
                self.pending.extend_from_slice(segment);
                if rest.is_some() {
                    lines.push(Line::Complete(mem::take(&mut self.pending)));
                }
            }

            chunk = rest.unwrap_or_default();
        }

        lines
    }

    /// Flush the trailing fragment once the source has ended
    pub fn finish(&mut self) -> Option<Line> {
        if mem::take(&mut self.discarding) || self.pending.is_empty() {
            self.pending.clear();
            return None;
        }
        Some(Line::Complete(mem::take(&mut self.pending)))
    }
}
