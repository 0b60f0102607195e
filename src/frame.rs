//! Frame I/O.
//!
//! One UTF-8 JSON object per `\n`-terminated line, nothing else. These
//! handles are captured exactly once, before user code can run, and never
//! touched again by anything except `Worker` and `CallbackChannel` — user
//! code that redirects "stdout" only ever affects the in-memory buffers the
//! evaluator installs (see `evaluator.rs`), never these handles.
//!
//! Generic over `BufRead`/`Write` so tests can drive the whole worker
//! through in-memory buffers instead of a real child process.

use std::io::{self, BufRead, Write};

pub struct FrameReader<R> {
    inner: R,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads one frame. `Ok(None)` means EOF — a fatal condition for the
    /// caller, since an EOF on `in` terminates the worker.
    pub fn read_frame(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let n = self.inner.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

pub struct FrameWriter<W> {
    inner: W,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Writes one frame and flushes immediately — every outgoing frame is
    /// flushed before the next one is written.
    pub fn write_frame(&mut self, line: &str) -> io::Result<()> {
        self.inner.write_all(line.as_bytes())?;
        self.inner.write_all(b"\n")?;
        self.inner.flush()
    }

    /// Exposes the underlying writer, e.g. so a test harness driving the
    /// worker through an in-memory `Vec<u8>` can inspect what was written.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_lines_stripping_newline() {
        let mut r = FrameReader::new(Cursor::new(b"{\"a\":1}\n{\"b\":2}\n".to_vec()));
        assert_eq!(r.read_frame().unwrap().as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(r.read_frame().unwrap().as_deref(), Some(r#"{"b":2}"#));
        assert_eq!(r.read_frame().unwrap(), None);
    }

    #[test]
    fn skips_blank_lines_are_returned_as_empty_not_swallowed() {
        // Blank-line skipping is the dispatcher's job, not the frame
        // reader's — it just returns whatever line it saw.
        let mut r = FrameReader::new(Cursor::new(b"\n{\"a\":1}\n".to_vec()));
        assert_eq!(r.read_frame().unwrap().as_deref(), Some(""));
        assert_eq!(r.read_frame().unwrap().as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn write_frame_appends_single_newline() {
        let mut buf = Vec::new();
        {
            let mut w = FrameWriter::new(&mut buf);
            w.write_frame(r#"{"id":0}"#).unwrap();
        }
        assert_eq!(buf, b"{\"id\":0}\n".to_vec());
    }
}
