//! Synchronous worker->host callback channel.
//!
//! A helper function issues a callback by writing one frame to the captured
//! stdout and blocking on one frame from the captured stdin — the same pipes
//! the dispatcher uses for command traffic. Because the worker is
//! single-threaded and serializes one `execute` at a time, this never races
//! with the command loop: the command loop is itself blocked inside the
//! `execute` call that triggered the callback.

use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;

use crate::frame::{FrameReader, FrameWriter};
use crate::protocol::{CallbackRequest, CallbackResponse};

/// The shared stdio pair, read/write ends bundled so the dispatcher and the
/// callback channel can take turns driving the same pipes.
pub struct Io<R, W> {
    pub reader: FrameReader<R>,
    pub writer: FrameWriter<W>,
}

impl<R: BufRead, W: Write> Io<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader: FrameReader::new(reader), writer: FrameWriter::new(writer) }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("EOF while awaiting callback response")]
    Eof,
    #[error("I/O error during callback: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed callback response: {0}")]
    Malformed(String),
}

/// Issues callbacks over a shared `Io` and hands back either the host's
/// result or a recoverable helper-level error string.
pub struct CallbackChannel<R, W> {
    io: Rc<RefCell<Io<R, W>>>,
    next_id: u64,
}

impl<R: BufRead, W: Write> CallbackChannel<R, W> {
    pub fn new(io: Rc<RefCell<Io<R, W>>>) -> Self {
        Self { io, next_id: 0 }
    }

    /// Sends one callback of `kind` with `params` and blocks for the reply.
    ///
    /// `Ok(Ok(value))` — the host returned a `result`/`results` payload.
    /// `Ok(Err(message))` — the host returned a non-empty `error`: a
    /// recoverable failure the calling helper must turn into a placeholder,
    /// never a worker-level error.
    /// `Err(_)` — infrastructure failure (EOF, bad JSON): fatal.
    pub fn call(
        &mut self,
        kind: &str,
        params: serde_json::Value,
    ) -> Result<Result<serde_json::Value, String>, CallbackError> {
        self.next_id += 1;
        let callback_id = self.next_id;

        let request = CallbackRequest { callback: kind.to_string(), callback_id, params };
        let line = serde_json::to_string(&request)
            .map_err(|e| CallbackError::Malformed(e.to_string()))?;

        let mut io = self.io.borrow_mut();
        io.writer.write_frame(&line)?;

        let reply_line = io.reader.read_frame()?.ok_or(CallbackError::Eof)?;
        drop(io);

        let reply: CallbackResponse = serde_json::from_str(&reply_line)
            .map_err(|e| CallbackError::Malformed(format!("{e}: {reply_line}")))?;

        if let Some(err) = reply.error.filter(|e| !e.is_empty()) {
            return Ok(Err(err));
        }
        if let Some(results) = reply.results {
            return Ok(Ok(serde_json::Value::Array(results)));
        }
        Ok(Ok(reply.result.unwrap_or(serde_json::Value::Null)))
    }

    /// The id that the *next* call to `call` will use — exposed for tests
    /// that assert ids are strictly monotonically increasing starting from
    /// 1.
    pub fn peek_next_id(&self) -> u64 {
        self.next_id + 1
    }

    /// Convenience wrapper every helper in `helpers/` calls through: folds
    /// the recoverable-vs-fatal distinction into one call. A host-reported
    /// `error` comes back as `Err(message)` for the caller to turn into its
    /// documented placeholder; an infrastructure failure (EOF, malformed
    /// JSON) is fatal to the worker process and is handled here, not left
    /// for every helper to reimplement.
    pub fn call_or_exit(&mut self, kind: &str, params: serde_json::Value) -> Result<serde_json::Value, String> {
        match self.call(kind, params) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(message),
            Err(e) => {
                tracing::error!(callback = kind, error = %e, "fatal callback-channel failure, exiting");
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn channel(
        replies: &str,
    ) -> (CallbackChannel<Cursor<Vec<u8>>, Vec<u8>>, Rc<RefCell<Io<Cursor<Vec<u8>>, Vec<u8>>>>) {
        let io = Rc::new(RefCell::new(Io::new(Cursor::new(replies.as_bytes().to_vec()), Vec::new())));
        (CallbackChannel::new(io.clone()), io)
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let (mut chan, _io) = channel("{\"result\":\"a\"}\n{\"result\":\"b\"}\n");
        assert_eq!(chan.peek_next_id(), 1);
        let r1 = chan.call("llm_call", serde_json::json!({"prompt": "hi"})).unwrap();
        assert_eq!(r1, Ok(serde_json::json!("a")));
        let r2 = chan.call("llm_call", serde_json::json!({"prompt": "again"})).unwrap();
        assert_eq!(r2, Ok(serde_json::json!("b")));
    }

    #[test]
    fn writes_well_formed_callback_frame() {
        let (mut chan, io) = channel("{\"result\":null}\n");
        chan.call("memory_query", serde_json::json!({"query": "x"})).unwrap();
        let written = io.borrow().writer.get_ref().clone();
        let line = String::from_utf8(written).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed["callback"], "memory_query");
        assert_eq!(parsed["callback_id"], 1);
        assert_eq!(parsed["params"]["query"], "x");
    }

    #[test]
    fn non_empty_error_is_recoverable_not_fatal() {
        let (mut chan, _io) = channel("{\"error\":\"rate limited\"}\n");
        let result = chan.call("llm_call", serde_json::json!({})).unwrap();
        assert_eq!(result, Err("rate limited".to_string()));
    }

    #[test]
    fn eof_is_fatal() {
        let (mut chan, _io) = channel("");
        let err = chan.call("llm_call", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, CallbackError::Eof));
    }
}
