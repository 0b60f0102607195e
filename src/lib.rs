//! recurse-worker — sandboxed code-evaluation worker.
//!
//! Reads line-delimited JSON commands on stdin, executes snippets of script
//! against a persistent namespace, and replies on stdout. Evaluated code can
//! call back into the host synchronously, over the same pipe, to reach an
//! LLM, a memory store, or a claim verifier.
//!
//! The binary entrypoint is `main.rs`; everything else lives here so the
//! `tests/` suite can drive the dispatcher without spawning a real process.

pub mod callback;
pub mod dispatcher;
pub mod evaluator;
pub mod final_output;
pub mod frame;
pub mod helpers;
pub mod namespace;
pub mod protocol;
pub mod resource;
