//! The helper registry: every function preloaded into the evaluation
//! namespace, either a pure data transform or a callback-issuing bridge into
//! the host. `register_all` is the single entry point `main.rs` calls once
//! per worker, before the first `execute`.

pub mod final_helpers;
pub mod llm;
pub mod memory;
pub mod toggles;
pub mod transforms;
pub mod verify;

use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;

use rhai::Engine;

use crate::callback::CallbackChannel;
use crate::final_output::FinalOutputSlot;
use crate::namespace::Namespace;
pub use toggles::HelperToggles;

/// Every identifier the helper registry installs — used to seed
/// `Namespace`'s preloaded-name set so `list_vars`/reconciliation never
/// report a helper as if it were user state.
const HELPER_NAMES: &[&str] = &[
    "peek",
    "grep",
    "partition",
    "partition_by_lines",
    "extract_functions",
    "count_tokens_approx",
    "llm_call",
    "llm_batch",
    "summarize",
    "map_reduce",
    "find_relevant",
    "memory_query",
    "memory_add_fact",
    "memory_add_experience",
    "memory_get_context",
    "memory_relate",
    "verify_claim",
    "verify_claims",
    "audit_trace",
    "FINAL",
    "FINAL_VAR",
    "FINAL_JSON",
    "FINAL_CODE",
    "has_final_output",
    "get_final_output",
    "clear_final_output",
    "set_llm_enabled",
    "set_memory_enabled",
    "set_verify_enabled",
    "llm_enabled",
    "memory_enabled",
    "verify_enabled",
];

pub fn register_all<R, W>(
    engine: &mut Engine,
    channel: Rc<RefCell<CallbackChannel<R, W>>>,
    toggles: Rc<HelperToggles>,
    final_output: FinalOutputSlot,
    namespace: &mut Namespace,
) where
    R: BufRead + 'static,
    W: Write + 'static,
{
    transforms::register(engine);
    llm::register(engine, channel.clone(), toggles.clone());
    memory::register(engine, channel.clone(), toggles.clone());
    verify::register(engine, channel, toggles.clone());
    final_helpers::register(engine, final_output);
    toggles::register(engine, toggles);

    for name in HELPER_NAMES {
        namespace.mark_preloaded(name);
    }
}
