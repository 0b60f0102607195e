//! The `FINAL` helper family: stages the value that `execute`'s
//! final-output register reports, distinct from the trailing expression's
//! `return_value`.

use rhai::{Dynamic, Engine, NativeCallContext};
use serde_json::Value;

use crate::final_output::{FinalKind, FinalOutputSlot};

pub fn register(engine: &mut Engine, slot: FinalOutputSlot) {
    {
        let slot = slot.clone();
        // Returns `content` back, unchanged — so `FINAL(expr)` both stages
        // the final output and still yields `expr`'s value as the
        // enclosing snippet's trailing-expression result.
        engine.register_fn("FINAL", move |content: &str| -> String {
            slot.set(content.to_string(), FinalKind::Text, Value::Null);
            content.to_string()
        });
    }
    {
        let slot = slot.clone();
        engine.register_fn("FINAL", move |content: &str, kind: &str| -> String {
            slot.set(content.to_string(), parse_kind(kind), Value::Null);
            content.to_string()
        });
    }
    {
        let slot = slot.clone();
        engine.register_fn("FINAL_VAR", move |context: NativeCallContext, name: &str| {
            let value = context
                .scope()
                .get_value::<Dynamic>(name)
                .map(|v| v.to_string())
                .unwrap_or_default();
            slot.set(value, FinalKind::Text, Value::Null);
        });
    }
    {
        let slot = slot.clone();
        engine.register_fn("FINAL_JSON", move |value: Dynamic| {
            let json = rhai::serde::from_dynamic::<Value>(&value).unwrap_or(Value::Null);
            let content = serde_json::to_string(&json).unwrap_or_default();
            slot.set(content, FinalKind::Json, Value::Null);
        });
    }
    {
        let slot = slot.clone();
        engine.register_fn("FINAL_CODE", move |content: &str, language: &str| {
            slot.set(content.to_string(), FinalKind::Code, serde_json::json!({"language": language}));
        });
    }
    {
        let slot = slot.clone();
        engine.register_fn("has_final_output", move || slot.has());
    }
    {
        let slot = slot.clone();
        engine.register_fn("get_final_output", move || -> Dynamic {
            match slot.get() {
                Some(out) => rhai::serde::to_dynamic(out).unwrap_or(Dynamic::UNIT),
                None => Dynamic::UNIT,
            }
        });
    }
    engine.register_fn("clear_final_output", move || {
        slot.clear();
    });
}

fn parse_kind(kind: &str) -> FinalKind {
    match kind {
        "json" => FinalKind::Json,
        "code" => FinalKind::Code,
        "markdown" => FinalKind::Markdown,
        _ => FinalKind::Text,
    }
}
