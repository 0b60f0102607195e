//! The final-output register.
//!
//! User code calls a helper (`FINAL`, `FINAL_JSON`, `FINAL_CODE`, ...) to
//! stage the value that should be treated as the evaluation's deliverable,
//! distinct from whatever the trailing expression of a snippet happens to
//! evaluate to. Single slot; setting a new final output replaces the
//! previous one, and it is cleared only when user code asks for that
//! explicitly (it is not reset between `execute` calls).

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalKind {
    Text,
    Json,
    Code,
    Markdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalOutput {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: FinalKind,
    pub metadata: Value,
}

#[derive(Default, Clone)]
pub struct FinalOutputSlot {
    inner: Rc<RefCell<Option<FinalOutput>>>,
}

impl FinalOutputSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Rc<RefCell<Option<FinalOutput>>> {
        self.inner.clone()
    }

    pub fn set(&self, content: String, kind: FinalKind, metadata: Value) {
        *self.inner.borrow_mut() = Some(FinalOutput { content, kind, metadata });
    }

    pub fn clear(&self) {
        *self.inner.borrow_mut() = None;
    }

    pub fn has(&self) -> bool {
        self.inner.borrow().is_some()
    }

    pub fn get(&self) -> Option<FinalOutput> {
        self.inner.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let slot = FinalOutputSlot::new();
        assert!(!slot.has());
        assert!(slot.get().is_none());
    }

    #[test]
    fn setting_replaces_previous() {
        let slot = FinalOutputSlot::new();
        slot.set("first".into(), FinalKind::Text, Value::Null);
        slot.set("{\"ok\":true}".into(), FinalKind::Json, Value::Null);
        let out = slot.get().unwrap();
        assert_eq!(out.kind, FinalKind::Json);
        assert_eq!(out.content, "{\"ok\":true}");
    }

    #[test]
    fn clear_empties_slot() {
        let slot = FinalOutputSlot::new();
        slot.set("# hi".into(), FinalKind::Markdown, Value::Null);
        slot.clear();
        assert!(!slot.has());
    }

    #[test]
    fn survives_across_executions_until_explicitly_cleared() {
        // The slot is not reset between `execute` calls.
        let slot = FinalOutputSlot::new();
        slot.set("answer".into(), FinalKind::Text, Value::Null);
        assert!(slot.has());
        assert!(slot.has(), "a second, unrelated check must still see it set");
    }
}
