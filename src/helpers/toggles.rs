//! Offline-testing toggles.
//!
//! Each toggle gates one family of callback-issuing helpers. When off, the
//! helper returns its documented placeholder and issues no callback at all —
//! the host never sees a frame for a disabled capability. Read once at
//! startup from the environment (mirroring `resource::install_cpu_limit`'s
//! env-gated setup) and flippable at runtime through the `set_llm_enabled`/
//! `set_memory_enabled`/`set_verify_enabled` helpers this module registers
//! into the namespace, so a test snippet can go offline mid-session without
//! a restart.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use rhai::Engine;

pub struct HelperToggles {
    pub llm_enabled: AtomicBool,
    pub memory_enabled: AtomicBool,
    pub verify_enabled: AtomicBool,
}

impl Default for HelperToggles {
    fn default() -> Self {
        Self {
            llm_enabled: AtomicBool::new(!env_flag_set("RECURSE_DISABLE_LLM")),
            memory_enabled: AtomicBool::new(!env_flag_set("RECURSE_DISABLE_MEMORY")),
            verify_enabled: AtomicBool::new(!env_flag_set("RECURSE_DISABLE_VERIFY")),
        }
    }
}

impl HelperToggles {
    pub fn llm(&self) -> bool {
        self.llm_enabled.load(Ordering::Relaxed)
    }

    pub fn memory(&self) -> bool {
        self.memory_enabled.load(Ordering::Relaxed)
    }

    pub fn verify(&self) -> bool {
        self.verify_enabled.load(Ordering::Relaxed)
    }

    pub fn set_llm(&self, enabled: bool) {
        self.llm_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn set_memory(&self, enabled: bool) {
        self.memory_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn set_verify(&self, enabled: bool) {
        self.verify_enabled.store(enabled, Ordering::Relaxed);
    }
}

/// Any non-empty value other than `0`/`false` counts as "set", matching the
/// loose truthiness the rest of the pack uses for boolean env flags.
fn env_flag_set(name: &str) -> bool {
    match std::env::var(name) {
        Ok(value) => !matches!(value.as_str(), "" | "0" | "false"),
        Err(_) => false,
    }
}

/// Registers the six `set_*_enabled` helpers user code can call to flip a
/// subsystem offline mid-session without restarting the worker.
pub fn register(engine: &mut Engine, toggles: Rc<HelperToggles>) {
    {
        let toggles = toggles.clone();
        engine.register_fn("set_llm_enabled", move |on: bool| toggles.set_llm(on));
    }
    {
        let toggles = toggles.clone();
        engine.register_fn("set_memory_enabled", move |on: bool| toggles.set_memory(on));
    }
    {
        let toggles = toggles.clone();
        engine.register_fn("set_verify_enabled", move |on: bool| toggles.set_verify(on));
    }
    {
        let toggles = toggles.clone();
        engine.register_fn("llm_enabled", move || toggles.llm());
    }
    {
        let toggles = toggles.clone();
        engine.register_fn("memory_enabled", move || toggles.memory());
    }
    engine.register_fn("verify_enabled", move || toggles.verify());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_enabled_when_env_unset() {
        std::env::remove_var("RECURSE_DISABLE_LLM");
        std::env::remove_var("RECURSE_DISABLE_MEMORY");
        std::env::remove_var("RECURSE_DISABLE_VERIFY");
        let toggles = HelperToggles::default();
        assert!(toggles.llm());
        assert!(toggles.memory());
        assert!(toggles.verify());
    }

    #[test]
    fn runtime_toggle_flips_immediately() {
        let toggles = HelperToggles::default();
        toggles.set_llm(false);
        assert!(!toggles.llm());
        toggles.set_llm(true);
        assert!(toggles.llm());
    }
}
