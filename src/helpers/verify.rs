//! Claim-verification helpers: `verify_claim`, `verify_claims`,
//! `audit_trace`. These issue `plugin_call` callbacks against a fixed
//! `claim_verifier`/`trace_auditor` plugin name, rather than a dedicated
//! callback type of their own.

use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;

use rhai::{Array, Dynamic, Engine, Map};
use serde_json::json;

use crate::callback::CallbackChannel;
use crate::helpers::toggles::HelperToggles;

pub fn register<R, W>(engine: &mut Engine, channel: Rc<RefCell<CallbackChannel<R, W>>>, toggles: Rc<HelperToggles>)
where
    R: BufRead + 'static,
    W: Write + 'static,
{
    {
        let channel = channel.clone();
        let toggles = toggles.clone();
        engine.register_fn("verify_claim", move |claim: &str| -> Map { verify_claim(&channel, &toggles, claim) });
    }
    {
        let channel = channel.clone();
        let toggles = toggles.clone();
        engine.register_fn("verify_claims", move |claims: Array| -> Array {
            claims
                .into_iter()
                .map(|c| Dynamic::from(verify_claim(&channel, &toggles, &c.into_string().unwrap_or_default())))
                .collect()
        });
    }
    {
        let channel = channel.clone();
        let toggles = toggles.clone();
        engine.register_fn("audit_trace", move |trace: &str| -> Map { audit_trace(&channel, &toggles, trace) });
    }
}

fn verify_disabled() -> Map {
    let mut m = Map::new();
    m.insert("verified".into(), Dynamic::UNIT);
    m.insert("reason".into(), Dynamic::from("verification disabled".to_string()));
    m
}

fn audit_disabled() -> Map {
    let mut m = Map::new();
    m.insert("issues".into(), Dynamic::from(Array::new()));
    m.insert("reason".into(), Dynamic::from("verification disabled".to_string()));
    m
}

fn verify_claim<R: BufRead, W: Write>(
    channel: &Rc<RefCell<CallbackChannel<R, W>>>,
    toggles: &HelperToggles,
    claim: &str,
) -> Map {
    if !toggles.verify() {
        return verify_disabled();
    }
    let params = json!({"plugin": "claim_verifier", "claim": claim});
    match channel.borrow_mut().call_or_exit("plugin_call", params) {
        Ok(value) => json_object_to_map(&value),
        Err(_) => verify_disabled(),
    }
}

fn audit_trace<R: BufRead, W: Write>(
    channel: &Rc<RefCell<CallbackChannel<R, W>>>,
    toggles: &HelperToggles,
    trace: &str,
) -> Map {
    if !toggles.verify() {
        return audit_disabled();
    }
    let params = json!({"plugin": "trace_auditor", "trace": trace});
    match channel.borrow_mut().call_or_exit("plugin_call", params) {
        Ok(value) => json_object_to_map(&value),
        Err(_) => audit_disabled(),
    }
}

fn json_object_to_map(value: &serde_json::Value) -> Map {
    rhai::serde::to_dynamic(value.clone())
        .ok()
        .and_then(|d| d.try_cast::<Map>())
        .unwrap_or_default()
}
