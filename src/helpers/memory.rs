//! Memory-store helpers: `memory_query`, `memory_add_fact`,
//! `memory_add_experience`, `memory_get_context`, `memory_relate`. Each maps
//! 1:1 onto a callback of the same name.

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
        engine.register_fn("memory_query", move |query: &str, limit: i64| -> Array {
            memory_query(&channel, &toggles, query, limit)
        });
    }
    {
        let channel = channel.clone();
        let toggles = toggles.clone();
        engine.register_fn("memory_add_fact", move |fact: &str, tags: Array| -> Map {
            memory_add_fact(&channel, &toggles, fact, tags)
        });
    }
    {
        let channel = channel.clone();
        let toggles = toggles.clone();
        engine.register_fn("memory_add_experience", move |experience: &str, outcome: &str| -> Map {
            memory_add_experience(&channel, &toggles, experience, outcome)
        });
    }
    {
        let channel = channel.clone();
        let toggles = toggles.clone();
        engine.register_fn("memory_get_context", move |topic: &str| -> String {
            memory_get_context(&channel, &toggles, topic)
        });
    }
    {
        let channel = channel.clone();
        let toggles = toggles.clone();
        engine.register_fn("memory_relate", move |a: &str, b: &str, relation: &str| -> Map {
            memory_relate(&channel, &toggles, a, b, relation)
        });
    }
}

fn disabled_result(reason: &str) -> Map {
    let mut m = Map::new();
    m.insert("ok".into(), Dynamic::from(false));
    m.insert("reason".into(), Dynamic::from(reason.to_string()));
    m
}

fn memory_query<R: BufRead, W: Write>(
    channel: &Rc<RefCell<CallbackChannel<R, W>>>,
    toggles: &HelperToggles,
    query: &str,
    limit: i64,
) -> Array {
    if !toggles.memory() {
        return Array::new();
    }
    let params = json!({"query": query, "limit": limit});
    match channel.borrow_mut().call_or_exit("memory_query", params) {
        Ok(value) => value
            .as_array()
            .map(|arr| arr.iter().map(|v| Dynamic::from(v.to_string())).collect())
            .unwrap_or_default(),
        Err(_) => Array::new(),
    }
}

fn memory_add_fact<R: BufRead, W: Write>(
    channel: &Rc<RefCell<CallbackChannel<R, W>>>,
    toggles: &HelperToggles,
    fact: &str,
    tags: Array,
) -> Map {
    if !toggles.memory() {
        return disabled_result("memory disabled");
    }
    let tag_strings: Vec<String> = tags.into_iter().map(|t| t.into_string().unwrap_or_default()).collect();
    let params = json!({"fact": fact, "tags": tag_strings});
    match channel.borrow_mut().call_or_exit("memory_add_fact", params) {
        Ok(_) => {
            let mut m = Map::new();
            m.insert("ok".into(), Dynamic::from(true));
            m
        }
        Err(_) => disabled_result("memory disabled"),
    }
}

fn memory_add_experience<R: BufRead, W: Write>(
    channel: &Rc<RefCell<CallbackChannel<R, W>>>,
    toggles: &HelperToggles,
    experience: &str,
    outcome: &str,
) -> Map {
    if !toggles.memory() {
        return disabled_result("memory disabled");
    }
    let params = json!({"experience": experience, "outcome": outcome});
    match channel.borrow_mut().call_or_exit("memory_add_experience", params) {
        Ok(_) => {
            let mut m = Map::new();
            m.insert("ok".into(), Dynamic::from(true));
            m
        }
        Err(_) => disabled_result("memory disabled"),
    }
}

fn memory_get_context<R: BufRead, W: Write>(
    channel: &Rc<RefCell<CallbackChannel<R, W>>>,
    toggles: &HelperToggles,
    topic: &str,
) -> String {
    if !toggles.memory() {
        return String::new();
    }
    let params = json!({"topic": topic});
    match channel.borrow_mut().call_or_exit("memory_get_context", params) {
        Ok(value) => value.as_str().map(str::to_string).unwrap_or_default(),
        Err(_) => String::new(),
    }
}

fn memory_relate<R: BufRead, W: Write>(
    channel: &Rc<RefCell<CallbackChannel<R, W>>>,
    toggles: &HelperToggles,
    a: &str,
    b: &str,
    relation: &str,
) -> Map {
    if !toggles.memory() {
        return disabled_result("memory disabled");
    }
    let params = json!({"a": a, "b": b, "relation": relation});
    match channel.borrow_mut().call_or_exit("memory_relate", params) {
        Ok(_) => {
            let mut m = Map::new();
            m.insert("ok".into(), Dynamic::from(true));
            m
        }
        Err(_) => disabled_result("memory disabled"),
    }
}
