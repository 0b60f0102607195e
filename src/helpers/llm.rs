//! LLM-backed helpers: `llm_call`, `llm_batch`, `summarize`,
//! `map_reduce`, `find_relevant`. Each issues a `llm_call` or `llm_batch`
//! callback when the `llm` toggle is on; otherwise it returns a documented
//! offline placeholder and never touches the callback channel.

use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;

use rhai::{Array, Dynamic, Engine};
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
        engine.register_fn("llm_call", move |prompt: &str, context: &str, model: &str| -> String {
            llm_call(&channel, &toggles, prompt, context, model)
        });
    }
    {
        let channel = channel.clone();
        let toggles = toggles.clone();
        engine.register_fn("llm_call", move |prompt: &str| -> String {
            llm_call(&channel, &toggles, prompt, "", "auto")
        });
    }
    {
        let channel = channel.clone();
        let toggles = toggles.clone();
        engine.register_fn("llm_batch", move |prompts: Array| -> Array { llm_batch(&channel, &toggles, prompts) });
    }
    {
        let channel = channel.clone();
        let toggles = toggles.clone();
        engine.register_fn("summarize", move |text: &str, max_words: i64| -> String {
            summarize(&channel, &toggles, text, max_words)
        });
    }
    {
        let channel = channel.clone();
        let toggles = toggles.clone();
        engine.register_fn(
            "map_reduce",
            move |text: &str, map_prompt: &str, reduce_prompt: &str, chunk_size: i64| -> String {
                map_reduce(&channel, &toggles, text, map_prompt, reduce_prompt, chunk_size)
            },
        );
    }
    {
        let channel = channel.clone();
        let toggles = toggles.clone();
        engine.register_fn("find_relevant", move |text: &str, query: &str, top_k: i64| -> Array {
            find_relevant(&channel, &toggles, text, query, top_k)
        });
    }
}

fn llm_call<R: BufRead, W: Write>(
    channel: &Rc<RefCell<CallbackChannel<R, W>>>,
    toggles: &HelperToggles,
    prompt: &str,
    context: &str,
    model: &str,
) -> String {
    if !toggles.llm() {
        return format!("[llm disabled] {prompt}");
    }
    let params = json!({"prompt": prompt, "context": context, "model": model});
    match channel.borrow_mut().call_or_exit("llm_call", params) {
        Ok(value) => value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()),
        Err(_reason) => format!("[llm disabled] {prompt}"),
    }
}

fn llm_batch<R: BufRead, W: Write>(
    channel: &Rc<RefCell<CallbackChannel<R, W>>>,
    toggles: &HelperToggles,
    prompts: Array,
) -> Array {
    let prompt_strings: Vec<String> =
        prompts.iter().map(|p| p.clone().into_string().unwrap_or_default()).collect();

    if !toggles.llm() {
        return prompt_strings.into_iter().map(|p| Dynamic::from(format!("[llm disabled] {p}"))).collect();
    }

    let params = json!({"prompts": prompt_strings});
    match channel.borrow_mut().call_or_exit("llm_batch", params) {
        Ok(value) => match value.as_array() {
            Some(arr) => arr
                .iter()
                .map(|v| Dynamic::from(v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())))
                .collect(),
            None => prompt_strings.into_iter().map(|p| Dynamic::from(llm_call(channel, toggles, &p, "", ""))).collect(),
        },
        // Batch callback itself errored: fall back to N individual llm_calls,
        // a recoverable per-item fallback, not fatal.
        Err(_) => prompt_strings.into_iter().map(|p| Dynamic::from(llm_call(channel, toggles, &p, "", ""))).collect(),
    }
}

fn summarize<R: BufRead, W: Write>(
    channel: &Rc<RefCell<CallbackChannel<R, W>>>,
    toggles: &HelperToggles,
    text: &str,
    max_words: i64,
) -> String {
    if !toggles.llm() {
        return truncate_words(text, max_words.max(0) as usize);
    }
    let prompt = format!("Summarize the following in at most {max_words} words:\n\n{text}");
    llm_call(channel, toggles, &prompt, "", "")
}

fn map_reduce<R: BufRead, W: Write>(
    channel: &Rc<RefCell<CallbackChannel<R, W>>>,
    toggles: &HelperToggles,
    text: &str,
    map_prompt: &str,
    reduce_prompt: &str,
    chunk_size: i64,
) -> String {
    let chunk_size = chunk_size.max(1) as usize;
    let chars: Vec<char> = text.chars().collect();
    let chunks: Vec<String> = chars.chunks(chunk_size).map(|c| c.iter().collect()).collect();

    if !toggles.llm() {
        return chunks.join("\n---\n");
    }

    let mapped: Vec<String> = chunks
        .into_iter()
        .map(|chunk| llm_call(channel, toggles, &format!("{map_prompt}\n\n{chunk}"), "", ""))
        .collect();

    let joined = mapped.join("\n");
    llm_call(channel, toggles, &format!("{reduce_prompt}\n\n{joined}"), "", "")
}

fn find_relevant<R: BufRead, W: Write>(
    channel: &Rc<RefCell<CallbackChannel<R, W>>>,
    toggles: &HelperToggles,
    text: &str,
    query: &str,
    top_k: i64,
) -> Array {
    let top_k = top_k.max(0) as usize;
    if !toggles.llm() {
        return naive_keyword_rank(text, query, top_k);
    }
    let prompt = format!("List the {top_k} passages most relevant to '{query}' in:\n\n{text}");
    let result = llm_call(channel, toggles, &prompt, "", "");
    vec![Dynamic::from(result)]
}

fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace().take(max_words).collect::<Vec<_>>().join(" ")
}

fn naive_keyword_rank(text: &str, query: &str, top_k: usize) -> Array {
    let query_lower = query.to_lowercase();
    let mut scored: Vec<(usize, &str)> =
        text.split("\n\n").map(|para| (para.to_lowercase().matches(&query_lower).count(), para)).collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().filter(|(score, _)| *score > 0).take(top_k).map(|(_, p)| Dynamic::from(p.to_string())).collect()
}
