//! End-to-end scenario tests, driven entirely through in-memory
//! buffers — no child process is spawned. Each scenario below is the
//! rhai-idiomatic equivalent of a corresponding literal scenario from the
//! original worker protocol walkthrough (see `DESIGN.md`'s "Scenario-literal
//! translation note").

use std::io::Cursor;

use recurse_worker::dispatcher::Worker;
use serde_json::Value;

fn lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8(output.to_vec())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn scenario_1_startup_handshake() {
    let mut worker =
        Worker::new(Cursor::new(b"{\"id\":99,\"method\":\"shutdown\",\"params\":{}}\n".to_vec()), Vec::new());
    worker.run().unwrap();

    let frames = lines(&worker.written_bytes());
    assert_eq!(frames[0]["id"], 0);
    assert_eq!(frames[0]["result"]["ready"], true);
    assert_eq!(frames[0]["result"]["pydantic"], false);
}

#[test]
fn scenario_2_expression_value() {
    let mut worker = Worker::new(Cursor::new(Vec::new()), Vec::new());
    let (resp, shutdown) = worker.handle_line(r#"{"id":1,"method":"execute","params":{"code":"1+2"}}"#);
    assert!(!shutdown);
    let value = serde_json::to_value(&resp).unwrap();
    assert_eq!(value["id"], 1);
    assert_eq!(value["result"]["output"], "");
    assert_eq!(value["result"]["return_value"], "3");
    assert_eq!(value["result"]["error"], "");
    assert!(value["result"]["duration_ms"].is_number());
}

#[test]
fn scenario_3_persistent_assignment() {
    let mut worker = Worker::new(Cursor::new(Vec::new()), Vec::new());

    let (assign, _) = worker.handle_line(r#"{"id":2,"method":"execute","params":{"code":"let x = \"hi\";"}}"#);
    let assign = serde_json::to_value(&assign).unwrap();
    assert_eq!(assign["result"]["return_value"], "");
    assert_eq!(assign["result"]["error"], "");

    let (get, _) = worker.handle_line(r#"{"id":3,"method":"get_var","params":{"name":"x"}}"#);
    let get = serde_json::to_value(&get).unwrap();
    assert_eq!(get["result"]["value"], "hi");
    assert_eq!(get["result"]["length"], 2);

    let (list, _) = worker.handle_line(r#"{"id":4,"method":"list_vars","params":{}}"#);
    let list = serde_json::to_value(&list).unwrap();
    let vars = list["result"]["variables"].as_array().unwrap();
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0]["name"], "x");
    assert_eq!(vars[0]["length"], 2);
}

#[test]
fn scenario_4_syntax_error_recovery() {
    let mut worker = Worker::new(Cursor::new(Vec::new()), Vec::new());

    let (exec, shutdown) = worker.handle_line(r#"{"id":5,"method":"execute","params":{"code":"fn ("}}"#);
    assert!(!shutdown);
    let exec = serde_json::to_value(&exec).unwrap();
    assert!(exec["result"]["error"].as_str().unwrap().starts_with("SyntaxError:"));

    let (status, _) = worker.handle_line(r#"{"id":6,"method":"status","params":{}}"#);
    let status = serde_json::to_value(&status).unwrap();
    assert_eq!(status["result"]["running"], true);
}

#[test]
fn scenario_5_callback_round_trip() {
    // The fake host's one reply, consumed by the callback channel reading
    // from the same shared `Io` the worker was constructed with.
    let reader = Cursor::new(b"{\"result\":\"hello\"}\n".to_vec());
    let mut worker = Worker::new(reader, Vec::new());

    let (resp, _) = worker.handle_line(r#"{"id":6,"method":"execute","params":{"code":"FINAL(llm_call(\"hi\"))"}}"#);
    let value = serde_json::to_value(&resp).unwrap();
    assert_eq!(value["id"], 6);
    assert_eq!(value["result"]["return_value"], "'hello'");
    assert_eq!(value["result"]["error"], "");
}

#[test]
fn scenario_6_shutdown() {
    let mut worker = Worker::new(Cursor::new(Vec::new()), Vec::new());
    let (resp, shutdown) = worker.handle_line(r#"{"id":99,"method":"shutdown","params":{}}"#);
    assert!(shutdown);
    let value = serde_json::to_value(&resp).unwrap();
    assert_eq!(value["id"], 99);
    assert_eq!(value["result"]["ok"], true);
}

#[test]
fn run_emits_ready_frame_then_exits_cleanly_on_shutdown() {
    let input = b"{\"id\":99,\"method\":\"shutdown\",\"params\":{}}\n".to_vec();
    let mut worker = Worker::new(Cursor::new(input), Vec::new());
    worker.run().unwrap();
}

#[test]
fn blank_lines_are_skipped_by_the_dispatch_loop() {
    let input = b"\n\n{\"id\":99,\"method\":\"shutdown\",\"params\":{}}\n".to_vec();
    let mut worker = Worker::new(Cursor::new(input), Vec::new());
    worker.run().unwrap();
}

#[test]
fn underscore_prefixed_names_never_appear_in_list_vars() {
    let mut worker = Worker::new(Cursor::new(Vec::new()), Vec::new());
    worker.handle_line(r#"{"id":1,"method":"execute","params":{"code":"let _hidden = 1; let visible = 2;"}}"#);
    let (list, _) = worker.handle_line(r#"{"id":2,"method":"list_vars","params":{}}"#);
    let list = serde_json::to_value(&list).unwrap();
    let names: Vec<&str> = list["result"]["variables"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["visible"]);
}

#[test]
fn eof_without_shutdown_exits_the_loop_cleanly() {
    let mut worker = Worker::new(Cursor::new(Vec::new()), Vec::new());
    worker.run().unwrap();
}

#[test]
fn set_llm_enabled_false_goes_offline_without_a_restart() {
    // No callback reply queued in the reader; if the runtime toggle were
    // ignored and a real callback were attempted, this would hang waiting
    // on EOF instead of returning the offline placeholder.
    let mut worker = Worker::new(Cursor::new(Vec::new()), Vec::new());
    worker.handle_line(r#"{"id":1,"method":"execute","params":{"code":"set_llm_enabled(false);"}}"#);
    let (resp, _) =
        worker.handle_line(r#"{"id":2,"method":"execute","params":{"code":"llm_call(\"hi\")"}}"#);
    let value = serde_json::to_value(&resp).unwrap();
    assert_eq!(value["result"]["error"], "");
    assert_eq!(value["result"]["return_value"], "'[llm disabled] hi'");
}

#[test]
fn unknown_helper_toggle_disabled_path_needs_no_callback_reply() {
    // No callback reply queued in the reader; if the toggle were ignored
    // and a real callback attempted, this would hang waiting on EOF and
    // surface as an error instead of a clean placeholder result.
    let mut worker = Worker::new(Cursor::new(Vec::new()), Vec::new());
    let (resp, _) = worker.handle_line(
        r#"{"id":1,"method":"execute","params":{"code":"memory_query(\"q\", 5).len()"}}"#,
    );
    let value = serde_json::to_value(&resp).unwrap();
    assert_eq!(value["result"]["error"], "");
}

