//! The dispatcher: parse → route → reply, one line at a time.
//!
//! `Worker` owns every piece of per-process state — namespace, evaluator,
//! callback channel, final-output register, counters — so `main.rs` only
//! has to construct one and drive `run`. Generic over `BufRead`/`Write` so
//! the integration tests in `tests/` can drive the whole loop through
//! in-memory buffers.

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::time::Instant;

use rhai::{Dynamic, Engine};
use serde_json::{json, Value};

use crate::callback::{CallbackChannel, Io};
use crate::evaluator::Evaluator;
use crate::final_output::FinalOutputSlot;
use crate::helpers::{self, HelperToggles};
use crate::namespace::Namespace;
use crate::protocol::{Request, Response, ERR_INTERNAL, ERR_METHOD_NOT_FOUND, ERR_PARSE};

pub struct Worker<R, W> {
    io: Rc<RefCell<Io<R, W>>>,
    namespace: Namespace,
    evaluator: Evaluator,
    final_output: FinalOutputSlot,
    exec_count: u64,
    start: Instant,
}

impl<R: BufRead + 'static, W: Write + 'static> Worker<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        let io = Rc::new(RefCell::new(Io::new(reader, writer)));
        let channel = Rc::new(RefCell::new(CallbackChannel::new(io.clone())));
        let toggles = Rc::new(HelperToggles::default());
        let final_output = FinalOutputSlot::new();
        let mut namespace = Namespace::new();

        let mut engine = Engine::new();
        helpers::register_all(&mut engine, channel, toggles, final_output.clone(), &mut namespace);

        Self {
            io,
            namespace,
            evaluator: Evaluator::new(engine),
            final_output,
            exec_count: 0,
            start: Instant::now(),
        }
    }

    /// The `{"id":0,"result":{"ready":true,"pydantic":false}}` frame written
    /// once, before the first input line is read. `pydantic` is always
    /// `false`: this crate has no notion of that optional Python dependency,
    /// but the field is kept for wire compatibility with hosts written
    /// against the original implementation.
    fn ready_frame(&self) -> Response {
        Response::success(0, json!({"ready": true, "pydantic": false}))
    }

    /// Runs the read-dispatch-write loop until `shutdown` or EOF. EOF with
    /// no pending `shutdown` is itself treated as a clean exit — the spec
    /// only prescribes behavior for `in` going away, not an error condition.
    pub fn run(&mut self) -> io::Result<()> {
        let ready = serde_json::to_string(&self.ready_frame()).expect("ready frame always serializes");
        self.io.borrow_mut().writer.write_frame(&ready)?;

        loop {
            let line = {
                let mut io = self.io.borrow_mut();
                io.reader.read_frame()?
            };
            let Some(line) = line else {
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }

            let (response, shutdown) = self.handle_line(&line);
            let encoded = serde_json::to_string(&response).expect("response always serializes");
            self.io.borrow_mut().writer.write_frame(&encoded)?;

            if shutdown {
                return Ok(());
            }
        }
    }

    /// Parses one line and routes it, returning the reply and whether the
    /// worker should exit after sending it.
    pub fn handle_line(&mut self, line: &str) -> (Response, bool) {
        let request: Request = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => return (Response::error(0, ERR_PARSE, format!("Parse error: {e}")), false),
        };

        match request.method.as_str() {
            "execute" => (self.handle_execute(request.id, &request.params), false),
            "set_var" => (self.handle_set_var(request.id, &request.params), false),
            "get_var" => (self.handle_get_var(request.id, &request.params), false),
            "list_vars" => (self.handle_list_vars(request.id), false),
            "status" => (self.handle_status(request.id), false),
            "shutdown" => (Response::success(request.id, json!({"ok": true})), true),
            other => {
                (Response::error(request.id, ERR_METHOD_NOT_FOUND, format!("Method not found: {other}")), false)
            }
        }
    }

    fn handle_execute(&mut self, id: i64, params: &Value) -> Response {
        let Some(code) = params.get("code").and_then(Value::as_str) else {
            return Response::error(id, ERR_INTERNAL, "execute requires a 'code' string parameter");
        };

        self.exec_count += 1;
        let record = self.evaluator.execute(code, self.namespace.scope_mut());
        self.namespace.reconcile();

        Response::success(
            id,
            json!({
                "output": record.output,
                "return_value": record.return_value.unwrap_or_default(),
                "error": record.error,
                "duration_ms": record.duration_ms,
            }),
        )
    }

    fn handle_set_var(&mut self, id: i64, params: &Value) -> Response {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return Response::error(id, ERR_INTERNAL, "set_var requires a 'name' string parameter");
        };
        if !is_valid_identifier(name) {
            return Response::error(id, ERR_INTERNAL, format!("'{name}' is not a valid identifier"));
        }
        let value = params.get("value").and_then(Value::as_str).unwrap_or_default().to_string();

        match self.namespace.set_var(name, Dynamic::from(value)) {
            Ok(()) => Response::success(id, json!({"ok": true})),
            Err(e) => Response::error(id, ERR_INTERNAL, e),
        }
    }

    fn handle_get_var(&mut self, id: i64, params: &Value) -> Response {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return Response::error(id, ERR_INTERNAL, "get_var requires a 'name' string parameter");
        };
        let start = params.get("start").and_then(Value::as_i64).unwrap_or(0);
        let end = params.get("end").and_then(Value::as_i64).unwrap_or(0);
        let as_repr = params.get("as_repr").and_then(Value::as_bool).unwrap_or(false);

        match self.namespace.get_var(name, start, end) {
            Ok((value, length, type_name)) => {
                let rendered = if as_repr { Self::repr_dynamic(&value) } else { Self::plain_dynamic(&value) };
                Response::success(id, json!({"value": rendered, "length": length, "type": type_name}))
            }
            Err(e) => Response::error(id, ERR_INTERNAL, e),
        }
    }

    fn handle_list_vars(&mut self, id: i64) -> Response {
        let variables: Vec<Value> = self
            .namespace
            .list_vars()
            .into_iter()
            .map(|v| json!({"name": v.name, "type": v.type_name, "length": v.length, "size": v.size}))
            .collect();
        Response::success(id, json!({"variables": variables}))
    }

    fn handle_status(&mut self, id: i64) -> Response {
        let uptime_ms = self.start.elapsed().as_millis();
        let status = crate::resource::status(uptime_ms, self.exec_count);
        Response::success(id, serde_json::to_value(status).expect("status always serializes"))
    }

    fn plain_dynamic(value: &Dynamic) -> String {
        value.to_string()
    }

    fn repr_dynamic(value: &Dynamic) -> String {
        if let Some(s) = value.clone().try_cast::<String>() {
            format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
        } else {
            value.to_string()
        }
    }
}

impl<R: BufRead + 'static, W: Write + Clone + 'static> Worker<R, W> {
    /// Snapshots everything written to the reply pipe so far. Useful for
    /// tests driving `run()` through an in-memory `Vec<u8>` writer.
    pub fn written_bytes(&self) -> W {
        self.io.borrow().writer.get_ref().clone()
    }
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
