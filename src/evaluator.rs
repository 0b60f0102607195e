//! The evaluator: classifies a snippet as expression or block form, runs it
//! against the persistent namespace, and captures everything that needs to
//! go back in an `ExecutionRecord`.
//!
//! `rhai::Engine::compile_expression` plays the role of
//! `ast.parse(mode='eval')` in the original implementation; falling back to
//! `engine.compile` plays the role of `mode='exec'`. A rhai script's
//! trailing-expression-is-the-result behavior does the work the Python
//! source did by hand with a second "re-evaluate the last node" pass.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use rhai::{Dynamic, Engine, EvalAltResult};
use serde::Serialize;

use crate::resource;

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    pub output: String,
    pub return_value: Option<String>,
    pub error: String,
    pub duration_ms: u64,
}

/// Runs snippets against one `rhai::Engine` and one persistent `Scope`.
/// `engine` owns the print/debug/progress hooks; `output` is the buffer they
/// write into, cleared at the start of every `execute`.
pub struct Evaluator {
    engine: Engine,
    output: Rc<RefCell<String>>,
}

impl Evaluator {
    /// `engine` must already have the helper registry and standard library
    /// aliases registered — `Evaluator` only wires up output capture and the
    /// CPU-limit progress poll.
    pub fn new(mut engine: Engine) -> Self {
        let output = Rc::new(RefCell::new(String::new()));

        let print_buf = output.clone();
        engine.on_print(move |s| {
            print_buf.borrow_mut().push_str(s);
            print_buf.borrow_mut().push('\n');
        });

        let debug_buf = output.clone();
        engine.on_debug(move |s, _src, _pos| {
            debug_buf.borrow_mut().push_str(s);
            debug_buf.borrow_mut().push('\n');
        });

        engine.on_progress(|_ops| {
            if resource::cpu_limit_hit() {
                Some(Dynamic::from("CPU time limit exceeded".to_string()))
            } else {
                None
            }
        });

        Self { engine, output }
    }

    pub fn execute(&mut self, code: &str, scope: &mut rhai::Scope<'static>) -> ExecutionRecord {
        let start = Instant::now();
        self.output.borrow_mut().clear();

        let (return_value, error) = match self.engine.compile_expression(code) {
            Ok(ast) => match self.engine.eval_ast_with_scope::<Dynamic>(scope, &ast) {
                Ok(value) => (Self::repr_if_meaningful(&value), String::new()),
                Err(e) => (None, Self::format_eval_error(&e)),
            },
            Err(_expr_parse_err) => match self.engine.compile(code) {
                Ok(ast) => match self.engine.eval_ast_with_scope::<Dynamic>(scope, &ast) {
                    Ok(value) => (Self::repr_if_meaningful(&value), String::new()),
                    Err(e) => (None, Self::format_eval_error(&e)),
                },
                Err(parse_err) => (None, format!("SyntaxError: {parse_err}")),
            },
        };

        ExecutionRecord {
            output: self.output.borrow().clone(),
            return_value,
            error,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn repr_if_meaningful(value: &Dynamic) -> Option<String> {
        if value.is_unit() {
            None
        } else {
            Some(Self::repr_dynamic(value))
        }
    }

    /// Python-style `repr`: strings get single-quoted, everything else uses
    /// rhai's own `Display` formatting.
    fn repr_dynamic(value: &Dynamic) -> String {
        if let Some(s) = value.clone().try_cast::<String>() {
            format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
        } else {
            value.to_string()
        }
    }

    /// A `Terminated` error is how `on_progress` aborts the script once the
    /// CPU-limit flag trips; its token carries the fixed message verbatim,
    /// so it's reported as-is rather than run through rhai's generic
    /// "script terminated" `Display` text.
    fn format_eval_error(err: &EvalAltResult) -> String {
        if let EvalAltResult::ErrorTerminated(token, _) = err {
            return token.to_string();
        }
        format!("{}: {}", Self::error_kind(err), err)
    }

    fn error_kind(err: &EvalAltResult) -> &'static str {
        match err {
            EvalAltResult::ErrorParsing(..) => "SyntaxError",
            EvalAltResult::ErrorVariableNotFound(..) => "NameError",
            EvalAltResult::ErrorIndexNotFound(..) => "IndexError",
            EvalAltResult::ErrorFunctionNotFound(..) => "NameError",
            EvalAltResult::ErrorMismatchDataType(..) => "TypeError",
            EvalAltResult::ErrorArithmetic(..) => "ArithmeticError",
            EvalAltResult::ErrorArrayBounds(..) | EvalAltResult::ErrorStringBounds(..) => "IndexError",
            _ => "EvalError",
        }
    }
}
