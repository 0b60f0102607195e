//! Pure data-transform helpers: no callback, just text munging.
//! Intentionally uninteresting — these exist only to keep trivial host
//! round-trips out of the callback channel.

use rhai::{Array, Engine};
use regex::Regex;

pub fn register(engine: &mut Engine) {
    engine.register_fn("peek", peek);
    engine.register_fn("grep", grep);
    engine.register_fn("partition", partition);
    engine.register_fn("partition_by_lines", partition_by_lines);
    engine.register_fn("extract_functions", extract_functions);
    engine.register_fn("count_tokens_approx", count_tokens_approx);
}

fn clamp_range(start: i64, end: i64, len: i64) -> (usize, usize) {
    let start = start.clamp(0, len) as usize;
    let end = end.clamp(0, len) as usize;
    if start >= end {
        (0, 0)
    } else {
        (start, end)
    }
}

fn peek(text: &str, start: i64, end: i64) -> String {
    let chars: Vec<char> = text.chars().collect();
    let (s, e) = clamp_range(start, end, chars.len() as i64);
    chars[s..e].iter().collect()
}

fn grep(text: &str, pattern: &str) -> Array {
    let Ok(re) = Regex::new(pattern) else {
        return Array::new();
    };
    text.lines()
        .filter(|line| re.is_match(line))
        .map(|line| rhai::Dynamic::from(line.to_string()))
        .collect()
}

fn partition(text: &str, n: i64) -> Array {
    if n <= 0 {
        return Array::new();
    }
    let chars: Vec<char> = text.chars().collect();
    let n = n as usize;
    let chunk_size = chars.len().div_ceil(n).max(1);
    chars
        .chunks(chunk_size)
        .map(|c| rhai::Dynamic::from(c.iter().collect::<String>()))
        .collect()
}

fn partition_by_lines(text: &str, n: i64) -> Array {
    if n <= 0 {
        return Array::new();
    }
    let lines: Vec<&str> = text.lines().collect();
    let n = n as usize;
    lines
        .chunks(n)
        .map(|group| rhai::Dynamic::from(group.join("\n")))
        .collect()
}

/// Language-agnostic heuristic: a line that looks like a `fn`/`def`/
/// `function` signature. Not an AST-accurate parser — deliberately just a
/// best-effort scan.
fn extract_functions(text: &str) -> Array {
    static PATTERN: &str = r"^\s*(?:pub\s+)?(?:async\s+)?(?:fn|def|function)\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(";
    let Ok(re) = Regex::new(PATTERN) else {
        return Array::new();
    };
    text.lines()
        .filter(|line| re.is_match(line))
        .map(|line| rhai::Dynamic::from(line.trim().to_string()))
        .collect()
}

fn count_tokens_approx(text: &str) -> i64 {
    (text.len() / 4) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_slices_by_char() {
        assert_eq!(peek("hello world", 0, 5), "hello");
    }

    #[test]
    fn grep_returns_matching_lines_only() {
        let text = "alpha\nbeta\ngamma\n";
        let matches = grep(text, "^b");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].clone().into_string().unwrap(), "beta");
    }

    #[test]
    fn partition_splits_into_roughly_n_pieces() {
        let parts = partition("abcdefgh", 4);
        assert_eq!(parts.len(), 4);
    }

    #[test]
    fn partition_by_lines_groups_n_lines_per_chunk() {
        let text = "1\n2\n3\n4\n5\n";
        let parts = partition_by_lines(text, 2);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].clone().into_string().unwrap(), "1\n2");
    }

    #[test]
    fn extract_functions_finds_rust_and_python_signatures() {
        let text = "fn foo(x: i32) {\n    1\n}\ndef bar(y):\n    pass\n";
        let found = extract_functions(text);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn count_tokens_approx_is_len_over_four() {
        assert_eq!(count_tokens_approx("12345678"), 2);
    }
}
