//! The persistent evaluation namespace.
//!
//! Wraps a `rhai::Scope` and tracks which names were put there by us (the
//! helper registry) versus which were set by user code, so `list_vars` can
//! report only the latter — and so reconciliation after a block-form
//! `execute` never lets a stray `_`-prefixed or helper name leak into the
//! reported namespace.
//!
//! The original implementation preloaded Python module handles (`re`,
//! `json`, `ast`, `pathlib`, `itertools`, `collections`) as bare names in
//! its globals dict so scripts could write `re.search(...)` or
//! `json.dumps(...)`. rhai has no import system and no dotted-module
//! values, so there is nothing to bind those names to; the functionality
//! they stood in for is exposed instead as flat functions in the helper
//! registry (`grep`/`extract_functions` for regex search, `FINAL_JSON` plus
//! rhai's native `Map`/`Array` for JSON, and rhai's built-in array/map
//! methods for the itertools/collections surface). No placeholder bindings
//! are installed under the original module names.

use std::collections::HashSet;

use rhai::{Dynamic, Scope};

#[derive(Debug, Clone, PartialEq)]
pub struct VariableMeta {
    pub name: String,
    pub type_name: String,
    /// Present whenever the value has a meaningful notion of length
    /// (strings, arrays, maps); absent for scalars.
    pub length: Option<usize>,
    /// Best-effort, non-additive size estimate: the length of the value's
    /// displayed form, since rhai has no general `__sizeof__` analog
    /// (documented further in DESIGN.md).
    pub size: usize,
}

pub struct Namespace {
    scope: Scope<'static>,
    preloaded: HashSet<String>,
    user_set: HashSet<String>,
}

impl Namespace {
    pub fn new() -> Self {
        Self { scope: Scope::new(), preloaded: HashSet::new(), user_set: HashSet::new() }
    }

    pub fn scope(&self) -> &Scope<'static> {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope<'static> {
        &mut self.scope
    }

    /// Marks `name` as owned by the preload/helper layer (called once during
    /// worker startup for each helper binding).
    pub fn mark_preloaded(&mut self, name: &str) {
        self.preloaded.insert(name.to_string());
    }

    fn is_internal(name: &str) -> bool {
        name.starts_with('_')
    }

    /// `set_var` command handler. Rejects attempts to clobber a
    /// preloaded name or a `_`-prefixed internal name.
    pub fn set_var(&mut self, name: &str, value: Dynamic) -> Result<(), String> {
        if Self::is_internal(name) {
            return Err(format!("cannot set internal name '{name}'"));
        }
        if self.preloaded.contains(name) {
            return Err(format!("cannot overwrite preloaded name '{name}'"));
        }
        if self.scope.contains(name) {
            self.scope.set_value(name, value);
        } else {
            self.scope.push(name, value);
        }
        self.user_set.insert(name.to_string());
        Ok(())
    }

    /// `get_var` command handler; params are `{name, start?, end?}`.
    /// `length` in the result is always the pre-slice size of the value —
    /// never the length of the slice. When `start == 0 && end == 0`, no
    /// slicing is applied at all; otherwise `end == 0` means
    /// "through the end", matching Python's `v[start:]`.
    pub fn get_var(&self, name: &str, start: i64, end: i64) -> Result<(Dynamic, usize, String), String> {
        let value = self
            .scope
            .get_value::<Dynamic>(name)
            .ok_or_else(|| format!("no such variable '{name}'"))?;

        let full_len = Self::repr_len(&value);
        let type_name = value.type_name().to_string();

        let sliced = if start == 0 && end == 0 {
            value
        } else if value.is_string() {
            let s = value.into_string().unwrap_or_default();
            Self::slice_str(&s, start, end)
        } else if value.is_array() {
            let arr = value.into_array().unwrap_or_default();
            Self::slice_array(arr, start, end)
        } else {
            value
        };

        Ok((sliced, full_len, type_name))
    }

    fn slice_str(s: &str, start: i64, end: i64) -> Dynamic {
        let chars: Vec<char> = s.chars().collect();
        let n = chars.len() as i64;
        let start = Self::normalize_index(start, n);
        let end = if end == 0 { n } else { Self::normalize_index(end, n) };
        if start >= n || start >= end {
            return Dynamic::from(String::new());
        }
        let out: String = chars[start as usize..end as usize].iter().collect();
        Dynamic::from(out)
    }

    fn slice_array(arr: rhai::Array, start: i64, end: i64) -> Dynamic {
        let n = arr.len() as i64;
        let start = Self::normalize_index(start, n);
        let end = if end == 0 { n } else { Self::normalize_index(end, n) };
        if start >= n || start >= end {
            return Dynamic::from(rhai::Array::new());
        }
        let out: rhai::Array = arr[start as usize..end as usize].to_vec();
        Dynamic::from(out)
    }

    fn normalize_index(index: i64, len: i64) -> i64 {
        if index < 0 {
            (len + index).max(0)
        } else {
            index.min(len)
        }
    }

    fn repr_len(value: &Dynamic) -> usize {
        if let Some(s) = value.clone().try_cast::<String>() {
            s.chars().count()
        } else if let Some(arr) = value.clone().try_cast::<rhai::Array>() {
            arr.len()
        } else if let Some(map) = value.clone().try_cast::<rhai::Map>() {
            map.len()
        } else {
            value.to_string().chars().count()
        }
    }

    /// `list_vars` command handler: every user-set name still present in
    /// scope, skipping anything `_`-prefixed or reclaimed by the preload
    /// layer since it was set (mirrors `update_from_exec`'s reconciliation
    /// filter in the original implementation).
    pub fn list_vars(&self) -> Vec<VariableMeta> {
        let mut out = Vec::new();
        for name in &self.user_set {
            if Self::is_internal(name) || self.preloaded.contains(name) {
                continue;
            }
            if let Some(value) = self.scope.get_value::<Dynamic>(name) {
                let repr = Self::dynamic_repr(&value);
                out.push(VariableMeta {
                    name: name.clone(),
                    type_name: value.type_name().to_string(),
                    length: Self::meaningful_length(&value),
                    size: repr.chars().count(),
                });
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Reconciles `user_set` against whatever names the scope actually holds
    /// after an `execute` call — a block-form execution can introduce new
    /// top-level bindings that never went through `set_var`.
    pub fn reconcile(&mut self) {
        let mut seen = HashSet::new();
        for name in self.scope.iter().map(|(n, _, _)| n.to_string()) {
            if Self::is_internal(&name) || self.preloaded.contains(&name) {
                continue;
            }
            seen.insert(name);
        }
        self.user_set = seen;
    }

    fn dynamic_repr(value: &Dynamic) -> String {
        value.to_string()
    }

    fn meaningful_length(value: &Dynamic) -> Option<usize> {
        if let Some(s) = value.clone().try_cast::<String>() {
            Some(s.chars().count())
        } else if let Some(arr) = value.clone().try_cast::<rhai::Array>() {
            Some(arr.len())
        } else if let Some(map) = value.clone().try_cast::<rhai::Map>() {
            Some(map.len())
        } else {
            None
        }
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}
