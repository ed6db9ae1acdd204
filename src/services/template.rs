use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Matches `{{ name }}` where name is an identifier with optional dotted
/// segments, capturing the name (group 1).
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}")
        .expect("failed to compile placeholder regex")
});

/// Nested expansions beyond this depth are treated as circular
const MAX_DEPTH: usize = 10;

/// One precedence level of variable values
#[derive(Debug, Clone)]
struct ScopeLayer {
    label: &'static str,
    values: HashMap<String, Value>,
}

/// Variable layers ordered most specific first; a lookup returns the first
/// layer that knows the name.
#[derive(Debug, Clone, Default)]
pub struct ScopeChain {
    layers: Vec<ScopeLayer>,
}

impl ScopeChain {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a layer below every layer pushed so far
    pub fn push_layer(&mut self, label: &'static str, values: HashMap<String, Value>) {
        self.layers.push(ScopeLayer { label, values });
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.layers.iter().find_map(|layer| layer.values.get(name))
    }
}

/// Everything a resolution runs against: the stored scope chain plus the
/// run-private overlay of temp and extracted values. The overlay shadows
/// every stored scope and is never written back by resolution itself.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub chain: ScopeChain,
    pub overlay: HashMap<String, Value>,
}

impl RunContext {
    pub fn new(chain: ScopeChain) -> Self {
        Self {
            chain,
            overlay: HashMap::new(),
        }
    }

    pub fn with_overlay(chain: ScopeChain, overlay: HashMap<String, Value>) -> Self {
        Self { chain, overlay }
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.overlay.get(name).or_else(|| self.chain.lookup(name))
    }

    fn describe_layers(&self) -> String {
        let mut labels = vec!["overlay"];
        labels.extend(self.chain.layers.iter().map(|l| l.label));
        labels.join(" -> ")
    }
}

/// Resolve every placeholder in a JSON value.
///
/// A string that is exactly one placeholder takes the bound value with its
/// structure intact; strings with surrounding text interpolate, stringifying
/// non-string values as compact JSON. Object keys are resolved as text.
pub fn resolve_value(value: &Value, ctx: &RunContext) -> AppResult<Value> {
    let mut visiting = Vec::new();
    resolve_value_inner(value, ctx, 0, &mut visiting)
}

/// Resolve placeholders in a bare string, always producing text
pub fn resolve_text(text: &str, ctx: &RunContext) -> AppResult<String> {
    let mut visiting = Vec::new();
    interpolate(text, ctx, 0, &mut visiting)
}

fn resolve_value_inner(
    value: &Value,
    ctx: &RunContext,
    depth: usize,
    visiting: &mut Vec<String>,
) -> AppResult<Value> {
    match value {
        Value::String(s) => resolve_string(s, ctx, depth, visiting),
        Value::Array(items) => {
            let resolved = items
                .iter()
                .map(|item| resolve_value_inner(item, ctx, depth, visiting))
                .collect::<AppResult<Vec<_>>>()?;
            Ok(Value::Array(resolved))
        }
        Value::Object(map) => {
            let mut resolved = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                let key = interpolate(key, ctx, depth, visiting)?;
                let item = resolve_value_inner(item, ctx, depth, visiting)?;
                resolved.insert(key, item);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_string(
    text: &str,
    ctx: &RunContext,
    depth: usize,
    visiting: &mut Vec<String>,
) -> AppResult<Value> {
    // A string that is nothing but one placeholder substitutes structurally
    if let Some(caps) = PLACEHOLDER_RE.captures(text) {
        if let Some(whole) = caps.get(0) {
            if whole.start() == 0 && whole.end() == text.len() {
                return resolve_name(&caps[1], ctx, depth, visiting);
            }
        }
    }

    interpolate(text, ctx, depth, visiting).map(Value::String)
}

fn interpolate(
    text: &str,
    ctx: &RunContext,
    depth: usize,
    visiting: &mut Vec<String>,
) -> AppResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in PLACEHOLDER_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);

        match resolve_name(&caps[1], ctx, depth, visiting)? {
            Value::String(s) => out.push_str(&s),
            other => out.push_str(&other.to_string()),
        }

        last = whole.end();
    }
    out.push_str(&text[last..]);

    Ok(out)
}

/// Look a name up and resolve whatever it is bound to. The visiting stack
/// holds the names currently being expanded; a name re-entering its own
/// expansion is a cycle. Sibling reuse of a name is fine.
fn resolve_name(
    name: &str,
    ctx: &RunContext,
    depth: usize,
    visiting: &mut Vec<String>,
) -> AppResult<Value> {
    if depth >= MAX_DEPTH {
        return Err(AppError::CircularReference(format!(
            "expansion of '{}' exceeded {} nested templates",
            name, MAX_DEPTH
        )));
    }
    if visiting.iter().any(|n| n == name) {
        let mut cycle: Vec<&str> = visiting.iter().map(String::as_str).collect();
        cycle.push(name);
        return Err(AppError::CircularReference(cycle.join(" -> ")));
    }

    let value = ctx.lookup(name).cloned().ok_or_else(|| {
        AppError::UnresolvedVariable(format!("'{}' (searched {})", name, ctx.describe_layers()))
    })?;

    visiting.push(name.to_string());
    let resolved = resolve_value_inner(&value, ctx, depth + 1, visiting);
    visiting.pop();
    resolved
}
