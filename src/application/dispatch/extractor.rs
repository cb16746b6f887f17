//! Best-effort extraction of capability invocations from model output.
//!
//! Three textual encodings are accepted, plus pre-structured call lists.
//! Malformed fragments are skipped, never raised: the extractor's contract
//! is "find what you can". Every extracted call goes through the name
//! resolver, so downstream components only ever see canonical names.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::resolver::NameResolver;

/// `<tool_use name="...">...</tool_use>`
static TOOL_USE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<tool_use\s+name="([^"]+)"\s*>(.*?)</tool_use>"#).expect("valid regex")
});

/// `<param name="...">...</param>` inside a tool_use block.
static PARAM_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<param\s+name="([^"]+)"\s*>(.*?)</param>"#).expect("valid regex")
});

/// Fenced code block holding a small JSON object with `tool`/`params` keys.
static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json|JSON|tool)?\s*(\{.*?\})\s*```").expect("valid regex")
});

/// `[tool_call]{"name": "...", "params": {...}}[/tool_call]`
static BRACKET_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[tool_call\](.*?)\[/tool_call\]").expect("valid regex"));

/// A (canonical name, parameters) pair awaiting routing and validation.
#[derive(Debug, Clone)]
pub struct RawCall {
    pub id: String,
    pub name: String,
    pub parameters: Map<String, Value>,
}

impl RawCall {
    fn new(name: String, parameters: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            parameters,
        }
    }
}

/// Pre-structured call entry, as produced by tool-calling model APIs:
/// `{id, function: {name, arguments: "<json string>"}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StructuredCall {
    pub id: Option<String>,
    pub function: StructuredFunction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StructuredFunction {
    pub name: String,
    pub arguments: String,
}

pub fn extract_from_text(text: &str, resolver: &NameResolver) -> Vec<RawCall> {
    let mut calls = Vec::new();

    for captures in TOOL_USE_BLOCK.captures_iter(text) {
        let name = captures[1].to_string();
        let body = &captures[2];
        let parameters = parse_block_parameters(body);
        calls.push(build_call(name, parameters, resolver));
    }

    for captures in FENCED_JSON.captures_iter(text) {
        let Ok(value) = serde_json::from_str::<Value>(&captures[1]) else {
            continue;
        };
        let Some(name) = value.get("tool").and_then(Value::as_str) else {
            continue;
        };
        let parameters = object_field(&value, &["params", "parameters"]);
        calls.push(build_call(name.to_string(), parameters, resolver));
    }

    for captures in BRACKET_CALL.captures_iter(text) {
        let Ok(value) = serde_json::from_str::<Value>(captures[1].trim()) else {
            continue;
        };
        let Some(name) = value.get("name").and_then(Value::as_str) else {
            continue;
        };
        let parameters = object_field(&value, &["params", "arguments", "input"]);
        calls.push(build_call(name.to_string(), parameters, resolver));
    }

    if !calls.is_empty() {
        debug!(count = calls.len(), "Extracted tool calls from model output");
    }
    calls
}

pub fn from_structured(calls: Vec<StructuredCall>, resolver: &NameResolver) -> Vec<RawCall> {
    calls
        .into_iter()
        .map(|call| {
            let parameters = parse_argument_string(&call.function.arguments);
            let name = resolver.resolve(&call.function.name, &parameters);
            RawCall {
                id: call.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                name,
                parameters,
            }
        })
        .collect()
}

fn build_call(name: String, parameters: Map<String, Value>, resolver: &NameResolver) -> RawCall {
    let canonical = resolver.resolve(&name, &parameters);
    RawCall::new(canonical, parameters)
}

/// Parameters of a tag block: either the body is itself a JSON object/array,
/// or it holds `<param>` tags, or the whole body becomes a single `input`.
fn parse_block_parameters(body: &str) -> Map<String, Value> {
    let trimmed = body.trim();

    if trimmed.starts_with('{') {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
            return map;
        }
    }

    let mut parameters = Map::new();
    for captures in PARAM_TAG.captures_iter(body) {
        parameters.insert(captures[1].to_string(), type_param_value(&captures[2]));
    }

    if parameters.is_empty() && !trimmed.is_empty() {
        parameters.insert("input".to_string(), Value::String(trimmed.to_string()));
    }
    parameters
}

/// Opportunistic typing of a tag value: boolean and numeric literals and
/// JSON-looking text are promoted; everything else stays a string.
fn type_param_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(integer) = trimmed.parse::<i64>() {
        return Value::Number(integer.into());
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(float) {
            return Value::Number(number);
        }
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return value;
        }
    }
    Value::String(trimmed.to_string())
}

fn object_field(value: &Value, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_object).cloned())
        .unwrap_or_default()
}

fn parse_argument_string(arguments: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            let mut map = Map::new();
            map.insert("input".to_string(), other);
            map
        }
        Err(_) => {
            let mut map = Map::new();
            if !arguments.trim().is_empty() {
                map.insert("input".to_string(), Value::String(arguments.to_string()));
            }
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tables::default_aliases;
    use serde_json::json;

    fn resolver() -> NameResolver {
        NameResolver::new(default_aliases())
    }

    #[test]
    fn extracts_tag_block_with_typed_params() {
        let resolver = resolver();
        let text = r#"Let me check.
<tool_use name="web-search">
  <param name="query">weather today</param>
  <param name="limit">5</param>
  <param name="fresh">true</param>
  <param name="filters">{"region": "eu"}</param>
</tool_use>"#;

        let calls = extract_from_text(text, &resolver);
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.name, "web_search");
        assert_eq!(call.parameters.len(), 4);
        assert_eq!(call.parameters["query"], json!("weather today"));
        assert_eq!(call.parameters["limit"], json!(5));
        assert_eq!(call.parameters["fresh"], json!(true));
        assert_eq!(call.parameters["filters"], json!({"region": "eu"}));
    }

    #[test]
    fn block_without_params_becomes_single_input() {
        let calls = extract_from_text(
            r#"<tool_use name="run_command">ls -la</tool_use>"#,
            &resolver(),
        );
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].parameters["input"], json!("ls -la"));
    }

    #[test]
    fn extracts_fenced_json_call() {
        let text = "```json\n{\"tool\": \"readfile\", \"params\": {\"path\": \"notes.md\"}}\n```";
        let calls = extract_from_text(text, &resolver());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "read_file");
        assert_eq!(calls[0].parameters["path"], json!("notes.md"));
    }

    #[test]
    fn extracts_bracket_call() {
        let text = r#"[tool_call]{"name": "get_current_time", "params": {}}[/tool_call]"#;
        let calls = extract_from_text(text, &resolver());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "current_time");
    }

    #[test]
    fn malformed_fragments_are_skipped() {
        let text = r#"
```json
{"tool": "web_search", "params": {broken
```
[tool_call]not json at all[/tool_call]
<tool_use name="ls"></tool_use>
"#;
        let calls = extract_from_text(text, &resolver());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "list_directory");
        assert!(calls[0].parameters.is_empty());
    }

    #[test]
    fn extracts_multiple_blocks_in_order() {
        let text = r#"
<tool_use name="read_file"><param name="path">a.txt</param></tool_use>
<tool_use name="read_file"><param name="path">b.txt</param></tool_use>
"#;
        let calls = extract_from_text(text, &resolver());
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].parameters["path"], json!("a.txt"));
        assert_eq!(calls[1].parameters["path"], json!("b.txt"));
    }

    #[test]
    fn structured_calls_keep_ids_and_resolve_names() {
        let structured = vec![StructuredCall {
            id: Some("call-1".into()),
            function: StructuredFunction {
                name: "Execute_Command".into(),
                arguments: r#"{"command": "uname -a"}"#.into(),
            },
        }];
        let calls = from_structured(structured, &resolver());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call-1");
        assert_eq!(calls[0].name, "run_command");
        assert_eq!(calls[0].parameters["command"], json!("uname -a"));
    }

    #[test]
    fn structured_call_with_bad_arguments_still_yields_a_call() {
        let structured = vec![StructuredCall {
            id: None,
            function: StructuredFunction {
                name: "web_search".into(),
                arguments: "not json".into(),
            },
        }];
        let calls = from_structured(structured, &resolver());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].parameters["input"], json!("not json"));
    }

    #[test]
    fn plain_text_yields_no_calls() {
        assert!(extract_from_text("Nothing to do here.", &resolver()).is_empty());
    }
}
