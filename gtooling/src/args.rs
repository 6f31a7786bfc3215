//! JSON argument parsing helpers for tool invocations.
//!
//! Model-produced argument strings are opaque payloads: they are validated
//! for object shape before dispatch, and rejection is a [`ToolError`] the
//! dispatcher turns into an error-envelope result rather than a guess at
//! intent. An empty argument string counts as the empty object.
//!
//! ```rust
//! use gtooling::{parse_call_arguments, required_string};
//!
//! let args = parse_call_arguments(r#"{"protocol":"AUTO"}"#).expect("object should parse");
//! let protocol = required_string(&args, "protocol").expect("protocol should be present");
//! assert_eq!(protocol, "AUTO");
//!
//! assert!(parse_call_arguments("   ").expect("empty is ok").is_empty());
//! ```

use serde_json::{Map, Value};

use crate::ToolError;

pub fn parse_json_value(args_json: &str) -> Result<Value, ToolError> {
    serde_json::from_str(args_json)
        .map_err(|err| ToolError::invalid_arguments(format!("invalid JSON arguments: {err}")))
}

/// Parses an accumulated argument string into the object the tool schema
/// expects. Whitespace-only input is the empty object.
pub fn parse_call_arguments(args_json: &str) -> Result<Map<String, Value>, ToolError> {
    if args_json.trim().is_empty() {
        return Ok(Map::new());
    }

    let value = parse_json_value(args_json)?;
    value
        .as_object()
        .cloned()
        .ok_or_else(|| ToolError::invalid_arguments("expected JSON object arguments"))
}

pub fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing required string: '{key}'")))
}

pub fn optional_u64(args: &Map<String, Value>, key: &str) -> Option<u64> {
    args.get(key).and_then(Value::as_u64)
}
