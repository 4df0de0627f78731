//! Normalization of raw node output payloads.
//!
//! Graph nodes return loosely-typed JSON. Before any extraction runs, a payload
//! is sorted into one of a few shapes:
//! - `Absent`: the node returned nothing (`null`)
//! - `Mapping`: a JSON object, with its `messages` and `actions` pre-parsed
//! - `Opaque`: anything else (strings, numbers, bare arrays)

use serde_json::{Map, Value};

/// A tool invocation found inside a message
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

/// A message entry from the `messages` list
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Message exposing a `tool_calls` list with `name` + `args`
    ToolCalling(Vec<ToolCall>),
    /// Message carrying `additional_kwargs.tool_calls[].function` with serialized arguments
    LegacyFunctionCall(Vec<ToolCall>),
    /// Any other message
    Plain,
}

/// An agent action entry from the `actions` list
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub tool: String,
    pub input: Value,
}

/// A JSON object payload with its message and action lists parsed
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub fields: Map<String, Value>,
    pub messages: Vec<Message>,
    pub actions: Vec<Action>,
}

impl Mapping {
    /// Check if a key is present, regardless of its value
    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Check if a key is present and its value is truthy
    pub fn is_truthy(&self, key: &str) -> bool {
        self.fields.get(key).is_some_and(is_truthy)
    }

    /// Keys that are not marked private with a leading underscore
    pub fn public_keys(&self) -> impl Iterator<Item = &str> {
        self.fields
            .keys()
            .map(String::as_str)
            .filter(|k| !k.starts_with('_'))
    }
}

/// A normalized node output
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    Absent,
    Mapping(Mapping),
    Opaque(Value),
}

impl NodeOutput {
    /// Sort a raw payload into its normalized shape
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => NodeOutput::Absent,
            Value::Object(fields) => NodeOutput::Mapping(Mapping {
                fields: fields.clone(),
                messages: parse_messages(fields.get("messages")),
                actions: parse_actions(fields.get("actions")),
            }),
            other => NodeOutput::Opaque(other.clone()),
        }
    }

    /// Get the shape name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            NodeOutput::Absent => "absent",
            NodeOutput::Mapping(_) => "mapping",
            NodeOutput::Opaque(_) => "opaque",
        }
    }
}

/// Python-style truthiness: null, false, zero and empty containers are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn parse_messages(messages: Option<&Value>) -> Vec<Message> {
    match messages {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(parse_message).collect(),
        // A single message is treated as a one-element list
        Some(single) => vec![parse_message(single)],
    }
}

fn parse_message(message: &Value) -> Message {
    let Some(fields) = message.as_object() else {
        return Message::Plain;
    };

    if let Some(tool_calls) = fields.get("tool_calls") {
        let calls = tool_calls
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .map(|tc| ToolCall {
                        name: string_or_unknown(tc.get("name")),
                        args: tc
                            .get("args")
                            .cloned()
                            .unwrap_or_else(|| Value::Object(Map::new())),
                    })
                    .collect()
            })
            .unwrap_or_default();
        return Message::ToolCalling(calls);
    }

    if let Some(kwargs) = fields.get("additional_kwargs") {
        let calls = kwargs
            .get("tool_calls")
            .and_then(|t| t.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .map(|tc| {
                        let function = tc.get("function");
                        ToolCall {
                            name: string_or_unknown(function.and_then(|f| f.get("name"))),
                            args: function
                                .and_then(|f| f.get("arguments"))
                                .cloned()
                                .unwrap_or_else(|| Value::String(String::new())),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        return Message::LegacyFunctionCall(calls);
    }

    Message::Plain
}

fn parse_actions(actions: Option<&Value>) -> Vec<Action> {
    actions
        .and_then(|a| a.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|action| {
                    let tool = action.get("tool")?;
                    Some(Action {
                        tool: display_value(tool),
                        input: action.get("tool_input").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn string_or_unknown(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "unknown".to_string(),
        Some(v) => display_value(v),
    }
}

/// Render a value for display: strings without quotes, everything else as compact JSON
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_is_absent() {
        assert_eq!(NodeOutput::from_value(&Value::Null), NodeOutput::Absent);
    }

    #[test]
    fn test_non_object_is_opaque() {
        let output = NodeOutput::from_value(&json!("just text"));
        assert_eq!(output.kind(), "opaque");
        let output = NodeOutput::from_value(&json!([1, 2, 3]));
        assert_eq!(output.kind(), "opaque");
    }

    #[test]
    fn test_parse_tool_calling_message() {
        let value = json!({
            "messages": [{
                "content": "searching",
                "tool_calls": [{"name": "web_search", "args": {"query": "AI"}, "id": "call_0"}]
            }]
        });
        let NodeOutput::Mapping(mapping) = NodeOutput::from_value(&value) else {
            panic!("Expected mapping");
        };
        assert_eq!(
            mapping.messages,
            vec![Message::ToolCalling(vec![ToolCall {
                name: "web_search".to_string(),
                args: json!({"query": "AI"}),
            }])]
        );
    }

    #[test]
    fn test_parse_legacy_function_call() {
        let value = json!({
            "messages": [{
                "additional_kwargs": {
                    "tool_calls": [{"function": {"name": "lookup", "arguments": "{\"id\": 7}"}}]
                }
            }]
        });
        let NodeOutput::Mapping(mapping) = NodeOutput::from_value(&value) else {
            panic!("Expected mapping");
        };
        assert_eq!(
            mapping.messages,
            vec![Message::LegacyFunctionCall(vec![ToolCall {
                name: "lookup".to_string(),
                args: json!("{\"id\": 7}"),
            }])]
        );
    }

    #[test]
    fn test_tool_calls_key_wins_over_legacy() {
        let value = json!({
            "messages": {"tool_calls": [], "additional_kwargs": {"tool_calls": [{"function": {"name": "x"}}]}}
        });
        let NodeOutput::Mapping(mapping) = NodeOutput::from_value(&value) else {
            panic!("Expected mapping");
        };
        assert_eq!(mapping.messages, vec![Message::ToolCalling(vec![])]);
    }

    #[test]
    fn test_missing_names_become_unknown() {
        let value = json!({"messages": [{"tool_calls": [{"args": {}}]}]});
        let NodeOutput::Mapping(mapping) = NodeOutput::from_value(&value) else {
            panic!("Expected mapping");
        };
        let Message::ToolCalling(calls) = &mapping.messages[0] else {
            panic!("Expected tool calling message");
        };
        assert_eq!(calls[0].name, "unknown");
    }

    #[test]
    fn test_single_message_becomes_list() {
        let value = json!({"messages": "hello"});
        let NodeOutput::Mapping(mapping) = NodeOutput::from_value(&value) else {
            panic!("Expected mapping");
        };
        assert_eq!(mapping.messages, vec![Message::Plain]);
    }

    #[test]
    fn test_actions_without_tool_are_skipped() {
        let value = json!({
            "actions": [
                {"tool": "calculator", "tool_input": "2+2"},
                {"log": "thinking"},
                "not an action"
            ]
        });
        let NodeOutput::Mapping(mapping) = NodeOutput::from_value(&value) else {
            panic!("Expected mapping");
        };
        assert_eq!(
            mapping.actions,
            vec![Action {
                tool: "calculator".to_string(),
                input: json!("2+2"),
            }]
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1.5)));
        assert!(is_truthy(&json!(["x"])));
    }

    #[test]
    fn test_public_keys_skip_private() {
        let NodeOutput::Mapping(mapping) =
            NodeOutput::from_value(&json!({"_internal": 1, "result": 2}))
        else {
            panic!("Expected mapping");
        };
        assert_eq!(mapping.public_keys().collect::<Vec<_>>(), vec!["result"]);
    }
}
