//! Step extraction: turns a raw node output into tool-call signatures and an
//! action label.
//!
//! Extraction never fails. Unexpected payload shapes degrade to no tool calls
//! and the generic `step` label.

use serde_json::Value;

use crate::node_output::{display_value, Mapping, Message, NodeOutput};

const MAX_RAW_ARGS_CHARS: usize = 40;
const MAX_ARG_VALUE_CHARS: usize = 30;
const MAX_ARG_PAIRS: usize = 2;

/// Tool calls and action label extracted from one node output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub tool_calls: Vec<String>,
    pub action_label: String,
}

/// Extract tool calls and an action label from a raw payload
pub fn extract(payload: &Value) -> Extraction {
    let output = NodeOutput::from_value(payload);
    let tool_calls = extract_tool_calls(&output);
    let action_label = if tool_calls.is_empty() {
        action_label(&output)
    } else {
        // Tool calls are shown instead
        String::new()
    };
    Extraction {
        tool_calls,
        action_label,
    }
}

/// Render every tool call in a normalized output as `name(compact_args)`
pub fn extract_tool_calls(output: &NodeOutput) -> Vec<String> {
    let NodeOutput::Mapping(mapping) = output else {
        return Vec::new();
    };

    let mut calls = Vec::new();
    for message in &mapping.messages {
        match message {
            Message::ToolCalling(tool_calls) | Message::LegacyFunctionCall(tool_calls) => {
                calls.extend(
                    tool_calls
                        .iter()
                        .map(|tc| format!("{}({})", tc.name, compact_args(&tc.args))),
                );
            }
            Message::Plain => {}
        }
    }
    calls.extend(
        mapping
            .actions
            .iter()
            .map(|action| format!("{}({})", action.tool, compact_args(&action.input))),
    );
    calls
}

/// One entry of the action label table
struct LabelRule {
    matches: fn(&Mapping) -> bool,
    label: fn(&Mapping) -> String,
}

/// Label rules in priority order; the first match wins
const LABEL_RULES: &[LabelRule] = &[
    LabelRule {
        matches: has_analysis,
        label: label_analyze,
    },
    LabelRule {
        matches: has_final_output,
        label: label_write,
    },
    LabelRule {
        matches: has_research_decision,
        label: label_decide,
    },
    LabelRule {
        matches: has_messages,
        label: label_respond,
    },
    LabelRule {
        matches: has_public_keys,
        label: label_update,
    },
];

fn has_analysis(m: &Mapping) -> bool {
    m.has("analysis")
}

fn has_final_output(m: &Mapping) -> bool {
    m.has("final_output")
}

fn has_research_decision(m: &Mapping) -> bool {
    m.has("needs_more_research")
}

fn has_messages(m: &Mapping) -> bool {
    m.is_truthy("messages")
}

fn has_public_keys(m: &Mapping) -> bool {
    m.public_keys().next().is_some()
}

fn label_analyze(_: &Mapping) -> String {
    "analyze".to_string()
}

fn label_write(_: &Mapping) -> String {
    "write".to_string()
}

fn label_decide(m: &Mapping) -> String {
    if m.is_truthy("needs_more_research") {
        "decide → more research".to_string()
    } else {
        "decide → done".to_string()
    }
}

fn label_respond(_: &Mapping) -> String {
    "respond".to_string()
}

fn label_update(m: &Mapping) -> String {
    let keys: Vec<&str> = m.public_keys().take(2).collect();
    format!("update({})", keys.join(", "))
}

/// Infer a short label describing what a node did without calling tools
pub fn action_label(output: &NodeOutput) -> String {
    match output {
        NodeOutput::Absent => "idle".to_string(),
        NodeOutput::Mapping(mapping) => LABEL_RULES
            .iter()
            .find(|rule| (rule.matches)(mapping))
            .map(|rule| (rule.label)(mapping))
            .unwrap_or_else(|| "step".to_string()),
        NodeOutput::Opaque(_) => "step".to_string(),
    }
}

/// Make tool arguments compact for display
///
/// Strings are parsed as JSON when possible; objects show at most two
/// `key=value` pairs.
pub fn compact_args(args: &Value) -> String {
    match args {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed) => compact_structured(&parsed),
            Err(_) => truncate_with_ellipsis(raw, MAX_RAW_ARGS_CHARS),
        },
        other => compact_structured(other),
    }
}

fn compact_structured(args: &Value) -> String {
    match args {
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .take(MAX_ARG_PAIRS)
                .map(|(k, v)| {
                    format!(
                        "{}={}",
                        k,
                        truncate_with_ellipsis(&display_value(v), MAX_ARG_VALUE_CHARS)
                    )
                })
                .collect();
            let mut result = parts.join(", ");
            if map.len() > MAX_ARG_PAIRS {
                result.push_str(", ...");
            }
            result
        }
        other => display_value(other)
            .chars()
            .take(MAX_RAW_ARGS_CHARS)
            .collect(),
    }
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
