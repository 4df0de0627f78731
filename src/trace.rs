//! Replay of recorded graph runs.
//!
//! A trace is JSONL, one stream event per line, in either shape:
//! - `{"node": "research_agent", "output": {...}}`
//! - a LangGraph updates map: `{"research_agent": {...}, "other_node": {...}}`

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, WatchtowerError};
use crate::graph::{EventStream, Graph, NodeUpdate};

/// Parse one trace line into the node updates it carries
pub fn parse_line(line: &str) -> Result<Vec<NodeUpdate>> {
    let line = line.trim();
    if line.is_empty() {
        return Err(WatchtowerError::JsonParseError("Empty line".to_string()));
    }

    let value: Value =
        serde_json::from_str(line).map_err(|e| WatchtowerError::JsonParseError(e.to_string()))?;

    let Value::Object(fields) = value else {
        return Err(WatchtowerError::JsonParseError(format!(
            "expected a JSON object, got: {line}"
        )));
    };

    if let Some(node) = fields.get("node").and_then(|n| n.as_str()) {
        let output = fields.get("output").cloned().unwrap_or(Value::Null);
        return Ok(vec![NodeUpdate::new(node, output)]);
    }

    Ok(fields
        .into_iter()
        .map(|(node, output)| NodeUpdate::new(node, output))
        .collect())
}

/// A graph that replays a recorded trace
#[derive(Debug, Clone)]
pub struct TraceGraph {
    lines: Vec<String>,
}

impl TraceGraph {
    /// Create a TraceGraph from JSONL text
    pub fn from_jsonl(content: &str) -> Self {
        Self {
            lines: content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Load a TraceGraph from a JSONL file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(WatchtowerError::TraceReadError)?;
        Ok(Self::from_jsonl(&content))
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Stream over a recorded trace; malformed lines are errors
pub struct TraceStream {
    lines: std::vec::IntoIter<String>,
    line_number: usize,
    pending: VecDeque<NodeUpdate>,
}

#[async_trait]
impl EventStream for TraceStream {
    async fn next_update(&mut self) -> Result<Option<NodeUpdate>> {
        loop {
            if let Some(update) = self.pending.pop_front() {
                return Ok(Some(update));
            }
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            self.line_number += 1;
            let updates = parse_line(&line).map_err(|e| {
                WatchtowerError::StreamError(format!("line {}: {}", self.line_number, e))
            })?;
            self.pending.extend(updates);
        }
    }
}

#[async_trait]
impl Graph for TraceGraph {
    async fn stream(&self, _input: &Value) -> Result<Box<dyn EventStream>> {
        Ok(Box::new(TraceStream {
            lines: self.lines.clone().into_iter(),
            line_number: 0,
            pending: VecDeque::new(),
        }))
    }

    /// Replay without monitoring: malformed lines are skipped
    async fn invoke(&self, _input: &Value) -> Result<Value> {
        let mut last = Value::Null;
        for (i, line) in self.lines.iter().enumerate() {
            match parse_line(line) {
                Ok(updates) => {
                    if let Some(update) = updates.into_iter().rev().find(|u| !u.is_internal()) {
                        last = update.output;
                    }
                }
                Err(e) => {
                    debug!("Skipping trace line {}: {}", i + 1, e);
                }
            }
        }
        Ok(last)
    }
}
