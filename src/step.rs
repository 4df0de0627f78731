//! Canonical step records and loop analysis results.

use serde::{Deserialize, Serialize};

/// A single execution step captured from the graph stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Name of the node that produced this step
    pub node_name: String,
    /// Compact call signatures like `web_search(query=AI market)`
    pub tool_calls: Vec<String>,
    /// Short description of what the node did; empty when tool calls are present
    pub action_label: String,
    /// 1-indexed position of this step in the session
    pub step_number: u64,
}

/// Outcome of analysing the window after a step was added
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopResult {
    /// Combined loop score (0.0 = no loop, 1.0 = fully stuck)
    pub score: f64,
    pub node_repetition: f64,
    pub sequence_repetition: f64,
    pub tool_repetition: f64,
    /// Repeating node sequence like `research_agent→analysis_agent`
    pub pattern: String,
    /// Consecutive repetitions of `pattern` at the end of the window
    pub repeat_count: usize,
    /// Whether the score reached the configured threshold
    pub is_alert: bool,
    /// Step that produced this result
    pub step_number: u64,
}

impl LoopResult {
    /// A zero-valued, non-alerting result
    pub fn quiet(step_number: u64) -> Self {
        Self {
            score: 0.0,
            node_repetition: 0.0,
            sequence_repetition: 0.0,
            tool_repetition: 0.0,
            pattern: String::new(),
            repeat_count: 0,
            is_alert: false,
            step_number,
        }
    }
}
