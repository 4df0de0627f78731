//! Sliding-window loop detection.
//!
//! Keeps the last `window_size` steps and computes a loop score on every new
//! step from three signals:
//! - node repetition: how dominant the most frequent node is, and how few
//!   distinct nodes appear
//! - sequence repetition: how much of the window a trailing repeated node
//!   pattern (length 2-4) covers
//! - tool repetition: share of tool calls that exactly repeat an earlier one

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::extractor::Extraction;
use crate::step::{LoopResult, StepRecord};

const SEQUENCE_WEIGHT: f64 = 0.45;
const NODE_WEIGHT: f64 = 0.30;
const TOOL_WEIGHT: f64 = 0.25;

const MIN_WINDOW_FOR_ANALYSIS: usize = 3;
const MIN_PATTERN_LEN: usize = 2;
const MAX_PATTERN_LEN: usize = 4;

/// Separator used when rendering node patterns
pub const PATTERN_SEPARATOR: &str = "→";

/// A repeating node pattern found at the end of the window
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceMatch {
    /// Fraction of the window covered by the repetitions
    pub coverage: f64,
    pub pattern: String,
    pub repeat_count: usize,
}

/// Sliding-window loop detector
#[derive(Debug)]
pub struct LoopDetector {
    window_size: usize,
    threshold: f64,
    window: VecDeque<StepRecord>,
    steps_seen: u64,
}

impl LoopDetector {
    /// Create a new LoopDetector
    pub fn new(window_size: usize, threshold: f64) -> Self {
        Self {
            window_size,
            threshold,
            window: VecDeque::new(),
            steps_seen: 0,
        }
    }

    /// Record a step and compute the current loop score
    pub fn add_step(&mut self, node_name: impl Into<String>, extraction: Extraction) -> LoopResult {
        self.steps_seen += 1;
        let step = StepRecord {
            node_name: node_name.into(),
            tool_calls: extraction.tool_calls,
            action_label: extraction.action_label,
            step_number: self.steps_seen,
        };
        self.window.push_back(step);
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }

        let result = self.analyze();
        debug!(
            "Step {}: score={} node={} seq={} tool={} pattern='{}'",
            result.step_number,
            result.score,
            result.node_repetition,
            result.sequence_repetition,
            result.tool_repetition,
            result.pattern
        );
        result
    }

    /// The most recently added step
    pub fn last_step(&self) -> Option<&StepRecord> {
        self.window.back()
    }

    /// Steps currently in the window, oldest first
    pub fn window(&self) -> impl Iterator<Item = &StepRecord> {
        self.window.iter()
    }

    /// Number of steps currently in the window
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Total steps recorded since the last reset
    pub fn steps_seen(&self) -> u64 {
        self.steps_seen
    }

    /// Clear all recorded steps
    pub fn reset(&mut self) {
        self.window.clear();
        self.steps_seen = 0;
    }

    fn analyze(&self) -> LoopResult {
        if self.window.len() < MIN_WINDOW_FOR_ANALYSIS {
            return LoopResult::quiet(self.steps_seen);
        }

        let names: Vec<&str> = self.window.iter().map(|s| s.node_name.as_str()).collect();
        let node_rep = node_repetition(&names);
        let sequence = detect_sequence_pattern(&names);
        let tool_rep = tool_repetition(self.window.iter());

        let score = (SEQUENCE_WEIGHT * sequence.coverage
            + NODE_WEIGHT * node_rep
            + TOOL_WEIGHT * tool_rep)
            .clamp(0.0, 1.0);

        LoopResult {
            score: round2(score),
            node_repetition: round2(node_rep),
            sequence_repetition: round2(sequence.coverage),
            tool_repetition: round2(tool_rep),
            pattern: sequence.pattern,
            repeat_count: sequence.repeat_count,
            is_alert: score >= self.threshold,
            step_number: self.steps_seen,
        }
    }
}

/// Node repetition: half concentration of the top node, half scarcity of distinct nodes
///
/// One distinct node scores 1.0 on scarcity, two 0.8, three 0.6, and so on.
pub fn node_repetition(names: &[&str]) -> f64 {
    if names.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &name in names {
        *counts.entry(name).or_default() += 1;
    }
    let most_common = counts.values().copied().max().unwrap_or(0);
    let concentration = most_common as f64 / names.len() as f64;
    let uniqueness = (1.0 - (counts.len() as f64 - 1.0) * 0.2).max(0.0);
    0.5 * concentration + 0.5 * uniqueness
}

/// Find the trailing node pattern that repeats consecutively and covers the most of the window
///
/// Pattern lengths are tried shortest first; a longer pattern only replaces the
/// current best when it covers strictly more.
pub fn detect_sequence_pattern(names: &[&str]) -> SequenceMatch {
    let mut best = SequenceMatch {
        coverage: 0.0,
        pattern: String::new(),
        repeat_count: 0,
    };

    let max_len = MAX_PATTERN_LEN.min(names.len() / 2);
    for pattern_len in MIN_PATTERN_LEN..=max_len {
        let candidate = &names[names.len() - pattern_len..];

        // Count consecutive non-overlapping blocks matching the candidate, walking back from the end
        let repeat_count = names
            .rchunks_exact(pattern_len)
            .take_while(|block| *block == candidate)
            .count();

        if repeat_count >= 2 {
            let coverage =
                ((repeat_count * pattern_len) as f64 / names.len() as f64).min(1.0);
            if coverage > best.coverage {
                best = SequenceMatch {
                    coverage,
                    pattern: candidate.join(PATTERN_SEPARATOR),
                    repeat_count,
                };
            }
        }
    }

    best
}

/// Tool repetition: repeated calls over total calls, exact signature match
pub fn tool_repetition<'a>(steps: impl Iterator<Item = &'a StepRecord>) -> f64 {
    let calls: Vec<&str> = steps
        .flat_map(|s| s.tool_calls.iter().map(String::as_str))
        .collect();
    if calls.len() < 2 {
        return 0.0;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &call in &calls {
        *counts.entry(call).or_default() += 1;
    }
    let repeated: usize = counts.values().map(|c| c - 1).sum();
    repeated as f64 / calls.len() as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
