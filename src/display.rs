//! Terminal output for monitoring sessions.

use std::io::Write;

use colored::Colorize;

use crate::error::{Result, WatchtowerError};
use crate::step::{LoopResult, StepRecord};

const RULE_WIDTH: usize = 50;
const SHOWN_TOOL_CALLS: usize = 2;

/// Format a single step line
pub fn format_step(step: &StepRecord, result: &LoopResult) -> String {
    let prefix = format!(
        "{} {}",
        "[watchtower]".dimmed(),
        format!("step {:>2}", step.step_number).bright_black()
    );
    let node = step.node_name.cyan();

    let action = if !step.tool_calls.is_empty() {
        let mut tools = step
            .tool_calls
            .iter()
            .take(SHOWN_TOOL_CALLS)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if step.tool_calls.len() > SHOWN_TOOL_CALLS {
            tools.push_str(&format!(" +{}", step.tool_calls.len() - SHOWN_TOOL_CALLS));
        }
        format!(" → {}", tools.bright_white())
    } else if !step.action_label.is_empty() {
        format!(" → {}", step.action_label.dimmed())
    } else {
        String::new()
    };

    let score = format!("score:{:.2}", result.score);
    let status = if result.score < 0.3 {
        format!(" {}", "✓".green())
    } else if result.score < 0.5 {
        format!(" {} {}", "~".yellow(), score.dimmed())
    } else if result.score < 0.7 {
        format!(" {} {}", "⚡ repeat".yellow(), score.dimmed())
    } else {
        format!(" {} {}", "⚡ repeat".red(), score.dimmed())
    };

    format!("{prefix} {node}{action}{status}")
}

/// Format the hero alert block
pub fn format_alert(result: &LoopResult, detected_at_step: usize) -> String {
    let rule = "─".repeat(RULE_WIDTH);
    let severity = if result.score >= 0.8 { "🔴" } else { "🟡" };
    let lines = [
        String::new(),
        format!("  {}", "⚠️  LOOP DETECTED".red().bold()),
        format!("  {}", rule.red()),
        format!(
            "  Score:     {}  {}",
            format!("{:.2}", result.score).bold(),
            severity
        ),
        format!(
            "  Pattern:   {}  (×{})",
            result.pattern.bold(),
            result.repeat_count
        ),
        format!(
            "  {}",
            format!(
                "Breakdown: node_rep={:.2}  seq_rep={:.2}  tool_rep={:.2}",
                result.node_repetition, result.sequence_repetition, result.tool_repetition
            )
            .bright_black()
        ),
        format!("  {}", rule.red()),
        format!(
            "  {}",
            format!(
                "⏱  Caught at step {detected_at_step}. Without detection this loop would continue indefinitely."
            )
            .yellow()
        ),
        String::new(),
    ];
    lines.join("\n")
}

/// Format the end-of-run summary
pub fn format_summary(total_steps: usize, alerts: usize, max_score: f64) -> String {
    let rule = "─".repeat(RULE_WIDTH);
    let detected = if alerts > 0 {
        "yes".red()
    } else {
        "no".green()
    };
    let peak = format!("{max_score:.2}");
    let peak = if max_score >= 0.7 {
        peak.red()
    } else {
        peak.green()
    };
    let lines = [
        String::new(),
        format!("  {}", rule.dimmed()),
        format!("  {}", "watchtower summary".bold()),
        format!(
            "  {} {}",
            "Steps monitored: ".bright_black(),
            total_steps.to_string().bright_white()
        ),
        format!("  {} {}", "Loop detected:   ".bright_black(), detected),
        format!("  {} {}", "Peak loop score: ".bright_black(), peak),
        format!("  {}", rule.dimmed()),
        String::new(),
    ];
    lines.join("\n")
}

/// Format the startup banner
pub fn format_start(framework: &str) -> String {
    let rule = "─".repeat(RULE_WIDTH);
    let lines = [
        String::new(),
        format!("  {}", rule.dimmed()),
        format!(
            "  {} {}",
            "🗼 watchtower".bold(),
            format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
        ),
        format!(
            "  {} {}",
            "monitoring:".bright_black(),
            framework.bright_white()
        ),
        format!(
            "  {} {}",
            "metrics:   ".bright_black(),
            "Loop Score".bright_white()
        ),
        format!("  {}", rule.dimmed()),
        String::new(),
    ];
    lines.join("\n")
}

/// Format a monitoring failure warning
pub fn format_warning(message: &str) -> String {
    format!("  {}", format!("[watchtower] {message}").yellow())
}

/// Writes human-facing session output, unless silenced
pub struct Reporter {
    out: Box<dyn Write + Send>,
    silent: bool,
}

impl Reporter {
    /// Create a Reporter writing to stdout
    pub fn stdout(silent: bool) -> Self {
        Self::new(Box::new(std::io::stdout()), silent)
    }

    /// Create a Reporter writing to any sink
    pub fn new(out: Box<dyn Write + Send>, silent: bool) -> Self {
        Self { out, silent }
    }

    pub fn start(&mut self, framework: &str) -> Result<()> {
        self.emit(|| format_start(framework))
    }

    pub fn step(&mut self, step: &StepRecord, result: &LoopResult) -> Result<()> {
        self.emit(|| format_step(step, result))
    }

    pub fn alert(&mut self, result: &LoopResult, detected_at_step: usize) -> Result<()> {
        self.emit(|| format_alert(result, detected_at_step))
    }

    pub fn summary(&mut self, total_steps: usize, alerts: usize, max_score: f64) -> Result<()> {
        self.emit(|| format_summary(total_steps, alerts, max_score))
    }

    pub fn warning(&mut self, message: &str) -> Result<()> {
        self.emit(|| format_warning(message))
    }

    fn emit(&mut self, render: impl FnOnce() -> String) -> Result<()> {
        if self.silent {
            return Ok(());
        }
        writeln!(self.out, "{}", render()).map_err(WatchtowerError::ReportError)?;
        self.out.flush().map_err(WatchtowerError::ReportError)
    }
}
