use crate::config::Config;
use crate::step::LoopResult;

/// One-shot escalation gate for the hero alert
///
/// Fires at most once per session, and only once enough steps were seen and
/// the detected pattern repeated often enough.
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    min_steps: usize,
    min_repeats: usize,
    fired: bool,
}

impl AlertPolicy {
    /// Create a new AlertPolicy
    pub fn new(min_steps: usize, min_repeats: usize) -> Self {
        Self {
            min_steps,
            min_repeats,
            fired: false,
        }
    }

    /// Create an AlertPolicy from session configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.min_steps, config.min_repeats)
    }

    /// Decide whether this result escalates, marking the alert as fired if so
    pub fn evaluate(&mut self, result: &LoopResult, total_steps: usize) -> bool {
        let escalate = result.is_alert
            && !self.fired
            && total_steps >= self.min_steps
            && result.repeat_count >= self.min_repeats;
        if escalate {
            self.fired = true;
        }
        escalate
    }

    /// Check if the hero alert already fired this session
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Re-arm the gate for a new session
    pub fn reset(&mut self) {
        self.fired = false;
    }
}
