//! Session-scoped monitoring state and the per-update pipeline.
//!
//! Each update runs through extraction, detection and the alert gate before
//! the next one is pulled. A session owns all of its counters, so independent
//! sessions never share state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::detector::LoopDetector;
use crate::display::Reporter;
use crate::error::{Result, WatchtowerError};
use crate::extractor;
use crate::graph::NodeUpdate;
use crate::policy::AlertPolicy;
use crate::step::LoopResult;

/// What the host wants to happen after a loop callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Keep consuming updates
    #[default]
    Continue,
    /// Stop consuming updates gracefully; not an error
    Stop,
}

/// Callback fired with the escalated result when the hero alert triggers
///
/// Returning `Err` is a monitoring fault; returning `Ok(Flow::Stop)` cancels the run.
pub type LoopCallback = Box<dyn FnMut(&LoopResult) -> anyhow::Result<Flow> + Send>;

/// Result of feeding one scored update through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredUpdate {
    pub result: LoopResult,
    /// Whether this update triggered the hero alert
    pub escalated: bool,
    pub flow: Flow,
}

/// Post-run summary of a monitoring session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub total_steps: usize,
    pub alerts: Vec<LoopResult>,
    pub max_score: f64,
}

impl SessionSummary {
    /// Check if any loop escalated during the session
    pub fn loop_detected(&self) -> bool {
        !self.alerts.is_empty()
    }
}

/// A single monitoring session
pub struct Session {
    config: Config,
    detector: LoopDetector,
    policy: AlertPolicy,
    reporter: Reporter,
    callback: Option<LoopCallback>,
    session_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    total_steps: usize,
    max_score: f64,
    alerts: Vec<LoopResult>,
}

impl Session {
    /// Create a new Session reporting to stdout; the configuration is validated first
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let reporter = Reporter::stdout(config.silent);
        Ok(Self {
            detector: LoopDetector::new(config.window_size, config.threshold),
            policy: AlertPolicy::from_config(&config),
            reporter,
            callback: None,
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            total_steps: 0,
            max_score: 0.0,
            alerts: Vec::new(),
            config,
        })
    }

    /// Replace the output sink
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Set the callback fired on the hero alert
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&LoopResult) -> anyhow::Result<Flow> + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    /// Results that escalated to the hero alert
    pub fn alerts(&self) -> &[LoopResult] {
        &self.alerts
    }

    pub fn hero_alert_fired(&self) -> bool {
        self.policy.has_fired()
    }

    /// Begin a fresh session: clears the window and all counters
    pub fn start(&mut self) -> Result<()> {
        self.detector.reset();
        self.policy.reset();
        self.session_id = Uuid::new_v4();
        self.started_at = Utc::now();
        self.finished_at = None;
        self.total_steps = 0;
        self.max_score = 0.0;
        self.alerts.clear();

        info!(
            "Starting watchtower session {} (threshold {}, window {})",
            self.session_id, self.config.threshold, self.config.window_size
        );
        self.reporter.start(&self.config.framework)
    }

    /// Run one update through extraction, detection and the alert gate
    ///
    /// Returns None for framework-internal nodes, which are not scored.
    pub fn process(&mut self, update: &NodeUpdate) -> Result<Option<ScoredUpdate>> {
        if update.is_internal() {
            debug!("Skipping internal node {}", update.node);
            return Ok(None);
        }

        let extraction = extractor::extract(&update.output);
        let result = self.detector.add_step(update.node.as_str(), extraction);
        self.total_steps += 1;
        self.max_score = self.max_score.max(result.score);

        if let Some(step) = self.detector.last_step() {
            self.reporter.step(step, &result)?;
        }

        let escalated = self.policy.evaluate(&result, self.total_steps);
        let mut flow = Flow::Continue;
        if escalated {
            info!(
                "Loop detected at step {}: pattern '{}' x{} (score {})",
                self.total_steps, result.pattern, result.repeat_count, result.score
            );
            self.alerts.push(result.clone());
            self.reporter.alert(&result, self.total_steps)?;
            if let Some(callback) = self.callback.as_mut() {
                flow = callback(&result)
                    .map_err(|e| WatchtowerError::CallbackError(format!("{e:#}")))?;
            }
        }

        Ok(Some(ScoredUpdate {
            result,
            escalated,
            flow,
        }))
    }

    /// Finish the session, print the summary and return it
    pub fn stop(&mut self) -> SessionSummary {
        self.finished_at = Some(Utc::now());
        info!(
            "Session {} finished: {} steps, {} alerts, peak score {}",
            self.session_id,
            self.total_steps,
            self.alerts.len(),
            self.max_score
        );
        if let Err(e) = self
            .reporter
            .summary(self.total_steps, self.alerts.len(), self.max_score)
        {
            warn!("Failed to print session summary: {}", e);
        }
        self.summary()
    }

    /// Report a monitoring fault once; monitoring is abandoned by the caller
    pub fn report_fault(&mut self, error: &WatchtowerError) {
        warn!("Monitoring error in session {}: {}", self.session_id, error);
        if let Err(e) = self.reporter.warning(&format!("monitoring error: {error}")) {
            debug!("Failed to print monitoring warning: {}", e);
        }
    }

    /// Snapshot of the session counters
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id,
            started_at: self.started_at,
            finished_at: self.finished_at,
            total_steps: self.total_steps,
            alerts: self.alerts.clone(),
            max_score: self.max_score,
        }
    }
}
