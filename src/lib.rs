//! Watchtower: runtime loop detection for multi-agent orchestration graphs.
//!
//! This crate watches the step-by-step updates of a graph run, scores how
//! repetitive the recent steps are, and raises a single alert when the team
//! appears stuck, so the host can stop before wasting more resources.

pub mod config;
pub mod demo;
pub mod detector;
pub mod display;
pub mod error;
pub mod extractor;
pub mod graph;
pub mod interceptor;
pub mod node_output;
pub mod policy;
pub mod session;
pub mod step;
pub mod trace;

pub use config::Config;
pub use detector::LoopDetector;
pub use error::{Result, WatchtowerError};
pub use graph::{EventStream, Graph, NodeUpdate};
pub use interceptor::{RunOutcome, Watchtower};
pub use session::{Flow, Session, SessionSummary};
pub use step::{LoopResult, StepRecord};

/// Wrap a graph with loop monitoring
pub fn watch<G: Graph>(graph: G, config: Config) -> Result<Watchtower<G>> {
    Watchtower::new(graph, config)
}
