use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::graph::Graph;
use crate::session::{Flow, Session, SessionSummary};
use crate::step::LoopResult;

/// How a monitored run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The stream finished; holds the last node output
    Completed { output: Option<Value> },
    /// The loop callback asked to stop; holds the last node output seen
    Cancelled { output: Option<Value> },
    /// Monitoring failed and the graph was re-run without it
    Unmonitored { output: Value },
}

impl RunOutcome {
    /// The output returned to the host
    pub fn output(&self) -> Option<&Value> {
        match self {
            RunOutcome::Completed { output } | RunOutcome::Cancelled { output } => output.as_ref(),
            RunOutcome::Unmonitored { output } => Some(output),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled { .. })
    }
}

/// Wraps a graph and monitors its execution for loops
///
/// Monitoring never breaks the run it observes: any fault in the monitored
/// loop abandons monitoring and the graph is invoked directly instead.
pub struct Watchtower<G: Graph> {
    graph: G,
    session: Session,
}

impl<G: Graph> Watchtower<G> {
    /// Create a new Watchtower around a graph
    pub fn new(graph: G, config: Config) -> Result<Self> {
        Ok(Self {
            graph,
            session: Session::new(config)?,
        })
    }

    /// Create a new Watchtower with an existing session
    pub fn with_session(graph: G, session: Session) -> Self {
        Self { graph, session }
    }

    /// Set the callback fired on the hero alert
    pub fn on_loop<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&LoopResult) -> anyhow::Result<Flow> + Send + 'static,
    {
        self.session = self.session.with_callback(callback);
        self
    }

    /// Get a reference to the session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Results that escalated during the last run
    pub fn alerts(&self) -> &[LoopResult] {
        self.session.alerts()
    }

    /// Summary of the last run
    pub fn summary(&self) -> SessionSummary {
        self.session.summary()
    }

    /// Run the graph with monitoring
    pub async fn invoke(&mut self, input: &Value) -> Result<RunOutcome> {
        match self.monitored_run(input).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.session.report_fault(&e);
                warn!("Monitoring abandoned, running graph unmonitored");
                let output = self.graph.invoke(input).await?;
                Ok(RunOutcome::Unmonitored { output })
            }
        }
    }

    async fn monitored_run(&mut self, input: &Value) -> Result<RunOutcome> {
        self.session.start()?;
        let mut stream = self.graph.stream(input).await?;
        let mut last_output = None;

        while let Some(update) = stream.next_update().await? {
            let Some(scored) = self.session.process(&update)? else {
                continue;
            };
            last_output = Some(update.output);

            if scored.flow == Flow::Stop {
                info!(
                    "Run cancelled by loop callback at step {}",
                    scored.result.step_number
                );
                self.session.stop();
                return Ok(RunOutcome::Cancelled {
                    output: last_output,
                });
            }
        }

        debug!("Event stream finished");
        self.session.stop();
        Ok(RunOutcome::Completed {
            output: last_output,
        })
    }
}
