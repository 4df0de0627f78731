//! A simulated research team that gets stuck in a loop.
//!
//! `research_agent` searches, `analysis_agent` always asks for more research
//! until the safety valve trips, and `writer_agent` is only reached afterwards.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::Result;
use crate::graph::{EventStream, Graph, NodeUpdate};

const DEFAULT_MAX_ITERATIONS: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DemoNode {
    Research,
    Analysis,
    Writer,
}

impl DemoNode {
    fn name(self) -> &'static str {
        match self {
            DemoNode::Research => "research_agent",
            DemoNode::Analysis => "analysis_agent",
            DemoNode::Writer => "writer_agent",
        }
    }
}

/// Research/analysis/writer graph whose analysis agent never has enough data
#[derive(Debug, Clone)]
pub struct ResearchLoopGraph {
    max_iterations: u64,
}

impl Default for ResearchLoopGraph {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

impl ResearchLoopGraph {
    /// Create a new ResearchLoopGraph; analysis gives up after `max_iterations` research rounds
    pub fn new(max_iterations: u64) -> Self {
        Self { max_iterations }
    }

    /// Initial state for a demo run
    pub fn initial_input(task: &str) -> Value {
        json!({
            "task": task,
            "research_results": [],
            "analysis": "",
            "needs_more_research": false,
            "final_output": "",
            "iteration": 0,
            "messages": [],
        })
    }

    fn start(&self, input: &Value) -> DemoRun {
        let mut state = Self::initial_input("")
            .as_object()
            .cloned()
            .unwrap_or_default();
        if let Some(fields) = input.as_object() {
            for (k, v) in fields {
                state.insert(k.clone(), v.clone());
            }
        }
        DemoRun {
            state,
            next: Some(DemoNode::Research),
            max_iterations: self.max_iterations,
        }
    }
}

/// One in-progress run of the demo graph
pub struct DemoRun {
    state: Map<String, Value>,
    next: Option<DemoNode>,
    max_iterations: u64,
}

impl DemoRun {
    fn iteration(&self) -> u64 {
        self.state
            .get("iteration")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Execute the next node, merge its output into the state, and route onwards
    fn step(&mut self) -> Option<NodeUpdate> {
        let node = self.next?;
        let output = match node {
            DemoNode::Research => self.research(),
            DemoNode::Analysis => self.analysis(),
            DemoNode::Writer => self.writer(),
        };
        if let Some(fields) = output.as_object() {
            for (k, v) in fields {
                self.state.insert(k.clone(), v.clone());
            }
        }

        self.next = match node {
            DemoNode::Research => Some(DemoNode::Analysis),
            DemoNode::Analysis => {
                let more = self
                    .state
                    .get("needs_more_research")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                Some(if more {
                    DemoNode::Research
                } else {
                    DemoNode::Writer
                })
            }
            DemoNode::Writer => None,
        };

        debug!("Demo node {} finished", node.name());
        Some(NodeUpdate::new(node.name(), output))
    }

    fn research(&self) -> Value {
        let iteration = self.iteration();
        let mut results = self
            .state
            .get("research_results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        results.push(json!(format!(
            "Research finding #{}: AI market data",
            iteration + 1
        )));
        let task = self
            .state
            .get("task")
            .and_then(Value::as_str)
            .unwrap_or_default();

        json!({
            "research_results": results,
            "iteration": iteration + 1,
            "messages": [{
                "type": "ai",
                "content": format!("Searching for more data on: {task}"),
                "tool_calls": [{
                    "name": "web_search",
                    "args": {"query": "AI agent market analysis"},
                    "id": format!("call_{iteration}"),
                }],
            }],
        })
    }

    fn analysis(&self) -> Value {
        let iteration = self.iteration();
        if iteration < self.max_iterations {
            json!({
                "analysis": format!("Round {iteration}: Data insufficient. Need more research."),
                "needs_more_research": true,
            })
        } else {
            json!({
                "analysis": "Analysis complete.",
                "needs_more_research": false,
            })
        }
    }

    fn writer(&self) -> Value {
        let findings = self
            .state
            .get("research_results")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        json!({ "final_output": format!("Report based on {findings} findings.") })
    }
}

#[async_trait]
impl EventStream for DemoRun {
    async fn next_update(&mut self) -> Result<Option<NodeUpdate>> {
        Ok(self.step())
    }
}

#[async_trait]
impl Graph for ResearchLoopGraph {
    async fn stream(&self, input: &Value) -> Result<Box<dyn EventStream>> {
        Ok(Box::new(self.start(input)))
    }

    async fn invoke(&self, input: &Value) -> Result<Value> {
        let mut run = self.start(input);
        while run.step().is_some() {}
        Ok(Value::Object(run.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_alternates_then_writes() {
        let graph = ResearchLoopGraph::new(3);
        let mut stream = graph
            .stream(&ResearchLoopGraph::initial_input("AI agents"))
            .await
            .unwrap();

        let mut nodes = Vec::new();
        while let Some(update) = stream.next_update().await.unwrap() {
            nodes.push(update.node);
        }
        assert_eq!(
            nodes,
            vec![
                "research_agent",
                "analysis_agent",
                "research_agent",
                "analysis_agent",
                "research_agent",
                "analysis_agent",
                "writer_agent",
            ]
        );
    }

    #[tokio::test]
    async fn test_research_emits_tool_call() {
        let graph = ResearchLoopGraph::default();
        let mut stream = graph
            .stream(&ResearchLoopGraph::initial_input("AI agents"))
            .await
            .unwrap();
        let first = stream.next_update().await.unwrap().unwrap();

        assert_eq!(first.node, "research_agent");
        assert_eq!(
            first.output["messages"][0]["tool_calls"][0]["name"],
            "web_search"
        );
        assert_eq!(first.output["iteration"], 1);
    }

    #[tokio::test]
    async fn test_invoke_returns_final_state() {
        let graph = ResearchLoopGraph::new(2);
        let state = graph
            .invoke(&ResearchLoopGraph::initial_input("AI agents"))
            .await
            .unwrap();

        assert_eq!(state["iteration"], 2);
        assert_eq!(state["needs_more_research"], false);
        assert_eq!(state["final_output"], "Report based on 2 findings.");
    }
}
