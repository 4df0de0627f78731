//! End-to-end monitoring of the demo research loop and recorded traces.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use watchtower::demo::ResearchLoopGraph;
use watchtower::trace::TraceGraph;
use watchtower::{watch, Config, Flow, LoopResult, RunOutcome};

fn config() -> Config {
    Config {
        threshold: 0.7,
        window_size: 10,
        min_steps: 5,
        silent: true,
        ..Config::default()
    }
}

#[tokio::test]
async fn research_loop_fires_hero_alert_once() {
    // 10 research rounds: 20 alternating steps, then the writer
    let fired: Arc<Mutex<Vec<LoopResult>>> = Arc::default();
    let sink = Arc::clone(&fired);
    let mut monitored = watch(ResearchLoopGraph::new(10), config())
        .unwrap()
        .on_loop(move |result| {
            sink.lock().unwrap().push(result.clone());
            Ok(Flow::Continue)
        });

    let outcome = monitored
        .invoke(&ResearchLoopGraph::initial_input("AI agent market analysis"))
        .await
        .unwrap();

    let fired = fired.lock().unwrap();
    assert_eq!(fired.len(), 1);
    let alert = &fired[0];
    assert!(alert.step_number >= 5);
    assert_eq!(alert.pattern, "research_agent→analysis_agent");
    assert!(alert.repeat_count >= 3);
    assert!(alert.score >= 0.7);

    let summary = monitored.summary();
    assert_eq!(summary.total_steps, 21);
    assert_eq!(summary.alerts.len(), 1);
    assert_eq!(
        outcome.output(),
        Some(&json!({"final_output": "Report based on 10 findings."}))
    );
}

#[tokio::test]
async fn stop_on_loop_cancels_demo_run() {
    let mut monitored = watch(ResearchLoopGraph::default(), config())
        .unwrap()
        .on_loop(|_| Ok(Flow::Stop));

    let outcome = monitored
        .invoke(&ResearchLoopGraph::initial_input("AI agent market analysis"))
        .await
        .unwrap();

    assert!(outcome.is_cancelled());
    let summary = monitored.summary();
    assert_eq!(summary.total_steps, 6);
    assert!(summary.loop_detected());
    assert_eq!(summary.alerts[0].step_number, 6);
}

#[tokio::test]
async fn progressing_trace_never_alerts() {
    let trace = [
        r#"{"node":"planner","output":{"plan":"outline"}}"#,
        r#"{"node":"researcher","output":{"messages":[{"tool_calls":[{"name":"search","args":{"q":"rust"}}]}]}}"#,
        r#"{"node":"coder","output":{"messages":[{"tool_calls":[{"name":"write_file","args":{"path":"lib.rs"}}]}]}}"#,
        r#"{"node":"tester","output":{"actions":[{"tool":"cargo_test","tool_input":"--all"}]}}"#,
        r#"{"node":"reviewer","output":{"analysis":"looks good"}}"#,
        r#"{"node":"writer","output":{"final_output":"shipped"}}"#,
    ]
    .join("\n");
    let mut monitored = watch(TraceGraph::from_jsonl(&trace), config()).unwrap();

    let outcome = monitored.invoke(&Value::Null).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Completed {
            output: Some(json!({"final_output": "shipped"}))
        }
    );
    let summary = monitored.summary();
    assert_eq!(summary.total_steps, 6);
    assert!(!summary.loop_detected());
    assert!(summary.max_score < 0.7);
}

#[tokio::test]
async fn corrupt_trace_completes_unmonitored() {
    let trace = [
        r#"{"node":"planner","output":{"plan":"outline"}}"#,
        "this line is not json",
        r#"{"node":"writer","output":{"final_output":"shipped"}}"#,
    ]
    .join("\n");
    let mut monitored = watch(TraceGraph::from_jsonl(&trace), config()).unwrap();

    let outcome = monitored.invoke(&Value::Null).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Unmonitored {
            output: json!({"final_output": "shipped"})
        }
    );
}

#[test]
fn replay_command_reports_loop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.jsonl");
    let mut lines = Vec::new();
    for i in 0..12 {
        let line = if i % 2 == 0 {
            json!({"research_agent": {"messages": [{"tool_calls": [{"name": "web_search", "args": {"query": "AI"}}]}]}})
        } else {
            json!({"analysis_agent": {"analysis": "more", "needs_more_research": true}})
        };
        lines.push(line.to_string());
    }
    std::fs::write(&path, lines.join("\n")).unwrap();

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_watchtower"))
        .arg("replay")
        .arg(&path)
        .arg("--json")
        .output()
        .expect("Failed to execute watchtower replay");

    assert_eq!(output.status.code(), Some(2));
    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["total_steps"], 12);
    assert_eq!(summary["alerts"].as_array().unwrap().len(), 1);
    assert_eq!(
        summary["alerts"][0]["pattern"],
        "research_agent→analysis_agent"
    );
}
