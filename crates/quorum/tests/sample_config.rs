//! Runs the shipped sample configuration and snapshots end to end.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quorum::agents::StaticContextProvider;
use quorum::models::{Action, AgentType, RiskLevel, TaskStatus};

fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config")
}

fn sample_orchestrator() -> quorum::agents::Orchestrator {
    let config = quorum::load_config(config_dir().join("quorum.toml")).unwrap();
    let contexts = quorum::load_contexts(config_dir().join("contexts.sample.json")).unwrap();
    quorum::build_orchestrator(&config, Arc::new(StaticContextProvider::new(contexts)))
}

#[tokio::test]
async fn sample_files_produce_decisions() {
    let orchestrator = sample_orchestrator();
    assert_eq!(
        orchestrator.registered_agents(),
        vec![
            AgentType::Technical,
            AgentType::Fundamental,
            AgentType::Sentiment,
            AgentType::Risk,
        ]
    );

    let aapl = orchestrator.request_sync("AAPL").await;
    assert!(!aapl.degraded);
    assert_eq!(aapl.decision, Action::Buy);
    assert_eq!(aapl.risk_assessment.level, RiskLevel::Low);
    assert_eq!(aapl.agent_results.len(), 4);

    let tsla = orchestrator.request_sync("TSLA").await;
    assert_eq!(tsla.decision, Action::Sell);
    assert_eq!(tsla.risk_assessment.level, RiskLevel::High);
    assert!((tsla.risk_assessment.score - 0.82).abs() < 1e-9);
    assert!((1..=10).contains(&tsla.execution_priority));
}

#[tokio::test]
async fn unknown_symbol_degrades() {
    let orchestrator = sample_orchestrator();
    let result = orchestrator.request_sync("GME").await;
    assert!(result.degraded);
    assert_eq!(result.decision, Action::Hold);
}

#[tokio::test]
async fn sample_files_through_worker_pool() {
    let orchestrator = sample_orchestrator();
    orchestrator.start(2).unwrap();

    let aapl = orchestrator.request_async("AAPL", 2).await.unwrap();
    let tsla = orchestrator.request_async("TSLA", 1).await.unwrap();

    let aapl = orchestrator
        .wait_for_result(aapl, Duration::from_secs(2))
        .await
        .unwrap();
    let tsla_result = orchestrator
        .wait_for_result(tsla, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(orchestrator.task_status(tsla), Some(TaskStatus::Completed));
    orchestrator.stop().await;

    assert_eq!(aapl.symbol, "AAPL");
    assert_eq!(tsla_result.decision, Action::Sell);
}
