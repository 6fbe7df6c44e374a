// エラーハンドリングとキャンセル伝播の統合テスト
#[path = "../fixtures/mod.rs"]
mod fixtures;

use balanced_pipeline::{
    core::{ErrorSeverity, StageWork, Topology},
    engine::PipelineEngine,
    services::ReportEvent,
    FaultInjectingWork, MemoryStageReporter, NoOpStageReporter, PipelineError, SimulatedWork,
};
use fixtures::{instant_config, instant_stages, within, PanickingWork, ALL_TOPOLOGIES};
use std::sync::Arc;
use std::time::Duration;

fn faulty_stage2(key: u64) -> Arc<dyn StageWork<u64>> {
    Arc::new(FaultInjectingWork::new(
        Arc::new(SimulatedWork::from_millis(0)),
        key,
    ))
}

#[tokio::test]
async fn test_stage_failure_propagates_in_every_topology() {
    for topology in ALL_TOPOLOGIES {
        let engine = PipelineEngine::new(instant_config(20, 2), MemoryStageReporter::new())
            .with_stages(instant_stages().with_stage2(faulty_stage2(5)));

        let result = within(5, engine.run_generated(topology)).await;

        let error = result.unwrap_err();
        assert!(
            matches!(error, PipelineError::StageFailure { ref stage, .. } if stage.starts_with("Stage 2")),
            "{topology}: {error}"
        );
        assert_eq!(error.severity(), ErrorSeverity::High);
        assert!(error.to_string().contains("injected fault at sequence key 5"));
        assert!(engine.cancellation().is_cancelled());
        assert!(engine
            .reporter()
            .events()
            .iter()
            .any(|event| matches!(event, ReportEvent::Failure { .. })));
    }
}

#[tokio::test]
async fn test_failure_stops_every_unit_of_balanced_pipeline() {
    let engine = PipelineEngine::new(instant_config(100, 1), MemoryStageReporter::new())
        .with_stages(instant_stages().with_stage2(faulty_stage2(10)));

    let result = within(5, engine.run_generated(Topology::Balanced)).await;
    assert!(result.is_err());

    let mut stopped = engine.reporter().stopped_stages();
    stopped.sort();
    assert_eq!(
        stopped,
        vec![
            "Multiplexer",
            "Stage 1",
            "Stage 2 (worker 1)",
            "Stage 2 (worker 2)",
            "Stage 3",
            "Stage 4",
        ]
    );
    // 障害以降の項目は終端に届いていない
    assert!(engine
        .reporter()
        .items_for("Stage 4")
        .iter()
        .all(|key| *key < 10));
}

#[tokio::test]
async fn test_external_cancellation_stops_running_pipeline() {
    let config = instant_config(1_000, 2)
        .with_short_stage_ms(2)
        .with_long_stage_ms(5);
    for topology in ALL_TOPOLOGIES {
        let engine = PipelineEngine::new(config.clone(), MemoryStageReporter::new());
        let cancel = engine.cancellation();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            cancel.cancel();
        });

        let summary = within(5, engine.run_generated(topology)).await.unwrap();
        canceller.await.unwrap();

        assert!(summary.cancelled, "{topology}");
        assert!(summary.results.len() < 1_000, "{topology}");
        // 出力済みの部分も番号順で欠落がない
        let expected: Vec<u64> = (0..summary.results.len() as u64).collect();
        assert_eq!(summary.results, expected, "{topology}");
        assert!(engine
            .reporter()
            .events()
            .iter()
            .any(|event| matches!(event, ReportEvent::Cancelled { .. })));
    }
}

#[tokio::test]
async fn test_panicking_stage_surfaces_as_task_error() {
    let panicking: Arc<dyn StageWork<u64>> = Arc::new(PanickingWork { panic_on_key: 3 });
    let engine = PipelineEngine::new(instant_config(50, 2), NoOpStageReporter::new())
        .with_stages(instant_stages().with_stage2(panicking));

    let result = within(5, engine.run_generated(Topology::Balanced)).await;

    assert!(matches!(result, Err(PipelineError::TaskError { .. })));
    assert!(engine.cancellation().is_cancelled());
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    let engine = PipelineEngine::<u64, _, _>::new(
        instant_config(5, 2).with_multiplexer_idle_backoff_ms(0),
        NoOpStageReporter::new(),
    );

    let result = engine.run_generated(Topology::Balanced).await;

    let error = result.unwrap_err();
    assert!(matches!(error, PipelineError::ConfigurationError { .. }));
    assert!(!engine.cancellation().is_cancelled());
}

#[tokio::test]
async fn test_balanced_rejects_source_with_gap() {
    let engine = PipelineEngine::new(instant_config(0, 2), NoOpStageReporter::new());

    let result = engine.run(Topology::Balanced, vec![0u64, 1, 3]).await;

    assert!(matches!(
        result,
        Err(PipelineError::SequenceViolation {
            expected: 2,
            found: 3,
            ..
        })
    ));
}
