// パフォーマンス関連の統合テスト
#[path = "../fixtures/mod.rs"]
mod fixtures;

use balanced_pipeline::{core::Topology, engine::PipelineEngine, NoOpStageReporter};
use fixtures::{instant_config, within};
use std::time::{Duration, Instant};

/// トポロジーを1回実行して経過時間を測る
async fn measure(topology: Topology, items: usize, short_ms: u64, long_ms: u64) -> Duration {
    let config = instant_config(items, 4)
        .with_short_stage_ms(short_ms)
        .with_long_stage_ms(long_ms);
    let engine = PipelineEngine::new(config, NoOpStageReporter::new());

    let started = Instant::now();
    let summary = within(30, engine.run_generated(topology)).await.unwrap();
    assert!(summary.is_complete(), "{topology}");
    started.elapsed()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pipelining_beats_sequential() {
    let sequential = measure(Topology::Sequential, 10, 5, 20).await;
    let basic = measure(Topology::Basic, 10, 5, 20).await;

    // 逐次: 10 × (5 + 20 + 5 + 20) = 500ms 以上
    assert!(sequential >= Duration::from_millis(500));
    assert!(
        basic < sequential,
        "basic {basic:?} should be faster than sequential {sequential:?}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_second_worker_relieves_the_long_stage() {
    let basic = measure(Topology::Basic, 16, 2, 30).await;
    let balanced = measure(Topology::Balanced, 16, 2, 30).await;

    // 単一ブランチはStage 2律速で 16 × 30 = 480ms 以上、分岐版はおよそ半分
    assert!(basic >= Duration::from_millis(480));
    assert!(
        balanced < basic,
        "balanced {balanced:?} should be faster than basic {basic:?}"
    );
}

#[tokio::test]
async fn test_zero_latency_run_completes_quickly() {
    let elapsed = measure(Topology::Balanced, 2_000, 0, 0).await;
    assert!(elapsed < Duration::from_secs(10));
}
