// エンドツーエンド統合テスト
#[path = "../fixtures/mod.rs"]
mod fixtures;

use balanced_pipeline::{
    cli::{execute_run, ConfigOverrides, RunOptions},
    core::{PipelineSummary, StageWork, Topology},
    engine::PipelineEngine,
    sequence_source, MemoryStageReporter, NoOpStageReporter, PipelineConfig,
};
use fixtures::{instant_config, instant_stages, within, JitteredWork, ALL_TOPOLOGIES};
use std::sync::Arc;

#[tokio::test]
async fn test_basic_pipeline_scenario_ten_items_capacity_three() {
    let config = instant_config(10, 3).with_first_sequence_key(1);
    let engine = PipelineEngine::new(config, MemoryStageReporter::new());

    let summary = within(5, engine.run_generated(Topology::Basic))
        .await
        .unwrap();

    assert_eq!(summary.results, (1..=10).collect::<Vec<u64>>());
    assert!(summary.is_complete());

    // 各ステージが全項目を番号順に処理している
    for stage in ["Stage 1", "Stage 2", "Stage 3", "Stage 4"] {
        assert_eq!(
            engine.reporter().items_for(stage),
            (1..=10).collect::<Vec<u64>>(),
            "{stage}"
        );
    }
}

#[tokio::test]
async fn test_every_topology_preserves_order() {
    for topology in ALL_TOPOLOGIES {
        let engine = PipelineEngine::new(instant_config(25, 2), NoOpStageReporter::new());

        let summary = within(10, engine.run_generated(topology)).await.unwrap();

        assert_eq!(summary.results, sequence_source(0, 25), "{topology}");
        assert!(summary.is_complete(), "{topology}");
    }
}

#[tokio::test]
async fn test_balanced_pipeline_restores_order_under_jitter() {
    for seed in 0..4 {
        let jittered: Arc<dyn StageWork<u64>> = Arc::new(JitteredWork::new(seed, 8));
        let engine = PipelineEngine::new(instant_config(40, 2), NoOpStageReporter::new())
            .with_stages(instant_stages().with_stage2(jittered));

        let summary = within(20, engine.run_generated(Topology::Balanced))
            .await
            .unwrap();

        assert_eq!(summary.results, sequence_source(0, 40), "seed {seed}");
        let stats = summary.multiplexer.expect("分岐版は診断情報を持つ");
        assert_eq!(stats.emitted, 40);
        assert!(stats.peak_input_len.iter().all(|peak| *peak <= 2));
    }
}

#[tokio::test]
async fn test_balanced_workers_share_the_input() {
    let jittered: Arc<dyn StageWork<u64>> = Arc::new(JitteredWork::new(7, 5));
    let engine = PipelineEngine::new(instant_config(30, 4), MemoryStageReporter::new())
        .with_stages(instant_stages().with_stage2(jittered));

    within(20, engine.run_generated(Topology::Balanced))
        .await
        .unwrap();

    let mut seen = engine.reporter().items_for("Stage 2 (worker 1)");
    seen.extend(engine.reporter().items_for("Stage 2 (worker 2)"));
    seen.sort_unstable();
    // 2ワーカー合わせて全項目をちょうど1回ずつ処理している
    assert_eq!(seen, sequence_source(0, 30));
}

#[tokio::test]
async fn test_non_default_first_key() {
    let config = instant_config(6, 2).with_first_sequence_key(1_000);
    let engine = PipelineEngine::new(config, NoOpStageReporter::new());

    let summary = engine.run_generated(Topology::Balanced).await.unwrap();

    assert_eq!(summary.results, sequence_source(1_000, 6));
    assert_eq!(engine.config().first_sequence_key(), 1_000);
}

#[tokio::test]
async fn test_sequence_ending_at_max_key() {
    let config = instant_config(5, 2).with_first_sequence_key(u64::MAX - 4);
    for topology in ALL_TOPOLOGIES {
        let engine = PipelineEngine::new(config.clone(), NoOpStageReporter::new());

        let summary = within(5, engine.run_generated(topology)).await.unwrap();

        assert_eq!(summary.results, sequence_source(u64::MAX - 4, 5), "{topology}");
        assert!(summary.is_complete(), "{topology}");
    }
}

#[tokio::test]
async fn test_summary_serializes_to_json() {
    let engine = PipelineEngine::new(instant_config(4, 2), NoOpStageReporter::new());
    let summary = engine.run_generated(Topology::Balanced).await.unwrap();

    let json = serde_json::to_string(&summary).unwrap();
    let restored: PipelineSummary<u64> = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, summary);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["topology"], "balanced");
    assert_eq!(value["multiplexer"]["emitted"], 4);
}

#[tokio::test]
async fn test_cli_run_command_with_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(
        &mut file,
        br#"{"short_stage_ms": 0, "long_stage_ms": 0, "item_count": 5, "channel_capacity": 1}"#,
    )
    .unwrap();

    let options = RunOptions {
        topology: Topology::Balanced,
        fail_at: None,
        quiet: true,
        json: true,
        overrides: ConfigOverrides {
            config: Some(file.path().to_path_buf()),
            ..ConfigOverrides::default()
        },
    };

    within(5, execute_run(options)).await.unwrap();
}
