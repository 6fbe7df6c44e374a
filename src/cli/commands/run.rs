use super::spawn_ctrl_c_handler;
use crate::cli::ConfigOverrides;
use crate::core::{PipelineConfig, PipelineSummary, StageReporter, StageWork, Topology};
use crate::engine::{PipelineEngine, PipelineStages};
use crate::services::{ConsoleStageReporter, FaultInjectingWork, NoOpStageReporter};
use anyhow::Result;
use std::sync::Arc;

/// Configuration struct for run command to reduce argument count
pub struct RunOptions {
    pub topology: Topology,
    pub fail_at: Option<u64>,
    pub quiet: bool,
    pub json: bool,
    pub overrides: ConfigOverrides,
}

/// Execute run command
pub async fn execute_run(options: RunOptions) -> Result<()> {
    let config = options.overrides.resolve()?;

    let mut stages = PipelineStages::<u64>::for_topology(options.topology, &config);
    if let Some(key) = options.fail_at {
        let faulty: Arc<dyn StageWork<u64>> =
            Arc::new(FaultInjectingWork::new(stages.stage2.clone(), key));
        stages = stages.with_stage2(faulty);
    }

    // JSON出力時は標準出力をサマリー専用にする
    let reporter: Box<dyn StageReporter> = if options.quiet || options.json {
        Box::new(NoOpStageReporter::new())
    } else {
        Box::new(ConsoleStageReporter::new())
    };

    if !options.json {
        println!("⚙️  設定:");
        println!("   - トポロジー: {}", options.topology);
        println!("   - 項目数: {}", config.item_count());
        println!("   - チャンネル容量: {}", config.channel_capacity());
        println!(
            "   - ステージ処理時間: {}ms / {}ms",
            config.short_stage_latency().as_millis(),
            config.long_stage_latency().as_millis()
        );
    }

    let engine = PipelineEngine::new(config, reporter).with_stages(stages);
    let ctrl_c = spawn_ctrl_c_handler(engine.cancellation());
    let result = engine.run_generated(options.topology).await;
    ctrl_c.abort();

    let summary = result?;
    if options.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if summary.cancelled {
        anyhow::bail!(
            "実行がキャンセルされました ({}/{}項目を出力)",
            summary.results.len(),
            summary.total_items
        );
    }
    Ok(())
}

fn print_summary(summary: &PipelineSummary<u64>) {
    println!("\n📊 実行結果:");
    println!("   - トポロジー: {}", summary.topology);
    println!(
        "   - 出力数: {}/{}",
        summary.results.len(),
        summary.total_items
    );
    println!("   - 処理時間: {}ms", summary.elapsed_ms);
    println!("   - 結果: {:?}", summary.results);
    for stage in &summary.stages {
        let status = if stage.cancelled { " (キャンセル)" } else { "" };
        println!("   - {}: {}件{status}", stage.stage, stage.processed);
    }
    if let Some(stats) = &summary.multiplexer {
        println!(
            "   - マルチプレクサ: 入力バッファ最大 {:?}, 保留最大 {}, 最終フラッシュ {}",
            stats.peak_input_len, stats.peak_held_back, stats.flushed
        );
    }
}
