use super::spawn_ctrl_c_handler;
use crate::cli::ConfigOverrides;
use crate::core::{CancellationSignal, PipelineConfig, Topology};
use crate::engine::PipelineEngine;
use crate::services::NoOpStageReporter;
use anyhow::Result;
use serde::Serialize;

/// トポロジー1つ分の計測結果
#[derive(Debug, Clone, Serialize)]
pub struct TopologyTiming {
    pub topology: Topology,
    pub elapsed_ms: u64,
    pub emitted: usize,
}

/// Execute compare command
///
/// 逐次・単一ブランチ・分岐版を同じ設定で順に実行し、処理時間を比べる。
pub async fn execute_compare(overrides: ConfigOverrides) -> Result<()> {
    let config = overrides.resolve()?;
    println!(
        "🔍 {}項目, 処理時間 {}ms / {}ms, チャンネル容量 {}",
        config.item_count(),
        config.short_stage_latency().as_millis(),
        config.long_stage_latency().as_millis(),
        config.channel_capacity()
    );

    let cancel = CancellationSignal::new();
    let ctrl_c = spawn_ctrl_c_handler(cancel.clone());
    let timings = measure_topologies(config, cancel.clone()).await;
    ctrl_c.abort();
    let timings = timings?;

    if cancel.is_cancelled() {
        anyhow::bail!("比較がキャンセルされました");
    }

    let baseline = timings.first().map(|timing| timing.elapsed_ms.max(1));
    println!("\n📊 比較結果:");
    for timing in &timings {
        let speedup = baseline
            .map(|base| base as f64 / timing.elapsed_ms.max(1) as f64)
            .unwrap_or(1.0);
        println!(
            "   - {:<10} {:>6}ms  (x{speedup:.2})  出力 {}件",
            timing.topology.to_string(),
            timing.elapsed_ms,
            timing.emitted
        );
    }
    Ok(())
}

/// 各トポロジーを順に計測する。先頭は逐次実行
pub async fn measure_topologies<C>(config: C, cancel: CancellationSignal) -> Result<Vec<TopologyTiming>>
where
    C: PipelineConfig + Clone,
{
    let mut timings = Vec::new();
    for topology in [Topology::Sequential, Topology::Basic, Topology::Balanced] {
        if cancel.is_cancelled() {
            break;
        }
        let engine = PipelineEngine::new(config.clone(), NoOpStageReporter::new())
            .with_cancellation(cancel.clone());
        let summary = engine.run_generated(topology).await?;
        timings.push(TopologyTiming {
            topology,
            elapsed_ms: summary.elapsed_ms,
            emitted: summary.results.len(),
        });
    }
    Ok(timings)
}
