// 高レベル公開API
// PipelineEngineを簡単に使用できるようにするための便利な関数

use super::PipelineEngine;
use crate::{
    core::{PipelineConfig, PipelineResult, PipelineSummary, StageReporter, Topology},
    services::{ConsoleStageReporter, DefaultPipelineConfig, NoOpStageReporter},
};

/// 開始番号から連続する `len` 件の入力列を生成
///
/// 開始番号が大きく `u64` を超える部分は生成しない。
pub fn sequence_source(first: u64, len: usize) -> Vec<u64> {
    (first..=u64::MAX).take(len).collect()
}

/// 設定済みエンジンで入力列を処理（DI推奨）
pub async fn run_with_engine<C, R>(
    topology: Topology,
    source: Vec<u64>,
    engine: &PipelineEngine<u64, C, R>,
) -> PipelineResult<PipelineSummary<u64>>
where
    C: PipelineConfig,
    R: StageReporter + 'static,
{
    engine.run(topology, source).await
}

/// PipelineEngine作成のヘルパー関数
///
/// デフォルト設定とコンソール出力でのエンジン作成
pub fn create_default_pipeline() -> PipelineEngine<u64, DefaultPipelineConfig, ConsoleStageReporter> {
    PipelineEngine::new(DefaultPipelineConfig::default(), ConsoleStageReporter::new())
}

/// PipelineEngine作成のヘルパー関数（静音版）
pub fn create_quiet_pipeline(
    config: DefaultPipelineConfig,
) -> PipelineEngine<u64, DefaultPipelineConfig, NoOpStageReporter> {
    PipelineEngine::new(config, NoOpStageReporter::new())
}
