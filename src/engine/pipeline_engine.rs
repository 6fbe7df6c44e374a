// PipelineEngine - 依存性注入によるパイプライン実行エンジン
// 設定・レポーター・ステージ処理をコンストラクタで受け取り、トポロジー別に実行する

use super::{
    pipeline::{PipelineStages, StagePipeline},
    sequential::execute_sequential,
    stage::StageRuntime,
};
use crate::core::{
    CancellationSignal, PipelineConfig, PipelineError, PipelineItem, PipelineResult,
    PipelineSummary, StageReporter, Topology,
};
use std::sync::Arc;

/// パイプライン実行エンジン
///
/// 共有される依存関係は初期からArcで管理する。
/// キャンセルシグナルはエンジン単位で1つ。一度発行されると以降の実行も即座に停止するため、
/// 再実行には `with_cancellation` で新しいシグナルを渡す。
pub struct PipelineEngine<T, C, R> {
    config: Arc<C>,
    reporter: Arc<R>,
    stages: Option<PipelineStages<T>>,
    cancel: CancellationSignal,
}

impl<T, C, R> PipelineEngine<T, C, R>
where
    T: PipelineItem,
    C: PipelineConfig,
    R: StageReporter + 'static,
{
    /// 新しいエンジンを作成
    ///
    /// ステージ処理は設定の処理時間から模擬処理を組み立てる。
    pub fn new(config: C, reporter: R) -> Self {
        Self {
            config: Arc::new(config),
            reporter: Arc::new(reporter),
            stages: None,
            cancel: CancellationSignal::new(),
        }
    }

    /// 全トポロジーで使うステージ処理を差し替える
    pub fn with_stages(mut self, stages: PipelineStages<T>) -> Self {
        self.stages = Some(stages);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// 外部（Ctrl-Cなど）からキャンセルするためのシグナル
    pub fn cancellation(&self) -> CancellationSignal {
        self.cancel.clone()
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    fn stages_for(&self, topology: Topology) -> PipelineStages<T> {
        match &self.stages {
            Some(stages) => stages.clone(),
            None => PipelineStages::for_topology(topology, self.config.as_ref()),
        }
    }

    fn validate_config(&self) -> PipelineResult<()> {
        if self.config.channel_capacity() == 0 {
            return Err(PipelineError::configuration(
                "チャンネル容量は1以上である必要があります",
            ));
        }
        if self.config.multiplexer_idle_backoff().is_zero() {
            return Err(PipelineError::configuration(
                "マルチプレクサの待機上限は0より大きい必要があります",
            ));
        }
        Ok(())
    }

    /// 与えられた入力列を指定トポロジーで処理する
    ///
    /// キャンセルで停止した場合は `cancelled` 付きのサマリーを返す。
    /// 障害の場合は全ユニットの停止を待ってから最初のエラーを返す。
    pub async fn run(&self, topology: Topology, source: Vec<T>) -> PipelineResult<PipelineSummary<T>> {
        self.validate_config()?;

        let runtime = StageRuntime::new(self.cancel.clone(), Arc::clone(&self.reporter));
        let progress = self.config.enable_progress_reporting();
        if progress {
            self.reporter.report_started(source.len()).await;
        }

        let stages = self.stages_for(topology);
        let summary = match topology {
            Topology::Sequential => execute_sequential(&stages, source, &runtime).await?,
            Topology::Basic => {
                StagePipeline::from_config(stages, self.config.as_ref())
                    .execute_basic(source, &runtime)
                    .await?
            }
            Topology::Balanced => {
                StagePipeline::from_config(stages, self.config.as_ref())
                    .execute_balanced(source, &runtime)
                    .await?
            }
        };

        if progress {
            self.reporter
                .report_completed(summary.results.len(), runtime.started_at.elapsed())
                .await;
        }
        Ok(summary)
    }
}

impl<C, R> PipelineEngine<u64, C, R>
where
    C: PipelineConfig,
    R: StageReporter + 'static,
{
    /// 設定の開始番号と件数から入力列を生成して処理する
    pub async fn run_generated(&self, topology: Topology) -> PipelineResult<PipelineSummary<u64>> {
        let source = super::api::sequence_source(
            self.config.first_sequence_key(),
            self.config.item_count(),
        );
        self.run(topology, source).await
    }
}
