// Pipeline - チャンネル配線とユニットの起動・合流
// 全チャンネルを先に確保し、全ユニットを起動してから全ての終了を待つ

use super::{
    multiplexer::Multiplexer,
    stage::{spawn_stage, StageInput, StageOutput, StageRuntime},
};
use crate::{
    channel::BoundedChannel,
    core::{
        CancellationSignal, MultiplexerOutcome, PipelineConfig, PipelineError, PipelineItem,
        PipelineResult, PipelineSummary, StageId, StageOutcome, StageReporter, StageWork,
        Topology,
    },
    services::SimulatedWork,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// 4ステージ分の処理関数
pub struct PipelineStages<T> {
    pub stage1: Arc<dyn StageWork<T>>,
    pub stage2: Arc<dyn StageWork<T>>,
    pub stage3: Arc<dyn StageWork<T>>,
    pub stage4: Arc<dyn StageWork<T>>,
}

impl<T: Send + Sync + 'static> PipelineStages<T> {
    pub fn new(
        stage1: Arc<dyn StageWork<T>>,
        stage2: Arc<dyn StageWork<T>>,
        stage3: Arc<dyn StageWork<T>>,
        stage4: Arc<dyn StageWork<T>>,
    ) -> Self {
        Self {
            stage1,
            stage2,
            stage3,
            stage4,
        }
    }

    /// 全ステージで同じ処理を使う
    pub fn uniform(work: Arc<dyn StageWork<T>>) -> Self {
        Self::new(work.clone(), work.clone(), work.clone(), work)
    }

    /// パイプライン用の模擬処理。Stage 2だけが長い
    pub fn simulated<C>(config: &C) -> Self
    where
        C: PipelineConfig + ?Sized,
    {
        let short: Arc<dyn StageWork<T>> =
            Arc::new(SimulatedWork::new(config.short_stage_latency()));
        let long: Arc<dyn StageWork<T>> = Arc::new(SimulatedWork::new(config.long_stage_latency()));
        Self::new(short.clone(), long, short.clone(), short)
    }

    /// 逐次実行用の模擬処理。Stage 2とStage 4が長い
    pub fn simulated_sequential<C>(config: &C) -> Self
    where
        C: PipelineConfig + ?Sized,
    {
        let short: Arc<dyn StageWork<T>> =
            Arc::new(SimulatedWork::new(config.short_stage_latency()));
        let long: Arc<dyn StageWork<T>> = Arc::new(SimulatedWork::new(config.long_stage_latency()));
        Self::new(short.clone(), long.clone(), short, long)
    }

    /// トポロジーに応じた模擬処理
    pub fn for_topology<C>(topology: Topology, config: &C) -> Self
    where
        C: PipelineConfig + ?Sized,
    {
        match topology {
            Topology::Sequential => Self::simulated_sequential(config),
            Topology::Basic | Topology::Balanced => Self::simulated(config),
        }
    }

    pub fn with_stage2(mut self, work: Arc<dyn StageWork<T>>) -> Self {
        self.stage2 = work;
        self
    }

    pub fn with_stage3(mut self, work: Arc<dyn StageWork<T>>) -> Self {
        self.stage3 = work;
        self
    }

    pub(crate) fn in_order(&self) -> [&Arc<dyn StageWork<T>>; 4] {
        [&self.stage1, &self.stage2, &self.stage3, &self.stage4]
    }
}

impl<T> Clone for PipelineStages<T> {
    fn clone(&self) -> Self {
        Self {
            stage1: Arc::clone(&self.stage1),
            stage2: Arc::clone(&self.stage2),
            stage3: Arc::clone(&self.stage3),
            stage4: Arc::clone(&self.stage4),
        }
    }
}

/// 配線済みパイプライン
pub struct StagePipeline<T> {
    stages: PipelineStages<T>,
    capacity: usize,
    first_key: u64,
    idle_backoff: Duration,
}

impl<T: PipelineItem> StagePipeline<T> {
    pub fn new(stages: PipelineStages<T>, capacity: usize) -> Self {
        Self {
            stages,
            capacity,
            first_key: 0,
            idle_backoff: Duration::from_millis(5),
        }
    }

    /// 設定値から作成
    pub fn from_config<C>(stages: PipelineStages<T>, config: &C) -> Self
    where
        C: PipelineConfig + ?Sized,
    {
        Self::new(stages, config.channel_capacity())
            .with_first_key(config.first_sequence_key())
            .with_idle_backoff(config.multiplexer_idle_backoff())
    }

    pub fn with_first_key(mut self, first_key: u64) -> Self {
        self.first_key = first_key;
        self
    }

    pub fn with_idle_backoff(mut self, idle_backoff: Duration) -> Self {
        self.idle_backoff = idle_backoff;
        self
    }

    pub fn stages(&self) -> &PipelineStages<T> {
        &self.stages
    }

    fn channel(&self, name: &str, cancel: &CancellationSignal) -> PipelineResult<Arc<BoundedChannel<T>>> {
        BoundedChannel::shared(name, self.capacity, cancel.clone())
    }

    /// 単一ブランチ: Stage 1 → 2 → 3 → 4
    pub async fn execute_basic<R>(
        &self,
        source: Vec<T>,
        runtime: &StageRuntime<R>,
    ) -> PipelineResult<PipelineSummary<T>>
    where
        R: StageReporter + 'static,
    {
        let cancel = &runtime.cancel;
        let stage1_to_2 = self.channel("stage1->stage2", cancel)?;
        let stage2_to_3 = self.channel("stage2->stage3", cancel)?;
        let stage3_to_4 = self.channel("stage3->stage4", cancel)?;

        let total_items = source.len();
        let handles = vec![
            spawn_stage(
                StageId::new("Stage 1", 0),
                StageInput::Source(source),
                StageOutput::Channel(stage1_to_2.clone()),
                self.stages.stage1.clone(),
                runtime.clone(),
            ),
            spawn_stage(
                StageId::new("Stage 2", 1),
                StageInput::Channel(stage1_to_2),
                StageOutput::Channel(stage2_to_3.clone()),
                self.stages.stage2.clone(),
                runtime.clone(),
            ),
            spawn_stage(
                StageId::new("Stage 3", 2),
                StageInput::Channel(stage2_to_3),
                StageOutput::Channel(stage3_to_4.clone()),
                self.stages.stage3.clone(),
                runtime.clone(),
            ),
            spawn_stage(
                StageId::new("Stage 4", 3),
                StageInput::Channel(stage3_to_4),
                StageOutput::Sink,
                self.stages.stage4.clone(),
                runtime.clone(),
            ),
        ];

        let mut failure = None;
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Some(outcome) = join_unit(handle, cancel, &mut failure).await {
                outcomes.push(outcome);
            }
        }

        if let Some(error) = failure {
            return Err(error);
        }
        Ok(summarize(Topology::Basic, total_items, outcomes, None, runtime))
    }

    /// 分岐版: Stage 1 → Stage 2 ×2 → Multiplexer → Stage 3 → Stage 4
    ///
    /// 2つのStage 2ワーカーは同じ入力チャンネルを取り合い、それぞれ専用の出力に書く。
    pub async fn execute_balanced<R>(
        &self,
        source: Vec<T>,
        runtime: &StageRuntime<R>,
    ) -> PipelineResult<PipelineSummary<T>>
    where
        R: StageReporter + 'static,
    {
        validate_source(&source, self.first_key)?;

        let cancel = &runtime.cancel;
        let stage1_to_2 = self.channel("stage1->stage2", cancel)?;
        let worker1_to_mux = self.channel("stage2[1]->multiplexer", cancel)?;
        let worker2_to_mux = self.channel("stage2[2]->multiplexer", cancel)?;
        let mux_to_stage3 = self.channel("multiplexer->stage3", cancel)?;
        let stage3_to_4 = self.channel("stage3->stage4", cancel)?;

        let total_items = source.len();
        let head = vec![
            spawn_stage(
                StageId::new("Stage 1", 0),
                StageInput::Source(source),
                StageOutput::Channel(stage1_to_2.clone()),
                self.stages.stage1.clone(),
                runtime.clone(),
            ),
            spawn_stage(
                StageId::new("Stage 2 (worker 1)", 1),
                StageInput::Channel(stage1_to_2.clone()),
                StageOutput::Channel(worker1_to_mux.clone()),
                self.stages.stage2.clone(),
                runtime.clone(),
            ),
            spawn_stage(
                StageId::new("Stage 2 (worker 2)", 1),
                StageInput::Channel(stage1_to_2),
                StageOutput::Channel(worker2_to_mux.clone()),
                self.stages.stage2.clone(),
                runtime.clone(),
            ),
        ];

        let multiplexer = Multiplexer::new(
            StageId::new("Multiplexer", 2),
            [worker1_to_mux, worker2_to_mux],
            mux_to_stage3.clone(),
            self.first_key,
        )
        .with_idle_backoff(self.idle_backoff)
        .spawn(runtime.clone());

        let tail = vec![
            spawn_stage(
                StageId::new("Stage 3", 3),
                StageInput::Channel(mux_to_stage3),
                StageOutput::Channel(stage3_to_4.clone()),
                self.stages.stage3.clone(),
                runtime.clone(),
            ),
            spawn_stage(
                StageId::new("Stage 4", 4),
                StageInput::Channel(stage3_to_4),
                StageOutput::Sink,
                self.stages.stage4.clone(),
                runtime.clone(),
            ),
        ];

        // 失敗があっても全ユニットの終了を待ってから報告する
        let mut failure = None;
        let mut outcomes = Vec::with_capacity(head.len() + tail.len());
        for handle in head {
            if let Some(outcome) = join_unit(handle, cancel, &mut failure).await {
                outcomes.push(outcome);
            }
        }
        let multiplexer = join_unit(multiplexer, cancel, &mut failure).await;
        for handle in tail {
            if let Some(outcome) = join_unit(handle, cancel, &mut failure).await {
                outcomes.push(outcome);
            }
        }

        if let Some(error) = failure {
            return Err(error);
        }
        Ok(summarize(
            Topology::Balanced,
            total_items,
            outcomes,
            multiplexer,
            runtime,
        ))
    }
}

/// ユニットの終了を待ち、最初の失敗だけを記録する
async fn join_unit<U>(
    handle: JoinHandle<PipelineResult<U>>,
    cancel: &CancellationSignal,
    failure: &mut Option<PipelineError>,
) -> Option<U> {
    match handle.await {
        Ok(Ok(outcome)) => Some(outcome),
        Ok(Err(error)) => {
            failure.get_or_insert(error);
            None
        }
        Err(join_error) => {
            cancel.cancel();
            failure.get_or_insert(PipelineError::task(join_error));
            None
        }
    }
}

/// 分岐版の入力は開始番号から1ずつ増加している必要がある
fn validate_source<T: PipelineItem>(source: &[T], first_key: u64) -> PipelineResult<()> {
    let mut expected = Some(first_key);
    for item in source {
        let found = item.sequence_key();
        if Some(found) != expected {
            return Err(PipelineError::sequence_violation(
                "source",
                expected.unwrap_or(u64::MAX),
                found,
            ));
        }
        expected = found.checked_add(1);
    }
    Ok(())
}

/// 終端ステージの結果列とステージ別集計からサマリーを作る
///
/// `outcomes` の最後が終端ステージであること。
pub(crate) fn summarize<T, R>(
    topology: Topology,
    total_items: usize,
    mut outcomes: Vec<StageOutcome<T>>,
    multiplexer: Option<MultiplexerOutcome>,
    runtime: &StageRuntime<R>,
) -> PipelineSummary<T> {
    let results = outcomes
        .last_mut()
        .map(|sink| std::mem::take(&mut sink.collected))
        .unwrap_or_default();
    let cancelled = runtime.cancel.is_cancelled()
        || outcomes.iter().any(|outcome| outcome.cancelled)
        || multiplexer.as_ref().is_some_and(|outcome| outcome.cancelled);

    PipelineSummary {
        topology,
        total_items,
        results,
        cancelled,
        elapsed_ms: runtime.started_at.elapsed().as_millis() as u64,
        stages: outcomes.iter().map(StageOutcome::report).collect(),
        multiplexer: multiplexer.map(|outcome| outcome.stats),
    }
}
