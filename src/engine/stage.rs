// Stage - パイプラインの1段を担う長寿命ワーカー
// 入力（ソース列またはチャンネル）から1項目ずつ取り出し、処理して出力へ渡す

use crate::{
    channel::{BoundedChannel, ProducerGuard},
    core::{
        CancellationSignal, PipelineError, PipelineItem, PipelineResult, StageId, StageOutcome,
        StageReporter, StageWork,
    },
};
use std::sync::Arc;
use std::time::Instant;

/// ステージの入力
pub enum StageInput<T> {
    /// パイプライン先頭用の有限列
    Source(Vec<T>),
    Channel(Arc<BoundedChannel<T>>),
}

/// ステージの出力
pub enum StageOutput<T> {
    Channel(Arc<BoundedChannel<T>>),
    /// 終端ステージ。結果列に追記する
    Sink,
}

impl<T> StageOutput<T> {
    fn channel(&self) -> Option<Arc<BoundedChannel<T>>> {
        match self {
            Self::Channel(channel) => Some(Arc::clone(channel)),
            Self::Sink => None,
        }
    }
}

/// 全ユニットで共有する実行時コンテキスト
pub struct StageRuntime<R> {
    pub cancel: CancellationSignal,
    pub reporter: Arc<R>,
    pub started_at: Instant,
}

impl<R> StageRuntime<R> {
    pub fn new(cancel: CancellationSignal, reporter: Arc<R>) -> Self {
        Self {
            cancel,
            reporter,
            started_at: Instant::now(),
        }
    }
}

impl<R> Clone for StageRuntime<R> {
    fn clone(&self) -> Self {
        Self {
            cancel: self.cancel.clone(),
            reporter: Arc::clone(&self.reporter),
            started_at: self.started_at,
        }
    }
}

/// ユニットの正常な終了理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnitExit {
    Completed,
    Cancelled,
}

/// ステージを独立タスクとして起動
pub fn spawn_stage<T, R>(
    id: StageId,
    input: StageInput<T>,
    output: StageOutput<T>,
    work: Arc<dyn StageWork<T>>,
    runtime: StageRuntime<R>,
) -> tokio::task::JoinHandle<PipelineResult<StageOutcome<T>>>
where
    T: PipelineItem,
    R: StageReporter + 'static,
{
    tokio::spawn(run_stage(id, input, output, work, runtime))
}

/// ステージ本体
///
/// 終了経路（完了・キャンセル・障害）に関わらず出力チャンネルを1回だけクローズする。
pub async fn run_stage<T, R>(
    id: StageId,
    input: StageInput<T>,
    output: StageOutput<T>,
    work: Arc<dyn StageWork<T>>,
    runtime: StageRuntime<R>,
) -> PipelineResult<StageOutcome<T>>
where
    T: PipelineItem,
    R: StageReporter + 'static,
{
    let guard = ProducerGuard::new(output.channel(), runtime.cancel.clone());
    let mut outcome = StageOutcome::new(id.clone());

    let result = drive_stage(&id, input, &output, work.as_ref(), &runtime, &mut outcome).await;
    let result = settle(&id, result, &runtime).await;

    guard.release();
    runtime.reporter.report_stopped(&id).await;

    result.map(|exit| {
        outcome.cancelled = exit == UnitExit::Cancelled;
        outcome
    })
}

async fn drive_stage<T, R>(
    id: &StageId,
    input: StageInput<T>,
    output: &StageOutput<T>,
    work: &dyn StageWork<T>,
    runtime: &StageRuntime<R>,
    outcome: &mut StageOutcome<T>,
) -> PipelineResult<UnitExit>
where
    T: PipelineItem,
    R: StageReporter,
{
    match input {
        StageInput::Source(items) => {
            for item in items {
                if runtime.cancel.is_cancelled() {
                    return Ok(UnitExit::Cancelled);
                }
                forward(id, item, output, work, runtime, outcome).await?;
            }
        }
        StageInput::Channel(channel) => loop {
            if runtime.cancel.is_cancelled() {
                return Ok(UnitExit::Cancelled);
            }
            let Some(item) = channel.take().await? else {
                break;
            };
            if runtime.cancel.is_cancelled() {
                return Ok(UnitExit::Cancelled);
            }
            forward(id, item, output, work, runtime, outcome).await?;
        },
    }
    Ok(UnitExit::Completed)
}

async fn forward<T, R>(
    id: &StageId,
    item: T,
    output: &StageOutput<T>,
    work: &dyn StageWork<T>,
    runtime: &StageRuntime<R>,
    outcome: &mut StageOutcome<T>,
) -> PipelineResult<()>
where
    T: PipelineItem,
    R: StageReporter,
{
    let processed = work
        .process(item)
        .await
        .map_err(|source| classify_work_error(id, source))?;
    let key = processed.sequence_key();

    match output {
        StageOutput::Channel(channel) => channel.put(processed).await?,
        StageOutput::Sink => outcome.collected.push(processed),
    }
    outcome.processed += 1;

    runtime
        .reporter
        .report_item(id, key, runtime.started_at.elapsed())
        .await;
    Ok(())
}

/// 処理関数のエラーを分類する
///
/// `PipelineError` を包んでいればそのまま（キャンセルなら後で握りつぶされる）。
pub(crate) fn classify_work_error(id: &StageId, source: anyhow::Error) -> PipelineError {
    match source.downcast::<PipelineError>() {
        Ok(error) => error,
        Err(source) => PipelineError::stage_failure(&id.name, source),
    }
}

/// ユニットの終了結果を確定する
///
/// キャンセル起因の失敗は報告のみで握りつぶす。それ以外は全体をキャンセルしてから返す。
pub(crate) async fn settle<R>(
    id: &StageId,
    result: PipelineResult<UnitExit>,
    runtime: &StageRuntime<R>,
) -> PipelineResult<UnitExit>
where
    R: StageReporter,
{
    match result {
        Ok(UnitExit::Completed) => Ok(UnitExit::Completed),
        Ok(UnitExit::Cancelled) => {
            runtime.reporter.report_cancelled(id).await;
            Ok(UnitExit::Cancelled)
        }
        Err(error) if error.is_cancellation() => {
            runtime.cancel.cancel();
            runtime.reporter.report_cancelled(id).await;
            Ok(UnitExit::Cancelled)
        }
        Err(error) => {
            runtime.cancel.cancel();
            runtime
                .reporter
                .report_failure(id, &error.to_string())
                .await;
            Err(error)
        }
    }
}
