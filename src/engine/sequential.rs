// Sequential - 比較用の逐次実行
// 1つのループで各項目を4ステージ全てに通す。項目間でキャンセルを確認する

use super::{
    pipeline::{summarize, PipelineStages},
    stage::{classify_work_error, settle, StageRuntime, UnitExit},
};
use crate::core::{
    PipelineItem, PipelineResult, PipelineSummary, StageId, StageOutcome, StageReporter, Topology,
};

const STAGE_NAMES: [&str; 4] = ["Stage 1", "Stage 2", "Stage 3", "Stage 4"];

/// 全項目を逐次処理する
pub async fn execute_sequential<T, R>(
    stages: &PipelineStages<T>,
    source: Vec<T>,
    runtime: &StageRuntime<R>,
) -> PipelineResult<PipelineSummary<T>>
where
    T: PipelineItem,
    R: StageReporter + 'static,
{
    let id = StageId::new("Sequential", 0);
    let total_items = source.len();
    let mut outcome = StageOutcome::new(id.clone());

    let result = drive_sequential(stages, source, runtime, &mut outcome).await;
    let exit = settle(&id, result, runtime).await;
    runtime.reporter.report_stopped(&id).await;

    outcome.cancelled = exit? == UnitExit::Cancelled;
    Ok(summarize(
        Topology::Sequential,
        total_items,
        vec![outcome],
        None,
        runtime,
    ))
}

async fn drive_sequential<T, R>(
    stages: &PipelineStages<T>,
    source: Vec<T>,
    runtime: &StageRuntime<R>,
    outcome: &mut StageOutcome<T>,
) -> PipelineResult<UnitExit>
where
    T: PipelineItem,
    R: StageReporter,
{
    let stage_ids: Vec<StageId> = STAGE_NAMES
        .iter()
        .enumerate()
        .map(|(depth, name)| StageId::new(*name, depth))
        .collect();

    for item in source {
        if runtime.cancel.is_cancelled() {
            return Ok(UnitExit::Cancelled);
        }

        let mut current = item;
        for (work, id) in stages.in_order().into_iter().zip(&stage_ids) {
            current = work
                .process(current)
                .await
                .map_err(|source| classify_work_error(id, source))?;
            runtime
                .reporter
                .report_item(id, current.sequence_key(), runtime.started_at.elapsed())
                .await;
        }

        outcome.collected.push(current);
        outcome.processed += 1;
    }
    Ok(UnitExit::Completed)
}
