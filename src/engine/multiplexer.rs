// Multiplexer - 2つのブランチ出力を元の順序に並べ直して1本に合流する
//
// 各入力はラウンドロビンで非ブロッキングにポーリングし、
// 順番より早く届いた項目はシーケンス番号をキーに保留する。

use super::stage::{settle, StageRuntime, UnitExit};
use crate::{
    channel::{BoundedChannel, ProducerGuard},
    core::{
        CancellationSignal, MultiplexerOutcome, MultiplexerStats, PipelineError, PipelineItem,
        PipelineResult, Sequenced, StageId, StageReporter,
    },
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const INPUT_COUNT: usize = 2;

/// 再順序化の状態
///
/// `next_expected` は次に放出すべき番号。`u64::MAX` を放出した後は `None`。
/// 保留集合はキー順に取り出せる。
#[derive(Debug)]
pub struct ResequenceState<T> {
    next_expected: Option<u64>,
    held_back: BTreeMap<u64, T>,
    cursor: usize,
    stats: MultiplexerStats,
}

impl<T: Sequenced> ResequenceState<T> {
    pub fn new(first_key: u64) -> Self {
        Self {
            next_expected: Some(first_key),
            held_back: BTreeMap::new(),
            cursor: 0,
            stats: MultiplexerStats::default(),
        }
    }

    pub fn next_expected(&self) -> Option<u64> {
        self.next_expected
    }

    pub fn held_back_len(&self) -> usize {
        self.held_back.len()
    }

    pub fn stats(&self) -> &MultiplexerStats {
        &self.stats
    }

    /// 次にポーリングする入力を返し、カーソルを進める
    fn advance_cursor(&mut self) -> usize {
        let current = self.cursor;
        self.cursor = (current + 1) % INPUT_COUNT;
        current
    }

    /// 1回のポーリング結果を反映し、今放出すべき項目を返す
    pub fn accept(&mut self, stage: &str, polled: Option<T>) -> PipelineResult<Option<T>> {
        match polled {
            Some(item) if Some(item.sequence_key()) == self.next_expected => {
                self.next_expected = item.sequence_key().checked_add(1);
                Ok(Some(item))
            }
            polled => {
                let ready = self
                    .next_expected
                    .and_then(|expected| self.held_back.remove(&expected));
                if let Some(item) = &ready {
                    self.next_expected = item.sequence_key().checked_add(1);
                }
                if let Some(item) = polled {
                    self.hold_back(stage, item)?;
                }
                Ok(ready)
            }
        }
    }

    fn hold_back(&mut self, stage: &str, item: T) -> PipelineResult<()> {
        let key = item.sequence_key();
        // 放出済み、または保留中の番号が再び来たら重複
        let emitted = match self.next_expected {
            Some(expected) => key < expected,
            None => true,
        };
        if emitted || self.held_back.contains_key(&key) {
            return Err(PipelineError::sequence_violation(
                stage,
                self.next_expected.unwrap_or(u64::MAX),
                key,
            ));
        }
        self.held_back.insert(key, item);
        self.stats.peak_held_back = self.stats.peak_held_back.max(self.held_back.len());
        Ok(())
    }

    /// 入力が尽きた後の最終フラッシュ。保留中の項目を番号順に全て返す
    ///
    /// 番号に欠けがあれば `SequenceViolation`。
    pub fn drain_held_back(&mut self, stage: &str) -> PipelineResult<Vec<T>> {
        let mut expected = self.next_expected;
        for &key in self.held_back.keys() {
            if Some(key) != expected {
                return Err(PipelineError::sequence_violation(
                    stage,
                    expected.unwrap_or(u64::MAX),
                    key,
                ));
            }
            expected = key.checked_add(1);
        }

        self.next_expected = expected;
        Ok(std::mem::take(&mut self.held_back).into_values().collect())
    }
}

/// 再順序化マルチプレクサ
pub struct Multiplexer<T> {
    id: StageId,
    inputs: [Arc<BoundedChannel<T>>; INPUT_COUNT],
    output: Arc<BoundedChannel<T>>,
    first_key: u64,
    idle_backoff: Duration,
}

impl<T: PipelineItem> Multiplexer<T> {
    pub fn new(
        id: StageId,
        inputs: [Arc<BoundedChannel<T>>; INPUT_COUNT],
        output: Arc<BoundedChannel<T>>,
        first_key: u64,
    ) -> Self {
        Self {
            id,
            inputs,
            output,
            first_key,
            idle_backoff: Duration::from_millis(5),
        }
    }

    pub fn with_idle_backoff(mut self, idle_backoff: Duration) -> Self {
        self.idle_backoff = idle_backoff;
        self
    }

    /// 独立タスクとして起動
    pub fn spawn<R>(
        self,
        runtime: StageRuntime<R>,
    ) -> tokio::task::JoinHandle<PipelineResult<MultiplexerOutcome>>
    where
        R: StageReporter + 'static,
    {
        tokio::spawn(self.run(runtime))
    }

    /// 出力チャンネルは全ての終了経路で1回だけクローズされる
    pub async fn run<R>(self, runtime: StageRuntime<R>) -> PipelineResult<MultiplexerOutcome>
    where
        R: StageReporter + 'static,
    {
        let guard = ProducerGuard::new(Some(Arc::clone(&self.output)), runtime.cancel.clone());
        let mut state = ResequenceState::new(self.first_key);

        let result = self.resequence(&mut state, &runtime).await;
        let result = settle(&self.id, result, &runtime).await;

        guard.release();
        runtime.reporter.report_stopped(&self.id).await;

        let mut stats = state.stats;
        stats.peak_input_len = [self.inputs[0].peak_len(), self.inputs[1].peak_len()];

        result.map(|exit| MultiplexerOutcome {
            cancelled: exit == UnitExit::Cancelled,
            stats,
        })
    }

    async fn resequence<R>(
        &self,
        state: &mut ResequenceState<T>,
        runtime: &StageRuntime<R>,
    ) -> PipelineResult<UnitExit>
    where
        R: StageReporter,
    {
        let mut idle_polls = 0;

        while !self.inputs.iter().all(|input| input.is_completed()) {
            if runtime.cancel.is_cancelled() {
                return Ok(UnitExit::Cancelled);
            }

            let input = &self.inputs[state.advance_cursor()];
            let polled = input.try_take();
            let obtained = polled.is_some();

            let ready = state.accept(&self.id.name, polled)?;
            let emitted = ready.is_some();
            if let Some(item) = ready {
                self.emit(item, state, runtime).await?;
            }

            if obtained || emitted {
                idle_polls = 0;
            } else {
                idle_polls += 1;
                // 両入力とも空だったら到着を待つ
                if idle_polls >= INPUT_COUNT {
                    self.wait_for_activity(&runtime.cancel).await;
                    idle_polls = 0;
                }
            }
        }

        // キャンセル時は保留分をフラッシュしない。出力済みの部分は番号順で欠けがない
        if runtime.cancel.is_cancelled() {
            return Ok(UnitExit::Cancelled);
        }

        let leftovers = state.drain_held_back(&self.id.name)?;
        for item in leftovers {
            self.emit(item, state, runtime).await?;
            state.stats.flushed += 1;
        }
        Ok(UnitExit::Completed)
    }

    async fn emit<R>(
        &self,
        item: T,
        state: &mut ResequenceState<T>,
        runtime: &StageRuntime<R>,
    ) -> PipelineResult<()>
    where
        R: StageReporter,
    {
        let key = item.sequence_key();
        self.output.put(item).await?;
        state.stats.emitted += 1;
        runtime
            .reporter
            .report_item(&self.id, key, runtime.started_at.elapsed())
            .await;
        Ok(())
    }

    async fn wait_for_activity(&self, cancel: &CancellationSignal) {
        tokio::select! {
            _ = self.inputs[0].item_arrived() => {}
            _ = self.inputs[1].item_arrived() => {}
            _ = cancel.cancelled() => {}
            // 通知の取りこぼしに備えた上限
            _ = tokio::time::sleep(self.idle_backoff) => {}
        }
    }
}
