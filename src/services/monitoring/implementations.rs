// 進捗監視の具象実装

use crate::core::{StageId, StageReporter};
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// コンソール出力による進捗報告実装
///
/// ステージの深さに応じてインデントし、パイプラインの重なりを見やすくする。
#[derive(Debug, Default, Clone)]
pub struct ConsoleStageReporter {
    quiet: bool,
}

impl ConsoleStageReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quiet() -> Self {
        Self { quiet: true }
    }

    fn indent(stage: &StageId) -> String {
        " ".repeat(stage.depth * 4)
    }
}

#[async_trait]
impl StageReporter for ConsoleStageReporter {
    async fn report_started(&self, total_items: usize) {
        if !self.quiet {
            println!("🚀 Starting pipeline with {total_items} items...");
        }
    }

    async fn report_item(&self, stage: &StageId, sequence_key: u64, elapsed: Duration) {
        if !self.quiet {
            println!(
                "{}{stage} processed number {sequence_key} - Time: {}ms",
                Self::indent(stage),
                elapsed.as_millis()
            );
        }
    }

    async fn report_cancelled(&self, stage: &StageId) {
        if !self.quiet {
            println!("{}Operation cancelled in {stage}", Self::indent(stage));
        }
    }

    async fn report_failure(&self, stage: &StageId, error: &str) {
        if !self.quiet {
            eprintln!(
                "{}❌ Unexpected failure in {stage}: {error}",
                Self::indent(stage)
            );
        }
    }

    async fn report_stopped(&self, stage: &StageId) {
        if !self.quiet {
            println!("{stage} stopped");
        }
    }

    async fn report_completed(&self, emitted: usize, elapsed: Duration) {
        if !self.quiet {
            println!(
                "✅ Completed! Emitted: {emitted}, Time: {}ms",
                elapsed.as_millis()
            );
        }
    }
}

/// 何もしない進捗報告実装（テスト・ベンチマーク用）
#[derive(Debug, Default, Clone)]
pub struct NoOpStageReporter;

impl NoOpStageReporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StageReporter for NoOpStageReporter {
    async fn report_started(&self, _total_items: usize) {
        // 何もしない
    }

    async fn report_item(&self, _stage: &StageId, _sequence_key: u64, _elapsed: Duration) {
        // 何もしない
    }

    async fn report_cancelled(&self, _stage: &StageId) {
        // 何もしない
    }

    async fn report_failure(&self, _stage: &StageId, _error: &str) {
        // 何もしない
    }

    async fn report_stopped(&self, _stage: &StageId) {
        // 何もしない
    }

    async fn report_completed(&self, _emitted: usize, _elapsed: Duration) {
        // 何もしない
    }
}

/// 記録された報告イベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Started { total_items: usize },
    Item { stage: String, sequence_key: u64 },
    Cancelled { stage: String },
    Failure { stage: String, error: String },
    Stopped { stage: String },
    Completed { emitted: usize },
}

/// メモリ上にイベントを記録する進捗報告実装
#[derive(Debug, Default)]
pub struct MemoryStageReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl MemoryStageReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: ReportEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// 記録済みイベントのスナップショット
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 指定ステージが処理したシーケンス番号（処理順）
    pub fn items_for(&self, stage: &str) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::Item {
                    stage: name,
                    sequence_key,
                } if name == stage => Some(sequence_key),
                _ => None,
            })
            .collect()
    }

    /// 停止を報告したステージ名
    pub fn stopped_stages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::Stopped { stage } => Some(stage),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl StageReporter for MemoryStageReporter {
    async fn report_started(&self, total_items: usize) {
        self.record(ReportEvent::Started { total_items });
    }

    async fn report_item(&self, stage: &StageId, sequence_key: u64, _elapsed: Duration) {
        self.record(ReportEvent::Item {
            stage: stage.name.clone(),
            sequence_key,
        });
    }

    async fn report_cancelled(&self, stage: &StageId) {
        self.record(ReportEvent::Cancelled {
            stage: stage.name.clone(),
        });
    }

    async fn report_failure(&self, stage: &StageId, error: &str) {
        self.record(ReportEvent::Failure {
            stage: stage.name.clone(),
            error: error.to_string(),
        });
    }

    async fn report_stopped(&self, stage: &StageId) {
        self.record(ReportEvent::Stopped {
            stage: stage.name.clone(),
        });
    }

    async fn report_completed(&self, emitted: usize, _elapsed: Duration) {
        self.record(ReportEvent::Completed { emitted });
    }
}
