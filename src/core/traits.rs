// パイプラインのトレイト定義
// 全ての抽象化インターフェースを定義

use super::types::StageId;
use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use std::time::Duration;

/// 全順序を持つシーケンス番号を公開する項目
///
/// 番号は開始値から1ずつ厳密に増加する前提。
pub trait Sequenced {
    fn sequence_key(&self) -> u64;
}

impl Sequenced for u64 {
    fn sequence_key(&self) -> u64 {
        *self
    }
}

impl Sequenced for u32 {
    fn sequence_key(&self) -> u64 {
        u64::from(*self)
    }
}

impl Sequenced for usize {
    fn sequence_key(&self) -> u64 {
        *self as u64
    }
}

/// パイプラインを流れる項目の境界
pub trait PipelineItem: Sequenced + Send + Sync + 'static {}

impl<T> PipelineItem for T where T: Sequenced + Send + Sync + 'static {}

/// パイプライン設定を抽象化するトレイト
#[automock]
pub trait PipelineConfig: Send + Sync {
    /// ステージ間チャンネルの容量
    fn channel_capacity(&self) -> usize;

    /// 短いステージの処理時間
    fn short_stage_latency(&self) -> Duration;

    /// 長いステージの処理時間
    fn long_stage_latency(&self) -> Duration;

    /// 入力シーケンスの長さ
    fn item_count(&self) -> usize;

    /// 入力シーケンスの開始番号
    fn first_sequence_key(&self) -> u64;

    /// マルチプレクサが両入力とも空だった時の待機上限
    fn multiplexer_idle_backoff(&self) -> Duration;

    /// 進捗報告を有効にするかどうか
    fn enable_progress_reporting(&self) -> bool;
}

// PipelineConfig for Box<dyn PipelineConfig>
impl PipelineConfig for Box<dyn PipelineConfig> {
    fn channel_capacity(&self) -> usize {
        self.as_ref().channel_capacity()
    }

    fn short_stage_latency(&self) -> Duration {
        self.as_ref().short_stage_latency()
    }

    fn long_stage_latency(&self) -> Duration {
        self.as_ref().long_stage_latency()
    }

    fn item_count(&self) -> usize {
        self.as_ref().item_count()
    }

    fn first_sequence_key(&self) -> u64 {
        self.as_ref().first_sequence_key()
    }

    fn multiplexer_idle_backoff(&self) -> Duration {
        self.as_ref().multiplexer_idle_backoff()
    }

    fn enable_progress_reporting(&self) -> bool {
        self.as_ref().enable_progress_reporting()
    }
}

/// ステージ進捗報告の抽象化トレイト
#[automock]
#[async_trait]
pub trait StageReporter: Send + Sync {
    /// 実行開始時の報告
    async fn report_started(&self, total_items: usize);

    /// 1項目処理完了の報告
    async fn report_item(&self, stage: &StageId, sequence_key: u64, elapsed: Duration);

    /// キャンセルによる停止の報告
    async fn report_cancelled(&self, stage: &StageId);

    /// 想定外の障害の報告
    async fn report_failure(&self, stage: &StageId, error: &str);

    /// ステージ終了の報告（全ての終了経路で呼ばれる）
    async fn report_stopped(&self, stage: &StageId);

    /// 実行完了時の報告
    async fn report_completed(&self, emitted: usize, elapsed: Duration);
}

// StageReporter for Box<dyn StageReporter>
#[async_trait]
impl StageReporter for Box<dyn StageReporter> {
    async fn report_started(&self, total_items: usize) {
        self.as_ref().report_started(total_items).await
    }

    async fn report_item(&self, stage: &StageId, sequence_key: u64, elapsed: Duration) {
        self.as_ref().report_item(stage, sequence_key, elapsed).await
    }

    async fn report_cancelled(&self, stage: &StageId) {
        self.as_ref().report_cancelled(stage).await
    }

    async fn report_failure(&self, stage: &StageId, error: &str) {
        self.as_ref().report_failure(stage, error).await
    }

    async fn report_stopped(&self, stage: &StageId) {
        self.as_ref().report_stopped(stage).await
    }

    async fn report_completed(&self, emitted: usize, elapsed: Duration) {
        self.as_ref().report_completed(emitted, elapsed).await
    }
}

/// ステージ1項目あたりの処理を抽象化するトレイト
#[automock]
#[async_trait]
pub trait StageWork<T: Send + Sync + 'static>: Send + Sync {
    /// 1項目を処理して次段へ渡す値を返す
    async fn process(&self, item: T) -> Result<T>;
}
