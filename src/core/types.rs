// パイプラインに関連するデータ型定義

use super::traits::Sequenced;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ステージの識別子
///
/// `depth` はパイプライン上の位置で、コンソール出力のインデントに使う。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageId {
    pub name: String,
    pub depth: usize,
}

impl StageId {
    pub fn new(name: impl Into<String>, depth: usize) -> Self {
        Self {
            name: name.into(),
            depth,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// 任意のペイロードにシーケンス番号を付与するラッパー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Numbered<T> {
    pub seq: u64,
    pub value: T,
}

impl<T> Numbered<T> {
    pub fn new(seq: u64, value: T) -> Self {
        Self { seq, value }
    }

    /// `first` から連番を振る
    pub fn enumerate_from(first: u64, values: impl IntoIterator<Item = T>) -> Vec<Self> {
        values
            .into_iter()
            .zip(first..)
            .map(|(value, seq)| Self::new(seq, value))
            .collect()
    }
}

impl<T> Sequenced for Numbered<T> {
    fn sequence_key(&self) -> u64 {
        self.seq
    }
}

/// パイプラインのトポロジー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// 全ステージを1項目ずつ逐次実行
    Sequential,
    /// 4ステージの単一ブランチ
    Basic,
    /// Stage 2を2ワーカーに分岐し、マルチプレクサで合流
    Balanced,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sequential => "sequential",
            Self::Basic => "basic",
            Self::Balanced => "balanced",
        };
        f.write_str(name)
    }
}

/// 単一ステージの終了結果
#[derive(Debug)]
pub struct StageOutcome<T> {
    pub stage: StageId,
    pub processed: usize,
    pub cancelled: bool,
    /// 終端ステージが蓄積した結果列
    pub collected: Vec<T>,
}

impl<T> StageOutcome<T> {
    pub fn new(stage: StageId) -> Self {
        Self {
            stage,
            processed: 0,
            cancelled: false,
            collected: Vec::new(),
        }
    }

    pub fn report(&self) -> StageReport {
        StageReport {
            stage: self.stage.name.clone(),
            processed: self.processed,
            cancelled: self.cancelled,
        }
    }
}

/// マルチプレクサの容量調整用診断カウンター
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplexerStats {
    pub emitted: usize,
    pub peak_input_len: [usize; 2],
    pub peak_held_back: usize,
    /// 最終フラッシュで放出した件数
    pub flushed: usize,
}

/// マルチプレクサの終了結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplexerOutcome {
    pub cancelled: bool,
    pub stats: MultiplexerStats,
}

/// サマリー用のステージ別集計
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub processed: usize,
    pub cancelled: bool,
}

/// 実行全体のサマリー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary<T> {
    pub topology: Topology,
    pub total_items: usize,
    pub results: Vec<T>,
    pub cancelled: bool,
    pub elapsed_ms: u64,
    pub stages: Vec<StageReport>,
    pub multiplexer: Option<MultiplexerStats>,
}

impl<T> PipelineSummary<T> {
    /// 全項目が欠落なく出力されたか
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.results.len() == self.total_items
    }
}
