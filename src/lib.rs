// balanced_pipeline - 遅いステージを2ワーカーに分岐し、順序を復元して合流する4段パイプライン
//
// レイヤー構成:
// - core: トレイト・型・エラー・キャンセルシグナル
// - channel: 容量制限付きチャンネル
// - services: 設定・進捗報告・ステージ処理の具象実装
// - engine: ステージ・マルチプレクサ・オーケストレーション
// - cli: コマンドライン

pub mod channel;
pub mod cli;
pub mod core;
pub mod engine;
pub mod services;

// 公開API - よく使う型をクレート直下から参照できるようにする
pub use channel::{BoundedChannel, ProducerGuard};
pub use crate::core::{
    CancellationSignal, PipelineConfig, PipelineError, PipelineItem, PipelineResult,
    PipelineSummary, Sequenced, StageReporter, StageWork, Topology,
};
pub use engine::{
    create_default_pipeline, create_quiet_pipeline, sequence_source, PipelineEngine,
    PipelineStages, StagePipeline,
};
pub use services::{
    ConfigPreset, ConsoleStageReporter, DefaultPipelineConfig, FaultInjectingWork,
    MemoryStageReporter, NoOpStageReporter, SimulatedWork,
};
