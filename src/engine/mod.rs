// エンジン層 - ステージ・マルチプレクサの実行とオーケストレーション
// チャンネルとサービス層を組み合わせてトポロジー別の実行を提供

pub mod api;
pub mod multiplexer;
pub mod pipeline;
pub mod pipeline_engine;
pub mod sequential;
pub mod stage;

// 公開API - 主要エンジンクラス
pub use api::{create_default_pipeline, create_quiet_pipeline, run_with_engine, sequence_source};
pub use multiplexer::{Multiplexer, ResequenceState};
pub use pipeline::{PipelineStages, StagePipeline};
pub use pipeline_engine::PipelineEngine;
pub use stage::{spawn_stage, StageInput, StageOutput, StageRuntime};
