// コアレイヤー - 基盤となるトレイト、型、エラー定義、キャンセルシグナル
// 他のレイヤーから参照される基本的な抽象化を提供

pub mod cancellation;
pub mod error;
pub mod traits;
pub mod types;

// 公開API - 明示的にエクスポートして曖昧性を回避
pub use cancellation::CancellationSignal;
pub use error::{ErrorSeverity, PipelineError, PipelineResult};
pub use traits::{PipelineConfig, PipelineItem, Sequenced, StageReporter, StageWork};
pub use types::{
    MultiplexerOutcome, MultiplexerStats, Numbered, PipelineSummary, StageId, StageOutcome,
    StageReport, Topology,
};
