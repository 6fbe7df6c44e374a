// サービス層 - 機能別の具象実装
// 各サービスは特定の責任を持ち、コアのトレイトを通じて疎結合に使われる

pub mod config;
pub mod monitoring;
pub mod processing;

// 公開API - 各サービスの主要機能を明示的にエクスポート
pub use config::{ConfigPreset, DefaultPipelineConfig};
pub use monitoring::{ConsoleStageReporter, MemoryStageReporter, NoOpStageReporter, ReportEvent};
pub use processing::{FaultInjectingWork, SimulatedWork};
