// 進捗監視機能
// ステージ単位の処理報告、キャンセル・障害通知、停止通知

pub mod implementations;

// 公開API
pub use implementations::{
    ConsoleStageReporter, MemoryStageReporter, NoOpStageReporter, ReportEvent,
};
