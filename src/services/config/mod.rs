// 設定管理
// デフォルト値、プリセット、JSONファイルからの読み込み

pub mod implementations;

// 公開API
pub use implementations::{ConfigPreset, DefaultPipelineConfig};
