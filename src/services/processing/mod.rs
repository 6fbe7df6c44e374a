// ステージ処理機能
// 模擬レイテンシ処理と障害注入

pub mod worker;

// 公開API
pub use worker::{FaultInjectingWork, SimulatedWork};
