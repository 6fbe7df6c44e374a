pub mod compare;
pub mod run;

pub use compare::*;
pub use run::*;

use crate::core::CancellationSignal;
use tokio::task::JoinHandle;

/// Ctrl-Cでキャンセルシグナルを発行するタスクを起動
///
/// 実行完了後は戻り値を `abort()` して後始末する。
pub fn spawn_ctrl_c_handler(cancel: CancellationSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n⚠️  Ctrl-Cを受信しました。パイプラインを停止します...");
            cancel.cancel();
        }
    })
}
