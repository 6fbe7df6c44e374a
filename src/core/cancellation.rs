// 協調キャンセルシグナル
// 全ステージで共有される一方向フラグ。一度立てたら戻さない

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct SignalState {
    raised: AtomicBool,
    notify: Notify,
}

/// パイプライン全体のキャンセルシグナル
///
/// クローンは同じフラグを共有する。
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    inner: Arc<SignalState>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// シグナルを立てる。この呼び出しで初めて立った場合のみtrue
    pub fn cancel(&self) -> bool {
        let first = !self.inner.raised.swap(true, Ordering::SeqCst);
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.raised.load(Ordering::SeqCst)
    }

    /// シグナルが立つまで待機
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // フラグ確認前に待機登録しておく
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
