// 有界チャンネル - ステージ間受け渡し用のモニター
// Mutexで保護したバッファと「空きあり」「項目あり」の2つの通知で構成

use crate::core::{CancellationSignal, PipelineError, PipelineResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

#[derive(Debug)]
struct ChannelState<T> {
    buffer: VecDeque<T>,
    closed: bool,
    peak_len: usize,
}

/// 固定容量のスレッドセーフFIFO
///
/// `put` は満杯の間、`take` は空かつオープンの間だけ待機する。
/// クローズ後もバッファ済みの項目は最後まで取り出せる。
#[derive(Debug)]
pub struct BoundedChannel<T> {
    name: String,
    capacity: usize,
    state: Mutex<ChannelState<T>>,
    space_available: Notify,
    item_available: Notify,
    cancel: CancellationSignal,
}

impl<T> BoundedChannel<T> {
    /// 新しいチャンネルを作成。容量0は設定エラー
    pub fn new(
        name: impl Into<String>,
        capacity: usize,
        cancel: CancellationSignal,
    ) -> PipelineResult<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(PipelineError::configuration(format!(
                "チャンネル {name} の容量は1以上である必要があります"
            )));
        }

        Ok(Self {
            name,
            capacity,
            state: Mutex::new(ChannelState {
                buffer: VecDeque::with_capacity(capacity),
                closed: false,
                peak_len: 0,
            }),
            space_available: Notify::new(),
            item_available: Notify::new(),
            cancel,
        })
    }

    /// `Arc` で包んで作成（パイプライン配線用）
    pub fn shared(
        name: impl Into<String>,
        capacity: usize,
        cancel: CancellationSignal,
    ) -> PipelineResult<Arc<Self>> {
        Self::new(name, capacity, cancel).map(Arc::new)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock_state(&self) -> MutexGuard<'_, ChannelState<T>> {
        // バッファ操作中にパニックしても状態自体は整合している
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 末尾に追加。満杯の間は待機する
    ///
    /// クローズ済みなら `ClosedChannel`、キャンセル済みなら `Cancelled` で失敗する。
    pub async fn put(&self, item: T) -> PipelineResult<()> {
        loop {
            let space = self.space_available.notified();
            tokio::pin!(space);
            space.as_mut().enable();

            {
                let mut state = self.lock_state();
                if state.closed {
                    return Err(PipelineError::closed_channel(&self.name));
                }
                if self.cancel.is_cancelled() {
                    return Err(PipelineError::cancelled(&self.name));
                }
                if state.buffer.len() < self.capacity {
                    state.buffer.push_back(item);
                    state.peak_len = state.peak_len.max(state.buffer.len());
                    drop(state);
                    self.item_available.notify_waiters();
                    return Ok(());
                }
            }

            tokio::select! {
                _ = &mut space => {}
                _ = self.cancel.cancelled() => {}
            }
        }
    }

    /// 先頭を取り出す。空かつオープンの間は待機する
    ///
    /// 空かつクローズ済みなら `Ok(None)`（ストリーム終端）。
    /// 待機が必要な状況でキャンセル済みなら `Cancelled`。
    pub async fn take(&self) -> PipelineResult<Option<T>> {
        loop {
            let arrival = self.item_available.notified();
            tokio::pin!(arrival);
            arrival.as_mut().enable();

            {
                let mut state = self.lock_state();
                let head = state.buffer.pop_front();
                if let Some(item) = head {
                    drop(state);
                    self.space_available.notify_waiters();
                    return Ok(Some(item));
                }
                if state.closed {
                    return Ok(None);
                }
            }

            if self.cancel.is_cancelled() {
                return Err(PipelineError::cancelled(&self.name));
            }

            tokio::select! {
                _ = &mut arrival => {}
                _ = self.cancel.cancelled() => {}
            }
        }
    }

    /// 待機しない取り出し。項目がなければ `None`
    pub fn try_take(&self) -> Option<T> {
        let item = self.lock_state().buffer.pop_front();
        if item.is_some() {
            self.space_available.notify_waiters();
        }
        item
    }

    /// これ以上の書き込みがないことを通知する。冪等
    ///
    /// この呼び出しでクローズした場合のみtrue。
    pub fn close(&self) -> bool {
        let newly_closed = {
            let mut state = self.lock_state();
            !std::mem::replace(&mut state.closed, true)
        };
        if newly_closed {
            self.item_available.notify_waiters();
            self.space_available.notify_waiters();
        }
        newly_closed
    }

    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    /// クローズ済みかつ空
    pub fn is_completed(&self) -> bool {
        let state = self.lock_state();
        state.closed && state.buffer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock_state().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_state().buffer.is_empty()
    }

    /// これまでの最大バッファ長
    pub fn peak_len(&self) -> usize {
        self.lock_state().peak_len
    }

    /// 項目の到着かクローズを待つ（取り出しはしない）
    pub async fn item_arrived(&self) {
        self.item_available.notified().await
    }
}

/// 生産者の出力チャンネルを全ての終了経路で1回だけクローズするガード
///
/// パニックによる巻き戻し中ならキャンセルシグナルも立てる。
#[derive(Debug)]
pub struct ProducerGuard<T> {
    channel: Option<Arc<BoundedChannel<T>>>,
    cancel: CancellationSignal,
}

impl<T> ProducerGuard<T> {
    pub fn new(channel: Option<Arc<BoundedChannel<T>>>, cancel: CancellationSignal) -> Self {
        Self { channel, cancel }
    }

    /// 出力チャンネルを今クローズする
    pub fn release(mut self) -> bool {
        self.close_channel()
    }

    fn close_channel(&mut self) -> bool {
        self.channel
            .take()
            .map(|channel| channel.close())
            .unwrap_or(false)
    }
}

impl<T> Drop for ProducerGuard<T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.cancel.cancel();
        }
        self.close_channel();
    }
}
