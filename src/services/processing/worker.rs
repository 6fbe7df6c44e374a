// Worker - ステージ1項目あたりの処理実装

use crate::core::{Sequenced, StageWork};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// 固定時間の待機で計算を模擬する処理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedWork {
    latency: Duration,
}

impl SimulatedWork {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> StageWork<T> for SimulatedWork {
    async fn process(&self, item: T) -> Result<T> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(item)
    }
}

/// 指定したシーケンス番号で失敗させる障害注入ラッパー
pub struct FaultInjectingWork<T> {
    inner: Arc<dyn StageWork<T>>,
    fail_on_key: u64,
}

impl<T: Send + Sync + 'static> FaultInjectingWork<T> {
    pub fn new(inner: Arc<dyn StageWork<T>>, fail_on_key: u64) -> Self {
        Self { inner, fail_on_key }
    }
}

#[async_trait]
impl<T> StageWork<T> for FaultInjectingWork<T>
where
    T: Sequenced + Send + Sync + 'static,
{
    async fn process(&self, item: T) -> Result<T> {
        if item.sequence_key() == self.fail_on_key {
            anyhow::bail!("injected fault at sequence key {}", self.fail_on_key);
        }
        self.inner.process(item).await
    }
}
