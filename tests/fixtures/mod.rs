// テストユーティリティ
// 統合テストで共有する設定・ステージ処理・ヘルパー

#![allow(dead_code)]

use async_trait::async_trait;
use balanced_pipeline::{
    core::{StageWork, Topology},
    DefaultPipelineConfig, PipelineStages, SimulatedWork,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// 待機なしのステージで構成した設定
pub fn instant_config(items: usize, capacity: usize) -> DefaultPipelineConfig {
    DefaultPipelineConfig::new()
        .with_short_stage_ms(0)
        .with_long_stage_ms(0)
        .with_item_count(items)
        .with_channel_capacity(capacity)
        .with_multiplexer_idle_backoff_ms(1)
        .with_progress_reporting(false)
}

/// 全ステージが即座に通過させる処理
pub fn instant_stages() -> PipelineStages<u64> {
    PipelineStages::uniform(Arc::new(SimulatedWork::from_millis(0)))
}

/// 番号ごとに処理時間が変わる処理
///
/// 2ワーカー間の追い越しを起こすために使う。
pub struct JitteredWork {
    seed: u64,
    max_millis: u64,
}

impl JitteredWork {
    pub fn new(seed: u64, max_millis: u64) -> Self {
        Self { seed, max_millis }
    }

    fn delay_for(&self, key: u64) -> Duration {
        let mixed = key
            .wrapping_add(self.seed)
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        Duration::from_millis((mixed >> 33) % (self.max_millis + 1))
    }
}

#[async_trait]
impl StageWork<u64> for JitteredWork {
    async fn process(&self, item: u64) -> anyhow::Result<u64> {
        tokio::time::sleep(self.delay_for(item)).await;
        Ok(item)
    }
}

/// 指定した番号でパニックする処理
pub struct PanickingWork {
    pub panic_on_key: u64,
}

#[async_trait]
impl StageWork<u64> for PanickingWork {
    async fn process(&self, item: u64) -> anyhow::Result<u64> {
        if item == self.panic_on_key {
            panic!("panic at sequence key {item}");
        }
        Ok(item)
    }
}

pub const ALL_TOPOLOGIES: [Topology; 3] = [Topology::Sequential, Topology::Basic, Topology::Balanced];

/// デッドロック検出用のタイムアウト付き待機
pub async fn within<F: Future>(seconds: u64, future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(seconds), future)
        .await
        .expect("制限時間内に完了しませんでした（デッドロックの可能性）")
}
