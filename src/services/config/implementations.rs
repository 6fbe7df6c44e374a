// 設定管理の具象実装

use crate::core::{PipelineConfig, PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// デフォルト設定実装
///
/// JSONファイルから読み込む場合、省略したフィールドはデフォルト値になる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultPipelineConfig {
    channel_capacity: usize,
    short_stage_ms: u64,
    long_stage_ms: u64,
    item_count: usize,
    first_sequence_key: u64,
    multiplexer_idle_backoff_ms: u64,
    enable_progress: bool,
}

impl DefaultPipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// プリセットから作成
    pub fn from_preset(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Default => Self::default(),
            ConfigPreset::HighThroughput => Self::default()
                .with_channel_capacity(64)
                .with_short_stage_ms(0)
                .with_long_stage_ms(0)
                .with_item_count(1000)
                .with_progress_reporting(false),
            ConfigPreset::Testing => Self::default()
                .with_channel_capacity(3)
                .with_short_stage_ms(1)
                .with_long_stage_ms(2)
                .with_item_count(20)
                .with_multiplexer_idle_backoff_ms(1)
                .with_progress_reporting(false),
        }
    }

    /// JSONファイルから読み込んで検証
    pub fn from_json_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::config_file(&display, e.into()))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| PipelineError::config_file(&display, e.into()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_short_stage_ms(mut self, millis: u64) -> Self {
        self.short_stage_ms = millis;
        self
    }

    pub fn with_long_stage_ms(mut self, millis: u64) -> Self {
        self.long_stage_ms = millis;
        self
    }

    pub fn with_item_count(mut self, count: usize) -> Self {
        self.item_count = count;
        self
    }

    pub fn with_first_sequence_key(mut self, key: u64) -> Self {
        self.first_sequence_key = key;
        self
    }

    pub fn with_multiplexer_idle_backoff_ms(mut self, millis: u64) -> Self {
        self.multiplexer_idle_backoff_ms = millis;
        self
    }

    pub fn with_progress_reporting(mut self, enable: bool) -> Self {
        self.enable_progress = enable;
        self
    }

    /// 設定値の検証
    pub fn validate(&self) -> PipelineResult<()> {
        if self.channel_capacity == 0 {
            return Err(PipelineError::configuration(
                "channel_capacity は1以上である必要があります",
            ));
        }
        if self.multiplexer_idle_backoff_ms == 0 {
            return Err(PipelineError::configuration(
                "multiplexer_idle_backoff_ms は1以上である必要があります",
            ));
        }
        // 最後の番号 first_sequence_key + item_count - 1 が u64 に収まること
        let last_offset = (self.item_count as u64).saturating_sub(1);
        if self.first_sequence_key.checked_add(last_offset).is_none() {
            return Err(PipelineError::configuration(
                "最後のシーケンス番号がu64の範囲を超えています",
            ));
        }
        Ok(())
    }
}

impl Default for DefaultPipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 10,
            short_stage_ms: 100,
            long_stage_ms: 200,
            item_count: 10,
            first_sequence_key: 0,
            multiplexer_idle_backoff_ms: 5,
            enable_progress: true,
        }
    }
}

impl PipelineConfig for DefaultPipelineConfig {
    fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    fn short_stage_latency(&self) -> Duration {
        Duration::from_millis(self.short_stage_ms)
    }

    fn long_stage_latency(&self) -> Duration {
        Duration::from_millis(self.long_stage_ms)
    }

    fn item_count(&self) -> usize {
        self.item_count
    }

    fn first_sequence_key(&self) -> u64 {
        self.first_sequence_key
    }

    fn multiplexer_idle_backoff(&self) -> Duration {
        Duration::from_millis(self.multiplexer_idle_backoff_ms)
    }

    fn enable_progress_reporting(&self) -> bool {
        self.enable_progress
    }
}

/// 設定プリセット
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigPreset {
    /// 100ms/200msのステージ、10項目
    Default,
    /// 待機なし、1000項目
    HighThroughput,
    /// 1ms/2msのステージ、小さいチャンネル
    Testing,
}
