use crate::core::{PipelineResult, Topology};
use crate::services::{ConfigPreset, DefaultPipelineConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "balanced_pipeline")]
#[command(about = "A four-stage pipeline that balances its slow stage across two workers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline once with the chosen topology
    Run {
        /// Pipeline topology
        #[arg(short, long, value_enum, default_value_t = Topology::Balanced)]
        topology: Topology,

        /// Fail Stage 2 when it reaches this sequence key
        #[arg(long)]
        fail_at: Option<u64>,

        /// Suppress per-item progress output
        #[arg(short, long)]
        quiet: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Run sequential, basic and balanced topologies and compare their timings
    Compare {
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
}

/// Settings shared by every subcommand
///
/// Priority: explicit flag > config file > preset.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Configuration preset
    #[arg(short = 'p', long, value_enum)]
    pub preset: Option<ConfigPreset>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of items to push through the pipeline
    #[arg(short = 'n', long)]
    pub items: Option<usize>,

    /// Capacity of every inter-stage channel
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Duration of the short stages in milliseconds
    #[arg(long)]
    pub short_ms: Option<u64>,

    /// Duration of the long stage in milliseconds
    #[arg(long)]
    pub long_ms: Option<u64>,

    /// Sequence key of the first item
    #[arg(long)]
    pub first_key: Option<u64>,

    /// Upper bound of the multiplexer's idle wait in milliseconds
    #[arg(long)]
    pub idle_backoff_ms: Option<u64>,
}

impl ConfigOverrides {
    /// プリセット・設定ファイル・個別指定の順に重ねて最終設定を作る
    pub fn resolve(&self) -> PipelineResult<DefaultPipelineConfig> {
        let mut config = match &self.config {
            Some(path) => DefaultPipelineConfig::from_json_file(path)?,
            None => DefaultPipelineConfig::from_preset(self.preset.unwrap_or(ConfigPreset::Default)),
        };

        if let Some(items) = self.items {
            config = config.with_item_count(items);
        }
        if let Some(capacity) = self.capacity {
            config = config.with_channel_capacity(capacity);
        }
        if let Some(millis) = self.short_ms {
            config = config.with_short_stage_ms(millis);
        }
        if let Some(millis) = self.long_ms {
            config = config.with_long_stage_ms(millis);
        }
        if let Some(key) = self.first_key {
            config = config.with_first_sequence_key(key);
        }
        if let Some(millis) = self.idle_backoff_ms {
            config = config.with_multiplexer_idle_backoff_ms(millis);
        }

        config.validate()?;
        Ok(config)
    }
}
