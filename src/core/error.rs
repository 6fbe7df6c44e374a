// パイプライン専用のカスタムエラー型定義

use thiserror::Error;

/// パイプライン固有のエラー型
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("キャンセルされました: {context}")]
    Cancelled { context: String },

    #[error("クローズ済みチャンネルへの書き込み: {channel}")]
    ClosedChannel { channel: String },

    #[error("ステージ障害: {stage} - {source}")]
    StageFailure {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("順序違反: {stage} - 期待値 {expected}, 実際 {found}")]
    SequenceViolation {
        stage: String,
        expected: u64,
        found: u64,
    },

    #[error("設定エラー: {message}")]
    ConfigurationError { message: String },

    #[error("設定ファイルエラー: {path} - {source}")]
    ConfigFileError {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("タスクエラー: {source}")]
    TaskError {
        #[source]
        source: tokio::task::JoinError,
    },
}

impl PipelineError {
    /// キャンセルエラーの作成
    pub fn cancelled(context: impl Into<String>) -> Self {
        Self::Cancelled {
            context: context.into(),
        }
    }

    /// クローズ済みチャンネルエラーの作成
    pub fn closed_channel(channel: impl Into<String>) -> Self {
        Self::ClosedChannel {
            channel: channel.into(),
        }
    }

    /// ステージ障害の作成
    pub fn stage_failure(stage: impl Into<String>, source: anyhow::Error) -> Self {
        Self::StageFailure {
            stage: stage.into(),
            source,
        }
    }

    /// 順序違反の作成
    pub fn sequence_violation(stage: impl Into<String>, expected: u64, found: u64) -> Self {
        Self::SequenceViolation {
            stage: stage.into(),
            expected,
            found,
        }
    }

    /// 設定エラーの作成
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// 設定ファイルエラーの作成
    pub fn config_file(path: impl Into<String>, source: anyhow::Error) -> Self {
        Self::ConfigFileError {
            path: path.into(),
            source,
        }
    }

    /// タスクエラーの作成
    pub fn task(source: tokio::task::JoinError) -> Self {
        Self::TaskError { source }
    }

    /// 協調キャンセルによる想定内の終了かどうか
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// エラーの重要度を取得
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Cancelled { .. } => ErrorSeverity::Low,
            // 起動前に検出されるため停止処理は発生しない
            Self::ConfigurationError { .. } | Self::ConfigFileError { .. } => {
                ErrorSeverity::Medium
            }
            Self::StageFailure { .. } | Self::TaskError { .. } => ErrorSeverity::High,
            Self::ClosedChannel { .. } | Self::SequenceViolation { .. } => ErrorSeverity::Critical,
        }
    }
}

/// エラーの重要度レベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// 低重要度 - ログ出力程度
    Low,
    /// 中重要度 - 警告レベル
    Medium,
    /// 高重要度 - 実行失敗
    High,
    /// 致命的 - ロジック欠陥
    Critical,
}

impl ErrorSeverity {
    /// 重要度の文字列表現を取得
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

/// パイプラインの結果型
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

impl From<tokio::task::JoinError> for PipelineError {
    fn from(error: tokio::task::JoinError) -> Self {
        PipelineError::TaskError { source: error }
    }
}
