use thiserror::Error;

/// All errors produced by voiceflow-core.
#[derive(Debug, Error)]
pub enum VoiceflowError {
    #[error("automation error: {0}")]
    Automation(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("invalid key chord: {0}")]
    InvalidChord(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("engine is already running")]
    AlreadyRunning,

    #[error("engine is not running")]
    NotRunning,

    #[error("engine task stopped unexpectedly")]
    EngineGone,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VoiceflowError>;
