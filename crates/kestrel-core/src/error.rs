use thiserror::Error;

/// Engine-wide error.
///
/// Keep this small and stable. Subsystems define their own error types and
/// map them into `EngineError` at the boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Graceful shutdown was requested. Control signal, not a failure.
    #[error("exit requested")]
    ExitRequested,

    #[error("render backend error: {0}")]
    Render(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("config io error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl EngineError {
    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    #[inline]
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
