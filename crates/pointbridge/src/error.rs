use crate::types::TypeKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Point map or configuration unreadable/malformed. Fatal at startup.
    #[error("Config error: {0}")]
    Config(String),
    /// Model path or store address cannot be resolved. Drops one entry.
    #[error("Resolution error: {0}")]
    Resolution(String),
    /// Value does not fit the declared type kind. Skips one point.
    #[error("Type mismatch for {kind}: {detail}")]
    TypeMismatch { kind: TypeKind, detail: String },
    /// Store or model connection failure.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl BridgeError {
    pub fn mismatch(kind: &TypeKind, detail: impl Into<String>) -> Self {
        BridgeError::TypeMismatch {
            kind: kind.clone(),
            detail: detail.into(),
        }
    }
}

impl From<redis::RedisError> for BridgeError {
    fn from(e: redis::RedisError) -> Self {
        BridgeError::Transport(e.to_string())
    }
}

impl From<r2d2::Error> for BridgeError {
    fn from(e: r2d2::Error) -> Self {
        BridgeError::Transport(format!("pool checkout failed: {}", e))
    }
}

impl From<config::ConfigError> for BridgeError {
    fn from(e: config::ConfigError) -> Self {
        BridgeError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
