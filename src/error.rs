use std::io;
use thiserror::Error;

/// Custom error type for the hostwatch agent
#[derive(Error, Debug)]
pub enum HostwatchError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Source read failed: {0}")]
    SourceRead(String),

    #[error("Unsupported on this platform: {0}")]
    Unsupported(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Not connected to broker")]
    NotConnected,

    #[error("Publish rejected (rc={rc}): {reason}")]
    PublishRejected { rc: i32, reason: String },
}

/// Result type alias for hostwatch
pub type Result<T> = std::result::Result<T, HostwatchError>;

impl HostwatchError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        HostwatchError::Config(msg.into())
    }

    /// Create a source read error
    pub fn source_read<S: Into<String>>(msg: S) -> Self {
        HostwatchError::SourceRead(msg.into())
    }

    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        HostwatchError::Unsupported(msg.into())
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        HostwatchError::Transport(msg.into())
    }

    /// Result code a publish failure maps to, if any
    pub fn publish_rc(&self) -> Option<i32> {
        match self {
            HostwatchError::NotConnected => Some(crate::core::transport::RC_NO_CONN),
            HostwatchError::PublishRejected { rc, .. } => Some(*rc),
            _ => None,
        }
    }
}
