use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::artifact::ArtifactRole;
use crate::pipeline::Stage;

/// Sub-cause of a failed call to the remote speech/language service,
/// derived from the HTTP status where there is one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCause {
    UnsupportedFormat,
    PayloadTooLarge,
    Unauthorized,
    Forbidden,
    ServerError,
    EmptyResponse,
    Other,
}

impl RemoteCause {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 415 | 422 => Self::UnsupportedFormat,
            413 => Self::PayloadTooLarge,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            500..=599 => Self::ServerError,
            _ => Self::Other,
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "audio format not supported or request malformed",
            Self::PayloadTooLarge => "payload too large",
            Self::Unauthorized => "unauthorized, check the API key",
            Self::Forbidden => "forbidden, the key lacks access to this endpoint",
            Self::ServerError => "server error, the service may be temporarily unavailable",
            Self::EmptyResponse => "service returned no usable content",
            Self::Other => "unexpected response",
        }
    }
}

#[derive(Error, Debug)]
pub enum DubError {
    #[error("missing input artifact: {role}")]
    MissingInput { role: ArtifactRole },

    #[error("remote service error (status {status:?}, {}): {body}", .cause.hint())]
    RemoteService {
        status: Option<u16>,
        cause: RemoteCause,
        body: String,
    },

    #[error("{tool} failed ({status}): {stderr}")]
    Process {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("expected artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout { operation: String, after: Duration },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DubError {
    pub fn remote(status: Option<u16>, cause: RemoteCause, body: impl Into<String>) -> Self {
        Self::RemoteService {
            status,
            cause,
            body: body.into(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteService { .. })
    }

    /// The service answered successfully but with nothing usable in it.
    pub fn is_empty_response(&self) -> bool {
        matches!(
            self,
            Self::RemoteService {
                cause: RemoteCause::EmptyResponse,
                ..
            }
        )
    }

    pub fn is_process(&self) -> bool {
        matches!(self, Self::Process { .. } | Self::ArtifactNotFound(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A failure tagged with the stage that produced it.
#[derive(Error, Debug)]
#[error("{stage}: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: DubError,
}

impl StageError {
    pub fn new(stage: Stage, source: DubError) -> Self {
        Self { stage, source }
    }
}

pub type Result<T> = std::result::Result<T, DubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_cause_from_status() {
        assert_eq!(RemoteCause::from_status(401), RemoteCause::Unauthorized);
        assert_eq!(RemoteCause::from_status(403), RemoteCause::Forbidden);
        assert_eq!(RemoteCause::from_status(413), RemoteCause::PayloadTooLarge);
        assert_eq!(RemoteCause::from_status(415), RemoteCause::UnsupportedFormat);
        assert_eq!(RemoteCause::from_status(503), RemoteCause::ServerError);
        assert_eq!(RemoteCause::from_status(418), RemoteCause::Other);
    }

    #[test]
    fn test_stage_error_display() {
        let err = StageError::new(
            Stage::Transcribe,
            DubError::remote(Some(500), RemoteCause::ServerError, "boom"),
        );
        let text = err.to_string();
        assert!(text.starts_with("transcribe: "));
        assert!(text.contains("boom"));
    }
}
