use std::time::Duration;

use thiserror::Error;

/// Malformed-input failures raised before any remote tier is attempted.
///
/// These are the only errors that cross the external boundary as errors;
/// every other failure in the cascade is absorbed and converted into a
/// degraded-but-successful response.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("unknown capability `{0}` (expected backlog|meeting|metrics|wellness|coaching)")]
    UnknownCapability(String),
    #[error("session id `{0}` is malformed (expected 1-128 chars of [A-Za-z0-9._-])")]
    MalformedSessionId(String),
    #[error("artifact name must not be empty")]
    EmptyArtifactName,
    #[error("artifact `{name}` is {size} bytes, exceeding the {limit}-byte limit")]
    ArtifactTooLarge { name: String, size: usize, limit: usize },
}

/// Failure of a single remote tier attempt. Never surfaced to the caller;
/// recorded against the attempt and the cascade moves on.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TierError {
    #[error("tier configuration missing: {0}")]
    ConfigurationMissing(String),
    #[error("tier attempt timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote call failed: {0}")]
    Remote(String),
    #[error("malformed remote response: {0}")]
    Protocol(String),
    #[error("remote run ended in terminal state `{0}`")]
    RunFailed(String),
}

const MAX_SESSION_ID_LEN: usize = 128;

pub fn validate_session_id(candidate: &str) -> Result<(), ValidationError> {
    let well_formed = !candidate.is_empty()
        && candidate.len() <= MAX_SESSION_ID_LEN
        && candidate.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));

    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::MalformedSessionId(candidate.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_session_id, ValidationError};

    #[test]
    fn accepts_uuid_style_and_plain_session_ids() {
        assert!(validate_session_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_session_id("s1").is_ok());
        assert!(validate_session_id("team_alpha.retro-2026").is_ok());
    }

    #[test]
    fn rejects_empty_whitespace_and_oversized_session_ids() {
        assert!(matches!(
            validate_session_id(""),
            Err(ValidationError::MalformedSessionId(_))
        ));
        assert!(matches!(
            validate_session_id("has spaces"),
            Err(ValidationError::MalformedSessionId(_))
        ));
        let oversized = "x".repeat(129);
        assert!(validate_session_id(&oversized).is_err());
    }
}
