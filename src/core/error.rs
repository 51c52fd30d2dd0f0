use thiserror::Error;
use crate::services::generator::GeneratorError;

/// Why a generator response failed the output contract
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("response contains no JSON object")]
    NoJson,

    #[error("response does not match the match list shape: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("response contains no matches for a non-empty candidate pool")]
    EmptyMatches,

    #[error("score {score} for candidate {candidate_id} is outside [0, 100]")]
    ScoreOutOfRange { candidate_id: String, score: f64 },

    #[error("candidate {0} was not submitted")]
    UnknownCandidate(String),

    #[error("subject {0} was returned as its own match")]
    SelfMatch(String),

    #[error("candidate {0} appears more than once")]
    DuplicateCandidate(String),

    #[error("reasoning for candidate {0} is empty")]
    EmptyReasoning(String),
}

/// Errors surfaced by the matchmaking orchestrator
#[derive(Debug, Error)]
pub enum MatchmakingError {
    #[error("Pet not found: {0}")]
    NotFound(String),

    #[error("Generator response violated the match contract: {source}")]
    SchemaViolation {
        #[source]
        source: ValidationError,
        raw: String,
    },

    #[error("Matchmaking unavailable: {0}")]
    Unavailable(String),
}

impl MatchmakingError {
    /// Only transport-level failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, MatchmakingError::Unavailable(_))
    }
}

impl From<GeneratorError> for MatchmakingError {
    fn from(err: GeneratorError) -> Self {
        MatchmakingError::Unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(MatchmakingError::Unavailable("down".into()).is_retryable());
        assert!(!MatchmakingError::NotFound("p1".into()).is_retryable());
        assert!(!MatchmakingError::SchemaViolation {
            source: ValidationError::NoJson,
            raw: String::new(),
        }
        .is_retryable());
    }

    #[test]
    fn test_generator_errors_become_unavailable() {
        let err: MatchmakingError = GeneratorError::RateLimited.into();
        assert!(matches!(err, MatchmakingError::Unavailable(_)));
    }
}
