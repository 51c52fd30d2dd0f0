// Core matchmaking exports
pub mod error;
pub mod matcher;
pub mod prompt;
pub mod validation;

pub use error::{MatchmakingError, ValidationError};
pub use matcher::{build_request, MatchOutcome, Matchmaker, DEFAULT_GENERATOR_TIMEOUT};
pub use prompt::GenerationPrompt;
pub use validation::{output_schema, validate_and_rank, MAX_MATCHES};
