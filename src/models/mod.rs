// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Gender, MatchRequest, MatchResult, PetAge, PetProfile, PetRecord, Species};
pub use requests::FindMatchesRequest;
pub use responses::{ErrorResponse, FindMatchesResponse, HealthResponse};
