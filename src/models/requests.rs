use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to find playdate matches for one pet
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindMatchesRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "pet_id", rename = "petId")]
    pub pet_id: String,
}
