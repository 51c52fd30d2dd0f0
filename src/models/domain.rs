use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Pet species
///
/// Unknown species are kept verbatim so new kinds of pets can be stored
/// before the enum learns about them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Species {
    Dog,
    Cat,
    Rabbit,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::Dog => f.write_str("Dog"),
            Species::Cat => f.write_str("Cat"),
            Species::Rabbit => f.write_str("Rabbit"),
            Species::Other(name) => f.write_str(name),
        }
    }
}

impl From<&str> for Species {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "dog" => Species::Dog,
            "cat" => Species::Cat,
            "rabbit" => Species::Rabbit,
            _ => Species::Other(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("Male"),
            Gender::Female => f.write_str("Female"),
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(format!("unknown gender: {other}")),
        }
    }
}

/// Age split into whole years and remaining months
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PetAge {
    pub years: u8,
    #[validate(range(max = 11))]
    pub months: u8,
}

/// Pet profile as seen by the matchmaker
///
/// Only the fields the compatibility judgment needs. Store records carry more
/// (owner, photo, microchip) and are projected into this shape before any
/// matching happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PetProfile {
    #[validate(length(min = 1))]
    #[serde(rename = "petId", alias = "id")]
    pub id: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(alias = "type")]
    pub species: Species,
    pub breed: String,
    #[validate(nested)]
    pub age: PetAge,
    pub gender: Gender,
    #[validate(range(min = 1, max = 10))]
    #[serde(rename = "activityLevel")]
    pub activity_level: u8,
    #[serde(rename = "specialNeeds", default, skip_serializing_if = "Option::is_none")]
    pub special_needs: Option<String>,
}

/// Pet record as persisted by the entity store
///
/// Mirrors the document shape used by the social app; everything beyond the
/// profile fields is optional so partially filled documents still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetRecord {
    #[serde(rename = "petId")]
    pub pet_id: String,
    #[serde(rename = "ownerId", default)]
    pub owner_id: Option<String>,
    #[serde(rename = "ownerName", default)]
    pub owner_name: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub species: String,
    pub breed: String,
    pub gender: String,
    pub age: PetAge,
    #[serde(rename = "activityLevel")]
    pub activity_level: u8,
    #[serde(rename = "specialNeeds", default)]
    pub special_needs: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl PetRecord {
    /// Project a stored record into a validated profile
    ///
    /// Blank special needs are treated as absent; the social app stores an
    /// empty string for "none".
    pub fn into_profile(self) -> Result<PetProfile, String> {
        let gender = self.gender.parse::<Gender>()?;
        let special_needs = self
            .special_needs
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let profile = PetProfile {
            id: self.pet_id,
            name: self.name,
            species: Species::from(self.species.as_str()),
            breed: self.breed,
            age: self.age,
            gender,
            activity_level: self.activity_level,
            special_needs,
        };

        profile
            .validate()
            .map_err(|e| format!("invalid pet {}: {}", profile.id, e))?;

        Ok(profile)
    }
}

/// Transient input to the generator, built once per invocation
#[derive(Debug, Clone, Serialize)]
pub struct MatchRequest {
    pub subject: PetProfile,
    pub candidates: Vec<PetProfile>,
}

/// Validated, ranked compatibility match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "candidateId")]
    pub candidate_id: String,
    #[serde(rename = "candidateName")]
    pub candidate_name: String,
    #[serde(rename = "compatibilityScore")]
    pub compatibility_score: f64,
    pub reasoning: String,
}
