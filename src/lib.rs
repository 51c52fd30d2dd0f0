//! Playdate Match - compatibility matchmaking service for pet owners
//!
//! Given a pet and the other pets known to the store, asks a text generator
//! for the most compatible playmates and returns a validated, ranked
//! shortlist.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{MatchOutcome, Matchmaker, MatchmakingError};
pub use models::{FindMatchesRequest, FindMatchesResponse, MatchResult, PetProfile};
pub use services::{ProfileStore, TextGenerator};
