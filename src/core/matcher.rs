use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;

use crate::core::error::MatchmakingError;
use crate::core::prompt::GenerationPrompt;
use crate::core::validation::{output_schema, validate_and_rank, MAX_MATCHES};
use crate::models::{MatchRequest, MatchResult, PetProfile};
use crate::services::generator::TextGenerator;

/// Default bound on a single generator call
pub const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Ranked matches plus the size of the pool they were drawn from
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub matches: Vec<MatchResult>,
    /// Distinct candidates considered (subject and duplicate ids excluded)
    pub total_candidates: usize,
}

/// Playdate matchmaking orchestrator
///
/// # Pipeline Stages
/// 1. Partition profiles into subject and candidate pool
/// 2. Build the match request and prompt
/// 3. Call the generator under a timeout
/// 4. Validate the reply at the trust boundary
/// 5. Rank and cap
///
/// Holds no mutable state, so one instance can serve concurrent requests.
#[derive(Clone)]
pub struct Matchmaker {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
    max_results: usize,
}

impl Matchmaker {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration, max_results: usize) -> Self {
        Self {
            generator,
            timeout,
            max_results: max_results.clamp(1, MAX_MATCHES),
        }
    }

    pub fn with_defaults(generator: Arc<dyn TextGenerator>) -> Self {
        Self::new(generator, DEFAULT_GENERATOR_TIMEOUT, MAX_MATCHES)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Find the most compatible playmates for `subject_id` among `all_profiles`
    ///
    /// # Arguments
    /// * `subject_id` - Id of the pet looking for a playdate
    /// * `all_profiles` - Every known profile, in store order
    ///
    /// # Returns
    /// Up to five matches sorted by score, ties in `all_profiles` order.
    /// An empty pool yields an empty list without calling the generator.
    ///
    /// # Errors
    /// `NotFound` when no profile has `subject_id`, `SchemaViolation` when the
    /// generator reply breaks the output contract, and `Unavailable` when the
    /// generator fails or exceeds the timeout. Nothing is retried here.
    pub async fn find_compatible_matches(
        &self,
        subject_id: &str,
        all_profiles: &[PetProfile],
    ) -> Result<Vec<MatchResult>, MatchmakingError> {
        self.find_matches(subject_id, all_profiles)
            .await
            .map(|outcome| outcome.matches)
    }

    /// Same as [`Matchmaker::find_compatible_matches`], also reporting how
    /// many distinct candidates were considered
    pub async fn find_matches(
        &self,
        subject_id: &str,
        all_profiles: &[PetProfile],
    ) -> Result<MatchOutcome, MatchmakingError> {
        let span = tracing::info_span!(
            "matchmaking",
            request_id = %uuid::Uuid::new_v4(),
            subject_id = %subject_id,
        );

        self.run(subject_id, all_profiles).instrument(span).await
    }

    async fn run(
        &self,
        subject_id: &str,
        all_profiles: &[PetProfile],
    ) -> Result<MatchOutcome, MatchmakingError> {
        let request = build_request(subject_id, all_profiles)?;
        let total_candidates = request.candidates.len();

        if request.candidates.is_empty() {
            tracing::info!("No candidates besides the subject, skipping generator");
            return Ok(MatchOutcome {
                matches: Vec::new(),
                total_candidates,
            });
        }

        tracing::debug!("Requesting matches among {} candidates", request.candidates.len());

        let prompt = GenerationPrompt::for_request(&request, output_schema());
        let started = Instant::now();

        let raw = match tokio::time::timeout(self.timeout, self.generator.generate(&prompt)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::error!("Generator call failed after {:?}: {}", started.elapsed(), e);
                return Err(e.into());
            }
            Err(_) => {
                tracing::error!("Generator call timed out after {:?}", self.timeout);
                return Err(MatchmakingError::Unavailable(format!(
                    "generator timed out after {} ms",
                    self.timeout.as_millis()
                )));
            }
        };

        tracing::debug!("Generator replied in {:?}", started.elapsed());

        let matches = validate_and_rank(&raw, &request, self.max_results).map_err(|source| {
            tracing::warn!("Rejected generator reply ({}): {}", source, raw);
            MatchmakingError::SchemaViolation { source, raw }
        })?;

        tracing::info!(
            "Returning {} matches (from {} candidates)",
            matches.len(),
            total_candidates
        );

        Ok(MatchOutcome {
            matches,
            total_candidates,
        })
    }
}

/// Split profiles into the subject and everyone else
///
/// Later profiles repeating an id already seen are dropped so the request
/// stays id-unique; the first occurrence keeps its position.
pub fn build_request(
    subject_id: &str,
    all_profiles: &[PetProfile],
) -> Result<MatchRequest, MatchmakingError> {
    let subject = all_profiles
        .iter()
        .find(|p| p.id == subject_id)
        .cloned()
        .ok_or_else(|| MatchmakingError::NotFound(subject_id.to_string()))?;

    let mut seen: HashSet<&str> = HashSet::with_capacity(all_profiles.len());
    seen.insert(subject_id);

    let mut candidates = Vec::with_capacity(all_profiles.len().saturating_sub(1));
    for profile in all_profiles {
        if seen.insert(profile.id.as_str()) {
            candidates.push(profile.clone());
        } else if profile.id != subject_id {
            tracing::warn!("Dropping duplicate profile {}", profile.id);
        }
    }

    Ok(MatchRequest { subject, candidates })
}
