use std::collections::{HashMap, HashSet};

use schemars::JsonSchema;
use serde::Deserialize;

use crate::core::error::ValidationError;
use crate::models::{MatchRequest, MatchResult};

/// Upper bound on returned matches, whatever the configuration says
pub const MAX_MATCHES: usize = 5;

/// Reply shape the generator is constrained to
///
/// The schema is strict (every field required, no extra properties) while
/// parsing tolerates extra fields.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct GeneratedMatches {
    /// The top 3 to 5 recommended playmates.
    pub matches: Vec<GeneratedMatch>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct GeneratedMatch {
    /// Pet ID of the recommended playmate, copied from the candidate list.
    #[serde(rename = "candidateId")]
    pub candidate_id: String,
    #[serde(rename = "candidateName")]
    pub candidate_name: String,
    /// A score from 0-100 indicating compatibility.
    #[serde(rename = "compatibilityScore")]
    #[schemars(range(min = 0, max = 100))]
    pub compatibility_score: f64,
    /// A brief, one-sentence explanation of why these pets are a good match.
    pub reasoning: String,
}

/// JSON schema handed to the generator as its output constraint
pub fn output_schema() -> serde_json::Value {
    schemars::schema_for!(GeneratedMatches).to_value()
}

/// Extract the first complete JSON object from raw generator output.
///
/// Models sometimes wrap the object in prose or a code fence; braces in that
/// prose are skipped until one opens a well-formed value.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    raw.match_indices('{').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&raw[start..])
            .into_iter::<serde::de::IgnoredAny>();
        match stream.next() {
            Some(Ok(_)) => Some(&raw[start..start + stream.byte_offset()]),
            _ => None,
        }
    })
}

/// Validate raw generator output against the request and rank it.
///
/// The generator is trusted for its scores and reasoning only: ids must come
/// from the submitted pool, each at most once, and names are taken from the
/// pool rather than the reply. Results are sorted by score descending with
/// ties kept in candidate submission order, then capped at `max_results`.
pub fn validate_and_rank(
    raw: &str,
    request: &MatchRequest,
    max_results: usize,
) -> Result<Vec<MatchResult>, ValidationError> {
    let json = extract_json_object(raw).ok_or(ValidationError::NoJson)?;
    let generated: GeneratedMatches = serde_json::from_str(json)?;

    if generated.matches.is_empty() && !request.candidates.is_empty() {
        return Err(ValidationError::EmptyMatches);
    }

    let positions: HashMap<&str, usize> = request
        .candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();

    let mut seen = HashSet::with_capacity(generated.matches.len());
    let mut ranked: Vec<(usize, MatchResult)> = Vec::with_capacity(generated.matches.len());

    for entry in generated.matches {
        if entry.candidate_id == request.subject.id {
            return Err(ValidationError::SelfMatch(entry.candidate_id));
        }

        let position = *positions
            .get(entry.candidate_id.as_str())
            .ok_or_else(|| ValidationError::UnknownCandidate(entry.candidate_id.clone()))?;

        if !seen.insert(position) {
            return Err(ValidationError::DuplicateCandidate(entry.candidate_id));
        }

        let score = entry.compatibility_score;
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(ValidationError::ScoreOutOfRange {
                candidate_id: entry.candidate_id,
                score,
            });
        }

        let reasoning = entry.reasoning.trim();
        if reasoning.is_empty() {
            return Err(ValidationError::EmptyReasoning(entry.candidate_id));
        }

        let candidate = &request.candidates[position];
        if !entry.candidate_name.is_empty() && entry.candidate_name != candidate.name {
            tracing::debug!(
                "Generator named candidate {} as {:?}, using stored name {:?}",
                candidate.id,
                entry.candidate_name,
                candidate.name
            );
        }

        ranked.push((
            position,
            MatchResult {
                candidate_id: candidate.id.clone(),
                candidate_name: candidate.name.clone(),
                compatibility_score: score,
                reasoning: reasoning.to_string(),
            },
        ));
    }

    ranked.sort_by(|(pos_a, a), (pos_b, b)| {
        b.compatibility_score
            .total_cmp(&a.compatibility_score)
            .then_with(|| pos_a.cmp(pos_b))
    });

    ranked.truncate(max_results.min(MAX_MATCHES));

    Ok(ranked.into_iter().map(|(_, m)| m).collect())
}
