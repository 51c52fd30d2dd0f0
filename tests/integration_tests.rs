// Integration tests for Playdate Match

use async_trait::async_trait;
use playdate_match::core::{GenerationPrompt, Matchmaker, MatchmakingError, ValidationError};
use playdate_match::models::{Gender, MatchResult, PetAge, PetProfile, Species};
use playdate_match::services::{GeneratorError, InMemoryProfileStore, ProfileStore, TextGenerator};
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Generator stub that replays a canned reply and records what it was asked
struct StubGenerator {
    reply: Result<String, fn() -> GeneratorError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<GenerationPrompt>>,
}

impl StubGenerator {
    fn replying(reply: String) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply),
            delay: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    fn failing(err: fn() -> GeneratorError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(err),
            delay: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    fn stalling(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(json!({ "matches": [] }).to_string()),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(make) => Err(make()),
        }
    }
}

fn create_pet(id: &str, species: Species, activity_level: u8) -> PetProfile {
    PetProfile {
        id: id.to_string(),
        name: format!("Pet {}", id),
        species,
        breed: "Mixed".to_string(),
        age: PetAge { years: 3, months: 4 },
        gender: Gender::Male,
        activity_level,
        special_needs: None,
    }
}

/// Subject p1 plus five dogs and two cats, in submission order
fn scenario_a_profiles() -> Vec<PetProfile> {
    vec![
        create_pet("p1", Species::Dog, 8),
        create_pet("d1", Species::Dog, 7),
        create_pet("d2", Species::Dog, 9),
        create_pet("c1", Species::Cat, 3),
        create_pet("d3", Species::Dog, 8),
        create_pet("d4", Species::Dog, 6),
        create_pet("c2", Species::Cat, 2),
        create_pet("d5", Species::Dog, 10),
    ]
}

fn reply(entries: &[(&str, f64)]) -> String {
    let matches: Vec<_> = entries
        .iter()
        .map(|(id, score)| {
            json!({
                "candidateId": id,
                "candidateName": format!("Pet {}", id),
                "compatibilityScore": score,
                "reasoning": "They share a love of fetch."
            })
        })
        .collect();
    json!({ "matches": matches }).to_string()
}

fn assert_structural_properties(subject_id: &str, pool: &[PetProfile], result: &[MatchResult]) {
    let pool_ids: HashSet<&str> = pool
        .iter()
        .map(|p| p.id.as_str())
        .filter(|id| *id != subject_id)
        .collect();

    let mut seen = HashSet::new();
    for m in result {
        // Subset of the submitted pool, never the subject
        assert!(pool_ids.contains(m.candidate_id.as_str()), "unknown id {}", m.candidate_id);
        assert_ne!(m.candidate_id, subject_id);
        assert!(seen.insert(m.candidate_id.as_str()), "duplicate id {}", m.candidate_id);
        assert!((0.0..=100.0).contains(&m.compatibility_score));
        assert!(!m.reasoning.trim().is_empty());
    }

    assert!(result.len() <= 5);

    for pair in result.windows(2) {
        assert!(pair[0].compatibility_score >= pair[1].compatibility_score);
    }
}

#[tokio::test]
async fn test_scenario_a_stable_tie_break() {
    let profiles = scenario_a_profiles();
    // d4 is listed before d2 in the reply, but d2 was submitted first
    let generator = StubGenerator::replying(reply(&[("d4", 77.0), ("d1", 92.0), ("d2", 77.0)]));
    let matchmaker = Matchmaker::with_defaults(generator.clone());

    let result = matchmaker.find_compatible_matches("p1", &profiles).await.unwrap();

    assert_structural_properties("p1", &profiles, &result);
    let ids: Vec<&str> = result.iter().map(|m| m.candidate_id.as_str()).collect();
    assert_eq!(ids, vec!["d1", "d2", "d4"]);
    let scores: Vec<f64> = result.iter().map(|m| m.compatibility_score).collect();
    assert_eq!(scores, vec![92.0, 77.0, 77.0]);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_request_forwards_only_profile_fields() {
    let profiles = scenario_a_profiles();
    let generator = StubGenerator::replying(reply(&[("d1", 60.0)]));
    let matchmaker = Matchmaker::with_defaults(generator.clone());

    matchmaker.find_compatible_matches("p1", &profiles).await.unwrap();

    let prompt = generator.last_prompt.lock().unwrap().clone().unwrap();
    for candidate in &profiles[1..] {
        assert!(prompt.user.contains(&format!("- Pet ID: {}", candidate.id)));
    }
    assert!(!prompt.user.contains("- Pet ID: p1"));
    assert!(prompt.output_schema.to_string().contains("compatibilityScore"));
}

#[tokio::test]
async fn test_results_capped_at_five() {
    let profiles = scenario_a_profiles();
    let all: Vec<(&str, f64)> = profiles[1..]
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), 50.0 + i as f64))
        .collect();
    let generator = StubGenerator::replying(reply(&all));
    let matchmaker = Matchmaker::with_defaults(generator);

    let result = matchmaker.find_compatible_matches("p1", &profiles).await.unwrap();

    assert_eq!(result.len(), 5);
    assert_structural_properties("p1", &profiles, &result);
    assert_eq!(result[0].candidate_id, "d5");
}

#[tokio::test]
async fn test_fewer_candidates_than_cap_not_padded() {
    let profiles = vec![create_pet("p1", Species::Dog, 5), create_pet("p2", Species::Dog, 5)];
    let generator = StubGenerator::replying(reply(&[("p2", 71.5)]));
    let matchmaker = Matchmaker::with_defaults(generator);

    let result = matchmaker.find_compatible_matches("p1", &profiles).await.unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].candidate_name, "Pet p2");
}

#[tokio::test]
async fn test_scenario_b_unknown_candidate() {
    let profiles = scenario_a_profiles();
    let generator = StubGenerator::replying(reply(&[("d1", 90.0), ("ghost", 80.0)]));
    let matchmaker = Matchmaker::with_defaults(generator);

    let err = matchmaker.find_compatible_matches("p1", &profiles).await.unwrap_err();

    assert!(matches!(
        err,
        MatchmakingError::SchemaViolation { source: ValidationError::UnknownCandidate(ref id), .. } if id == "ghost"
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_scenario_c_score_out_of_range() {
    let profiles = scenario_a_profiles();
    let generator = StubGenerator::replying(reply(&[("d1", 150.0)]));
    let matchmaker = Matchmaker::with_defaults(generator);

    let err = matchmaker.find_compatible_matches("p1", &profiles).await.unwrap_err();

    assert!(matches!(
        err,
        MatchmakingError::SchemaViolation { source: ValidationError::ScoreOutOfRange { .. }, .. }
    ));
}

#[tokio::test]
async fn test_scenario_d_timeout() {
    let profiles = scenario_a_profiles();
    let generator = StubGenerator::stalling(Duration::from_secs(5));
    let matchmaker = Matchmaker::new(generator.clone(), Duration::from_millis(50), 5);

    let started = std::time::Instant::now();
    let err = matchmaker.find_compatible_matches("p1", &profiles).await.unwrap_err();

    assert!(matches!(err, MatchmakingError::Unavailable(_)));
    assert!(err.is_retryable());
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_generator_failure_is_unavailable() {
    let profiles = scenario_a_profiles();
    let generator = StubGenerator::failing(|| GeneratorError::Timeout);
    let matchmaker = Matchmaker::with_defaults(generator.clone());

    let err = matchmaker.find_compatible_matches("p1", &profiles).await.unwrap_err();

    assert!(matches!(err, MatchmakingError::Unavailable(_)));
    // No internal retry
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_empty_pool_skips_generator() {
    let profiles = vec![create_pet("p1", Species::Cat, 4)];
    let generator = StubGenerator::replying(reply(&[]));
    let matchmaker = Matchmaker::with_defaults(generator.clone());

    let result = matchmaker.find_compatible_matches("p1", &profiles).await.unwrap();

    assert!(result.is_empty());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_unknown_subject_not_found() {
    let profiles = scenario_a_profiles();
    let generator = StubGenerator::replying(reply(&[("d1", 50.0)]));
    let matchmaker = Matchmaker::with_defaults(generator.clone());

    let err = matchmaker.find_compatible_matches("missing", &profiles).await.unwrap_err();

    assert!(matches!(err, MatchmakingError::NotFound(ref id) if id == "missing"));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let profiles = Arc::new(scenario_a_profiles());
    let generator = StubGenerator::replying(reply(&[("d1", 90.0), ("d2", 80.0)]));
    let matchmaker = Matchmaker::with_defaults(generator.clone());

    let handles: Vec<_> = ["p1", "d3", "c1"]
        .into_iter()
        .map(|subject| {
            let matchmaker = matchmaker.clone();
            let profiles = profiles.clone();
            tokio::spawn(async move { matchmaker.find_compatible_matches(subject, &profiles).await })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.len(), 2);
    }
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn test_store_to_matchmaker_flow() {
    let seed = json!({
        "pets": [
            { "petId": "pet-1", "ownerId": "u1", "ownerName": "Alex", "name": "Buddy", "type": "Dog",
              "breed": "Golden Retriever", "gender": "Male", "age": { "years": 3, "months": 2 },
              "activityLevel": 8, "specialNeeds": "" },
            { "petId": "pet-2", "ownerId": "u2", "ownerName": "Jo", "name": "Lucy", "type": "Dog",
              "breed": "Poodle", "gender": "Female", "age": { "years": 2, "months": 9 },
              "activityLevel": 7 },
            { "petId": "pet-3", "ownerId": "u3", "ownerName": "Kim", "name": "Whiskers", "type": "Cat",
              "breed": "Siamese", "gender": "Female", "age": { "years": 6, "months": 0 },
              "activityLevel": 2, "specialNeeds": "Needs a quiet space" }
        ]
    })
    .to_string();

    let store = InMemoryProfileStore::from_json_str(&seed).unwrap();
    let profiles = store.list().await.unwrap();

    let generator = StubGenerator::replying(format!(
        "```json\n{}\n```",
        reply(&[("pet-3", 20.0), ("pet-2", 95.0)])
    ));
    let matchmaker = Matchmaker::with_defaults(generator.clone());

    let result = matchmaker.find_compatible_matches("pet-1", &profiles).await.unwrap();

    assert_structural_properties("pet-1", &profiles, &result);
    assert_eq!(result[0].candidate_name, "Lucy");
    assert_eq!(result[1].candidate_name, "Whiskers");

    let prompt = generator.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.user.contains("Needs a quiet space"));
    assert!(!prompt.user.contains("Alex"));
}
