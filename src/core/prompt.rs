use crate::models::{MatchRequest, PetProfile};

/// Everything the generator needs for one call
#[derive(Debug, Clone)]
pub struct GenerationPrompt {
    pub system: String,
    pub user: String,
    /// JSON schema the reply must conform to
    pub output_schema: serde_json::Value,
}

impl GenerationPrompt {
    pub fn for_request(request: &MatchRequest, output_schema: serde_json::Value) -> Self {
        Self {
            system: system_prompt(),
            user: user_message(request),
            output_schema,
        }
    }
}

pub fn system_prompt() -> String {
    "You are an expert pet matchmaker. Your goal is to find the best playdates \
for a given pet from a list of other pets.\n\n\
Reply ONLY with a JSON object of the form \
{\"matches\":[{\"candidateId\":\"<pet id>\",\"candidateName\":\"<pet name>\",\
\"compatibilityScore\":<0-100>,\"reasoning\":\"<one sentence>\"}]}. \
Only use pet IDs from the list you are given. Output nothing else."
        .to_string()
}

/// Render the subject and candidate pool as plain text
pub fn user_message(request: &MatchRequest) -> String {
    let mut out = String::with_capacity(256 + request.candidates.len() * 192);

    out.push_str("Analyze the selected pet:\n");
    push_profile(&mut out, &request.subject, false);

    out.push_str(
        "\nNow, evaluate all the other pets based on compatibility. Consider factors like:\n\
- Species: dogs with dogs, cats with cats.\n\
- Size & breed: similar size and energy levels are generally good. Some breeds play better together.\n\
- Age: puppies and kittens have lots of energy, while senior pets might prefer calmer friends.\n\
- Activity level: a high-energy pet needs a playmate who can keep up.\n\
- Gender: sometimes opposite genders get along better, but it's not a strict rule.\n\n\
Here is the list of potential playmates:\n",
    );

    for candidate in &request.candidates {
        push_profile(&mut out, candidate, true);
        out.push('\n');
    }

    out.push_str(
        "Based on your analysis, provide a list of the top 3 to 5 most compatible playmates. \
For each match, provide a compatibility score from 0 to 100 and a brief, one-sentence \
reasoning for your recommendation.",
    );

    out
}

fn push_profile(out: &mut String, pet: &PetProfile, with_id: bool) {
    if with_id {
        out.push_str("- Pet ID: ");
        out.push_str(&pet.id);
        out.push('\n');
    }
    out.push_str("- Name: ");
    out.push_str(&pet.name);
    out.push_str("\n- Species: ");
    out.push_str(&pet.species.to_string());
    out.push_str("\n- Breed: ");
    out.push_str(&pet.breed);
    out.push_str(&format!(
        "\n- Age: {} years, {} months\n- Gender: {}\n- Activity Level: {}/10\n",
        pet.age.years, pet.age.months, pet.gender, pet.activity_level
    ));
    out.push_str("- Special Needs: ");
    out.push_str(pet.special_needs.as_deref().unwrap_or("none"));
    out.push('\n');
}
