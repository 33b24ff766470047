use serde::{Deserialize, Serialize};

const PLOT_MAX_TOKENS: u32 = 150;
const AWARDS_MAX_TOKENS: u32 = 50;

/// A single completion request handed to a [`crate::TextGenerator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl GenerationRequest {
    pub fn new(prompt: String) -> Self {
        Self {
            prompt,
            max_tokens: PLOT_MAX_TOKENS,
            temperature: 0.3,
            top_p: 0.9,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }
}

/// Builds the request that condenses the plots of every movie in a franchise.
/// Returns `None` when there is nothing to summarise.
pub fn plot_request(plots: &[String]) -> Option<GenerationRequest> {
    let pooled = pool(plots)?;
    let prompt = format!(
        "Generate a concise plot summary for the following franchise based on these plots: {}. \
         Respond only with the summary, without explanations or commentary.",
        pooled
    );
    Some(GenerationRequest::new(prompt).with_max_tokens(PLOT_MAX_TOKENS))
}

/// Builds the request that totals the awards text of every movie in a franchise.
pub fn awards_request(awards: &[String]) -> Option<GenerationRequest> {
    let pooled = pool(awards)?;
    let prompt = format!(
        "Provide only the total number of wins and nominations from the following awards data: {}. \
         Format the response as 'Total: X wins & Y nominations' with no extra text.",
        pooled
    );
    Some(
        GenerationRequest::new(prompt)
            .with_max_tokens(AWARDS_MAX_TOKENS)
            .with_temperature(0.1)
            .with_top_p(0.5),
    )
}

fn pool(texts: &[String]) -> Option<String> {
    let usable: Vec<&str> = texts
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && *t != "N/A")
        .collect();

    if usable.is_empty() {
        None
    } else {
        Some(usable.join(" | "))
    }
}
