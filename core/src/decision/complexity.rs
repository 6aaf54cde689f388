//! Complexity classification
//!
//! Drives the step/message caps a DecisionLoop run operates under.
//! Ultra-short openers shortcut to `Trivial` without a model call — the
//! same "don't pay for an LLM round trip to classify 'hi'" shortcut the
//! teacher's own complexity-free `StubEngine` takes for its echo case.

use crate::contracts::{CompletionClient, CompletionError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Trivial,
    Simple,
    Standard,
    Complex,
}

#[derive(Debug, Clone, Copy)]
pub struct ComplexityProfile {
    pub max_steps: usize,
    pub max_messages: usize,
}

impl Complexity {
    pub fn profile(self, configured_steps: usize, configured_messages: usize) -> ComplexityProfile {
        match self {
            Complexity::Trivial => ComplexityProfile {
                max_steps: 1,
                max_messages: 1,
            },
            Complexity::Simple => ComplexityProfile {
                max_steps: 3,
                max_messages: 2,
            },
            Complexity::Standard => ComplexityProfile {
                max_steps: configured_steps,
                max_messages: configured_messages,
            },
            Complexity::Complex => ComplexityProfile {
                max_steps: configured_steps,
                max_messages: configured_messages.max(8),
            },
        }
    }
}

const GREETING_WORDS: &[&str] = &["hi", "hey", "yo", "sup", "ok", "k", "👍", "🙏", "❤️"];

fn is_ultra_short_opener(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.chars().count() <= 5
        && GREETING_WORDS
            .iter()
            .any(|g| trimmed.eq_ignore_ascii_case(g))
}

/// Classify a task description's complexity, shortcutting the LLM call
/// for ultra-short openers.
pub async fn classify(
    client: &dyn CompletionClient,
    description: &str,
) -> Result<Complexity, CompletionError> {
    if is_ultra_short_opener(description) {
        return Ok(Complexity::Trivial);
    }

    let prompt = format!(
        "Classify the complexity of this task as exactly one of: trivial, simple, standard, complex.\n\nTask: {}\n\nRespond with only the single word.",
        description
    );
    let response = client
        .complete(&prompt, "You are a terse task-complexity classifier.")
        .await?;

    let normalized = response.trim().to_lowercase();
    Ok(match normalized.as_str() {
        "trivial" => Complexity::Trivial,
        "simple" => Complexity::Simple,
        "complex" => Complexity::Complex,
        _ => Complexity::Standard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubClient(&'static str);

    #[async_trait::async_trait]
    impl CompletionClient for StubClient {
        async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, CompletionError> {
            Ok(self.0.to_string())
        }
        async fn analyze_media(&self, _path: &str, _prompt: &str) -> Result<String, CompletionError> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn ultra_short_opener_shortcuts_without_llm_call() {
        let client = StubClient("complex"); // deliberately wrong to prove it's unused
        let result = classify(&client, "hi").await.unwrap();
        assert_eq!(result, Complexity::Trivial);
    }

    #[tokio::test]
    async fn unrecognized_response_defaults_to_standard() {
        let client = StubClient("banana");
        let result = classify(&client, "build me a report on quarterly revenue").await.unwrap();
        assert_eq!(result, Complexity::Standard);
    }

    #[test]
    fn standard_profile_uses_configured_caps() {
        let profile = Complexity::Standard.profile(25, 5);
        assert_eq!(profile.max_steps, 25);
        assert_eq!(profile.max_messages, 5);
    }

    #[test]
    fn complex_profile_floors_messages_at_eight() {
        let profile = Complexity::Complex.profile(25, 5);
        assert_eq!(profile.max_messages, 8);
        let profile2 = Complexity::Complex.profile(25, 10);
        assert_eq!(profile2.max_messages, 10);
    }
}
