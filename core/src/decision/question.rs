//! Question detection
//!
//! A message is treated as a question — triggering the action's
//! `waiting` transition after a successful send — if it matches any of a
//! configurable set of heuristic patterns. False positives are an
//! accepted tradeoff the spec calls out explicitly (Open Question §9);
//! patterns are data, not hard-coded, so an operator can retune them.

use regex::Regex;

pub struct QuestionDetector {
    patterns: Vec<Regex>,
}

impl QuestionDetector {
    pub fn with_default_patterns() -> Self {
        let raw = [
            r"\?\s*$",
            r"(?i)\bwould you\b",
            r"(?i)\bdo you\b",
            r"(?i)\bshould i\b",
            r"(?i)\bwhat\b.{0,20}\?",
            r"(?i)\bwhich\b.{0,20}\?",
            r"(?i)\bcan you\b",
            r"(?i)\blet me know\b",
            r"(?i)\bplease confirm\b",
            r"(?i)\bplease clarify\b",
            r"(?i)\bplease specify\b",
            r"(?i)\bis that ok\b",
            r"(?i)\beither\b.+\bor\b",
        ];
        Self::with_patterns(&raw)
    }

    pub fn with_patterns(raw: &[&str]) -> Self {
        let patterns = raw
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self { patterns }
    }

    pub fn is_question(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }
}

impl Default for QuestionDetector {
    fn default() -> Self {
        Self::with_default_patterns()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_trailing_question_mark() {
        let d = QuestionDetector::default();
        assert!(d.is_question("Which topics should I cover?"));
    }

    #[test]
    fn detects_let_me_know_without_question_mark() {
        let d = QuestionDetector::default();
        assert!(d.is_question("Let me know which format you prefer."));
    }

    #[test]
    fn plain_statement_is_not_a_question() {
        let d = QuestionDetector::default();
        assert!(!d.is_question("I've scheduled the daily digest for 8am."));
    }

    #[test]
    fn either_or_without_question_mark_is_detected() {
        let d = QuestionDetector::default();
        assert!(d.is_question("I can send either a summary or the full report."));
    }
}
