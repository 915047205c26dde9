use crate::model::NodeKind;
use serde::{Deserialize, Serialize};

pub const LABEL_MAX_CHARS: usize = 50;

/// What callers hand to the ingestion boundary: raw text, a node kind, and
/// optional metadata overrides that win over anything the store infers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionRequest {
    pub content: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub domain: Option<String>,
}

impl IngestionRequest {
    pub fn new(content: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            content: content.into(),
            kind,
            source: None,
            confidence: None,
            domain: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// Short display label: first sentence, capped at [`LABEL_MAX_CHARS`] chars,
/// ellipsis appended.
pub fn derive_label(content: &str) -> String {
    let first_sentence = content
        .split(['.', '!', '?'])
        .next()
        .unwrap_or(content);
    let truncated: String = first_sentence.trim().chars().take(LABEL_MAX_CHARS).collect();
    format!("{truncated}...")
}

/// Ordered keyword table for domain inference. Table order is the tie-break:
/// the first domain with any matching keyword wins.
const DOMAIN_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "ai",
        &[
            "artificial intelligence",
            "machine learning",
            "neural",
            "deep learning",
            "algorithm",
        ],
    ),
    (
        "science",
        &[
            "science",
            "research",
            "physics",
            "biology",
            "chemistry",
            "experiment",
        ],
    ),
    (
        "technology",
        &[
            "technology",
            "software",
            "computer",
            "internet",
            "hardware",
            "digital",
        ],
    ),
    (
        "business",
        &[
            "business",
            "market",
            "economy",
            "finance",
            "startup",
            "company",
        ],
    ),
];

pub const FALLBACK_DOMAIN: &str = "general";

/// Case-insensitive substring match against the fixed keyword table.
pub fn infer_domain(content: &str) -> String {
    let lowered = content.to_lowercase();
    for (domain, keywords) in DOMAIN_KEYWORDS {
        if keywords.iter().any(|keyword| lowered.contains(keyword)) {
            return (*domain).to_string();
        }
    }
    FALLBACK_DOMAIN.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_takes_first_sentence() {
        let label = derive_label("Graphs store knowledge. Edges connect it.");
        assert_eq!(label, "Graphs store knowledge...");
    }

    #[test]
    fn label_truncates_long_sentences() {
        let content = "a".repeat(120);
        let label = derive_label(&content);
        assert_eq!(label.chars().count(), LABEL_MAX_CHARS + 3);
        assert!(label.ends_with("..."));
    }

    #[test]
    fn label_handles_question_and_exclamation() {
        assert_eq!(derive_label("What is entropy? A measure."), "What is entropy...");
    }

    #[test]
    fn domain_matches_are_case_insensitive() {
        assert_eq!(infer_domain("Advances in Machine Learning systems"), "ai");
        assert_eq!(infer_domain("QUARTERLY MARKET OUTLOOK"), "business");
    }

    #[test]
    fn domain_table_order_breaks_ties() {
        // Both "machine learning" (ai) and "market" (business) match;
        // the table lists ai first.
        assert_eq!(infer_domain("machine learning market trends"), "ai");
    }

    #[test]
    fn unmatched_content_falls_back_to_general() {
        assert_eq!(infer_domain("a plain note about gardening"), FALLBACK_DOMAIN);
    }
}
