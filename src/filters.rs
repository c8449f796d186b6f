//! Pluggable metadata-filter extraction from user utterances.
//!
//! The orchestrator never inspects utterance text itself; it asks a
//! [`FilterStrategy`] whether a metadata predicate should be attached to
//! the product query. The default strategy maps a closed gender token
//! vocabulary onto an equality filter over the `gender` field, so the
//! vocabulary can be extended (or new fields added) without touching the
//! orchestrator.

use serde_json::json;

use crate::store::MetadataFilter;

pub trait FilterStrategy: Send + Sync {
    /// Return the metadata predicate implied by the utterance, if any.
    fn extract(&self, utterance: &str) -> Option<MetadataFilter>;
}

/// Strategy that never filters.
pub struct NoFilter;

impl FilterStrategy for NoFilter {
    fn extract(&self, _utterance: &str) -> Option<MetadataFilter> {
        None
    }
}

/// Maps token vocabularies onto an equality filter over one metadata
/// field. Matching is case-insensitive and token-wise ("women" never
/// triggers the "men" entry). An utterance matching more than one
/// vocabulary entry is ambiguous and yields no filter.
pub struct KeywordFilter {
    field: String,
    vocabulary: Vec<(String, Vec<&'static str>)>,
}

impl KeywordFilter {
    pub fn new(field: &str, vocabulary: Vec<(String, Vec<&'static str>)>) -> Self {
        Self {
            field: field.to_string(),
            vocabulary,
        }
    }

    /// The stock gender vocabulary used for product retrieval.
    pub fn gender() -> Self {
        Self::new(
            "gender",
            vec![
                (
                    "male".to_string(),
                    vec![
                        "male", "man", "men", "mens", "boy", "boys", "guy", "guys", "gentleman",
                        "gentlemen", "him", "his",
                    ],
                ),
                (
                    "female".to_string(),
                    vec![
                        "female", "woman", "women", "womens", "girl", "girls", "lady", "ladies",
                        "gal", "her", "hers",
                    ],
                ),
            ],
        )
    }
}

impl FilterStrategy for KeywordFilter {
    fn extract(&self, utterance: &str) -> Option<MetadataFilter> {
        let lowered = utterance.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let mut matched: Option<&str> = None;
        for (value, vocab) in &self.vocabulary {
            if tokens.iter().any(|t| vocab.contains(t)) {
                match matched {
                    None => matched = Some(value),
                    // A second distinct match is ambiguous.
                    Some(prev) if prev != value => return None,
                    Some(_) => {}
                }
            }
        }

        matched.map(|value| {
            let mut filter = MetadataFilter::new();
            filter.insert(self.field.clone(), json!(value));
            filter
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gender_of(utterance: &str) -> Option<String> {
        KeywordFilter::gender()
            .extract(utterance)
            .and_then(|f| f.get("gender").and_then(|v| v.as_str().map(String::from)))
    }

    #[test]
    fn detects_male_tokens() {
        assert_eq!(gender_of("running shoes for men"), Some("male".to_string()));
        assert_eq!(gender_of("a gift for HIM"), Some("male".to_string()));
        assert_eq!(gender_of("boys sneakers"), Some("male".to_string()));
    }

    #[test]
    fn detects_female_tokens() {
        assert_eq!(gender_of("dresses for women"), Some("female".to_string()));
        assert_eq!(gender_of("Ladies watches?"), Some("female".to_string()));
    }

    #[test]
    fn matching_is_token_wise_not_substring() {
        // "women" contains "men" as a substring; it must only match female.
        assert_eq!(gender_of("shoes for women"), Some("female".to_string()));
        // "history" contains "his".
        assert_eq!(gender_of("books about history"), None);
    }

    #[test]
    fn no_tokens_no_filter() {
        assert_eq!(gender_of("do you have a yoga mat"), None);
        assert_eq!(gender_of(""), None);
    }

    #[test]
    fn ambiguous_utterance_yields_no_filter() {
        assert_eq!(gender_of("jackets for men and women"), None);
    }

    #[test]
    fn no_filter_strategy_is_inert() {
        assert!(NoFilter.extract("shoes for men").is_none());
    }
}
