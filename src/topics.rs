//! Topic classification for queries that miss the rule table.
//!
//! Each topic carries a fixed keyword set. At construction the sets are
//! inverted into a single word → topics map, so classifying a query is a
//! set intersection over its words rather than repeated substring scans.
//! The topic with the strictly highest keyword count wins; equal counts
//! resolve to the earlier topic in [`Topic::ALL`] — the tie-break is
//! explicit, not an accident of map iteration order.

use std::collections::{HashMap, HashSet};

use crate::index::tokenize;

/// Fixed topic tags, in priority order. Position in [`Topic::ALL`] is the
/// tie-break rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Product,
    Factory,
    Market,
    Financial,
    Conversion,
    Recommendation,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::Product,
        Topic::Factory,
        Topic::Market,
        Topic::Financial,
        Topic::Conversion,
        Topic::Recommendation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Topic::Product => "product",
            Topic::Factory => "factory",
            Topic::Market => "market",
            Topic::Financial => "financial",
            Topic::Conversion => "conversion",
            Topic::Recommendation => "recommendation",
        }
    }
}

/// Scores queries against the fixed topic keyword sets.
pub struct TopicClassifier {
    word_topics: HashMap<String, Vec<Topic>>,
}

impl TopicClassifier {
    /// Build the classifier from per-topic keyword sets.
    ///
    /// A word may trigger several topics (e.g. "overhead" counts for both
    /// factory and financial); it then contributes to each of their counts.
    pub fn new(keyword_sets: &[(Topic, Vec<&str>)]) -> Self {
        let mut word_topics: HashMap<String, Vec<Topic>> = HashMap::new();
        for (topic, words) in keyword_sets {
            for word in words {
                let entry = word_topics.entry(word.to_lowercase()).or_default();
                if !entry.contains(topic) {
                    entry.push(*topic);
                }
            }
        }
        Self { word_topics }
    }

    /// Pick the dominant topic of a query, if any keyword appears at all.
    ///
    /// Counts whole-word keyword occurrences per topic over the query's
    /// word set. All-zero counts return `None`; the resolver then falls
    /// through to its broader domain-relevance handling.
    pub fn classify(&self, query: &str) -> Option<Topic> {
        let words: HashSet<String> = tokenize(query).into_iter().collect();

        let mut counts = [0usize; Topic::ALL.len()];
        for word in &words {
            if let Some(topics) = self.word_topics.get(word) {
                for topic in topics {
                    counts[*topic as usize] += 1;
                }
            }
        }

        let mut best: Option<usize> = None;
        let mut best_count = 0usize;
        for (i, &count) in counts.iter().enumerate() {
            if count > best_count {
                best_count = count;
                best = Some(i);
            }
        }
        best.map(|i| Topic::ALL[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge;

    fn classifier() -> TopicClassifier {
        TopicClassifier::new(&knowledge::topic_keywords())
    }

    #[test]
    fn test_dominant_topic_wins() {
        let c = classifier();
        assert_eq!(
            c.classify("how big is the profit margin on each unit"),
            Some(Topic::Financial)
        );
    }

    #[test]
    fn test_no_keywords_is_none() {
        let c = classifier();
        assert_eq!(c.classify("completely unrelated chatter"), None);
    }

    #[test]
    fn test_tie_resolves_to_earlier_topic() {
        // One keyword from the product set, one from the factory set:
        // equal counts must resolve to product (earlier in Topic::ALL).
        let c = classifier();
        assert_eq!(c.classify("products from the plant"), Some(Topic::Product));
    }

    #[test]
    fn test_whole_words_only() {
        // "conversational" contains "conversion"-ish letters but is not a
        // whole-word keyword match.
        let c = classifier();
        assert_eq!(c.classify("a conversational aside"), None);
    }

    #[test]
    fn test_deterministic() {
        let c = classifier();
        let first = c.classify("should they convert the factory");
        let second = c.classify("should they convert the factory");
        assert_eq!(first, second);
    }
}
