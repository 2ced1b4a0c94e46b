//! Trigger-phrase rule matching.
//!
//! A [`RuleTable`] is an ordered mapping from lowercased trigger phrase to
//! canned answer, validated at construction (duplicate or empty keys are a
//! startup error, never a runtime surprise). [`RuleMatcher`] layers four
//! lookups over it, cheapest first:
//!
//! 1. courtesy phrases (greetings, thanks, identity questions),
//! 2. exact table lookup on the whole query,
//! 3. substring containment in definition order,
//! 4. fuzzy word-overlap scoring with a configurable cutoff.
//!
//! Greeting and thanks detection is length-bounded: the message may exceed
//! the matched phrase by at most [`COURTESY_MAX_EXTRA`] characters, so a
//! long sentence that merely contains "hey" somewhere does not turn into a
//! greeting.

use std::collections::HashSet;

use anyhow::{bail, Result};

use crate::index::tokenize;

/// Slack allowed between a courtesy phrase and the whole message length.
const COURTESY_MAX_EXTRA: usize = 10;

/// Keys shorter than this never participate in fuzzy scoring.
const FUZZY_MIN_KEY_LEN: usize = 4;

/// Bonus added when a key occurs verbatim inside the query.
const FUZZY_SUBSTRING_BONUS: f32 = 0.5;

/// Filler words excluded from the fuzzy overlap computation. Without this
/// filter, "tell me about the weather today" overlaps "tell me about
/// rubber bumper" on its filler alone and clears the cutoff.
const STOPWORDS: &[&str] = &[
    "the", "an", "and", "or", "of", "to", "in", "on", "at", "for", "is", "are", "was", "were",
    "be", "do", "does", "did", "me", "my", "you", "your", "it", "its", "we", "they", "their",
    "what", "who", "how", "why", "when", "tell", "about", "please", "can", "could", "would",
];

/// Ordered trigger phrase → canned answer table with unique keys.
pub struct RuleTable {
    entries: Vec<(String, String)>,
}

impl RuleTable {
    /// Build a table from `(trigger, answer)` pairs, preserving order.
    ///
    /// Triggers are lowercased and trimmed. Empty triggers, empty answers,
    /// and duplicate triggers are configuration errors.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut entries: Vec<(String, String)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (trigger, answer) in pairs {
            let key = trigger.as_ref().trim().to_lowercase();
            let value = answer.as_ref().to_string();
            if key.is_empty() {
                bail!("Rule table contains an empty trigger phrase");
            }
            if value.trim().is_empty() {
                bail!("Rule '{}' has an empty answer", key);
            }
            if !seen.insert(key.clone()) {
                bail!("Duplicate rule trigger: '{}'", key);
            }
            entries.push((key, value));
        }

        Ok(Self { entries })
    }

    /// Exact lookup on a normalized query.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Entries in definition order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A set of courtesy phrases sharing one fixed reply.
pub struct PhraseSet {
    pub phrases: Vec<String>,
    pub reply: String,
    /// When true the match is length-bounded (greetings, thanks); identity
    /// questions match anywhere in the message.
    pub bounded: bool,
}

impl PhraseSet {
    pub fn new(phrases: &[&str], reply: &str, bounded: bool) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
            reply: reply.to_string(),
            bounded,
        }
    }
}

/// Layered rule lookup over a [`RuleTable`] and courtesy phrase sets.
pub struct RuleMatcher {
    table: RuleTable,
    courtesy: Vec<PhraseSet>,
    fuzzy_threshold: f32,
}

impl RuleMatcher {
    pub fn new(table: RuleTable, courtesy: Vec<PhraseSet>, fuzzy_threshold: f32) -> Self {
        Self {
            table,
            courtesy,
            fuzzy_threshold,
        }
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Find a canned answer for a normalized (lowercased, trimmed) query.
    pub fn find(&self, query: &str) -> Option<String> {
        for set in &self.courtesy {
            for phrase in &set.phrases {
                if !query.contains(phrase.as_str()) {
                    continue;
                }
                if set.bounded
                    && query.chars().count() > phrase.chars().count() + COURTESY_MAX_EXTRA
                {
                    continue;
                }
                return Some(set.reply.clone());
            }
        }

        if let Some(answer) = self.table.get(query) {
            return Some(answer.to_string());
        }

        for (key, answer) in self.table.entries() {
            if query.contains(key.as_str()) {
                return Some(answer.clone());
            }
        }

        self.fuzzy_find(query)
    }

    /// Word-overlap scoring over all sufficiently long keys.
    ///
    /// `overlap = |words(key) ∩ words(query)| / max(|words(key)|, |words(query)|)`
    /// over content words, plus a bonus when the key occurs verbatim. The
    /// best entry wins only if its score exceeds the threshold; equal
    /// scores keep the earlier entry.
    fn fuzzy_find(&self, query: &str) -> Option<String> {
        let query_words = content_words(query);
        if query_words.is_empty() {
            return None;
        }

        let mut best_score = 0.0f32;
        let mut best_answer: Option<&str> = None;

        for (key, answer) in self.table.entries() {
            if key.chars().count() < FUZZY_MIN_KEY_LEN {
                continue;
            }
            let key_words = content_words(key);
            if key_words.is_empty() {
                continue;
            }
            let common = key_words.intersection(&query_words).count();
            let denom = key_words.len().max(query_words.len()) as f32;
            let mut score = common as f32 / denom;
            if query.contains(key.as_str()) {
                score += FUZZY_SUBSTRING_BONUS;
            }
            if score > best_score {
                best_score = score;
                best_answer = Some(answer);
            }
        }

        if best_score > self.fuzzy_threshold {
            best_answer.map(|a| a.to_string())
        } else {
            None
        }
    }
}

/// Tokenized words with stopwords removed.
fn content_words(text: &str) -> HashSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge;

    fn matcher() -> RuleMatcher {
        let table = RuleTable::from_pairs(knowledge::rule_entries()).unwrap();
        RuleMatcher::new(table, knowledge::courtesy_sets(), 0.4)
    }

    #[test]
    fn test_duplicate_trigger_rejected() {
        let result = RuleTable::from_pairs(vec![("profit", "a"), ("Profit", "b")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_trigger_rejected() {
        assert!(RuleTable::from_pairs(vec![("  ", "a")]).is_err());
    }

    #[test]
    fn test_empty_answer_rejected() {
        assert!(RuleTable::from_pairs(vec![("profit", " ")]).is_err());
    }

    #[test]
    fn test_exact_lookup() {
        let m = matcher();
        assert_eq!(
            m.find("what product").as_deref(),
            Some("Rubber Bumper Co sells two products: rubber bands and condoms.")
        );
    }

    #[test]
    fn test_substring_containment() {
        let m = matcher();
        // Not an exact key, but "margin" is contained in the query; the
        // containment pass walks definition order and answers with the
        // first containing key.
        let answer = m.find("what is their margin like").unwrap();
        assert!(answer.contains("60%"));
    }

    #[test]
    fn test_greeting_short_message() {
        let m = matcher();
        let answer = m.find("hello there").unwrap();
        assert!(answer.starts_with("Hello!"));
    }

    #[test]
    fn test_greeting_not_matched_in_long_sentence() {
        let m = matcher();
        // Contains "hey" as a substring, but the message is far longer
        // than the phrase plus slack, so it must not greet back. It also
        // matches no rule, so the matcher yields nothing.
        assert_eq!(m.find("hey can you explain their entire strategic position in detail"), None);
    }

    #[test]
    fn test_thanks() {
        let m = matcher();
        assert_eq!(m.find("thanks").as_deref(), Some("You're welcome!"));
    }

    #[test]
    fn test_identity_question() {
        let m = matcher();
        let answer = m.find("tell me who are you exactly and how you can help me").unwrap();
        assert!(answer.contains("case study"));
    }

    #[test]
    fn test_fuzzy_overlap_match() {
        let m = matcher();
        // No key is contained verbatim, but "sales" + "trend" overlap the
        // "sales trend" key strongly enough to clear the cutoff.
        let answer = m.find("trend of sales").unwrap();
        assert!(answer.contains("stable"));
    }

    #[test]
    fn test_no_match() {
        let m = matcher();
        assert_eq!(m.find("tell me about the weather today"), None);
    }

    #[test]
    fn test_filler_overlap_does_not_match() {
        let m = matcher();
        // Shares only filler words ("tell", "me", "about") with table keys;
        // content-word overlap is zero.
        assert_eq!(m.find("tell me about something else entirely"), None);
    }
}
