//! Query resolution state machine.
//!
//! [`Resolver`] composes the rule matcher, topic classifier, document
//! index, and generation collaborator into a single deterministic
//! pipeline. Tiers run in fixed priority order and the first one to
//! produce an answer is terminal:
//!
//! 1. blank/too-short input → fixed prompt message
//! 2. response cache
//! 3. rule matcher (exact, substring, fuzzy)
//! 4. domain-relevance gate → fixed out-of-scope message
//! 5. topic classifier → canned answer
//! 6. index search → reduced passage
//! 7. generation collaborator (timeout-bounded)
//! 8. fixed fallback summary
//!
//! A tier that fails (empty index, generator error or timeout) is logged
//! and treated as having produced nothing; ordinary input can never make
//! `resolve` return an error. Every terminal answer is cached under the
//! normalized query, so repeat resolutions are cache hits.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::generate::{self, Generator};
use crate::index::{tokenize, DocumentIndex};
use crate::ingest;
use crate::knowledge;
use crate::models::{AnswerSource, Resolution};
use crate::rules::{RuleMatcher, RuleTable};
use crate::topics::TopicClassifier;

/// Longest line the passage reducer will return as a single-line answer.
const SNIPPET_MAX_CHARS: usize = 150;

/// Normalized-query → answer cache with optional capacity.
///
/// An explicit object owned by the resolver rather than process-wide
/// state; safe to clear at any time (only recomputation cost changes).
/// Capacity 0 means unbounded; otherwise the oldest entry is evicted
/// first.
pub struct ResponseCache {
    max_entries: usize,
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    map: HashMap<String, String>,
    order: VecDeque<String>,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            inner: Mutex::new(CacheInner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().map.get(key).cloned()
    }

    pub fn insert(&self, key: String, answer: String) {
        let mut inner = self.inner.lock().unwrap();
        if inner.map.insert(key.clone(), answer).is_none() {
            inner.order.push_back(key);
            if self.max_entries > 0 && inner.order.len() > self.max_entries {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.map.remove(&oldest);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.map.clear();
        inner.order.clear();
    }
}

/// The layered query resolver.
pub struct Resolver {
    rules: RuleMatcher,
    topics: TopicClassifier,
    index: DocumentIndex,
    cache: ResponseCache,
    generator: Box<dyn Generator>,
    domain_terms: Vec<String>,
    top_k: usize,
    generation_enabled: bool,
    generation_timeout: Duration,
}

impl Resolver {
    /// Wire a resolver from configuration and the built-in knowledge pack.
    ///
    /// Fails fast on configuration errors: a malformed extra-rules file, a
    /// duplicate trigger, or an unusable generation provider all refuse to
    /// start.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut pairs: Vec<(String, String)> = knowledge::rule_entries()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if let Some(path) = &config.knowledge.rules_path {
            pairs.extend(knowledge::load_extra_rules(path)?);
        }
        let table = RuleTable::from_pairs(pairs).context("Invalid rule table")?;

        let rules = RuleMatcher::new(
            table,
            knowledge::courtesy_sets(),
            config.retrieval.fuzzy_threshold,
        );
        let topics = TopicClassifier::new(&knowledge::topic_keywords());
        let index = DocumentIndex::new(config.retrieval.relevance_floor);
        let cache = ResponseCache::new(config.cache.max_entries);
        let generator = generate::create_generator(&config.generation)?;

        Ok(Self {
            rules,
            topics,
            index,
            cache,
            generator,
            domain_terms: knowledge::domain_terms()
                .into_iter()
                .map(|t| t.to_string())
                .collect(),
            top_k: config.retrieval.top_k,
            generation_enabled: config.generation.is_enabled(),
            generation_timeout: Duration::from_secs(config.generation.timeout_secs),
        })
    }

    /// Seed the index per corpus configuration: the built-in baseline
    /// passages plus any configured files or directories. Also the reseed
    /// path after [`Resolver::clear`] — seeding is this caller-level
    /// policy, never the index's.
    pub fn seed(&self, config: &Config) -> Result<usize> {
        let mut passages = Vec::new();
        if config.corpus.seed_baseline {
            passages.extend(knowledge::baseline_passages());
        }
        passages.extend(ingest::load_corpus(
            &config.corpus.paths,
            &config.corpus.include_globs,
        )?);
        let count = passages.len();
        self.index.add(&passages);
        Ok(count)
    }

    /// Resolve a query to an answer. Total: every outcome is a non-empty
    /// string, and a fixed corpus plus fixed query always yields the same
    /// answer.
    pub async fn resolve(&self, query: &str) -> Resolution {
        let normalized = query.trim().to_lowercase();

        if normalized.chars().count() < 2 {
            return Resolution {
                answer: knowledge::PROMPT_FOR_INPUT.to_string(),
                source: AnswerSource::Prompt,
            };
        }

        if let Some(answer) = self.cache.get(&normalized) {
            return Resolution {
                answer,
                source: AnswerSource::Cached,
            };
        }

        if let Some(answer) = self.rules.find(&normalized) {
            return self.remember(normalized, answer, AnswerSource::Rule);
        }

        if !self
            .domain_terms
            .iter()
            .any(|term| normalized.contains(term.as_str()))
        {
            return self.remember(
                normalized,
                knowledge::OUT_OF_SCOPE_REPLY.to_string(),
                AnswerSource::OutOfScope,
            );
        }

        if let Some(topic) = self.topics.classify(&normalized) {
            let answer = knowledge::topic_answer(topic, &normalized).to_string();
            return self.remember(normalized, answer, AnswerSource::Topic);
        }

        let hits = self.index.search(&normalized, self.top_k);
        if let Some(best) = hits.first() {
            if let Some(answer) = reduce_passage(&best.text, &normalized) {
                return self.remember(normalized, answer, AnswerSource::Retrieval);
            }
        }

        if self.generation_enabled {
            let context = if hits.is_empty() {
                None
            } else {
                Some(
                    hits.iter()
                        .map(|h| h.text.as_str())
                        .collect::<Vec<_>>()
                        .join("\n\n"),
                )
            };
            match tokio::time::timeout(
                self.generation_timeout,
                self.generator.generate(query, context.as_deref()),
            )
            .await
            {
                Ok(Ok(answer)) if !answer.trim().is_empty() => {
                    return self.remember(normalized, answer, AnswerSource::Generated);
                }
                Ok(Ok(_)) => {
                    tracing::warn!(provider = self.generator.name(), "generation returned empty answer");
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider = self.generator.name(), "generation failed: {e:#}");
                }
                Err(_) => {
                    tracing::warn!(
                        provider = self.generator.name(),
                        "generation timed out after {:?}",
                        self.generation_timeout
                    );
                }
            }
        }

        self.remember(
            normalized,
            knowledge::FALLBACK_SUMMARY.to_string(),
            AnswerSource::Fallback,
        )
    }

    /// Convenience wrapper returning only the answer text.
    pub async fn resolve_text(&self, query: &str) -> String {
        self.resolve(query).await.answer
    }

    /// Drop all indexed passages and cached answers. Callers reseed via
    /// [`Resolver::seed`] if baseline passages should survive the clear.
    pub fn clear(&self) {
        self.index.clear();
        self.cache.clear();
    }

    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }

    pub fn document_count(&self) -> usize {
        self.index.len()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Ingest raw text: clean, chunk, and add to the index.
    /// Returns the number of chunks added.
    pub fn ingest_text(&self, text: &str) -> usize {
        let chunks = ingest::chunk_document(text);
        self.index.add(&chunks);
        chunks.len()
    }

    /// Ingest a file (txt/md/pdf/docx) from disk.
    pub fn ingest_file(&self, path: &Path) -> Result<usize> {
        let text = ingest::load_source(path)?;
        Ok(self.ingest_text(&text))
    }

    fn remember(&self, key: String, answer: String, source: AnswerSource) -> Resolution {
        self.cache.insert(key, answer.clone());
        Resolution { answer, source }
    }
}

/// Reduce a retrieved passage to a short answer.
///
/// Heading (`#`) and rule (`---`) lines are skipped. Up to three content
/// lines are returned whole; longer passages prefer the first line that
/// mentions a query word and fits in [`SNIPPET_MAX_CHARS`], falling back
/// to the first two lines.
fn reduce_passage(text: &str, query: &str) -> Option<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with("---"))
        .collect();

    if lines.is_empty() {
        return None;
    }
    if lines.len() <= 3 {
        return Some(lines.join(" "));
    }

    let query_words = tokenize(query);
    for line in &lines {
        let lower = line.to_lowercase();
        if line.chars().count() < SNIPPET_MAX_CHARS
            && query_words.iter().any(|w| lower.contains(w.as_str()))
        {
            return Some((*line).to_string());
        }
    }

    Some(lines[..2].join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> Resolver {
        let mut config = Config::default();
        config.corpus.seed_baseline = false;
        Resolver::from_config(&config).unwrap()
    }

    fn seeded_resolver() -> Resolver {
        let config = Config::default();
        let r = Resolver::from_config(&config).unwrap();
        r.seed(&config).unwrap();
        r
    }

    #[tokio::test]
    async fn test_empty_input_law() {
        let r = resolver();
        assert_eq!(r.resolve("").await.answer, knowledge::PROMPT_FOR_INPUT);
        assert_eq!(r.resolve("  ").await.answer, knowledge::PROMPT_FOR_INPUT);
        assert_eq!(r.resolve("a").await.answer, knowledge::PROMPT_FOR_INPUT);
    }

    #[tokio::test]
    async fn test_rule_precedence_over_index() {
        let r = seeded_resolver();
        let res = r.resolve("what product").await;
        assert_eq!(res.source, AnswerSource::Rule);
        assert_eq!(
            res.answer,
            "Rubber Bumper Co sells two products: rubber bands and condoms."
        );
    }

    #[tokio::test]
    async fn test_out_of_scope_before_search() {
        let r = seeded_resolver();
        let res = r.resolve("tell me about the weather today").await;
        assert_eq!(res.source, AnswerSource::OutOfScope);
        assert_eq!(res.answer, knowledge::OUT_OF_SCOPE_REPLY);
    }

    #[tokio::test]
    async fn test_topic_tie_break() {
        // One product keyword ("product") and one factory keyword
        // ("plant"): equal counts resolve to the earlier topic.
        let r = resolver();
        let res = r.resolve("their product line and the plant").await;
        assert_eq!(res.source, AnswerSource::Topic);
        assert!(res.answer.contains("two products"));
    }

    #[tokio::test]
    async fn test_retrieval_tier() {
        let r = resolver();
        r.index()
            .add(&["The company was founded in 1952 in Akron.".to_string()]);
        let res = r
            .resolve("how was the company founded and by whom in which town")
            .await;
        assert_eq!(res.source, AnswerSource::Retrieval);
        assert!(res.answer.contains("1952"));
    }

    #[tokio::test]
    async fn test_fallback_guarantee() {
        // In-domain wording, but no rule, topic, or indexed passage
        // applies, and generation is disabled.
        let r = resolver();
        let res = r.resolve("band colors available").await;
        assert_eq!(res.source, AnswerSource::Fallback);
        assert_eq!(res.answer, knowledge::FALLBACK_SUMMARY);
    }

    #[tokio::test]
    async fn test_cache_idempotence() {
        let r = seeded_resolver();
        let first = r.resolve("What Product").await;
        let size_after_first = r.cache_len();
        let second = r.resolve("  what product  ").await;
        assert_eq!(first.answer, second.answer);
        assert_eq!(second.source, AnswerSource::Cached);
        assert_eq!(r.cache_len(), size_after_first);
    }

    #[tokio::test]
    async fn test_determinism() {
        let r = seeded_resolver();
        for query in ["market share", "should they convert", "hello"] {
            let a = r.resolve(query).await.answer;
            let b = r.resolve(query).await.answer;
            assert_eq!(a, b, "answers diverged for '{query}'");
        }
    }

    #[tokio::test]
    async fn test_totality() {
        let r = seeded_resolver();
        for query in [
            "zz",
            "what about the margin situation in 2017?",
            "辅导 условия",
            "    spaced out question about profit    ",
        ] {
            let answer = r.resolve(query).await.answer;
            assert!(!answer.is_empty(), "empty answer for '{query}'");
        }
    }

    #[tokio::test]
    async fn test_clear_then_reseed() {
        let config = Config::default();
        let r = Resolver::from_config(&config).unwrap();
        r.seed(&config).unwrap();
        r.ingest_text("An uploaded note about quarterly figures.");
        let total = r.document_count();

        r.clear();
        assert_eq!(r.document_count(), 0);
        assert_eq!(r.cache_len(), 0);

        r.seed(&config).unwrap();
        assert_eq!(
            r.document_count(),
            knowledge::baseline_passages().len(),
            "reseed must restore only the baseline, not uploads"
        );
        assert!(r.document_count() < total);
    }

    #[test]
    fn test_cache_eviction() {
        let cache = ResponseCache::new(2);
        cache.insert("a".into(), "1".into());
        cache.insert("b".into(), "2".into());
        cache.insert("c".into(), "3".into());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("c").as_deref(), Some("3"));
    }

    #[test]
    fn test_reduce_passage_short() {
        let text = "# Heading\nFirst line.\nSecond line.";
        let reduced = reduce_passage(text, "anything").unwrap();
        assert_eq!(reduced, "First line. Second line.");
    }

    #[test]
    fn test_reduce_passage_prefers_query_line() {
        let text = "Alpha alpha alpha.\nBeta beta beta.\nThe payback period is 5 years.\nGamma gamma.\nDelta delta.";
        let reduced = reduce_passage(text, "payback period").unwrap();
        assert_eq!(reduced, "The payback period is 5 years.");
    }

    #[test]
    fn test_reduce_passage_empty() {
        assert_eq!(reduce_passage("# only a heading\n---\n", "q"), None);
    }
}
