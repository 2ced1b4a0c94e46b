//! In-memory TF-IDF document index with cosine-similarity search.
//!
//! The index owns an ordered sequence of passages and a term-weight matrix
//! derived from the *current* full corpus. Any `add` or `clear` invalidates
//! and recomputes the whole matrix — there is no incremental update, so the
//! matrix is always consistent with the document sequence.
//!
//! Weighting follows the classic smoothed TF-IDF scheme: raw term counts
//! scaled by `ln((1+n)/(1+df)) + 1`, rows L2-normalized so that cosine
//! similarity reduces to a dot product. Results below the relevance floor
//! are dropped; ties keep insertion order (stable sort).
//!
//! Concurrency: a single `RwLock` guards documents and matrix together.
//! `search` takes the shared lock; `add`/`clear` take the exclusive lock,
//! so a search never observes a half-rebuilt matrix.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use crate::models::SearchHit;

/// Default minimum similarity for a search result to be usable.
pub const DEFAULT_RELEVANCE_FLOOR: f32 = 0.1;

/// Shortest token length admitted into the vocabulary.
const MIN_TOKEN_LEN: usize = 2;

struct IndexState {
    docs: Vec<String>,
    /// Sorted vocabulary over the current corpus.
    vocab: Vec<String>,
    /// Smoothed inverse document frequency, aligned with `vocab`.
    idf: Vec<f32>,
    /// L2-normalized TF-IDF rows, aligned with `docs`. `None` until the
    /// first rebuild and after `clear`.
    vectors: Option<Vec<Vec<f32>>>,
}

/// Ordered, process-lifetime passage index with ranked similarity search.
pub struct DocumentIndex {
    state: RwLock<IndexState>,
    relevance_floor: f32,
}

impl DocumentIndex {
    /// Create an empty index with the given relevance floor.
    pub fn new(relevance_floor: f32) -> Self {
        Self {
            state: RwLock::new(IndexState {
                docs: Vec::new(),
                vocab: Vec::new(),
                idf: Vec::new(),
                vectors: None,
            }),
            relevance_floor,
        }
    }

    /// Append passages and recompute the term-weight matrix over the whole
    /// updated corpus. Empty input is a no-op besides the trivial recompute.
    pub fn add(&self, documents: &[String]) {
        let mut state = self.state.write().unwrap();
        state.docs.extend(documents.iter().cloned());
        rebuild(&mut state);
    }

    /// Return up to `top_k` passages ranked by descending cosine similarity.
    ///
    /// Only passages scoring strictly above the relevance floor are
    /// included; fewer than `top_k` may be returned. An empty or
    /// not-yet-vectorized index yields an empty result, never an error.
    /// Repeated calls over a fixed corpus return identical results.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        let state = self.state.read().unwrap();
        let vectors = match &state.vectors {
            Some(v) => v,
            None => return Vec::new(),
        };

        let index_of: HashMap<&str, usize> = state
            .vocab
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let mut query_vec = vec![0.0f32; state.vocab.len()];
        let mut in_vocab = false;
        for token in tokenize(query) {
            if let Some(&i) = index_of.get(token.as_str()) {
                query_vec[i] += 1.0;
                in_vocab = true;
            }
        }
        if !in_vocab {
            return Vec::new();
        }
        for (i, w) in query_vec.iter_mut().enumerate() {
            *w *= state.idf[i];
        }
        l2_normalize(&mut query_vec);

        let mut hits: Vec<SearchHit> = state
            .docs
            .iter()
            .zip(vectors.iter())
            .filter_map(|(doc, vec)| {
                let score = dot(&query_vec, vec);
                if score > self.relevance_floor {
                    Some(SearchHit {
                        text: doc.clone(),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        hits
    }

    /// Drop all passages and invalidate the matrix. Reseeding baseline
    /// passages afterwards is the caller's policy, not the index's.
    pub fn clear(&self) {
        let mut state = self.state.write().unwrap();
        state.docs.clear();
        rebuild(&mut state);
    }

    /// Number of indexed passages.
    pub fn len(&self) -> usize {
        self.state.read().unwrap().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lowercase alphanumeric runs of at least [`MIN_TOKEN_LEN`] characters.
///
/// This is the vocabulary definition shared by the index, the rule
/// matcher's word-overlap scoring, and the topic classifier.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(|t| t.to_string())
        .collect()
}

/// Recompute vocabulary, idf, and all document vectors from scratch.
fn rebuild(state: &mut IndexState) {
    if state.docs.is_empty() {
        state.vocab.clear();
        state.idf.clear();
        state.vectors = None;
        return;
    }

    let token_lists: Vec<Vec<String>> = state.docs.iter().map(|d| tokenize(d)).collect();

    let mut df: BTreeMap<String, usize> = BTreeMap::new();
    for tokens in &token_lists {
        let unique: BTreeSet<&String> = tokens.iter().collect();
        for token in unique {
            *df.entry(token.clone()).or_insert(0) += 1;
        }
    }

    let n = state.docs.len() as f32;
    let vocab: Vec<String> = df.keys().cloned().collect();
    let idf: Vec<f32> = vocab
        .iter()
        .map(|t| ((1.0 + n) / (1.0 + df[t] as f32)).ln() + 1.0)
        .collect();

    let index_of: HashMap<&str, usize> = vocab
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();

    let mut vectors = Vec::with_capacity(token_lists.len());
    for tokens in &token_lists {
        let mut vec = vec![0.0f32; vocab.len()];
        for token in tokens {
            if let Some(&i) = index_of.get(token.as_str()) {
                vec[i] += 1.0;
            }
        }
        for (i, w) in vec.iter_mut().enumerate() {
            *w *= idf[i];
        }
        l2_normalize(&mut vec);
        vectors.push(vec);
    }

    state.vocab = vocab;
    state.idf = idf;
    state.vectors = Some(vectors);
}

fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
