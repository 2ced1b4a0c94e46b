//! Core data types shared across the resolution pipeline.
//!
//! These types flow between the index, the resolver, and the HTTP/CLI
//! frontends.

use serde::Serialize;

/// A ranked passage returned by [`DocumentIndex::search`](crate::index::DocumentIndex::search).
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Full text of the matched passage.
    pub text: String,
    /// Cosine similarity against the query, in `(floor, 1.0]`.
    pub score: f32,
}

/// Which resolution tier produced an answer.
///
/// Attached to every [`Resolution`] so frontends can report how a reply
/// was obtained (the `--explain` CLI flag and the `source` field of the
/// `/chat` response).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    /// Input was blank or too short; the fixed prompt-for-input reply.
    Prompt,
    /// Served from the response cache.
    Cached,
    /// A rule-table match (exact, substring, or fuzzy).
    Rule,
    /// Query contained no domain terms; the fixed out-of-scope reply.
    OutOfScope,
    /// A topic-classified canned answer.
    Topic,
    /// Reduced from the best similarity-search passage.
    Retrieval,
    /// Produced by the external generation collaborator.
    Generated,
    /// The fixed last-resort summary.
    Fallback,
}

impl AnswerSource {
    pub fn name(self) -> &'static str {
        match self {
            AnswerSource::Prompt => "prompt",
            AnswerSource::Cached => "cached",
            AnswerSource::Rule => "rule",
            AnswerSource::OutOfScope => "out_of_scope",
            AnswerSource::Topic => "topic",
            AnswerSource::Retrieval => "retrieval",
            AnswerSource::Generated => "generated",
            AnswerSource::Fallback => "fallback",
        }
    }
}

/// A resolved answer together with the tier that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub answer: String,
    pub source: AnswerSource,
}
