use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

/// Tuning knobs passed through to the backend's more-like-this query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    pub min_term_freq: u32,
    pub max_query_terms: u32,
    pub size: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            min_term_freq: 1,
            max_query_terms: 25,
            size: 5,
        }
    }
}

/// A similarity query: find documents whose `fields` resemble `like_text`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoreLikeThis {
    pub fields: Vec<String>,
    pub like_text: String,
    pub min_term_freq: u32,
    pub max_query_terms: u32,
}

impl MoreLikeThis {
    pub fn new(fields: &[String], like_text: &str, tuning: Tuning) -> Self {
        Self {
            fields: fields.to_vec(),
            like_text: like_text.to_string(),
            min_term_freq: tuning.min_term_freq,
            max_query_terms: tuning.max_query_terms,
        }
    }

    /// The request body for a `_search` call returning at most `size` hits.
    pub fn to_body(&self, size: usize) -> Value {
        serde_json::json!({
            "query": { "more_like_this": self },
            "size": size,
        })
    }
}

/// One match returned by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub collection: String,
    pub id: String,
    pub score: f64,
    pub source: Option<Map<String, Value>>,
}

impl Hit {
    /// The score as written to output: three decimal places.
    pub fn formatted_score(&self) -> String {
        format!("{:.3}", self.score)
    }
}

/// The only capability the pipeline needs from a search backend.
///
/// Implementations are shared by all workers and must tolerate
/// concurrent calls. Hits come back in the backend's relevance order and
/// never exceed `limit`.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    async fn search(
        &self,
        query: &MoreLikeThis,
        collections: &[String],
        limit: usize,
    ) -> Result<Vec<Hit>>;
}
