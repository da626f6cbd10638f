use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    error::{Error, Result},
    gateway::{Hit, MoreLikeThis, SearchGateway},
};

/// [`SearchGateway`] backed by an Elasticsearch-compatible `_search`
/// endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct ElasticGateway {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: Option<Map<String, Value>>,
}

impl From<RawHit> for Hit {
    fn from(raw: RawHit) -> Self {
        Hit {
            collection: raw.index,
            id: raw.id,
            score: raw.score.unwrap_or(0.0),
            source: raw.source,
        }
    }
}

impl ElasticGateway {
    pub fn new(host: &str, port: u16) -> Self {
        Self::with_base_url(format!("http://{host}:{port}"))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// `_search` URL scoped to `collections`, or to every index when empty.
    pub fn search_url(&self, collections: &[String]) -> String {
        if collections.is_empty() {
            format!("{}/_search", self.base_url)
        } else {
            format!("{}/{}/_search", self.base_url, collections.join(","))
        }
    }
}

#[async_trait]
impl SearchGateway for ElasticGateway {
    async fn search(
        &self,
        query: &MoreLikeThis,
        collections: &[String],
        limit: usize,
    ) -> Result<Vec<Hit>> {
        let url = self.search_url(collections);
        tracing::trace!(%url, like_text = %query.like_text, "searching");

        let response = self
            .client
            .post(&url)
            .json(&query.to_body(limit))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend(format!(
                "{url} returned {status}: {body}"
            )));
        }

        let parsed: SearchResponse =
            serde_json::from_slice(&response.bytes().await?)?;
        Ok(parsed
            .hits
            .hits
            .into_iter()
            .take(limit)
            .map(Hit::from)
            .collect())
    }
}
