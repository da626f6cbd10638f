use std::sync::Arc;

use crate::{
    error::Result,
    gateway::{Hit, MoreLikeThis, SearchGateway, Tuning},
    resolve::resolve,
};

/// Settings shared by every job of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettings {
    pub collections: Vec<String>,
    pub fields: Vec<String>,
    /// Append one resolved value per field to each output row.
    pub extract: bool,
    pub null_value: String,
    pub tuning: Tuning,
}

/// One query to run: the text to match plus the input row it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Position of the originating row in the input, starting at zero.
    pub seq: u64,
    pub like_text: String,
    pub row: Vec<String>,
    pub settings: Arc<QuerySettings>,
}

/// All output rows produced by one job, in hit order.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub seq: u64,
    pub rows: Vec<Vec<String>>,
}

impl Job {
    pub fn query(&self) -> MoreLikeThis {
        MoreLikeThis::new(
            &self.settings.fields,
            &self.like_text,
            self.settings.tuning,
        )
    }

    /// Issue the job's single search call and turn every hit into a row.
    pub async fn execute<G>(&self, gateway: &G) -> Result<Batch>
    where
        G: SearchGateway + ?Sized,
    {
        let hits = gateway
            .search(
                &self.query(),
                &self.settings.collections,
                self.settings.tuning.size,
            )
            .await?;
        Ok(Batch {
            seq: self.seq,
            rows: hits.iter().map(|hit| self.output_row(hit)).collect(),
        })
    }

    /// The carried input row followed by the hit's collection, id, score
    /// and, when extraction is on, one value per field.
    pub fn output_row(&self, hit: &Hit) -> Vec<String> {
        let settings = &self.settings;
        let extra = if settings.extract {
            settings.fields.len()
        } else {
            0
        };
        let mut out = Vec::with_capacity(self.row.len() + 3 + extra);
        out.extend(self.row.iter().cloned());
        out.push(hit.collection.clone());
        out.push(hit.id.clone());
        out.push(hit.formatted_score());

        if settings.extract {
            for field in &settings.fields {
                let value = hit
                    .source
                    .as_ref()
                    .and_then(|source| resolve(field, source));
                out.push(match value {
                    Some(scalar) => scalar.to_string(),
                    None => settings.null_value.clone(),
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn settings(extract: bool) -> Arc<QuerySettings> {
        Arc::new(QuerySettings {
            collections: vec!["docs".into()],
            fields: vec!["title".into(), "meta.year".into()],
            extract,
            null_value: "<NULL>".into(),
            tuning: Tuning::default(),
        })
    }

    fn job(extract: bool) -> Job {
        Job {
            seq: 0,
            like_text: "X Z".into(),
            row: vec!["X".into(), "Y".into(), "Z".into()],
            settings: settings(extract),
        }
    }

    fn hit(source: Option<serde_json::Value>) -> Hit {
        Hit {
            collection: "docs".into(),
            id: "42".into(),
            score: 0.98712,
            source: source.and_then(|v| v.as_object().cloned()),
        }
    }

    #[test]
    fn row_without_extraction_appends_three_fields() {
        let out = job(false).output_row(&hit(None));
        assert_eq!(out, vec!["X", "Y", "Z", "docs", "42", "0.987"]);
    }

    #[test]
    fn row_with_extraction_appends_values_and_null() {
        let source = json!({"title": "Moby Dick", "meta": {"other": 1}});
        let out = job(true).output_row(&hit(Some(source)));
        assert_eq!(
            out,
            vec!["X", "Y", "Z", "docs", "42", "0.987", "Moby Dick", "<NULL>"]
        );
    }

    #[test]
    fn extraction_without_source_fills_nulls() {
        let out = job(true).output_row(&hit(None));
        assert_eq!(out.len(), 3 + 3 + 2);
        assert_eq!(&out[6..], ["<NULL>", "<NULL>"]);
    }

    #[test]
    fn numeric_values_are_rendered() {
        let source = json!({"title": "t", "meta": {"year": 1851}});
        let out = job(true).output_row(&hit(Some(source)));
        assert_eq!(out.last().map(String::as_str), Some("1851"));
    }

    #[test]
    fn query_carries_tuning() {
        let q = job(false).query();
        assert_eq!(q.like_text, "X Z");
        assert_eq!(q.fields, vec!["title", "meta.year"]);
        assert_eq!(q.min_term_freq, 1);
        assert_eq!(q.max_query_terms, 25);
    }
}
