//! dupsquash - bulk "find similar documents" lookups.
//!
//! Every input record (a literal string or one row of a delimited file)
//! becomes a more-like-this query against an Elasticsearch-compatible
//! backend. Each hit is written as one tab separated line: the input
//! fields, then the hit's index, id and score, then optionally the values
//! of the queried fields pulled out of the hit's source document.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dupsquash::{
//!     ElasticGateway, Pipeline, PipelineOptions, QuerySettings, Tuning,
//! };
//!
//! # async fn demo() -> dupsquash::Result<()> {
//! let gateway = Arc::new(ElasticGateway::new("localhost", 9200));
//! let settings = QuerySettings {
//!     collections: vec!["books".to_string()],
//!     fields: vec!["title".to_string()],
//!     extract: true,
//!     null_value: "<NULL>".to_string(),
//!     tuning: Tuning::default(),
//! };
//! let options = PipelineOptions::default();
//! let pipeline = Pipeline::new(gateway, settings, options)?;
//! let summary = pipeline.run_literal("moby dick", std::io::stdout()).await?;
//! eprintln!("{} hit(s)", summary.rows);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod collector;
pub mod columns;
pub mod config;
pub mod elastic;
pub mod error;
pub mod gateway;
pub mod job;
pub mod pipeline;
pub mod resolve;

pub use collector::OutputOrder;
pub use config::{Config, Input};
pub use elastic::ElasticGateway;
pub use error::{Error, Result};
pub use gateway::{Hit, MoreLikeThis, SearchGateway, Tuning};
pub use job::{Batch, Job, QuerySettings};
pub use pipeline::{Pipeline, PipelineOptions, Projection, Summary};
