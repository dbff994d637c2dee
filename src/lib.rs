//! Article Explorer - an in-memory query engine for a tagged, clustered
//! article corpus.
//!
//! The corpus is a JSONL file of articles, each carrying Finto/YSO tags,
//! manual keyword hits, an optional English translation and cluster
//! memberships from several clustering runs. It is loaded once and then
//! queried interactively.
//!
//! # Architecture
//!
//! - **models**: Core data structures (ArticleRecord, FintoTag, ClusterAssignment, etc.)
//! - **provider**: Corpus sources (JSONL file)
//! - **corpus**: The loaded, read-only corpus with derived search blobs
//! - **query**: Filtering, text search, scoring and ordering
//! - **aggregate**: Year histograms, tag frequencies and cluster overviews
//! - **config**: Explorer settings
//! - **api**: Request/response shapes for front ends
//!
//! # Workflow
//!
//! 1. Load records from a [`CorpusProvider`] into a [`Corpus`]
//! 2. Apply cluster, year and tag filters
//! 3. Keep records whose search blob contains the free-text query
//! 4. Order by year or by best match against the selected tags
//! 5. Aggregate years and tags over the same subset
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use article_explorer::{
//!     corpus::Corpus,
//!     provider::jsonl::JsonlFileProvider,
//!     query::{ArticleQuery, CorpusSearchEngine, FilterCriteria, SearchEngine},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = JsonlFileProvider::new("out/merged_for_app.jsonl");
//!     let corpus = Corpus::load(&provider).await?;
//!     let engine = CorpusSearchEngine::new(Arc::new(corpus));
//!
//!     let query = ArticleQuery::new("quantum")
//!         .with_criteria(FilterCriteria::default().with_tags(["AI"]));
//!     let outcome = engine.search(&query);
//!
//!     for hit in &outcome.hits {
//!         println!("{}: {}", hit.id(), hit.entry.record().display_title());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod api;
pub mod config;
pub mod corpus;
pub mod models;
pub mod provider;
pub mod query;

// Re-export commonly used types at the crate root
pub use config::ExplorerConfig;
pub use corpus::{Corpus, CorpusEntry, LoadError};
pub use models::{ArticleRecord, ClusterAssignment, FintoTag, TagEvidence, Translation};
pub use provider::CorpusProvider;
pub use query::{ArticleQuery, CorpusSearchEngine, FilterCriteria, OrderKey, SearchEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
