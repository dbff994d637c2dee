//! Corpus provider module.
//!
//! The `CorpusProvider` trait abstracts where article records come from, so the
//! corpus store does not care whether they are read from the merged JSONL file
//! or assembled in memory.

use async_trait::async_trait;

use crate::corpus::LoadResult;
use crate::models::ArticleRecord;

pub mod jsonl;

/// Trait for sourcing article records.
///
/// # Design Notes
///
/// - Providers decode records but do not deduplicate them; the corpus store
///   rejects duplicate ids
/// - A provider either returns every record or an error, never a prefix
#[async_trait]
pub trait CorpusProvider: Send + Sync {
    /// Fetch all records, in source order.
    ///
    /// # Errors
    /// Returns `LoadError` if the source cannot be read or a record cannot be
    /// decoded
    async fn fetch_records(&self) -> LoadResult<Vec<ArticleRecord>>;

    /// Human-readable name of this provider, used in logs and errors.
    fn name(&self) -> &str;
}
