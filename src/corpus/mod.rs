//! In-memory corpus store.
//!
//! The corpus is loaded once per process from a [`CorpusProvider`] and is
//! read-only afterwards. Each record is paired with its derived
//! [`SearchBlob`] and resolved year so the query pipeline never recomputes
//! them.
//!
//! # Usage
//!
//! ```rust,no_run
//! use article_explorer::corpus::Corpus;
//! use article_explorer::provider::jsonl::JsonlFileProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = JsonlFileProvider::new("out/merged_for_app.jsonl");
//! let corpus = Corpus::load(&provider).await?;
//! println!("{} articles", corpus.len());
//! # Ok(())
//! # }
//! ```

pub mod blob;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::ArticleRecord;
use crate::provider::CorpusProvider;

pub use blob::{fold_case, SearchBlob};

/// Suffix marking manual-only labels in tag pickers.
pub const MANUAL_TAG_SUFFIX: &str = " (Man.)";

/// Errors that can occur while loading the corpus.
///
/// Any of these aborts the load; a partial corpus is never returned.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source could not be read at all
    #[error("Corpus source '{source_name}' is unreadable: {source}")]
    Unreadable {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be decoded (1-based line or record number)
    #[error("Malformed record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// Two records share an id
    #[error("Duplicate record id: {0}")]
    DuplicateId(String),
}

/// Result type for corpus loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// A record together with the data derived from it at load time.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    record: ArticleRecord,
    blob: SearchBlob,
    year: Option<i32>,
}

impl CorpusEntry {
    /// Derives the search blob and resolved year for `record`.
    fn new(record: ArticleRecord) -> Self {
        let blob = SearchBlob::build(&record);
        let year = record.year();
        Self { record, blob, year }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn record(&self) -> &ArticleRecord {
        &self.record
    }

    pub fn blob(&self) -> &SearchBlob {
        &self.blob
    }

    /// Year resolved from metadata at load time.
    pub fn year(&self) -> Option<i32> {
        self.year
    }
}

/// One distinct tag label in the corpus and the evidence kinds seen for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCatalogEntry {
    pub label: String,
    pub finto: bool,
    pub manual: bool,
}

impl TagCatalogEntry {
    /// Label as shown in a picker; manual-only labels carry [`MANUAL_TAG_SUFFIX`].
    pub fn display_label(&self) -> String {
        if self.manual && !self.finto {
            format!("{}{}", self.label, MANUAL_TAG_SUFFIX)
        } else {
            self.label.clone()
        }
    }
}

/// Map a picker label back to the underlying tag label.
pub fn strip_manual_suffix(display: &str) -> &str {
    display.strip_suffix(MANUAL_TAG_SUFFIX).unwrap_or(display)
}

/// The loaded, immutable collection of articles.
#[derive(Debug, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
    by_id: HashMap<String, usize>,
    runs: BTreeSet<String>,
}

impl Corpus {
    /// Load every record from `provider`.
    ///
    /// # Errors
    /// Returns `LoadError` if the source is unreadable, a record is malformed,
    /// or two records share an id.
    pub async fn load<P>(provider: &P) -> LoadResult<Self>
    where
        P: CorpusProvider + ?Sized,
    {
        info!("Loading corpus from {}", provider.name());
        let records = provider.fetch_records().await?;
        let corpus = Self::from_records(records)?;
        info!(
            "Loaded {} records across {} clustering runs",
            corpus.len(),
            corpus.runs.len()
        );
        Ok(corpus)
    }

    /// Build a corpus from already decoded records, preserving their order.
    pub fn from_records(records: Vec<ArticleRecord>) -> LoadResult<Self> {
        let mut entries = Vec::with_capacity(records.len());
        let mut by_id = HashMap::with_capacity(records.len());
        let mut runs = BTreeSet::new();

        for (position, record) in records.into_iter().enumerate() {
            if record.id.trim().is_empty() {
                return Err(LoadError::Malformed {
                    line: position + 1,
                    reason: "record id is blank".to_string(),
                });
            }
            if by_id.insert(record.id.clone(), position).is_some() {
                return Err(LoadError::DuplicateId(record.id));
            }
            runs.extend(record.cluster_memberships.keys().cloned());
            entries.push(CorpusEntry::new(record));
        }

        debug!(
            "Indexed {} records, {} with a resolved year",
            entries.len(),
            entries.iter().filter(|e| e.year.is_some()).count()
        );

        Ok(Self {
            entries,
            by_id,
            runs,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in load order.
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn get(&self, position: usize) -> Option<&CorpusEntry> {
        self.entries.get(position)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&CorpusEntry> {
        self.by_id.get(id).map(|&position| &self.entries[position])
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Clustering run ids seen on any record, sorted.
    pub fn runs(&self) -> impl Iterator<Item = &str> {
        self.runs.iter().map(String::as_str)
    }

    pub fn has_run(&self, run: &str) -> bool {
        self.runs.contains(run)
    }

    /// Smallest and largest resolved year, if any record has one.
    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        let mut years = self.entries.iter().filter_map(CorpusEntry::year);
        let first = years.next()?;
        Some(years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
    }

    /// Every distinct tag label, sorted, with the evidence kinds seen for it.
    pub fn tag_catalog(&self) -> Vec<TagCatalogEntry> {
        let mut catalog: BTreeMap<&str, (bool, bool)> = BTreeMap::new();
        for entry in &self.entries {
            for tag in &entry.record.tags {
                catalog.entry(tag.label.as_str()).or_default().0 = true;
            }
            for label in &entry.record.manual_tags {
                catalog.entry(label.as_str()).or_default().1 = true;
            }
        }
        catalog
            .into_iter()
            .map(|(label, (finto, manual))| TagCatalogEntry {
                label: label.to_string(),
                finto,
                manual,
            })
            .collect()
    }
}
