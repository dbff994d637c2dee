//! Query processing module.
//!
//! A query runs as a strict pipeline over the loaded corpus:
//!
//! 1. Structural filters (cluster, year range, tags) via [`filter`]
//! 2. Free-text substring search via [`text`]
//! 3. Ordering, with best-match scoring when requested via [`sort`], [`score`]
//!
//! The aggregates of [`crate::aggregate`] are computed over the same final
//! subset, independent of the ordering and of any result limit.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use article_explorer::corpus::Corpus;
//! use article_explorer::query::{
//!     ArticleQuery, CorpusSearchEngine, FilterCriteria, OrderKey, SearchEngine,
//! };
//!
//! # fn example(corpus: Corpus) {
//! let engine = CorpusSearchEngine::new(Arc::new(corpus));
//! let query = ArticleQuery::new("belt and road")
//!     .with_criteria(FilterCriteria::default().with_years(Some(2015), Some(2020)))
//!     .with_order(OrderKey::OldestFirst);
//!
//! let outcome = engine.search(&query);
//! println!("{} / {} articles", outcome.matched, outcome.total);
//! # }
//! ```

pub mod filter;
pub mod score;
pub mod sort;
pub mod text;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::aggregate::{aggregate, Aggregates};
use crate::corpus::Corpus;

pub use filter::ResolvedFilter;
pub use sort::ArticleHit;
pub use text::TextQuery;

/// Caller misuse detected while resolving a query.
///
/// None of these abort the query: the offending criterion is replaced by a
/// default and the error is reported in [`QueryOutcome::warnings`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The run id does not occur anywhere in the corpus
    #[error("Unknown clustering run '{0}'; cluster filter ignored")]
    UnknownRun(String),

    /// A cluster was selected but no run was given
    #[error("Cluster '{0}' selected without a clustering run; cluster filter ignored")]
    ClusterWithoutRun(String),

    /// `year_min` is greater than `year_max`
    #[error("Year range {min}-{max} is inverted; year filter ignored")]
    InvertedYearRange { min: i32, max: i32 },

    /// Best-match ordering was requested with no tags selected
    #[error("Best-match ordering needs at least one selected tag; ordering by {fallback}")]
    BestMatchWithoutTags { fallback: OrderKey },
}

/// Which clusters of the selected run to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterSelection {
    /// No cluster filtering
    #[default]
    All,

    /// Records whose label in the run equals this one
    Label(i64),

    /// Records whose cluster name in the run equals this one
    Name(String),
}

impl ClusterSelection {
    /// Interpret user input: `all`/`(All)`, an integer label, or a cluster name.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty()
            || input.eq_ignore_ascii_case("all")
            || input.eq_ignore_ascii_case("(all)")
        {
            return ClusterSelection::All;
        }
        match input.parse::<i64>() {
            Ok(label) => ClusterSelection::Label(label),
            Err(_) => ClusterSelection::Name(input.to_string()),
        }
    }
}

impl fmt::Display for ClusterSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterSelection::All => write!(f, "all"),
            ClusterSelection::Label(label) => write!(f, "{}", label),
            ClusterSelection::Name(name) => write!(f, "{}", name),
        }
    }
}

/// How multiple selected tags combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMode {
    /// Every selected tag must be present
    #[default]
    And,

    /// At least one selected tag must be present
    Or,
}

impl fmt::Display for TagMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagMode::And => write!(f, "AND"),
            TagMode::Or => write!(f, "OR"),
        }
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKey {
    /// Year descending, missing years last
    #[default]
    NewestFirst,

    /// Year ascending, missing years last
    OldestFirst,

    /// Tag score descending, then newest first
    BestMatch,
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKey::NewestFirst => write!(f, "newest first"),
            OrderKey::OldestFirst => write!(f, "oldest first"),
            OrderKey::BestMatch => write!(f, "best match"),
        }
    }
}

/// Inclusive publication year range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    /// Start year (inclusive)
    pub start: i32,

    /// End year (inclusive)
    pub end: i32,
}

impl YearRange {
    /// Creates a new year range.
    ///
    /// # Arguments
    /// * `start` - First year (inclusive)
    /// * `end` - Last year (inclusive)
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Check if a year falls within this range.
    pub fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }
}

/// Structural filter criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Clustering run the cluster selection refers to
    pub run: Option<String>,

    pub cluster: ClusterSelection,

    /// Lower year bound (inclusive), open when unset
    pub year_min: Option<i32>,

    /// Upper year bound (inclusive), open when unset
    pub year_max: Option<i32>,

    /// Selected tag labels, matched exactly
    pub tags: BTreeSet<String>,

    pub tag_mode: TagMode,
}

impl FilterCriteria {
    pub fn with_run(mut self, run: impl Into<String>) -> Self {
        self.run = Some(run.into());
        self
    }

    pub fn with_cluster(mut self, cluster: ClusterSelection) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_years(mut self, year_min: Option<i32>, year_max: Option<i32>) -> Self {
        self.year_min = year_min;
        self.year_max = year_max;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_tag_mode(mut self, tag_mode: TagMode) -> Self {
        self.tag_mode = tag_mode;
        self
    }
}

/// Everything the presentation layer sends for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleQuery {
    pub criteria: FilterCriteria,

    /// Free text; blank means no text filtering
    pub text: String,

    pub order: OrderKey,

    /// Maximum number of hits to return; aggregates always cover every match
    pub limit: Option<usize>,
}

impl ArticleQuery {
    /// Query for `text` with no criteria, newest first and no limit.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_criteria(mut self, criteria: FilterCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn with_order(mut self, order: OrderKey) -> Self {
        self.order = order;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Result of one query.
#[derive(Debug, Clone)]
pub struct QueryOutcome<'a> {
    /// Ordered hits, truncated to the query limit
    pub hits: Vec<ArticleHit<'a>>,

    /// Number of records that passed every stage
    pub matched: usize,

    /// Number of records in the corpus
    pub total: usize,

    /// Aggregates over all `matched` records
    pub aggregates: Aggregates,

    /// Ordering actually applied
    pub order: OrderKey,

    /// Fallbacks taken while resolving the query
    pub warnings: Vec<FilterError>,
}

/// Trait for query engines.
pub trait SearchEngine: Send + Sync {
    /// Run `query` to completion.
    fn search(&self, query: &ArticleQuery) -> QueryOutcome<'_>;
}

/// Engine over a shared, immutable corpus.
#[derive(Debug, Clone)]
pub struct CorpusSearchEngine {
    corpus: Arc<Corpus>,
}

impl CorpusSearchEngine {
    /// Creates an engine sharing `corpus`.
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self { corpus }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }
}

impl SearchEngine for CorpusSearchEngine {
    fn search(&self, query: &ArticleQuery) -> QueryOutcome<'_> {
        let corpus = self.corpus.as_ref();

        // 1. Structural filters
        let (resolved, mut warnings) = ResolvedFilter::resolve(&query.criteria, corpus);
        let subset = filter::filter(corpus.entries(), &resolved);

        // 2. Free text
        let subset = text::search(subset, &TextQuery::new(&query.text));

        // 3. Ordering
        let order = if query.order == OrderKey::BestMatch && resolved.tags().is_empty() {
            let fallback = OrderKey::default();
            warnings.push(FilterError::BestMatchWithoutTags { fallback });
            fallback
        } else {
            query.order
        };

        let aggregates = aggregate(subset.iter().copied());
        let mut hits = sort::sort(&subset, order, resolved.tags());
        let matched = hits.len();
        if let Some(limit) = query.limit {
            hits.truncate(limit);
        }

        for warning in &warnings {
            warn!("{}", warning);
        }
        debug!(
            "Query matched {} of {} records, returning {} ordered by {}",
            matched,
            corpus.len(),
            hits.len(),
            order
        );

        QueryOutcome {
            hits,
            matched,
            total: corpus.len(),
            aggregates,
            order,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusEntry;
    use crate::models::{ArticleRecord, ClusterAssignment, Translation, NOISE_CLUSTER_NAME};
    use proptest::prelude::*;
    use serde_json::json;

    fn record(id: &str, year: Option<i32>) -> ArticleRecord {
        let r = ArticleRecord::new(id, format!("Title {}", id), "");
        match year {
            Some(y) => r.with_metadata(json!({"article": {"year": y}})),
            None => r,
        }
    }

    fn engine(records: Vec<ArticleRecord>) -> CorpusSearchEngine {
        CorpusSearchEngine::new(Arc::new(Corpus::from_records(records).unwrap()))
    }

    fn hit_ids(outcome: &QueryOutcome<'_>) -> Vec<String> {
        outcome.hits.iter().map(|h| h.id().to_string()).collect()
    }

    #[test]
    fn test_cluster_selection_parse() {
        assert_eq!(ClusterSelection::parse("(All)"), ClusterSelection::All);
        assert_eq!(ClusterSelection::parse(" all "), ClusterSelection::All);
        assert_eq!(ClusterSelection::parse("-1"), ClusterSelection::Label(-1));
        assert_eq!(
            ClusterSelection::parse("Noise / Unclustered"),
            ClusterSelection::Name(NOISE_CLUSTER_NAME.to_string())
        );
    }

    #[test]
    fn test_year_range() {
        let range = YearRange::new(2020, 2023);
        assert!(range.contains(2020));
        assert!(range.contains(2022));
        assert!(range.contains(2023));
        assert!(!range.contains(2019));
        assert!(!range.contains(2024));
    }

    #[test]
    fn test_scenario_year_window_with_missing_year() {
        let engine = engine(vec![
            record("y2019", Some(2019)),
            record("missing", None),
            record("y2021", Some(2021)),
        ]);
        let query = ArticleQuery::default()
            .with_criteria(FilterCriteria::default().with_years(Some(2020), Some(2022)));
        let outcome = engine.search(&query);

        assert_eq!(hit_ids(&outcome), vec!["y2021", "missing"]);
        assert_eq!(outcome.aggregates.years.total(), 1);
        assert_eq!(outcome.aggregates.years.count(2021), 1);
    }

    #[test]
    fn test_scenario_dual_evidence() {
        let engine = engine(vec![
            record("r", Some(2020))
                .with_finto_tag("NATO", 0.8)
                .with_manual_tag("NATO"),
            record("other", Some(2020)),
        ]);
        let query = ArticleQuery::default()
            .with_criteria(FilterCriteria::default().with_tags(["NATO"]))
            .with_order(OrderKey::BestMatch);
        let outcome = engine.search(&query);

        assert_eq!(hit_ids(&outcome), vec!["r"]);
        assert_eq!(outcome.hits[0].score, Some(0.95));
        assert_eq!(outcome.aggregates.tags.count("NATO"), 1);
    }

    #[test]
    fn test_scenario_noise_cluster_by_name() {
        let engine = engine(vec![
            record("n1", None).with_cluster("leaf_0.55", ClusterAssignment::unnamed(-1)),
            record("c", None).with_cluster("leaf_0.55", ClusterAssignment::unnamed(4)),
            record("n2", None).with_cluster("leaf_0.55", ClusterAssignment::unnamed(-1)),
        ]);
        let criteria = FilterCriteria::default()
            .with_run("leaf_0.55")
            .with_cluster(ClusterSelection::parse(NOISE_CLUSTER_NAME));
        let outcome = engine.search(&ArticleQuery::default().with_criteria(criteria));

        assert_eq!(hit_ids(&outcome), vec!["n1", "n2"]);
    }

    #[test]
    fn test_scenario_translated_abstract_search() {
        let engine = engine(vec![
            ArticleRecord::new("translated", "量子研究", "原文摘要").with_translation(
                Translation::new(None, Some("Advances in quantum sensing".to_string())),
            ),
            ArticleRecord::new("untranslated", "其他", "无关"),
        ]);
        let outcome = engine.search(&ArticleQuery::new("quantum"));
        assert_eq!(hit_ids(&outcome), vec!["translated"]);
    }

    #[test]
    fn test_scenario_tag_frequency_window() {
        let engine = engine(vec![
            record("1", None).with_finto_tag("AI", 0.4),
            record("2", None).with_finto_tag("AI", 0.4).with_manual_tag("ML"),
            record("3", None).with_manual_tag("AI"),
            record("4", None).with_finto_tag("ML", 0.9),
            record("5", None),
        ]);
        let outcome = engine.search(&ArticleQuery::default());
        let tags = &outcome.aggregates.tags;

        assert!(tags.rank_of("AI") < tags.rank_of("ML"));
        let window = tags.window(1, 1);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].label, "AI");
    }

    #[test]
    fn test_best_match_without_tags_falls_back() {
        let engine = engine(vec![record("old", Some(2001)), record("new", Some(2020))]);
        let outcome = engine.search(&ArticleQuery::default().with_order(OrderKey::BestMatch));

        assert_eq!(outcome.order, OrderKey::NewestFirst);
        assert_eq!(hit_ids(&outcome), vec!["new", "old"]);
        assert_eq!(
            outcome.warnings,
            vec![FilterError::BestMatchWithoutTags {
                fallback: OrderKey::NewestFirst
            }]
        );
    }

    #[test]
    fn test_limit_truncates_hits_not_aggregates() {
        let engine = engine(vec![
            record("a", Some(2020)),
            record("b", Some(2021)),
            record("c", Some(2022)),
        ]);
        let outcome = engine.search(&ArticleQuery::default().with_limit(1));

        assert_eq!(hit_ids(&outcome), vec!["c"]);
        assert_eq!(outcome.matched, 3);
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.aggregates.years.total(), 3);
    }

    #[test]
    fn test_stages_are_conjunctive() {
        let engine = engine(vec![
            record("all", Some(2020))
                .with_finto_tag("AI", 0.5)
                .with_cluster("eom", ClusterAssignment::unnamed(1)),
            record("wrong_cluster", Some(2020))
                .with_finto_tag("AI", 0.5)
                .with_cluster("eom", ClusterAssignment::unnamed(2)),
            record("wrong_year", Some(1999))
                .with_finto_tag("AI", 0.5)
                .with_cluster("eom", ClusterAssignment::unnamed(1)),
            record("no_tag", Some(2020)).with_cluster("eom", ClusterAssignment::unnamed(1)),
        ]);
        let criteria = FilterCriteria::default()
            .with_run("eom")
            .with_cluster(ClusterSelection::Label(1))
            .with_years(Some(2010), Some(2030))
            .with_tags(["AI"]);
        let outcome = engine.search(&ArticleQuery::new("title").with_criteria(criteria));
        assert_eq!(hit_ids(&outcome), vec!["all"]);
    }

    // Property tests over small generated corpora.

    const LABELS: [&str; 4] = ["AI", "ML", "NATO", "BRICS"];

    fn arb_record(id: usize) -> impl Strategy<Value = ArticleRecord> {
        (
            proptest::option::of(2000i32..2025),
            proptest::collection::vec((0usize..4, 0.0f64..1.0), 0..4),
            proptest::collection::vec(0usize..4, 0..3),
            proptest::option::of(-1i64..3),
        )
            .prop_map(move |(year, finto, manual, cluster)| {
                let mut r = record(&format!("id{:03}", id), year);
                for (label, score) in finto {
                    r = r.with_finto_tag(LABELS[label], score);
                }
                for label in manual {
                    r = r.with_manual_tag(LABELS[label]);
                }
                if let Some(label) = cluster {
                    r = r.with_cluster("eom", ClusterAssignment::unnamed(label));
                }
                r
            })
    }

    fn arb_corpus() -> impl Strategy<Value = Corpus> {
        (0usize..12)
            .prop_flat_map(|n| (0..n).map(arb_record).collect::<Vec<_>>())
            .prop_map(|records| Corpus::from_records(records).unwrap())
    }

    fn arb_criteria() -> impl Strategy<Value = FilterCriteria> {
        (
            proptest::option::of(-1i64..3),
            proptest::option::of(2000i32..2025),
            proptest::option::of(2000i32..2025),
            proptest::collection::btree_set(0usize..4, 0..3),
            any::<bool>(),
        )
            .prop_map(|(cluster, min, max, tags, or_mode)| {
                let mut criteria = FilterCriteria::default()
                    .with_years(min, max)
                    .with_tags(tags.into_iter().map(|i| LABELS[i]))
                    .with_tag_mode(if or_mode { TagMode::Or } else { TagMode::And });
                if let Some(label) = cluster {
                    criteria = criteria
                        .with_run("eom")
                        .with_cluster(ClusterSelection::Label(label));
                }
                criteria
            })
    }

    proptest! {
        #[test]
        fn prop_filter_is_idempotent(corpus in arb_corpus(), criteria in arb_criteria()) {
            let (resolved, _) = ResolvedFilter::resolve(&criteria, &corpus);
            let once = filter::filter(corpus.entries(), &resolved);
            let twice = filter::filter(once.iter().copied(), &resolved);
            let once_ids: Vec<&str> = once.iter().map(|e| e.id()).collect();
            let twice_ids: Vec<&str> = twice.iter().map(|e| e.id()).collect();
            prop_assert_eq!(once_ids, twice_ids);
        }

        #[test]
        fn prop_and_is_subset_of_or(corpus in arb_corpus(), criteria in arb_criteria()) {
            let and = criteria.clone().with_tag_mode(TagMode::And);
            let or = criteria.with_tag_mode(TagMode::Or);
            let (and_filter, _) = ResolvedFilter::resolve(&and, &corpus);
            let (or_filter, _) = ResolvedFilter::resolve(&or, &corpus);
            let or_ids: BTreeSet<&str> = filter::filter(corpus.entries(), &or_filter)
                .iter()
                .map(|e| e.id())
                .collect();
            for entry in filter::filter(corpus.entries(), &and_filter) {
                prop_assert!(or_ids.contains(entry.id()));
            }
        }

        #[test]
        fn prop_sort_is_total(corpus in arb_corpus(), criteria in arb_criteria()) {
            let subset: Vec<&CorpusEntry> = corpus.entries().iter().collect();
            for key in [OrderKey::NewestFirst, OrderKey::OldestFirst, OrderKey::BestMatch] {
                let hits = sort::sort(&subset, key, &criteria.tags);
                for pair in hits.windows(2) {
                    prop_assert_eq!(
                        sort::compare(&pair[0], &pair[1], key),
                        std::cmp::Ordering::Less
                    );
                }
            }
        }

        #[test]
        fn prop_missing_year_always_passes_year_filter(
            corpus in arb_corpus(),
            min in 1900i32..2100,
            span in 0i32..50,
        ) {
            let criteria = FilterCriteria::default().with_years(Some(min), Some(min + span));
            let (resolved, _) = ResolvedFilter::resolve(&criteria, &corpus);
            let kept: BTreeSet<&str> = filter::filter(corpus.entries(), &resolved)
                .iter()
                .map(|e| e.id())
                .collect();
            for entry in corpus.entries().iter().filter(|e| e.year().is_none()) {
                prop_assert!(kept.contains(entry.id()));
            }
        }

        #[test]
        fn prop_score_is_monotonic(corpus in arb_corpus(), extra in 0usize..4) {
            for entry in corpus.entries() {
                let base: BTreeSet<String> = ["AI".to_string()].into_iter().collect();
                let mut grown = base.clone();
                grown.insert(LABELS[extra].to_string());
                prop_assert!(
                    score::score(entry.record(), &grown) >= score::score(entry.record(), &base)
                );
            }
        }
    }
}
