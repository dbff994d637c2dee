//! Request and response shapes for the presentation layer.
//!
//! An [`ExploreRequest`] is what a front end sends (JSON in); an
//! [`ExploreResponse`] is what it gets back (JSON out). Neither type carries
//! engine internals, so the wire format stays stable while the engine evolves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ExplorerConfig;
use crate::query::{
    ArticleHit, ArticleQuery, ClusterSelection, FilterCriteria, OrderKey, QueryOutcome, TagMode,
};

/// A cluster reference as sent over the wire: a label or a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClusterRef {
    Label(i64),
    Name(String),
}

impl From<ClusterRef> for ClusterSelection {
    fn from(cluster: ClusterRef) -> Self {
        match cluster {
            ClusterRef::Label(label) => ClusterSelection::Label(label),
            ClusterRef::Name(name) => ClusterSelection::parse(&name),
        }
    }
}

/// Request payload for one exploration query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreRequest {
    /// Free-text query; empty means no text filtering
    pub query: String,

    /// Clustering run the cluster refers to
    pub run: Option<String>,

    pub cluster: Option<ClusterRef>,

    /// Inclusive [start_year, end_year]; takes precedence over `year_min`/`year_max`
    pub year_range: Option<[i32; 2]>,

    pub year_min: Option<i32>,

    pub year_max: Option<i32>,

    pub tags: Vec<String>,

    pub tag_mode: TagMode,

    /// Ordering; the configured default when omitted
    pub order: Option<OrderKey>,

    /// Maximum number of articles; the configured maximum when omitted
    pub limit: Option<usize>,

    /// 1-based inclusive tag rank window for `top_tags`
    pub tag_window: Option<[usize; 2]>,
}

impl ExploreRequest {
    /// Convert to an engine query, filling gaps from `config`.
    pub fn to_query(&self, config: &ExplorerConfig) -> ArticleQuery {
        let (year_min, year_max) = match self.year_range {
            Some([start, end]) => (Some(start), Some(end)),
            None => (self.year_min, self.year_max),
        };

        let mut criteria = FilterCriteria::default()
            .with_years(year_min, year_max)
            .with_tags(self.tags.iter().cloned())
            .with_tag_mode(self.tag_mode);
        if let Some(run) = &self.run {
            criteria = criteria.with_run(run.clone());
        }
        if let Some(cluster) = &self.cluster {
            criteria = criteria.with_cluster(cluster.clone().into());
        }

        ArticleQuery::new(self.query.clone())
            .with_criteria(criteria)
            .with_order(self.order.unwrap_or(config.default_order))
            .with_limit(self.limit.unwrap_or(config.max_results))
    }

    /// Requested tag window, or the configured default.
    pub fn tag_window(&self, config: &ExplorerConfig) -> (usize, usize) {
        match self.tag_window {
            Some([start, end]) => (start, end.min(config.tag_rank_limit)),
            None => config.tag_window(),
        }
    }
}

/// One article in a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDto {
    pub id: String,

    /// Translated title when available, else the original
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_title: Option<String>,

    pub year: Option<i32>,

    /// Cluster name under the requested run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,

    /// Best-match score, present only for best-match ordering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Distinct tag labels, sorted
    pub tags: Vec<String>,
}

impl ArticleDto {
    pub fn from_hit(hit: &ArticleHit<'_>, run: Option<&str>) -> Self {
        let record = hit.entry.record();
        Self {
            id: record.id.clone(),
            title: record.display_title().to_string(),
            translated_title: record.translated_title().map(str::to_string),
            year: hit.year(),
            cluster: run
                .and_then(|run| record.cluster(run))
                .map(|assignment| assignment.name.clone()),
            score: hit.score,
            tags: record.tag_labels().into_iter().map(str::to_string).collect(),
        }
    }
}

/// A ranked tag in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedTagDto {
    pub rank: usize,
    pub label: String,
    pub count: usize,
}

/// Response payload for one exploration query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploreResponse {
    /// Articles in result order
    pub articles: Vec<ArticleDto>,

    /// Number of articles matching the query before the limit
    pub matched: usize,

    /// Number of articles in the corpus
    pub total: usize,

    /// Ordering actually applied
    pub order: OrderKey,

    /// Publication year → number of matching articles
    pub year_histogram: BTreeMap<i32, usize>,

    /// Tags in the requested rank window
    pub top_tags: Vec<RankedTagDto>,

    /// Fallbacks applied while resolving the request
    pub warnings: Vec<String>,
}

impl ExploreResponse {
    pub fn from_outcome(
        outcome: &QueryOutcome<'_>,
        run: Option<&str>,
        tag_window: (usize, usize),
    ) -> Self {
        let (start, end) = tag_window;
        let first_rank = start.max(1);
        let top_tags = outcome
            .aggregates
            .tags
            .window(start, end)
            .iter()
            .enumerate()
            .map(|(offset, tag)| RankedTagDto {
                rank: first_rank + offset,
                label: tag.label.clone(),
                count: tag.count,
            })
            .collect();

        Self {
            articles: outcome
                .hits
                .iter()
                .map(|hit| ArticleDto::from_hit(hit, run))
                .collect(),
            matched: outcome.matched,
            total: outcome.total,
            order: outcome.order,
            year_histogram: outcome.aggregates.years.as_map().clone(),
            top_tags,
            warnings: outcome.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}
