//! Summary statistics over a filtered subset.
//!
//! Everything here is a pure function of the entries it is given, so the same
//! functions serve the per-query aggregates (year histogram, ranked tag
//! frequency) and the corpus-wide overview used by the `inspect` binary.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::corpus::CorpusEntry;

/// Record count per resolved year. Records without a year are not counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct YearHistogram(BTreeMap<i32, usize>);

impl YearHistogram {
    pub fn count(&self, year: i32) -> usize {
        self.0.get(&year).copied().unwrap_or(0)
    }

    /// Years in ascending order with their counts.
    pub fn iter(&self) -> impl Iterator<Item = (i32, usize)> + '_ {
        self.0.iter().map(|(&year, &count)| (year, count))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of records that contributed, i.e. those with a year.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn as_map(&self) -> &BTreeMap<i32, usize> {
        &self.0
    }
}

/// Number of records in a subset carrying a tag label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub label: String,
    pub count: usize,
}

/// Tag counts ranked by descending count, ties broken alphabetically.
///
/// Ranks are 1-based: rank 1 is the most frequent label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagFrequency(Vec<TagCount>);

impl TagFrequency {
    fn from_counts(counts: HashMap<&str, usize>) -> Self {
        let mut ranked: Vec<TagCount> = counts
            .into_iter()
            .map(|(label, count)| TagCount {
                label: label.to_string(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        Self(ranked)
    }

    pub fn ranked(&self) -> &[TagCount] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count(&self, label: &str) -> usize {
        self.0
            .iter()
            .find(|t| t.label == label)
            .map_or(0, |t| t.count)
    }

    /// 1-based rank of `label`, if it occurs in the subset.
    pub fn rank_of(&self, label: &str) -> Option<usize> {
        self.0.iter().position(|t| t.label == label).map(|i| i + 1)
    }

    /// Labels ranked `start_rank..=end_rank`, clamped to the available ranks.
    pub fn window(&self, start_rank: usize, end_rank: usize) -> &[TagCount] {
        let start = start_rank.max(1) - 1;
        let end = end_rank.min(self.0.len());
        if start >= end {
            return &[];
        }
        &self.0[start..end]
    }

    pub fn top(&self, n: usize) -> &[TagCount] {
        self.window(1, n)
    }
}

/// Both per-query aggregates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregates {
    pub years: YearHistogram,
    pub tags: TagFrequency,
}

/// Compute the year histogram and tag frequency of `subset`.
///
/// Each label counts at most once per record, whether it appears as a Finto
/// tag, a manual hit, or both.
pub fn aggregate<'a, I>(subset: I) -> Aggregates
where
    I: IntoIterator<Item = &'a CorpusEntry>,
{
    let mut years = BTreeMap::new();
    let mut tags: HashMap<&str, usize> = HashMap::new();

    for entry in subset {
        if let Some(year) = entry.year() {
            *years.entry(year).or_insert(0) += 1;
        }
        for label in entry.record().tag_labels() {
            *tags.entry(label).or_insert(0) += 1;
        }
    }

    Aggregates {
        years: YearHistogram(years),
        tags: TagFrequency::from_counts(tags),
    }
}

/// Size of one cluster within a clustering run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub label: i64,
    pub name: String,
    pub size: usize,
}

/// A tag's share of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagPrevalence {
    pub label: String,
    pub count: usize,
    /// `count / cluster size`
    pub prevalence: f64,
}

/// A cluster with its most common tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterProfile {
    pub cluster: ClusterSummary,
    pub top_tags: Vec<TagPrevalence>,
}

fn group_by_cluster<'a, I>(subset: I, run: &str) -> BTreeMap<i64, Vec<&'a CorpusEntry>>
where
    I: IntoIterator<Item = &'a CorpusEntry>,
{
    let mut groups: BTreeMap<i64, Vec<&'a CorpusEntry>> = BTreeMap::new();
    for entry in subset {
        if let Some(assignment) = entry.record().cluster(run) {
            groups.entry(assignment.label).or_default().push(entry);
        }
    }
    groups
}

fn summarize(run: &str, label: i64, members: &[&CorpusEntry]) -> ClusterSummary {
    let name = members
        .first()
        .and_then(|e| e.record().cluster(run))
        .map(|a| a.name.clone())
        .unwrap_or_else(|| crate::models::default_cluster_name(label));
    ClusterSummary {
        label,
        name,
        size: members.len(),
    }
}

fn by_size_then_label(a: &ClusterSummary, b: &ClusterSummary) -> std::cmp::Ordering {
    b.size.cmp(&a.size).then_with(|| a.label.cmp(&b.label))
}

/// Clusters of `run` present in `subset`, largest first.
///
/// Records without an assignment for `run` are skipped.
pub fn cluster_overview<'a, I>(subset: I, run: &str) -> Vec<ClusterSummary>
where
    I: IntoIterator<Item = &'a CorpusEntry>,
{
    let mut summaries: Vec<ClusterSummary> = group_by_cluster(subset, run)
        .iter()
        .map(|(&label, members)| summarize(run, label, members))
        .collect();
    summaries.sort_by(by_size_then_label);
    summaries
}

/// Clusters of `run`, largest first, each with its `top_n` tags.
pub fn cluster_tag_profiles<'a, I>(subset: I, run: &str, top_n: usize) -> Vec<ClusterProfile>
where
    I: IntoIterator<Item = &'a CorpusEntry>,
{
    let mut profiles: Vec<ClusterProfile> = group_by_cluster(subset, run)
        .iter()
        .map(|(&label, members)| {
            let cluster = summarize(run, label, members);
            let size = cluster.size as f64;
            let top_tags = aggregate(members.iter().copied())
                .tags
                .top(top_n)
                .iter()
                .map(|t| TagPrevalence {
                    label: t.label.clone(),
                    count: t.count,
                    prevalence: t.count as f64 / size,
                })
                .collect();
            ClusterProfile { cluster, top_tags }
        })
        .collect();
    profiles.sort_by(|a, b| by_size_then_label(&a.cluster, &b.cluster));
    profiles
}

/// Distribution of distinct tag labels per record: tag count -> record count.
pub fn tags_per_record<'a, I>(subset: I) -> BTreeMap<usize, usize>
where
    I: IntoIterator<Item = &'a CorpusEntry>,
{
    let mut distribution = BTreeMap::new();
    for entry in subset {
        *distribution
            .entry(entry.record().tag_labels().len())
            .or_insert(0) += 1;
    }
    distribution
}
