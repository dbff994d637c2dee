//! Structural filters: cluster membership, year range, tag set.

use std::collections::BTreeSet;

use super::{ClusterSelection, FilterCriteria, FilterError, TagMode, YearRange};
use crate::corpus::{Corpus, CorpusEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClusterPredicate {
    Label { run: String, label: i64 },
    Name { run: String, name: String },
}

/// Filter criteria validated against a corpus.
///
/// Misused criteria are dropped during resolution and reported as
/// [`FilterError`]s; what remains is always applicable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFilter {
    cluster: Option<ClusterPredicate>,
    years: Option<YearRange>,
    tags: BTreeSet<String>,
    tag_mode: TagMode,
}

impl ResolvedFilter {
    /// Validate `criteria` against `corpus`, collecting the fallbacks taken.
    pub fn resolve(criteria: &FilterCriteria, corpus: &Corpus) -> (Self, Vec<FilterError>) {
        let mut warnings = Vec::new();

        let run = match criteria.run.as_deref() {
            Some(run) if !corpus.has_run(run) => {
                warnings.push(FilterError::UnknownRun(run.to_string()));
                None
            }
            other => other,
        };

        let cluster = match (&criteria.cluster, run) {
            (ClusterSelection::All, _) => None,
            (selection, None) => {
                // An unknown run already produced a warning above.
                if criteria.run.is_none() {
                    warnings.push(FilterError::ClusterWithoutRun(selection.to_string()));
                }
                None
            }
            (ClusterSelection::Label(label), Some(run)) => Some(ClusterPredicate::Label {
                run: run.to_string(),
                label: *label,
            }),
            (ClusterSelection::Name(name), Some(run)) => Some(ClusterPredicate::Name {
                run: run.to_string(),
                name: name.clone(),
            }),
        };

        let years = match (criteria.year_min, criteria.year_max) {
            (None, None) => None,
            (Some(min), Some(max)) if min > max => {
                warnings.push(FilterError::InvertedYearRange { min, max });
                None
            }
            (min, max) => Some(YearRange::new(
                min.unwrap_or(i32::MIN),
                max.unwrap_or(i32::MAX),
            )),
        };

        let filter = Self {
            cluster,
            years,
            tags: criteria.tags.clone(),
            tag_mode: criteria.tag_mode,
        };
        (filter, warnings)
    }

    /// Selected tag labels.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// True if `entry` passes the cluster, year and tag predicates.
    pub fn matches(&self, entry: &CorpusEntry) -> bool {
        self.matches_cluster(entry) && self.matches_year(entry) && self.matches_tags(entry)
    }

    fn matches_cluster(&self, entry: &CorpusEntry) -> bool {
        match &self.cluster {
            None => true,
            Some(ClusterPredicate::Label { run, label }) => entry
                .record()
                .cluster(run)
                .map_or(false, |a| a.label == *label),
            Some(ClusterPredicate::Name { run, name }) => entry
                .record()
                .cluster(run)
                .map_or(false, |a| a.name == *name),
        }
    }

    fn matches_year(&self, entry: &CorpusEntry) -> bool {
        match (self.years, entry.year()) {
            (Some(range), Some(year)) => range.contains(year),
            _ => true,
        }
    }

    fn matches_tags(&self, entry: &CorpusEntry) -> bool {
        if self.tags.is_empty() {
            return true;
        }
        let record = entry.record();
        match self.tag_mode {
            TagMode::And => self.tags.iter().all(|t| record.has_tag(t)),
            TagMode::Or => self.tags.iter().any(|t| record.has_tag(t)),
        }
    }
}

/// Keep the entries of `subset` that pass `filter`, preserving order.
pub fn filter<'a, I>(subset: I, filter: &ResolvedFilter) -> Vec<&'a CorpusEntry>
where
    I: IntoIterator<Item = &'a CorpusEntry>,
{
    subset.into_iter().filter(|e| filter.matches(e)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleRecord, ClusterAssignment, NOISE_CLUSTER_NAME};
    use serde_json::json;

    fn record(id: &str, year: Option<i32>) -> ArticleRecord {
        let r = ArticleRecord::new(id, "", "");
        match year {
            Some(y) => r.with_metadata(json!({"article": {"year": y}})),
            None => r,
        }
    }

    fn ids(entries: &[&CorpusEntry]) -> Vec<String> {
        entries.iter().map(|e| e.id().to_string()).collect()
    }

    fn run(corpus: &Corpus, criteria: &FilterCriteria) -> (Vec<String>, Vec<FilterError>) {
        let (resolved, warnings) = ResolvedFilter::resolve(criteria, corpus);
        (ids(&filter(corpus.entries(), &resolved)), warnings)
    }

    #[test]
    fn test_year_range_keeps_missing_years() {
        let corpus = Corpus::from_records(vec![
            record("y2019", Some(2019)),
            record("none", None),
            record("y2021", Some(2021)),
        ])
        .unwrap();

        let criteria = FilterCriteria::default().with_years(Some(2020), Some(2022));
        let (result, warnings) = run(&corpus, &criteria);
        assert_eq!(result, vec!["none", "y2021"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_open_year_bounds() {
        let corpus = Corpus::from_records(vec![
            record("y2019", Some(2019)),
            record("y2021", Some(2021)),
        ])
        .unwrap();

        let (result, _) = run(&corpus, &FilterCriteria::default().with_years(Some(2020), None));
        assert_eq!(result, vec!["y2021"]);
        let (result, _) = run(&corpus, &FilterCriteria::default().with_years(None, Some(2020)));
        assert_eq!(result, vec!["y2019"]);
    }

    #[test]
    fn test_inverted_year_range_falls_back() {
        let corpus = Corpus::from_records(vec![record("a", Some(2019))]).unwrap();
        let (result, warnings) =
            run(&corpus, &FilterCriteria::default().with_years(Some(2022), Some(2020)));
        assert_eq!(result, vec!["a"]);
        assert_eq!(
            warnings,
            vec![FilterError::InvertedYearRange {
                min: 2022,
                max: 2020
            }]
        );
    }

    #[test]
    fn test_cluster_by_label_and_name() {
        let corpus = Corpus::from_records(vec![
            record("n1", None).with_cluster("leaf_0.55", ClusterAssignment::unnamed(-1)),
            record("c1", None).with_cluster("leaf_0.55", ClusterAssignment::unnamed(1)),
            record("n2", None).with_cluster("leaf_0.55", ClusterAssignment::unnamed(-1)),
            record("other", None).with_cluster("eom", ClusterAssignment::unnamed(-1)),
        ])
        .unwrap();

        let by_name = FilterCriteria::default()
            .with_run("leaf_0.55")
            .with_cluster(ClusterSelection::Name(NOISE_CLUSTER_NAME.to_string()));
        let (result, warnings) = run(&corpus, &by_name);
        assert_eq!(result, vec!["n1", "n2"]);
        assert!(warnings.is_empty());

        let by_label = FilterCriteria::default()
            .with_run("leaf_0.55")
            .with_cluster(ClusterSelection::Label(1));
        assert_eq!(run(&corpus, &by_label).0, vec!["c1"]);
    }

    #[test]
    fn test_record_without_run_fails_cluster_filter() {
        let corpus = Corpus::from_records(vec![
            record("in", None).with_cluster("eom", ClusterAssignment::unnamed(0)),
            record("out", None),
        ])
        .unwrap();
        let criteria = FilterCriteria::default()
            .with_run("eom")
            .with_cluster(ClusterSelection::Label(0));
        assert_eq!(run(&corpus, &criteria).0, vec!["in"]);
    }

    #[test]
    fn test_all_clusters_applies_no_filter() {
        let corpus = Corpus::from_records(vec![
            record("in", None).with_cluster("eom", ClusterAssignment::unnamed(0)),
            record("out", None),
        ])
        .unwrap();
        let criteria = FilterCriteria::default().with_run("eom");
        assert_eq!(run(&corpus, &criteria).0, vec!["in", "out"]);
    }

    #[test]
    fn test_unknown_run_falls_back() {
        let corpus = Corpus::from_records(vec![
            record("a", None).with_cluster("eom", ClusterAssignment::unnamed(0)),
            record("b", None),
        ])
        .unwrap();
        let criteria = FilterCriteria::default()
            .with_run("nope")
            .with_cluster(ClusterSelection::Label(0));
        let (result, warnings) = run(&corpus, &criteria);
        assert_eq!(result, vec!["a", "b"]);
        assert_eq!(warnings, vec![FilterError::UnknownRun("nope".to_string())]);
    }

    #[test]
    fn test_cluster_without_run_falls_back() {
        let corpus = Corpus::from_records(vec![record("a", None)]).unwrap();
        let criteria = FilterCriteria::default().with_cluster(ClusterSelection::Label(3));
        let (result, warnings) = run(&corpus, &criteria);
        assert_eq!(result, vec!["a"]);
        assert_eq!(
            warnings,
            vec![FilterError::ClusterWithoutRun("3".to_string())]
        );
    }

    #[test]
    fn test_tag_and_or_modes() {
        let corpus = Corpus::from_records(vec![
            record("both", None).with_finto_tag("AI", 0.5).with_manual_tag("NATO"),
            record("ai", None).with_finto_tag("AI", 0.5),
            record("none", None),
        ])
        .unwrap();

        let and = FilterCriteria::default().with_tags(["AI", "NATO"]);
        assert_eq!(run(&corpus, &and).0, vec!["both"]);

        let or = and.clone().with_tag_mode(TagMode::Or);
        assert_eq!(run(&corpus, &or).0, vec!["both", "ai"]);
    }

    #[test]
    fn test_tag_match_is_case_sensitive() {
        let corpus =
            Corpus::from_records(vec![record("a", None).with_finto_tag("NATO", 0.5)]).unwrap();
        let criteria = FilterCriteria::default().with_tags(["nato"]);
        assert!(run(&corpus, &criteria).0.is_empty());
    }

    #[test]
    fn test_dual_evidence_matches_once() {
        let corpus = Corpus::from_records(vec![record("r", None)
            .with_finto_tag("NATO", 0.8)
            .with_manual_tag("NATO")])
        .unwrap();
        let criteria = FilterCriteria::default().with_tags(["NATO"]);
        assert_eq!(run(&corpus, &criteria).0, vec!["r"]);
    }
}
