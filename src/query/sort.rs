//! Deterministic result ordering.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::score::score;
use super::OrderKey;
use crate::corpus::CorpusEntry;

/// One ordered result, with its best-match score when one was computed.
#[derive(Debug, Clone, Copy)]
pub struct ArticleHit<'a> {
    pub entry: &'a CorpusEntry,
    pub score: Option<f64>,
}

impl<'a> ArticleHit<'a> {
    pub fn id(&self) -> &'a str {
        self.entry.id()
    }

    pub fn year(&self) -> Option<i32> {
        self.entry.year()
    }
}

/// Sort direction on years; missing years always sort last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum YearDirection {
    Ascending,
    Descending,
}

fn compare_years(a: Option<i32>, b: Option<i32>, direction: YearDirection) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => match direction {
            YearDirection::Ascending => x.cmp(&y),
            YearDirection::Descending => y.cmp(&x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Total order of two hits under `key`; ties always end on id ascending.
pub fn compare(a: &ArticleHit<'_>, b: &ArticleHit<'_>, key: OrderKey) -> Ordering {
    let by_id = || a.id().cmp(b.id());
    match key {
        OrderKey::NewestFirst => {
            compare_years(a.year(), b.year(), YearDirection::Descending).then_with(by_id)
        }
        OrderKey::OldestFirst => {
            compare_years(a.year(), b.year(), YearDirection::Ascending).then_with(by_id)
        }
        OrderKey::BestMatch => {
            let (sa, sb) = (a.score.unwrap_or(0.0), b.score.unwrap_or(0.0));
            sb.total_cmp(&sa)
                .then_with(|| compare_years(a.year(), b.year(), YearDirection::Descending))
                .then_with(by_id)
        }
    }
}

/// Order `subset` by `key` into a new sequence; the input is untouched.
///
/// Scores are computed against `selected` only for [`OrderKey::BestMatch`].
pub fn sort<'a>(
    subset: &[&'a CorpusEntry],
    key: OrderKey,
    selected: &BTreeSet<String>,
) -> Vec<ArticleHit<'a>> {
    let mut hits: Vec<ArticleHit<'a>> = subset
        .iter()
        .map(|&entry| ArticleHit {
            entry,
            score: match key {
                OrderKey::BestMatch => Some(score(entry.record(), selected)),
                _ => None,
            },
        })
        .collect();
    hits.sort_by(|a, b| compare(a, b, key));
    hits
}
