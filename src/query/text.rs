//! Free-text search over the precomputed search blobs.

use crate::corpus::{fold_case, CorpusEntry};

/// A case-folded substring query. Blank input matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextQuery(Option<String>);

impl TextQuery {
    /// Trims and case-folds `raw`.
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self(None)
        } else {
            Self(Some(fold_case(trimmed)))
        }
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_none()
    }

    pub fn matches(&self, entry: &CorpusEntry) -> bool {
        match &self.0 {
            None => true,
            Some(needle) => entry.blob().contains(needle),
        }
    }
}

/// Keep the entries whose blob contains `query`. A blank query is the identity.
pub fn search<'a>(subset: Vec<&'a CorpusEntry>, query: &TextQuery) -> Vec<&'a CorpusEntry> {
    if query.is_blank() {
        return subset;
    }
    subset.into_iter().filter(|e| query.matches(e)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::models::{ArticleRecord, Translation};

    fn corpus() -> Corpus {
        Corpus::from_records(vec![
            ArticleRecord::new("zh", "量子计算研究", "关于量子的摘要").with_translation(
                Translation::new(None, Some("A study of Quantum computing".to_string())),
            ),
            ArticleRecord::new("plain", "Trade policy", "Tariffs and quotas"),
        ])
        .unwrap()
    }

    fn ids(entries: &[&CorpusEntry]) -> Vec<String> {
        entries.iter().map(|e| e.id().to_string()).collect()
    }

    #[test]
    fn test_blank_query_is_identity() {
        let corpus = corpus();
        let all: Vec<&CorpusEntry> = corpus.entries().iter().collect();
        assert_eq!(search(all.clone(), &TextQuery::new("   ")).len(), 2);
        assert_eq!(search(all, &TextQuery::new("")).len(), 2);
    }

    #[test]
    fn test_match_via_translated_abstract() {
        let corpus = corpus();
        let all: Vec<&CorpusEntry> = corpus.entries().iter().collect();
        assert_eq!(ids(&search(all, &TextQuery::new("quantum"))), vec!["zh"]);
    }

    #[test]
    fn test_case_insensitive_and_trimmed() {
        let corpus = corpus();
        let all: Vec<&CorpusEntry> = corpus.entries().iter().collect();
        assert_eq!(ids(&search(all, &TextQuery::new("  TARIFFS "))), vec!["plain"]);
    }

    #[test]
    fn test_whole_query_must_be_contiguous() {
        let corpus = corpus();
        let all: Vec<&CorpusEntry> = corpus.entries().iter().collect();
        assert!(search(all.clone(), &TextQuery::new("trade quotas")).is_empty());
        assert_eq!(ids(&search(all, &TextQuery::new("量子计算"))), vec!["zh"]);
    }
}
