//! JSON Lines file provider.
//!
//! Reads the merged corpus file: one JSON object per line, blank lines ignored.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::CorpusProvider;
use crate::corpus::{LoadError, LoadResult};
use crate::models::ArticleRecord;

/// Provider backed by a JSONL file on disk.
#[derive(Debug, Clone)]
pub struct JsonlFileProvider {
    path: PathBuf,
    name: String,
}

impl JsonlFileProvider {
    /// Creates a provider for a JSONL file.
    ///
    /// The file is not opened until records are fetched.
    ///
    /// # Arguments
    /// * `path` - Location of the corpus file; its display form becomes the provider name
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CorpusProvider for JsonlFileProvider {
    async fn fetch_records(&self) -> LoadResult<Vec<ArticleRecord>> {
        let contents = tokio::fs::read(&self.path)
            .await
            .map_err(|source| LoadError::Unreadable {
                source_name: self.name.clone(),
                source,
            })?;
        debug!("Read {} bytes from {}", contents.len(), self.name);
        parse_jsonl(&contents)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Decode every non-blank line of `contents` into a record.
///
/// Lines are split on raw bytes, so a line that is not valid UTF-8 is
/// reported like any other undecodable record.
///
/// # Errors
/// Returns `LoadError::Malformed` with the 1-based line number of the first
/// line that does not decode, or whose id is blank
pub fn parse_jsonl(contents: impl AsRef<[u8]>) -> LoadResult<Vec<ArticleRecord>> {
    let mut records = Vec::new();

    for (idx, raw) in contents.as_ref().split(|&b| b == b'\n').enumerate() {
        let line = std::str::from_utf8(raw)
            .map_err(|e| LoadError::Malformed {
                line: idx + 1,
                reason: format!("invalid UTF-8: {}", e),
            })?
            .trim();
        if line.is_empty() {
            continue;
        }

        let record: ArticleRecord =
            serde_json::from_str(line).map_err(|e| LoadError::Malformed {
                line: idx + 1,
                reason: e.to_string(),
            })?;

        if record.id.trim().is_empty() {
            return Err(LoadError::Malformed {
                line: idx + 1,
                reason: "record id is blank".to_string(),
            });
        }

        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use std::io::Write;

    const SAMPLE: &str = r#"{"id": "art_1", "title": "标题", "abstract": "摘要", "metadata": {"article": {"year": 2021}}, "finto_tags_en": [{"label": "NATO", "score": 0.8, "uri": "u1"}], "manual_keyword_hits": ["NATO"], "translation_en": {"title_en": "Title"}, "clusters": {"leaf_0.55": {"label": -1, "name": "Noise / Unclustered"}}}

{"id": "art_2", "title": "Second", "abstract": "", "metadata": {}, "finto_tags_en": [], "manual_keyword_hits": [], "translation_en": {}, "clusters": {}}
"#;

    #[test]
    fn test_parse_skips_blank_lines() {
        let records = parse_jsonl(SAMPLE).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "art_1");
        assert_eq!(records[0].display_title(), "Title");
        assert_eq!(records[1].id, "art_2");
        assert!(records[1].translation.is_none());
    }

    #[test]
    fn test_parse_reports_line_of_malformed_record() {
        let contents = "{\"id\": \"a\"}\n\n{\"id\": \"b\", \"clusters\": {\"eom\": {\"label\": \"x\"}}}\n";
        match parse_jsonl(contents) {
            Err(LoadError::Malformed { line, .. }) => assert_eq!(line, 3),
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_truncated_json() {
        assert!(matches!(
            parse_jsonl("{\"id\": \"a\""),
            Err(LoadError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn test_parse_rejects_blank_id() {
        assert!(matches!(
            parse_jsonl("{\"id\": \"\"}"),
            Err(LoadError::Malformed { line: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let provider = JsonlFileProvider::new(file.path());
        let corpus = Corpus::load(&provider).await.unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.get_by_id("art_1").unwrap().year(), Some(2021));
    }

    #[test]
    fn test_parse_handles_crlf_line_endings() {
        let records = parse_jsonl("{\"id\": \"a\"}\r\n{\"id\": \"b\"}\r\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, "b");
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"id\": \"a\"}\n{\"id\": \"b\", \"title\": \"\xff\"}\n")
            .unwrap();

        let result = JsonlFileProvider::new(file.path()).fetch_records().await;
        assert!(matches!(result, Err(LoadError::Malformed { line: 2, .. })));
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let provider = JsonlFileProvider::new("/definitely/not/here.jsonl");
        let result = provider.fetch_records().await;
        assert!(matches!(result, Err(LoadError::Unreadable { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_ids_in_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"id\": \"a\"}}").unwrap();
        writeln!(file, "{{\"id\": \"a\"}}").unwrap();

        let result = Corpus::load(&JsonlFileProvider::new(file.path())).await;
        assert!(matches!(result, Err(LoadError::DuplicateId(_))));
    }
}
