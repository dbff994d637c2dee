//! Case-folded search text derived from a record.

use crate::models::ArticleRecord;

/// Lowercased concatenation of every searchable field of a record.
///
/// Holds the original title and abstract, the translated title and abstract
/// when present, and every tag label (Finto and manual). Built once at load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchBlob(String);

impl SearchBlob {
    pub fn build(record: &ArticleRecord) -> Self {
        let tag_line = record
            .tags
            .iter()
            .map(|t| t.label.as_str())
            .chain(record.manual_tags.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        let parts = [
            record.title.as_str(),
            record.abstract_text.as_str(),
            record.translated_title().unwrap_or(""),
            record.translated_abstract().unwrap_or(""),
            tag_line.as_str(),
        ];

        Self(fold_case(&parts.join("\n")))
    }

    /// Substring test against an already folded needle.
    pub fn contains(&self, folded_needle: &str) -> bool {
        self.0.contains(folded_needle)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Case folding shared by blobs and queries.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}
