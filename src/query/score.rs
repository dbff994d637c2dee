//! Best-match relevance scoring.

use std::collections::BTreeSet;

use crate::models::ArticleRecord;

/// Relevance of `record` to the selected tags.
///
/// Each selected label present on the record contributes its evidence score:
/// [`MANUAL_TAG_SCORE`](crate::models::MANUAL_TAG_SCORE) for a manual hit,
/// otherwise the Finto score. Contributions are summed and floored at zero,
/// so selecting another label never lowers the result.
pub fn score(record: &ArticleRecord, selected: &BTreeSet<String>) -> f64 {
    selected
        .iter()
        .filter_map(|label| record.evidence_for(label))
        .map(|evidence| evidence.score().max(0.0))
        .fold(0.0, |total, contribution| total + contribution)
}
