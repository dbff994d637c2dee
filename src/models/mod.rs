//! Core data models for the article explorer.
//!
//! An [`ArticleRecord`] is one line of the merged corpus file written by the
//! upstream translation, tagging and clustering jobs. Records are decoded once
//! at load time and never mutated afterwards.

use std::collections::{BTreeMap, BTreeSet};

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Fixed relevance contributed by a manual keyword hit.
pub const MANUAL_TAG_SCORE: f64 = 0.95;

/// Cluster label reserved for records a clustering run left unassigned.
pub const NOISE_LABEL: i64 = -1;

/// Display name of the noise cluster.
pub const NOISE_CLUSTER_NAME: &str = "Noise / Unclustered";

/// Metadata paths checked, in order, when resolving a record's year.
const YEAR_PATHS: &[&[&str]] = &[&["article", "year"], &["article", "Year"], &["year"]];

/// Reads `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads a score written as a number, a numeric string or `null`.
fn lenient_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Score {
        Number(f64),
        Text(String),
    }

    match Option::<Score>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(Score::Number(n)) => Ok(n),
        Some(Score::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("score {:?} is not a number", s))),
    }
}

fn translation_or_none<'de, D>(deserializer: D) -> Result<Option<Translation>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Translation>::deserialize(deserializer)?.filter(|t| !t.is_empty()))
}

/// A topical tag assigned by the Finto/YSO annotator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FintoTag {
    /// Vocabulary label, the join key with manual tags
    pub label: String,

    /// Annotator relevance (missing or null reads as 0.0; numeric strings are accepted)
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: f64,

    /// Concept URI in the controlled vocabulary
    #[serde(default, deserialize_with = "null_as_default")]
    pub uri: String,
}

impl FintoTag {
    /// Creates a new tag.
    ///
    /// # Arguments
    /// * `label` - Vocabulary label
    /// * `score` - Annotator relevance
    /// * `uri` - Concept URI
    pub fn new(label: impl Into<String>, score: f64, uri: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            score,
            uri: uri.into(),
        }
    }
}

/// English translation of the title and abstract.
///
/// The translator writes `title_en`/`abstract_en`, older files use
/// `title`/`abstract`. When both spellings are present the `_en` one wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawTranslation")]
pub struct Translation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
}

#[derive(Deserialize)]
struct RawTranslation {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    title_en: Option<String>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(default)]
    abstract_en: Option<String>,
}

impl From<RawTranslation> for Translation {
    fn from(raw: RawTranslation) -> Self {
        Self {
            title: raw.title_en.or(raw.title),
            abstract_text: raw.abstract_en.or(raw.abstract_text),
        }
    }
}

impl Translation {
    /// Creates a translation.
    ///
    /// # Arguments
    /// * `title` - Translated title, if any
    /// * `abstract_text` - Translated abstract, if any
    pub fn new(title: Option<String>, abstract_text: Option<String>) -> Self {
        Self {
            title,
            abstract_text,
        }
    }

    /// True when neither field carries any text.
    pub fn is_empty(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.title) && blank(&self.abstract_text)
    }
}

/// Membership of a record in one clustering run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawClusterAssignment")]
pub struct ClusterAssignment {
    /// Cluster label; [`NOISE_LABEL`] marks noise
    pub label: i64,

    /// Human-readable cluster name
    pub name: String,
}

#[derive(Deserialize)]
struct RawClusterAssignment {
    label: i64,
    #[serde(default)]
    name: Option<String>,
}

impl From<RawClusterAssignment> for ClusterAssignment {
    fn from(raw: RawClusterAssignment) -> Self {
        let name = raw
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| default_cluster_name(raw.label));
        Self {
            label: raw.label,
            name,
        }
    }
}

impl ClusterAssignment {
    /// Creates an assignment with an explicit name.
    ///
    /// # Arguments
    /// * `label` - Cluster label within its run
    /// * `name` - Display name
    pub fn new(label: i64, name: impl Into<String>) -> Self {
        Self {
            label,
            name: name.into(),
        }
    }

    /// Assignment carrying the conventional name for `label`.
    pub fn unnamed(label: i64) -> Self {
        Self::new(label, default_cluster_name(label))
    }

    pub fn is_noise(&self) -> bool {
        self.label == NOISE_LABEL
    }
}

/// Conventional name for a cluster label when the producer did not supply one.
pub fn default_cluster_name(label: i64) -> String {
    if label == NOISE_LABEL {
        NOISE_CLUSTER_NAME.to_string()
    } else {
        format!("Cluster {}", label)
    }
}

/// Open-ended metadata attached to a record by the scraper.
///
/// Nothing in here has a guaranteed schema; lookups return `None` for
/// anything missing or of the wrong shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Value);

impl Metadata {
    /// Wraps a raw metadata value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Follow a path of object keys.
    pub fn lookup(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.0, |value, key| value.get(key))
    }

    /// Resolve the publication year.
    ///
    /// Only the first path that is present counts. If its value is null or
    /// not integer-like the record has no year.
    pub fn year(&self) -> Option<i32> {
        YEAR_PATHS
            .iter()
            .find_map(|path| self.lookup(path))
            .and_then(parse_year)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

/// Interpret a JSON value as a year.
///
/// Accepts integers, floats without a fractional part, and strings holding an
/// integer. Everything else is "no year".
pub fn parse_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

/// How a record carries a given tag label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TagEvidence {
    /// Listed among the manual keyword hits
    Manual,

    /// Assigned by the Finto annotator with this score
    Finto { score: f64 },
}

impl TagEvidence {
    /// Relevance contributed by this evidence.
    pub fn score(&self) -> f64 {
        match self {
            TagEvidence::Manual => MANUAL_TAG_SCORE,
            TagEvidence::Finto { score } => *score,
        }
    }
}

/// One article of the corpus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleRecord {
    /// Stable identifier, unique across the corpus
    pub id: String,

    /// Original-language title
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    /// Original-language abstract
    #[serde(rename = "abstract", default, deserialize_with = "null_as_default")]
    pub abstract_text: String,

    /// English translation, absent when the record was never translated
    #[serde(
        rename = "translation_en",
        default,
        deserialize_with = "translation_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub translation: Option<Translation>,

    /// Scraper metadata, kept as-is
    #[serde(default)]
    pub metadata: Metadata,

    /// Finto/YSO tags in annotator order
    #[serde(rename = "finto_tags_en", default, deserialize_with = "null_as_default")]
    pub tags: Vec<FintoTag>,

    /// Labels from the manual keyword scan
    #[serde(
        rename = "manual_keyword_hits",
        default,
        deserialize_with = "null_as_default"
    )]
    pub manual_tags: BTreeSet<String>,

    /// Cluster assignment per clustering run
    #[serde(rename = "clusters", default, deserialize_with = "null_as_default")]
    pub cluster_memberships: BTreeMap<String, ClusterAssignment>,
}

impl ArticleRecord {
    /// Create a record with only the required text fields set.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            abstract_text: abstract_text.into(),
            translation: None,
            metadata: Metadata::default(),
            tags: Vec::new(),
            manual_tags: BTreeSet::new(),
            cluster_memberships: BTreeMap::new(),
        }
    }

    pub fn with_translation(mut self, translation: Translation) -> Self {
        self.translation = Some(translation).filter(|t| !t.is_empty());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Metadata::new(metadata);
        self
    }

    pub fn with_finto_tag(mut self, label: impl Into<String>, score: f64) -> Self {
        let label = label.into();
        let uri = format!("http://www.yso.fi/onto/yso/{}", label.to_lowercase());
        self.tags.push(FintoTag::new(label, score, uri));
        self
    }

    pub fn with_manual_tag(mut self, label: impl Into<String>) -> Self {
        self.manual_tags.insert(label.into());
        self
    }

    pub fn with_cluster(mut self, run: impl Into<String>, assignment: ClusterAssignment) -> Self {
        self.cluster_memberships.insert(run.into(), assignment);
        self
    }

    /// Resolved publication year.
    pub fn year(&self) -> Option<i32> {
        self.metadata.year()
    }

    pub fn translated_title(&self) -> Option<&str> {
        self.translation
            .as_ref()
            .and_then(|t| t.title.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn translated_abstract(&self) -> Option<&str> {
        self.translation
            .as_ref()
            .and_then(|t| t.abstract_text.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    /// Title to show: the translation when available, else the original.
    pub fn display_title(&self) -> &str {
        self.translated_title().unwrap_or(&self.title)
    }

    /// Evidence for `label`; a manual hit takes precedence over a Finto tag.
    pub fn evidence_for(&self, label: &str) -> Option<TagEvidence> {
        if self.manual_tags.contains(label) {
            return Some(TagEvidence::Manual);
        }
        self.tags
            .iter()
            .find(|t| t.label == label)
            .map(|t| TagEvidence::Finto { score: t.score })
    }

    pub fn has_tag(&self, label: &str) -> bool {
        self.manual_tags.contains(label) || self.tags.iter().any(|t| t.label == label)
    }

    /// All tag labels, Finto and manual, deduplicated.
    pub fn tag_labels(&self) -> BTreeSet<&str> {
        self.tags
            .iter()
            .map(|t| t.label.as_str())
            .chain(self.manual_tags.iter().map(String::as_str))
            .collect()
    }

    /// Finto tags ordered by descending score.
    pub fn tags_by_score(&self) -> Vec<&FintoTag> {
        let mut tags: Vec<&FintoTag> = self.tags.iter().collect();
        tags.sort_by(|a, b| b.score.total_cmp(&a.score));
        tags
    }

    pub fn cluster(&self, run: &str) -> Option<&ClusterAssignment> {
        self.cluster_memberships.get(run)
    }
}
