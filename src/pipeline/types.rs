//! Data model shared by the pipeline, the store and the web backend

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Title and explanation of one slide
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

impl SlideRecord {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.summary.is_empty()
    }

    /// Normalize a legacy free-text entry ("Title: body" or just body)
    pub fn from_text(slide_number: u32, text: &str) -> Self {
        match text.split_once(": ") {
            Some((title, body)) if !title.trim().is_empty() => Self::new(title.trim(), body.trim()),
            _ => Self::new(format!("Slide {}", slide_number), text.trim()),
        }
    }
}

/// A slide entry inside a chunk: the model may describe it as plain text or
/// as a structured record. Both render the same way into prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlideContent {
    Text(String),
    Record(SlideRecord),
}

impl SlideContent {
    pub fn prompt_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Record(record) if record.title.is_empty() => record.summary.clone(),
            Self::Record(record) => format!("{}: {}", record.title, record.summary),
        }
    }
}

impl From<&str> for SlideContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A topic-grouped subset of slides with pedagogical metadata.
///
/// Every field tolerates missing, `null` or mistyped values from the model and
/// falls back to its default, so one sloppy chunk never sinks the whole set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    #[serde(default, deserialize_with = "lenient_string")]
    pub topic: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pedagogical_goal: String,
    #[serde(default, deserialize_with = "lenient_slides")]
    pub slides: Vec<SlideContent>,
    /// 1-based, positionally matching `slides`
    #[serde(default, deserialize_with = "lenient_slide_numbers")]
    pub slide_numbers: Vec<u32>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_logistics: bool,
}

impl Chunk {
    pub fn contains(&self, slide_number: u32) -> bool {
        self.slide_numbers.contains(&slide_number)
    }
}

/// Text of a scalar; `null`, arrays and objects become empty
fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(scalar_text(&value))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// Strings and `{title, summary}` objects; scalars become text, the rest is dropped
fn lenient_slides<'de, D>(deserializer: D) -> Result<Vec<SlideContent>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::Object(map) => {
                let field = |key: &str| map.get(key).map(scalar_text).unwrap_or_default();
                Some(SlideContent::Record(SlideRecord::new(field("title"), field("summary"))))
            }
            serde_json::Value::Null | serde_json::Value::Array(_) => None,
            other => Some(SlideContent::Text(scalar_text(&other))),
        })
        .collect())
}

/// Models sometimes quote numbers; accept `3` and `"3"`, skip anything else.
fn lenient_slide_numbers<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| {
            let parsed = match &item {
                serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
                serde_json::Value::String(s) => s.trim().parse::<u32>().ok(),
                _ => None,
            };
            if parsed.is_none() {
                tracing::debug!("Skipping invalid slide number {}", item);
            }
            parsed
        })
        .collect())
}

/// Objects become chunks; anything else in the list is skipped
fn lenient_chunks<'de, D>(deserializer: D) -> Result<Vec<Chunk>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter(|item| item.is_object())
        .filter_map(|item| match serde_json::from_value::<Chunk>(item) {
            Ok(chunk) => Some(chunk),
            Err(e) => {
                tracing::debug!("Skipping unreadable chunk: {}", e);
                None
            }
        })
        .collect())
}

/// The full topic grouping for one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSet {
    #[serde(default, deserialize_with = "lenient_string")]
    pub academic_context: String,
    #[serde(default, deserialize_with = "lenient_chunks")]
    pub chunks: Vec<Chunk>,
}

impl ChunkSet {
    /// `{"academic_context": "", "chunks": []}`
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Unique slide numbers referenced by any chunk, ascending
    pub fn slide_numbers(&self) -> Vec<u32> {
        self.chunks
            .iter()
            .flat_map(|c| c.slide_numbers.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// First chunk containing the slide; later overlapping chunks are ignored
    pub fn chunk_for(&self, slide_number: u32) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.contains(slide_number))
    }
}

/// Per-slide records for a whole document, keyed by slide number.
///
/// Serialized as a JSON object with stringified numeric keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SlideTable(BTreeMap<u32, SlideRecord>);

impl SlideTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slide_number: u32) -> Option<&SlideRecord> {
        self.0.get(&slide_number)
    }

    pub fn insert(&mut self, slide_number: u32, record: SlideRecord) {
        self.0.insert(slide_number, record);
    }

    /// Add empty records for slides not yet present; existing entries are kept
    pub fn ensure_slides(&mut self, slide_numbers: &[u32]) {
        for &n in slide_numbers {
            self.0.entry(n).or_insert_with(SlideRecord::empty);
        }
    }

    /// Slide numbers present in the table, ascending
    pub fn slide_numbers(&self) -> Vec<u32> {
        self.0.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &SlideRecord)> {
        self.0.iter().map(|(n, r)| (*n, r))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of slides with a non-empty record
    pub fn populated(&self) -> usize {
        self.0.values().filter(|r| !r.is_empty()).count()
    }
}

impl FromIterator<(u32, SlideRecord)> for SlideTable {
    fn from_iter<I: IntoIterator<Item = (u32, SlideRecord)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for SlideTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: BTreeMap<String, serde_json::Value> = BTreeMap::deserialize(deserializer)?;
        let mut table = SlideTable::new();
        for (key, value) in raw {
            let Ok(number) = key.trim().parse::<u32>() else {
                tracing::debug!("Ignoring non-numeric slide key {:?}", key);
                continue;
            };
            let record = match value {
                serde_json::Value::String(text) => SlideRecord::from_text(number, &text),
                serde_json::Value::Object(_) => {
                    serde_json::from_value(value).map_err(serde::de::Error::custom)?
                }
                serde_json::Value::Null => SlideRecord::empty(),
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "slide {} has unsupported value {}",
                        number, other
                    )))
                }
            };
            table.insert(number, record);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(topic: &str, numbers: &[u32]) -> Chunk {
        Chunk {
            topic: topic.to_string(),
            slide_numbers: numbers.to_vec(),
            slides: numbers.iter().map(|n| SlideContent::Text(format!("slide {}", n))).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn slide_numbers_are_unique_and_sorted() {
        let set = ChunkSet {
            academic_context: "db".to_string(),
            chunks: vec![chunk("b", &[9, 7]), chunk("a", &[3, 1, 2]), chunk("dup", &[2])],
        };
        assert_eq!(set.slide_numbers(), vec![1, 2, 3, 7, 9]);
    }

    #[test]
    fn first_matching_chunk_wins() {
        let set = ChunkSet {
            academic_context: String::new(),
            chunks: vec![chunk("first", &[1, 2]), chunk("second", &[2, 3])],
        };
        assert_eq!(set.chunk_for(2).map(|c| c.topic.as_str()), Some("first"));
        assert_eq!(set.chunk_for(3).map(|c| c.topic.as_str()), Some("second"));
        assert!(set.chunk_for(4).is_none());
    }

    #[test]
    fn chunk_accepts_mixed_slide_representations() {
        let parsed: Chunk = serde_json::from_str(
            r#"{
                "topic": "Pages",
                "slides": ["Heap files", {"title": "Page layout", "summary": "slotted pages"}],
                "slide_numbers": [4, "5"]
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.slide_numbers, vec![4, 5]);
        assert!(!parsed.is_logistics);
        assert_eq!(parsed.slides[0].prompt_text(), "Heap files");
        assert_eq!(parsed.slides[1].prompt_text(), "Page layout: slotted pages");
    }

    #[test]
    fn chunk_skips_non_numeric_slide_numbers() {
        let parsed: Chunk =
            serde_json::from_str(r#"{"topic": "x", "slide_numbers": ["four", 2, null, "3", -1]}"#)
                .unwrap();
        assert_eq!(parsed.slide_numbers, vec![2, 3]);
    }

    #[test]
    fn chunk_fields_fall_back_to_defaults() {
        let parsed: Chunk = serde_json::from_str(
            r#"{
                "topic": null,
                "pedagogical_goal": ["not", "text"],
                "slides": ["ok", null, 7, {"title": null, "summary": "body"}],
                "slide_numbers": "1, 2",
                "is_logistics": "yes"
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.topic, "");
        assert_eq!(parsed.pedagogical_goal, "");
        assert_eq!(
            parsed.slides,
            vec![
                SlideContent::Text("ok".to_string()),
                SlideContent::Text("7".to_string()),
                SlideContent::Record(SlideRecord::new("", "body")),
            ]
        );
        assert!(parsed.slide_numbers.is_empty());
        assert!(!parsed.is_logistics);
    }

    #[test]
    fn slide_table_uses_string_keys_in_numeric_order() {
        let mut table = SlideTable::new();
        table.insert(10, SlideRecord::new("Ten", "x"));
        table.insert(2, SlideRecord::new("Two", "y"));
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(
            json,
            r#"{"2":{"title":"Two","summary":"y"},"10":{"title":"Ten","summary":"x"}}"#
        );
    }

    #[test]
    fn slide_table_normalizes_legacy_text_entries() {
        let table: SlideTable = serde_json::from_str(
            r#"{
                "1": "Intro: database storage basics",
                "2": "memory hierarchy",
                "3": {"title": "Disk", "summary": "disk-based architecture"},
                "notes": "ignored"
            }"#,
        )
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(1), Some(&SlideRecord::new("Intro", "database storage basics")));
        assert_eq!(table.get(2), Some(&SlideRecord::new("Slide 2", "memory hierarchy")));
        assert_eq!(table.get(3).map(|r| r.title.as_str()), Some("Disk"));
    }

    #[test]
    fn ensure_slides_keeps_existing_records() {
        let mut table = SlideTable::new();
        table.insert(1, SlideRecord::new("One", "kept"));
        table.ensure_slides(&[1, 2, 3]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(1).map(|r| r.summary.as_str()), Some("kept"));
        assert!(table.get(2).is_some_and(SlideRecord::is_empty));
        assert_eq!(table.populated(), 1);
    }
}
