//! Front-matter metadata
//!
//! Asset authors may put arbitrary keys in a file's YAML header, so metadata
//! is an open string-keyed map. Values are either text or a list of text;
//! nested mappings are ignored. Only `description` and `version` are read by
//! the engine itself.

use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;

const DELIMITER: &str = "---";

/// A single front-matter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Text(String),
    List(Vec<String>),
}

impl MetaValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            MetaValue::List(_) => None,
        }
    }
}

/// Open metadata map parsed from a primary file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, MetaValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    /// Text value for `key`, if present and scalar.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(MetaValue::as_text)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: MetaValue) {
        self.0.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetaValue)> {
        self.0.iter()
    }
}

/// Split `content` into its front-matter block and body.
///
/// Returns `None` when the content does not start with a `---` line or the
/// closing marker is missing.
pub fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let first_line_end = content.find('\n')?;
    if content[..first_line_end].trim_end() != DELIMITER {
        return None;
    }

    let rest = &content[first_line_end + 1..];
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let header = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((header, body));
        }
        offset += line.len();
    }
    None
}

/// Parse the YAML front matter of a markdown-style file.
///
/// Missing or malformed front matter yields an empty map, never an error.
pub fn parse_front_matter(content: &str) -> Metadata {
    match split_front_matter(content) {
        Some((header, _)) => parse_yaml_mapping(header),
        None => Metadata::new(),
    }
}

/// Read metadata from a file that is YAML throughout (workflow specs).
///
/// A `---` header takes precedence; otherwise the whole document's top-level
/// keys are used.
pub fn parse_yaml_document(content: &str) -> Metadata {
    match split_front_matter(content) {
        Some((header, _)) => parse_yaml_mapping(header),
        None => parse_yaml_mapping(content),
    }
}

fn parse_yaml_mapping(yaml: &str) -> Metadata {
    let value: YamlValue = match serde_yaml::from_str(yaml) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("Ignoring malformed front matter: {}", e);
            return Metadata::new();
        }
    };

    let mut metadata = Metadata::new();
    let YamlValue::Mapping(mapping) = value else {
        return metadata;
    };

    for (key, value) in mapping {
        let Some(key) = scalar_to_string(&key) else {
            continue;
        };
        if let Some(value) = to_meta_value(&value) {
            metadata.insert(key, value);
        }
    }
    metadata
}

fn to_meta_value(value: &YamlValue) -> Option<MetaValue> {
    match value {
        YamlValue::Sequence(items) => Some(MetaValue::List(
            items.iter().filter_map(scalar_to_string).collect(),
        )),
        other => scalar_to_string(other).map(MetaValue::Text),
    }
}

fn scalar_to_string(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
