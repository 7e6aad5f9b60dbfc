//! Format-agnostic configuration loading and saving

use crate::{Error, Result, io};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;

/// Format-agnostic configuration store.
///
/// Detects the format from the file extension and handles
/// serialization/deserialization transparently.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigStore;

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a file.
    ///
    /// Format is detected from file extension:
    /// - `.yaml`, `.yml` -> YAML
    /// - `.json` -> JSON
    /// - `.toml` -> TOML
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = io::read_text(path)?;
        self.parse(path, &content)
    }

    /// Parse already-read content as if it came from `path`.
    pub fn parse<T: DeserializeOwned>(&self, path: &Path, content: &str) -> Result<T> {
        let parse_error = |format: &str, message: String| Error::ConfigParse {
            path: path.to_path_buf(),
            format: format.into(),
            message,
        };

        match extension_of(path).as_str() {
            "yaml" | "yml" => {
                serde_yaml::from_str(content).map_err(|e| parse_error("YAML", e.to_string()))
            }
            "json" => {
                serde_json::from_str(content).map_err(|e| parse_error("JSON", e.to_string()))
            }
            "toml" => toml::from_str(content).map_err(|e| parse_error("TOML", e.to_string())),
            other => Err(Error::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }

    /// Save configuration to a file atomically.
    ///
    /// Format is determined from file extension.
    pub fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let serialize_error = |format: &str, message: String| Error::ConfigSerialize {
            path: path.to_path_buf(),
            format: format.into(),
            message,
        };

        let content = match extension_of(path).as_str() {
            "yaml" | "yml" => {
                serde_yaml::to_string(value).map_err(|e| serialize_error("YAML", e.to_string()))?
            }
            "json" => serde_json::to_string_pretty(value)
                .map_err(|e| serialize_error("JSON", e.to_string()))?,
            "toml" => toml::to_string_pretty(value)
                .map_err(|e| serialize_error("TOML", e.to_string()))?,
            other => {
                return Err(Error::UnsupportedFormat {
                    extension: other.to_string(),
                });
            }
        };

        io::write_atomic(path, content.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        enabled: bool,
        #[serde(default)]
        paths: BTreeMap<String, String>,
    }

    fn sample() -> Sample {
        let mut paths = BTreeMap::new();
        paths.insert("skill".to_string(), ".claude/skills".to_string());
        Sample {
            name: "claude".into(),
            enabled: true,
            paths,
        }
    }

    #[rstest]
    #[case("config.yaml")]
    #[case("config.yml")]
    #[case("config.json")]
    #[case("config.toml")]
    fn save_then_load_each_format(#[case] file: &str) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(file);
        let store = ConfigStore::new();

        store.save(&path, &sample()).unwrap();
        let loaded: Sample = store.load(&path).unwrap();

        assert_eq!(loaded, sample());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = ConfigStore::new()
            .parse::<Sample>(Path::new("config.ini"), "name = x")
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn parse_error_names_format_and_path() {
        let err = ConfigStore::new()
            .parse::<Sample>(Path::new("/p/config.yaml"), "name: [unclosed")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("YAML"), "got: {message}");
        assert!(message.contains("/p/config.yaml"), "got: {message}");
    }
}
