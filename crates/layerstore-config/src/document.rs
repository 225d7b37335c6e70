//! The declarative configuration document.
//!
//! ```yaml
//! main: files
//! stores:
//!   files:
//!     type: PrefixStore
//!     config:
//!       prefix: "${APP_PREFIX:-dev/}"
//!     base: disk
//!   disk:
//!     type: FilesystemStore
//!     config:
//!       root_path: /var/lib/app
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

/// A parsed document: named store definitions plus the default root.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub stores: BTreeMap<String, StoreDefinition>,
    /// Definition built when no name is requested.
    #[serde(default)]
    pub main: Option<String>,
}

/// One entry of `stores`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreDefinition {
    /// Registered type name, e.g. `CachingStore`.
    #[serde(rename = "type")]
    pub store_type: String,
    /// Parameters for the type. Absent means an empty mapping.
    #[serde(default)]
    pub config: Value,
    /// Name, list of names, or role mapping of child definitions.
    #[serde(default)]
    pub base: Option<Value>,
}

/// Document formats, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("yaml" | "yml") => Ok(Format::Yaml),
            Some("toml") => Ok(Format::Toml),
            Some("json") => Ok(Format::Json),
            _ => Err(ConfigError::Parse(format!(
                "cannot infer configuration format of {}",
                path.display()
            ))),
        }
    }
}

impl StoreConfig {
    /// Read and parse `path`, picking the format from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let text = fs::read_to_string(path)?;
        Self::parse(&text, format)
    }

    pub fn parse(text: &str, format: Format) -> ConfigResult<Self> {
        match format {
            Format::Yaml => Self::from_yaml_str(text),
            Format::Toml => Self::from_toml_str(text),
            Format::Json => Self::from_json_str(text),
        }
    }

    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn definition(&self, name: &str) -> ConfigResult<&StoreDefinition> {
        self.stores
            .get(name)
            .ok_or_else(|| ConfigError::UnknownStore(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const YAML: &str = r#"
main: cached
stores:
  cached:
    type: CachingStore
    base:
      main_store: disk
      cache_store: memory
  disk:
    type: FilesystemStore
    config:
      root_path: /tmp/objects
  memory:
    type: DictStore
"#;

    #[test]
    fn parses_yaml() {
        let config = StoreConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.main.as_deref(), Some("cached"));
        assert_eq!(config.stores.len(), 3);

        let cached = config.definition("cached").unwrap();
        assert_eq!(cached.store_type, "CachingStore");
        assert_eq!(
            cached.base,
            Some(json!({"main_store": "disk", "cache_store": "memory"}))
        );
        assert_eq!(config.definition("memory").unwrap().config, Value::Null);
    }

    #[test]
    fn toml_and_json_agree_with_yaml() {
        let toml_text = r#"
main = "disk"

[stores.disk]
type = "FilesystemStore"
config = { root_path = "/tmp/objects" }
"#;
        let json_text = r#"{
            "main": "disk",
            "stores": {
                "disk": {"type": "FilesystemStore", "config": {"root_path": "/tmp/objects"}}
            }
        }"#;
        let from_toml = StoreConfig::from_toml_str(toml_text).unwrap();
        let from_json = StoreConfig::from_json_str(json_text).unwrap();
        assert_eq!(from_toml, from_json);
        assert_eq!(
            from_toml.definition("disk").unwrap().config,
            json!({"root_path": "/tmp/objects"})
        );
    }

    #[test]
    fn unknown_definition() {
        let config = StoreConfig::default();
        assert!(matches!(
            config.definition("nope"),
            Err(ConfigError::UnknownStore(name)) if name == "nope"
        ));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.YML")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(Format::from_path(Path::new("a.json")).unwrap(), Format::Json);
        assert!(Format::from_path(Path::new("a.ini")).is_err());
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stores.yaml");
        fs::write(&path, YAML).unwrap();
        let config = StoreConfig::from_path(&path).unwrap();
        assert_eq!(config.main.as_deref(), Some("cached"));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = StoreConfig::from_yaml_str("stores: [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
