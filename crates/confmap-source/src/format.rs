//! Configuration file formats.

use std::fmt;
use std::path::Path;

use confmap_core::Value;

use crate::SourceError;

/// A text format the sources can parse into a [`Value`] tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// `.toml`
    Toml,
    /// `.json`
    Json,
    /// `.yaml` / `.yml`
    #[cfg(feature = "yaml")]
    Yaml,
}

impl Format {
    /// File extensions with a parser in this build.
    #[cfg(not(feature = "yaml"))]
    pub const EXTENSIONS: &'static [&'static str] = &["toml", "json"];

    /// File extensions with a parser in this build.
    #[cfg(feature = "yaml")]
    pub const EXTENSIONS: &'static [&'static str] = &["toml", "json", "yaml", "yml"];

    /// Picks the format from a file extension, case-insensitively.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Picks the format of a file path.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| SourceError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
    }

    /// Format name used in messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            #[cfg(feature = "yaml")]
            Self::Yaml => "YAML",
        }
    }

    /// Parses `text` into a value tree. `name` identifies the configuration in
    /// errors.
    pub fn parse(self, name: &str, text: &str) -> Result<Value, SourceError> {
        match self {
            Self::Toml => toml::from_str(text).map_err(|e| SourceError::parse(name, self.name(), e)),
            Self::Json => {
                serde_json::from_str(text).map_err(|e| SourceError::parse(name, self.name(), e))
            }
            #[cfg(feature = "yaml")]
            Self::Yaml => {
                serde_yaml::from_str(text).map_err(|e| SourceError::parse(name, self.name(), e))
            }
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_path() {
        assert_eq!(Format::from_path(Path::new("redis.toml")).unwrap(), Format::Toml);
        assert_eq!(Format::from_path(Path::new("conf/ORM.JSON")).unwrap(), Format::Json);

        let err = Format::from_path(Path::new("settings.ini")).unwrap_err();
        assert!(matches!(
            err,
            SourceError::UnsupportedFormat { path } if path == PathBuf::from("settings.ini")
        ));
        assert!(Format::from_path(Path::new("Makefile")).is_err());
    }

    #[test]
    fn test_parse_toml() {
        let value = Format::Toml
            .parse("redis.toml", "hostPort = \"127.0.0.1:6379\"\n[pool]\nsize = 4\n")
            .unwrap();

        assert_eq!(value.get("HOSTPORT").and_then(Value::as_str), Some("127.0.0.1:6379"));
        assert_eq!(
            value.get("pool").and_then(|p| p.get("size")).and_then(Value::as_i64),
            Some(4)
        );
    }

    #[test]
    fn test_parse_json() {
        let value = Format::Json
            .parse("orm.json", r#"{"dsn": "postgres://", "replicas": [1, 2]}"#)
            .unwrap();
        assert_eq!(value.get("dsn").and_then(Value::as_str), Some("postgres://"));
        assert_eq!(value.get("replicas").and_then(Value::as_seq).map(<[Value]>::len), Some(2));
    }

    #[test]
    fn test_parse_error_names_format() {
        let err = Format::Json.parse("orm.json", "{not json").unwrap_err();
        match err {
            SourceError::Parse { name, format, .. } => {
                assert_eq!(name, "orm.json");
                assert_eq!(format, "JSON");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_parse_yaml() {
        assert_eq!(Format::from_path(Path::new("cache.yml")).unwrap(), Format::Yaml);
        let value = Format::Yaml
            .parse("cache.yml", "ttl: 30\nhosts:\n  - a\n  - b\n")
            .unwrap();
        assert_eq!(value.get("ttl").and_then(Value::as_i64), Some(30));
    }
}
