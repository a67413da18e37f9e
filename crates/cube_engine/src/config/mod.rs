//! Configuration system
//!
//! Parameter trees are plain `serde` types. The file extension picks the
//! format: `.ron` or `.toml`.

use std::path::Path;

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents, Format::from_path(path)?)
    }

    /// Parse configuration text in the given format
    fn parse(contents: &str, format: Format) -> Result<Self, ConfigError> {
        match format {
            Format::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Render configuration text in the given format
    fn render(&self, format: Format) -> Result<String, ConfigError> {
        match format {
            Format::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
            }
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = self.render(Format::from_path(path)?)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// TOML
    Toml,
    /// Rusty Object Notation
    Ron,
}

impl Format {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Parsed fine but the values are unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        speed: f64,
    }

    impl Config for Sample {}

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a/b.toml")).ok(), Some(Format::Toml));
        assert_eq!(Format::from_path(Path::new("params.ron")).ok(), Some(Format::Ron));
        assert!(matches!(
            Format::from_path(Path::new("params.json")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_text_round_trip_in_both_formats() {
        let sample = Sample { name: "parade".into(), speed: 0.5 };
        for format in [Format::Toml, Format::Ron] {
            let text = sample.render(format).expect("render");
            assert_eq!(Sample::parse(&text, format).expect("parse"), sample);
        }
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(matches!(
            Sample::parse("speed = \"fast\"", Format::Toml),
            Err(ConfigError::Parse(_))
        ));
    }
}
