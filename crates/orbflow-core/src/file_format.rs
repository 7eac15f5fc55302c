//! On-disk formats for configuration and preset files.
//!
//! The format is picked from the file extension: `.ron`, `.json` or `.toml`.
//! A missing extension is treated as RON.

use crate::{CoreError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Maximum allowed size for config and preset files (1 MiB).
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Serialization format of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Rusty Object Notation
    Ron,
    /// JSON
    Json,
    /// TOML
    Toml,
}

impl FileFormat {
    /// Determine the format from a path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("ron");

        match extension {
            "ron" => Ok(Self::Ron),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            other => Err(CoreError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Deserialize a value from a string in this format
    pub fn parse<T: DeserializeOwned>(self, content: &str) -> Result<T> {
        match self {
            Self::Ron => Ok(ron::from_str(content)?),
            Self::Json => Ok(serde_json::from_str(content)?),
            Self::Toml => Ok(toml::from_str(content)?),
        }
    }

    /// Serialize a value to a pretty-printed string in this format
    pub fn render<T: Serialize>(self, value: &T) -> Result<String> {
        match self {
            Self::Ron => Ok(ron::ser::to_string_pretty(
                value,
                ron::ser::PrettyConfig::default(),
            )?),
            Self::Json => Ok(serde_json::to_string_pretty(value)?),
            Self::Toml => Ok(toml::to_string_pretty(value)?),
        }
    }
}

/// Load a value from `path`, choosing the format by extension.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    load_with_limit(path, MAX_FILE_SIZE)
}

pub(crate) fn load_with_limit<T: DeserializeOwned>(path: &Path, limit: u64) -> Result<T> {
    let format = FileFormat::from_path(path)?;

    let size = fs::metadata(path)?.len();
    if size > limit {
        return Err(CoreError::FileTooLarge { size, limit });
    }

    let content = fs::read_to_string(path)?;
    format.parse(&content)
}

/// Save a value to `path`, choosing the format by extension.
pub fn save<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let format = FileFormat::from_path(path)?;
    let content = format.render(value)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        gain: f32,
    }

    fn sample() -> Sample {
        Sample {
            name: "kick".to_string(),
            gain: 1.5,
        }
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            FileFormat::from_path(Path::new("a.ron")).unwrap(),
            FileFormat::Ron
        );
        assert_eq!(
            FileFormat::from_path(Path::new("a.json")).unwrap(),
            FileFormat::Json
        );
        assert_eq!(
            FileFormat::from_path(Path::new("a.toml")).unwrap(),
            FileFormat::Toml
        );
        assert_eq!(
            FileFormat::from_path(Path::new("no_extension")).unwrap(),
            FileFormat::Ron
        );
        assert!(matches!(
            FileFormat::from_path(Path::new("a.txt")),
            Err(CoreError::UnsupportedFormat(ext)) if ext == "txt"
        ));
    }

    #[test]
    fn test_save_and_load_each_format() {
        let dir = tempdir().unwrap();
        for name in ["sample.ron", "sample.json", "sample.toml"] {
            let path = dir.path().join(name);
            save(&sample(), &path).unwrap();
            let loaded: Sample = load(&path).unwrap();
            assert_eq!(loaded, sample(), "format {}", name);
        }
    }

    #[test]
    fn test_load_file_too_large() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.json");
        fs::write(&path, vec![b' '; 1024]).unwrap();

        let result: Result<Sample> = load_with_limit(&path, 500);
        match result {
            Err(CoreError::FileTooLarge { size, limit }) => {
                assert_eq!(size, 1024);
                assert_eq!(limit, 500);
            }
            other => panic!("expected FileTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result: Result<Sample> = load(&dir.path().join("missing.ron"));
        assert!(matches!(result, Err(CoreError::Io(_))));
    }
}
