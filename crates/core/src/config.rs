//! Flat `key = value` config file format shared by module config files and
//! the config-persistence observer (spec §4.7, §9 "Configuration as data").
//!
//! Grounded on the teacher's module/spec directory readers
//! (`sup/src/manager/spec_dir.rs`, `spec_path.rs`), which resolve a
//! writable on-disk record for each unit they manage; here the record is a
//! small textual key-value map instead of a TOML spec file, per spec §4.4.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// An ordered flat key-value record, as read from or written to a module's
/// config file. Ordering is preserved on write so re-serializing an
/// unmodified record is a no-op diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatConfig(BTreeMap<String, String>);

impl FlatConfig {
    pub fn new() -> Self {
        FlatConfig(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| match v.trim() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        })
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Parses `key = value` lines; blank lines and lines starting with `#`
    /// (after leading whitespace) are ignored, matching the teacher's
    /// colocated module config format (spec §4.4).
    pub fn parse(text: &str) -> Self {
        let mut map = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                map.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        FlatConfig(map)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.0 {
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(value);
            out.push('\n');
        }
        out
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    /// Writes the record back to disk. Callers serialize writes through a
    /// single writer lock per spec §5 ("Config files: writes are serialized
    /// by a module-local writer lock held by the persistence observer");
    /// this function itself does no locking.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_text()).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comments_and_blank_lines() {
        let text = "\n# a comment\nenabled = true\n\ndisplay_name = GPS Tracker\n";
        let cfg = FlatConfig::parse(text);
        assert_eq!(cfg.get("enabled"), Some("true"));
        assert_eq!(cfg.get_bool("enabled"), Some(true));
        assert_eq!(cfg.get("display_name"), Some("GPS Tracker"));
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("module.conf");
        let mut cfg = FlatConfig::new();
        cfg.set("enabled", "false");
        cfg.set("visible", "true");
        cfg.save(&path).unwrap();

        let reloaded = FlatConfig::load(&path).unwrap();
        assert_eq!(reloaded.get_bool("enabled"), Some(false));
        assert_eq!(reloaded.get_bool("visible"), Some(true));
    }
}
