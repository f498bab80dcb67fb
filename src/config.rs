use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const KEY_DATA_DIR: &str = "data_dir";
pub const KEY_UPLOAD_DIR: &str = "upload_dir";
pub const KEY_BACKEND: &str = "backend";
pub const KEY_RESOLVE_BODY_PARTS: &str = "stats.resolve_body_parts";

pub const KNOWN_KEYS: [&str; 4] = [
    KEY_DATA_DIR,
    KEY_UPLOAD_DIR,
    KEY_BACKEND,
    KEY_RESOLVE_BODY_PARTS,
];

/// Flat key/value settings persisted as TOML.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub map: BTreeMap<String, String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join("ironlog").join("config.toml"))
            .context("Could not determine config directory")
    }

    /// A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to save config to {}", path.display()))
    }

    /// Reject values the typed settings could not use later.
    pub fn validate(key: &str, val: &str) -> Result<()> {
        match key {
            KEY_BACKEND => {
                Backend::from_str(val, true)
                    .map_err(|_| anyhow::anyhow!("backend must be `file` or `sqlite`, got `{val}`"))?;
            }
            KEY_RESOLVE_BODY_PARTS => {
                val.parse::<bool>()
                    .with_context(|| format!("`{key}` must be true or false"))?;
            }
            KEY_DATA_DIR | KEY_UPLOAD_DIR => {
                if val.trim().is_empty() {
                    bail!("`{key}` must not be empty");
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// One JSON file per collection
    #[default]
    File,
    /// A single SQLite database
    Sqlite,
}

/// Effective settings after layering command-line flags over the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub backend: Backend,
    pub resolve_body_parts: bool,
}

/// Flag values that win over the config file when present.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub backend: Option<Backend>,
}

impl Settings {
    pub fn resolve(cfg: &Config, overrides: &Overrides) -> Result<Self> {
        let data_dir = match (&overrides.data_dir, cfg.map.get(KEY_DATA_DIR)) {
            (Some(dir), _) => dir.clone(),
            (None, Some(dir)) => PathBuf::from(dir),
            (None, None) => dirs::data_dir()
                .map(|d| d.join("ironlog"))
                .unwrap_or_else(|| PathBuf::from("./data")),
        };

        let upload_dir = cfg
            .map
            .get(KEY_UPLOAD_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("uploads"));

        let backend = match (overrides.backend, cfg.map.get(KEY_BACKEND)) {
            (Some(b), _) => b,
            (None, Some(raw)) => Backend::from_str(raw, true)
                .map_err(|_| anyhow::anyhow!("config: unknown backend `{raw}`"))?,
            (None, None) => Backend::default(),
        };

        let resolve_body_parts = match cfg.map.get(KEY_RESOLVE_BODY_PARTS) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("config: `{KEY_RESOLVE_BODY_PARTS}` must be true or false"))?,
            None => false,
        };

        Ok(Self {
            data_dir,
            upload_dir,
            backend,
            resolve_body_parts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty_config() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert!(cfg.map.is_empty());
    }

    #[test]
    fn save_then_load_keeps_dotted_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ironlog").join("config.toml");

        let mut cfg = Config::default();
        cfg.map.insert(KEY_RESOLVE_BODY_PARTS.into(), "true".into());
        cfg.map.insert(KEY_BACKEND.into(), "sqlite".into());
        cfg.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.map, cfg.map);
    }

    #[test]
    fn flags_win_over_file() {
        let mut cfg = Config::default();
        cfg.map.insert(KEY_DATA_DIR.into(), "/srv/ironlog".into());
        cfg.map.insert(KEY_BACKEND.into(), "sqlite".into());

        let from_file = Settings::resolve(&cfg, &Overrides::default()).unwrap();
        assert_eq!(from_file.data_dir, PathBuf::from("/srv/ironlog"));
        assert_eq!(from_file.upload_dir, PathBuf::from("/srv/ironlog/uploads"));
        assert_eq!(from_file.backend, Backend::Sqlite);
        assert!(!from_file.resolve_body_parts);

        let overrides = Overrides {
            data_dir: Some(PathBuf::from("/tmp/x")),
            backend: Some(Backend::File),
        };
        let flagged = Settings::resolve(&cfg, &overrides).unwrap();
        assert_eq!(flagged.data_dir, PathBuf::from("/tmp/x"));
        assert_eq!(flagged.backend, Backend::File);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(Config::validate(KEY_BACKEND, "postgres").is_err());
        assert!(Config::validate(KEY_RESOLVE_BODY_PARTS, "yes").is_err());
        assert!(Config::validate(KEY_DATA_DIR, " ").is_err());
        assert!(Config::validate(KEY_RESOLVE_BODY_PARTS, "true").is_ok());

        let mut cfg = Config::default();
        cfg.map.insert(KEY_RESOLVE_BODY_PARTS.into(), "maybe".into());
        assert!(Settings::resolve(&cfg, &Overrides::default()).is_err());
    }
}
