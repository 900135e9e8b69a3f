use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::keys::KeyConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fallback samples root when neither `--root` nor the user row has one.
    pub root: Option<PathBuf>,
    /// User to launch with when `--user` is absent.
    pub user: Option<String>,
    pub keys: KeyConfig,
}

impl AppConfig {
    /// Resolve (and create) the data directory named by `--data`.
    pub fn data_dir(flag: &str) -> PathBuf {
        let dir = expand_home(flag);
        if !dir.exists() {
            if let Err(err) = fs::create_dir_all(&dir) {
                warn!(dir = %dir.display(), %err, "could not create data directory");
            }
        }
        dir
    }

    /// Load `config.toml` from the data directory, writing the defaults on
    /// first run so there is always a file to edit.
    pub fn load(data_dir: &Path) -> AppConfig {
        let path = data_dir.join("config.toml");
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(err) => warn!(%err, "config.toml is invalid, using defaults"),
                },
                Err(err) => warn!(%err, "could not read config.toml, using defaults"),
            }
            return AppConfig::default();
        }
        let config = AppConfig::default();
        match toml::to_string_pretty(&config) {
            Ok(content) => {
                if let Err(err) = fs::write(&path, content) {
                    warn!(%err, "could not write default config.toml");
                }
            }
            Err(err) => warn!(%err, "could not serialize default config"),
        }
        config
    }
}

/// `~` and `~/...` expansion for paths typed at prompts or flags.
pub fn expand_home(input: &str) -> PathBuf {
    if input == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    }
    if let Some(rest) = input.strip_prefix("~/") {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        return home.join(rest);
    }
    PathBuf::from(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_expansion_leaves_plain_paths_alone() {
        assert_eq!(expand_home("/srv/samples"), PathBuf::from("/srv/samples"));
        assert_eq!(expand_home("relative/dir"), PathBuf::from("relative/dir"));
    }

    #[test]
    fn home_expansion_replaces_tilde() {
        let expanded = expand_home("~/samples");
        assert!(!expanded.to_string_lossy().contains('~'));
        assert!(expanded.ends_with("samples"));
    }

    #[test]
    fn load_writes_defaults_on_first_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig::load(dir.path());
        assert!(config.root.is_none());
        assert!(dir.path().join("config.toml").exists());
        // And reads back what it wrote.
        let again = AppConfig::load(dir.path());
        assert_eq!(again.keys.quit, config.keys.quit);
    }
}
