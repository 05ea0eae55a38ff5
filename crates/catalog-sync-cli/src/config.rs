use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use catalog_sync::SyncSettings;

const API_KEY_VAR: &str = "INKSOFT_API_KEY";

/// Config file path: `~/.config/catalog-sync/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("catalog-sync").join("config.toml"))
}

/// Load settings from `explicit` or the default path.
///
/// A missing default file means defaults. A missing explicit file, or a file
/// that does not parse, is an error.
pub fn load_settings(explicit: Option<&Path>) -> Result<SyncSettings> {
    let settings = match explicit {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config at {}", path.display()))?;
            parse_settings(&contents)
                .with_context(|| format!("failed to parse config at {}", path.display()))?
        }
        None => match config_path() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config at {}", path.display()))?;
                parse_settings(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))?
            }
            _ => SyncSettings::default(),
        },
    };

    Ok(with_env_key(settings, std::env::var(API_KEY_VAR).ok()))
}

fn parse_settings(contents: &str) -> Result<SyncSettings> {
    Ok(toml::from_str(contents)?)
}

/// A non-blank key from the environment wins over the file.
fn with_env_key(mut settings: SyncSettings, key: Option<String>) -> SyncSettings {
    if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
        settings.api_key = Some(key);
    }
    settings
}
