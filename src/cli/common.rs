//! Shared CLI helpers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use banterbot::config::Config;

/// Expand `~/` prefix to the user's home directory.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Load config from `path` (defaults if missing) and start logging with its
/// settings.
pub(crate) fn load_config_and_logging(path: &Path) -> Result<Config> {
    let config = Config::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    banterbot::utils::logging::init_logging(&config.logging)
        .with_context(|| "Failed to initialize logging")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde_plain_path() {
        assert_eq!(expand_tilde("/etc/bb.json"), PathBuf::from("/etc/bb.json"));
        assert_eq!(expand_tilde("rel/bb.json"), PathBuf::from("rel/bb.json"));
    }

    #[test]
    fn test_expand_tilde_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/bb.json"), home.join("bb.json"));
            assert_eq!(expand_tilde("~"), home);
        }
    }
}
