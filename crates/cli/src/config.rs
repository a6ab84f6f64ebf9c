//! Configuration loading for the hotline CLI
//!
//! Reads `~/.hotline/config.toml` (or `--config`), then applies `HOTLINE_*`
//! environment overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hotline::HotlineConfig;

/// Default location of the config file
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hotline")
        .join("config.toml")
}

/// Parse a config file; a missing file yields defaults
pub fn load_file(path: &Path) -> Result<HotlineConfig> {
    if !path.exists() {
        return Ok(HotlineConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: HotlineConfig =
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))?;
    Ok(config)
}

/// File config with environment overrides on top
pub fn load(path: Option<&Path>) -> Result<HotlineConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    let mut config = load_file(&path)?;
    config.apply_env();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_file(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.backend.url, "http://localhost:8000");
        assert!(config.speech.use_remote_synthesis);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[backend]
url = "http://hotline.local:9000"

[speech]
useRemoteSynthesis = false
voice = "oksana"

[call]
pickupMs = 0
"#,
        )
        .unwrap();

        let config = load_file(&path).unwrap();

        assert_eq!(config.backend.url, "http://hotline.local:9000");
        assert_eq!(config.backend.health_interval_secs, 10);
        assert!(!config.speech.use_remote_synthesis);
        assert_eq!(config.speech.voice, "oksana");
        assert_eq!(config.speech.remote_timeout_ms, 8000);
        assert_eq!(config.call.pickup_ms, 0);
        assert_eq!(config.call.respond_ms, 800);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[backend\nurl = ").unwrap();

        assert!(load_file(&path).is_err());
    }
}
