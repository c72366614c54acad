//! Configuration paths

use std::path::{Path, PathBuf};

const APP_DIR: &str = "lineagent";
const CONFIG_FILES: [&str; 2] = ["config.toml", "config.json"];

/// Directory holding the config file. `LINEAGENT_CONFIG_DIR` overrides the XDG location.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LINEAGENT_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".lineagent"))
}

/// Config file to load
///
/// `LINEAGENT_CONFIG` wins; otherwise the first of `config.toml` or
/// `config.json` that exists in the config dir, defaulting to `config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("LINEAGENT_CONFIG") {
        return PathBuf::from(path);
    }
    find_config_in(&config_dir())
}

fn find_config_in(dir: &Path) -> PathBuf {
    CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.exists())
        .unwrap_or_else(|| dir.join(CONFIG_FILES[0]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_toml_then_json() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_config_in(dir.path()), dir.path().join("config.toml"));

        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        assert_eq!(find_config_in(dir.path()), dir.path().join("config.json"));

        std::fs::write(dir.path().join("config.toml"), "").unwrap();
        assert_eq!(find_config_in(dir.path()), dir.path().join("config.toml"));
    }
}
