//! Load `.up-restutil.toml` (CLI only). Library callers pass options directly.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct RestutilToml {
    #[serde(default)]
    pub settings: Settings,
}

/// Values a config file may provide. Each command reads only the keys it accepts;
/// any value given on the command line wins.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Settings {
    pub user: Option<String>,
    pub pass: Option<String>,
    pub concurrency: Option<usize>,
    /// put-binary-resources GETs per second; 0 or less disables the limiter.
    pub binary_throttle: Option<i64>,
    /// dump-resources GETs per second; must be at least 1.
    pub dump_throttle: Option<i64>,
    pub socks_proxy: Option<String>,
    pub dump_failed: Option<bool>,
    pub retries: Option<u32>,
    pub min_exec_time: Option<u64>,
    pub progress: Option<bool>,
}

pub fn parse_settings(s: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str::<RestutilToml>(s).map(|file| file.settings)
}

/// Load settings from `explicit`, else from the package config file in `dir` if present.
///
/// An explicitly named file must exist and parse. The implicit file is optional; when it is
/// unreadable or malformed it is ignored with a warning.
pub fn load_settings(explicit: Option<&Path>, dir: &Path) -> Result<Settings> {
    if let Some(path) = explicit {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        return parse_settings(&s).with_context(|| format!("parse config {}", path.display()));
    }
    let path: PathBuf = dir.join(PackagePaths::get().config_filename());
    let Ok(s) = std::fs::read_to_string(&path) else {
        return Ok(Settings::default());
    };
    Ok(parse_settings(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings_partial() {
        let settings = parse_settings(
            r#"
            [settings]
            user = "writer"
            concurrency = 4
            dump_failed = true
            "#,
        )
        .unwrap();
        assert_eq!(settings.user.as_deref(), Some("writer"));
        assert_eq!(settings.concurrency, Some(4));
        assert_eq!(settings.dump_failed, Some(true));
        assert!(settings.pass.is_none());
        assert!(settings.binary_throttle.is_none());
        assert!(settings.dump_throttle.is_none());
    }

    #[test]
    fn test_parse_settings_throttle_per_command() {
        let settings =
            parse_settings("[settings]\nbinary_throttle = 0\ndump_throttle = 25\n").unwrap();
        assert_eq!(settings.binary_throttle, Some(0));
        assert_eq!(settings.dump_throttle, Some(25));
    }

    #[test]
    fn test_parse_settings_empty_file() {
        let settings = parse_settings("").unwrap();
        assert!(settings.concurrency.is_none());
    }

    #[test]
    fn test_parse_settings_rejects_wrong_type() {
        assert!(parse_settings("[settings]\nconcurrency = \"many\"\n").is_err());
    }
}
