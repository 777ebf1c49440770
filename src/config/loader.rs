//! Multi-source config loading.
//!
//! Priority, highest first: CLI flags (applied by the caller), environment
//! variables, an explicit `--config` file, the per-user config file,
//! built-in defaults.

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use super::schema::ImpactConfig;

pub const ENV_HOST: &str = "DATABRICKS_HOST";
pub const ENV_TOKEN: &str = "DATABRICKS_TOKEN";
pub const ENV_PACING_MS: &str = "LINEAGE_IMPACT_PACING_MS";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Per-user config file location (`<config dir>/lineage-impact/config.yaml`).
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "lineage-impact")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// Load configuration from files and the process environment.
///
/// An explicit path must exist; the per-user file is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<ImpactConfig, ConfigError> {
    let user = user_config_path().filter(|path| path.is_file());
    let mut config = load_files(user.as_deref(), explicit)?;
    apply_env(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Parse the user file, then overlay the explicit file key by key.
///
/// Keys absent from both fall back to defaults.
pub fn load_files(
    user: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<ImpactConfig, ConfigError> {
    let mut merged = Value::Null;
    let mut last = None;
    for path in [user, explicit].into_iter().flatten() {
        merge(&mut merged, read_value(path)?);
        last = Some(path);
    }

    match last {
        Some(path) if !merged.is_null() => {
            serde_yaml::from_value(merged).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => Ok(ImpactConfig::default()),
    }
}

fn read_value(path: &Path) -> Result<Value, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Recursive mapping merge; `overlay` wins on scalar conflicts.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                if let Some(existing) = base.get_mut(&key) {
                    merge(existing, value);
                } else {
                    base.insert(key, value);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Overlay environment variables. Empty values are ignored.
pub fn apply_env<F>(config: &mut ImpactConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(host) = get(ENV_HOST) {
        config.catalog.host = Some(host);
    }
    if let Some(token) = get(ENV_TOKEN) {
        config.catalog.token = Some(token);
    }
    if let Some(raw) = get(ENV_PACING_MS) {
        config.crawl.pacing_ms = raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: ENV_PACING_MS,
            value: raw.clone(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn reads_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("impact.yaml");
        std::fs::write(&path, "catalog:\n  host: https://h.example\ncrawl:\n  pacing_ms: 5\n")
            .unwrap();

        let config = load_files(None, Some(&path)).unwrap();
        assert_eq!(config.catalog.host.as_deref(), Some("https://h.example"));
        assert_eq!(config.crawl.pacing_ms, 5);
    }

    #[test]
    fn empty_file_is_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.yaml");
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(load_files(None, Some(&path)).unwrap(), ImpactConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_files(None, Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "crawl: [1, 2").unwrap();
        let err = load_files(None, Some(&path)).unwrap_err();
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn explicit_file_overlays_user_file() {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("user.yaml");
        let explicit = dir.path().join("x.yaml");
        std::fs::write(
            &user,
            "catalog:\n  host: https://from-user-file\n  max_retries: 7\ncrawl:\n  pacing_ms: 900\n",
        )
        .unwrap();
        std::fs::write(&explicit, "catalog:\n  max_retries: 1\ncrawl:\n  pacing_ms: 5\n").unwrap();

        let config = load_files(Some(&user), Some(&explicit)).unwrap();
        assert_eq!(config.catalog.host.as_deref(), Some("https://from-user-file"));
        assert_eq!(config.catalog.max_retries, 1);
        assert_eq!(config.crawl.pacing_ms, 5);
        assert_eq!(config.catalog.timeout_secs, ImpactConfig::default().catalog.timeout_secs);
    }

    #[test]
    fn empty_explicit_file_keeps_user_values() {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("user.yaml");
        let explicit = dir.path().join("x.yaml");
        std::fs::write(&user, "crawl:\n  pacing_ms: 900\n").unwrap();
        std::fs::write(&explicit, "").unwrap();

        let config = load_files(Some(&user), Some(&explicit)).unwrap();
        assert_eq!(config.crawl.pacing_ms, 900);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn load_config_merges_user_config_dir() {
        let dir = TempDir::new().unwrap();
        let user_dir = dir.path().join("lineage-impact");
        std::fs::create_dir_all(&user_dir).unwrap();
        std::fs::write(
            user_dir.join("config.yaml"),
            "catalog:\n  host: https://from-user-file\n",
        )
        .unwrap();
        let explicit = dir.path().join("x.yaml");
        std::fs::write(&explicit, "crawl:\n  pacing_ms: 5\n").unwrap();

        std::env::set_var("XDG_CONFIG_HOME", dir.path());
        let from_user = load_config(None);
        let layered = load_config(Some(&explicit));
        std::env::remove_var("XDG_CONFIG_HOME");

        // Environment overrides may apply on a developer machine.
        let host_env = std::env::var(ENV_HOST).ok().filter(|v| !v.trim().is_empty());
        let expected_host = host_env.as_deref().unwrap_or("https://from-user-file");
        assert_eq!(from_user.unwrap().catalog.host.as_deref(), Some(expected_host));

        let layered = layered.unwrap();
        assert_eq!(layered.catalog.host.as_deref(), Some(expected_host));
        if std::env::var(ENV_PACING_MS).is_err() {
            assert_eq!(layered.crawl.pacing_ms, 5);
        }
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = ImpactConfig::default();
        config.catalog.host = Some("https://from-file".into());

        apply_env(
            &mut config,
            env(&[
                (ENV_HOST, "https://from-env"),
                (ENV_TOKEN, "dapi-env"),
                (ENV_PACING_MS, "75"),
            ]),
        )
        .unwrap();

        assert_eq!(config.catalog.host.as_deref(), Some("https://from-env"));
        assert_eq!(config.catalog.token.as_deref(), Some("dapi-env"));
        assert_eq!(config.crawl.pacing_ms, 75);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = ImpactConfig::default();
        config.catalog.host = Some("https://keep".into());
        apply_env(&mut config, env(&[(ENV_HOST, "  ")])).unwrap();
        assert_eq!(config.catalog.host.as_deref(), Some("https://keep"));
    }

    #[test]
    fn bad_pacing_env_is_rejected() {
        let mut config = ImpactConfig::default();
        let err = apply_env(&mut config, env(&[(ENV_PACING_MS, "fast")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ENV_PACING_MS, .. }));
    }
}
