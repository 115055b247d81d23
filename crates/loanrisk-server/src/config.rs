//! YAML configuration loading for the prediction service.
//!
//! Loads [`ServerConfig`] from a YAML file on disk, falling back to defaults
//! when no file is specified, then applies environment overrides.

use loanrisk_core::ServerConfig;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming the config file when no CLI argument is given.
pub const CONFIG_ENV: &str = "LOANRISK_CONFIG";

/// Load a [`ServerConfig`] from a YAML file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
    let config: ServerConfig = serde_yaml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {}", e))?;
    Ok(config)
}

/// Resolve the config file: explicit path first, then [`CONFIG_ENV`], else defaults.
pub fn resolve_config(cli_path: Option<String>) -> anyhow::Result<ServerConfig> {
    let config_path: Option<PathBuf> = cli_path
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .map(PathBuf::from);

    match config_path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration from file");
            load_config(&path)
        }
        None => {
            info!("No config file specified, using defaults");
            Ok(ServerConfig::default())
        }
    }
}

/// Apply `MODEL_PATH`, `DESCRIPTOR_PATH` (or `INFO_PATH`) and `PORT`.
///
/// `lookup` is usually `std::env::var(..).ok()`; tests pass a closure.
pub fn apply_env_overrides<F>(config: &mut ServerConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup("MODEL_PATH") {
        config.artifacts.model_path = path;
    }
    if let Some(path) = lookup("DESCRIPTOR_PATH").or_else(|| lookup("INFO_PATH")) {
        config.artifacts.descriptor_path = path;
    }
    if let Some(port) = lookup("PORT") {
        config.listen_addr = format!("0.0.0.0:{}", port.trim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loanrisk_core::SchemaPreset;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_yaml(yaml: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_config_full() {
        let yaml = r#"
listen_addr: "127.0.0.1:9090"
artifacts:
  model_path: "/models/model.json"
  descriptor_path: "/models/preprocessing.json"
input_schema: sample
max_batch_size: 10
include_probability: false
echo_features: true
logging:
  level: debug
  format: json
"#;
        let f = write_yaml(yaml);
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9090");
        assert_eq!(config.artifacts.model_path, "/models/model.json");
        assert_eq!(config.input_schema, SchemaPreset::Sample);
        assert_eq!(config.max_batch_size, 10);
        assert!(!config.include_probability);
        assert!(config.echo_features);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_config_partial_uses_defaults() {
        let f = write_yaml("max_batch_size: 5\n");
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.max_batch_size, 5);
        assert_eq!(config.listen_addr, "0.0.0.0:8000");
        assert_eq!(config.artifacts.descriptor_path, "preprocessing.json");
        assert_eq!(config.input_schema, SchemaPreset::Mortgage);
        assert!(config.include_probability);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let f = write_yaml("not: [valid: yaml: {{{}}}");
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn test_resolve_config_prefers_cli_path() {
        let f = write_yaml("listen_addr: \"127.0.0.1:1234\"\n");
        let config = resolve_config(Some(f.path().display().to_string())).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:1234");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MODEL_PATH", "/m.json"),
            ("INFO_PATH", "/info.json"),
            ("PORT", "9000"),
        ]
        .into_iter()
        .collect();
        let mut config = ServerConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.artifacts.model_path, "/m.json");
        assert_eq!(config.artifacts.descriptor_path, "/info.json");
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
    }

    #[test]
    fn test_descriptor_path_wins_over_alias() {
        let mut config = ServerConfig::default();
        apply_env_overrides(&mut config, |k| match k {
            "DESCRIPTOR_PATH" => Some("/d.json".to_string()),
            "INFO_PATH" => Some("/i.json".to_string()),
            _ => None,
        });
        assert_eq!(config.artifacts.descriptor_path, "/d.json");
        assert_eq!(config.artifacts.model_path, "model.json");
    }
}
