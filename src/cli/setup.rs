use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");

/// Writes the example xrate config (base currency, cache TTL and an
/// exchangerate-api provider without a key) to the platform config directory.
pub fn setup() -> Result<()> {
    let path = AppConfig::default_config_path()?;
    let written = setup_at_path(path)?;
    println!("Wrote {}", written.display());
    println!("Set providers.exchange_rate.api_key to fetch live rates; until then fallback rates are used.");
    Ok(())
}

/// Writes the example config to `path`, refusing to replace an existing file.
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();

    if path.exists() {
        anyhow::bail!("xrate config already exists at {}", path.display());
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    }

    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write xrate config to {}", path.display()))?;

    info!(path = %path.display(), "Created example xrate config");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_setup_writes_example_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("xrate").join("config.yaml");

        let written = setup_at_path(&config_path)?;

        assert_eq!(written, config_path);
        let content = fs::read_to_string(&config_path)?;
        assert!(content.contains("# Example configuration file for xrate"));
        assert!(content.contains("base_currency:"));
        assert!(content.contains("exchange_rate:"));

        // The written file loads back as a config
        let config = AppConfig::load_from_path(&config_path)?;
        assert_eq!(config.base_currency, "USD");

        Ok(())
    }

    #[test]
    fn test_setup_keeps_existing_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "base_currency: KES\n")?;

        let result = setup_at_path(&config_path);
        assert!(result.unwrap_err().to_string().contains("already exists"));
        assert_eq!(fs::read_to_string(&config_path)?, "base_currency: KES\n");

        Ok(())
    }

    #[test]
    fn test_example_config_runs_offline_until_keyed() -> Result<()> {
        let config: AppConfig = serde_yaml::from_str(EXAMPLE_CONFIG)
            .context("Failed to parse example config as YAML")?;

        assert_eq!(config.cache_ttl_secs, 3600);
        let provider = config
            .providers
            .exchange_rate
            .context("example config should name a provider")?;
        assert!(provider.api_key.is_none());
        assert!(!provider.is_usable());

        Ok(())
    }
}
