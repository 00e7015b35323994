//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: `signet.toml`, `config.toml`
//! - `yaml-config`: `signet.yaml`, `signet.yml`, `config.yaml`, `config.yml`
//!
//! Both features can be enabled simultaneously; both formats are then
//! searched.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic merges ([`ConfigLoader::merge`])
//! 3. Profile-specific config file (`signet.{profile}.toml`)
//! 4. Main config file (`signet.toml`)
//! 5. Environment variables (`SIGNET_*`)
//!
//! The loaded configuration is validated before it is returned.
//!
//! # Environment Variable Mapping
//!
//! `SIGNET_` prefix, `__` as the nesting separator:
//!
//! - `SIGNET_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `SIGNET_DISPATCH__MODE=pool` → `dispatch.mode = "pool"`
//! - `SIGNET_ENVELOPE__LAYOUT=onebot-v11` → `envelope.layout = "onebot-v11"`
//!
//! # Example
//!
//! ```rust,ignore
//! use signet_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/signet.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::SignetConfig;
use super::validation::validate_config;

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Reads `SIGNET_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var("SIGNET_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }

    fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::parse(&profile.into());
        self
    }

    /// Adds a search path for configuration files.
    ///
    /// Without explicit search paths, the current directory and the user
    /// config directory (`~/.config/signet`) are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching. A missing file is an
    /// error.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges configuration programmatically, below files and environment.
    pub fn merge(mut self, config: SignetConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<SignetConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: SignetConfig = figment.extract()?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            dispatch_mode = ?config.dispatch.mode,
            envelope_layout = ?config.envelope.layout,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(SignetConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with SIGNET_ prefix");
            figment = figment.merge(
                Env::prefixed("SIGNET_")
                    .ignore(&["PROFILE"])
                    .split("__"),
            );
        }

        Ok(figment)
    }

    /// Merges a single config file, dispatching on its extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => {
                let _ = figment;
                Err(ConfigError::UnsupportedFormat(ext.to_string()))
            }
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("signet"));
        }
        paths
    }

    /// Searches `search_paths × base_names` for one format. A profile file
    /// is merged before its base file; the first base file found ends the
    /// search.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path =
                    search_path.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_fn(figment, &profile_path);
                }

                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    figment = merge_fn(figment, &base_path);
                    return (figment, true);
                }
            }
        }
        (figment, false)
    }

    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["signet.toml", "config.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["signet.yaml", "signet.yml", "config.yaml", "config.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!(paths = search_paths.len(), "No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<SignetConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from one file, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<SignetConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{DispatchMode, EnvelopeLayout, LogLevel};
    use figment::Jail;

    fn load_in(jail: &Jail) -> figment::error::Result<SignetConfig> {
        ConfigLoader::new()
            .search_path(jail.directory())
            .load()
            .map_err(|e| figment::Error::from(e.to_string()))
    }

    #[test]
    fn test_default_config() {
        Jail::expect_with(|jail| {
            let config = load_in(jail)?;
            assert_eq!(config, SignetConfig::default());
            assert_eq!(config.logging.level.as_str(), "info");
            assert_eq!(config.dispatch.queue_capacity, 1024);
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "signet.toml",
                r#"
                    [logging]
                    level = "debug"

                    [dispatch]
                    mode = "pool"
                    workers = 8
                "#,
            )?;
            jail.set_env("SIGNET_DISPATCH__WORKERS", "2");
            jail.set_env("SIGNET_ENVELOPE__LAYOUT", "onebot-v11");

            let config = load_in(jail)?;
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.dispatch.mode, DispatchMode::Pool);
            assert_eq!(config.dispatch.workers, 2);
            assert_eq!(config.envelope.layout, EnvelopeLayout::OnebotV11);
            Ok(())
        });
    }

    #[test]
    fn test_profile_file_is_below_base_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "signet.production.toml",
                "[dispatch]\nqueue_capacity = 16\nworkers = 3\n",
            )?;
            jail.create_file("signet.toml", "[dispatch]\nworkers = 5\n")?;

            let config = ConfigLoader::new()
                .profile("prod")
                .search_path(jail.directory())
                .load()
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.dispatch.queue_capacity, 16);
            assert_eq!(config.dispatch.workers, 5);
            Ok(())
        });
    }

    #[test]
    fn test_programmatic_merge_is_below_files_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file("signet.toml", "[dispatch]\nworkers = 5\n")?;
            jail.set_env("SIGNET_DISPATCH__QUEUE_CAPACITY", "32");

            let mut merged = SignetConfig::default();
            merged.dispatch.mode = DispatchMode::Pool;
            merged.dispatch.workers = 7;
            merged.dispatch.queue_capacity = 64;

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .merge(merged)
                .load()
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.dispatch.mode, DispatchMode::Pool);
            assert_eq!(config.dispatch.workers, 5);
            assert_eq!(config.dispatch.queue_capacity, 32);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        Jail::expect_with(|jail| {
            jail.set_env("SIGNET_DISPATCH__QUEUE_CAPACITY", "0");
            let result = ConfigLoader::new().search_path(jail.directory()).load();
            assert!(matches!(result, Err(ConfigError::Validation { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = ConfigLoader::new()
            .without_env()
            .file("/nonexistent/signet.toml")
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse("staging"), Profile::Custom("staging".into()));
    }
}
