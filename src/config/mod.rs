use crate::models::PlatformConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// File name of the platform configuration inside the plugin directory
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Prefix for environment overrides, e.g. `STORELINK_SERVER__SECRET_KEY`
pub const ENV_PREFIX: &str = "STORELINK";

/// Configuration manager for loading and saving the platform configuration.
///
/// Values come from `config.yml`, overridden by `STORELINK_*` environment variables
/// (nested keys separated by `__`). A default file is written on first load.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Plugin data directory (e.g., "mods/storelink")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
        })
    }

    /// Load the platform configuration, applying environment overrides.
    ///
    /// # Returns
    /// The loaded PlatformConfig, or defaults (also written to disk) if the file doesn't exist
    pub fn load_config(&self) -> Result<PlatformConfig> {
        self.load_with_environment(None)
    }

    /// Load using an explicit variable map instead of the process environment.
    pub fn load_config_with_env(&self, vars: ::config::Map<String, String>) -> Result<PlatformConfig> {
        self.load_with_environment(Some(vars))
    }

    fn load_with_environment(
        &self,
        vars: Option<::config::Map<String, String>>,
    ) -> Result<PlatformConfig> {
        let file_contents = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)
                .with_context(|| format!("Failed to read config: {}", self.config_path))?
        } else {
            tracing::warn!(
                "Config file not found at {}, generating defaults",
                self.config_path
            );
            self.save_config(&PlatformConfig::default())?;
            String::new()
        };

        let mut builder = ::config::Config::builder();
        if !file_contents.trim().is_empty() {
            builder = builder.add_source(::config::File::from_str(
                &file_contents,
                ::config::FileFormat::Yaml,
            ));
        }

        let environment = ::config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(vars);

        let config: PlatformConfig = builder
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?
            .try_deserialize()
            .with_context(|| format!("Invalid config values in {}", self.config_path))?;

        config
            .validate()
            .with_context(|| format!("Invalid config values in {}", self.config_path))?;

        tracing::info!("Loaded config from {}", self.config_path);
        Ok(config)
    }

    /// Save the platform configuration file.
    pub fn save_config(&self, config: &PlatformConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Persist a new secret key, keeping every other setting.
    ///
    /// Environment overrides are not written back.
    pub fn set_secret_key(&self, secret_key: &str) -> Result<PlatformConfig> {
        let mut config = if self.config_path.exists() {
            let file_contents = fs::read_to_string(&self.config_path)
                .with_context(|| format!("Failed to read config: {}", self.config_path))?;
            serde_yaml_ng::from_str(&file_contents)
                .with_context(|| format!("Failed to parse config: {}", self.config_path))?
        } else {
            PlatformConfig::default()
        };

        config.server.secret_key = secret_key.trim().to_string();
        self.save_config(&config)?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}
