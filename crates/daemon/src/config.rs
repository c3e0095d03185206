//! Daemon configuration
//!
//! Layers (later wins): built-in defaults, optional TOML file at `$STUDIO_CONFIG`,
//! then `STUDIO_*` environment variables with `__` between nested keys
//! (e.g. `STUDIO_QUEUE__MAX_SIZE=5`, `STUDIO_IMAGE_API__API_KEY=sk-...`).

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use studio_api_rpc::RpcServerConfig;
use studio_core::application::ProcessorConfig;
use studio_core::domain::DEFAULT_MAX_QUEUE_SIZE;
use studio_infra_http::ImageApiConfig;

const CONFIG_PATH_ENV: &str = "STUDIO_CONFIG";
const ENV_PREFIX: &str = "STUDIO";
const DEFAULT_DB_PATH: &str = "~/.studio/studio.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
    pub host: String,
    pub port: u16,
}

impl Default for RpcSettings {
    fn default() -> Self {
        let defaults = RpcServerConfig::default();
        Self {
            host: defaults.host,
            port: defaults.port,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub max_size: usize,
    pub usage_feature: String,
    pub generation_timeout_secs: Option<u64>,
}

impl Default for QueueSettings {
    fn default() -> Self {
        let defaults = ProcessorConfig::default();
        Self {
            max_size: DEFAULT_MAX_QUEUE_SIZE,
            usage_feature: defaults.usage_feature,
            generation_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageApiSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub style_prefix: Option<String>,
}

impl Default for ImageApiSettings {
    fn default() -> Self {
        let defaults = ImageApiConfig::default();
        Self {
            base_url: defaults.base_url,
            api_key: defaults.api_key,
            model: defaults.model,
            style_prefix: defaults.style_prefix,
        }
    }
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub db_path: String,
    pub rpc: RpcSettings,
    pub queue: QueueSettings,
    pub image_api: ImageApiSettings,
    pub log_format: LogFormat,
    pub log_dir: Option<String>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            rpc: RpcSettings::default(),
            queue: QueueSettings::default(),
            image_api: ImageApiSettings::default(),
            log_format: LogFormat::default(),
            log_dir: None,
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl StudioConfig {
    /// Load from `$STUDIO_CONFIG` (if set) and the process environment
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = shellexpand::tilde(&path).into_owned();
            builder = builder.add_source(File::with_name(&path).required(true));
        }

        Self::build(builder.add_source(env_source()))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Database path with `~` expanded
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).into_owned())
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log_dir
            .as_deref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).into_owned()))
    }

    pub fn rpc_config(&self) -> RpcServerConfig {
        RpcServerConfig {
            host: self.rpc.host.clone(),
            port: self.rpc.port,
        }
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            max_queue_size: self.queue.max_size,
            usage_feature: self.queue.usage_feature.clone(),
            generation_timeout: self.queue.generation_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn image_api_config(&self) -> ImageApiConfig {
        ImageApiConfig {
            base_url: self.image_api.base_url.clone(),
            api_key: self.image_api.api_key.clone(),
            model: self.image_api.model.clone(),
            style_prefix: self.image_api.style_prefix.clone(),
        }
    }
}
