// src/core/config_manager.rs
//! Configuration: built-in defaults, then an optional `intowork.yaml`, then
//! environment variables

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "intowork.yaml";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub site_origin: String,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub log_file: PathBuf,
    pub debounce_ms: u64,
    pub request_timeout_secs: Option<u64>,
    pub clipboard_command: Option<String>,
    /// Open printable HTML in the default browser
    pub open_browser: bool,
    /// Bearer token from the auth provider; absent means anonymous
    pub token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".to_string(),
            site_origin: "http://localhost:3000".to_string(),
            data_dir: PathBuf::from(".intowork"),
            output_dir: PathBuf::from("out"),
            log_file: PathBuf::from("/tmp/intowork-cv.log"),
            debounce_ms: 2000,
            request_timeout_secs: None,
            clipboard_command: None,
            open_browser: true,
            token: None,
        }
    }
}

impl AppConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// One environment section of the YAML file; every key optional
#[derive(Debug, Clone, Default, Deserialize)]
struct FileSection {
    api_url: Option<String>,
    site_origin: Option<String>,
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    log_file: Option<PathBuf>,
    debounce_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    clipboard_command: Option<String>,
    open_browser: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    local: FileSection,
    #[serde(default)]
    production: FileSection,
}

pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration for the current environment
    pub fn load() -> Result<AppConfig> {
        let environment = Self::get_environment();

        let mut config = AppConfig::default();
        let path = PathBuf::from(CONFIG_FILE);
        if path.exists() {
            let section = Self::load_file(&path, &environment)?;
            Self::apply_file(&mut config, section);
        }
        Self::apply_env(&mut config, |key| std::env::var(key).ok())?;

        config.data_dir = Self::resolve_path(&config.data_dir)?;
        config.output_dir = Self::resolve_path(&config.output_dir)?;
        Ok(config)
    }

    pub fn get_environment() -> String {
        std::env::var("INTOWORK_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    fn load_file(path: &Path, environment: &str) -> Result<FileSection> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse_file(&content, environment)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn parse_file(content: &str, environment: &str) -> Result<FileSection> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        Ok(match environment {
            "production" => file.production,
            _ => file.local,
        })
    }

    fn apply_file(config: &mut AppConfig, section: FileSection) {
        if let Some(v) = section.api_url {
            config.api_url = v;
        }
        if let Some(v) = section.site_origin {
            config.site_origin = v;
        }
        if let Some(v) = section.data_dir {
            config.data_dir = v;
        }
        if let Some(v) = section.output_dir {
            config.output_dir = v;
        }
        if let Some(v) = section.log_file {
            config.log_file = v;
        }
        if let Some(v) = section.debounce_ms {
            config.debounce_ms = v;
        }
        if section.request_timeout_secs.is_some() {
            config.request_timeout_secs = section.request_timeout_secs;
        }
        if section.clipboard_command.is_some() {
            config.clipboard_command = section.clipboard_command;
        }
        if let Some(v) = section.open_browser {
            config.open_browser = v;
        }
    }

    fn apply_env(config: &mut AppConfig, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = var("INTOWORK_API_URL") {
            config.api_url = v;
        }
        if let Some(v) = var("INTOWORK_SITE_ORIGIN") {
            config.site_origin = v;
        }
        if let Some(v) = var("INTOWORK_DATA_DIR") {
            config.data_dir = PathBuf::from(v);
        }
        if let Some(v) = var("INTOWORK_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(v);
        }
        if let Some(v) = var("INTOWORK_LOG_FILE") {
            config.log_file = PathBuf::from(v);
        }
        if let Some(v) = var("INTOWORK_DEBOUNCE_MS") {
            config.debounce_ms = v
                .parse()
                .map_err(|_| anyhow::anyhow!("INTOWORK_DEBOUNCE_MS must be a number of milliseconds"))?;
        }
        if let Some(v) = var("INTOWORK_CLIPBOARD") {
            config.clipboard_command = Some(v);
        }
        if let Some(v) = var("INTOWORK_OPEN_BROWSER") {
            config.open_browser = match v.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => anyhow::bail!("INTOWORK_OPEN_BROWSER must be true or false"),
            };
        }
        if let Some(v) = var("INTOWORK_TOKEN") {
            config.token = Some(v);
        }
        Ok(())
    }

    fn resolve_path(path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            let current_dir = std::env::current_dir().context("Failed to get current directory")?;
            Ok(current_dir.join(path))
        }
    }

    /// Ensure data and output directories exist
    pub async fn ensure_directories(config: &AppConfig) -> Result<()> {
        for dir in [&config.data_dir, &config.output_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}
