use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_telegram_config")]
    pub telegram: TelegramConfig,
    #[serde(default = "default_gemini_config")]
    pub gemini: GeminiConfig,
    #[serde(default = "default_search_config")]
    pub search: SearchConfig,
    #[serde(default = "default_converter_config")]
    pub converter: ConverterConfig,
    #[serde(default = "default_keepalive_config")]
    pub keepalive: KeepAliveConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Empty means every user may talk to the bot.
    #[serde(default)]
    pub allowed_user_ids: Vec<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConverterConfig {
    /// LibreOffice binary used for office and PDF conversions.
    #[serde(default = "default_soffice_path")]
    pub soffice_path: PathBuf,
    /// Scratch directory for uploads and converted files.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeepAliveConfig {
    #[serde(default = "default_keepalive_port")]
    pub port: u16,
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_search_base_url() -> String {
    "https://serpapi.com".to_string()
}

fn default_soffice_path() -> PathBuf {
    PathBuf::from("soffice")
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_keepalive_port() -> u16 {
    8080
}

fn default_telegram_config() -> TelegramConfig {
    TelegramConfig {
        bot_token: String::new(),
        allowed_user_ids: Vec::new(),
    }
}

fn default_gemini_config() -> GeminiConfig {
    GeminiConfig {
        api_key: String::new(),
        model: default_gemini_model(),
        base_url: default_gemini_base_url(),
    }
}

fn default_search_config() -> SearchConfig {
    SearchConfig {
        api_key: String::new(),
        base_url: default_search_base_url(),
    }
}

fn default_converter_config() -> ConverterConfig {
    ConverterConfig {
        soffice_path: default_soffice_path(),
        work_dir: default_work_dir(),
    }
}

fn default_keepalive_config() -> KeepAliveConfig {
    KeepAliveConfig {
        port: default_keepalive_port(),
    }
}

impl Config {
    /// Load `path` if it exists (defaults otherwise), then let the process
    /// environment override the three secrets.
    pub fn load(path: &Path) -> Result<Self> {
        let content = if path.exists() {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?
        } else {
            String::new()
        };

        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.apply_env(|key| std::env::var(key).ok());

        if !config.converter.work_dir.exists() {
            std::fs::create_dir_all(&config.converter.work_dir).with_context(|| {
                format!(
                    "Failed to create work directory: {}",
                    config.converter.work_dir.display()
                )
            })?;
        }

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML")
    }

    /// Non-empty `TELEGRAM_TOKEN`, `GEMINI_API_KEY` and `SERPAPI_KEY` values
    /// win over whatever the file says.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = var("TELEGRAM_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(key) = var("GEMINI_API_KEY") {
            self.gemini.api_key = key;
        }
        if let Some(key) = var("SERPAPI_KEY") {
            self.search.api_key = key;
        }
    }
}
