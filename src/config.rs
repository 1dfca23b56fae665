use std::path::PathBuf;
use std::time::Duration;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::Preference;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_REFERER: &str = "https://www.bilibili.com";
pub const DEFAULT_API_BASE: &str = "https://api.bilibili.com";
pub const DEFAULT_REWRITE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";
pub const DEFAULT_REWRITE_MODEL: &str = "qwen-plus";
pub const DEFAULT_DOWNLOAD_ASSIST_URL: &str = "https://api.snapany.com/api/download";
pub const DEFAULT_TINGWU_URL: &str = "https://tingwu.aliyuncs.com/api/v1/tasks";
pub const DEFAULT_TINGWU_APP_KEY: &str = "test-app-key";

pub const DEFAULT_SYSTEM_PROMPT: &str = "你是一个专业的学习笔记整理助手。请将提供的视频字幕内容整理成结构清晰、易于学习的Markdown格式笔记。\
要求：1. 生成内容摘要和大纲；2. 根据语义进行智能分段；3. 添加合适的标题；4. 优化标点和错别字；5. 保持时间戳信息。";

const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TRANSCRIBE_WAIT_SECS: u64 = 3;

/// Environment variable consulted for the credential when `--key` is absent
pub const ACCESS_KEY_ENV: &str = "DASHSCOPE_API_KEY";

/// Contents of the optional config file. Every key may be omitted.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub api_base: Option<String>,
    pub rewrite_url: Option<String>,
    pub rewrite_model: Option<String>,
    pub system_prompt: Option<String>,
    pub download_assist_url: Option<String>,
    pub download_timeout_secs: Option<u64>,
    pub tingwu_url: Option<String>,
    pub tingwu_app_key: Option<String>,
    pub transcribe_wait_secs: Option<u64>,
    pub default_prefer: Option<Preference>,
    pub access_key: Option<String>,
}

/// Resolved static values handed to every fetcher, rewriter and provider
#[derive(Debug, Clone)]
pub struct Settings {
    pub user_agent: String,
    pub referer: String,
    pub api_base: String,
    pub rewrite_url: String,
    pub rewrite_model: String,
    pub system_prompt: String,
    pub download_assist_url: String,
    pub download_timeout: Duration,
    pub tingwu_url: String,
    pub tingwu_app_key: String,
    pub transcribe_wait: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Config::default().settings()
    }
}

impl Config {
    /// Load config from ~/.config/bilinote/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Fill in defaults for everything the file leaves unset
    pub fn settings(&self) -> Settings {
        let or = |value: &Option<String>, default: &str| value.clone().unwrap_or_else(|| default.to_string());

        Settings {
            user_agent: or(&self.user_agent, DEFAULT_USER_AGENT),
            referer: or(&self.referer, DEFAULT_REFERER),
            api_base: or(&self.api_base, DEFAULT_API_BASE).trim_end_matches('/').to_string(),
            rewrite_url: or(&self.rewrite_url, DEFAULT_REWRITE_URL),
            rewrite_model: or(&self.rewrite_model, DEFAULT_REWRITE_MODEL),
            system_prompt: or(&self.system_prompt, DEFAULT_SYSTEM_PROMPT),
            download_assist_url: or(&self.download_assist_url, DEFAULT_DOWNLOAD_ASSIST_URL),
            download_timeout: Duration::from_secs(self.download_timeout_secs.unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS)),
            tingwu_url: or(&self.tingwu_url, DEFAULT_TINGWU_URL),
            tingwu_app_key: or(&self.tingwu_app_key, DEFAULT_TINGWU_APP_KEY),
            transcribe_wait: Duration::from_secs(self.transcribe_wait_secs.unwrap_or(DEFAULT_TRANSCRIBE_WAIT_SECS)),
        }
    }

    /// Credential precedence: explicit flag, then environment, then config file
    pub fn credential(&self, flag: Option<&str>) -> Option<String> {
        flag.map(str::to_string)
            .or_else(|| std::env::var(ACCESS_KEY_ENV).ok())
            .or_else(|| self.access_key.clone())
            .filter(|k| !k.trim().is_empty())
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("bilinote")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
api_base = "http://localhost:8080/"
rewrite_model = "qwen-max"
download_timeout_secs = 3
default_prefer = "native"
access_key = "sk-test"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.rewrite_model.as_deref(), Some("qwen-max"));
        assert_eq!(config.default_prefer, Some(Preference::Native));
        assert_eq!(config.access_key.as_deref(), Some("sk-test"));

        let settings = config.settings();
        assert_eq!(settings.api_base, "http://localhost:8080");
        assert_eq!(settings.download_timeout, Duration::from_secs(3));
        assert_eq!(settings.rewrite_model, "qwen-max");
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.api_base.is_none());
        assert!(config.default_prefer.is_none());
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.user_agent, "Mozilla/5.0");
        assert_eq!(settings.referer, "https://www.bilibili.com");
        assert_eq!(settings.api_base, "https://api.bilibili.com");
        assert_eq!(settings.rewrite_model, "qwen-plus");
        assert_eq!(settings.download_timeout, Duration::from_secs(10));
        assert_eq!(settings.transcribe_wait, Duration::from_secs(3));
        assert!(settings.system_prompt.contains("保持时间戳信息"));
    }

    #[test]
    fn test_credential_flag_wins() {
        let config = Config {
            access_key: Some("from-config".to_string()),
            ..Default::default()
        };
        assert_eq!(config.credential(Some("from-flag")).as_deref(), Some("from-flag"));
    }

    #[test]
    fn test_blank_credential_is_none() {
        let config = Config::default();
        assert_eq!(config.credential(Some("   ")), None);
    }
}
