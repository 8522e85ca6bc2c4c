use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4.1";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
const DEFAULT_NAV_TIMEOUT_MS: u64 = 15_000;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub llm: LlmConfig,
    pub browser: BrowserConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// `None` means the request may block indefinitely.
    pub timeout: Option<Duration>,
    pub app_title: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrowserBackend {
    Playwright,
    Http,
}

impl FromStr for BrowserBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "playwright" => Ok(BrowserBackend::Playwright),
            "http" => Ok(BrowserBackend::Http),
            other => Err(AppError::ConfigError(format!("Unknown browser backend: {}", other))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BrowserConfig {
    pub backend: BrowserBackend,
    pub profile_dir: PathBuf,
    pub headless: bool,
    pub node_bin: String,
    pub nav_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("LLM_API_KEY")
            .or_else(|| get("OPENAI_API_KEY"))
            .or_else(|| get("OPENROUTER_API_KEY"))
            .ok_or_else(|| AppError::ConfigError("LLM_API_KEY (or OPENAI_API_KEY) is not set".to_string()))?;

        let timeout_secs = match get("LLM_TIMEOUT_SECS") {
            Some(v) => v.parse::<u64>().map_err(|e| AppError::ConfigError(format!("Invalid LLM_TIMEOUT_SECS: {}", e)))?,
            None => DEFAULT_LLM_TIMEOUT_SECS,
        };

        let llm = LlmConfig {
            api_key,
            base_url: get("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            app_title: get("LLM_APP_TITLE"),
        };

        // Load server configuration with defaults
        let host = get("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = get("PORT").unwrap_or_else(|| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;
        let server_addr = SocketAddr::new(ip, port);

        let data_dir = PathBuf::from(get("DATA_DIR").unwrap_or_else(|| ".".to_string()));

        let backend = match get("BROWSER_BACKEND") {
            Some(v) => v.parse()?,
            None => BrowserBackend::Playwright,
        };
        let headless = match get("BROWSER_HEADLESS") {
            Some(v) => parse_bool(&v)
                .ok_or_else(|| AppError::ConfigError(format!("Invalid BROWSER_HEADLESS: {}", v)))?,
            None => false,
        };
        let nav_timeout_ms = match get("NAV_TIMEOUT_MS") {
            Some(v) => v.parse::<u64>().map_err(|e| AppError::ConfigError(format!("Invalid NAV_TIMEOUT_MS: {}", e)))?,
            None => DEFAULT_NAV_TIMEOUT_MS,
        };

        let browser = BrowserConfig {
            backend,
            profile_dir: get("BROWSER_PROFILE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join(".browser-profile")),
            headless,
            node_bin: get("BROWSER_NODE").unwrap_or_else(|| "node".to_string()),
            nav_timeout: Duration::from_millis(nav_timeout_ms),
        };

        Ok(Config {
            server_addr,
            data_dir,
            llm,
            browser,
        })
    }

    pub fn scrapes_dir(&self) -> PathBuf {
        self.data_dir.join("scrapes")
    }

    pub fn summaries_dir(&self) -> PathBuf {
        self.data_dir.join("summaries")
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.json")
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
