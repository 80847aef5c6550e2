use std::path::PathBuf;
use std::time::Duration;

use crate::browser::AgenticBrowser;
use crate::error::{Error, Result};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4";
pub const DEFAULT_STOREFRONT_URL: &str = "https://bstackdemo.com";
pub const DEFAULT_MAX_STEPS: usize = 25;

pub struct BrowserConfig {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub chrome_path: Option<String>,
    /// Default timeout for operations like `wait_for_selector` (default: 30s).
    pub default_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            chrome_path: None,
            default_timeout: Duration::from_secs(30),
        }
    }
}

pub struct BrowserBuilder {
    config: BrowserConfig,
}

impl BrowserBuilder {
    pub fn new() -> Self {
        Self {
            config: BrowserConfig::default(),
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<String>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    pub fn build_config(self) -> BrowserConfig {
        self.config
    }

    pub async fn build(self) -> Result<AgenticBrowser> {
        AgenticBrowser::launch(self.build_config()).await
    }
}

impl Default for BrowserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Storefront login used by the built-in login scenario.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "demouser".into(),
            password: "testingisfun99".into(),
        }
    }
}

/// Process-wide harness settings, normally read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub storefront_url: String,
    pub credentials: Credentials,
    pub max_steps: usize,
    pub history_dir: PathBuf,
    /// Chrome binary to launch instead of the one chromiumoxide detects.
    pub chrome_path: Option<String>,
}

impl HarnessConfig {
    /// Load `.env` if present, then read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("ignoring unreadable .env file: {e}");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Empty values count as unset.
    ///
    /// Fails when neither language-model key is available.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_api_key = get("GEMINI_API_KEY");
        let openai_api_key = get("OPENAI_API_KEY");
        if gemini_api_key.is_none() && openai_api_key.is_none() {
            return Err(Error::Config(
                "both GEMINI_API_KEY and OPENAI_API_KEY are missing; provide at least one".into(),
            ));
        }

        let max_steps = match get("HARNESS_MAX_STEPS") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| Error::Config(format!("invalid HARNESS_MAX_STEPS: {raw}")))?,
            None => DEFAULT_MAX_STEPS,
        };

        let defaults = Credentials::default();
        Ok(Self {
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            openai_api_key,
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.into()),
            storefront_url: get("STOREFRONT_URL").unwrap_or_else(|| DEFAULT_STOREFRONT_URL.into()),
            credentials: Credentials {
                username: get("STOREFRONT_USERNAME").unwrap_or(defaults.username),
                password: get("STOREFRONT_PASSWORD").unwrap_or(defaults.password),
            },
            max_steps,
            history_dir: PathBuf::from("."),
            chrome_path: get("CHROME_PATH"),
        })
    }
}
