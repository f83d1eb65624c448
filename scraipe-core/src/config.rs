//! Process-level configuration.
//!
//! Non-secret tuning comes from an optional TOML file named by
//! `SCRAIPE_REDDIT_CONFIG`; credentials always come from the environment.
//! Unset credentials are not an error: the GUI asks for them instead.

use crate::error::{ConfigError, CoreError};
use crate::types::{OpenAiCredentials, RedditCredentials, DEFAULT_SUBREDDIT};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const REDDIT_CLIENT_ID_VAR: &str = "REDDIT_CLIENT_ID";
pub const REDDIT_CLIENT_SECRET_VAR: &str = "REDDIT_CLIENT_SECRET";
pub const CONFIG_PATH_VAR: &str = "SCRAIPE_REDDIT_CONFIG";

pub const DEFAULT_INSTRUCTION: &str =
    "Extract funny jokes from the attached reddit post.\nJSON: {\"jokes\": [\"joke\"]}";
pub const DEFAULT_USER_AGENT: &str = "scraipe_reddit (by /u/petertigerr)";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub instruction: String,
    pub default_subreddit: String,
    pub openai_model: String,
    /// Characters of post content sent to the language model.
    pub max_content_size: usize,
    /// Items scraped or analyzed at the same time within a stage.
    pub concurrency: usize,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            instruction: DEFAULT_INSTRUCTION.to_string(),
            default_subreddit: DEFAULT_SUBREDDIT.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            max_content_size: 5000,
            concurrency: 4,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CoreError::Io(e)
            }
        })?;
        Ok(Self::from_toml_str(&contents)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "concurrency".to_string(),
                value: self.concurrency.to_string(),
            });
        }
        if self.max_content_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_content_size".to_string(),
                value: self.max_content_size.to_string(),
            });
        }
        if self.default_subreddit.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "default_subreddit".to_string(),
                value: self.default_subreddit.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub reddit: RedditCredentials,
    pub openai: OpenAiCredentials,
    pub settings: Settings,
}

impl AppConfig {
    pub fn load() -> Result<Self, CoreError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup` instead of the process environment.
    pub fn load_with<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = match lookup(CONFIG_PATH_VAR).filter(|path| !path.trim().is_empty()) {
            Some(path) => {
                info!("Loading settings from {}", path);
                match Settings::from_file(Path::new(&path)) {
                    Err(CoreError::Config(ConfigError::FileNotFound { path })) => {
                        warn!("Settings file {} not found, using defaults", path);
                        Settings::default()
                    }
                    result => result?,
                }
            }
            None => Settings::default(),
        };

        let var = |name: &str| lookup(name).unwrap_or_default().trim().to_string();

        Ok(Self {
            reddit: RedditCredentials::new(
                var(REDDIT_CLIENT_ID_VAR),
                var(REDDIT_CLIENT_SECRET_VAR),
            ),
            openai: OpenAiCredentials::new(var(OPENAI_API_KEY_VAR)),
            settings,
        })
    }

    /// Names of the credential variables that were left empty.
    pub fn unconfigured(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.openai.api_key.is_empty() {
            missing.push(OPENAI_API_KEY_VAR);
        }
        if self.reddit.client_id.is_empty() {
            missing.push(REDDIT_CLIENT_ID_VAR);
        }
        if self.reddit.client_secret.is_empty() {
            missing.push(REDDIT_CLIENT_SECRET_VAR);
        }
        missing
    }

    pub fn warn_unconfigured(&self) {
        let missing = self.unconfigured();
        if !missing.is_empty() {
            warn!(
                "The following credentials are not configured in the environment. They must be configured in the GUI: {}",
                missing.join(", ")
            );
        }
    }
}
