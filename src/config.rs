//! Startup configuration from the environment
//!
//! Required values are checked once, before anything is bound or built, so
//! a missing API key fails the process instead of the first request.

use crate::exchange::ReplayMode;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {var}")]
    Missing { var: &'static str },
    #[error("Invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Dashboard behaviors that vary between deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureFlags {
    /// Rewrite line-leading `*` markers in model output
    pub normalize_bullets: bool,
    pub video_analysis: bool,
    /// Suggested sections and recent questions
    pub sidebar: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            normalize_bullets: true,
            video_analysis: true,
            sidebar: true,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub port: u16,
    pub replay: ReplayMode,
    pub features: FeatureFlags,
}

// Keeps the key out of logs
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("port", &self.port)
            .field("replay", &self.replay)
            .field("features", &self.features)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let required = |var: &'static str| optional(var).ok_or(ConfigError::Missing { var });

        let port = match optional("NYAYA_PORT") {
            Some(value) => value.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    var: "NYAYA_PORT",
                    value,
                    reason: e.to_string(),
                }
            })?,
            None => DEFAULT_PORT,
        };

        let replay = match optional("NYAYA_HISTORY_REPLAY") {
            Some(value) => parse_replay(&value).ok_or_else(|| ConfigError::Invalid {
                var: "NYAYA_HISTORY_REPLAY",
                value,
                reason: "expected user_only or all".to_string(),
            })?,
            None => ReplayMode::default(),
        };

        let defaults = FeatureFlags::default();
        let features = FeatureFlags {
            normalize_bullets: flag(
                &optional,
                "NYAYA_NORMALIZE_BULLETS",
                defaults.normalize_bullets,
            )?,
            video_analysis: flag(
                &optional,
                "NYAYA_VIDEO_ANALYSIS",
                defaults.video_analysis,
            )?,
            sidebar: flag(&optional, "NYAYA_SIDEBAR", defaults.sidebar)?,
        };

        Ok(Self {
            api_key: required("GEMINI_API_KEY")?,
            model: required("GEMINI_MODEL")?,
            base_url: optional("GEMINI_BASE_URL"),
            port,
            replay,
            features,
        })
    }
}

fn parse_replay(value: &str) -> Option<ReplayMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "user_only" | "user-only" => Some(ReplayMode::UserOnly),
        "all" => Some(ReplayMode::All),
        _ => None,
    }
}

fn flag(
    optional: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(value) = optional(var) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value,
            reason: "expected a boolean".to_string(),
        }),
    }
}
