// src/core/config_manager.rs
//! Process configuration, read once at start-up and passed by reference afterwards

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::environment::PathsConfig;
use crate::linkedin_analysis::RatePolicy;
use crate::utils::parse_flag;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_ANALYSIS_DELAY_MS: u64 = 500;
const DEFAULT_MEETING_DELAY_MS: u64 = 2000;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const TEST_MODE_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    pub fn key_variable(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Standard,
    Advanced,
}

impl ModelTier {
    fn parse(value: Option<&str>) -> Result<Self> {
        match value.map(|s| s.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("standard") => Ok(ModelTier::Standard),
            Some("advanced") => Ok(ModelTier::Advanced),
            Some(other) => anyhow::bail!(
                "MODEL_TIER must be 'standard' or 'advanced', got '{}'",
                other
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: Provider,
    pub model_tier: ModelTier,
    pub model_override: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_base_url: String,
    pub anthropic_base_url: String,
    pub test_mode: bool,
    pub analysis_delay: Duration,
    pub meeting_delay: Duration,
    pub request_timeout: Duration,
    pub paths: PathsConfig,
}

impl AppConfig {
    /// Load from the process environment plus the optional paths file.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let paths = PathsConfig::load(config_file)?;
        let config = Self::from_lookup(|key| std::env::var(key).ok(), paths)?;

        info!(
            "Configuration loaded: provider={:?}, model={}, test_mode={}",
            config.provider,
            config.model(),
            config.test_mode
        );
        Ok(config)
    }

    /// Build from any variable source; `load` uses the process environment.
    pub fn from_lookup<F>(lookup: F, paths: PathsConfig) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = if parse_flag(lookup("USE_ANTHROPIC").as_deref()) {
            Provider::Anthropic
        } else {
            Provider::OpenAi
        };

        let model_override = match provider {
            Provider::OpenAi => non_empty("OPENAI_MODEL"),
            Provider::Anthropic => non_empty("ANTHROPIC_MODEL"),
        };

        Ok(Self {
            provider,
            model_tier: ModelTier::parse(lookup("MODEL_TIER").as_deref())?,
            model_override,
            openai_api_key: non_empty("OPENAI_API_KEY"),
            anthropic_api_key: non_empty("ANTHROPIC_API_KEY"),
            openai_base_url: non_empty("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            anthropic_base_url: non_empty("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
            test_mode: parse_flag(lookup("TEST_MODE").as_deref()),
            analysis_delay: Duration::from_millis(parse_number(
                non_empty("ANALYSIS_DELAY_MS"),
                "ANALYSIS_DELAY_MS",
                DEFAULT_ANALYSIS_DELAY_MS,
            )?),
            meeting_delay: Duration::from_millis(parse_number(
                non_empty("MEETING_DELAY_MS"),
                "MEETING_DELAY_MS",
                DEFAULT_MEETING_DELAY_MS,
            )?),
            request_timeout: Duration::from_secs(parse_number(
                non_empty("LLM_TIMEOUT_SECS"),
                "LLM_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            paths,
        })
    }

    /// Model name for the selected provider and tier.
    pub fn model(&self) -> String {
        if let Some(model) = &self.model_override {
            return model.clone();
        }
        match (self.provider, self.model_tier) {
            (Provider::OpenAi, ModelTier::Standard) => "gpt-4o-mini",
            (Provider::OpenAi, ModelTier::Advanced) => "gpt-5-mini",
            (Provider::Anthropic, ModelTier::Standard) => "claude-3-5-sonnet-20241022",
            (Provider::Anthropic, ModelTier::Advanced) => "claude-sonnet-4-20250514",
        }
        .to_string()
    }

    /// Credential for the selected provider. Missing credentials are fatal.
    pub fn api_key(&self) -> Result<&str> {
        let key = match self.provider {
            Provider::OpenAi => self.openai_api_key.as_deref(),
            Provider::Anthropic => self.anthropic_api_key.as_deref(),
        };
        key.with_context(|| {
            format!(
                "{} environment variable not set",
                self.provider.key_variable()
            )
        })
    }

    pub fn base_url(&self) -> &str {
        match self.provider {
            Provider::OpenAi => &self.openai_base_url,
            Provider::Anthropic => &self.anthropic_base_url,
        }
    }

    pub fn analysis_policy(&self) -> RatePolicy {
        RatePolicy::fixed(self.analysis_delay)
    }

    pub fn meeting_policy(&self) -> RatePolicy {
        RatePolicy::fixed(self.meeting_delay)
    }

    /// Cap on conversations per enrichment batch; only set in test mode.
    pub fn batch_limit(&self) -> Option<usize> {
        self.test_mode.then_some(TEST_MODE_LIMIT)
    }
}

fn parse_number(value: Option<String>, name: &str, default: u64) -> Result<u64> {
    match value {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{} must be a non-negative integer, got '{}'", name, v)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned(), PathsConfig::default())
    }

    #[test]
    fn test_defaults_to_openai_standard() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.model(), "gpt-4o-mini");
        assert_eq!(config.api_key().unwrap(), "sk-test");
        assert_eq!(config.analysis_delay, Duration::from_millis(500));
        assert_eq!(config.batch_limit(), None);
    }

    #[test]
    fn test_missing_credential_is_error() {
        let config = config_from(&[("USE_ANTHROPIC", "yes"), ("OPENAI_API_KEY", "sk")]).unwrap();
        let err = config.api_key().unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_tier_and_override() {
        let config = config_from(&[("MODEL_TIER", "advanced")]).unwrap();
        assert_eq!(config.model(), "gpt-5-mini");

        let config = config_from(&[("MODEL_TIER", "advanced"), ("OPENAI_MODEL", "gpt-x")]).unwrap();
        assert_eq!(config.model(), "gpt-x");

        assert!(config_from(&[("MODEL_TIER", "turbo")]).is_err());
    }

    #[test]
    fn test_test_mode_and_delays() {
        let config = config_from(&[
            ("TEST_MODE", "1"),
            ("ANALYSIS_DELAY_MS", "0"),
            ("MEETING_DELAY_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.batch_limit(), Some(10));
        assert_eq!(config.analysis_delay, Duration::ZERO);
        assert_eq!(config.meeting_delay, Duration::from_millis(250));

        assert!(config_from(&[("ANALYSIS_DELAY_MS", "soon")]).is_err());
    }
}
