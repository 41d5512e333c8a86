//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable holding the remote API base URL.
pub const ENV_API_URL: &str = "VENDOR_ONBOARD_API_URL";
/// Environment variable for the per-request timeout, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "VENDOR_ONBOARD_TIMEOUT_SECS";
/// Environment variable for the OTP manual-advance delay, in seconds.
pub const ENV_OTP_FALLBACK_SECS: &str = "VENDOR_ONBOARD_OTP_FALLBACK_SECS";

/// Onboarding client configuration.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Base URL of the remote API, without a trailing slash.
    pub api_base_url: String,
    /// Timeout applied to every remote call.
    pub request_timeout: Duration,
    /// How long after a failed OTP dispatch the user may advance manually.
    pub otp_fallback_delay: Duration,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            otp_fallback_delay: Duration::from_secs(30),
        }
    }
}

impl OnboardingConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = std::env::var(ENV_API_URL)
            .map_err(|_| ConfigError::MissingEnvVar(ENV_API_URL.to_string()))?;
        let api_base_url = normalize_base_url(&raw_url)?;

        let defaults = Self::default();
        let request_timeout = secs_from_env(ENV_TIMEOUT_SECS)?.unwrap_or(defaults.request_timeout);
        let otp_fallback_delay =
            secs_from_env(ENV_OTP_FALLBACK_SECS)?.unwrap_or(defaults.otp_fallback_delay);

        Ok(Self {
            api_base_url,
            request_timeout,
            otp_fallback_delay,
        })
    }
}

/// Validate a base URL and strip any trailing slash.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    reqwest::Url::parse(trimmed).map_err(|e| ConfigError::InvalidValue {
        key: ENV_API_URL.to_string(),
        message: e.to_string(),
    })?;
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn secs_from_env(key: &str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
