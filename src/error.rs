//! Error types for vendor onboarding.

use crate::onboarding::state::OnboardingStep;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Resume error: {0}")]
    Resume(#[from] ResumeError),

    #[error("Step error: {0}")]
    Step(#[from] StepError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the remote onboarding API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unauthorized: missing or expired credential")]
    Unauthorized,

    #[error("Resource not found")]
    NotFound,

    #[error("Remote returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl ApiError {
    /// Whether this is a 404-equivalent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Server-provided detail when available, otherwise the error text.
    pub fn detail(&self) -> String {
        match self {
            Self::Status { detail, .. } if !detail.is_empty() => detail.clone(),
            other => other.to_string(),
        }
    }
}

/// Fatal errors raised while resolving the resume point.
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    #[error("Account is a {found} profile; supplier onboarding is not available")]
    WrongRole { found: String },

    #[error("Could not load the current profile: {0}")]
    ProfileUnavailable(ApiError),
}

/// Errors surfaced by a step's exit action. The step never changes when one
/// of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("Missing required fields: {}", missing.join(", "))]
    Validation { missing: Vec<String> },

    #[error("Verification rejected the listing (score {probability:.2})")]
    VerificationRejected {
        probability: f64,
        suggestion: Option<String>,
    },

    #[error("{operation} failed: {detail}")]
    RemoteWrite { operation: String, detail: String },

    #[error("Another step submission is still in flight")]
    Busy,

    #[error("Input for {expected} submitted while at {actual}")]
    WrongStep {
        expected: OnboardingStep,
        actual: OnboardingStep,
    },

    #[error("No credential available; sign up or sign in first")]
    NotSignedIn,

    #[error("Manual advance available in {remaining_secs}s")]
    OtpNotReady { remaining_secs: u64 },

    #[error("Onboarding is already complete")]
    AlreadyComplete,
}

impl StepError {
    pub(crate) fn remote(operation: &str, err: &ApiError) -> Self {
        Self::RemoteWrite {
            operation: operation.to_string(),
            detail: err.detail(),
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
