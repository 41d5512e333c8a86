use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use vendor_onboard::api::{Credential, HttpOnboardingClient};
use vendor_onboard::config::OnboardingConfig;
use vendor_onboard::error::ResumeError;
use vendor_onboard::onboarding::ResumeResolver;

/// Optional bearer credential for the account to inspect.
const ENV_TOKEN: &str = "VENDOR_ONBOARD_TOKEN";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = OnboardingConfig::from_env()?;
    let credential = std::env::var(ENV_TOKEN)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .map(Credential::new);

    eprintln!("vendor-onboard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {}", config.api_base_url);
    eprintln!(
        "   Credential: {}",
        if credential.is_some() { "provided" } else { "none" }
    );

    let client = Arc::new(
        HttpOnboardingClient::new(&config).context("Failed to build HTTP client")?,
    );
    let resolver = ResumeResolver::new(client.clone(), client);

    match resolver.resolve(credential.as_ref()).await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(ResumeError::WrongRole { found }) => {
            eprintln!("Error: this account is a {found} profile, not a supplier");
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e).context("Failed to resolve the resume point"),
    }
}
