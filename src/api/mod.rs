//! Remote collaborators consumed by the onboarding workflow.
//!
//! Three seams, each an async trait so the workflow can run against the real
//! HTTP API or an in-memory fake:
//! - [`AccountService`]: account creation, OTP, current-profile lookup
//! - [`OnboardingStore`]: authoritative business / product / sustainability records
//! - [`VerificationGate`]: listing confidence score before product creation
//!
//! [`HttpOnboardingClient`] implements all three.

pub mod client;
pub mod types;

pub use client::HttpOnboardingClient;
pub use types::*;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::ApiError;
use crate::onboarding::model::{
    BusinessProfileInput, ProductInput, SignupInput, SustainabilityInput, UploadFile, VariantInput,
};

/// Bearer credential for the remote API.
pub struct Credential(SecretString);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// `Authorization` header value.
    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.0.expose_secret())
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        Self::new(self.0.expose_secret())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Account and session operations.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Look up the profile behind `credential`.
    async fn current_profile(&self, credential: &Credential) -> Result<AccountProfile, ApiError>;

    /// Create a supplier account, returning its bearer credential.
    async fn create_account(&self, input: &SignupInput) -> Result<Credential, ApiError>;

    /// Send a one-time code to `phone`.
    async fn send_otp(&self, credential: &Credential, phone: &str) -> Result<(), ApiError>;

    /// Confirm a one-time code.
    async fn verify_otp(
        &self,
        credential: &Credential,
        phone: &str,
        code: &str,
    ) -> Result<(), ApiError>;
}

/// Authoritative onboarding records.
///
/// Reads return [`ApiError::NotFound`] when the record does not exist.
#[async_trait]
pub trait OnboardingStore: Send + Sync {
    async fn status(&self, credential: &Credential) -> Result<OnboardingStatus, ApiError>;

    async fn business_profile(
        &self,
        credential: &Credential,
    ) -> Result<BusinessProfileRecord, ApiError>;

    async fn sustainability_profile(
        &self,
        credential: &Credential,
    ) -> Result<SustainabilityProfileRecord, ApiError>;

    async fn create_business_profile(
        &self,
        credential: &Credential,
        input: &BusinessProfileInput,
    ) -> Result<(), ApiError>;

    async fn update_business_profile(
        &self,
        credential: &Credential,
        input: &BusinessProfileInput,
    ) -> Result<(), ApiError>;

    async fn create_product(
        &self,
        credential: &Credential,
        input: &ProductInput,
    ) -> Result<CreatedProduct, ApiError>;

    async fn create_variant(
        &self,
        credential: &Credential,
        product_id: &str,
        variant: &VariantInput,
    ) -> Result<VariantRecord, ApiError>;

    /// Create or replace the sustainability profile.
    async fn save_sustainability_profile(
        &self,
        credential: &Credential,
        input: &SustainabilityInput,
    ) -> Result<(), ApiError>;
}

/// Advisory listing verification.
#[async_trait]
pub trait VerificationGate: Send + Sync {
    async fn verify(
        &self,
        credential: &Credential,
        title: &str,
        image: &UploadFile,
    ) -> Result<VerificationResult, ApiError>;
}
