//! In-memory stand-in for every remote collaborator, recording each call.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::{
    AccountProfile, AccountService, BusinessProfileRecord, CreatedProduct, Credential,
    OnboardingStatus, OnboardingStore, ProfileType, SustainabilityProfileRecord, VariantRecord,
    VerificationGate, VerificationResult,
};
use crate::error::ApiError;
use crate::onboarding::controller::OnboardingDeps;
use crate::onboarding::model::{
    BusinessProfileInput, ProductInput, SignupInput, SustainabilityInput, UploadFile, VariantInput,
};

#[derive(Default)]
struct Inner {
    profile: Option<AccountProfile>,
    profile_error: Option<u16>,
    status: OnboardingStatus,
    status_fails: bool,
    business: Option<BusinessProfileRecord>,
    business_read_fails: bool,
    sustainability: Option<SustainabilityProfileRecord>,
    verification: Option<VerificationResult>,
    write_failures: Vec<&'static str>,
    variant_failures: Vec<String>,
    product_gate: Option<Arc<Notify>>,
    calls: Vec<&'static str>,
    variant_skus: Vec<String>,
    verified_titles: Vec<String>,
    verified_images: Vec<String>,
    otp_phones: Vec<String>,
    next_id: u32,
}

/// Fake backend. Defaults: a supplier profile, empty status, no business,
/// no sustainability profile, verification score 0.9.
pub struct FakeBackend {
    inner: Mutex<Inner>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let inner = Inner {
            profile: Some(supplier_profile()),
            verification: Some(VerificationResult {
                probability: 0.9,
                suggestion: None,
            }),
            ..Default::default()
        };
        Arc::new(Self {
            inner: Mutex::new(inner),
        })
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        f(&mut inner)
    }

    pub fn deps(self: &Arc<Self>) -> OnboardingDeps {
        OnboardingDeps {
            accounts: self.clone(),
            store: self.clone(),
            gate: self.clone(),
        }
    }

    pub fn set_profile_type(&self, profile_type: ProfileType) {
        self.with(|i| {
            if let Some(ref mut p) = i.profile {
                p.profile_type = profile_type;
            }
        });
    }

    pub fn fail_profile(&self, status: u16) {
        self.with(|i| i.profile_error = Some(status));
    }

    pub fn set_status(&self, status: OnboardingStatus) {
        self.with(|i| i.status = status);
    }

    pub fn fail_status(&self) {
        self.with(|i| i.status_fails = true);
    }

    pub fn set_business(&self, record: BusinessProfileRecord) {
        self.with(|i| i.business = Some(record));
    }

    pub fn fail_business_read(&self) {
        self.with(|i| i.business_read_fails = true);
    }

    pub fn set_sustainability(&self, record: SustainabilityProfileRecord) {
        self.with(|i| i.sustainability = Some(record));
    }

    /// `None` makes the gate unavailable.
    pub fn set_verification(&self, result: Option<VerificationResult>) {
        self.with(|i| i.verification = result);
    }

    /// Make the named call fail with a 422.
    pub fn fail_write(&self, call: &'static str) {
        self.with(|i| i.write_failures.push(call));
    }

    /// Undo an earlier `fail_write`.
    pub fn recover_write(&self, call: &'static str) {
        self.with(|i| i.write_failures.retain(|c| *c != call));
    }

    pub fn fail_variant_sku(&self, sku: &str) {
        self.with(|i| i.variant_failures.push(sku.to_string()));
    }

    /// Hold `create_product` until the returned notify fires.
    pub fn gate_product_creation(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.with(|i| i.product_gate = Some(notify.clone()));
        notify
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.with(|i| i.calls.clone())
    }

    pub fn count(&self, call: &str) -> usize {
        self.with(|i| i.calls.iter().filter(|c| **c == call).count())
    }

    pub fn variant_skus(&self) -> Vec<String> {
        self.with(|i| i.variant_skus.clone())
    }

    pub fn verified_titles(&self) -> Vec<String> {
        self.with(|i| i.verified_titles.clone())
    }

    /// File names of the images sent to the gate.
    pub fn verified_images(&self) -> Vec<String> {
        self.with(|i| i.verified_images.clone())
    }

    /// `send:<phone>` and `verify:<phone>` for every OTP call, in order.
    pub fn otp_phones(&self) -> Vec<String> {
        self.with(|i| i.otp_phones.clone())
    }

    fn record(&self, call: &'static str) -> Result<(), ApiError> {
        self.with(|i| {
            i.calls.push(call);
            if i.write_failures.contains(&call) {
                Err(ApiError::Status {
                    status: 422,
                    detail: format!("{call} rejected"),
                })
            } else {
                Ok(())
            }
        })
    }

    fn next_id(&self, prefix: &str) -> String {
        self.with(|i| {
            i.next_id += 1;
            format!("{prefix}-{}", i.next_id)
        })
    }
}

fn supplier_profile() -> AccountProfile {
    AccountProfile {
        id: "u-1".into(),
        full_name: "Ada Obi".into(),
        email: "ada@example.com".into(),
        phone: Some("+2348000000000".into()),
        profile_type: ProfileType::Supplier,
    }
}

#[async_trait]
impl AccountService for FakeBackend {
    async fn current_profile(&self, _credential: &Credential) -> Result<AccountProfile, ApiError> {
        self.record("current_profile")?;
        self.with(|i| match (i.profile_error, &i.profile) {
            (Some(401), _) => Err(ApiError::Unauthorized),
            (Some(status), _) => Err(ApiError::Status {
                status,
                detail: "profile down".into(),
            }),
            (None, Some(p)) => Ok(p.clone()),
            (None, None) => Err(ApiError::NotFound),
        })
    }

    async fn create_account(&self, _input: &SignupInput) -> Result<Credential, ApiError> {
        self.record("create_account")?;
        Ok(Credential::new("fresh-token"))
    }

    async fn send_otp(&self, _credential: &Credential, phone: &str) -> Result<(), ApiError> {
        self.with(|i| i.otp_phones.push(format!("send:{phone}")));
        self.record("send_otp")
    }

    async fn verify_otp(
        &self,
        _credential: &Credential,
        phone: &str,
        code: &str,
    ) -> Result<(), ApiError> {
        self.with(|i| i.otp_phones.push(format!("verify:{phone}")));
        self.record("verify_otp")?;
        if code == "000000" {
            return Err(ApiError::Status {
                status: 400,
                detail: "invalid code".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OnboardingStore for FakeBackend {
    async fn status(&self, _credential: &Credential) -> Result<OnboardingStatus, ApiError> {
        self.record("status")?;
        self.with(|i| {
            if i.status_fails {
                Err(ApiError::Status {
                    status: 503,
                    detail: "status unavailable".into(),
                })
            } else {
                Ok(i.status.clone())
            }
        })
    }

    async fn business_profile(
        &self,
        _credential: &Credential,
    ) -> Result<BusinessProfileRecord, ApiError> {
        self.record("business_profile")?;
        self.with(|i| {
            if i.business_read_fails {
                return Err(ApiError::Status {
                    status: 502,
                    detail: "bad gateway".into(),
                });
            }
            i.business.clone().ok_or(ApiError::NotFound)
        })
    }

    async fn sustainability_profile(
        &self,
        _credential: &Credential,
    ) -> Result<SustainabilityProfileRecord, ApiError> {
        self.record("sustainability_profile")?;
        self.with(|i| i.sustainability.clone().ok_or(ApiError::NotFound))
    }

    async fn create_business_profile(
        &self,
        _credential: &Credential,
        _input: &BusinessProfileInput,
    ) -> Result<(), ApiError> {
        self.record("create_business_profile")
    }

    async fn update_business_profile(
        &self,
        _credential: &Credential,
        _input: &BusinessProfileInput,
    ) -> Result<(), ApiError> {
        self.record("update_business_profile")
    }

    async fn create_product(
        &self,
        _credential: &Credential,
        _input: &ProductInput,
    ) -> Result<CreatedProduct, ApiError> {
        let gate = self.with(|i| i.product_gate.clone());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.record("create_product")?;
        Ok(CreatedProduct {
            id: self.next_id("p"),
        })
    }

    async fn create_variant(
        &self,
        _credential: &Credential,
        _product_id: &str,
        variant: &VariantInput,
    ) -> Result<VariantRecord, ApiError> {
        self.record("create_variant")?;
        let fails = self.with(|i| {
            i.variant_skus.push(variant.sku.clone());
            i.variant_failures.contains(&variant.sku)
        });
        if fails {
            return Err(ApiError::Status {
                status: 409,
                detail: "duplicate sku".into(),
            });
        }
        Ok(VariantRecord {
            id: self.next_id("v"),
            sku: Some(variant.sku.clone()),
        })
    }

    async fn save_sustainability_profile(
        &self,
        _credential: &Credential,
        _input: &SustainabilityInput,
    ) -> Result<(), ApiError> {
        self.record("save_sustainability_profile")
    }
}

#[async_trait]
impl VerificationGate for FakeBackend {
    async fn verify(
        &self,
        _credential: &Credential,
        title: &str,
        image: &UploadFile,
    ) -> Result<VerificationResult, ApiError> {
        self.record("verify")?;
        self.with(|i| {
            i.verified_titles.push(title.to_string());
            i.verified_images.push(image.file_name.clone());
            i.verification.clone().ok_or(ApiError::Status {
                status: 503,
                detail: "verifier offline".into(),
            })
        })
    }
}
