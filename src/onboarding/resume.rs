//! Resume resolver: decides where a returning vendor lands by reading the
//! remote store. Never writes.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{
    AccountProfile, AccountService, BusinessProfileRecord, Credential, OnboardingStore, ProfileType,
};
use crate::error::{ApiError, ResumeError};

use super::model::{Advisory, AdvisoryKind, DocumentType, field_names};
use super::state::OnboardingStep;

/// Where the vendor should land, plus the values to pre-fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumePoint {
    pub step: OnboardingStep,
    pub prefill: BTreeMap<String, String>,
    pub has_existing_business: bool,
    pub documents_on_file: Vec<DocumentType>,
    pub advisories: Vec<Advisory>,
}

impl ResumePoint {
    /// Brand-new visitor: SIGNUP, nothing pre-filled.
    pub fn fresh() -> Self {
        Self {
            step: OnboardingStep::Signup,
            prefill: BTreeMap::new(),
            has_existing_business: false,
            documents_on_file: Vec::new(),
            advisories: Vec::new(),
        }
    }

    /// Whether any advisory must be acted on before advancing.
    pub fn is_blocked(&self) -> bool {
        self.advisories.iter().any(|a| a.blocking)
    }
}

/// Result of resolution. `AlreadyComplete` is an exit signal, not a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResumeOutcome {
    Resume(ResumePoint),
    AlreadyComplete,
}

/// Read-only projection of remote state, discarded after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RemoteStatusSnapshot {
    onboarding_complete: bool,
    /// Certification count, when a sustainability profile exists.
    sustainability_certifications: Option<usize>,
}

impl RemoteStatusSnapshot {
    fn has_certified_sustainability(&self) -> bool {
        self.sustainability_certifications.unwrap_or(0) >= 1
    }
}

/// Derives the starting step from the remote store.
pub struct ResumeResolver {
    accounts: Arc<dyn AccountService>,
    store: Arc<dyn OnboardingStore>,
}

impl ResumeResolver {
    pub fn new(accounts: Arc<dyn AccountService>, store: Arc<dyn OnboardingStore>) -> Self {
        Self { accounts, store }
    }

    /// Resolve the resume point for `credential`.
    ///
    /// Reads are issued one after another; each depends on the last. Read
    /// failures after the profile lookup degrade to BUSINESS_PROFILE with a
    /// non-blocking advisory.
    pub async fn resolve(
        &self,
        credential: Option<&Credential>,
    ) -> Result<ResumeOutcome, ResumeError> {
        let Some(credential) = credential else {
            debug!("No credential; starting at signup");
            return Ok(ResumeOutcome::Resume(ResumePoint::fresh()));
        };

        let profile = match self.accounts.current_profile(credential).await {
            Ok(profile) => profile,
            Err(ApiError::Unauthorized) => {
                info!("Credential rejected; starting at signup");
                return Ok(ResumeOutcome::Resume(ResumePoint::fresh()));
            }
            Err(e) => return Err(ResumeError::ProfileUnavailable(e)),
        };

        if profile.profile_type != ProfileType::Supplier {
            warn!(profile_type = %profile.profile_type, "Non-supplier entered onboarding");
            return Err(ResumeError::WrongRole {
                found: profile.profile_type.to_string(),
            });
        }

        match self.resolve_from_store(credential, &profile).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(error = %e, "Onboarding status unavailable; defaulting to business profile");
                Ok(ResumeOutcome::Resume(ResumePoint {
                    step: OnboardingStep::BusinessProfile,
                    prefill: account_prefill(&profile),
                    has_existing_business: false,
                    documents_on_file: Vec::new(),
                    advisories: vec![Advisory::warning(
                        AdvisoryKind::StatusUnavailable,
                        format!(
                            "Could not load your onboarding progress ({e}); \
                             starting from the business profile."
                        ),
                    )],
                }))
            }
        }
    }

    async fn snapshot(&self, credential: &Credential) -> Result<RemoteStatusSnapshot, ApiError> {
        let status = self.store.status(credential).await?;

        let sustainability_certifications = if status.sustainability_profile {
            match self.store.sustainability_profile(credential).await {
                Ok(record) => Some(record.certifications.len()),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        Ok(RemoteStatusSnapshot {
            onboarding_complete: status.is_onboarding_complete,
            sustainability_certifications,
        })
    }

    async fn resolve_from_store(
        &self,
        credential: &Credential,
        profile: &AccountProfile,
    ) -> Result<ResumeOutcome, ApiError> {
        let snapshot = self.snapshot(credential).await?;
        debug!(?snapshot, "Remote status snapshot");

        if snapshot.onboarding_complete && snapshot.has_certified_sustainability() {
            return Ok(ResumeOutcome::AlreadyComplete);
        }

        let business = match self.store.business_profile(credential).await {
            Ok(record) => record,
            Err(ApiError::NotFound) => {
                return Ok(ResumeOutcome::Resume(ResumePoint {
                    step: OnboardingStep::BusinessProfile,
                    prefill: account_prefill(profile),
                    has_existing_business: false,
                    documents_on_file: Vec::new(),
                    advisories: Vec::new(),
                }));
            }
            Err(e) => return Err(e),
        };

        let prefill = business_prefill(profile, &business);
        let documents_on_file = business.documents_on_file();
        let missing = business.missing_required_documents();

        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
            info!(missing = ?names, "Business profile is missing required documents");
            return Ok(ResumeOutcome::Resume(ResumePoint {
                step: OnboardingStep::BusinessProfile,
                prefill,
                has_existing_business: true,
                documents_on_file,
                advisories: vec![Advisory::blocking(
                    AdvisoryKind::MissingIdentityDocument,
                    format!("Upload {} before continuing.", names.join(", ")),
                )],
            }));
        }

        if snapshot.sustainability_certifications.is_some() {
            return Ok(ResumeOutcome::AlreadyComplete);
        }

        Ok(ResumeOutcome::Resume(ResumePoint {
            step: OnboardingStep::Sustainability,
            prefill,
            has_existing_business: true,
            documents_on_file,
            advisories: Vec::new(),
        }))
    }
}

fn account_prefill(profile: &AccountProfile) -> BTreeMap<String, String> {
    let mut prefill = BTreeMap::new();
    let values = [
        (field_names::CONTACT_NAME, Some(&profile.full_name)),
        (field_names::CONTACT_EMAIL, Some(&profile.email)),
        (field_names::CONTACT_PHONE, profile.phone.as_ref()),
    ];
    for (key, value) in values {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            prefill.insert(key.to_string(), value.clone());
        }
    }
    prefill
}

fn business_prefill(
    profile: &AccountProfile,
    business: &BusinessProfileRecord,
) -> BTreeMap<String, String> {
    let mut prefill = account_prefill(profile);
    prefill.extend(business.prefill());
    prefill
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::{OnboardingStatus, SustainabilityProfileRecord};
    use crate::onboarding::testing::FakeBackend;

    fn resolver(backend: &Arc<FakeBackend>) -> ResumeResolver {
        ResumeResolver::new(backend.clone(), backend.clone())
    }

    fn business(documents: serde_json::Value) -> BusinessProfileRecord {
        serde_json::from_value(json!({
            "business_name": "Acme Goods",
            "city": "Nairobi",
            "documents": documents,
        }))
        .unwrap()
    }

    fn complete_business() -> BusinessProfileRecord {
        business(json!([{"document_type": "identity_proof", "document_status": "approved"}]))
    }

    fn certified() -> SustainabilityProfileRecord {
        SustainabilityProfileRecord {
            certifications: vec![json!({"name": "FSC"})],
            practices: None,
        }
    }

    fn expect_resume(outcome: ResumeOutcome) -> ResumePoint {
        match outcome {
            ResumeOutcome::Resume(point) => point,
            ResumeOutcome::AlreadyComplete => panic!("expected a resume point"),
        }
    }

    #[tokio::test]
    async fn no_credential_starts_at_signup_without_calls() {
        let backend = FakeBackend::new();
        let outcome = resolver(&backend).resolve(None).await.unwrap();

        assert_eq!(outcome, ResumeOutcome::Resume(ResumePoint::fresh()));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn buyer_is_rejected() {
        let backend = FakeBackend::new();
        backend.set_profile_type(ProfileType::Buyer);

        let err = resolver(&backend)
            .resolve(Some(&Credential::new("t")))
            .await
            .unwrap_err();
        assert!(matches!(err, ResumeError::WrongRole { ref found } if found == "buyer"));
        assert_eq!(backend.calls(), vec!["current_profile"]);
    }

    #[tokio::test]
    async fn expired_credential_starts_at_signup() {
        let backend = FakeBackend::new();
        backend.fail_profile(401);

        let outcome = resolver(&backend).resolve(Some(&Credential::new("t"))).await.unwrap();
        assert_eq!(expect_resume(outcome).step, OnboardingStep::Signup);
    }

    #[tokio::test]
    async fn profile_outage_is_fatal() {
        let backend = FakeBackend::new();
        backend.fail_profile(500);

        let err = resolver(&backend)
            .resolve(Some(&Credential::new("t")))
            .await
            .unwrap_err();
        assert!(matches!(err, ResumeError::ProfileUnavailable(_)));
    }

    #[tokio::test]
    async fn no_business_lands_on_business_profile_with_account_prefill() {
        let backend = FakeBackend::new();

        let point = expect_resume(
            resolver(&backend).resolve(Some(&Credential::new("t"))).await.unwrap(),
        );

        assert_eq!(point.step, OnboardingStep::BusinessProfile);
        assert!(!point.has_existing_business);
        assert_eq!(point.prefill[field_names::CONTACT_NAME], "Ada Obi");
        assert_eq!(point.prefill[field_names::CONTACT_EMAIL], "ada@example.com");
        assert!(point.advisories.is_empty());
    }

    #[tokio::test]
    async fn missing_identity_document_blocks_on_business_profile() {
        let backend = FakeBackend::new();
        backend.set_business(business(json!([
            {"document_type": "tax_certificate", "document_status": "approved"}
        ])));

        let point = expect_resume(
            resolver(&backend).resolve(Some(&Credential::new("t"))).await.unwrap(),
        );

        assert_eq!(point.step, OnboardingStep::BusinessProfile);
        assert!(point.has_existing_business);
        assert!(point.is_blocked());
        assert_eq!(point.advisories[0].kind, AdvisoryKind::MissingIdentityDocument);
        assert_eq!(point.prefill["business_name"], "Acme Goods");
        assert_eq!(point.prefill[field_names::CONTACT_NAME], "Ada Obi");
        assert_eq!(point.documents_on_file, vec![DocumentType::TaxCertificate]);
    }

    #[tokio::test]
    async fn complete_business_without_sustainability_lands_on_sustainability() {
        let backend = FakeBackend::new();
        backend.set_status(OnboardingStatus {
            supplier_business: true,
            ..Default::default()
        });
        backend.set_business(complete_business());

        let point = expect_resume(
            resolver(&backend).resolve(Some(&Credential::new("t"))).await.unwrap(),
        );

        assert_eq!(point.step, OnboardingStep::Sustainability);
        assert!(point.has_existing_business);
        assert!(!point.is_blocked());
    }

    #[tokio::test]
    async fn complete_business_with_sustainability_is_complete() {
        let backend = FakeBackend::new();
        backend.set_status(OnboardingStatus {
            supplier_business: true,
            sustainability_profile: true,
            ..Default::default()
        });
        backend.set_business(complete_business());
        backend.set_sustainability(SustainabilityProfileRecord::default());

        let outcome = resolver(&backend).resolve(Some(&Credential::new("t"))).await.unwrap();
        assert_eq!(outcome, ResumeOutcome::AlreadyComplete);
    }

    #[tokio::test]
    async fn complete_and_certified_short_circuits_business_lookup() {
        let backend = FakeBackend::new();
        backend.set_status(OnboardingStatus {
            is_onboarding_complete: true,
            supplier_business: true,
            sustainability_profile: true,
        });
        backend.set_sustainability(certified());
        // Even a broken business profile does not matter here.
        backend.set_business(business(json!([])));

        let outcome = resolver(&backend).resolve(Some(&Credential::new("t"))).await.unwrap();

        assert_eq!(outcome, ResumeOutcome::AlreadyComplete);
        assert_eq!(backend.count("business_profile"), 0);
    }

    #[tokio::test]
    async fn status_failure_degrades_to_business_profile() {
        let backend = FakeBackend::new();
        backend.fail_status();
        backend.set_business(complete_business());

        let point = expect_resume(
            resolver(&backend).resolve(Some(&Credential::new("t"))).await.unwrap(),
        );

        assert_eq!(point.step, OnboardingStep::BusinessProfile);
        assert!(!point.has_existing_business);
        assert!(!point.is_blocked());
        assert_eq!(point.advisories[0].kind, AdvisoryKind::StatusUnavailable);
        assert_eq!(point.prefill[field_names::CONTACT_NAME], "Ada Obi");
        assert!(!point.prefill.contains_key("business_name"));
    }

    #[tokio::test]
    async fn business_read_failure_degrades() {
        let backend = FakeBackend::new();
        backend.fail_business_read();

        let point = expect_resume(
            resolver(&backend).resolve(Some(&Credential::new("t"))).await.unwrap(),
        );
        assert_eq!(point.step, OnboardingStep::BusinessProfile);
        assert_eq!(point.advisories[0].kind, AdvisoryKind::StatusUnavailable);
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let backend = FakeBackend::new();
        backend.set_business(business(json!([])));
        let resolver = resolver(&backend);
        let credential = Credential::new("t");

        let first = resolver.resolve(Some(&credential)).await.unwrap();
        let second = resolver.resolve(Some(&credential)).await.unwrap();
        assert_eq!(first, second);
    }
}
