//! Step controller: drives the onboarding state machine.
//!
//! One handler per step. A submission runs the current step's exit action
//! (remote calls), then either advances the state or leaves it untouched and
//! returns a [`StepError`]. Only one submission may be in flight at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::api::{AccountService, Credential, OnboardingStore, VerificationGate, VerificationResult};
use crate::error::StepError;

use super::inventory::{BatchReport, run_variant_batch};
use super::model::{
    Advisory, AdvisoryKind, BusinessNext, BusinessProfileInput, DocumentType, ProductInput,
    SignupInput, SustainabilityInput, VariantInput, field_names, missing_product_fields,
};
use super::resume::ResumePoint;
use super::state::{OnboardingState, OnboardingStep};

/// Minimum verification score for a listing to be created.
pub const VERIFICATION_THRESHOLD: f64 = 0.7;

/// Remote collaborators used by the controller.
#[derive(Clone)]
pub struct OnboardingDeps {
    pub accounts: Arc<dyn AccountService>,
    pub store: Arc<dyn OnboardingStore>,
    pub gate: Arc<dyn VerificationGate>,
}

/// A submission for one step.
#[derive(Debug)]
pub enum StepInput {
    Signup(SignupInput),
    VerifyOtp { code: String },
    /// Leave SIGNUP without a verified code after OTP dispatch failed.
    ManualAdvance,
    BusinessProfile(BusinessProfileInput),
    Product(ProductInput),
    Inventory(Vec<VariantInput>),
    Sustainability(SustainabilityInput),
}

impl StepInput {
    /// The step this input belongs to.
    pub fn step(&self) -> OnboardingStep {
        match self {
            Self::Signup(_) | Self::VerifyOtp { .. } | Self::ManualAdvance => {
                OnboardingStep::Signup
            }
            Self::BusinessProfile(_) => OnboardingStep::BusinessProfile,
            Self::Product(_) => OnboardingStep::ProductInfo,
            Self::Inventory(_) => OnboardingStep::Inventory,
            Self::Sustainability(_) => OnboardingStep::Sustainability,
        }
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub previous: OnboardingStep,
    pub current: OnboardingStep,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<Advisory>,
    /// Set by PRODUCT_INFO.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Score that approved the listing, when the gate answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
    /// Set by INVENTORY.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchReport>,
}

impl StepOutcome {
    fn new(previous: OnboardingStep, current: OnboardingStep) -> Self {
        Self {
            previous,
            current,
            advisories: Vec::new(),
            product_id: None,
            verification: None,
            batch: None,
        }
    }

    /// Whether the submission moved to a new step.
    pub fn advanced(&self) -> bool {
        self.previous != self.current
    }
}

/// Clears the in-flight flag when a submission ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the onboarding state for one session.
pub struct StepController {
    deps: OnboardingDeps,
    otp_fallback_delay: Duration,
    session_id: Uuid,
    credential: RwLock<Option<Credential>>,
    state: RwLock<OnboardingState>,
    in_flight: AtomicBool,
}

impl StepController {
    /// Start a fresh session at SIGNUP.
    pub fn new(deps: OnboardingDeps, otp_fallback_delay: Duration) -> Self {
        Self::from_resume(deps, otp_fallback_delay, None, ResumePoint::fresh())
    }

    /// Start at a resolved resume point.
    pub fn from_resume(
        deps: OnboardingDeps,
        otp_fallback_delay: Duration,
        credential: Option<Credential>,
        point: ResumePoint,
    ) -> Self {
        let mut state = OnboardingState::at(point.step);
        state.fields = point.prefill;
        state.has_existing_business = point.has_existing_business;
        state.documents_on_file = point.documents_on_file;

        let session_id = Uuid::new_v4();
        info!(session = %session_id, step = %state.current_step, "Onboarding session started");

        Self {
            deps,
            otp_fallback_delay,
            session_id,
            credential: RwLock::new(credential),
            state: RwLock::new(state),
            in_flight: AtomicBool::new(false),
        }
    }

    pub async fn current_step(&self) -> OnboardingStep {
        self.state.read().await.current_step
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> OnboardingState {
        self.state.read().await.clone()
    }

    /// Whether a submission is running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit input for the current step.
    ///
    /// Returns [`StepError::Busy`] if another submission is still running and
    /// [`StepError::WrongStep`] if `input` belongs to a different step.
    pub async fn submit(&self, input: &StepInput) -> Result<StepOutcome, StepError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(StepError::Busy)?;

        let current = self.current_step().await;
        if current.is_terminal() {
            return Err(StepError::AlreadyComplete);
        }

        let span = info_span!("onboarding_step", session = %self.session_id, step = %current);
        let result = async {
            match (current, input) {
                (OnboardingStep::Signup, StepInput::Signup(i)) => self.signup(i).await,
                (OnboardingStep::Signup, StepInput::VerifyOtp { code }) => {
                    self.verify_otp(code).await
                }
                (OnboardingStep::Signup, StepInput::ManualAdvance) => self.manual_advance().await,
                (OnboardingStep::BusinessProfile, StepInput::BusinessProfile(i)) => {
                    self.business_profile(i).await
                }
                (OnboardingStep::ProductInfo, StepInput::Product(i)) => self.product(i).await,
                (OnboardingStep::Inventory, StepInput::Inventory(rows)) => {
                    self.inventory(rows).await
                }
                (OnboardingStep::Sustainability, StepInput::Sustainability(i)) => {
                    self.sustainability(i).await
                }
                (actual, input) => Err(StepError::WrongStep {
                    expected: input.step(),
                    actual,
                }),
            }
        }
        .instrument(span)
        .await;

        match result {
            Ok(ref outcome) if outcome.advanced() => {
                info!(
                    session = %self.session_id,
                    from = %outcome.previous,
                    to = %outcome.current,
                    "Step advanced"
                );
            }
            Ok(_) => {}
            Err(ref e) => {
                warn!(
                    session = %self.session_id,
                    step = %current,
                    error = %e,
                    "Step submission failed"
                );
            }
        }
        result
    }

    async fn require_credential(&self) -> Result<Credential, StepError> {
        self.credential
            .read()
            .await
            .clone()
            .ok_or(StepError::NotSignedIn)
    }

    /// Apply a successful exit action: advance and return the outcome.
    fn advance(
        &self,
        state: &mut OnboardingState,
        target: OnboardingStep,
    ) -> Result<StepOutcome, StepError> {
        let previous = state.current_step;
        state
            .advance_to(target)
            .map_err(|_| StepError::WrongStep {
                expected: target,
                actual: previous,
            })?;
        Ok(StepOutcome::new(previous, target))
    }

    // ── SIGNUP ──────────────────────────────────────────────────────────

    async fn signup(&self, input: &SignupInput) -> Result<StepOutcome, StepError> {
        let already_signed_up = self.state.read().await.signed_up;

        let credential = if already_signed_up {
            self.require_credential().await?
        } else {
            let credential = self
                .deps
                .accounts
                .create_account(input)
                .await
                .map_err(|e| StepError::remote("Account creation", &e))?;
            *self.credential.write().await = Some(credential.clone());
            let mut state = self.state.write().await;
            state.signed_up = true;
            state.merge_fields(input.field_values());
            credential
        };

        let phone = input.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());
        let Some(phone) = phone.filter(|_| input.request_otp) else {
            let mut state = self.state.write().await;
            return self.advance(&mut state, OnboardingStep::BusinessProfile);
        };

        let dispatch = self.deps.accounts.send_otp(&credential, phone).await;
        let mut state = self.state.write().await;
        let mut outcome = StepOutcome::new(OnboardingStep::Signup, OnboardingStep::Signup);
        match dispatch {
            Ok(()) => {
                state.otp_pending = true;
                state.otp_failed_at = None;
                state.otp_phone = Some(phone.to_string());
                state.merge_fields([(field_names::CONTACT_PHONE, phone)]);
                info!("One-time code sent");
            }
            Err(e) => {
                warn!(error = %e, "One-time code dispatch failed; manual advance will be allowed");
                state.otp_pending = false;
                state.otp_phone = None;
                state.otp_failed_at = Some(Utc::now());
                outcome.advisories.push(Advisory::warning(
                    AdvisoryKind::OtpUnavailable,
                    format!(
                        "We could not send a verification code. You can continue in {}s.",
                        self.otp_fallback_delay.as_secs()
                    ),
                ));
            }
        }
        Ok(outcome)
    }

    async fn verify_otp(&self, code: &str) -> Result<StepOutcome, StepError> {
        let (pending, phone) = {
            let state = self.state.read().await;
            (state.otp_pending, state.otp_phone.clone())
        };
        let credential = self.require_credential().await?;
        let (true, Some(phone)) = (pending, phone) else {
            return Err(StepError::Validation {
                missing: vec!["otp_dispatch".to_string()],
            });
        };
        if code.trim().is_empty() {
            return Err(StepError::Validation {
                missing: vec!["otp_code".to_string()],
            });
        }

        self.deps
            .accounts
            .verify_otp(&credential, &phone, code.trim())
            .await
            .map_err(|e| StepError::remote("Code verification", &e))?;

        let mut state = self.state.write().await;
        state.otp_pending = false;
        state.otp_phone = None;
        self.advance(&mut state, OnboardingStep::BusinessProfile)
    }

    async fn manual_advance(&self) -> Result<StepOutcome, StepError> {
        let mut state = self.state.write().await;
        if !state.signed_up {
            return Err(StepError::NotSignedIn);
        }
        let Some(failed_at) = state.otp_failed_at else {
            return Err(StepError::Validation {
                missing: vec!["otp_code".to_string()],
            });
        };

        let elapsed = (Utc::now() - failed_at).to_std().unwrap_or_default();
        if elapsed < self.otp_fallback_delay {
            let remaining = self.otp_fallback_delay - elapsed;
            return Err(StepError::OtpNotReady {
                remaining_secs: remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
            });
        }

        info!("Advancing without a verified code");
        self.advance(&mut state, OnboardingStep::BusinessProfile)
    }

    // ── BUSINESS_PROFILE ───────────────────────────────────────────────

    async fn business_profile(
        &self,
        input: &BusinessProfileInput,
    ) -> Result<StepOutcome, StepError> {
        let credential = self.require_credential().await?;
        let (has_existing_business, missing) = {
            let state = self.state.read().await;
            let missing: Vec<String> = DocumentType::REQUIRED
                .into_iter()
                .filter(|kind| !state.has_document(*kind) && !input.includes(*kind))
                .map(|kind| kind.field_name().to_string())
                .collect();
            (state.has_existing_business, missing)
        };
        if !missing.is_empty() {
            return Err(StepError::Validation { missing });
        }

        let write = if has_existing_business {
            self.deps.store.update_business_profile(&credential, input).await
        } else {
            self.deps.store.create_business_profile(&credential, input).await
        };
        let operation = if has_existing_business {
            "Business profile update"
        } else {
            "Business profile creation"
        };
        write.map_err(|e| StepError::remote(operation, &e))?;

        let mut state = self.state.write().await;
        state.has_existing_business = true;
        for doc in &input.documents {
            if !state.has_document(doc.kind) {
                state.documents_on_file.push(doc.kind);
            }
        }
        state.merge_fields(input.details.clone());

        let target = match input.next {
            BusinessNext::ProductInfo => OnboardingStep::ProductInfo,
            BusinessNext::SkipToSustainability => OnboardingStep::Sustainability,
        };
        self.advance(&mut state, target)
    }

    // ── PRODUCT_INFO ────────────────────────────────────────────────────

    async fn product(&self, input: &ProductInput) -> Result<StepOutcome, StepError> {
        let missing = missing_product_fields(input);
        if !missing.is_empty() {
            return Err(StepError::Validation { missing });
        }
        let credential = self.require_credential().await?;

        let mut advisories = Vec::new();
        let mut verification = None;
        let Some(first_image) = input.images.first() else {
            return Err(StepError::Validation {
                missing: vec!["images".to_string()],
            });
        };

        match self.deps.gate.verify(&credential, &input.name, first_image).await {
            Ok(result) if !(0.0..=1.0).contains(&result.probability) => {
                warn!(probability = result.probability, "Verification score outside [0, 1]");
                return Err(StepError::VerificationRejected {
                    probability: result.probability,
                    suggestion: result.suggestion,
                });
            }
            Ok(result) if result.probability >= VERIFICATION_THRESHOLD => {
                info!(probability = result.probability, "Listing verified");
                verification = Some(result);
            }
            Ok(result) => {
                info!(probability = result.probability, "Listing rejected by verification");
                return Err(StepError::VerificationRejected {
                    probability: result.probability,
                    suggestion: result.suggestion,
                });
            }
            Err(e) => {
                warn!(error = %e, "Verification unavailable; creating product without a score");
                advisories.push(Advisory::warning(
                    AdvisoryKind::VerificationUnavailable,
                    "Listing verification is unavailable; the product was created unverified.",
                ));
            }
        }

        let created = self
            .deps
            .store
            .create_product(&credential, input)
            .await
            .map_err(|e| StepError::remote("Product creation", &e))?;

        let mut state = self.state.write().await;
        state.created_product_id = Some(created.id.clone());
        state.merge_fields(input.field_values());
        let mut outcome = self.advance(&mut state, OnboardingStep::Inventory)?;
        outcome.advisories = advisories;
        outcome.product_id = Some(created.id);
        outcome.verification = verification;
        Ok(outcome)
    }

    // ── INVENTORY ───────────────────────────────────────────────────────

    async fn inventory(&self, candidates: &[VariantInput]) -> Result<StepOutcome, StepError> {
        let product_id = self.state.read().await.created_product_id.clone();
        let mut advisories = Vec::new();

        let report = match product_id {
            Some(product_id) => {
                let credential = self.require_credential().await?;
                run_variant_batch(self.deps.store.as_ref(), &credential, &product_id, candidates)
                    .await
            }
            None => {
                warn!("Inventory reached without a product; no variants created");
                advisories.push(Advisory::warning(
                    AdvisoryKind::NoProductForInventory,
                    "No product was created, so no variants were added.",
                ));
                BatchReport::all_skipped(candidates)
            }
        };

        let failures = report.failures();
        if !failures.is_empty() {
            let skus: Vec<&str> = failures.iter().map(|(sku, _)| *sku).collect();
            advisories.push(Advisory::warning(
                AdvisoryKind::VariantFailures,
                format!("Some variants were not created: {}", skus.join(", ")),
            ));
        }

        let mut state = self.state.write().await;
        state
            .created_variant_ids
            .extend(report.created_variant_ids.iter().cloned());
        state.inventory_ran = true;
        let mut outcome = self.advance(&mut state, OnboardingStep::Sustainability)?;
        outcome.advisories = advisories;
        outcome.batch = Some(report);
        Ok(outcome)
    }

    // ── SUSTAINABILITY ──────────────────────────────────────────────────

    async fn sustainability(&self, input: &SustainabilityInput) -> Result<StepOutcome, StepError> {
        let credential = self.require_credential().await?;

        self.deps
            .store
            .save_sustainability_profile(&credential, input)
            .await
            .map_err(|e| StepError::remote("Sustainability profile", &e))?;

        let mut state = self.state.write().await;
        if let Some(ref practices) = input.practices {
            state.merge_fields([(field_names::SUSTAINABILITY_PRACTICES, practices.clone())]);
        }
        self.advance(&mut state, OnboardingStep::Complete)
    }
}
