//! Supplier onboarding: resume resolution and the step state machine.
//!
//! A session starts by asking the [`ResumeResolver`] where the vendor left
//! off, then hands the resulting [`ResumePoint`] to a [`StepController`],
//! which runs each step's exit action against the remote store and advances
//! through SIGNUP → BUSINESS_PROFILE → PRODUCT_INFO → INVENTORY →
//! SUSTAINABILITY → COMPLETE.

pub mod controller;
pub mod inventory;
pub mod model;
pub mod resume;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{
    OnboardingDeps, StepController, StepInput, StepOutcome, VERIFICATION_THRESHOLD,
};
pub use inventory::{BatchReport, VariantOutcome, run_variant_batch};
pub use model::{
    Advisory, AdvisoryKind, BusinessNext, BusinessProfileInput, DocumentType, DocumentUpload,
    ProductInput, SignupInput, SustainabilityInput, UploadFile, VariantInput,
};
pub use resume::{ResumeOutcome, ResumePoint, ResumeResolver};
pub use state::{OnboardingState, OnboardingStep};
