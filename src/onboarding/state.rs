//! Onboarding state machine: tracks which step the vendor is on.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::DocumentType;

/// The steps of supplier onboarding.
///
/// Progresses Signup → BusinessProfile → ProductInfo → Inventory →
/// Sustainability → Complete. BusinessProfile may also jump straight to
/// Sustainability when the vendor opts out of creating a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Signup,
    BusinessProfile,
    ProductInfo,
    Inventory,
    Sustainability,
    Complete,
}

impl OnboardingStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: OnboardingStep) -> bool {
        use OnboardingStep::*;
        matches!(
            (self, target),
            (Signup, BusinessProfile)
                | (BusinessProfile, ProductInfo)
                | (BusinessProfile, Sustainability)
                | (ProductInfo, Inventory)
                | (Inventory, Sustainability)
                | (Sustainability, Complete)
        )
    }

    /// Whether this step is terminal (onboarding is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Zero-based position in the progression.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Signup => 0,
            Self::BusinessProfile => 1,
            Self::ProductInfo => 2,
            Self::Inventory => 3,
            Self::Sustainability => 4,
            Self::Complete => 5,
        }
    }

    /// Rough completion percentage for progress displays.
    pub fn progress_percent(&self) -> u8 {
        self.ordinal() * 20
    }
}

impl Default for OnboardingStep {
    fn default() -> Self {
        Self::Signup
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Signup => "signup",
            Self::BusinessProfile => "business_profile",
            Self::ProductInfo => "product_info",
            Self::Inventory => "inventory",
            Self::Sustainability => "sustainability",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// State held by one step controller for one onboarding session.
///
/// Serializable for display only; resumption always re-derives the step
/// from the remote store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnboardingState {
    /// Current step.
    pub current_step: OnboardingStep,
    /// True once account creation succeeded remotely.
    pub signed_up: bool,
    /// Form values accumulated across steps. Never cleared.
    pub fields: BTreeMap<String, String>,
    /// Set once PRODUCT_INFO created a product.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_product_id: Option<String>,
    /// Variants created in INVENTORY, in submission order. Append-only.
    #[serde(default)]
    pub created_variant_ids: Vec<String>,
    /// Whether a business profile exists remotely (create vs update).
    pub has_existing_business: bool,
    /// Whether INVENTORY's batch pass has run.
    pub inventory_ran: bool,
    /// Documents already on file remotely.
    #[serde(default)]
    pub documents_on_file: Vec<DocumentType>,
    /// When the OTP dispatch failed, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_failed_at: Option<DateTime<Utc>>,
    /// Whether a dispatched OTP is awaiting verification.
    pub otp_pending: bool,
    /// Trimmed number the pending code was sent to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_phone: Option<String>,
}

impl OnboardingState {
    /// Create state positioned at `step`.
    pub fn at(step: OnboardingStep) -> Self {
        Self {
            current_step: step,
            ..Default::default()
        }
    }

    /// Move to `target`, enforcing the transition table and the product /
    /// inventory invariants.
    pub fn advance_to(&mut self, target: OnboardingStep) -> Result<OnboardingStep, String> {
        if !self.current_step.can_transition_to(target) {
            return Err(format!(
                "Cannot transition from {} to {}",
                self.current_step, target
            ));
        }
        if self.current_step == OnboardingStep::ProductInfo && self.created_product_id.is_none() {
            return Err("Cannot leave product_info without a created product".to_string());
        }
        if self.current_step == OnboardingStep::Inventory && !self.inventory_ran {
            return Err("Cannot leave inventory before the variant pass has run".to_string());
        }
        self.current_step = target;
        Ok(target)
    }

    /// Merge `values` into the accumulated fields, skipping empty values.
    pub fn merge_fields<I, K, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in values {
            let value = value.into();
            if !value.trim().is_empty() {
                self.fields.insert(key.into(), value);
            }
        }
    }

    /// Whether a document of `kind` is on file remotely.
    pub fn has_document(&self, kind: DocumentType) -> bool {
        self.documents_on_file.contains(&kind)
    }
}
