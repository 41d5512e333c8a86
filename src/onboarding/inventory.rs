//! Variant batch: creates inventory variants one at a time with per-row
//! failure isolation.

use serde::Serialize;
use tracing::{info, warn};

use crate::api::{Credential, OnboardingStore};

use super::model::VariantInput;

/// What happened to one candidate row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VariantOutcome {
    Created {
        index: usize,
        sku: String,
        variant_id: String,
    },
    Failed {
        index: usize,
        sku: String,
        reason: String,
    },
    /// Row lacked a sku or a positive price; never submitted.
    Skipped { index: usize },
}

/// Result of one pass over the candidate rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Ids of created variants, in candidate order.
    pub created_variant_ids: Vec<String>,
    /// One outcome per candidate, in candidate order.
    pub outcomes: Vec<VariantOutcome>,
}

impl BatchReport {
    /// A report marking every candidate as skipped.
    pub fn all_skipped(candidates: &[VariantInput]) -> Self {
        Self {
            created_variant_ids: Vec::new(),
            outcomes: (0..candidates.len())
                .map(|index| VariantOutcome::Skipped { index })
                .collect(),
        }
    }

    pub fn created_count(&self) -> usize {
        self.created_variant_ids.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, VariantOutcome::Skipped { .. }))
            .count()
    }

    /// `(sku, reason)` for every row the store rejected.
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                VariantOutcome::Failed { sku, reason, .. } => Some((sku.as_str(), reason.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// Submit every eligible candidate to the store, sequentially and in order.
///
/// A failed row is recorded and the pass continues. There is no retry.
pub async fn run_variant_batch(
    store: &dyn OnboardingStore,
    credential: &Credential,
    product_id: &str,
    candidates: &[VariantInput],
) -> BatchReport {
    let mut report = BatchReport::default();

    for (index, candidate) in candidates.iter().enumerate() {
        if !candidate.is_eligible() {
            report.outcomes.push(VariantOutcome::Skipped { index });
            continue;
        }

        match store.create_variant(credential, product_id, candidate).await {
            Ok(record) => {
                info!(product_id, sku = %candidate.sku, variant_id = %record.id, "Variant created");
                report.created_variant_ids.push(record.id.clone());
                report.outcomes.push(VariantOutcome::Created {
                    index,
                    sku: candidate.sku.clone(),
                    variant_id: record.id,
                });
            }
            Err(e) => {
                warn!(product_id, sku = %candidate.sku, error = %e, "Variant creation failed");
                report.outcomes.push(VariantOutcome::Failed {
                    index,
                    sku: candidate.sku.clone(),
                    reason: e.detail(),
                });
            }
        }
    }

    report
}
