//! Wire types for the remote onboarding API.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::onboarding::model::DocumentType;

/// Role attached to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    Buyer,
    Supplier,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ProfileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Supplier => write!(f, "supplier"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The account behind a credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountProfile {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub profile_type: ProfileType,
}

/// `GET status` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingStatus {
    #[serde(default)]
    pub is_onboarding_complete: bool,
    #[serde(default)]
    pub supplier_business: bool,
    #[serde(default)]
    pub sustainability_profile: bool,
}

/// A document on file with the business profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_type: String,
    #[serde(default)]
    pub document_status: String,
}

impl DocumentRecord {
    /// Rejected documents do not count as on file.
    pub fn is_usable(&self) -> bool {
        !self.document_status.eq_ignore_ascii_case("rejected")
    }
}

/// `GET business-profile` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessProfileRecord {
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
    /// Every other field the store returns.
    #[serde(flatten)]
    pub details: BTreeMap<String, Value>,
}

impl BusinessProfileRecord {
    /// Usable documents with a recognised type.
    pub fn documents_on_file(&self) -> Vec<DocumentType> {
        let mut on_file = Vec::new();
        for kind in self
            .documents
            .iter()
            .filter(|d| d.is_usable())
            .filter_map(|d| DocumentType::from_remote(&d.document_type))
        {
            if !on_file.contains(&kind) {
                on_file.push(kind);
            }
        }
        on_file
    }

    /// Required documents that are not usable on file.
    pub fn missing_required_documents(&self) -> Vec<DocumentType> {
        let on_file = self.documents_on_file();
        DocumentType::REQUIRED
            .into_iter()
            .filter(|kind| !on_file.contains(kind))
            .collect()
    }

    /// Scalar fields rendered as strings, for form prefill.
    pub fn prefill(&self) -> BTreeMap<String, String> {
        self.details
            .iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                (!text.is_empty()).then(|| (key.clone(), text))
            })
            .collect()
    }
}

/// `GET sustainability-profile` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SustainabilityProfileRecord {
    #[serde(default)]
    pub certifications: Vec<Value>,
    #[serde(default)]
    pub practices: Option<String>,
}

/// Verification score for a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub probability: f64,
    #[serde(default)]
    pub suggestion: Option<String>,
}

/// `POST product` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedProduct {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
}

/// `POST product/{id}/variant` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantRecord {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub sku: Option<String>,
}

/// `POST register` payload.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(alias = "access_token", alias = "access")]
    pub token: String,
}

/// Identifiers arrive as either JSON strings or numbers.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
