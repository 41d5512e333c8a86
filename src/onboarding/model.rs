//! Step inputs, uploads, and advisories.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Names of the fields accumulated in `OnboardingState::fields`.
pub mod field_names {
    pub const CONTACT_NAME: &str = "contact_name";
    pub const CONTACT_EMAIL: &str = "contact_email";
    pub const CONTACT_PHONE: &str = "contact_phone";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const PRODUCT_SKU: &str = "product_sku";
    pub const CATEGORY_ID: &str = "category_id";
    pub const SUSTAINABILITY_PRACTICES: &str = "sustainability_practices";
}

/// A file headed for the upload channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Named document slots accepted by the business onboarding upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    IdentityProof,
    BusinessRegistration,
    TaxCertificate,
    AddressProof,
    BankStatement,
    TradeLicense,
    BusinessLogo,
    StorefrontImage,
}

impl DocumentType {
    /// Documents that must be on file before leaving BUSINESS_PROFILE.
    pub const REQUIRED: [DocumentType; 1] = [DocumentType::IdentityProof];

    /// Multipart field name for this slot.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::IdentityProof => "identity_proof",
            Self::BusinessRegistration => "business_registration",
            Self::TaxCertificate => "tax_certificate",
            Self::AddressProof => "address_proof",
            Self::BankStatement => "bank_statement",
            Self::TradeLicense => "trade_license",
            Self::BusinessLogo => "business_logo",
            Self::StorefrontImage => "storefront_image",
        }
    }

    /// Parse a remote `document_type` value.
    pub fn from_remote(value: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(value.to_ascii_lowercase())).ok()
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field_name())
    }
}

/// A document attached to a business-profile submission.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub kind: DocumentType,
    pub file: UploadFile,
}

/// Account creation details.
#[derive(Debug)]
pub struct SignupInput {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: SecretString,
    /// Send a one-time code to `phone` after the account is created.
    pub request_otp: bool,
}

impl SignupInput {
    pub(crate) fn field_values(&self) -> Vec<(&'static str, String)> {
        vec![
            (field_names::CONTACT_NAME, self.full_name.clone()),
            (field_names::CONTACT_EMAIL, self.email.clone()),
            (
                field_names::CONTACT_PHONE,
                self.phone.as_deref().map(str::trim).unwrap_or_default().to_string(),
            ),
        ]
    }
}

/// Where BUSINESS_PROFILE goes on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusinessNext {
    #[default]
    ProductInfo,
    /// The vendor chose not to create a product now.
    SkipToSustainability,
}

/// Business profile text fields plus document uploads.
#[derive(Debug, Clone, Default)]
pub struct BusinessProfileInput {
    pub details: BTreeMap<String, String>,
    pub documents: Vec<DocumentUpload>,
    pub next: BusinessNext,
}

impl BusinessProfileInput {
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_document(mut self, kind: DocumentType, file: UploadFile) -> Self {
        self.documents.push(DocumentUpload { kind, file });
        self
    }

    pub fn skip_product(mut self) -> Self {
        self.next = BusinessNext::SkipToSustainability;
        self
    }

    pub fn includes(&self, kind: DocumentType) -> bool {
        self.documents.iter().any(|d| d.kind == kind)
    }
}

/// Product details for PRODUCT_INFO.
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    pub name: String,
    pub category_id: String,
    pub sku: String,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub stock: Option<u32>,
    pub images: Vec<UploadFile>,
}

impl ProductInput {
    pub(crate) fn field_values(&self) -> Vec<(&'static str, String)> {
        vec![
            (field_names::PRODUCT_NAME, self.name.clone()),
            (field_names::PRODUCT_SKU, self.sku.clone()),
            (field_names::CATEGORY_ID, self.category_id.clone()),
        ]
    }
}

/// Required PRODUCT_INFO fields that are absent, in a fixed order.
///
/// Pure: no remote call is made for a product with missing fields.
pub fn missing_product_fields(input: &ProductInput) -> Vec<String> {
    let mut missing = Vec::new();
    if input.name.trim().is_empty() {
        missing.push("name");
    }
    if input.category_id.trim().is_empty() {
        missing.push("category_id");
    }
    if input.sku.trim().is_empty() {
        missing.push("sku");
    }
    if input.price.is_none() {
        missing.push("price");
    }
    if input.images.is_empty() {
        missing.push("images");
    }
    missing.into_iter().map(String::from).collect()
}

/// One row of the variant editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantInput {
    pub sku: String,
    pub price: Decimal,
    pub stock: u32,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl VariantInput {
    pub fn new(sku: impl Into<String>, price: Decimal) -> Self {
        Self {
            sku: sku.into(),
            price,
            stock: 0,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Rows need a sku and a positive price before creation is attempted.
    pub fn is_eligible(&self) -> bool {
        !self.sku.trim().is_empty() && self.price > Decimal::ZERO
    }
}

/// Sustainability practices plus an optional certificate.
#[derive(Debug, Clone, Default)]
pub struct SustainabilityInput {
    pub practices: Option<String>,
    pub certificate: Option<UploadFile>,
}

/// What kind of advisory was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    MissingIdentityDocument,
    StatusUnavailable,
    VerificationUnavailable,
    OtpUnavailable,
    NoProductForInventory,
    VariantFailures,
}

/// A structured warning returned alongside a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub message: String,
    /// The user must act on this before the step can advance.
    pub blocking: bool,
}

impl Advisory {
    pub fn warning(kind: AdvisoryKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            blocking: false,
        }
    }

    pub fn blocking(kind: AdvisoryKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            blocking: true,
        }
    }
}
