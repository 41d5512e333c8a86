//! HTTP client for the remote onboarding API.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::types::{
    AccountProfile, BusinessProfileRecord, CreatedProduct, OnboardingStatus,
    SustainabilityProfileRecord, TokenResponse, VariantRecord, VerificationResult,
};
use super::{AccountService, Credential, OnboardingStore, VerificationGate};
use crate::config::OnboardingConfig;
use crate::error::ApiError;
use crate::onboarding::model::{
    BusinessProfileInput, ProductInput, SignupInput, SustainabilityInput, UploadFile, VariantInput,
};

/// Route table, relative to the API base URL.
pub mod routes {
    pub const REGISTER: &str = "/api/auth/register";
    pub const OTP_SEND: &str = "/api/auth/otp/send";
    pub const OTP_VERIFY: &str = "/api/auth/otp/verify";
    pub const PROFILE: &str = "/api/auth/profile";
    pub const STATUS: &str = "/api/supplier/onboarding/status";
    pub const BUSINESS_PROFILE: &str = "/api/supplier/business-profile";
    pub const BUSINESS_ONBOARDING: &str = "/api/supplier/business-onboarding";
    pub const SUSTAINABILITY_PROFILE: &str = "/api/supplier/sustainability-profile";
    pub const VERIFY_PRODUCT: &str = "/api/products/verify-before-creation";
    pub const PRODUCTS: &str = "/api/products";

    pub fn variants(product_id: &str) -> String {
        format!("{PRODUCTS}/{product_id}/variants")
    }
}

/// reqwest-backed implementation of every remote collaborator.
#[derive(Debug, Clone)]
pub struct HttpOnboardingClient {
    client: Client,
    base_url: String,
}

impl HttpOnboardingClient {
    /// Create a client from configuration.
    pub fn new(config: &OnboardingConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authed(&self, builder: RequestBuilder, credential: &Credential) -> RequestBuilder {
        builder.header(reqwest::header::AUTHORIZATION, credential.bearer())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        credential: &Credential,
    ) -> Result<T, ApiError> {
        let response = self
            .authed(self.client.get(self.url(path)), credential)
            .send()
            .await?;
        parse_json(response).await
    }

    async fn send_multipart(
        &self,
        builder: RequestBuilder,
        credential: &Credential,
        form: Form,
    ) -> Result<Response, ApiError> {
        let response = self.authed(builder, credential).multipart(form).send().await?;
        check_status(response).await
    }

    fn business_form(input: &BusinessProfileInput) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (key, value) in &input.details {
            form = form.text(key.clone(), value.clone());
        }
        for doc in &input.documents {
            form = form.part(doc.kind.field_name(), file_part(&doc.file)?);
        }
        Ok(form)
    }
}

#[async_trait]
impl AccountService for HttpOnboardingClient {
    #[instrument(skip_all)]
    async fn current_profile(&self, credential: &Credential) -> Result<AccountProfile, ApiError> {
        self.get_json(routes::PROFILE, credential).await
    }

    #[instrument(skip_all, fields(email = %input.email))]
    async fn create_account(&self, input: &SignupInput) -> Result<Credential, ApiError> {
        use secrecy::ExposeSecret;

        let body = serde_json::json!({
            "full_name": input.full_name,
            "email": input.email,
            "phone": input.phone,
            "password": input.password.expose_secret(),
            "profile_type": "supplier",
        });
        let response = self
            .client
            .post(self.url(routes::REGISTER))
            .json(&body)
            .send()
            .await?;
        let token: TokenResponse = parse_json(response).await?;
        Ok(Credential::new(token.token))
    }

    #[instrument(skip_all)]
    async fn send_otp(&self, credential: &Credential, phone: &str) -> Result<(), ApiError> {
        let response = self
            .authed(self.client.post(self.url(routes::OTP_SEND)), credential)
            .json(&serde_json::json!({ "phone": phone }))
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    #[instrument(skip_all)]
    async fn verify_otp(
        &self,
        credential: &Credential,
        phone: &str,
        code: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .authed(self.client.post(self.url(routes::OTP_VERIFY)), credential)
            .json(&serde_json::json!({ "phone": phone, "code": code }))
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}

#[async_trait]
impl OnboardingStore for HttpOnboardingClient {
    #[instrument(skip_all)]
    async fn status(&self, credential: &Credential) -> Result<OnboardingStatus, ApiError> {
        self.get_json(routes::STATUS, credential).await
    }

    #[instrument(skip_all)]
    async fn business_profile(
        &self,
        credential: &Credential,
    ) -> Result<BusinessProfileRecord, ApiError> {
        self.get_json(routes::BUSINESS_PROFILE, credential).await
    }

    #[instrument(skip_all)]
    async fn sustainability_profile(
        &self,
        credential: &Credential,
    ) -> Result<SustainabilityProfileRecord, ApiError> {
        self.get_json(routes::SUSTAINABILITY_PROFILE, credential)
            .await
    }

    #[instrument(skip_all, fields(documents = input.documents.len()))]
    async fn create_business_profile(
        &self,
        credential: &Credential,
        input: &BusinessProfileInput,
    ) -> Result<(), ApiError> {
        let form = Self::business_form(input)?;
        let builder = self.client.post(self.url(routes::BUSINESS_ONBOARDING));
        self.send_multipart(builder, credential, form).await.map(|_| ())
    }

    #[instrument(skip_all, fields(documents = input.documents.len()))]
    async fn update_business_profile(
        &self,
        credential: &Credential,
        input: &BusinessProfileInput,
    ) -> Result<(), ApiError> {
        let form = Self::business_form(input)?;
        let builder = self.client.put(self.url(routes::BUSINESS_ONBOARDING));
        self.send_multipart(builder, credential, form).await.map(|_| ())
    }

    #[instrument(skip_all, fields(sku = %input.sku))]
    async fn create_product(
        &self,
        credential: &Credential,
        input: &ProductInput,
    ) -> Result<CreatedProduct, ApiError> {
        let mut form = Form::new()
            .text("name", input.name.clone())
            .text("category_id", input.category_id.clone())
            .text("sku", input.sku.clone());
        if let Some(price) = input.price {
            form = form.text("price", price.to_string());
        }
        if let Some(ref description) = input.description {
            form = form.text("description", description.clone());
        }
        if let Some(stock) = input.stock {
            form = form.text("stock", stock.to_string());
        }
        for image in &input.images {
            form = form.part("images", file_part(image)?);
        }

        let builder = self.client.post(self.url(routes::PRODUCTS));
        let response = self.send_multipart(builder, credential, form).await?;
        read_json(response).await
    }

    #[instrument(skip_all, fields(product_id = %product_id, sku = %variant.sku))]
    async fn create_variant(
        &self,
        credential: &Credential,
        product_id: &str,
        variant: &VariantInput,
    ) -> Result<VariantRecord, ApiError> {
        let response = self
            .authed(
                self.client.post(self.url(&routes::variants(product_id))),
                credential,
            )
            .json(variant)
            .send()
            .await?;
        parse_json(response).await
    }

    #[instrument(skip_all, fields(has_certificate = input.certificate.is_some()))]
    async fn save_sustainability_profile(
        &self,
        credential: &Credential,
        input: &SustainabilityInput,
    ) -> Result<(), ApiError> {
        let mut form = Form::new().text(
            "practices",
            input.practices.clone().unwrap_or_default(),
        );
        if let Some(ref certificate) = input.certificate {
            form = form.part("certificate", file_part(certificate)?);
        }
        let builder = self.client.post(self.url(routes::SUSTAINABILITY_PROFILE));
        self.send_multipart(builder, credential, form).await.map(|_| ())
    }
}

#[async_trait]
impl VerificationGate for HttpOnboardingClient {
    #[instrument(skip_all, fields(title = %title))]
    async fn verify(
        &self,
        credential: &Credential,
        title: &str,
        image: &UploadFile,
    ) -> Result<VerificationResult, ApiError> {
        let form = Form::new()
            .text("title", title.to_string())
            .part("image", file_part(image)?);
        let builder = self.client.post(self.url(routes::VERIFY_PRODUCT));
        let response = self.send_multipart(builder, credential, form).await?;
        read_json(response).await
    }
}

fn file_part(file: &UploadFile) -> Result<Part, ApiError> {
    let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
    match file.content_type {
        Some(ref mime) => part
            .mime_str(mime)
            .map_err(|e| ApiError::Parse(format!("Invalid content type {mime}: {e}"))),
        None => Ok(part),
    }
}

/// Map non-success statuses to `ApiError`, passing successes through.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound),
        _ => {
            let body = response.text().await.unwrap_or_default();
            let detail = extract_detail(&body);
            debug!(status = status.as_u16(), %detail, "Remote call failed");
            Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            })
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response
        .json()
        .await
        .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")))
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    read_json(response).await
}

/// Pull a human-readable message out of an error body.
pub(crate) fn extract_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) => return s.clone(),
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            }
        }
    }
    body.trim().to_string()
}
