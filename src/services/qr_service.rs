use std::time::Duration;

use bytes::Bytes;
use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use reqwest::{header::CONTENT_TYPE, Client, Url};
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::QrPayload;

type HmacSha256 = Hmac<Sha256>;

const QR_SIZE: &str = "300";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QrError {
    #[error("Malformed QR payload")]
    Malformed,
    #[error("Invalid QR code")]
    InvalidSignature,
    #[error("QR code expired")]
    Expired,
}

impl From<QrError> for AppError {
    fn from(err: QrError) -> Self {
        match err {
            QrError::Malformed => AppError::Validation(err.to_string()),
            QrError::InvalidSignature | QrError::Expired => AppError::Unauthorized(err.to_string()),
        }
    }
}

/// Signs and verifies the per-day check-in payload embedded in a member's QR code.
#[derive(Clone)]
pub struct QrSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for QrSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrSigner").field("secret", &"[REDACTED]").finish()
    }
}

impl QrSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    fn mac(&self, member_id: Uuid, issued_on: NaiveDate) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(format!("{}:{}", member_id, issued_on).as_bytes());
        mac
    }

    pub fn sign(&self, member_id: Uuid, issued_on: NaiveDate) -> String {
        hex::encode(self.mac(member_id, issued_on).finalize().into_bytes())
    }

    pub fn issue(&self, member_id: Uuid, issued_on: NaiveDate) -> QrPayload {
        QrPayload {
            member_id,
            issued_on,
            signature: self.sign(member_id, issued_on),
        }
    }

    /// Issue a payload and serialize it to the JSON text embedded in the image.
    pub fn issue_json(&self, member_id: Uuid, issued_on: NaiveDate) -> Result<String, AppError> {
        serde_json::to_string(&self.issue(member_id, issued_on))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode QR payload: {}", e)))
    }

    /// Parse a scanned payload and check both its signature and its date.
    pub fn verify(&self, raw: &str, today: NaiveDate) -> Result<QrPayload, QrError> {
        let payload: QrPayload = serde_json::from_str(raw.trim()).map_err(|_| QrError::Malformed)?;

        let expected = hex::decode(&payload.signature).map_err(|_| QrError::InvalidSignature)?;
        self.mac(payload.member_id, payload.issued_on)
            .verify_slice(&expected)
            .map_err(|_| QrError::InvalidSignature)?;

        if payload.issued_on != today {
            return Err(QrError::Expired);
        }

        Ok(payload)
    }
}

/// A public QR image API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrProvider {
    pub name: String,
    pub base_url: String,
    pub data_param: String,
    pub extra_params: Vec<(String, String)>,
}

impl QrProvider {
    fn new(name: &str, base_url: &str, data_param: &str, extra_params: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            data_param: data_param.to_string(),
            extra_params: extra_params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn qrserver() -> Self {
        Self::new(
            "qrserver",
            "https://api.qrserver.com/v1/create-qr-code/",
            "data",
            &[("size", "300x300"), ("format", "png")],
        )
    }

    pub fn quickchart() -> Self {
        Self::new("quickchart", "https://quickchart.io/qr", "text", &[("size", QR_SIZE)])
    }

    pub fn google_charts() -> Self {
        Self::new(
            "google",
            "https://chart.googleapis.com/chart",
            "chl",
            &[("cht", "qr"), ("chs", "300x300")],
        )
    }

    /// Default fallback order.
    pub fn defaults() -> Vec<Self> {
        vec![Self::qrserver(), Self::quickchart(), Self::google_charts()]
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "qrserver" => Some(Self::qrserver()),
            "quickchart" => Some(Self::quickchart()),
            "google" | "google_charts" => Some(Self::google_charts()),
            _ => None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Full image URL for `data`.
    pub fn image_url(&self, data: &str) -> Result<Url, AppError> {
        let mut params: Vec<(&str, &str)> = self
            .extra_params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        params.push((self.data_param.as_str(), data));

        Url::parse_with_params(&self.base_url, &params).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Invalid QR provider URL '{}': {}", self.base_url, e))
        })
    }
}

#[derive(Debug, Clone)]
pub struct RenderedQr {
    pub provider: String,
    pub content_type: String,
    pub image: Bytes,
}

/// Fetches QR images, trying each provider once in the configured order.
#[derive(Clone)]
pub struct QrRenderer {
    client: Client,
    providers: Vec<QrProvider>,
}

impl QrRenderer {
    pub fn new(providers: Vec<QrProvider>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, providers })
    }

    /// URL of the first provider, handed to clients that render the image themselves.
    pub fn primary_image_url(&self, data: &str) -> Result<String, AppError> {
        let provider = self
            .providers
            .first()
            .ok_or_else(|| AppError::Upstream("no QR providers configured".to_string()))?;
        Ok(provider.image_url(data)?.to_string())
    }

    pub async fn render(&self, data: &str) -> Result<RenderedQr, AppError> {
        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match self.fetch(provider, data).await {
                Ok(rendered) => {
                    info!(provider = %provider.name, "Rendered QR code");
                    return Ok(rendered);
                }
                Err(reason) => {
                    warn!(provider = %provider.name, %reason, "QR provider failed, trying next");
                    failures.push(format!("{}: {}", provider.name, reason));
                }
            }
        }

        Err(AppError::Upstream(if failures.is_empty() {
            "no QR providers configured".to_string()
        } else {
            failures.join("; ")
        }))
    }

    async fn fetch(&self, provider: &QrProvider, data: &str) -> Result<RenderedQr, String> {
        let url = provider.image_url(data).map_err(|e| e.to_string())?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("status {}", status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(format!("unexpected content type '{}'", content_type));
        }

        let image = response
            .bytes()
            .await
            .map_err(|e| format!("failed to read body: {}", e))?;
        if image.is_empty() {
            return Err("empty body".to_string());
        }

        Ok(RenderedQr {
            provider: provider.name.clone(),
            content_type,
            image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn test_issued_payload_verifies_on_the_same_day() {
        let signer = QrSigner::new("qr-test-secret");
        let member = Uuid::new_v4();
        let raw = signer.issue_json(member, day(10)).unwrap();

        let payload = signer.verify(&raw, day(10)).unwrap();
        assert_eq!(payload.member_id, member);
    }

    #[test]
    fn test_yesterdays_payload_is_expired() {
        let signer = QrSigner::new("qr-test-secret");
        let raw = signer.issue_json(Uuid::new_v4(), day(9)).unwrap();

        assert_eq!(signer.verify(&raw, day(10)), Err(QrError::Expired));
    }

    #[test]
    fn test_tampered_member_id_is_rejected() {
        let signer = QrSigner::new("qr-test-secret");
        let mut payload = signer.issue(Uuid::new_v4(), day(10));
        payload.member_id = Uuid::new_v4();
        let raw = serde_json::to_string(&payload).unwrap();

        assert_eq!(signer.verify(&raw, day(10)), Err(QrError::InvalidSignature));
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let raw = QrSigner::new("one").issue_json(Uuid::new_v4(), day(10)).unwrap();
        assert_eq!(QrSigner::new("two").verify(&raw, day(10)), Err(QrError::InvalidSignature));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let signer = QrSigner::new("qr-test-secret");
        assert_eq!(signer.verify("not json", day(10)), Err(QrError::Malformed));
        assert_matches!(AppError::from(QrError::Malformed), AppError::Validation(_));
        assert_matches!(AppError::from(QrError::Expired), AppError::Unauthorized(_));
    }

    #[test]
    fn test_provider_lookup_and_urls() {
        assert_eq!(QrProvider::by_name("QuickChart"), Some(QrProvider::quickchart()));
        assert_eq!(QrProvider::by_name("nope"), None);

        let url = QrProvider::qrserver().image_url(r#"{"a":1}"#).unwrap();
        assert_eq!(url.host_str(), Some("api.qrserver.com"));
        assert!(url.query_pairs().any(|(k, v)| k == "data" && v == r#"{"a":1}"#));
    }
}
