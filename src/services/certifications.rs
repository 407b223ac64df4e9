//! Simulated certificate store for the certification/appraisal pages.
//!
//! Uploads, listings, and verification are emulated with the same latency
//! and failure-policy machinery as the payment gateway. Every item also
//! carries a seeded set of records (GIA certificate, insurance appraisal,
//! AGS report) so display pages have something to render before any upload.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::CheckoutError;
use crate::gateway::FailurePolicy;

/// A certificate upload as received from the storefront form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateUpload {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CertificateKind {
    Gia,
    Ags,
    Appraisal,
}

/// A stored certification or appraisal record for a jewelry item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub id: Uuid,
    pub name: String,
    pub kind: CertificateKind,
    pub certificate_number: Option<String>,
    pub appraised_value: Option<Decimal>,
    pub issued_on: String,
    pub item_id: Uuid,
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedCertificate {
    pub file_id: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub item_id: Uuid,
    pub certificate_number: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Result of a verification check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateVerification {
    pub certificate_id: Uuid,
    pub certificate_number: String,
    pub verified: bool,
    pub verified_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct CertificationService {
    uploads: DashMap<Uuid, Vec<CertificateRecord>>,
    latency: Duration,
    upload_failure: FailurePolicy,
    fetch_failure: FailurePolicy,
    verify_failure: FailurePolicy,
}

impl CertificationService {
    /// Zero latency, never fails.
    pub fn reliable() -> Self {
        Self::default()
    }

    /// The original storefront's simulated failure rates.
    pub fn flaky() -> Self {
        Self {
            latency: Duration::from_millis(1200),
            upload_failure: FailurePolicy::rate(0.10),
            fetch_failure: FailurePolicy::rate(0.05),
            verify_failure: FailurePolicy::rate(0.05),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_upload_failure(mut self, policy: FailurePolicy) -> Self {
        self.upload_failure = policy;
        self
    }

    /// Stores an uploaded certificate for an item. Only PDF and image
    /// uploads are accepted.
    #[instrument(skip(self, upload), fields(item_id = %item_id, file = %upload.file_name))]
    pub async fn upload_certificate(
        &self,
        upload: CertificateUpload,
        item_id: Uuid,
    ) -> Result<UploadedCertificate, CheckoutError> {
        debug!(size = upload.size_bytes, "simulating certificate upload");
        self.simulate_latency().await;

        let file_type = if upload.content_type.contains("pdf") {
            "PDF"
        } else if upload.content_type.starts_with("image/") {
            "Image"
        } else {
            return Err(CheckoutError::ExternalServiceError(
                "Certificate upload failed: File format not supported".to_string(),
            ));
        };

        if let Some(reason) = self.upload_failure.trip(|| {
            "Certificate upload failed: File format not supported".to_string()
        }) {
            return Err(CheckoutError::ExternalServiceError(reason));
        }

        let certificate_number = generate_certificate_number();
        let record = CertificateRecord {
            id: Uuid::new_v4(),
            name: upload.file_name.clone(),
            kind: if file_type == "PDF" {
                CertificateKind::Gia
            } else {
                CertificateKind::Ags
            },
            certificate_number: Some(certificate_number.clone()),
            appraised_value: None,
            issued_on: Utc::now().format("%Y-%m-%d").to_string(),
            item_id,
        };
        self.uploads.entry(item_id).or_default().push(record);

        Ok(UploadedCertificate {
            file_id: format!("cert_{}", Utc::now().timestamp_millis()),
            file_name: upload.file_name,
            file_type: file_type.to_string(),
            file_size: upload.size_bytes,
            item_id,
            certificate_number,
            uploaded_at: Utc::now(),
        })
    }

    /// All certification records for an item: the seeded set plus anything
    /// uploaded this session.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn get_certifications(
        &self,
        item_id: Uuid,
    ) -> Result<Vec<CertificateRecord>, CheckoutError> {
        debug!("simulating certification fetch");
        self.simulate_latency().await;

        if let Some(reason) = self.fetch_failure.trip(|| {
            "Failed to fetch certificates: Network error".to_string()
        }) {
            return Err(CheckoutError::ExternalServiceError(reason));
        }

        let mut records = seeded_records(item_id);
        if let Some(uploaded) = self.uploads.get(&item_id) {
            records.extend(uploaded.iter().cloned());
        }
        Ok(records)
    }

    /// Confirms a certificate number against the simulated registry.
    #[instrument(skip(self), fields(certificate_id = %certificate_id))]
    pub async fn verify_certificate(
        &self,
        certificate_id: Uuid,
        certificate_number: &str,
    ) -> Result<CertificateVerification, CheckoutError> {
        debug!("simulating certificate verification");
        self.simulate_latency().await;

        if let Some(reason) = self.verify_failure.trip(|| {
            "Certificate verification failed: Invalid certificate".to_string()
        }) {
            return Err(CheckoutError::ExternalServiceError(reason));
        }

        Ok(CertificateVerification {
            certificate_id,
            certificate_number: certificate_number.to_string(),
            verified: true,
            verified_at: Utc::now(),
        })
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn generate_certificate_number() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("CERT-{}", suffix)
}

fn seeded_records(item_id: Uuid) -> Vec<CertificateRecord> {
    vec![
        CertificateRecord {
            id: Uuid::new_v4(),
            name: "GIA Diamond Certificate.pdf".to_string(),
            kind: CertificateKind::Gia,
            certificate_number: Some("GIA123456789".to_string()),
            appraised_value: None,
            issued_on: "2024-01-15".to_string(),
            item_id,
        },
        CertificateRecord {
            id: Uuid::new_v4(),
            name: "Insurance Appraisal.docx".to_string(),
            kind: CertificateKind::Appraisal,
            certificate_number: None,
            appraised_value: Some(dec!(5200.00)),
            issued_on: "2024-02-20".to_string(),
            item_id,
        },
        CertificateRecord {
            id: Uuid::new_v4(),
            name: "AGS Gemstone Report.png".to_string(),
            kind: CertificateKind::Ags,
            certificate_number: Some("AGS987654321".to_string()),
            appraised_value: None,
            issued_on: "2024-03-10".to_string(),
            item_id,
        },
    ]
}
