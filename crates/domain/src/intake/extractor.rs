use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Error;

use super::items::{CandidateItem, Confidence, ItemType};

/// Turns free prescription text into candidate items.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, prescription_text: &str) -> Result<Vec<CandidateItem>, Error>;
}

#[derive(Serialize)]
struct ExtractionRequest<'a> {
    prescription_text: &'a str,
}

/// Wire shape of one item returned by the extraction service
#[derive(Clone, Debug, Deserialize)]
pub struct ExtractedItem {
    pub item_type: ItemType,
    pub item_name: String,
    pub item_name_complete: String,
    pub pills_per_dose: Option<f64>,
    pub doses_per_day: Option<f64>,
    pub treatment_duration_days: Option<f64>,
    pub total_pills_required: Option<f64>,
    pub raw_prescription_text: String,
    pub confidence_level: Confidence,
    pub requires_human_review: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub items: Vec<ExtractedItem>,
    #[serde(default)]
    pub raw_response: Option<String>,
}

impl From<ExtractedItem> for CandidateItem {
    fn from(item: ExtractedItem) -> Self {
        CandidateItem {
            item_type: item.item_type,
            name: item.item_name,
            full_description: item.item_name_complete,
            pills_per_dose: item.pills_per_dose,
            doses_per_day: item.doses_per_day,
            duration_days: item.treatment_duration_days,
            total_pills_required: item.total_pills_required,
            raw_text: item.raw_prescription_text,
            confidence: item.confidence_level,
            requires_review: item.requires_human_review,
        }
    }
}

/// Client for the prescription extractor microservice.
#[derive(Clone, Debug)]
pub struct HttpExtractor {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpExtractor {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                tracing::debug!(error = %e, "Extractor health check failed");
                false
            }
        }
    }
}

fn extraction_error(e: reqwest::Error) -> Error {
    Error::Extraction { message: e.to_string() }
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn extract(&self, prescription_text: &str) -> Result<Vec<CandidateItem>, Error> {
        let url = format!("{}/extract", self.base_url);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&ExtractionRequest { prescription_text })
            .send()
            .await
            .map_err(extraction_error)?
            .error_for_status()
            .map_err(extraction_error)?;

        let body: ExtractionResponse = response.json().await.map_err(extraction_error)?;

        tracing::info!("Extractor returned {} items", body.items.len());

        Ok(body.items.into_iter().map(CandidateItem::from).collect())
    }
}
