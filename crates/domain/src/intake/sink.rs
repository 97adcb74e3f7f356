use async_trait::async_trait;
use serde::Serialize;

use crate::errors::Error;

use super::payload::SubmissionPayload;

/// Receives the finished intake (persists it and schedules reminders).
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<(), Error>;
}

#[derive(Serialize)]
struct CreatePrescriptionItem<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct CreatePrescriptionRequest<'a> {
    phone_number: &'a str,
    items: Vec<CreatePrescriptionItem<'a>>,
    language: &'a str,
}

impl<'a> From<&'a SubmissionPayload> for CreatePrescriptionRequest<'a> {
    fn from(payload: &'a SubmissionPayload) -> Self {
        Self {
            phone_number: &payload.phone,
            items: payload
                .items
                .iter()
                .map(|i| CreatePrescriptionItem { text: &i.text })
                .collect(),
            language: payload.language.code(),
        }
    }
}

/// Posts intakes to the reminders backend's prescription endpoint.
#[derive(Clone, Debug)]
pub struct HttpSubmissionSink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSubmissionSink {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SubmissionSink for HttpSubmissionSink {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<(), Error> {
        let url = format!("{}/prescriptions", self.base_url);

        self.client
            .post(&url)
            .json(&CreatePrescriptionRequest::from(payload))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Submission { message: e.to_string() })?;

        tracing::info!("Submitted {} items", payload.items.len());
        Ok(())
    }
}
