use std::{collections::HashMap, sync::Arc};

use cqrs_es::{persist::ViewRepository, CqrsFramework, EventStore};
use ulid::Ulid;

use crate::{
    errors::Error,
    i18n::{MessageKey, Messages},
};

use super::{
    payload::SubmissionPayload, Command, Extractor, Intake, SubmissionSink, View, AGGREGATE_TYPE,
};

/// Drives intake sessions: routes commands through the cqrs framework and
/// calls the extraction service and submission sink between them.
pub struct IntakeWizard<ES>
where
    ES: EventStore<Intake>,
{
    cqrs: Arc<CqrsFramework<Intake, ES>>,
    views: Arc<Box<dyn ViewRepository<View, Intake>>>,
    extractor: Arc<dyn Extractor>,
    sink: Arc<dyn SubmissionSink>,
    messages: Messages,
}

impl<ES> IntakeWizard<ES>
where
    ES: EventStore<Intake>,
{
    pub fn new(
        cqrs: Arc<CqrsFramework<Intake, ES>>,
        views: Arc<Box<dyn ViewRepository<View, Intake>>>,
        extractor: Arc<dyn Extractor>,
        sink: Arc<dyn SubmissionSink>,
        messages: Messages,
    ) -> Self {
        Self {
            cqrs,
            views,
            extractor,
            sink,
            messages,
        }
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Open a new session and return its id.
    pub async fn start(&self) -> Result<String, Error> {
        let id = Ulid::new().to_string();
        self.execute(&id, Command::StartIntake { id: id.clone() }).await?;
        tracing::info!("Intake {} started", id);
        Ok(id)
    }

    pub async fn execute(&self, id: &str, command: Command) -> Result<(), Error> {
        let mut metadata = HashMap::new();
        metadata.insert("command_id".to_string(), Ulid::new().to_string());

        self.cqrs
            .execute_with_metadata(id, command, metadata)
            .await
            .map_err(Error::from)
    }

    pub async fn load(&self, id: &str) -> Result<View, Error> {
        self.views
            .load(id)
            .await
            .map_err(|e| Error::Store { message: e.to_string() })?
            .ok_or(Error::NotFound { entity: AGGREGATE_TYPE.to_string() })
    }

    /// Run one extraction for the given text. A failing extraction service is
    /// recovered here: the session goes back to the prescription step with a
    /// localized error and the returned view reflects that.
    pub async fn extract(&self, id: &str, prescription_text: &str) -> Result<View, Error> {
        self.execute(
            id,
            Command::RequestExtraction {
                prescription_text: prescription_text.to_string(),
            },
        )
        .await?;

        let command = match self.extractor.extract(prescription_text).await {
            Ok(items) => {
                tracing::info!("Extracted {} items for intake {}", items.len(), id);
                Command::CompleteExtraction { items }
            }
            Err(e) => {
                tracing::warn!("Extraction failed for intake {}: {}", id, e);
                Command::FailExtraction {
                    message: self.messages.text(MessageKey::ExtractionFailed).to_string(),
                }
            }
        };

        self.execute(id, command).await?;
        self.load(id).await
    }

    /// Hand the reviewed items to the submission sink. Sink failures are
    /// recorded on the session and returned to the caller.
    pub async fn submit(&self, id: &str) -> Result<View, Error> {
        self.execute(id, Command::BeginSubmission).await?;

        let view = self.load(id).await?;
        let payload = match SubmissionPayload::from_intake(&view.intake, self.messages.language()) {
            Ok(payload) => payload,
            Err(e) => {
                self.fail_submission(id, &e).await?;
                return Err(e);
            }
        };

        if let Err(e) = self.sink.submit(&payload).await {
            tracing::error!("Submission failed for intake {}: {}", id, e);
            self.fail_submission(id, &e).await?;
            return Err(e);
        }

        self.execute(id, Command::CompleteSubmission).await?;
        tracing::info!("Intake {} submitted with {} items", id, payload.items.len());
        self.load(id).await
    }

    async fn fail_submission(&self, id: &str, err: &Error) -> Result<(), Error> {
        let message = match err {
            Error::Submission { .. } => self.messages.text(MessageKey::SubmissionFailed).to_string(),
            other => other.to_string(),
        };
        self.execute(id, Command::FailSubmission { message }).await
    }
}
