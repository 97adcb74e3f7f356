use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cqrs_es::mem_store::MemStore;
use domain::{
    intake::{
        cqrs, CandidateItem, Command, Confidence, Extractor, IntakeWizard, ItemChange, ItemId,
        ItemType, SubmissionPayload, SubmissionSink, WizardStep,
    },
    Error, Language, MessageKey, Messages,
};
use pretty_assertions::assert_eq;

struct StubExtractor {
    result: Result<Vec<CandidateItem>, Error>,
    calls: Mutex<Vec<String>>,
}

impl StubExtractor {
    fn returning(items: Vec<CandidateItem>) -> Self {
        Self { result: Ok(items), calls: Mutex::new(Vec::new()) }
    }

    fn failing() -> Self {
        Self {
            result: Err(Error::Extraction { message: "503 Service Unavailable".to_string() }),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Extractor for StubExtractor {
    async fn extract(&self, prescription_text: &str) -> Result<Vec<CandidateItem>, Error> {
        self.calls.lock().unwrap().push(prescription_text.to_string());
        self.result.clone()
    }
}

#[derive(Default)]
struct RecordingSink {
    fail: bool,
    received: Mutex<Vec<SubmissionPayload>>,
}

impl RecordingSink {
    fn received(&self) -> Vec<SubmissionPayload> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubmissionSink for RecordingSink {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<(), Error> {
        self.received.lock().unwrap().push(payload.clone());
        if self.fail {
            return Err(Error::Submission { message: "500 Internal Server Error".to_string() });
        }
        Ok(())
    }
}

fn pill(name: &str, full: &str, raw: &str, pills: f64) -> CandidateItem {
    CandidateItem {
        item_type: ItemType::Medication,
        name: name.to_string(),
        full_description: full.to_string(),
        pills_per_dose: Some(pills),
        doses_per_day: Some(1.0),
        duration_days: None,
        total_pills_required: None,
        raw_text: raw.to_string(),
        confidence: Confidence::High,
        requires_review: false,
    }
}

fn morning_and_night() -> Vec<CandidateItem> {
    vec![
        pill("Blue pill", "1 blue pill in the morning", "Take 1 blue pill in the morning", 1.0),
        pill("White pill", "2 white pills at night", "Take 2 white pills at night", 2.0),
    ]
}

fn wizard(
    extractor: Arc<StubExtractor>,
    sink: Arc<RecordingSink>,
    language: Language,
) -> IntakeWizard<MemStore<domain::intake::Intake>> {
    let repo = cqrs::init_mem_repo();
    let framework = cqrs::init_in_memory(repo.clone());
    IntakeWizard::new(framework, repo, extractor, sink, Messages::new(language))
}

async fn validate_all<ES>(wizard: &IntakeWizard<ES>, id: &str)
where
    ES: cqrs_es::EventStore<domain::intake::Intake>,
{
    let view = wizard.load(id).await.unwrap();
    for item in view.intake.items {
        wizard
            .execute(id, Command::ToggleItemValidation { item_id: item.id })
            .await
            .unwrap();
    }
}

const PRESCRIPTION: &str = "Take 1 blue pill in the morning. Take 2 white pills at night";

#[tokio::test]
async fn morning_and_night_prescription_is_submitted_once() {
    let extractor = Arc::new(StubExtractor::returning(morning_and_night()));
    let sink = Arc::new(RecordingSink::default());
    let wizard = wizard(extractor.clone(), sink.clone(), Language::En);

    let id = wizard.start().await.unwrap();
    let view = wizard.extract(&id, PRESCRIPTION).await.unwrap();
    assert_eq!(extractor.calls(), vec![PRESCRIPTION.to_string()]);
    assert_eq!(view.intake.step, WizardStep::Validate);
    assert_eq!(view.intake.items.len(), 2);
    assert!(view.intake.items.iter().all(|i| !i.validated));
    assert_ne!(view.intake.items[0].id, view.intake.items[1].id);

    let err = wizard.execute(&id, Command::ProceedToPhone).await.unwrap_err();
    assert!(matches!(err, Error::Gate { .. }));

    validate_all(&wizard, &id).await;
    assert!(wizard.load(&id).await.unwrap().intake.can_proceed_to_phone());
    wizard.execute(&id, Command::ProceedToPhone).await.unwrap();

    wizard
        .execute(
            &id,
            Command::EnterPhone {
                dial_code: domain::intake::phone::DEFAULT_DIAL_CODE.to_string(),
                local_number: "5551234567".to_string(),
            },
        )
        .await
        .unwrap();

    let view = wizard.submit(&id).await.unwrap();
    assert_eq!(view.intake.submissions, 1);
    assert!(!view.intake.submission_in_flight);

    let received = sink.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].phone, "+15551234567");
    let texts: Vec<&str> = received[0].items.iter().map(|i| i.text.as_str()).collect();
    assert_eq!(texts, vec!["1 blue pill in the morning", "2 white pills at night"]);
    assert_eq!(received[0].items[1].pills_per_dose, Some(2.0));
}

#[tokio::test]
async fn failed_extraction_returns_to_prescription_with_localized_error() {
    let extractor = Arc::new(StubExtractor::failing());
    let sink = Arc::new(RecordingSink::default());
    let wizard = wizard(extractor.clone(), sink, Language::Es);

    let id = wizard.start().await.unwrap();
    let view = wizard.extract(&id, "Omeprazol 20mg cada 24 horas").await.unwrap();

    assert_eq!(view.intake.step, WizardStep::Prescription);
    assert_eq!(view.intake.prescription_text, "Omeprazol 20mg cada 24 horas");
    assert_eq!(
        view.intake.extraction_error.as_deref(),
        Some(Messages::new(Language::Es).text(MessageKey::ExtractionFailed))
    );
    assert!(view.intake.items.is_empty());

    // retry is a plain user action, nothing is retried on its own
    assert_eq!(extractor.calls().len(), 1);
    wizard.extract(&id, "Omeprazol 20mg cada 24 horas").await.unwrap();
    assert_eq!(extractor.calls().len(), 2);
}

#[tokio::test]
async fn blank_text_never_reaches_the_extractor() {
    let extractor = Arc::new(StubExtractor::returning(morning_and_night()));
    let wizard = wizard(extractor.clone(), Arc::new(RecordingSink::default()), Language::En);

    let id = wizard.start().await.unwrap();
    let err = wizard.extract(&id, "   ").await.unwrap_err();

    assert!(matches!(err, Error::Gate { .. }));
    assert!(extractor.calls().is_empty());
    assert_eq!(wizard.load(&id).await.unwrap().intake.step, WizardStep::Prescription);
}

#[tokio::test]
async fn item_without_any_label_never_reaches_the_sink() {
    let extractor = Arc::new(StubExtractor::returning(vec![CandidateItem::default()]));
    let sink = Arc::new(RecordingSink::default());
    let wizard = wizard(extractor, sink.clone(), Language::En);

    let id = wizard.start().await.unwrap();
    wizard.extract(&id, PRESCRIPTION).await.unwrap();
    validate_all(&wizard, &id).await;

    let err = wizard.execute(&id, Command::ProceedToPhone).await.unwrap_err();
    assert!(matches!(err, Error::Gate { .. }));
    assert!(!wizard.load(&id).await.unwrap().intake.can_proceed_to_phone());

    wizard
        .execute(
            &id,
            Command::EditItem { item_id: ItemId(0), change: ItemChange::Name("Vitamin D".to_string()) },
        )
        .await
        .unwrap();
    wizard.execute(&id, Command::ProceedToPhone).await.unwrap();
    wizard
        .execute(
            &id,
            Command::EnterPhone { dial_code: "+1".to_string(), local_number: "5551234567".to_string() },
        )
        .await
        .unwrap();
    wizard.submit(&id).await.unwrap();

    let received = sink.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].items[0].text, "Vitamin D");
}

#[tokio::test]
async fn second_extraction_is_refused_while_one_is_running() {
    let extractor = Arc::new(StubExtractor::returning(morning_and_night()));
    let wizard = wizard(extractor.clone(), Arc::new(RecordingSink::default()), Language::En);

    let id = wizard.start().await.unwrap();
    wizard
        .execute(&id, Command::RequestExtraction { prescription_text: PRESCRIPTION.to_string() })
        .await
        .unwrap();

    let err = wizard.extract(&id, PRESCRIPTION).await.unwrap_err();
    assert!(matches!(err, Error::Gate { .. }));
    assert!(extractor.calls().is_empty());

    let view = wizard.load(&id).await.unwrap();
    assert_eq!(view.intake.step, WizardStep::Extracting);
    assert!(view.intake.pending_since.is_some());
}

#[tokio::test]
async fn edits_and_manual_items_flow_into_the_payload() {
    let extractor = Arc::new(StubExtractor::returning(morning_and_night()));
    let sink = Arc::new(RecordingSink::default());
    let wizard = wizard(extractor, sink.clone(), Language::En);

    let id = wizard.start().await.unwrap();
    wizard.extract(&id, PRESCRIPTION).await.unwrap();

    wizard
        .execute(
            &id,
            Command::EditItem {
                item_id: ItemId(0),
                change: ItemChange::FullDescription(String::new()),
            },
        )
        .await
        .unwrap();
    wizard
        .execute(&id, Command::DeleteItem { item_id: ItemId(1) })
        .await
        .unwrap();
    wizard
        .execute(
            &id,
            Command::AddManualItem {
                item_type: ItemType::Food,
                description: "Oatmeal at breakfast".to_string(),
            },
        )
        .await
        .unwrap();

    let view = wizard.load(&id).await.unwrap();
    let added = view.intake.items.last().unwrap();
    assert_eq!(added.id, ItemId(2));
    assert!(added.validated);

    wizard
        .execute(&id, Command::ToggleItemValidation { item_id: ItemId(0) })
        .await
        .unwrap();
    wizard.execute(&id, Command::ProceedToPhone).await.unwrap();
    wizard
        .execute(
            &id,
            Command::EnterPhone { dial_code: "+52".to_string(), local_number: "55 1234 5678".to_string() },
        )
        .await
        .unwrap();
    wizard.submit(&id).await.unwrap();

    let payload = &sink.received()[0];
    let texts: Vec<&str> = payload.items.iter().map(|i| i.text.as_str()).collect();
    assert_eq!(texts, vec!["Take 1 blue pill in the morning", "Oatmeal at breakfast"]);
    assert_eq!(payload.phone, "+525512345678");
}

#[tokio::test]
async fn edit_items_round_trip_leaves_items_unchanged() {
    let extractor = Arc::new(StubExtractor::returning(morning_and_night()));
    let wizard = wizard(extractor, Arc::new(RecordingSink::default()), Language::En);

    let id = wizard.start().await.unwrap();
    wizard.extract(&id, PRESCRIPTION).await.unwrap();
    validate_all(&wizard, &id).await;
    wizard.execute(&id, Command::ProceedToPhone).await.unwrap();
    let before = wizard.load(&id).await.unwrap().intake.items;

    wizard.execute(&id, Command::ReturnToValidation).await.unwrap();
    wizard.execute(&id, Command::ProceedToPhone).await.unwrap();

    let after = wizard.load(&id).await.unwrap().intake.items;
    assert_eq!(after, before);
}

#[tokio::test]
async fn sink_failure_is_propagated_and_submission_can_be_retried() {
    let extractor = Arc::new(StubExtractor::returning(morning_and_night()));
    let sink = Arc::new(RecordingSink { fail: true, ..Default::default() });
    let wizard = wizard(extractor, sink.clone(), Language::En);

    let id = wizard.start().await.unwrap();
    wizard.extract(&id, PRESCRIPTION).await.unwrap();
    validate_all(&wizard, &id).await;
    wizard.execute(&id, Command::ProceedToPhone).await.unwrap();
    wizard
        .execute(
            &id,
            Command::EnterPhone { dial_code: "+1".to_string(), local_number: "5551234567".to_string() },
        )
        .await
        .unwrap();

    let err = wizard.submit(&id).await.unwrap_err();
    assert!(matches!(err, Error::Submission { .. }));

    let view = wizard.load(&id).await.unwrap();
    assert!(!view.intake.submission_in_flight);
    assert_eq!(view.intake.submissions, 0);
    assert_eq!(
        view.intake.submission_error.as_deref(),
        Some(Messages::new(Language::En).text(MessageKey::SubmissionFailed))
    );

    assert!(wizard.submit(&id).await.is_err());
    assert_eq!(sink.received().len(), 2);
}

#[tokio::test]
async fn reset_after_submission_starts_a_fresh_cycle() {
    let extractor = Arc::new(StubExtractor::returning(morning_and_night()));
    let wizard = wizard(extractor, Arc::new(RecordingSink::default()), Language::En);

    let id = wizard.start().await.unwrap();
    wizard.extract(&id, PRESCRIPTION).await.unwrap();
    validate_all(&wizard, &id).await;
    wizard.execute(&id, Command::ProceedToPhone).await.unwrap();
    wizard
        .execute(
            &id,
            Command::EnterPhone { dial_code: "+1".to_string(), local_number: "5551234567".to_string() },
        )
        .await
        .unwrap();
    wizard.submit(&id).await.unwrap();
    wizard.execute(&id, Command::ResetIntake).await.unwrap();

    let view = wizard.load(&id).await.unwrap();
    assert_eq!(view.intake.step, WizardStep::Prescription);
    assert!(view.intake.items.is_empty());
    assert!(view.intake.prescription_text.is_empty());

    let view = wizard.extract(&id, PRESCRIPTION).await.unwrap();
    let ids: Vec<ItemId> = view.intake.items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![ItemId(2), ItemId(3)]);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let extractor = Arc::new(StubExtractor::returning(Vec::new()));
    let wizard = wizard(extractor, Arc::new(RecordingSink::default()), Language::En);

    let err = wizard.load("missing").await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));

    let err = wizard.execute("missing", Command::ProceedToPhone).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}
