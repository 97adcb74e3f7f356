use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};

use crate::errors::Error;

use super::{
    items::{CandidateItem, ItemId, WizardItem},
    phone::compose_phone,
    Command, Event,
};

/// Wizard step
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    /// Initial state - caregiver types the prescription
    #[default]
    Prescription,
    /// Waiting on the extraction service
    Extracting,
    /// Caregiver reviews, edits and confirms items
    Validate,
    /// Destination phone number capture and submission
    Phone,
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WizardStep::Prescription => "prescription",
            WizardStep::Extracting => "extracting",
            WizardStep::Validate => "validate",
            WizardStep::Phone => "phone",
        };
        f.write_str(name)
    }
}

/// Intake aggregate
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Intake {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub step: WizardStep,

    // Prescription step
    pub prescription_text: String,
    pub extraction_error: Option<String>,

    // Review step, in display order
    pub items: Vec<WizardItem>,
    pub next_item_id: u64,

    // Phone step
    pub phone: Option<String>,
    pub submission_in_flight: bool,
    pub submission_error: Option<String>,
    pub submissions: u32,

    // Start of the running extraction or submission
    #[serde(default)]
    pub pending_since: Option<DateTime<Utc>>,
}

pub const AGGREGATE_TYPE: &str = "Intake";

/// An extraction or submission with no outcome after this long is treated as
/// abandoned and no longer blocks the session. Longer than the extractor timeout.
pub const PENDING_STALE_AFTER_SECS: i64 = 120;

#[derive(Clone, Default)]
pub struct Services {}

#[async_trait]
impl Aggregate for Intake {
    type Command = Command;
    type Event = Event;
    type Error = Error;
    type Services = Services;

    fn aggregate_type() -> String {
        AGGREGATE_TYPE.to_string()
    }

    async fn handle(
        &self,
        command: Self::Command,
        _services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        if !matches!(command, Command::StartIntake { .. }) {
            self.validate_existing()?;
        }
        let id = self.id.clone();
        let updated_at = Utc::now();

        let event = match command {
            Command::StartIntake { id } => {
                self.validate_new()?;
                Event::IntakeStarted { id, created_at: updated_at }
            }

            Command::UpdatePrescriptionText { text } => {
                self.require_step(WizardStep::Prescription, "edit the prescription")?;
                Event::PrescriptionTextUpdated { id, text, updated_at }
            }

            Command::RequestExtraction { prescription_text } => {
                if self.step == WizardStep::Extracting {
                    self.require_abandoned(updated_at, "an extraction is already running")?;
                } else {
                    self.require_transition(WizardStep::Prescription, WizardStep::Extracting)?;
                }
                if prescription_text.trim().is_empty() {
                    return Err(Error::gate("prescription text is empty"));
                }
                Event::ExtractionRequested { id, prescription_text, updated_at }
            }

            Command::CompleteExtraction { items } => {
                self.require_transition(WizardStep::Extracting, WizardStep::Validate)?;
                Event::ItemsExtracted {
                    id,
                    items: self.seed_items(items),
                    updated_at,
                }
            }

            Command::FailExtraction { message } => {
                self.require_transition(WizardStep::Extracting, WizardStep::Prescription)?;
                Event::ExtractionFailed { id, message, updated_at }
            }

            Command::ToggleItemValidation { item_id } => {
                self.require_step(WizardStep::Validate, "validate items")?;
                let item = self.item(item_id)?;
                Event::ItemValidationToggled {
                    id,
                    item_id,
                    validated: !item.validated,
                    updated_at,
                }
            }

            Command::EditItem { item_id, change } => {
                self.require_step(WizardStep::Validate, "edit items")?;
                let item = self.item(item_id)?;
                let mut edited = item.details.clone();
                edited.apply_change(change.clone());
                if edited.display_text().is_empty() && !item.details.display_text().is_empty() {
                    return Err(Error::validation(
                        "an item needs a description, raw text or name",
                    ));
                }
                Event::ItemEdited { id, item_id, change, updated_at }
            }

            Command::AddManualItem { item_type, description } => {
                self.require_step(WizardStep::Validate, "add items")?;
                if description.trim().is_empty() {
                    return Err(Error::validation("item description is empty"));
                }
                Event::ManualItemAdded {
                    id,
                    item: WizardItem {
                        id: ItemId(self.next_item_id),
                        validated: true,
                        details: CandidateItem::manual(item_type, &description),
                    },
                    updated_at,
                }
            }

            Command::DeleteItem { item_id } => {
                self.require_step(WizardStep::Validate, "delete items")?;
                self.item(item_id)?;
                Event::ItemDeleted { id, item_id, updated_at }
            }

            Command::ProceedToPhone => {
                self.require_transition(WizardStep::Validate, WizardStep::Phone)?;
                self.require_items_ready()?;
                Event::PhoneStepEntered { id, updated_at }
            }

            Command::ReturnToPrescription => {
                self.require_transition(WizardStep::Validate, WizardStep::Prescription)?;
                Event::ReturnedToPrescription { id, updated_at }
            }

            Command::ReturnToValidation => {
                self.require_transition(WizardStep::Phone, WizardStep::Validate)?;
                self.require_idle(updated_at)?;
                Event::ReturnedToValidation { id, updated_at }
            }

            Command::EnterPhone { dial_code, local_number } => {
                self.require_step(WizardStep::Phone, "enter a phone number")?;
                self.require_idle(updated_at)?;
                let phone = compose_phone(&dial_code, &local_number)
                    .ok_or_else(|| Error::validation("phone number is empty"))?;
                Event::PhoneEntered { id, phone, updated_at }
            }

            Command::BeginSubmission => {
                self.require_step(WizardStep::Phone, "submit")?;
                self.require_idle(updated_at)?;
                if self.phone.as_deref().map_or(true, |p| p.trim().is_empty()) {
                    return Err(Error::gate("phone number is required"));
                }
                self.require_items_ready()?;
                Event::SubmissionStarted { id, updated_at }
            }

            Command::CompleteSubmission => {
                self.require_in_flight()?;
                Event::SubmissionSucceeded { id, updated_at }
            }

            Command::FailSubmission { message } => {
                self.require_in_flight()?;
                Event::SubmissionFailed { id, message, updated_at }
            }

            Command::ResetIntake => {
                if self.step == WizardStep::Extracting {
                    self.require_abandoned(updated_at, "an extraction is still running")?;
                }
                self.require_idle(updated_at)?;
                Event::IntakeReset { id, updated_at }
            }
        };

        Ok(vec![event])
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            Event::IntakeStarted { id, created_at } => {
                self.id = id;
                self.created_at = created_at;
                self.updated_at = created_at;
                self.step = WizardStep::Prescription;
            }

            Event::PrescriptionTextUpdated { text, updated_at, .. } => {
                self.prescription_text = text;
                self.updated_at = updated_at;
            }

            Event::ExtractionRequested { prescription_text, updated_at, .. } => {
                self.prescription_text = prescription_text;
                self.extraction_error = None;
                self.step = WizardStep::Extracting;
                self.pending_since = Some(updated_at);
                self.updated_at = updated_at;
            }

            Event::ItemsExtracted { items, updated_at, .. } => {
                self.advance_item_ids(&items);
                self.items = items;
                self.step = WizardStep::Validate;
                self.pending_since = None;
                self.updated_at = updated_at;
            }

            Event::ExtractionFailed { message, updated_at, .. } => {
                self.extraction_error = Some(message);
                self.step = WizardStep::Prescription;
                self.pending_since = None;
                self.updated_at = updated_at;
            }

            Event::ItemValidationToggled { item_id, validated, updated_at, .. } => {
                if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
                    item.validated = validated;
                }
                self.updated_at = updated_at;
            }

            Event::ItemEdited { item_id, change, updated_at, .. } => {
                if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
                    item.details.apply_change(change);
                }
                self.updated_at = updated_at;
            }

            Event::ManualItemAdded { item, updated_at, .. } => {
                self.advance_item_ids(std::slice::from_ref(&item));
                self.items.push(item);
                self.updated_at = updated_at;
            }

            Event::ItemDeleted { item_id, updated_at, .. } => {
                self.items.retain(|i| i.id != item_id);
                self.updated_at = updated_at;
            }

            Event::PhoneStepEntered { updated_at, .. } => {
                self.step = WizardStep::Phone;
                self.updated_at = updated_at;
            }

            Event::ReturnedToPrescription { updated_at, .. } => {
                self.step = WizardStep::Prescription;
                self.updated_at = updated_at;
            }

            Event::ReturnedToValidation { updated_at, .. } => {
                self.step = WizardStep::Validate;
                self.submission_in_flight = false;
                self.pending_since = None;
                self.updated_at = updated_at;
            }

            Event::PhoneEntered { phone, updated_at, .. } => {
                self.phone = Some(phone);
                self.updated_at = updated_at;
            }

            Event::SubmissionStarted { updated_at, .. } => {
                self.submission_in_flight = true;
                self.submission_error = None;
                self.pending_since = Some(updated_at);
                self.updated_at = updated_at;
            }

            Event::SubmissionSucceeded { updated_at, .. } => {
                self.submission_in_flight = false;
                self.submissions += 1;
                self.pending_since = None;
                self.updated_at = updated_at;
            }

            Event::SubmissionFailed { message, updated_at, .. } => {
                self.submission_in_flight = false;
                self.submission_error = Some(message);
                self.pending_since = None;
                self.updated_at = updated_at;
            }

            Event::IntakeReset { updated_at, .. } => {
                self.step = WizardStep::Prescription;
                self.prescription_text.clear();
                self.extraction_error = None;
                self.items.clear();
                self.phone = None;
                self.submission_in_flight = false;
                self.submission_error = None;
                self.pending_since = None;
                self.updated_at = updated_at;
            }
        }
    }
}

impl Intake {
    /// True when there is something to submit and all of it is confirmed.
    pub fn all_items_validated(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|i| i.validated)
    }

    /// Items with nothing to show as their reminder text.
    pub fn unlabeled_items(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|i| i.details.display_text().is_empty())
            .map(|i| i.id)
            .collect()
    }

    pub fn can_proceed_to_phone(&self) -> bool {
        self.step == WizardStep::Validate && self.require_items_ready().is_ok()
    }

    pub fn can_submit(&self) -> bool {
        self.step == WizardStep::Phone
            && self.require_idle(Utc::now()).is_ok()
            && self.phone.as_deref().is_some_and(|p| !p.trim().is_empty())
            && self.require_items_ready().is_ok()
    }

    /// True while an extraction or submission started recently enough that
    /// its outcome may still arrive.
    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        self.pending_since
            .is_some_and(|since| now - since < Duration::seconds(PENDING_STALE_AFTER_SECS))
    }

    fn seed_items(&self, candidates: Vec<CandidateItem>) -> Vec<WizardItem> {
        candidates
            .into_iter()
            .zip(self.next_item_id..)
            .map(|(details, n)| WizardItem {
                id: ItemId(n),
                validated: false,
                details,
            })
            .collect()
    }

    fn advance_item_ids(&mut self, items: &[WizardItem]) {
        if let Some(max) = items.iter().map(|i| i.id.0).max() {
            self.next_item_id = self.next_item_id.max(max + 1);
        }
    }

    fn item(&self, item_id: ItemId) -> Result<&WizardItem, Error> {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or(Error::ItemNotFound { item_id: item_id.0 })
    }

    fn validate_new(&self) -> Result<(), Error> {
        if !self.id.is_empty() {
            return Err(Error::Uniqueness { field: "id".to_string() });
        }
        Ok(())
    }

    fn validate_existing(&self) -> Result<(), Error> {
        if self.id.is_empty() {
            return Err(Error::NotFound { entity: AGGREGATE_TYPE.to_string() });
        }
        Ok(())
    }

    fn require_step(&self, step: WizardStep, action: &str) -> Result<(), Error> {
        if self.step != step {
            return Err(Error::WrongStep {
                action: action.to_string(),
                step: self.step.to_string(),
            });
        }
        Ok(())
    }

    fn require_transition(&self, from: WizardStep, to: WizardStep) -> Result<(), Error> {
        if self.step != from {
            return Err(Error::InvalidStateTransition {
                from: self.step.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    fn require_idle(&self, now: DateTime<Utc>) -> Result<(), Error> {
        if self.submission_in_flight && self.is_pending(now) {
            return Err(Error::gate("a submission is already in flight"));
        }
        Ok(())
    }

    fn require_abandoned(&self, now: DateTime<Utc>, message: &str) -> Result<(), Error> {
        if self.is_pending(now) {
            return Err(Error::gate(message));
        }
        Ok(())
    }

    fn require_items_ready(&self) -> Result<(), Error> {
        if !self.all_items_validated() {
            return Err(Error::gate("every item must be validated first"));
        }
        if let Some(item_id) = self.unlabeled_items().first() {
            return Err(Error::gate(format!("item {item_id} has no description")));
        }
        Ok(())
    }

    fn require_in_flight(&self) -> Result<(), Error> {
        if !self.submission_in_flight {
            return Err(Error::gate("no submission is in flight"));
        }
        Ok(())
    }
}
