use chrono::{DateTime, Utc};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

use super::items::{ItemChange, ItemId, WizardItem};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Event {
    IntakeStarted {
        id: String,
        created_at: DateTime<Utc>,
    },

    PrescriptionTextUpdated {
        id: String,
        text: String,
        updated_at: DateTime<Utc>,
    },

    ExtractionRequested {
        id: String,
        prescription_text: String,
        updated_at: DateTime<Utc>,
    },

    ItemsExtracted {
        id: String,
        items: Vec<WizardItem>,
        updated_at: DateTime<Utc>,
    },

    ExtractionFailed {
        id: String,
        message: String,
        updated_at: DateTime<Utc>,
    },

    ItemValidationToggled {
        id: String,
        item_id: ItemId,
        validated: bool,
        updated_at: DateTime<Utc>,
    },

    ItemEdited {
        id: String,
        item_id: ItemId,
        change: ItemChange,
        updated_at: DateTime<Utc>,
    },

    ManualItemAdded {
        id: String,
        item: WizardItem,
        updated_at: DateTime<Utc>,
    },

    ItemDeleted {
        id: String,
        item_id: ItemId,
        updated_at: DateTime<Utc>,
    },

    PhoneStepEntered {
        id: String,
        updated_at: DateTime<Utc>,
    },

    ReturnedToPrescription {
        id: String,
        updated_at: DateTime<Utc>,
    },

    ReturnedToValidation {
        id: String,
        updated_at: DateTime<Utc>,
    },

    PhoneEntered {
        id: String,
        phone: String,
        updated_at: DateTime<Utc>,
    },

    SubmissionStarted {
        id: String,
        updated_at: DateTime<Utc>,
    },

    SubmissionSucceeded {
        id: String,
        updated_at: DateTime<Utc>,
    },

    SubmissionFailed {
        id: String,
        message: String,
        updated_at: DateTime<Utc>,
    },

    IntakeReset {
        id: String,
        updated_at: DateTime<Utc>,
    },
}

impl DomainEvent for Event {
    fn event_type(&self) -> String {
        let name = match self {
            Event::IntakeStarted { .. } => "Started",
            Event::PrescriptionTextUpdated { .. } => "PrescriptionTextUpdated",
            Event::ExtractionRequested { .. } => "ExtractionRequested",
            Event::ItemsExtracted { .. } => "ItemsExtracted",
            Event::ExtractionFailed { .. } => "ExtractionFailed",
            Event::ItemValidationToggled { .. } => "ItemValidationToggled",
            Event::ItemEdited { .. } => "ItemEdited",
            Event::ManualItemAdded { .. } => "ManualItemAdded",
            Event::ItemDeleted { .. } => "ItemDeleted",
            Event::PhoneStepEntered { .. } => "PhoneStepEntered",
            Event::ReturnedToPrescription { .. } => "ReturnedToPrescription",
            Event::ReturnedToValidation { .. } => "ReturnedToValidation",
            Event::PhoneEntered { .. } => "PhoneEntered",
            Event::SubmissionStarted { .. } => "SubmissionStarted",
            Event::SubmissionSucceeded { .. } => "SubmissionSucceeded",
            Event::SubmissionFailed { .. } => "SubmissionFailed",
            Event::IntakeReset { .. } => "Reset",
        };
        format!("Intake:{name}")
    }

    fn event_version(&self) -> String {
        "1.0".to_string()
    }
}
