use serde::{Deserialize, Serialize};

use super::items::{CandidateItem, ItemChange, ItemId, ItemType};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Command {
    /// Open a new intake session
    StartIntake {
        id: String,
    },

    /// Keep the typed prescription text while still on the first step
    UpdatePrescriptionText {
        text: String,
    },

    /// Send the text off for extraction
    RequestExtraction {
        prescription_text: String,
    },

    /// Extraction returned candidates (issued by the wizard driver)
    CompleteExtraction {
        items: Vec<CandidateItem>,
    },

    /// Extraction errored (issued by the wizard driver)
    FailExtraction {
        message: String,
    },

    ToggleItemValidation {
        item_id: ItemId,
    },

    EditItem {
        item_id: ItemId,
        change: ItemChange,
    },

    AddManualItem {
        item_type: ItemType,
        description: String,
    },

    DeleteItem {
        item_id: ItemId,
    },

    /// Move from review to the phone step
    ProceedToPhone,

    /// Back from review to the prescription text
    ReturnToPrescription,

    /// Back from the phone step to review ("edit items")
    ReturnToValidation,

    EnterPhone {
        dial_code: String,
        local_number: String,
    },

    /// Mark a submission as in flight
    BeginSubmission,

    CompleteSubmission,

    FailSubmission {
        message: String,
    },

    /// Start over for another prescription
    ResetIntake,
}
