use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::{errors::Error, i18n::Language};

use super::{
    items::{ItemType, WizardItem},
    Intake,
};

/// One reminder entry, flattened from a reviewed item
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, new)]
pub struct SubmissionItem {
    pub text: String,
    pub item_type: ItemType,
    pub name: String,
    pub pills_per_dose: Option<f64>,
    pub doses_per_day: Option<f64>,
    pub duration_days: Option<f64>,
    pub total_pills_required: Option<f64>,
}

impl From<&WizardItem> for SubmissionItem {
    fn from(item: &WizardItem) -> Self {
        let d = &item.details;
        SubmissionItem::new(
            d.display_text().to_string(),
            d.item_type,
            d.name.clone(),
            d.pills_per_dose,
            d.doses_per_day,
            d.duration_days,
            d.total_pills_required,
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SubmissionPayload {
    pub items: Vec<SubmissionItem>,
    pub phone: String,
    pub language: Language,
}

impl SubmissionPayload {
    /// Build the payload from the current session state. Carries whatever the
    /// caregiver last edited, not the original extraction.
    pub fn from_intake(intake: &Intake, language: Language) -> Result<Self, Error> {
        let phone = intake
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::gate("phone number is required"))?;

        let items: Vec<SubmissionItem> = intake
            .items
            .iter()
            .filter(|i| i.validated)
            .map(SubmissionItem::from)
            .collect();

        if items.is_empty() {
            return Err(Error::gate("nothing to submit"));
        }
        if items.iter().any(|i| i.text.is_empty()) {
            return Err(Error::gate("every item needs a description"));
        }

        Ok(Self {
            items,
            phone: phone.to_string(),
            language,
        })
    }
}
