use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::Error;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    Medication,
    Food,
    Procedure,
}

/// Extraction service's self-reported certainty
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    High,
    Medium,
    Low,
}

/// Session-scoped item id. Drawn from a counter that only moves forward.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structured entry proposed by extraction, before the caregiver reviews it
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CandidateItem {
    pub item_type: ItemType,
    pub name: String,
    pub full_description: String,
    pub pills_per_dose: Option<f64>,
    pub doses_per_day: Option<f64>,
    pub duration_days: Option<f64>,
    pub total_pills_required: Option<f64>,
    pub raw_text: String,
    pub confidence: Confidence,
    pub requires_review: bool,
}

impl CandidateItem {
    /// Item typed by the caregiver rather than proposed by extraction.
    /// Manual items skip review entirely.
    pub fn manual(item_type: ItemType, description: &str) -> Self {
        let description = description.trim().to_string();
        Self {
            item_type,
            name: description.clone(),
            full_description: description.clone(),
            raw_text: description,
            confidence: Confidence::High,
            requires_review: false,
            ..Default::default()
        }
    }

    /// Label shown to the recipient: the full description, else the source
    /// fragment, else the short name.
    pub fn display_text(&self) -> &str {
        [&self.full_description, &self.raw_text, &self.name]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }

    pub fn apply_change(&mut self, change: ItemChange) {
        match change {
            ItemChange::ItemType(v) => self.item_type = v,
            ItemChange::Name(v) => self.name = v,
            ItemChange::FullDescription(v) => self.full_description = v,
            ItemChange::RawText(v) => self.raw_text = v,
            ItemChange::PillsPerDose(v) => self.pills_per_dose = v,
            ItemChange::DosesPerDay(v) => self.doses_per_day = v,
            ItemChange::DurationDays(v) => self.duration_days = v,
            ItemChange::TotalPillsRequired(v) => self.total_pills_required = v,
        }
    }
}

/// Candidate item plus the caregiver's confirmation flag
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WizardItem {
    pub id: ItemId,
    pub validated: bool,
    #[serde(flatten)]
    pub details: CandidateItem,
}

/// A single field edit made during review
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ItemChange {
    ItemType(ItemType),
    Name(String),
    FullDescription(String),
    RawText(String),
    PillsPerDose(Option<f64>),
    DosesPerDay(Option<f64>),
    DurationDays(Option<f64>),
    TotalPillsRequired(Option<f64>),
}

/// Parse a quantity typed into a form field. Blank means unset.
pub fn parse_quantity(input: &str) -> Result<Option<f64>, Error> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => Ok(Some(n)),
        _ => Err(Error::validation(format!("'{trimmed}' is not a valid quantity"))),
    }
}
