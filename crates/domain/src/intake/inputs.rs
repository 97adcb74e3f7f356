use serde::{Deserialize, Serialize};

use crate::errors::Error;

use super::{
    items::{parse_quantity, ItemChange, ItemType},
    phone::dial_code_for,
    Command,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrescriptionTextInput {
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddManualItemInput {
    #[serde(default)]
    pub item_type: ItemType,
    pub description: String,
}

impl From<AddManualItemInput> for Command {
    fn from(input: AddManualItemInput) -> Self {
        Command::AddManualItem {
            item_type: input.item_type,
            description: input.description,
        }
    }
}

/// Editable item fields as named by the review form
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ItemField {
    ItemType,
    Name,
    FullDescription,
    RawText,
    PillsPerDose,
    DosesPerDay,
    DurationDays,
    TotalPillsRequired,
}

/// A form field edit, value as typed. Quantity fields take "" for unset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EditItemInput {
    pub field: ItemField,
    pub value: String,
}

impl TryFrom<EditItemInput> for ItemChange {
    type Error = Error;

    fn try_from(input: EditItemInput) -> Result<Self, Self::Error> {
        let EditItemInput { field, value } = input;
        let change = match field {
            ItemField::ItemType => {
                let item_type = serde_json::from_value(serde_json::Value::String(value.clone()))
                    .map_err(|_| Error::Validation {
                        message: format!("unknown item type '{value}'"),
                    })?;
                ItemChange::ItemType(item_type)
            }
            ItemField::Name => ItemChange::Name(value),
            ItemField::FullDescription => ItemChange::FullDescription(value),
            ItemField::RawText => ItemChange::RawText(value),
            ItemField::PillsPerDose => ItemChange::PillsPerDose(parse_quantity(&value)?),
            ItemField::DosesPerDay => ItemChange::DosesPerDay(parse_quantity(&value)?),
            ItemField::DurationDays => ItemChange::DurationDays(parse_quantity(&value)?),
            ItemField::TotalPillsRequired => {
                ItemChange::TotalPillsRequired(parse_quantity(&value)?)
            }
        };
        Ok(change)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnterPhoneInput {
    #[serde(default)]
    pub dial_code: Option<String>,
    /// ISO country code, used when no dial code is given
    #[serde(default)]
    pub country: Option<String>,
    pub local_number: String,
}

impl EnterPhoneInput {
    /// Explicit dial code, else the country's, else `default_dial_code`.
    pub fn into_command(self, default_dial_code: &str) -> Command {
        let dial_code = self
            .dial_code
            .filter(|c| !c.trim().is_empty())
            .or_else(|| self.country.as_deref().and_then(dial_code_for).map(str::to_string))
            .unwrap_or_else(|| default_dial_code.to_string());

        Command::EnterPhone {
            dial_code,
            local_number: self.local_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn edit(field: ItemField, value: &str) -> Result<ItemChange, Error> {
        EditItemInput { field, value: value.to_string() }.try_into()
    }

    #[test]
    fn blank_quantity_edit_unsets_the_field() {
        assert_eq!(edit(ItemField::DosesPerDay, "").unwrap(), ItemChange::DosesPerDay(None));
    }

    #[test]
    fn quantity_edit_is_parsed() {
        assert_eq!(
            edit(ItemField::PillsPerDose, "0.5").unwrap(),
            ItemChange::PillsPerDose(Some(0.5))
        );
        assert!(edit(ItemField::DurationDays, "NaN").is_err());
    }

    #[test]
    fn item_type_edit_is_checked() {
        assert_eq!(
            edit(ItemField::ItemType, "procedure").unwrap(),
            ItemChange::ItemType(ItemType::Procedure)
        );
        assert!(edit(ItemField::ItemType, "snack").is_err());
    }

    #[test]
    fn phone_input_resolves_dial_code() {
        let input = |dial: Option<&str>, country: Option<&str>| EnterPhoneInput {
            dial_code: dial.map(str::to_string),
            country: country.map(str::to_string),
            local_number: "5551234567".to_string(),
        };
        let dial_of = |command: Command| match command {
            Command::EnterPhone { dial_code, .. } => dial_code,
            other => panic!("unexpected command {other:?}"),
        };

        assert_eq!(dial_of(input(Some("+34"), Some("MX")).into_command("+1")), "+34");
        assert_eq!(dial_of(input(None, Some("mx")).into_command("+1")), "+52");
        assert_eq!(dial_of(input(Some(" "), Some("ZZ")).into_command("+1")), "+1");
    }

    #[test]
    fn manual_item_input_defaults_to_medication() {
        let input: AddManualItemInput =
            serde_json::from_str(r#"{"description":"Vitamin D"}"#).unwrap();
        let command: Command = input.into();
        assert_eq!(
            command,
            Command::AddManualItem {
                item_type: ItemType::Medication,
                description: "Vitamin D".to_string(),
            }
        );
    }
}
