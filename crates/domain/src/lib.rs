//! Prescription intake domain: the caregiver wizard that turns free-text
//! prescriptions into validated reminder submissions.

/// Intake wizard aggregate
pub mod intake;

/// Domain errors
pub mod errors;

/// Environment-driven settings
pub mod config;

/// Localized user-facing messages
pub mod i18n;

pub use config::Settings;
pub use errors::Error;
pub use i18n::{Language, MessageKey, Messages};
