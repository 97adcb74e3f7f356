use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::Error;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "es" => Ok(Language::Es),
            other => Err(Error::validation(format!("unsupported language '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageKey {
    ExtractionFailed,
    SubmissionFailed,
}

/// Lookup signature for user-facing text. Swap it out to plug in another catalog.
pub type Translate = fn(Language, MessageKey) -> &'static str;

pub fn builtin(language: Language, key: MessageKey) -> &'static str {
    match (language, key) {
        (Language::En, MessageKey::ExtractionFailed) => {
            "We couldn't read that prescription. Please check the text and try again."
        }
        (Language::Es, MessageKey::ExtractionFailed) => {
            "No pudimos leer la receta. Revisa el texto e inténtalo de nuevo."
        }
        (Language::En, MessageKey::SubmissionFailed) => {
            "We couldn't save the reminders. Please try again."
        }
        (Language::Es, MessageKey::SubmissionFailed) => {
            "No pudimos guardar los recordatorios. Inténtalo de nuevo."
        }
    }
}

/// Language-bound message lookup handed to the wizard at construction.
#[derive(Clone, Copy)]
pub struct Messages {
    language: Language,
    translate: Translate,
}

impl Messages {
    pub fn new(language: Language) -> Self {
        Self::with_catalog(language, builtin)
    }

    pub fn with_catalog(language: Language, translate: Translate) -> Self {
        Self { language, translate }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn text(&self, key: MessageKey) -> &'static str {
        (self.translate)(self.language, key)
    }
}

impl fmt::Debug for Messages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Messages").field("language", &self.language).finish()
    }
}
