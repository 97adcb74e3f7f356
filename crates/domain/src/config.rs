use std::{env, time::Duration};

use crate::{errors::Error, i18n::Language, intake::phone::DEFAULT_DIAL_CODE};

/// Runtime settings, read from the environment (`.env` is loaded by the binaries).
#[derive(Clone, Debug)]
pub struct Settings {
    pub extractor_url: String,
    pub extractor_timeout: Duration,
    pub submission_url: String,
    pub default_dial_code: String,
    pub language: Language,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            extractor_url: "http://localhost:8001".to_string(),
            extractor_timeout: Duration::from_secs(30),
            submission_url: "http://localhost:8000/api/v1".to_string(),
            default_dial_code: DEFAULT_DIAL_CODE.to_string(),
            language: Language::En,
        }
    }
}

impl Settings {
    /// Unset variables fall back to defaults; set-but-invalid ones are errors.
    pub fn from_env() -> Result<Self, Error> {
        let defaults = Self::default();

        let extractor_timeout = match env::var("EXTRACTOR_TIMEOUT_SECS") {
            Ok(v) => v
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| Error::validation(format!("EXTRACTOR_TIMEOUT_SECS '{v}' is not a number")))?,
            Err(_) => defaults.extractor_timeout,
        };

        let language = match env::var("WIZARD_LANGUAGE") {
            Ok(v) => v.parse::<Language>()?,
            Err(_) => defaults.language,
        };

        Ok(Self {
            extractor_url: env::var("EXTRACTOR_SERVICE_URL").unwrap_or(defaults.extractor_url),
            extractor_timeout,
            submission_url: env::var("SUBMISSION_API_URL").unwrap_or(defaults.submission_url),
            default_dial_code: env::var("DEFAULT_DIAL_CODE").unwrap_or(defaults.default_dial_code),
            language,
        })
    }
}
