//! Supported languages and target-language selection
//!
//! A sentence is written in one of the supported languages and translated
//! into the remaining two.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language a sentence can be written in or translated into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Pl,
    En,
    De,
}

impl Language {
    /// All supported languages in canonical order
    pub const ALL: [Language; 3] = [Language::Pl, Language::En, Language::De];

    /// Two-letter code stored in the database
    pub fn code(self) -> &'static str {
        match self {
            Language::Pl => "pl",
            Language::En => "en",
            Language::De => "de",
        }
    }

    /// BCP-47 tag used by speech providers
    pub fn bcp47(self) -> &'static str {
        match self {
            Language::Pl => "pl-PL",
            Language::En => "en-US",
            Language::De => "de-DE",
        }
    }

    /// Parse a language code, ignoring surrounding whitespace and case
    pub fn parse(code: &str) -> Result<Self> {
        match code.trim().to_lowercase().as_str() {
            "pl" => Ok(Language::Pl),
            "en" => Ok(Language::En),
            "de" => Ok(Language::De),
            other => Err(Error::InvalidInput(format!(
                "Unsupported language: '{}' (allowed: pl, en, de)",
                other
            ))),
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

    fn from_str(s: &str) -> Result<Self> {
        Language::parse(s)
    }
}

/// The two languages a sentence in `source` is translated into
///
/// Order follows [`Language::ALL`] with the source removed.
pub fn target_languages(source: Language) -> (Language, Language) {
    match source {
        Language::Pl => (Language::En, Language::De),
        Language::En => (Language::Pl, Language::De),
        Language::De => (Language::Pl, Language::En),
    }
}

/// Reject a selection where source and targets are not pairwise distinct
pub fn validate_language_selection(
    source: Language,
    target_one: Language,
    target_two: Language,
) -> Result<()> {
    if source == target_one || source == target_two || target_one == target_two {
        return Err(Error::InvalidInput(
            "Source and target languages must all be different".to_string(),
        ));
    }
    Ok(())
}
