//! Dictating contact form fields by voice

use super::recognizer::CommandCenter;
use crate::error::Result;
use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Device arbiter label for dictation
pub const OWNER: &str = "dictation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactField {
    Name,
    Email,
    Message,
}

impl FromStr for ContactField {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "name" => Ok(ContactField::Name),
            "email" => Ok(ContactField::Email),
            "message" => Ok(ContactField::Message),
            _ => Err(ValidationError::InvalidFormat(format!(
                "Unknown contact field '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDraft {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactDraft {
    /// Write a transcript into a field
    ///
    /// Name is replaced, email loses all whitespace and is lower-cased,
    /// message grows by one space-separated sentence.
    pub fn apply(&mut self, field: ContactField, transcript: &str) {
        match field {
            ContactField::Name => self.name = transcript.to_string(),
            ContactField::Email => {
                self.email = transcript
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_lowercase()
            }
            ContactField::Message => {
                if !self.message.is_empty() {
                    self.message.push(' ');
                }
                self.message.push_str(transcript);
            }
        }
    }
}

/// Single-shot dictation sharing the command center's listening slot
pub struct Dictation {
    center: Arc<CommandCenter>,
}

impl Dictation {
    pub fn new(center: Arc<CommandCenter>) -> Self {
        Self { center }
    }

    /// Listen once and write the transcript into `field`
    pub async fn dictate(&self, draft: &mut ContactDraft, field: ContactField) -> Result<String> {
        let transcript = self.center.transcribe(OWNER).await?;
        log::debug!("Dictated {:?}: {} chars", field, transcript.len());
        draft.apply(field, &transcript);
        Ok(transcript)
    }
}
