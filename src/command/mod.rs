//! Voice commands available after login
//!
//! A transcript is lower-cased and matched against an ordered route table;
//! the first route whose trigger is contained in the transcript wins.

pub mod dictation;
pub mod recognizer;
pub mod transcriber;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use dictation::{ContactDraft, ContactField, Dictation};
pub use recognizer::{CommandCenter, CommandOutcome, CommandStatus, SpeechRecognizer};
pub use transcriber::RemoteTranscriber;

pub const NOT_RECOGNIZED: &str = "Command not recognized. Try again!";
pub const IDLE_HINT: &str = "Say: 'Open my profile', 'Show products', or 'Logout'";

/// Navigation targets the presentation layer must support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Home,
    Products,
    About,
    Contact,
    Profile,
    Login,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Home => "home",
            Target::Products => "products",
            Target::About => "about",
            Target::Contact => "contact",
            Target::Profile => "profile",
            Target::Login => "login",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    OpenProfile,
    OpenProducts,
    OpenContact,
    OpenAbout,
    /// Clear the persisted identifier, then go to login
    Logout,
}

impl Action {
    pub fn target(&self) -> Target {
        match self {
            Action::OpenProfile => Target::Profile,
            Action::OpenProducts => Target::Products,
            Action::OpenContact => Target::Contact,
            Action::OpenAbout => Target::About,
            Action::Logout => Target::Login,
        }
    }

    pub fn status_message(&self) -> &'static str {
        match self {
            Action::OpenProfile => "Opening Profile...",
            Action::OpenProducts => "Opening Products...",
            Action::OpenContact => "Opening Contact Us...",
            Action::OpenAbout => "Opening About Us...",
            Action::Logout => "Logging out...",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRoute {
    pub trigger: String,
    pub action: Action,
}

impl CommandRoute {
    pub fn new(trigger: &str, action: Action) -> Self {
        Self {
            trigger: trigger.to_string(),
            action,
        }
    }
}

/// Ordered, first-hit route table
#[derive(Debug, Clone)]
pub struct CommandTable {
    routes: Vec<CommandRoute>,
}

impl CommandTable {
    /// Triggers are stored lower-cased; blank triggers are rejected
    pub fn new(routes: Vec<CommandRoute>) -> Result<Self> {
        let mut normalized = Vec::with_capacity(routes.len());
        for route in routes {
            if route.trigger.trim().is_empty() {
                return Err(Error::Config(format!(
                    "empty trigger for action {:?}",
                    route.action
                )));
            }
            normalized.push(CommandRoute {
                trigger: route.trigger.to_lowercase(),
                action: route.action,
            });
        }
        Ok(Self { routes: normalized })
    }

    pub fn routes(&self) -> &[CommandRoute] {
        &self.routes
    }

    pub fn resolve(&self, transcript: &str) -> Option<&CommandRoute> {
        let transcript = transcript.to_lowercase();
        self.routes
            .iter()
            .find(|route| transcript.contains(&route.trigger))
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self {
            routes: vec![
                CommandRoute::new("profile", Action::OpenProfile),
                CommandRoute::new("product", Action::OpenProducts),
                CommandRoute::new("contact us", Action::OpenContact),
                CommandRoute::new("about us", Action::OpenAbout),
                CommandRoute::new("logout", Action::Logout),
            ],
        }
    }
}

/// Receives the target of every matched route
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: Target);
}
