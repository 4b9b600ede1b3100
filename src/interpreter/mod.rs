//! Command interpreter
//!
//! Pure mapping from recognized text to intents, plus the canned replies and
//! static data the answers are built from.

mod catalog;
mod intent;
pub mod replies;
mod rules;
mod wake;

pub use catalog::{Project, ProjectCatalog, DEFAULT_PROJECT_DESCRIPTION};
pub use intent::{DeactivateScope, Intent, ThemeTarget, Topic};
pub use wake::{WakeWords, DEFAULT_WAKE_WORDS};

/// Interprets final utterances against the project catalog
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    catalog: ProjectCatalog,
}

impl Interpreter {
    /// Resolve an utterance; normalization is applied here so callers may
    /// pass raw recognizer text
    pub fn interpret(&self, utterance: &str) -> Intent {
        let normalized = utterance.trim().to_lowercase();
        rules::interpret(&normalized, &self.catalog)
    }

    /// Spoken answer for an informational topic
    pub fn answer(&self, topic: &Topic) -> String {
        replies::topic_reply(topic, &self.catalog)
    }
}
