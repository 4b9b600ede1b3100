//! Intent types produced by the interpreter

use serde::Serialize;

use crate::host::SectionId;

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "intent", content = "target", rename_all = "snake_case")]
pub enum Intent {
    /// Scroll the page to a section
    Navigate(SectionId),
    /// Change the color scheme
    ToggleTheme(ThemeTarget),
    /// End the conversation
    Deactivate(DeactivateScope),
    /// Answer a question about the site owner
    Inform(Topic),
    /// Nothing matched; answer with guidance
    Unknown,
}

/// Requested theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeTarget {
    Dark,
    Light,
    /// Whatever the current theme is not
    Toggle,
}

/// How far to power down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeactivateScope {
    /// Back to standby, still listening for the wake word
    Standby,
    /// Fully off until the button is pressed again
    Shutdown,
}

/// Informational topics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Which sections can be navigated to
    Sections,
    /// A single project looked up by name
    Project { query: String },
    Identity,
    Background,
    Skills,
    Profession,
    ProjectList,
    ContactInfo,
    Availability,
    Services,
    ExperienceYears,
    Location,
    Pricing,
    Testimonials,
    Help,
    Greeting,
    Thanks,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::Navigate(section) => write!(f, "navigate({})", section),
            Intent::ToggleTheme(target) => write!(f, "toggle_theme({:?})", target),
            Intent::Deactivate(scope) => write!(f, "deactivate({:?})", scope),
            Intent::Inform(topic) => write!(f, "inform({:?})", topic),
            Intent::Unknown => write!(f, "unknown"),
        }
    }
}
