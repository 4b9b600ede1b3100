//! Host bindings
//!
//! The page-side collaborators the controller drives: section navigation and
//! the theme context. Scrolling, focus, and styling stay on the host side.

mod console;

use serde::{Deserialize, Serialize};

pub use console::ConsoleHost;

/// The six navigable sections of the portfolio page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
    Home,
    Work,
    Experience,
    Services,
    Testimonial,
    Contact,
}

impl SectionId {
    pub const ALL: [SectionId; 6] = [
        SectionId::Home,
        SectionId::Work,
        SectionId::Experience,
        SectionId::Services,
        SectionId::Testimonial,
        SectionId::Contact,
    ];

    /// Element id of the section on the page
    pub fn as_str(self) -> &'static str {
        match self {
            SectionId::Home => "home",
            SectionId::Work => "work",
            SectionId::Experience => "experience",
            SectionId::Services => "services",
            SectionId::Testimonial => "testimonial",
            SectionId::Contact => "contact",
        }
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page color scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::Dark
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

/// Errors reported by the host
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("section not found: {0}")]
    SectionNotFound(SectionId),
}

/// Page operations invoked by the controller
pub trait HostBindings: Send {
    /// Scroll to a section; fails when the page has no such element
    fn navigate_to_section(&mut self, section: SectionId) -> Result<(), HostError>;

    /// Flip the theme and return the new value
    fn toggle_theme(&mut self) -> Theme;

    fn current_theme(&self) -> Theme;
}
