//! In-process host used by the daemon binary

use std::collections::HashSet;

use tracing::{info, warn};

use super::{HostBindings, HostError, SectionId, Theme};

/// Host that records navigation and keeps the theme in memory
#[derive(Debug, Clone)]
pub struct ConsoleHost {
    sections: HashSet<SectionId>,
    theme: Theme,
    visited: Vec<SectionId>,
}

impl ConsoleHost {
    /// Host exposing every section
    pub fn new(theme: Theme) -> Self {
        Self::with_sections(theme, SectionId::ALL)
    }

    /// Host exposing only the given sections
    pub fn with_sections(theme: Theme, sections: impl IntoIterator<Item = SectionId>) -> Self {
        Self {
            sections: sections.into_iter().collect(),
            theme,
            visited: Vec::new(),
        }
    }

    /// Sections navigated to, oldest first
    pub fn visited(&self) -> &[SectionId] {
        &self.visited
    }
}

impl HostBindings for ConsoleHost {
    fn navigate_to_section(&mut self, section: SectionId) -> Result<(), HostError> {
        if !self.sections.contains(&section) {
            warn!(%section, "section not found on page");
            return Err(HostError::SectionNotFound(section));
        }
        info!(%section, "navigating to #{}", section);
        self.visited.push(section);
        Ok(())
    }

    fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        info!(theme = %self.theme, "theme toggled");
        self.theme
    }

    fn current_theme(&self) -> Theme {
        self.theme
    }
}
