//! Static project list consulted for project questions

/// Description used when a project name is not in the catalog
pub const DEFAULT_PROJECT_DESCRIPTION: &str =
    "one of Talha's portfolio projects. You can find the full details in the work section.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub title: &'static str,
    pub description: &'static str,
    /// Extra spoken forms that identify the project
    pub aliases: &'static [&'static str],
}

impl Project {
    fn matches(&self, query: &str) -> bool {
        let title = self.title.to_lowercase();
        title == query
            || title.contains(query)
            || query.contains(&title)
            || self.aliases.iter().any(|alias| query.contains(alias))
    }
}

const PROJECTS: &[Project] = &[
    Project {
        title: "Trumemo",
        description: "a robust healthcare management system for agencies supporting individuals with developmental disabilities.",
        aliases: &["tru memo"],
    },
    Project {
        title: "Intralign",
        description: "a business development roadmap tool for strategic planning.",
        aliases: &["intra line", "intra align"],
    },
    Project {
        title: "Electra",
        description: "an AI-powered multi-agent business assistant platform.",
        aliases: &[],
    },
    Project {
        title: "Voyage Vite",
        description: "a web admin panel for property and vehicle rental operations.",
        aliases: &["voyage"],
    },
];

/// Lookup over the fixed project list
#[derive(Debug, Clone)]
pub struct ProjectCatalog {
    projects: &'static [Project],
}

impl Default for ProjectCatalog {
    fn default() -> Self {
        Self { projects: PROJECTS }
    }
}

impl ProjectCatalog {
    pub fn projects(&self) -> &[Project] {
        self.projects
    }

    /// Exact or partial, case-insensitive match on title or alias
    pub fn find(&self, query: &str) -> Option<&Project> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        self.projects.iter().find(|p| p.matches(&query))
    }

    /// Project whose title or alias occurs anywhere in `text`
    pub fn mentioned_in(&self, text: &str) -> Option<&Project> {
        let text = text.to_lowercase();
        self.projects.iter().find(|p| {
            text.contains(&p.title.to_lowercase()) || p.aliases.iter().any(|a| text.contains(a))
        })
    }

    /// Comma-separated titles for the project list reply
    pub fn titles(&self) -> String {
        self.projects
            .iter()
            .map(|p| p.title)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
