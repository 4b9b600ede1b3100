//! Precedence-ordered intent table
//!
//! Rules are evaluated top to bottom and the first one returning an intent
//! wins. Keyword sets overlap (e.g. "contact" is both a section and a
//! question), so navigation only claims such words when a navigation verb is
//! present.

use tracing::trace;

use crate::host::SectionId;

use super::catalog::ProjectCatalog;
use super::intent::{DeactivateScope, Intent, ThemeTarget, Topic};

/// Verbs that make an ambiguous section word a navigation request
const NAV_VERBS: [&str; 6] = ["go to", "show", "navigate", "open", "take me", "scroll"];

/// Phrases that are navigation requests on their own
const EXPLICIT_NAV: [&str; 6] = [
    "go to",
    "show me",
    "navigate to",
    "open",
    "take me to",
    "scroll to",
];

/// Phrases asking for details rather than a listing
const DETAIL_VERBS: [&str; 3] = ["tell me about", "what is", "describe"];

/// Words skipped before a spoken project name
const NAME_FILLER: [&str; 6] = ["the", "a", "project", "called", "named", "your"];

type Rule = fn(&Command<'_>, &ProjectCatalog) -> Option<Intent>;

const RULES: &[(&str, Rule)] = &[
    ("deactivate", deactivation),
    ("theme", theme),
    ("navigate", navigation),
    ("project", project_lookup),
    ("identity", identity),
    ("background", background),
    ("skills", skills),
    ("profession", profession),
    ("project_list", project_list),
    ("contact_info", contact_info),
    ("availability", availability),
    ("services", services),
    ("experience_years", experience_years),
    ("location", location),
    ("pricing", pricing),
    ("testimonials", testimonials),
    ("help", help),
    ("greeting", greeting),
    ("thanks", thanks),
];

/// Normalized utterance with keyword helpers
struct Command<'a> {
    text: &'a str,
}

impl<'a> Command<'a> {
    fn has(&self, keyword: &str) -> bool {
        self.text.contains(keyword)
    }

    fn any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.text.contains(k))
    }

    /// Whole-word match, for short words that occur inside others
    fn word(&self, word: &str) -> bool {
        self.text
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .any(|token| token == word)
    }
}

/// Map a lowercase, trimmed utterance to an intent
pub fn interpret(utterance: &str, catalog: &ProjectCatalog) -> Intent {
    let command = Command { text: utterance };

    for (name, rule) in RULES {
        if let Some(intent) = rule(&command, catalog) {
            trace!(rule = *name, %intent, "rule matched");
            return intent;
        }
    }

    Intent::Unknown
}

fn deactivation(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    if cmd.any(&["goodbye", "bye", "deactivate", "stop listening", "that's all", "that is all"]) {
        Some(Intent::Deactivate(DeactivateScope::Shutdown))
    } else if cmd.any(&["sleep", "standby"]) {
        Some(Intent::Deactivate(DeactivateScope::Standby))
    } else {
        None
    }
}

fn theme(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    if !cmd.any(&["theme", "mode", "dark", "light"]) {
        return None;
    }

    let target = if cmd.has("dark") {
        ThemeTarget::Dark
    } else if cmd.has("light") {
        ThemeTarget::Light
    } else if cmd.any(&["change", "switch", "toggle", "convert"]) {
        ThemeTarget::Toggle
    } else {
        return None;
    };

    Some(Intent::ToggleTheme(target))
}

fn navigation(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    let navigate = |section| Some(Intent::Navigate(section));

    if cmd.any(&["work", "project", "portfolio"])
        && (cmd.any(&NAV_VERBS) || !cmd.any(&["what", "tell", "about", "describe"]))
    {
        return navigate(SectionId::Work);
    }
    if cmd.any(&["home", "main"]) {
        return navigate(SectionId::Home);
    }
    if cmd.any(&["experience", "timeline", "history"]) {
        return navigate(SectionId::Experience);
    }
    if cmd.has("service") {
        return navigate(SectionId::Services);
    }
    if cmd.any(&["testimonial", "testimony", "review"]) {
        return navigate(SectionId::Testimonial);
    }
    if cmd.any(&["contact", "reach", "connect"]) && cmd.any(&["go to", "show", "navigate", "open"]) {
        return navigate(SectionId::Contact);
    }

    if cmd.any(&EXPLICIT_NAV) {
        let section = if cmd.has("home") {
            Some(SectionId::Home)
        } else if cmd.any(&["work", "project"]) {
            Some(SectionId::Work)
        } else if cmd.any(&["experience", "timeline"]) {
            Some(SectionId::Experience)
        } else if cmd.has("service") {
            Some(SectionId::Services)
        } else if cmd.has("testimonial") {
            Some(SectionId::Testimonial)
        } else if cmd.has("contact") {
            Some(SectionId::Contact)
        } else {
            None
        };
        return Some(match section {
            Some(section) => Intent::Navigate(section),
            None => Intent::Inform(Topic::Sections),
        });
    }

    None
}

fn project_lookup(cmd: &Command<'_>, catalog: &ProjectCatalog) -> Option<Intent> {
    if let Some(project) = catalog.mentioned_in(cmd.text) {
        return Some(Intent::Inform(Topic::Project {
            query: project.title.to_lowercase(),
        }));
    }

    if cmd.has("project") && cmd.any(&DETAIL_VERBS) {
        let query = spoken_project_name(cmd.text)?;
        return Some(Intent::Inform(Topic::Project { query }));
    }

    None
}

/// Name following "tell me about" / "what is" / "describe", minus filler words
fn spoken_project_name(text: &str) -> Option<String> {
    let rest = DETAIL_VERBS
        .iter()
        .filter_map(|verb| text.rfind(verb).map(|i| &text[i + verb.len()..]))
        .next()?;

    let mut words: Vec<&str> = rest
        .split_whitespace()
        .skip_while(|w| NAME_FILLER.contains(w))
        .collect();
    while words.last().map(|w| *w == "project").unwrap_or(false) {
        words.pop();
    }

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn identity(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    let asks = cmd.any(&[
        "who is",
        "who are you",
        "introduce",
        "tell me about",
        "what do you know about",
    ]) || (cmd.has("about") && (cmd.has("talha") || cmd.word("you") || cmd.word("him")));
    asks.then_some(Intent::Inform(Topic::Identity))
}

fn background(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    let asks = cmd.any(&["background", "education", "qualification", "degree"])
        || (cmd.has("where") && cmd.has("from"));
    asks.then_some(Intent::Inform(Topic::Background))
}

fn skills(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    cmd.any(&[
        "skill",
        "what can he",
        "expertise",
        "technolog",
        "tech stack",
        "what tools",
        "programming languages",
        "languages",
        "framework",
        "stack",
    ])
    .then_some(Intent::Inform(Topic::Skills))
}

fn profession(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    cmd.any(&[
        "what does",
        "what do you do",
        "profession",
        "occupation",
        "job",
        "career",
        "developer",
        "programmer",
        "coder",
    ])
    .then_some(Intent::Inform(Topic::Profession))
}

fn project_list(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    (cmd.any(&["project", "portfolio", "work done", "what has"]) && !cmd.any(&DETAIL_VERBS))
        .then_some(Intent::Inform(Topic::ProjectList))
}

fn contact_info(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    (cmd.any(&[
        "contact",
        "email",
        "how to reach",
        "reach out",
        "get in touch",
        "connect",
        "phone",
        "number",
        "address",
    ]) && !cmd.any(&["go to", "show", "navigate"]))
    .then_some(Intent::Inform(Topic::ContactInfo))
}

fn availability(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    let asks = cmd.any(&["available", "hire", "hiring", "freelance", "looking for", "open to"])
        || (cmd.has("need") && cmd.has("developer"))
        || (cmd.has("can you") && cmd.has("work"));
    asks.then_some(Intent::Inform(Topic::Availability))
}

fn services(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    (cmd.any(&["offer", "capabilities", "can you build"]) && !cmd.any(&["go to", "show", "navigate"]))
        .then_some(Intent::Inform(Topic::Services))
}

fn experience_years(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    cmd.any(&["how long", "years of", "how much experience", "senior", "junior"])
        .then_some(Intent::Inform(Topic::ExperienceYears))
}

fn location(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    let asks = (cmd.has("where") && cmd.any(&["live", "located", "based"]))
        || cmd.any(&["location", "country", "city"]);
    asks.then_some(Intent::Inform(Topic::Location))
}

fn pricing(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    let asks = cmd.any(&["price", "pricing", "cost", "charge", "how much", "budget"])
        || cmd.word("rate")
        || cmd.word("rates");
    asks.then_some(Intent::Inform(Topic::Pricing))
}

fn testimonials(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    let asks = cmd.any(&["feedback", "rating", "what do clients"])
        || (cmd.has("client") && cmd.has("say"));
    asks.then_some(Intent::Inform(Topic::Testimonials))
}

fn help(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    cmd.any(&[
        "help",
        "what can you do",
        "command",
        "what can i ask",
        "options",
        "what questions",
    ])
    .then_some(Intent::Inform(Topic::Help))
}

fn greeting(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    let greets = cmd.any(&["hello", "greetings", "good morning", "good afternoon", "good evening"])
        || cmd.word("hi")
        || cmd.word("hey");
    greets.then_some(Intent::Inform(Topic::Greeting))
}

fn thanks(cmd: &Command<'_>, _: &ProjectCatalog) -> Option<Intent> {
    cmd.any(&["thank", "see you", "later"])
        .then_some(Intent::Inform(Topic::Thanks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(text: &str) -> Intent {
        interpret(text, &ProjectCatalog::default())
    }

    #[test]
    fn test_theme_outranks_navigation() {
        assert_eq!(
            resolve("switch to dark mode and go to work"),
            Intent::ToggleTheme(ThemeTarget::Dark)
        );
    }

    #[test]
    fn test_deactivation_outranks_everything() {
        assert_eq!(
            resolve("goodbye"),
            Intent::Deactivate(DeactivateScope::Shutdown)
        );
        assert_eq!(
            resolve("ok bye, switch to dark mode"),
            Intent::Deactivate(DeactivateScope::Shutdown)
        );
        assert_eq!(
            resolve("go to sleep"),
            Intent::Deactivate(DeactivateScope::Standby)
        );
    }

    #[test]
    fn test_theme_targets() {
        assert_eq!(resolve("light mode please"), Intent::ToggleTheme(ThemeTarget::Light));
        assert_eq!(resolve("change the theme"), Intent::ToggleTheme(ThemeTarget::Toggle));
        // gate word without a request falls through
        assert_eq!(resolve("what mode"), Intent::Unknown);
    }

    #[test]
    fn test_navigation_sections() {
        assert_eq!(resolve("go to contact"), Intent::Navigate(SectionId::Contact));
        assert_eq!(resolve("projects"), Intent::Navigate(SectionId::Work));
        assert_eq!(resolve("take me home"), Intent::Navigate(SectionId::Home));
        assert_eq!(resolve("show the timeline"), Intent::Navigate(SectionId::Experience));
        assert_eq!(resolve("services"), Intent::Navigate(SectionId::Services));
        assert_eq!(resolve("read the reviews"), Intent::Navigate(SectionId::Testimonial));
    }

    #[test]
    fn test_navigation_verb_without_section() {
        assert_eq!(resolve("open something"), Intent::Inform(Topic::Sections));
    }

    #[test]
    fn test_contact_without_verb_is_a_question() {
        assert_eq!(
            resolve("how do i contact him"),
            Intent::Inform(Topic::ContactInfo)
        );
        assert_eq!(resolve("show contact"), Intent::Navigate(SectionId::Contact));
    }

    #[test]
    fn test_work_question_is_not_navigation() {
        assert_eq!(
            resolve("what projects has he built"),
            Intent::Inform(Topic::ProjectList)
        );
    }

    #[test]
    fn test_named_project_lookup() {
        assert_eq!(
            resolve("what is electra"),
            Intent::Inform(Topic::Project { query: "electra".into() })
        );
        assert_eq!(
            resolve("tell me about voyage"),
            Intent::Inform(Topic::Project { query: "voyage vite".into() })
        );
    }

    #[test]
    fn test_unknown_project_lookup() {
        assert_eq!(
            resolve("tell me about projectx"),
            Intent::Inform(Topic::Project { query: "projectx".into() })
        );
        assert_eq!(
            resolve("describe the project called skyline"),
            Intent::Inform(Topic::Project { query: "skyline".into() })
        );
    }

    #[test]
    fn test_informational_topics() {
        assert_eq!(resolve("who is talha"), Intent::Inform(Topic::Identity));
        assert_eq!(resolve("what is his background"), Intent::Inform(Topic::Background));
        assert_eq!(resolve("what is his tech stack"), Intent::Inform(Topic::Skills));
        assert_eq!(resolve("is he available"), Intent::Inform(Topic::Availability));
        assert_eq!(resolve("what does he do"), Intent::Inform(Topic::Profession));
        assert_eq!(resolve("how much is it"), Intent::Inform(Topic::Pricing));
        assert_eq!(resolve("what can you do"), Intent::Inform(Topic::Help));
        assert_eq!(resolve("thank you"), Intent::Inform(Topic::Thanks));
    }

    #[test]
    fn test_greeting_requires_whole_word() {
        assert_eq!(resolve("hi there"), Intent::Inform(Topic::Greeting));
        assert_eq!(resolve("sing this song"), Intent::Unknown);
    }

    #[test]
    fn test_unknown_never_fails() {
        assert_eq!(resolve(""), Intent::Unknown);
        assert_eq!(resolve("banana"), Intent::Unknown);
    }

    #[test]
    fn test_spoken_project_name() {
        assert_eq!(spoken_project_name("tell me about the project"), None);
        assert_eq!(
            spoken_project_name("tell me about the nebula project"),
            Some("nebula".to_string())
        );
    }
}
