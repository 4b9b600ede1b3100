//! Canned spoken replies

use crate::host::{SectionId, Theme};

use super::catalog::{ProjectCatalog, DEFAULT_PROJECT_DESCRIPTION};
use super::intent::Topic;

pub const ACKNOWLEDGEMENTS: [&str; 4] = [
    "Yes, how can I help you?",
    "At your service!",
    "I'm listening.",
    "How may I assist you?",
];

pub const GREETING: &str =
    "Hello! I'm Jarvis, your AI assistant. Click the button, then say 'Hello Talha' to activate me.";
pub const GOODBYE: &str = "I'm going to sleep. Click the button to activate me again.";
pub const STANDBY: &str = "Going back to standby. Say 'Hello Talha' when you need me.";
pub const SLEEP_NOTICE: &str =
    "I'm going back to sleep. Click the button to activate me again.";
pub const PERMISSION_DENIED: &str =
    "Microphone permission denied. Please allow microphone access to use Jarvis.";
pub const UNSUPPORTED: &str =
    "Speech recognition is not supported in this browser. Please use Chrome or Edge.";

const FALLBACK: &str = "I'm not sure I understood that. You can ask me to navigate to different sections (like 'go to work' or 'show me projects'), tell you about Talha, his skills, projects, experience, or how to contact him. Try saying 'help' for more options, or be more specific with your question.";

pub fn fallback() -> &'static str {
    FALLBACK
}

pub fn navigation_confirmation(section: SectionId) -> &'static str {
    match section {
        SectionId::Home => "Taking you to the home section.",
        SectionId::Work => "Taking you to the projects section.",
        SectionId::Experience => "Displaying the experience timeline.",
        SectionId::Services => "Showing the services section.",
        SectionId::Testimonial => "Displaying testimonials.",
        SectionId::Contact => "Opening the contact section.",
    }
}

pub fn navigation_failure(section: SectionId) -> String {
    format!(
        "Sorry, I couldn't find the {} section. Please try again.",
        section
    )
}

pub fn theme_switched(theme: Theme) -> String {
    format!("Switching to {} mode.", theme)
}

pub fn theme_unchanged(theme: Theme) -> String {
    format!("Already in {} mode.", theme)
}

pub fn theme_toggled(theme: Theme) -> String {
    format!("Theme switched to {} mode.", theme)
}

/// Spoken answer for an informational topic
pub fn topic_reply(topic: &Topic, catalog: &ProjectCatalog) -> String {
    match topic {
        Topic::Sections => "I can navigate to: home, work, experience, services, testimonials, or contact. Which section would you like to visit?".to_string(),
        Topic::Project { query } => match catalog.find(query) {
            Some(project) => format!("{} is {}", project.title, project.description),
            None => format!("{} is {}", spoken_name(query), DEFAULT_PROJECT_DESCRIPTION),
        },
        Topic::Identity => "Talha is a Full Stack Developer specializing in React and Node.js. He has worked with over 100 clients worldwide and completed more than 500 projects. He's an expert in building modern web applications with technologies like React, Node.js, MongoDB, and more. He's passionate about creating efficient, scalable solutions and delivering high-quality software.".to_string(),
        Topic::Background => "Talha is a skilled Full Stack Developer with extensive experience in web development. He has successfully completed over 500 projects and worked with more than 100 clients globally. His expertise spans across modern web technologies and he's known for delivering high-quality, scalable applications.".to_string(),
        Topic::Skills => "Talha specializes in Full Stack Development with expertise in React, Node.js, MongoDB, TypeScript, JavaScript, and various modern web technologies. He's also skilled in React Native for mobile development, Redux for state management, Express.js for backend, and building scalable, performant applications.".to_string(),
        Topic::Profession => "Talha is a Full Stack Developer who creates web and mobile applications. He works with both frontend and backend technologies to build complete solutions, with React on the frontend, Node.js for backend services, and MongoDB for databases.".to_string(),
        Topic::ProjectList => format!(
            "Talha has worked on several impressive projects including: {}. These range from healthcare management systems to AI-powered business platforms. Would you like to know more about any specific project?",
            catalog.titles()
        ),
        Topic::ContactInfo => "You can contact Talha via email at syedtalha497@gmail.com. You can also use the contact form on this website or reach out via WhatsApp using the WhatsApp button. He's always open to discussing new projects and opportunities.".to_string(),
        Topic::Availability => "Talha is available for new projects and opportunities. You can contact him via email at syedtalha497@gmail.com or through the contact form to discuss your project requirements.".to_string(),
        Topic::Services => "Talha offers Full Stack Development services including web applications, mobile apps using React Native, backend APIs with Node.js, database design with MongoDB, and complete end-to-end solutions.".to_string(),
        Topic::ExperienceYears => "Talha has extensive experience in Full Stack Development, having completed over 500 projects and worked with more than 100 clients worldwide.".to_string(),
        Topic::Location => "Talha is a Full Stack Developer available for projects globally. He has worked with clients worldwide, across different time zones and regions.".to_string(),
        Topic::Pricing => "For pricing and project details, please contact Talha directly via email at syedtalha497@gmail.com or through the contact form. He provides customized quotes based on project requirements and scope.".to_string(),
        Topic::Testimonials => "Talha has received positive feedback from over 100 clients worldwide. You can view testimonials in the testimonials section of the portfolio.".to_string(),
        Topic::Help => "I can navigate you to different sections like home, work, experience, services, testimonials, and contact. I can tell you about Talha's background, skills, projects, and how to contact him. I can also switch between light and dark mode. Just say 'change theme', 'switch to dark mode' or 'switch to light mode'.".to_string(),
        Topic::Greeting => "Hello! How can I assist you today? I can help you navigate the portfolio, tell you about Talha's skills and projects, or provide contact information. What would you like to know?".to_string(),
        Topic::Thanks => "You're welcome! Feel free to ask me anything else about Talha or navigate through the portfolio. Have a great day!".to_string(),
    }
}

/// Capitalize a spoken project name for the reply
fn spoken_name(query: &str) -> String {
    let query = query.trim();
    let mut chars = query.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "That project".to_string(),
    }
}
