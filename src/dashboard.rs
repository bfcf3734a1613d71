//! Fixed dashboard content: the greeting, sidebar shortcuts and canned prompts

use crate::config::FeatureFlags;
use serde::Serialize;

pub const GREETING: &str = "Hello! How can I help you with legal document analysis today?";

pub const SUGGESTED_SECTIONS: [&str; 6] = [
    "Bharatiya Nyaya Sanhita (BNS)",
    "Bharatiya Nagarik Suraksha Sanhita (BNSS)",
    "Bharatiya Sakshya Adhiniyam, 2023",
    "Criminal Defamation",
    "Cyber Crimes",
    "Digital Evidence",
];

pub const RECENT_QUESTIONS: [&str; 5] = [
    "What are the penalties for defamation under BNS?",
    "How is digital evidence handled under the new laws?",
    "What changes were made to bail provisions?",
    "Explain the procedure for filing an FIR under BNSS",
    "What is the punishment for cyber terrorism?",
];

pub const VIDEO_ANALYSIS_PROMPT: &str =
    "Analyze this video for legal implications. It contains footage relevant to legal matters.";

/// Prompt sent when a suggested section is clicked
pub fn section_prompt(section: &str) -> String {
    format!("Tell me about {section}")
}

/// What the page renders around the chat
#[derive(Debug, Clone, Serialize)]
pub struct DashboardLayout {
    pub greeting: &'static str,
    pub features: FeatureFlags,
    pub suggested_sections: Vec<&'static str>,
    pub recent_questions: Vec<&'static str>,
}

impl DashboardLayout {
    pub fn new(features: FeatureFlags) -> Self {
        let (suggested_sections, recent_questions) = if features.sidebar {
            (SUGGESTED_SECTIONS.to_vec(), RECENT_QUESTIONS.to_vec())
        } else {
            (Vec::new(), Vec::new())
        };
        Self {
            greeting: GREETING,
            features,
            suggested_sections,
            recent_questions,
        }
    }
}
