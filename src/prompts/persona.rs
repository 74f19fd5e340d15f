//! Developer persona profiles for persona-enhanced prompting.
//!
//! A persona profile is a short characterization of the developer the
//! model should emulate. Templates opt in by naming a profile; the request
//! builder prefixes the rendered preamble to the prompt.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A developer persona applied to generation prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaProfile {
    /// One-line characterization ("Senior enterprise Java developer...").
    pub description: String,
    /// What this persona optimizes for.
    pub priorities: Vec<String>,
    /// Stylistic leanings, echoed into the preamble.
    pub style_preferences: Vec<String>,
}

impl PersonaProfile {
    /// Renders the persona as a prompt preamble.
    pub fn preamble(&self) -> String {
        let mut preamble = format!("You are a {}.", self.description);
        if !self.priorities.is_empty() {
            preamble.push_str(&format!(" Prioritize: {}.", self.priorities.join(", ")));
        }
        if !self.style_preferences.is_empty() {
            preamble.push_str(&format!(
                " Preferred style: {}.",
                self.style_preferences.join(", ")
            ));
        }
        preamble
    }

    /// Prefixes the preamble to a rendered prompt.
    pub fn apply(&self, prompt: &str) -> String {
        format!("{}\n\n{}", self.preamble(), prompt)
    }
}

/// Named collection of persona profiles.
#[derive(Debug, Clone)]
pub struct PersonaLibrary {
    profiles: BTreeMap<String, PersonaProfile>,
}

impl PersonaLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }

    /// Adds or replaces a profile.
    pub fn insert(&mut self, name: impl Into<String>, profile: PersonaProfile) {
        self.profiles.insert(name.into(), profile);
    }

    /// Looks up a profile by name.
    pub fn get(&self, name: &str) -> Option<&PersonaProfile> {
        self.profiles.get(name)
    }

    /// Profile names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }
}

impl Default for PersonaLibrary {
    /// The built-in profile set.
    fn default() -> Self {
        let mut library = Self::new();

        library.insert(
            "enterprise_developer",
            PersonaProfile {
                description: "senior enterprise developer with a focus on maintainability"
                    .to_string(),
                priorities: vec![
                    "code reusability".to_string(),
                    "documentation".to_string(),
                    "error handling".to_string(),
                ],
                style_preferences: vec![
                    "verbose naming".to_string(),
                    "extensive comments".to_string(),
                ],
            },
        );

        library.insert(
            "performance_engineer",
            PersonaProfile {
                description: "performance-focused engineer optimizing for speed and efficiency"
                    .to_string(),
                priorities: vec![
                    "time complexity".to_string(),
                    "memory optimization".to_string(),
                    "algorithmic efficiency".to_string(),
                ],
                style_preferences: vec![
                    "concise code".to_string(),
                    "technical comments".to_string(),
                ],
            },
        );

        library.insert(
            "security_specialist",
            PersonaProfile {
                description: "security-conscious developer prioritizing safe coding practices"
                    .to_string(),
                priorities: vec![
                    "input validation".to_string(),
                    "secure coding".to_string(),
                    "vulnerability prevention".to_string(),
                ],
                style_preferences: vec![
                    "paranoid validation".to_string(),
                    "security comments".to_string(),
                ],
            },
        );

        library
    }
}
