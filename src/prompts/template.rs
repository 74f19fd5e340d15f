//! Prompt template definitions and the YAML-backed library.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tera::Tera;
use tracing::info;

use crate::batch::PromptStrategy;
use crate::error::PromptError;

fn default_expected_tokens() -> u32 {
    200
}

fn default_complexity() -> String {
    "simple".to_string()
}

/// A named prompt template tied to a strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Unique template name.
    pub name: String,
    /// Strategy this template implements.
    pub strategy: PromptStrategy,
    /// Template body in Tera syntax (`{{ problem_description }}` etc.).
    pub template: String,
    /// Variables the template expects; documentation for authors, not
    /// enforced at render time (Tera reports missing variables itself).
    #[serde(default)]
    pub variables: Vec<String>,
    /// Rough output-size expectation for this template.
    #[serde(default = "default_expected_tokens")]
    pub expected_tokens: u32,
    /// Author-assigned complexity label ("simple", "intermediate", ...).
    #[serde(default = "default_complexity")]
    pub complexity_level: String,
    /// Optional persona profile to prefix at request-build time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

/// On-disk shape of a prompt library file.
#[derive(Debug, Deserialize)]
struct PromptFile {
    prompts: Vec<PromptTemplate>,
}

/// Loaded, render-ready collection of prompt templates.
///
/// Templates are keyed by name in a `BTreeMap`, so per-strategy iteration
/// is lexicographic by name; combined with [`PromptStrategy`]'s declaration
/// order this fixes the deterministic orders the request builder's
/// cross-product contract is measured against.
#[derive(Debug)]
pub struct PromptLibrary {
    templates: BTreeMap<String, PromptTemplate>,
    tera: Tera,
}

impl PromptLibrary {
    /// Loads a prompt library from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `PromptError` on unreadable files, YAML syntax errors,
    /// duplicate template names, or template bodies Tera cannot compile.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PromptError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let file: PromptFile =
            serde_yaml::from_str(&raw).map_err(|e| PromptError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let library = Self::from_templates(file.prompts)?;
        info!(
            path = %path.display(),
            templates = library.len(),
            "Loaded prompt library"
        );
        Ok(library)
    }

    /// Builds a library from in-memory templates.
    pub fn from_templates(templates: Vec<PromptTemplate>) -> Result<Self, PromptError> {
        let mut map = BTreeMap::new();
        let mut tera = Tera::default();
        // Tera autoescapes HTML by default; prompts are plain text.
        tera.autoescape_on(vec![]);

        for template in templates {
            if map.contains_key(&template.name) {
                return Err(PromptError::DuplicateName(template.name));
            }
            tera.add_raw_template(&template.name, &template.template)?;
            map.insert(template.name.clone(), template);
        }

        Ok(Self {
            templates: map,
            tera,
        })
    }

    /// Renders a template by name with the given context.
    pub fn render(&self, name: &str, context: &tera::Context) -> Result<String, PromptError> {
        if !self.templates.contains_key(name) {
            return Err(PromptError::NotFound(name.to_string()));
        }
        Ok(self.tera.render(name, context)?)
    }

    /// Returns a template by name.
    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.get(name)
    }

    /// Strategies present in the library, in declaration order of
    /// [`PromptStrategy`].
    pub fn strategies(&self) -> Vec<PromptStrategy> {
        PromptStrategy::ALL
            .into_iter()
            .filter(|s| self.templates.values().any(|t| t.strategy == *s))
            .collect()
    }

    /// Templates for a strategy, sorted by name.
    pub fn templates_for(&self, strategy: PromptStrategy) -> Vec<&PromptTemplate> {
        self.templates
            .values()
            .filter(|t| t.strategy == strategy)
            .collect()
    }

    /// Number of templates in the library.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the library is empty.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
