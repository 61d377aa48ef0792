//! Prompt templates: the built-in set, substitution, and the shared registry.

mod defaults;
mod registry;

pub use defaults::{default_templates, DEFAULT_SYSTEM_INSTRUCTION};
pub use registry::TemplateRegistry;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub const TRACK_TITLE_PLACEHOLDER: &str = "{track_title}";
pub const COMPOSER_PLACEHOLDER: &str = "{composer}";

/// A named prompt body with `{track_title}` / `{composer}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub body: String,
    /// Empty means "use [`DEFAULT_SYSTEM_INSTRUCTION`]".
    #[serde(default)]
    pub system_instruction: String,
}

/// Replaces every `{track_title}` and `{composer}` occurrence with the given
/// values. Any other brace text is left as written.
pub fn render_template(body: &str, track_title: &str, composer: &str) -> String {
    body.replace(TRACK_TITLE_PLACEHOLDER, track_title)
        .replace(COMPOSER_PLACEHOLDER, composer)
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    templates: Vec<PromptTemplate>,
}

/// Parses a TOML file of `[[templates]]` tables (`name`, `body`, optional
/// `system_instruction`).
pub fn parse_template_file(contents: &str) -> Result<Vec<PromptTemplate>> {
    let file: TemplateFile = toml::from_str(contents)
        .map_err(|e| Error::InvalidInput(format!("invalid template file: {}", e)))?;
    Ok(file.templates)
}
