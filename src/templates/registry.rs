use super::{default_templates, PromptTemplate, DEFAULT_SYSTEM_INSTRUCTION};
use crate::concert_store::BlockingStore;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::sync::RwLock;
use tracing::info;

/// Named prompt templates shared by all generation tasks.
///
/// Reads are served from an in-memory snapshot; every write goes to the
/// store first and then replaces the snapshot.
pub struct TemplateRegistry {
    store: Option<BlockingStore>,
    cache: RwLock<Vec<PromptTemplate>>,
}

impl TemplateRegistry {
    /// Loads the saved template set, falling back to the defaults when none
    /// has been saved yet.
    pub async fn load(store: BlockingStore) -> Result<Self> {
        let stored = store.read("list_templates", |s| s.list_templates()).await?;
        let from_store = !stored.is_empty();
        let templates = Self::effective(stored);
        info!(
            count = templates.len(),
            from_store, "Loaded prompt templates"
        );
        Ok(Self {
            store: Some(store),
            cache: RwLock::new(templates),
        })
    }

    /// Registry without persistence; writes only update the snapshot.
    pub fn in_memory(templates: Vec<PromptTemplate>) -> Self {
        Self {
            store: None,
            cache: RwLock::new(Self::effective(templates)),
        }
    }

    pub fn resolve(&self, name: &str) -> Result<PromptTemplate> {
        self.snapshot()
            .into_iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::UnknownTemplate(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read_cache(|templates| templates.iter().any(|t| t.name == name))
    }

    pub fn list_names(&self) -> Vec<String> {
        self.read_cache(|templates| templates.iter().map(|t| t.name.clone()).collect())
    }

    pub fn snapshot(&self) -> Vec<PromptTemplate> {
        self.read_cache(|templates| templates.to_vec())
    }

    /// Replaces the entire template set.
    pub async fn upsert_all(&self, templates: Vec<PromptTemplate>) -> Result<()> {
        validate(&templates)?;
        if let Some(store) = &self.store {
            let to_store = templates.clone();
            store
                .write("replace_templates", move |s| s.replace_templates(&to_store))
                .await?;
        }
        let count = templates.len();
        self.replace_cache(Self::effective(templates));
        info!(count, "Prompt templates updated");
        Ok(())
    }

    pub async fn reset_to_defaults(&self) -> Result<()> {
        self.upsert_all(default_templates()).await
    }

    fn effective(templates: Vec<PromptTemplate>) -> Vec<PromptTemplate> {
        if templates.is_empty() {
            return default_templates();
        }
        templates
            .into_iter()
            .map(|mut t| {
                if t.system_instruction.trim().is_empty() {
                    t.system_instruction = DEFAULT_SYSTEM_INSTRUCTION.to_string();
                }
                t
            })
            .collect()
    }

    fn read_cache<T>(&self, f: impl FnOnce(&[PromptTemplate]) -> T) -> T {
        let guard = self.cache.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    fn replace_cache(&self, templates: Vec<PromptTemplate>) {
        let mut guard = self.cache.write().unwrap_or_else(|e| e.into_inner());
        *guard = templates;
    }
}

fn validate(templates: &[PromptTemplate]) -> Result<()> {
    if templates.is_empty() {
        return Err(Error::InvalidInput(
            "at least one template is required".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for template in templates {
        let name = template.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("template name is empty".to_string()));
        }
        if name != template.name {
            return Err(Error::InvalidInput(format!(
                "template name '{}' has surrounding whitespace",
                template.name
            )));
        }
        if template.body.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "template '{}' has an empty body",
                name
            )));
        }
        if !seen.insert(name) {
            return Err(Error::InvalidInput(format!(
                "duplicate template name '{}'",
                name
            )));
        }
    }
    Ok(())
}
