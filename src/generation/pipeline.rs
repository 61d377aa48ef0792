use super::generator::{fallback_text, DescriptionGenerator, GenerationOutcome};
use super::progress::ProgressObserver;
use crate::concert_store::{Track, TrackId};
use crate::error::{Error, Result};
use crate::templates::{PromptTemplate, TemplateRegistry};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub parallel: bool,
    /// Upper bound on this call's in-flight generations. The pipeline-wide
    /// bound still applies on top of it.
    pub max_concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Descriptions for one track, keyed by template name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    /// One entry per resolved template; failed ones hold the fallback text.
    pub descriptions: BTreeMap<String, String>,
    pub failed: BTreeSet<String>,
    /// Requested names that are not registered.
    pub skipped: Vec<String>,
}

impl BatchResult {
    pub fn generated_count(&self) -> usize {
        self.descriptions.len() - self.failed.len()
    }
}

struct TemplateRun {
    name: String,
    text: String,
    succeeded: bool,
}

/// Runs the generator once per selected template for a track.
///
/// The semaphore is shared by every batch on this pipeline, so concurrent
/// batches together never exceed `max_concurrency` outstanding calls.
pub struct BatchDescriptionPipeline {
    registry: Arc<TemplateRegistry>,
    generator: Arc<DescriptionGenerator>,
    permits: Arc<Semaphore>,
}

impl BatchDescriptionPipeline {
    pub fn new(
        registry: Arc<TemplateRegistry>,
        generator: Arc<DescriptionGenerator>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            registry,
            generator,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    /// Splits requested names into registered templates (deduplicated, in
    /// request order) and unknown names.
    pub fn resolve_selection(&self, template_names: &[String]) -> (Vec<PromptTemplate>, Vec<String>) {
        let mut seen = HashSet::new();
        let mut templates = Vec::new();
        let mut skipped = Vec::new();
        for name in template_names {
            if !seen.insert(name.as_str()) {
                continue;
            }
            match self.registry.resolve(name) {
                Ok(template) => templates.push(template),
                Err(_) => {
                    warn!(template = %name, "Skipping unknown template");
                    skipped.push(name.clone());
                }
            }
        }
        (templates, skipped)
    }

    pub async fn generate_batch(
        &self,
        template_names: &[String],
        track_title: &str,
        composer: &str,
        options: &BatchOptions,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<BatchResult> {
        self.run_batch(template_names, None, track_title, composer, options, progress)
            .await
    }

    /// Same as [`generate_batch`](Self::generate_batch) for a stored track;
    /// progress events carry its id.
    pub async fn generate_batch_for_track(
        &self,
        template_names: &[String],
        track: &Track,
        options: &BatchOptions,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<BatchResult> {
        self.run_batch(
            template_names,
            Some(&track.id),
            &track.title,
            &track.composer,
            options,
            progress,
        )
        .await
    }

    async fn run_batch(
        &self,
        template_names: &[String],
        track_id: Option<&TrackId>,
        track_title: &str,
        composer: &str,
        options: &BatchOptions,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<BatchResult> {
        if template_names.is_empty() {
            return Err(Error::NoTemplatesSelected);
        }
        let track_title = track_title.trim();
        let composer = composer.trim();
        if track_title.is_empty() || composer.is_empty() {
            return Err(Error::InvalidInput(
                "track title and composer must not be empty".to_string(),
            ));
        }

        let (templates, skipped) = self.resolve_selection(template_names);
        if templates.is_empty() {
            return Err(Error::UnknownTemplate(skipped.join(", ")));
        }

        let track_label = format!("{} - {}", track_title, composer);
        let mut result = BatchResult {
            skipped,
            ..Default::default()
        };
        let mut record = |run: TemplateRun| {
            if let Some(observer) = progress {
                observer.on_template_complete(&run.name, track_id, &track_label, run.succeeded);
            }
            if !run.succeeded {
                result.failed.insert(run.name.clone());
            }
            result.descriptions.insert(run.name, run.text);
        };

        if options.parallel {
            let mut runs = stream::iter(templates)
                .map(|template| self.run_template(template, track_title, composer))
                .buffer_unordered(options.max_concurrency.max(1));
            while let Some(run) = runs.next().await {
                record(run);
            }
        } else {
            for template in templates {
                record(self.run_template(template, track_title, composer).await);
            }
        }

        info!(
            track = %track_label,
            track_id = track_id.map(TrackId::as_str),
            generated = result.generated_count(),
            failed = result.failed.len(),
            skipped = result.skipped.len(),
            "Batch generation finished"
        );
        Ok(result)
    }

    /// Runs one template on its own task so a panic is contained.
    async fn run_template(
        &self,
        template: PromptTemplate,
        track_title: &str,
        composer: &str,
    ) -> TemplateRun {
        let name = template.name.clone();
        let generator = self.generator.clone();
        let permits = self.permits.clone();
        let title = track_title.to_string();
        let comp = composer.to_string();

        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            generator.generate(&template, &title, &comp).await
        });

        match handle.await {
            Ok(Ok(GenerationOutcome::Text(text))) => TemplateRun {
                name,
                text,
                succeeded: true,
            },
            Ok(Ok(outcome)) => TemplateRun {
                name,
                text: outcome.into_text(track_title, composer),
                succeeded: false,
            },
            Ok(Err(e)) => {
                warn!(template = %name, "Generation rejected: {}", e);
                TemplateRun {
                    name,
                    text: fallback_text(track_title, composer),
                    succeeded: false,
                }
            }
            Err(join_err) => {
                error!(template = %name, "Generation task aborted: {}", join_err);
                TemplateRun {
                    name,
                    text: fallback_text(track_title, composer),
                    succeeded: false,
                }
            }
        }
    }
}
