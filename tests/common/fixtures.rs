//! Test environment wiring and store fixtures

use super::constants::*;
use super::llm::ScriptedLlm;
use anyhow::{bail, Result};
use concert_notes::catalog::ConcertCatalog;
use concert_notes::concert_store::{
    BlockingStore, Concert, ConcertId, ConcertQuery, ConcertStore, DateOrder, DescriptionId,
    SqliteConcertStore, Track, TrackDescription, TrackId,
};
use concert_notes::generation::{
    BatchDescriptionPipeline, DescriptionGenerator, GeneratorSettings, ProgressObserver,
};
use concert_notes::ingestion::ConcertIngestionWorkflow;
use concert_notes::templates::{PromptTemplate, TemplateRegistry};
use concert_notes::user::{Session, UserId, UserRole};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const GENERATION_TIMEOUT: Duration = Duration::from_millis(500);

pub fn admin_session() -> Session {
    Session {
        user_id: UserId::from(ADMIN_EMAIL),
        email: ADMIN_EMAIL.to_string(),
        role: UserRole::Admin,
    }
}

pub fn regular_session() -> Session {
    Session {
        user_id: UserId::from(REGULAR_EMAIL),
        email: REGULAR_EMAIL.to_string(),
        role: UserRole::Regular,
    }
}

/// Templates A, B and C, each body tagged with its own name.
pub fn test_templates() -> Vec<PromptTemplate> {
    [TEMPLATE_A, TEMPLATE_B, TEMPLATE_C]
        .into_iter()
        .map(|name| PromptTemplate {
            name: name.to_string(),
            body: format!("[{}] Describe {{track_title}} by {{composer}}.", name),
            system_instruction: String::new(),
        })
        .collect()
}

// ============================================================================
// Store that fails on demand
// ============================================================================

/// Delegates to a real SQLite store, failing track or description inserts
/// while the matching switch is on.
pub struct FlakyStore {
    inner: Arc<SqliteConcertStore>,
    fail_tracks: AtomicBool,
    fail_descriptions: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteConcertStore>) -> Self {
        Self {
            inner,
            fail_tracks: AtomicBool::new(false),
            fail_descriptions: AtomicBool::new(false),
        }
    }

    pub fn fail_track_inserts(&self, fail: bool) {
        self.fail_tracks.store(fail, Ordering::SeqCst);
    }

    pub fn fail_description_inserts(&self, fail: bool) {
        self.fail_descriptions.store(fail, Ordering::SeqCst);
    }
}

impl ConcertStore for FlakyStore {
    fn insert_concert(&self, concert: &Concert) -> Result<()> {
        self.inner.insert_concert(concert)
    }

    fn get_concert(&self, id: &ConcertId) -> Result<Option<Concert>> {
        self.inner.get_concert(id)
    }

    fn list_concerts(&self, order: DateOrder, limit: Option<usize>) -> Result<Vec<Concert>> {
        self.inner.list_concerts(order, limit)
    }

    fn search_concerts(&self, query: &ConcertQuery) -> Result<Vec<Concert>> {
        self.inner.search_concerts(query)
    }

    fn delete_concert(&self, id: &ConcertId) -> Result<bool> {
        self.inner.delete_concert(id)
    }

    fn insert_tracks(&self, tracks: &[Track]) -> Result<()> {
        if self.fail_tracks.load(Ordering::SeqCst) {
            bail!("disk I/O error while inserting {} tracks", tracks.len());
        }
        self.inner.insert_tracks(tracks)
    }

    fn get_track(&self, id: &TrackId) -> Result<Option<Track>> {
        self.inner.get_track(id)
    }

    fn get_tracks_for_concert(&self, concert_id: &ConcertId) -> Result<Vec<Track>> {
        self.inner.get_tracks_for_concert(concert_id)
    }

    fn count_tracks_for_concert(&self, concert_id: &ConcertId) -> Result<usize> {
        self.inner.count_tracks_for_concert(concert_id)
    }

    fn delete_track(&self, id: &TrackId) -> Result<bool> {
        self.inner.delete_track(id)
    }

    fn delete_tracks_for_concert(&self, concert_id: &ConcertId) -> Result<usize> {
        self.inner.delete_tracks_for_concert(concert_id)
    }

    fn insert_descriptions(&self, descriptions: &[TrackDescription]) -> Result<()> {
        if self.fail_descriptions.load(Ordering::SeqCst) {
            bail!(
                "disk I/O error while inserting {} descriptions",
                descriptions.len()
            );
        }
        self.inner.insert_descriptions(descriptions)
    }

    fn get_descriptions_for_track(&self, track_id: &TrackId) -> Result<Vec<TrackDescription>> {
        self.inner.get_descriptions_for_track(track_id)
    }

    fn get_descriptions_for_tracks(&self, track_ids: &[TrackId]) -> Result<Vec<TrackDescription>> {
        self.inner.get_descriptions_for_tracks(track_ids)
    }

    fn count_descriptions_for_tracks(&self, track_ids: &[TrackId]) -> Result<usize> {
        self.inner.count_descriptions_for_tracks(track_ids)
    }

    fn delete_description(&self, id: &DescriptionId) -> Result<bool> {
        self.inner.delete_description(id)
    }

    fn delete_descriptions_for_tracks(&self, track_ids: &[TrackId]) -> Result<usize> {
        self.inner.delete_descriptions_for_tracks(track_ids)
    }

    fn list_templates(&self) -> Result<Vec<PromptTemplate>> {
        self.inner.list_templates()
    }

    fn replace_templates(&self, templates: &[PromptTemplate]) -> Result<()> {
        self.inner.replace_templates(templates)
    }
}

// ============================================================================
// Progress
// ============================================================================

/// (template, track id, track label, succeeded)
pub type ProgressEvent = (String, Option<String>, String, bool);

#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    /// Events in completion order.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressObserver for RecordingProgress {
    fn on_template_complete(
        &self,
        template_name: &str,
        track_id: Option<&TrackId>,
        track_label: &str,
        succeeded: bool,
    ) {
        self.events.lock().unwrap().push((
            template_name.to_string(),
            track_id.map(|id| id.as_str().to_string()),
            track_label.to_string(),
            succeeded,
        ));
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Fully wired services over a temp-dir database.
///
/// Temp resources are removed when the environment is dropped.
pub struct TestEnv {
    _temp_dir: TempDir,
    pub sqlite: Arc<SqliteConcertStore>,
    pub flaky: Arc<FlakyStore>,
    pub llm: Arc<ScriptedLlm>,
    pub registry: Arc<TemplateRegistry>,
    pub pipeline: Arc<BatchDescriptionPipeline>,
    pub workflow: ConcertIngestionWorkflow,
    pub catalog: ConcertCatalog,
    pub progress: Arc<RecordingProgress>,
}

impl TestEnv {
    pub async fn new(llm: ScriptedLlm) -> Self {
        Self::with_concurrency(llm, 3).await
    }

    pub async fn with_concurrency(llm: ScriptedLlm, max_concurrency: usize) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let sqlite = Arc::new(SqliteConcertStore::new(temp_dir.path().join("concerts.db")).unwrap());
        let flaky = Arc::new(FlakyStore::new(sqlite.clone()));
        let dyn_store: Arc<dyn ConcertStore> = flaky.clone();
        let store = BlockingStore::new(dyn_store, Duration::from_secs(5));

        let registry = Arc::new(TemplateRegistry::load(store.clone()).await.unwrap());
        registry.upsert_all(test_templates()).await.unwrap();

        let llm = Arc::new(llm);
        let generator = Arc::new(DescriptionGenerator::new(
            llm.clone(),
            GeneratorSettings {
                timeout: GENERATION_TIMEOUT,
                ..Default::default()
            },
        ));
        let pipeline = Arc::new(BatchDescriptionPipeline::new(
            registry.clone(),
            generator,
            max_concurrency,
        ));
        let progress = Arc::new(RecordingProgress::default());
        let workflow = ConcertIngestionWorkflow::new(store.clone(), pipeline.clone())
            .with_progress(progress.clone());
        let catalog = ConcertCatalog::new(store);

        Self {
            _temp_dir: temp_dir,
            sqlite,
            flaky,
            llm,
            registry,
            pipeline,
            workflow,
            catalog,
            progress,
        }
    }
}
