use super::track_list::TrackDraft;
use crate::concert_store::{
    BlockingStore, Concert, ConcertDate, ConcertId, Track, TrackDescription, TrackId,
};
use crate::error::{Error, Result};
use crate::generation::{BatchDescriptionPipeline, BatchOptions, ProgressObserver};
use crate::user::Session;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Concert metadata as entered by an administrator.
#[derive(Debug, Clone)]
pub struct ConcertDraft {
    pub title: String,
    pub venue: String,
    pub date: ConcertDate,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub parallel: bool,
    pub max_concurrency: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        let batch = BatchOptions::default();
        Self {
            parallel: batch.parallel,
            max_concurrency: batch.max_concurrency,
        }
    }
}

impl IngestOptions {
    fn batch(&self) -> BatchOptions {
        BatchOptions {
            parallel: self.parallel,
            max_concurrency: self.max_concurrency,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateTally {
    pub generated: usize,
    /// Fallback text was stored.
    pub failed: usize,
    /// Generation failed during regeneration and the previously stored
    /// description was left in place.
    pub kept: usize,
}

/// What one ingestion (or regeneration) stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    pub concert_id: ConcertId,
    pub track_count: usize,
    pub description_count: usize,
    pub per_template: BTreeMap<String, TemplateTally>,
    pub skipped_templates: Vec<String>,
}

impl IngestionReport {
    /// Templates with at least one failed generation, whether a fallback
    /// was stored or an older description was kept.
    pub fn templates_needing_regeneration(&self) -> Vec<&str> {
        self.per_template
            .iter()
            .filter(|(_, tally)| tally.failed > 0 || tally.kept > 0)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Which existing tracks to regenerate descriptions for.
#[derive(Debug, Clone)]
pub enum RegenerateTarget {
    Concert(ConcertId),
    Track(TrackId),
}

/// Rows that must not be overwritten by fallback text.
type ExistingRows = HashSet<(TrackId, String)>;

struct GeneratedDescriptions {
    rows: Vec<TrackDescription>,
    per_template: BTreeMap<String, TemplateTally>,
    skipped: Vec<String>,
}

/// Registers a concert with its tracks and generated descriptions.
pub struct ConcertIngestionWorkflow {
    store: BlockingStore,
    pipeline: Arc<BatchDescriptionPipeline>,
    progress: Option<Arc<dyn ProgressObserver>>,
}

impl ConcertIngestionWorkflow {
    pub fn new(store: BlockingStore, pipeline: Arc<BatchDescriptionPipeline>) -> Self {
        Self {
            store,
            pipeline,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Stores the concert, then its tracks, then one description per
    /// (track, template).
    ///
    /// Input is validated before anything is written. Writes are not rolled
    /// back: a failure after the concert row exists is reported as
    /// [`Error::TracksNotSaved`] or [`Error::DescriptionsPending`].
    pub async fn ingest(
        &self,
        session: &Session,
        draft: ConcertDraft,
        tracks: Vec<TrackDraft>,
        template_names: &[String],
        options: &IngestOptions,
    ) -> Result<IngestionReport> {
        session.require_admin()?;

        let title = draft.title.trim().to_string();
        let venue = draft.venue.trim().to_string();
        if title.is_empty() || venue.is_empty() {
            return Err(Error::InvalidInput(
                "concert title and venue are required".to_string(),
            ));
        }
        if template_names.is_empty() {
            return Err(Error::NoTemplatesSelected);
        }

        let submitted = tracks.len();
        let valid_tracks: Vec<TrackDraft> = tracks.into_iter().filter(TrackDraft::is_valid).collect();
        if valid_tracks.is_empty() {
            return Err(Error::NoValidTracks);
        }
        if valid_tracks.len() < submitted {
            warn!(
                dropped = submitted - valid_tracks.len(),
                "Dropping tracks without a title or composer"
            );
        }
        self.ensure_known_templates(template_names)?;

        // 1. Concert
        let concert = Concert {
            id: ConcertId::generate(),
            title,
            venue,
            date: draft.date,
            description: draft.description.trim().to_string(),
            created_by: session.user_id.clone(),
            created_at: Utc::now(),
        };
        let concert_id = concert.id.clone();
        self.store
            .write("insert_concert", move |s| s.insert_concert(&concert))
            .await?;
        info!(concert_id = %concert_id, "Concert created");

        // 2. Tracks, in input order
        let track_rows: Vec<Track> = valid_tracks
            .into_iter()
            .enumerate()
            .map(|(position, draft)| Track {
                id: TrackId::generate(),
                concert_id: concert_id.clone(),
                title: draft.title.trim().to_string(),
                composer: draft.composer.trim().to_string(),
                position: position as u32,
            })
            .collect();
        let track_count = track_rows.len();
        let to_insert = track_rows.clone();
        if let Err(e) = self
            .store
            .write("insert_tracks", move |s| s.insert_tracks(&to_insert))
            .await
        {
            error!(concert_id = %concert_id, "Tracks could not be saved: {}", e);
            return Err(Error::TracksNotSaved {
                concert_id,
                source: Box::new(e),
            });
        }

        // 3. Descriptions, written in one batch
        let generated = match self
            .generate_for_tracks(&track_rows, template_names, &options.batch(), None)
            .await
        {
            Ok(generated) => generated,
            Err(e) => {
                return Err(Error::DescriptionsPending {
                    concert_id,
                    track_count,
                    source: Box::new(e),
                })
            }
        };
        let description_count = generated.rows.len();
        let rows = generated.rows;
        if let Err(e) = self
            .store
            .write("insert_descriptions", move |s| s.insert_descriptions(&rows))
            .await
        {
            error!(
                concert_id = %concert_id,
                track_count,
                "Descriptions could not be saved; regenerate them later: {}",
                e
            );
            return Err(Error::DescriptionsPending {
                concert_id,
                track_count,
                source: Box::new(e),
            });
        }

        info!(
            concert_id = %concert_id,
            track_count,
            description_count,
            "Concert ingestion finished"
        );
        Ok(IngestionReport {
            concert_id,
            track_count,
            description_count,
            per_template: generated.per_template,
            skipped_templates: generated.skipped,
        })
    }

    /// Generates descriptions again for tracks that already exist, replacing
    /// rows with the same (track, template).
    ///
    /// A template that fails for a track which already has a description
    /// for it leaves that row untouched and is counted as `kept`; fallback
    /// text is only written where nothing was stored before.
    pub async fn regenerate_descriptions(
        &self,
        session: &Session,
        target: RegenerateTarget,
        template_names: &[String],
        options: &IngestOptions,
    ) -> Result<IngestionReport> {
        session.require_admin()?;
        if template_names.is_empty() {
            return Err(Error::NoTemplatesSelected);
        }
        self.ensure_known_templates(template_names)?;

        let (concert_id, tracks) = match target {
            RegenerateTarget::Concert(concert_id) => {
                let id = concert_id.clone();
                let concert = self
                    .store
                    .read("get_concert", move |s| s.get_concert(&id))
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("concert {}", concert_id)))?;
                let id = concert.id.clone();
                let tracks = self
                    .store
                    .read("get_tracks_for_concert", move |s| {
                        s.get_tracks_for_concert(&id)
                    })
                    .await?;
                (concert.id, tracks)
            }
            RegenerateTarget::Track(track_id) => {
                let id = track_id.clone();
                let track = self
                    .store
                    .read("get_track", move |s| s.get_track(&id))
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("track {}", track_id)))?;
                (track.concert_id.clone(), vec![track])
            }
        };
        if tracks.is_empty() {
            return Err(Error::NoValidTracks);
        }

        let track_ids: Vec<TrackId> = tracks.iter().map(|t| t.id.clone()).collect();
        let existing: ExistingRows = self
            .store
            .read("get_descriptions_for_tracks", move |s| {
                s.get_descriptions_for_tracks(&track_ids)
            })
            .await?
            .into_iter()
            .map(|d| (d.track_id, d.prompt_type))
            .collect();

        let generated = self
            .generate_for_tracks(&tracks, template_names, &options.batch(), Some(&existing))
            .await?;
        let description_count = generated.rows.len();
        let rows = generated.rows;
        self.store
            .write("insert_descriptions", move |s| s.insert_descriptions(&rows))
            .await?;

        info!(
            concert_id = %concert_id,
            track_count = tracks.len(),
            description_count,
            "Descriptions regenerated"
        );
        Ok(IngestionReport {
            concert_id,
            track_count: tracks.len(),
            description_count,
            per_template: generated.per_template,
            skipped_templates: generated.skipped,
        })
    }

    fn ensure_known_templates(&self, template_names: &[String]) -> Result<()> {
        let (templates, skipped) = self.pipeline.resolve_selection(template_names);
        if templates.is_empty() {
            return Err(Error::UnknownTemplate(skipped.join(", ")));
        }
        Ok(())
    }

    /// Runs the batch pipeline for each track in turn.
    ///
    /// Failed templates whose (track, template) pair is in `existing` produce
    /// no row.
    async fn generate_for_tracks(
        &self,
        tracks: &[Track],
        template_names: &[String],
        batch_options: &BatchOptions,
        existing: Option<&ExistingRows>,
    ) -> Result<GeneratedDescriptions> {
        let mut generated = GeneratedDescriptions {
            rows: Vec::new(),
            per_template: BTreeMap::new(),
            skipped: Vec::new(),
        };

        for track in tracks {
            let batch = self
                .pipeline
                .generate_batch_for_track(
                    template_names,
                    track,
                    batch_options,
                    self.progress.as_deref(),
                )
                .await?;

            for (name, text) in batch.descriptions {
                let tally = generated.per_template.entry(name.clone()).or_default();
                if !batch.failed.contains(&name) {
                    tally.generated += 1;
                } else if existing
                    .is_some_and(|rows| rows.contains(&(track.id.clone(), name.clone())))
                {
                    warn!(
                        track_id = %track.id,
                        template = %name,
                        "Generation failed; keeping the stored description"
                    );
                    tally.kept += 1;
                    continue;
                } else {
                    tally.failed += 1;
                }
                generated
                    .rows
                    .push(TrackDescription::new(track.id.clone(), name, text));
            }
            for name in batch.skipped {
                if !generated.skipped.contains(&name) {
                    generated.skipped.push(name);
                }
            }
        }
        Ok(generated)
    }
}
