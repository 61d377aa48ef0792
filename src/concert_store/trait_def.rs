//! ConcertStore trait definition.

use super::models::{
    Concert, ConcertId, ConcertQuery, DateOrder, DescriptionId, Track, TrackDescription, TrackId,
};
use crate::templates::PromptTemplate;
use anyhow::Result;

/// Storage backend for concerts, their tracks, generated descriptions and
/// the editable prompt template set.
///
/// Methods are synchronous; async callers go through
/// [`BlockingStore`](super::BlockingStore). No transaction spans two calls.
pub trait ConcertStore: Send + Sync {
    // =========================================================================
    // Concerts
    // =========================================================================

    fn insert_concert(&self, concert: &Concert) -> Result<()>;

    fn get_concert(&self, id: &ConcertId) -> Result<Option<Concert>>;

    fn list_concerts(&self, order: DateOrder, limit: Option<usize>) -> Result<Vec<Concert>>;

    fn search_concerts(&self, query: &ConcertQuery) -> Result<Vec<Concert>>;

    /// Returns `false` when no concert had this id.
    fn delete_concert(&self, id: &ConcertId) -> Result<bool>;

    // =========================================================================
    // Tracks
    // =========================================================================

    /// Inserts all tracks in one write; either all or none are stored.
    fn insert_tracks(&self, tracks: &[Track]) -> Result<()>;

    fn get_track(&self, id: &TrackId) -> Result<Option<Track>>;

    /// Tracks of a concert in program order.
    fn get_tracks_for_concert(&self, concert_id: &ConcertId) -> Result<Vec<Track>>;

    fn count_tracks_for_concert(&self, concert_id: &ConcertId) -> Result<usize>;

    fn delete_track(&self, id: &TrackId) -> Result<bool>;

    fn delete_tracks_for_concert(&self, concert_id: &ConcertId) -> Result<usize>;

    // =========================================================================
    // Descriptions
    // =========================================================================

    /// Inserts all descriptions in one write. A row with the same
    /// `(track_id, prompt_type)` as an existing one overwrites its text and
    /// timestamp; the stored id is kept.
    fn insert_descriptions(&self, descriptions: &[TrackDescription]) -> Result<()>;

    fn get_descriptions_for_track(&self, track_id: &TrackId) -> Result<Vec<TrackDescription>>;

    fn get_descriptions_for_tracks(&self, track_ids: &[TrackId])
        -> Result<Vec<TrackDescription>>;

    fn count_descriptions_for_tracks(&self, track_ids: &[TrackId]) -> Result<usize>;

    fn delete_description(&self, id: &DescriptionId) -> Result<bool>;

    fn delete_descriptions_for_tracks(&self, track_ids: &[TrackId]) -> Result<usize>;

    // =========================================================================
    // Prompt templates
    // =========================================================================

    /// Stored templates in their saved order; empty when none were saved.
    fn list_templates(&self) -> Result<Vec<PromptTemplate>>;

    /// Replaces the whole stored template set atomically.
    fn replace_templates(&self, templates: &[PromptTemplate]) -> Result<()>;
}
