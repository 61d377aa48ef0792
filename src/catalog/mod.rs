//! Read side of the concert data plus administrative deletion.

use crate::concert_store::{
    BlockingStore, Concert, ConcertId, ConcertQuery, DateOrder, DescriptionId, Track,
    TrackDescription, TrackId,
};
use crate::error::{Error, Result};
use crate::user::Session;
use tracing::info;

#[derive(Debug, Clone)]
pub struct TrackWithDescriptions {
    pub track: Track,
    /// Ordered by template name.
    pub descriptions: Vec<TrackDescription>,
}

#[derive(Debug, Clone)]
pub struct ConcertDetail {
    pub concert: Concert,
    pub tracks: Vec<TrackWithDescriptions>,
}

/// A concert with the size of its program, for the admin listing.
#[derive(Debug, Clone)]
pub struct ConcertSummary {
    pub concert: Concert,
    pub track_count: usize,
    pub description_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub concerts: usize,
    pub tracks: usize,
    pub descriptions: usize,
}

pub struct ConcertCatalog {
    store: BlockingStore,
}

impl ConcertCatalog {
    pub fn new(store: BlockingStore) -> Self {
        Self { store }
    }

    pub async fn list_concerts(&self, order: DateOrder, limit: Option<usize>) -> Result<Vec<Concert>> {
        self.store
            .read("list_concerts", move |s| s.list_concerts(order, limit))
            .await
    }

    pub async fn search(&self, query: ConcertQuery) -> Result<Vec<Concert>> {
        self.store
            .read("search_concerts", move |s| s.search_concerts(&query))
            .await
    }

    pub async fn concert_detail(&self, id: &ConcertId) -> Result<ConcertDetail> {
        let lookup = id.clone();
        let detail = self
            .store
            .read("concert_detail", move |s| {
                let Some(concert) = s.get_concert(&lookup)? else {
                    return Ok(None);
                };
                let tracks = s.get_tracks_for_concert(&lookup)?;
                let track_ids: Vec<TrackId> = tracks.iter().map(|t| t.id.clone()).collect();
                let mut descriptions = s.get_descriptions_for_tracks(&track_ids)?;

                let tracks = tracks
                    .into_iter()
                    .map(|track| {
                        let (own, rest): (Vec<_>, Vec<_>) = descriptions
                            .drain(..)
                            .partition(|d| d.track_id == track.id);
                        descriptions = rest;
                        TrackWithDescriptions {
                            track,
                            descriptions: own,
                        }
                    })
                    .collect();
                Ok(Some(ConcertDetail { concert, tracks }))
            })
            .await?;
        detail.ok_or_else(|| Error::NotFound(format!("concert {}", id)))
    }

    /// Most recent concerts first, with track and description counts.
    pub async fn concert_summaries(&self, limit: Option<usize>) -> Result<Vec<ConcertSummary>> {
        self.store
            .read("concert_summaries", move |s| {
                s.list_concerts(DateOrder::Descending, limit)?
                    .into_iter()
                    .map(|concert| -> anyhow::Result<ConcertSummary> {
                        let tracks = s.get_tracks_for_concert(&concert.id)?;
                        let track_ids: Vec<TrackId> = tracks.into_iter().map(|t| t.id).collect();
                        let description_count = s.count_descriptions_for_tracks(&track_ids)?;
                        Ok(ConcertSummary {
                            concert,
                            track_count: track_ids.len(),
                            description_count,
                        })
                    })
                    .collect()
            })
            .await
    }

    /// Deletes a concert after its descriptions and tracks.
    pub async fn delete_concert(&self, session: &Session, id: &ConcertId) -> Result<DeletionReport> {
        session.require_admin()?;
        let target = id.clone();
        let report = self
            .store
            .write("delete_concert", move |s| {
                let track_ids: Vec<TrackId> = s
                    .get_tracks_for_concert(&target)?
                    .into_iter()
                    .map(|t| t.id)
                    .collect();
                let descriptions = s.delete_descriptions_for_tracks(&track_ids)?;
                let tracks = s.delete_tracks_for_concert(&target)?;
                let concerts = usize::from(s.delete_concert(&target)?);
                Ok(DeletionReport {
                    concerts,
                    tracks,
                    descriptions,
                })
            })
            .await?;

        if report.concerts == 0 {
            return Err(Error::NotFound(format!("concert {}", id)));
        }
        info!(
            concert_id = %id,
            tracks = report.tracks,
            descriptions = report.descriptions,
            user = %session.user_id,
            "Concert deleted"
        );
        Ok(report)
    }

    pub async fn delete_track(&self, session: &Session, id: &TrackId) -> Result<DeletionReport> {
        session.require_admin()?;
        let target = id.clone();
        let report = self
            .store
            .write("delete_track", move |s| {
                let descriptions = s.delete_descriptions_for_tracks(std::slice::from_ref(&target))?;
                let tracks = usize::from(s.delete_track(&target)?);
                Ok(DeletionReport {
                    concerts: 0,
                    tracks,
                    descriptions,
                })
            })
            .await?;

        if report.tracks == 0 {
            return Err(Error::NotFound(format!("track {}", id)));
        }
        info!(track_id = %id, descriptions = report.descriptions, "Track deleted");
        Ok(report)
    }

    pub async fn delete_description(&self, session: &Session, id: &DescriptionId) -> Result<()> {
        session.require_admin()?;
        let target = id.clone();
        let deleted = self
            .store
            .write("delete_description", move |s| s.delete_description(&target))
            .await?;
        if !deleted {
            return Err(Error::NotFound(format!("description {}", id)));
        }
        info!(description_id = %id, "Description deleted");
        Ok(())
    }
}
