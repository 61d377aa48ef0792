//! Concert registration: concert, tracks and generated descriptions.

mod track_list;
mod workflow;

pub use track_list::{parse_track_lines, TrackDraft};
pub use workflow::{
    ConcertDraft, ConcertIngestionWorkflow, IngestOptions, IngestionReport, RegenerateTarget,
    TemplateTally,
};
