use crate::concert_store::TrackId;
use tracing::info;

/// Receives a notification each time one template finishes for one track.
///
/// `track_id` is set when the batch runs for a stored track; ad hoc batches
/// only have the title and composer, carried in `track_label`.
pub trait ProgressObserver: Send + Sync {
    fn on_template_complete(
        &self,
        template_name: &str,
        track_id: Option<&TrackId>,
        track_label: &str,
        succeeded: bool,
    );
}

/// Reports progress through the log.
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_template_complete(
        &self,
        template_name: &str,
        track_id: Option<&TrackId>,
        track_label: &str,
        succeeded: bool,
    ) {
        info!(
            template = template_name,
            track_id = track_id.map(TrackId::as_str),
            track = track_label,
            succeeded,
            "Description finished"
        );
    }
}
