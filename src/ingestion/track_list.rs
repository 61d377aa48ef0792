/// A track as entered by an administrator, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDraft {
    pub title: String,
    pub composer: String,
}

impl TrackDraft {
    pub fn new(title: impl Into<String>, composer: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            composer: composer.into(),
        }
    }

    /// Both fields non-empty after trimming.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.composer.trim().is_empty()
    }
}

/// Parses a program listing with one `title - composer` entry per line.
///
/// The separator is the first ` - ` on the line, or the first `-` when the
/// line has no spaced dash. Lines without a dash or without a title are
/// skipped. A missing composer is kept here and rejected at ingestion.
pub fn parse_track_lines(text: &str) -> Vec<TrackDraft> {
    text.lines()
        .filter_map(|line| {
            let (title, composer) = line.split_once(" - ").or_else(|| line.split_once('-'))?;
            let title = title.trim();
            if title.is_empty() {
                return None;
            }
            Some(TrackDraft::new(title, composer.trim()))
        })
        .collect()
}
