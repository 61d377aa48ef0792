use crate::error::{Error, Result};
use crate::user::UserId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Fresh random (UUID v4) identifier.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a concert row.
    ConcertId
);
string_id!(
    /// Identifier of a track row.
    TrackId
);
string_id!(
    /// Identifier of a generated description row.
    DescriptionId
);

// =============================================================================
// Concerts
// =============================================================================

/// Single day or inclusive range of days a concert runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcertDate {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl ConcertDate {
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: None,
        }
    }

    pub fn range(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidInput(format!(
                "concert end date {} is before start date {}",
                end, start
            )));
        }
        Ok(Self {
            start,
            end: (end != start).then_some(end),
        })
    }

    /// Parses `YYYY-MM-DD` or `YYYY-MM-DD..YYYY-MM-DD`.
    pub fn parse(s: &str) -> Result<Self> {
        let parse_day = |value: &str| {
            NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                .map_err(|e| Error::InvalidInput(format!("invalid date '{}': {}", value, e)))
        };
        match s.split_once("..") {
            Some((start, end)) => Self::range(parse_day(start)?, parse_day(end)?),
            None => Ok(Self::single(parse_day(s)?)),
        }
    }

    pub fn last_day(&self) -> NaiveDate {
        self.end.unwrap_or(self.start)
    }
}

impl fmt::Display for ConcertDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{} ~ {}", self.start, end),
            None => write!(f, "{}", self.start),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concert {
    pub id: ConcertId,
    pub title: String,
    pub venue: String,
    pub date: ConcertDate,
    pub description: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Ordering for concert listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateOrder {
    /// Upcoming first (public listing).
    #[default]
    Ascending,
    /// Most recent first (admin dashboard).
    Descending,
}

impl DateOrder {
    pub(super) fn as_sql(self) -> &'static str {
        match self {
            DateOrder::Ascending => "ASC",
            DateOrder::Descending => "DESC",
        }
    }
}

/// Filters for concert search. All present filters must match.
///
/// `text` matches title, venue, description or any track's composer.
#[derive(Debug, Clone, Default)]
pub struct ConcertQuery {
    pub text: Option<String>,
    pub title: Option<String>,
    pub venue: Option<String>,
    pub composer: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub order: DateOrder,
}

// =============================================================================
// Tracks and descriptions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub concert_id: ConcertId,
    pub title: String,
    pub composer: String,
    /// Zero-based position in the concert program.
    pub position: u32,
}

impl Track {
    /// Short human label used in logs and progress output.
    pub fn label(&self) -> String {
        format!("{} - {}", self.title, self.composer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescription {
    pub id: DescriptionId,
    pub track_id: TrackId,
    /// Name of the template the text was generated with, kept even if the
    /// template is later renamed or removed.
    pub prompt_type: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl TrackDescription {
    pub fn new(track_id: TrackId, prompt_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: DescriptionId::generate(),
            track_id,
            prompt_type: prompt_type.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}
