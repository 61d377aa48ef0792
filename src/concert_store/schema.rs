//! SQLite schema for the concert database.
//!
//! Tracks and descriptions hang off their parent rows with `ON DELETE CASCADE`,
//! so deleting a concert never leaves orphans even when callers skip the
//! explicit cleanup order.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::Result;
use rusqlite::Connection;

const CONCERT_FK: ForeignKey = ForeignKey {
    foreign_table: "concerts",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TRACK_FK: ForeignKey = ForeignKey {
    foreign_table: "tracks",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const CONCERTS_TABLE: Table = Table {
    name: "concerts",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("venue", &SqlType::Text, non_null = true),
        sqlite_column!("date_start", &SqlType::Text, non_null = true), // YYYY-MM-DD
        sqlite_column!("date_end", &SqlType::Text),                    // NULL for single-day concerts
        sqlite_column!("description", &SqlType::Text, non_null = true),
        sqlite_column!("created_by", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created_at",
            &SqlType::Text,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_concerts_date", "date_start")],
    unique_constraints: &[],
};

const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "concert_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&CONCERT_FK)
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("composer", &SqlType::Text, non_null = true),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_tracks_concert", "concert_id"),
        ("idx_tracks_composer", "composer"),
    ],
    unique_constraints: &[&["concert_id", "position"]],
};

const TRACK_DESCRIPTIONS_TABLE: Table = Table {
    name: "track_descriptions",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "track_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&TRACK_FK)
        ),
        sqlite_column!("prompt_type", &SqlType::Text, non_null = true),
        sqlite_column!("text", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created_at",
            &SqlType::Text,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_track_descriptions_track", "track_id")],
    unique_constraints: &[&["track_id", "prompt_type"]],
};

const PROMPT_TEMPLATES_TABLE_V1: Table = Table {
    name: "prompt_templates",
    columns: &[
        sqlite_column!("name", &SqlType::Text, is_primary_key = true),
        sqlite_column!("body", &SqlType::Text, non_null = true),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

/// V2 stores a per-template system instruction; older rows get an empty one,
/// which the registry treats as "use the default instruction".
const PROMPT_TEMPLATES_TABLE_V2: Table = Table {
    name: "prompt_templates",
    columns: &[
        sqlite_column!("name", &SqlType::Text, is_primary_key = true),
        sqlite_column!("body", &SqlType::Text, non_null = true),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "system_instruction",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

fn add_system_instruction_column(conn: &Connection) -> Result<()> {
    conn.execute(
        "ALTER TABLE prompt_templates ADD COLUMN system_instruction TEXT NOT NULL DEFAULT ''",
        [],
    )?;
    Ok(())
}

pub const CONCERT_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[
            CONCERTS_TABLE,
            TRACKS_TABLE,
            TRACK_DESCRIPTIONS_TABLE,
            PROMPT_TEMPLATES_TABLE_V1,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[
            CONCERTS_TABLE,
            TRACKS_TABLE,
            TRACK_DESCRIPTIONS_TABLE,
            PROMPT_TEMPLATES_TABLE_V2,
        ],
        migration: Some(add_system_instruction_column),
    },
];
