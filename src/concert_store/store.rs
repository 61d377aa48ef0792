use super::models::{
    Concert, ConcertDate, ConcertId, ConcertQuery, DateOrder, DescriptionId, Track,
    TrackDescription, TrackId,
};
use super::schema::CONCERT_VERSIONED_SCHEMAS;
use super::ConcertStore;
use crate::sqlite_persistence::migrate_if_needed;
use crate::templates::PromptTemplate;
use crate::user::UserId;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

const CONCERT_COLUMNS: &str =
    "c.id, c.title, c.venue, c.date_start, c.date_end, c.description, c.created_by, c.created_at";

pub struct SqliteConcertStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteConcertStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        if !path.exists() {
            info!("Creating new concert database at {:?}", path);
        }

        let mut conn = Connection::open(path).context("Failed to open concert database")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        migrate_if_needed(&mut conn, CONCERT_VERSIONED_SCHEMAS)
            .with_context(|| format!("Failed to prepare concert database at {:?}", path))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, used by tests and dry runs.
    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        migrate_if_needed(&mut conn, CONCERT_VERSIONED_SCHEMAS)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("concert database connection lock poisoned"))
    }

    fn row_to_concert(row: &Row) -> rusqlite::Result<Concert> {
        let start: String = row.get("date_start")?;
        let end: Option<String> = row.get("date_end")?;
        let created_by: String = row.get("created_by")?;
        let created_at: String = row.get("created_at")?;

        Ok(Concert {
            id: ConcertId::from(row.get::<_, String>("id")?),
            title: row.get("title")?,
            venue: row.get("venue")?,
            date: ConcertDate {
                start: parse_day(&start),
                end: end.as_deref().map(parse_day),
            },
            description: row.get("description")?,
            created_by: UserId::from(created_by),
            created_at: parse_timestamp(&created_at),
        })
    }

    fn row_to_track(row: &Row) -> rusqlite::Result<Track> {
        Ok(Track {
            id: TrackId::from(row.get::<_, String>("id")?),
            concert_id: ConcertId::from(row.get::<_, String>("concert_id")?),
            title: row.get("title")?,
            composer: row.get("composer")?,
            position: row.get("position")?,
        })
    }

    fn row_to_description(row: &Row) -> rusqlite::Result<TrackDescription> {
        let created_at: String = row.get("created_at")?;
        Ok(TrackDescription {
            id: DescriptionId::from(row.get::<_, String>("id")?),
            track_id: TrackId::from(row.get::<_, String>("track_id")?),
            prompt_type: row.get("prompt_type")?,
            text: row.get("text")?,
            created_at: parse_timestamp(&created_at),
        })
    }
}

fn parse_day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// `LIKE` pattern matching `needle` anywhere, with wildcards in the needle escaped.
fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// `?, ?, ?` for an `IN (...)` clause of `n` values.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn track_id_strs(track_ids: &[TrackId]) -> Vec<&str> {
    track_ids.iter().map(TrackId::as_str).collect()
}

impl ConcertStore for SqliteConcertStore {
    fn insert_concert(&self, concert: &Concert) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO concerts (id, title, venue, date_start, date_end, description, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                concert.id.as_str(),
                concert.title,
                concert.venue,
                concert.date.start.to_string(),
                concert.date.end.map(|d| d.to_string()),
                concert.description,
                concert.created_by.as_str(),
                concert.created_at.to_rfc3339(),
            ],
        )?;
        debug!(concert_id = %concert.id, "Inserted concert");
        Ok(())
    }

    fn get_concert(&self, id: &ConcertId) -> Result<Option<Concert>> {
        let conn = self.conn()?;
        let concert = conn
            .query_row(
                &format!("SELECT {} FROM concerts c WHERE c.id = ?1", CONCERT_COLUMNS),
                params![id.as_str()],
                Self::row_to_concert,
            )
            .optional()?;
        Ok(concert)
    }

    fn list_concerts(&self, order: DateOrder, limit: Option<usize>) -> Result<Vec<Concert>> {
        let conn = self.conn()?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM concerts c ORDER BY c.date_start {}, c.title LIMIT ?1",
            CONCERT_COLUMNS,
            order.as_sql()
        ))?;
        let concerts = stmt
            .query_map(params![limit], Self::row_to_concert)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(concerts)
    }

    fn search_concerts(&self, query: &ConcertQuery) -> Result<Vec<Concert>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
            clauses.push(
                "(c.title LIKE ? ESCAPE '\\' OR c.venue LIKE ? ESCAPE '\\' \
                 OR c.description LIKE ? ESCAPE '\\' \
                 OR EXISTS (SELECT 1 FROM tracks t WHERE t.concert_id = c.id AND t.composer LIKE ? ESCAPE '\\'))",
            );
            let pattern = contains_pattern(text);
            values.extend(std::iter::repeat(pattern).take(4));
        }
        if let Some(title) = query.title.as_deref().filter(|t| !t.trim().is_empty()) {
            clauses.push("c.title LIKE ? ESCAPE '\\'");
            values.push(contains_pattern(title));
        }
        if let Some(venue) = query.venue.as_deref().filter(|t| !t.trim().is_empty()) {
            clauses.push("c.venue LIKE ? ESCAPE '\\'");
            values.push(contains_pattern(venue));
        }
        if let Some(composer) = query.composer.as_deref().filter(|t| !t.trim().is_empty()) {
            clauses.push(
                "EXISTS (SELECT 1 FROM tracks t WHERE t.concert_id = c.id AND t.composer LIKE ? ESCAPE '\\')",
            );
            values.push(contains_pattern(composer));
        }
        // Date bounds select concerts whose run overlaps the window.
        if let Some(from) = query.from {
            clauses.push("COALESCE(c.date_end, c.date_start) >= ?");
            values.push(from.to_string());
        }
        if let Some(to) = query.to {
            clauses.push("c.date_start <= ?");
            values.push(to.to_string());
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {} FROM concerts c {} ORDER BY c.date_start {}, c.title",
            CONCERT_COLUMNS,
            where_clause,
            query.order.as_sql()
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let concerts = stmt
            .query_map(params_from_iter(values.iter()), Self::row_to_concert)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(concerts)
    }

    fn delete_concert(&self, id: &ConcertId) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM concerts WHERE id = ?1", params![id.as_str()])?;
        Ok(deleted > 0)
    }

    fn insert_tracks(&self, tracks: &[Track]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tracks (id, concert_id, title, composer, position)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for track in tracks {
                stmt.execute(params![
                    track.id.as_str(),
                    track.concert_id.as_str(),
                    track.title,
                    track.composer,
                    track.position,
                ])?;
            }
        }
        tx.commit()?;
        debug!(count = tracks.len(), "Inserted tracks");
        Ok(())
    }

    fn get_track(&self, id: &TrackId) -> Result<Option<Track>> {
        let conn = self.conn()?;
        let track = conn
            .query_row(
                "SELECT id, concert_id, title, composer, position FROM tracks WHERE id = ?1",
                params![id.as_str()],
                Self::row_to_track,
            )
            .optional()?;
        Ok(track)
    }

    fn get_tracks_for_concert(&self, concert_id: &ConcertId) -> Result<Vec<Track>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, concert_id, title, composer, position FROM tracks
             WHERE concert_id = ?1 ORDER BY position",
        )?;
        let tracks = stmt
            .query_map(params![concert_id.as_str()], Self::row_to_track)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    fn count_tracks_for_concert(&self, concert_id: &ConcertId) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tracks WHERE concert_id = ?1",
            params![concert_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn delete_track(&self, id: &TrackId) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM tracks WHERE id = ?1", params![id.as_str()])?;
        Ok(deleted > 0)
    }

    fn delete_tracks_for_concert(&self, concert_id: &ConcertId) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM tracks WHERE concert_id = ?1",
            params![concert_id.as_str()],
        )?;
        Ok(deleted)
    }

    fn insert_descriptions(&self, descriptions: &[TrackDescription]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO track_descriptions (id, track_id, prompt_type, text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(track_id, prompt_type) DO UPDATE SET
                    text = excluded.text, created_at = excluded.created_at",
            )?;
            for description in descriptions {
                stmt.execute(params![
                    description.id.as_str(),
                    description.track_id.as_str(),
                    description.prompt_type,
                    description.text,
                    description.created_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        debug!(count = descriptions.len(), "Inserted descriptions");
        Ok(())
    }

    fn get_descriptions_for_track(&self, track_id: &TrackId) -> Result<Vec<TrackDescription>> {
        self.get_descriptions_for_tracks(std::slice::from_ref(track_id))
    }

    fn get_descriptions_for_tracks(
        &self,
        track_ids: &[TrackId],
    ) -> Result<Vec<TrackDescription>> {
        if track_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, track_id, prompt_type, text, created_at FROM track_descriptions
             WHERE track_id IN ({}) ORDER BY track_id, prompt_type",
            placeholders(track_ids.len())
        ))?;
        let descriptions = stmt
            .query_map(
                params_from_iter(track_id_strs(track_ids)),
                Self::row_to_description,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(descriptions)
    }

    fn count_descriptions_for_tracks(&self, track_ids: &[TrackId]) -> Result<usize> {
        if track_ids.is_empty() {
            return Ok(0);
        }
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM track_descriptions WHERE track_id IN ({})",
                placeholders(track_ids.len())
            ),
            params_from_iter(track_id_strs(track_ids)),
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn delete_description(&self, id: &DescriptionId) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM track_descriptions WHERE id = ?1",
            params![id.as_str()],
        )?;
        Ok(deleted > 0)
    }

    fn delete_descriptions_for_tracks(&self, track_ids: &[TrackId]) -> Result<usize> {
        if track_ids.is_empty() {
            return Ok(0);
        }
        let conn = self.conn()?;
        let deleted = conn.execute(
            &format!(
                "DELETE FROM track_descriptions WHERE track_id IN ({})",
                placeholders(track_ids.len())
            ),
            params_from_iter(track_id_strs(track_ids)),
        )?;
        Ok(deleted)
    }

    fn list_templates(&self) -> Result<Vec<PromptTemplate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, body, system_instruction FROM prompt_templates ORDER BY position",
        )?;
        let templates = stmt
            .query_map([], |row| {
                Ok(PromptTemplate {
                    name: row.get("name")?,
                    body: row.get("body")?,
                    system_instruction: row.get("system_instruction")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(templates)
    }

    fn replace_templates(&self, templates: &[PromptTemplate]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM prompt_templates", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO prompt_templates (name, body, position, system_instruction)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, template) in templates.iter().enumerate() {
                stmt.execute(params![
                    template.name,
                    template.body,
                    position as i64,
                    template.system_instruction,
                ])?;
            }
        }
        tx.commit()?;
        info!(count = templates.len(), "Replaced stored prompt templates");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct TestStore {
        store: SqliteConcertStore,
        _temp_dir: TempDir,
    }

    fn create_test_store() -> TestStore {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteConcertStore::new(temp_dir.path().join("concerts.db")).unwrap();
        TestStore {
            store,
            _temp_dir: temp_dir,
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn concert(id: &str, title: &str, venue: &str, date: ConcertDate) -> Concert {
        Concert {
            id: ConcertId::from(id),
            title: title.to_string(),
            venue: venue.to_string(),
            date,
            description: format!("{} at {}", title, venue),
            created_by: UserId::from("admin"),
            created_at: Utc::now(),
        }
    }

    fn track(id: &str, concert_id: &str, title: &str, composer: &str, position: u32) -> Track {
        Track {
            id: TrackId::from(id),
            concert_id: ConcertId::from(concert_id),
            title: title.to_string(),
            composer: composer.to_string(),
            position,
        }
    }

    fn seed(store: &SqliteConcertStore) {
        store
            .insert_concert(&concert(
                "c1",
                "Spring Gala",
                "Seoul Arts Center",
                ConcertDate::single(day("2025-04-10")),
            ))
            .unwrap();
        store
            .insert_concert(&concert(
                "c2",
                "Winter Festival",
                "Lotte Concert Hall",
                ConcertDate::range(day("2025-12-01"), day("2025-12-03")).unwrap(),
            ))
            .unwrap();
        store
            .insert_tracks(&[
                track("t1", "c1", "Symphony No. 5", "Beethoven", 0),
                track("t2", "c1", "Clair de Lune", "Debussy", 1),
                track("t3", "c2", "The Nutcracker", "Tchaikovsky", 0),
            ])
            .unwrap();
    }

    #[test]
    fn concert_roundtrip_keeps_date_range() {
        let test = create_test_store();
        seed(&test.store);

        let loaded = test.store.get_concert(&ConcertId::from("c2")).unwrap().unwrap();
        assert_eq!(loaded.title, "Winter Festival");
        assert_eq!(loaded.date.start, day("2025-12-01"));
        assert_eq!(loaded.date.end, Some(day("2025-12-03")));
        assert!(test.store.get_concert(&ConcertId::from("nope")).unwrap().is_none());
    }

    #[test]
    fn list_orders_by_date() {
        let test = create_test_store();
        seed(&test.store);

        let asc = test.store.list_concerts(DateOrder::Ascending, None).unwrap();
        assert_eq!(asc[0].id.as_str(), "c1");
        let desc = test.store.list_concerts(DateOrder::Descending, Some(1)).unwrap();
        assert_eq!(desc.len(), 1);
        assert_eq!(desc[0].id.as_str(), "c2");
    }

    #[test]
    fn tracks_come_back_in_program_order() {
        let test = create_test_store();
        seed(&test.store);

        let tracks = test
            .store
            .get_tracks_for_concert(&ConcertId::from("c1"))
            .unwrap();
        let titles: Vec<_> = tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Symphony No. 5", "Clair de Lune"]);
        assert_eq!(
            test.store
                .count_tracks_for_concert(&ConcertId::from("c1"))
                .unwrap(),
            2
        );
    }

    #[test]
    fn failed_track_batch_stores_nothing() {
        let test = create_test_store();
        seed(&test.store);

        // Second row collides on (concert_id, position).
        let result = test.store.insert_tracks(&[
            track("t4", "c2", "Swan Lake", "Tchaikovsky", 1),
            track("t5", "c2", "Sleeping Beauty", "Tchaikovsky", 1),
        ]);
        assert!(result.is_err());
        assert_eq!(
            test.store
                .count_tracks_for_concert(&ConcertId::from("c2"))
                .unwrap(),
            1
        );
    }

    #[test]
    fn descriptions_replace_same_prompt_type() {
        let test = create_test_store();
        seed(&test.store);
        let t1 = TrackId::from("t1");

        test.store
            .insert_descriptions(&[
                TrackDescription::new(t1.clone(), "기본 설명", "first"),
                TrackDescription::new(t1.clone(), "음악적 특징", "features"),
            ])
            .unwrap();
        test.store
            .insert_descriptions(&[TrackDescription::new(t1.clone(), "기본 설명", "second")])
            .unwrap();

        let descriptions = test.store.get_descriptions_for_track(&t1).unwrap();
        assert_eq!(descriptions.len(), 2);
        let basic = descriptions
            .iter()
            .find(|d| d.prompt_type == "기본 설명")
            .unwrap();
        assert_eq!(basic.text, "second");
    }

    #[test]
    fn replacing_a_description_keeps_its_id() {
        let test = create_test_store();
        seed(&test.store);
        let t1 = TrackId::from("t1");
        let original = TrackDescription::new(t1.clone(), "기본 설명", "first");
        test.store.insert_descriptions(&[original.clone()]).unwrap();

        let replacement = TrackDescription::new(t1.clone(), "기본 설명", "second");
        assert_ne!(replacement.id, original.id);
        test.store.insert_descriptions(&[replacement]).unwrap();

        let stored = test.store.get_descriptions_for_track(&t1).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, original.id);
        assert_eq!(stored[0].text, "second");
        assert!(test.store.delete_description(&original.id).unwrap());
    }

    #[test]
    fn membership_queries_and_deletes() {
        let test = create_test_store();
        seed(&test.store);
        let ids = vec![TrackId::from("t1"), TrackId::from("t3")];
        test.store
            .insert_descriptions(&[
                TrackDescription::new(TrackId::from("t1"), "a", "x"),
                TrackDescription::new(TrackId::from("t2"), "a", "y"),
                TrackDescription::new(TrackId::from("t3"), "a", "z"),
            ])
            .unwrap();

        assert_eq!(test.store.count_descriptions_for_tracks(&ids).unwrap(), 2);
        assert_eq!(test.store.get_descriptions_for_tracks(&ids).unwrap().len(), 2);
        assert_eq!(test.store.delete_descriptions_for_tracks(&ids).unwrap(), 2);
        assert_eq!(
            test.store
                .count_descriptions_for_tracks(&[TrackId::from("t2")])
                .unwrap(),
            1
        );
        assert_eq!(test.store.count_descriptions_for_tracks(&[]).unwrap(), 0);
    }

    #[test]
    fn deleting_concert_cascades() {
        let test = create_test_store();
        seed(&test.store);
        test.store
            .insert_descriptions(&[TrackDescription::new(TrackId::from("t1"), "a", "x")])
            .unwrap();

        assert!(test.store.delete_concert(&ConcertId::from("c1")).unwrap());
        assert!(test.store.get_track(&TrackId::from("t1")).unwrap().is_none());
        assert_eq!(
            test.store
                .count_descriptions_for_tracks(&[TrackId::from("t1")])
                .unwrap(),
            0
        );
        assert!(!test.store.delete_concert(&ConcertId::from("c1")).unwrap());
    }

    #[test]
    fn search_matches_text_across_fields_and_composers() {
        let test = create_test_store();
        seed(&test.store);

        let by_venue = test
            .store
            .search_concerts(&ConcertQuery {
                text: Some("lotte".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_venue.len(), 1);
        assert_eq!(by_venue[0].id.as_str(), "c2");

        let by_composer = test
            .store
            .search_concerts(&ConcertQuery {
                text: Some("debussy".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_composer.len(), 1);
        assert_eq!(by_composer[0].id.as_str(), "c1");

        let wildcard = test
            .store
            .search_concerts(&ConcertQuery {
                text: Some("%".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(wildcard.is_empty());
    }

    #[test]
    fn search_date_window_overlaps_ranges() {
        let test = create_test_store();
        seed(&test.store);

        let found = test
            .store
            .search_concerts(&ConcertQuery {
                from: Some(day("2025-12-02")),
                to: Some(day("2025-12-31")),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "c2");

        let combined = test
            .store
            .search_concerts(&ConcertQuery {
                composer: Some("Beethoven".to_string()),
                venue: Some("Lotte".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(combined.is_empty());
    }

    #[test]
    fn templates_replace_whole_set_in_order() {
        let test = create_test_store();
        assert!(test.store.list_templates().unwrap().is_empty());

        let templates = vec![
            PromptTemplate {
                name: "b".to_string(),
                body: "B {track_title}".to_string(),
                system_instruction: String::new(),
            },
            PromptTemplate {
                name: "a".to_string(),
                body: "A {composer}".to_string(),
                system_instruction: "sys".to_string(),
            },
        ];
        test.store.replace_templates(&templates).unwrap();
        assert_eq!(test.store.list_templates().unwrap(), templates);

        test.store.replace_templates(&templates[1..]).unwrap();
        let names: Vec<_> = test
            .store
            .list_templates()
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn reopening_existing_database_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("concerts.db");
        {
            let store = SqliteConcertStore::new(&path).unwrap();
            seed(&store);
        }
        let store = SqliteConcertStore::new(&path).unwrap();
        assert_eq!(store.list_concerts(DateOrder::Ascending, None).unwrap().len(), 2);
    }
}
