use crate::model::{AggregateRecord, ClassificationRow, MovieMetadata, MovieRecord, NodeKind};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Result, Row, params};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

/// Bookkeeping row for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub status: RunStatus,
    /// JSON summary on success, the error message on failure.
    pub summary: Option<String>,
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// INTEGER columns are signed; anything past `i64::MAX` is clamped.
fn to_integer(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_integer(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

impl Database {
    pub fn drop(path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            -- Written by the file indexer
            CREATE TABLE IF NOT EXISTS filepaths (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filepath TEXT NOT NULL UNIQUE,
    filename TEXT,
    filetitle TEXT
);

CREATE TABLE IF NOT EXISTS filesteps (
    filepath_id INTEGER NOT NULL,
    parent TEXT NOT NULL,
    child TEXT NOT NULL,
    UNIQUE(filepath_id, parent, child)
);

-- Written by the metadata fetcher
CREATE TABLE IF NOT EXISTS filemetadata (
    file_id INTEGER PRIMARY KEY,
    title TEXT,
    year TEXT,
    rated TEXT,
    released TEXT,
    runtime TEXT,
    genre TEXT,
    director TEXT,
    writer TEXT,
    actors TEXT,
    plot TEXT,
    language TEXT,
    country TEXT,
    awards TEXT,
    poster TEXT,
    imdbRating TEXT,
    imdbVotes TEXT,
    rottenTomatoes TEXT,
    boxOffice TEXT,
    imdbID TEXT,
    type TEXT,
    FOREIGN KEY(file_id) REFERENCES filepaths(id) ON DELETE CASCADE
);

-- Genre vocabulary, only ever extended
CREATE TABLE IF NOT EXISTS genre (
    name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS classifications (
    folder TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK(kind IN ('movie', 'franchise', 'genre')),
    class TEXT NOT NULL,
    level TEXT NOT NULL,
    genre TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS movieassemble (
    id INTEGER PRIMARY KEY,                -- filepaths.id
    path TEXT NOT NULL,
    folder TEXT NOT NULL,
    imdbID TEXT,
    title TEXT,
    year INTEGER,
    level TEXT,
    class TEXT,
    type TEXT,
    franchise TEXT,
    genres TEXT,
    rated TEXT,
    released TEXT,
    runtime INTEGER,
    director TEXT,
    writers TEXT,
    actors TEXT,
    plot TEXT,
    languages TEXT,
    countries TEXT,
    awards TEXT,
    poster TEXT,
    imdbRating REAL,
    imdbVotes INTEGER,
    rottenTomatoes REAL,
    boxOffice INTEGER
);

CREATE TABLE IF NOT EXISTS franchiseassemble (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT,
    folder TEXT NOT NULL UNIQUE,
    title TEXT,
    year INTEGER,
    level TEXT,
    class TEXT,
    type TEXT,
    genres TEXT,
    rated TEXT,
    released TEXT,
    runtime INTEGER,
    director TEXT,
    writers TEXT,
    actors TEXT,
    plot TEXT,
    languages TEXT,
    countries TEXT,
    awards TEXT,
    poster TEXT,
    imdbRating REAL,
    imdbVotes INTEGER,
    rottenTomatoes REAL,
    boxOffice INTEGER,
    movie_count INTEGER NOT NULL DEFAULT 0,
    missing TEXT NOT NULL DEFAULT '[]',    -- JSON array of movie folders
    exclusions TEXT NOT NULL DEFAULT '[]'  -- JSON array of exclusions
);

CREATE TABLE IF NOT EXISTS runs (
    id TEXT PRIMARY KEY,
    started_at INTEGER NOT NULL,
    finished_at INTEGER,
    status TEXT NOT NULL CHECK(status IN ('running', 'completed', 'failed')),
    summary TEXT
);

CREATE INDEX IF NOT EXISTS idx_filesteps_parent ON filesteps(parent);
CREATE INDEX IF NOT EXISTS idx_classifications_kind ON classifications(kind);
            ",
        )?;
        Ok(())
    }

    // Indexer and fetcher side
    pub fn insert_file_path(&self, filepath: &str, filename: &str, filetitle: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO filepaths (filepath, filename, filetitle) VALUES (?1, ?2, ?3)",
            params![filepath, filename, filetitle],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_step(&self, filepath_id: i64, parent: &str, child: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO filesteps (filepath_id, parent, child) VALUES (?1, ?2, ?3)",
            params![filepath_id, parent, child],
        )?;
        Ok(())
    }

    pub fn insert_metadata(&self, metadata: &MovieMetadata) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO filemetadata (
                file_id, title, year, rated, released, runtime, genre, director, writer,
                actors, plot, language, country, awards, poster, imdbRating, imdbVotes,
                rottenTomatoes, boxOffice, imdbID, type
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
            params![
                metadata.file_id,
                &metadata.title,
                &metadata.year,
                &metadata.rated,
                &metadata.released,
                &metadata.runtime,
                &metadata.genre,
                &metadata.director,
                &metadata.writer,
                &metadata.actors,
                &metadata.plot,
                &metadata.language,
                &metadata.country,
                &metadata.awards,
                &metadata.poster,
                &metadata.imdb_rating,
                &metadata.imdb_votes,
                &metadata.rotten_tomatoes,
                &metadata.box_office,
                &metadata.imdb_id,
                &metadata.media_type,
            ],
        )?;
        Ok(())
    }

    // Pipeline inputs
    /// Edge rows in insertion order, which fixes first-seen child order.
    pub fn load_edges(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT parent, child FROM filesteps ORDER BY rowid")?;
        let edges = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>>>()?;
        Ok(edges)
    }

    pub fn load_metadata(&self) -> Result<Vec<MovieMetadata>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.filepath, m.title, m.year, m.rated, m.released, m.runtime, m.genre,
                    m.director, m.writer, m.actors, m.plot, m.language, m.country, m.awards,
                    m.poster, m.imdbRating, m.imdbVotes, m.rottenTomatoes, m.boxOffice,
                    m.imdbID, m.type
             FROM filemetadata m
             JOIN filepaths p ON p.id = m.file_id
             ORDER BY p.id",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(MovieMetadata {
                    file_id: row.get(0)?,
                    file_path: row.get(1)?,
                    title: row.get(2)?,
                    year: row.get(3)?,
                    rated: row.get(4)?,
                    released: row.get(5)?,
                    runtime: row.get(6)?,
                    genre: row.get(7)?,
                    director: row.get(8)?,
                    writer: row.get(9)?,
                    actors: row.get(10)?,
                    plot: row.get(11)?,
                    language: row.get(12)?,
                    country: row.get(13)?,
                    awards: row.get(14)?,
                    poster: row.get(15)?,
                    imdb_rating: row.get(16)?,
                    imdb_votes: row.get(17)?,
                    rotten_tomatoes: row.get(18)?,
                    box_office: row.get(19)?,
                    imdb_id: row.get(20)?,
                    media_type: row.get(21)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn load_genres(&self) -> Result<BTreeSet<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM genre")?;
        let genres = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<BTreeSet<String>>>()?;
        Ok(genres)
    }

    // Run management
    pub fn create_run(&self) -> Result<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO runs (id, started_at, status) VALUES (?1, ?2, ?3)",
            params![&run_id, current_timestamp(), RunStatus::Running.as_str()],
        )?;
        Ok(run_id)
    }

    pub fn complete_run(&self, run_id: &str, summary: &str) -> Result<()> {
        self.finish_run(run_id, RunStatus::Completed, summary)
    }

    pub fn fail_run(&self, run_id: &str, message: &str) -> Result<()> {
        self.finish_run(run_id, RunStatus::Failed, message)
    }

    fn finish_run(&self, run_id: &str, status: RunStatus, summary: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, summary = ?3 WHERE id = ?4",
            params![status.as_str(), current_timestamp(), summary, run_id],
        )?;
        Ok(())
    }

    pub fn latest_run(&self) -> Result<Option<RunRecord>> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, status, summary
                 FROM runs ORDER BY started_at DESC, rowid DESC LIMIT 1",
                [],
                |row| {
                    let status: String = row.get(3)?;
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        status: RunStatus::from_str(&status).unwrap_or(RunStatus::Failed),
                        summary: row.get(4)?,
                    })
                },
            )
            .optional()
    }

    // Pipeline outputs
    /// Replaces every classification, movie and franchise row and extends
    /// the genre vocabulary, all in one transaction.
    pub fn save_results(
        &self,
        classifications: &[ClassificationRow],
        movies: &[MovieRecord],
        franchises: &[AggregateRecord],
        new_genres: &BTreeSet<String>,
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute("DELETE FROM classifications", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO classifications (folder, kind, class, level, genre)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in classifications {
                stmt.execute(params![
                    &row.folder,
                    row.kind.as_str(),
                    row.kind.class_label(),
                    row.kind.level_label(),
                    &row.genre,
                ])?;
            }
        }

        tx.execute("DELETE FROM movieassemble", [])?;
        {
            let kind = NodeKind::Movie;
            let mut stmt = tx.prepare(
                "INSERT INTO movieassemble (
                    id, path, folder, imdbID, title, year, level, class, type, franchise, genres,
                    rated, released, runtime, director, writers, actors, plot, languages,
                    countries, awards, poster, imdbRating, imdbVotes, rottenTomatoes, boxOffice
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                          ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)",
            )?;
            for movie in movies {
                stmt.execute(params![
                    movie.file_id,
                    &movie.path,
                    &movie.folder,
                    &movie.imdb_id,
                    &movie.title,
                    movie.year,
                    kind.level_label(),
                    kind.class_label(),
                    kind.as_str(),
                    &movie.franchise,
                    &movie.genres,
                    &movie.rated,
                    &movie.released,
                    movie.runtime,
                    &movie.directors,
                    &movie.writers,
                    &movie.cast,
                    &movie.plot,
                    &movie.languages,
                    &movie.countries,
                    &movie.awards,
                    &movie.poster,
                    movie.imdb_rating,
                    movie.imdb_votes.map(to_integer),
                    movie.rotten_tomatoes,
                    movie.box_office.map(to_integer),
                ])?;
            }
        }

        tx.execute("DELETE FROM franchiseassemble", [])?;
        {
            let kind = NodeKind::Franchise;
            let mut stmt = tx.prepare(
                "INSERT INTO franchiseassemble (
                    path, folder, title, year, level, class, type, genres, rated, released,
                    runtime, director, writers, actors, plot, languages, countries, awards, poster,
                    imdbRating, imdbVotes, rottenTomatoes, boxOffice, movie_count, missing, exclusions
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                          ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)",
            )?;
            for record in franchises {
                stmt.execute(params![
                    &record.path,
                    &record.folder,
                    &record.folder,
                    record.year,
                    kind.level_label(),
                    kind.class_label(),
                    kind.as_str(),
                    &record.genres,
                    &record.rated,
                    &record.released,
                    record.runtime,
                    &record.directors,
                    &record.writers,
                    &record.cast,
                    &record.plot,
                    &record.languages,
                    &record.countries,
                    &record.awards,
                    &record.poster,
                    record.imdb_rating,
                    to_integer(record.imdb_votes),
                    record.rotten_tomatoes,
                    to_integer(record.box_office),
                    i64::try_from(record.movie_count).unwrap_or(i64::MAX),
                    to_json(&record.missing_metadata)?,
                    to_json(&record.exclusions)?,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO genre (name) VALUES (?1)")?;
            for name in new_genres {
                stmt.execute(params![name])?;
            }
        }

        tx.commit()
    }

    pub fn get_classifications(&self) -> Result<Vec<ClassificationRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT folder, kind, genre FROM classifications ORDER BY folder")?;
        let rows = stmt
            .query_map([], |row| {
                let kind: String = row.get(1)?;
                let kind = NodeKind::from_str(&kind).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        Type::Text,
                        format!("unknown kind {kind}").into(),
                    )
                })?;
                Ok(ClassificationRow {
                    folder: row.get(0)?,
                    kind,
                    genre: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_franchises(&self) -> Result<Vec<AggregateRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT folder, path, genres, year, rated, released, runtime, director, writers,
                    actors, languages, countries, plot, awards, poster, imdbRating, imdbVotes,
                    rottenTomatoes, boxOffice, movie_count, missing, exclusions
             FROM franchiseassemble ORDER BY folder",
        )?;
        let records = stmt
            .query_map([], |row| {
                let votes: i64 = row.get(16)?;
                let box_office: i64 = row.get(18)?;
                let movie_count: i64 = row.get(19)?;
                Ok(AggregateRecord {
                    folder: row.get(0)?,
                    path: row.get(1)?,
                    genres: row.get(2)?,
                    year: row.get(3)?,
                    rated: row.get(4)?,
                    released: row.get(5)?,
                    runtime: row.get(6)?,
                    directors: row.get(7)?,
                    writers: row.get(8)?,
                    cast: row.get(9)?,
                    languages: row.get(10)?,
                    countries: row.get(11)?,
                    plot: row.get(12)?,
                    awards: row.get(13)?,
                    poster: row.get(14)?,
                    imdb_rating: row.get(15)?,
                    imdb_votes: from_integer(votes),
                    rotten_tomatoes: row.get(17)?,
                    box_office: from_integer(box_office),
                    movie_count: usize::try_from(movie_count).unwrap_or(0),
                    missing_metadata: json_column(row, 20)?,
                    exclusions: json_column(row, 21)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn get_movies(&self) -> Result<Vec<MovieRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, path, folder, imdbID, title, year, franchise, genres, rated, released,
                    runtime, director, writers, actors, plot, languages, countries, awards,
                    poster, imdbRating, imdbVotes, rottenTomatoes, boxOffice
             FROM movieassemble ORDER BY folder, id",
        )?;
        let records = stmt
            .query_map([], |row| {
                let votes: Option<i64> = row.get(20)?;
                let box_office: Option<i64> = row.get(22)?;
                Ok(MovieRecord {
                    file_id: row.get(0)?,
                    path: row.get(1)?,
                    folder: row.get(2)?,
                    imdb_id: row.get(3)?,
                    title: row.get(4)?,
                    year: row.get(5)?,
                    franchise: row.get(6)?,
                    genres: row.get(7)?,
                    rated: row.get(8)?,
                    released: row.get(9)?,
                    runtime: row.get(10)?,
                    directors: row.get(11)?,
                    writers: row.get(12)?,
                    cast: row.get(13)?,
                    plot: row.get(14)?,
                    languages: row.get(15)?,
                    countries: row.get(16)?,
                    awards: row.get(17)?,
                    poster: row.get(18)?,
                    imdb_rating: row.get(19)?,
                    imdb_votes: votes.map(from_integer),
                    rotten_tomatoes: row.get(21)?,
                    box_office: box_office.map(from_integer),
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}
