use serde::{Deserialize, Serialize};
use std::fmt;

/// What a folder in the media hierarchy represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Movie,
    Franchise,
    Genre,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Movie => "movie",
            NodeKind::Franchise => "franchise",
            NodeKind::Genre => "genre",
        }
    }

    pub fn class_label(&self) -> &'static str {
        match self {
            NodeKind::Movie => "Film",
            NodeKind::Franchise => "Franchise",
            NodeKind::Genre => "Category",
        }
    }

    pub fn level_label(&self) -> &'static str {
        match self {
            NodeKind::Movie => "Release",
            NodeKind::Franchise => "Playlist",
            NodeKind::Genre => "Shelf",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "movie" => Some(NodeKind::Movie),
            "franchise" => Some(NodeKind::Franchise),
            "genre" => Some(NodeKind::Genre),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-movie record supplied by the metadata fetcher. Read-only here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieMetadata {
    pub file_id: i64,
    pub file_path: String,
    pub title: Option<String>,
    pub year: Option<String>,
    pub rated: Option<String>,
    pub released: Option<String>,
    pub runtime: Option<String>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub writer: Option<String>,
    pub actors: Option<String>,
    pub plot: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub awards: Option<String>,
    pub poster: Option<String>,
    pub imdb_rating: Option<String>,
    pub imdb_votes: Option<String>,
    pub rotten_tomatoes: Option<String>,
    pub box_office: Option<String>,
    pub imdb_id: Option<String>,
    pub media_type: Option<String>,
}

impl MovieMetadata {
    /// Name of the folder holding the file, which is the movie's node name.
    pub fn release_folder(&self) -> Option<&str> {
        let segments = path_segments(&self.file_path);
        if segments.len() < 2 {
            return None;
        }
        Some(segments[segments.len() - 2]).filter(|s| !s.is_empty())
    }

    /// Human-readable identifier used in logs and exclusion records.
    pub fn label(&self) -> String {
        self.release_folder()
            .map(String::from)
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| format!("file #{}", self.file_id))
    }
}

/// Splits a stored file path on either separator, keeping empty segments so
/// that absolute paths can be rejoined faithfully.
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).collect()
}

/// Splits a delimited metadata field, trimming entries and dropping blanks
/// and the provider placeholder.
pub fn split_list<'a>(value: &'a str, delimiter: &str, placeholder: &str) -> Vec<&'a str> {
    value
        .split(delimiter)
        .map(str::trim)
        .filter(|item| !item.is_empty() && *item != placeholder)
        .collect()
}

/// Aggregated fields that can drop individual movies on bad input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateField {
    Year,
    Released,
    Runtime,
    Rating,
    Votes,
    CriticScore,
    BoxOffice,
}

impl AggregateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateField::Year => "year",
            AggregateField::Released => "released",
            AggregateField::Runtime => "runtime",
            AggregateField::Rating => "imdb_rating",
            AggregateField::Votes => "imdb_votes",
            AggregateField::CriticScore => "rotten_tomatoes",
            AggregateField::BoxOffice => "box_office",
        }
    }
}

/// A value left out of one aggregate because it did not parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub movie: String,
    pub field: AggregateField,
    pub value: String,
}

/// One row of the classification table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRow {
    pub folder: String,
    pub kind: NodeKind,
    pub genre: String,
}

/// Per-movie summary: metadata joined with its classification, resolved
/// genres and owning franchise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub file_id: i64,
    pub path: String,
    pub folder: String,
    pub imdb_id: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub franchise: Option<String>,
    pub genres: String,
    pub rated: Option<String>,
    pub released: Option<String>,
    pub runtime: Option<u32>,
    pub directors: String,
    pub writers: String,
    pub cast: String,
    pub plot: Option<String>,
    pub languages: String,
    pub countries: String,
    pub awards: Option<String>,
    pub poster: Option<String>,
    pub imdb_rating: Option<f64>,
    pub imdb_votes: Option<u64>,
    pub rotten_tomatoes: Option<f64>,
    pub box_office: Option<u64>,
}

/// Franchise-level summary derived from every descendant movie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub folder: String,
    pub path: Option<String>,
    pub genres: String,
    pub year: Option<i32>,
    pub rated: Option<String>,
    pub released: Option<String>,
    pub runtime: u32,
    pub directors: String,
    pub writers: String,
    pub cast: String,
    pub languages: String,
    pub countries: String,
    pub plot: Option<String>,
    pub awards: Option<String>,
    pub poster: Option<String>,
    pub imdb_rating: Option<f64>,
    pub imdb_votes: u64,
    pub rotten_tomatoes: Option<f64>,
    pub box_office: u64,
    pub movie_count: usize,
    pub missing_metadata: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Exclusion>,
}
