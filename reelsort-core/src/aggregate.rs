//! Franchise aggregation.
//!
//! The descendant movies of every franchise are gathered once into a
//! [`FranchiseIndex`]; each field of an [`AggregateRecord`] is then a pure
//! function over that list. Placeholder and unparsable values never
//! contribute: sums skip them, means divide by the contributing count only,
//! and every parse failure is recorded as an [`Exclusion`].

use crate::classify::Classification;
use crate::config::Config;
use crate::graph::PathGraph;
use crate::model::{
    AggregateField, AggregateRecord, Exclusion, MovieMetadata, MovieRecord, NodeKind,
    path_segments, split_list,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Largest total an INTEGER column can hold.
pub const STORABLE_MAX: u64 = i64::MAX as u64;

/// Metadata rows keyed by the release folder their file lives in.
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    records: Vec<MovieMetadata>,
    by_folder: HashMap<String, usize>,
}

impl MetadataIndex {
    /// When two files share a release folder the first row wins.
    pub fn new(records: Vec<MovieMetadata>) -> Self {
        let mut by_folder = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            match record.release_folder() {
                Some(folder) => {
                    by_folder.entry(folder.to_string()).or_insert(idx);
                }
                None => warn!(
                    "Metadata for file #{} has no release folder in {}",
                    record.file_id, record.file_path
                ),
            }
        }
        Self { records, by_folder }
    }

    pub fn get(&self, folder: &str) -> Option<&MovieMetadata> {
        self.by_folder.get(folder).map(|idx| &self.records[*idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MovieMetadata> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Descendant movies of one franchise.
#[derive(Debug, Clone, Default)]
pub struct FranchiseMembers<'a> {
    pub movies: Vec<&'a MovieMetadata>,
    /// Movie nodes with no metadata row.
    pub missing: Vec<String>,
}

impl FranchiseMembers<'_> {
    pub fn movie_count(&self) -> usize {
        self.movies.len() + self.missing.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FranchiseIndex<'a> {
    members: BTreeMap<String, FranchiseMembers<'a>>,
}

impl<'a> FranchiseIndex<'a> {
    pub fn build(
        graph: &PathGraph,
        classification: &Classification,
        metadata: &'a MetadataIndex,
    ) -> Self {
        let mut members = BTreeMap::new();

        for franchise in classification.of_kind(NodeKind::Franchise) {
            let mut entry = FranchiseMembers::default();
            for node in graph.descendants(franchise) {
                if !classification.is_kind(node, NodeKind::Movie) {
                    continue;
                }
                match metadata.get(node) {
                    Some(record) => entry.movies.push(record),
                    None => {
                        debug!("No metadata for {} under {}", node, franchise);
                        entry.missing.push(node.to_string());
                    }
                }
            }
            members.insert(franchise.to_string(), entry);
        }

        Self { members }
    }

    /// Owning franchise of every movie with metadata. A movie reachable from
    /// two franchises belongs to the first in name order.
    pub fn owners(&self) -> HashMap<&'a str, &str> {
        let mut owners = HashMap::new();
        for (franchise, members) in &self.members {
            for movie in members.movies.iter().copied() {
                if let Some(folder) = movie.release_folder() {
                    owners.entry(folder).or_insert(franchise.as_str());
                }
            }
        }
        owners
    }

    pub fn get(&self, franchise: &str) -> Option<&FranchiseMembers<'a>> {
        self.members.get(franchise)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FranchiseMembers<'a>)> {
        self.members.iter().map(|(name, m)| (name.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Plot and awards text of every descendant, input for augmentation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PooledText {
    pub plots: Vec<String>,
    pub awards: Vec<String>,
}

pub fn parse_year(value: &str) -> Option<i32> {
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    digits[..4].parse().ok()
}

/// Numeric prefix of a runtime such as `"142 min"`.
pub fn parse_runtime(value: &str) -> Option<u32> {
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Whole number with thousands separators, e.g. `"1,234"`.
pub fn parse_count(value: &str) -> Option<u64> {
    value.replace(',', "").trim().parse().ok()
}

/// Currency amount such as `"$1,234,567"`. Cents are rounded away.
pub fn parse_currency(value: &str) -> Option<u64> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    if let Ok(whole) = cleaned.parse::<u64>() {
        return Some(whole);
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u64)
}

/// Score such as `"7.8"`, `"87%"` or `"7.8/10"`.
pub fn parse_score(value: &str) -> Option<f64> {
    let head = value.split('/').next().unwrap_or(value);
    head.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

pub fn parse_date(value: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), format).ok()
}

fn storable_add(total: u64, value: u64) -> Option<u64> {
    total.checked_add(value).filter(|sum| *sum <= STORABLE_MAX)
}

/// Directory two levels above a file path: the file name and its release
/// folder are dropped. Only the first movie is sampled; siblings are assumed
/// to share the same parent directory.
pub fn franchise_path(movies: &[&MovieMetadata]) -> Option<String> {
    let sample = movies.first()?;
    let separator = if sample.file_path.contains('/') { "/" } else { "\\" };
    let segments = path_segments(&sample.file_path);
    if segments.len() < 3 {
        return None;
    }
    let kept = &segments[..segments.len() - 2];
    let path = kept.join(separator);
    if path.is_empty() { None } else { Some(path) }
}

pub struct Aggregator {
    rating_order: Vec<String>,
    date_format: String,
    delimiter: String,
    placeholder: String,
}

impl Aggregator {
    pub fn new(config: &Config) -> Self {
        Self {
            rating_order: config.rating_order.clone(),
            date_format: config.release_date_format.clone(),
            delimiter: config.list_delimiter.clone(),
            placeholder: config.placeholder.clone(),
        }
    }

    fn present<'m>(&self, value: Option<&'m str>) -> Option<&'m str> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != self.placeholder)
    }

    /// Parses one field of every movie. Missing values are skipped quietly;
    /// values that are present but fail to parse are logged as exclusions.
    /// Each result keeps the index of the movie it came from.
    fn parse_each<'m, T>(
        &self,
        movies: &[&'m MovieMetadata],
        field: AggregateField,
        get: impl Fn(&'m MovieMetadata) -> Option<&'m str>,
        parse: impl Fn(&str) -> Option<T>,
        exclusions: &mut Vec<Exclusion>,
    ) -> Vec<(usize, T)> {
        let mut values = Vec::new();
        for (idx, movie) in movies.iter().enumerate() {
            let Some(raw) = self.present(get(*movie)) else {
                continue;
            };
            match parse(raw) {
                Some(value) => values.push((idx, value)),
                None => {
                    debug!("Excluding {} {:?} of {}", field.as_str(), raw, movie.label());
                    exclusions.push(Exclusion {
                        movie: movie.label(),
                        field,
                        value: raw.to_string(),
                    });
                }
            }
        }
        values
    }

    /// Sums one field with `add`. A value that would push the total past
    /// what `add` accepts is left out and recorded like a parse failure.
    fn checked_total<'m, T: Copy + Default>(
        &self,
        movies: &[&'m MovieMetadata],
        field: AggregateField,
        get: impl Fn(&'m MovieMetadata) -> Option<&'m str>,
        parse: impl Fn(&str) -> Option<T>,
        add: impl Fn(T, T) -> Option<T>,
        exclusions: &mut Vec<Exclusion>,
    ) -> T {
        let mut total = T::default();
        for (idx, value) in self.parse_each(movies, field, &get, parse, exclusions) {
            match add(total, value) {
                Some(sum) => total = sum,
                None => {
                    let movie = movies[idx];
                    warn!("{} of {} overflows the total", field.as_str(), movie.label());
                    exclusions.push(Exclusion {
                        movie: movie.label(),
                        field,
                        value: self.present(get(movie)).unwrap_or_default().to_string(),
                    });
                }
            }
        }
        total
    }

    fn rank(&self, rating: &str) -> Option<usize> {
        self.rating_order
            .iter()
            .position(|known| known.eq_ignore_ascii_case(rating))
    }

    pub fn earliest_year(
        &self,
        movies: &[&MovieMetadata],
        exclusions: &mut Vec<Exclusion>,
    ) -> Option<i32> {
        self.parse_each(
            movies,
            AggregateField::Year,
            |m| m.year.as_deref(),
            parse_year,
            exclusions,
        )
        .into_iter()
        .map(|(_, year)| year)
        .min()
    }

    /// Most restrictive rating. Ratings outside the configured order rank
    /// below every known rating; ties keep the first one seen.
    pub fn highest_rating(&self, movies: &[&MovieMetadata]) -> Option<String> {
        let mut best: Option<(Option<usize>, &str)> = None;
        for movie in movies {
            let Some(rating) = self.present(movie.rated.as_deref()) else {
                continue;
            };
            let rank = self.rank(rating);
            let better = match best {
                None => true,
                Some((best_rank, _)) => rank > best_rank,
            };
            if better {
                best = Some((rank, rating));
            }
        }
        best.map(|(_, rating)| rating.to_string())
    }

    pub fn earliest_release(
        &self,
        movies: &[&MovieMetadata],
        exclusions: &mut Vec<Exclusion>,
    ) -> Option<String> {
        let dates = self.parse_each(
            movies,
            AggregateField::Released,
            |m| m.released.as_deref(),
            |v| parse_date(v, &self.date_format),
            exclusions,
        );
        let mut earliest: Option<(usize, NaiveDate)> = None;
        for (idx, date) in dates {
            if earliest.is_none_or(|(_, best)| date < best) {
                earliest = Some((idx, date));
            }
        }
        earliest.and_then(|(idx, _)| self.present(movies[idx].released.as_deref()).map(String::from))
    }

    pub fn total_runtime(&self, movies: &[&MovieMetadata], exclusions: &mut Vec<Exclusion>) -> u32 {
        self.checked_total(
            movies,
            AggregateField::Runtime,
            |m| m.runtime.as_deref(),
            parse_runtime,
            u32::checked_add,
            exclusions,
        )
    }

    /// Sorted, de-duplicated union of a delimited field.
    pub fn union<'m>(
        &self,
        movies: &[&'m MovieMetadata],
        get: impl Fn(&'m MovieMetadata) -> Option<&'m str>,
    ) -> String {
        let mut names: BTreeSet<&str> = BTreeSet::new();
        for movie in movies {
            if let Some(value) = get(*movie) {
                names.extend(split_list(value, &self.delimiter, &self.placeholder));
            }
        }
        names.into_iter().collect::<Vec<_>>().join(", ")
    }

    fn mean(values: Vec<(usize, f64)>) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let count = values.len() as f64;
        Some(values.into_iter().map(|(_, v)| v).sum::<f64>() / count)
    }

    pub fn mean_rating(
        &self,
        movies: &[&MovieMetadata],
        exclusions: &mut Vec<Exclusion>,
    ) -> Option<f64> {
        Self::mean(self.parse_each(
            movies,
            AggregateField::Rating,
            |m| m.imdb_rating.as_deref(),
            parse_score,
            exclusions,
        ))
    }

    pub fn mean_critic_score(
        &self,
        movies: &[&MovieMetadata],
        exclusions: &mut Vec<Exclusion>,
    ) -> Option<f64> {
        Self::mean(self.parse_each(
            movies,
            AggregateField::CriticScore,
            |m| m.rotten_tomatoes.as_deref(),
            parse_score,
            exclusions,
        ))
    }

    pub fn total_votes(&self, movies: &[&MovieMetadata], exclusions: &mut Vec<Exclusion>) -> u64 {
        self.checked_total(
            movies,
            AggregateField::Votes,
            |m| m.imdb_votes.as_deref(),
            parse_count,
            storable_add,
            exclusions,
        )
    }

    pub fn total_box_office(
        &self,
        movies: &[&MovieMetadata],
        exclusions: &mut Vec<Exclusion>,
    ) -> u64 {
        self.checked_total(
            movies,
            AggregateField::BoxOffice,
            |m| m.box_office.as_deref(),
            parse_currency,
            storable_add,
            exclusions,
        )
    }

    /// Poster of the movie with the latest release date; ties keep the
    /// first one seen.
    pub fn latest_poster(&self, movies: &[&MovieMetadata]) -> Option<String> {
        let mut latest: Option<(NaiveDate, &str)> = None;
        for movie in movies {
            let Some(poster) = self.present(movie.poster.as_deref()) else {
                continue;
            };
            let Some(date) = self
                .present(movie.released.as_deref())
                .and_then(|v| parse_date(v, &self.date_format))
            else {
                continue;
            };
            if latest.is_none_or(|(best, _)| date > best) {
                latest = Some((date, poster));
            }
        }
        latest.map(|(_, poster)| poster.to_string())
    }

    pub fn pooled_text(&self, movies: &[&MovieMetadata]) -> PooledText {
        let collect = |get: fn(&MovieMetadata) -> Option<&str>| -> Vec<String> {
            movies
                .iter()
                .filter_map(|m| self.present(get(m)))
                .map(String::from)
                .collect()
        };
        PooledText {
            plots: collect(|m| m.plot.as_deref()),
            awards: collect(|m| m.awards.as_deref()),
        }
    }

    /// Computes every aggregate field of one franchise. Genres and the
    /// augmented text are filled in by the caller.
    pub fn aggregate(&self, folder: &str, members: &FranchiseMembers<'_>) -> AggregateRecord {
        let movies = members.movies.as_slice();
        if movies.is_empty() {
            warn!(
                "Franchise {} has no movie metadata; aggregate falls back to defaults",
                folder
            );
        }

        let mut exclusions = Vec::new();
        AggregateRecord {
            folder: folder.to_string(),
            path: franchise_path(movies),
            genres: String::new(),
            year: self.earliest_year(movies, &mut exclusions),
            rated: self.highest_rating(movies),
            released: self.earliest_release(movies, &mut exclusions),
            runtime: self.total_runtime(movies, &mut exclusions),
            directors: self.union(movies, |m| m.director.as_deref()),
            writers: self.union(movies, |m| m.writer.as_deref()),
            cast: self.union(movies, |m| m.actors.as_deref()),
            languages: self.union(movies, |m| m.language.as_deref()),
            countries: self.union(movies, |m| m.country.as_deref()),
            plot: None,
            awards: None,
            poster: self.latest_poster(movies),
            imdb_rating: self.mean_rating(movies, &mut exclusions),
            imdb_votes: self.total_votes(movies, &mut exclusions),
            rotten_tomatoes: self.mean_critic_score(movies, &mut exclusions),
            box_office: self.total_box_office(movies, &mut exclusions),
            movie_count: members.movie_count(),
            missing_metadata: members.missing.clone(),
            exclusions,
        }
    }

    /// Per-movie row: the movie's own metadata in parsed form, with its
    /// resolved genres and owning franchise. Values that do not parse or do
    /// not fit a column are left empty.
    pub fn movie_record(
        &self,
        folder: &str,
        metadata: &MovieMetadata,
        franchise: Option<&str>,
        genres: String,
    ) -> MovieRecord {
        let movies = std::slice::from_ref(&metadata);
        let text = |value: &Option<String>| self.present(value.as_deref()).map(String::from);
        let storable = |value: Option<u64>| value.filter(|v| *v <= STORABLE_MAX);

        MovieRecord {
            file_id: metadata.file_id,
            path: metadata.file_path.clone(),
            folder: folder.to_string(),
            imdb_id: text(&metadata.imdb_id),
            title: text(&metadata.title),
            year: self.present(metadata.year.as_deref()).and_then(parse_year),
            franchise: franchise.map(String::from),
            genres,
            rated: text(&metadata.rated),
            released: text(&metadata.released),
            runtime: self.present(metadata.runtime.as_deref()).and_then(parse_runtime),
            directors: self.union(movies, |m| m.director.as_deref()),
            writers: self.union(movies, |m| m.writer.as_deref()),
            cast: self.union(movies, |m| m.actors.as_deref()),
            plot: text(&metadata.plot),
            languages: self.union(movies, |m| m.language.as_deref()),
            countries: self.union(movies, |m| m.country.as_deref()),
            awards: text(&metadata.awards),
            poster: text(&metadata.poster),
            imdb_rating: self.present(metadata.imdb_rating.as_deref()).and_then(parse_score),
            imdb_votes: storable(self.present(metadata.imdb_votes.as_deref()).and_then(parse_count)),
            rotten_tomatoes: self
                .present(metadata.rotten_tomatoes.as_deref())
                .and_then(parse_score),
            box_office: storable(
                self.present(metadata.box_office.as_deref())
                    .and_then(parse_currency),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_helpers_handle_provider_formats() {
        assert_eq!(parse_year("2008–2012"), Some(2008));
        assert_eq!(parse_year("08"), None);
        assert_eq!(parse_runtime("142 min"), Some(142));
        assert_eq!(parse_runtime("N/A"), None);
        assert_eq!(parse_count("1,234"), Some(1234));
        assert_eq!(parse_currency("$1,234,567"), Some(1_234_567));
        assert_eq!(parse_score("87%"), Some(87.0));
        assert_eq!(parse_score("7.5/10"), Some(7.5));
    }
}
