//! Genre vocabulary: built from metadata genre lists, from category folders
//! found during classification, and from the names of a movie's ancestor
//! folders.

use crate::aggregate::MetadataIndex;
use crate::classify::{Classification, ExcludedNames, is_movie};
use crate::config::Config;
use crate::graph::PathGraph;
use crate::model::{MovieMetadata, NodeKind, split_list};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// Python-style title casing: a letter is upper-cased when it follows a
/// non-letter, lower-cased otherwise. `sci-fi` becomes `Sci-Fi`.
pub fn title_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut previous_is_letter = false;

    for c in value.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }

    result
}

pub struct GenreExtractor {
    studios: BTreeSet<String>,
    delimiter: String,
    placeholder: String,
}

impl GenreExtractor {
    pub fn new(studios: BTreeSet<String>, delimiter: &str, placeholder: &str) -> Self {
        Self {
            studios,
            delimiter: delimiter.to_string(),
            placeholder: placeholder.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.studio_labels.clone(),
            &config.list_delimiter,
            &config.placeholder,
        )
    }

    pub fn studios(&self) -> &BTreeSet<String> {
        &self.studios
    }

    /// Studio labels match regardless of case, so `DC` still matches once
    /// title-cased to `Dc`.
    pub fn is_studio(&self, name: &str) -> bool {
        self.studios
            .iter()
            .any(|studio| studio.eq_ignore_ascii_case(name))
    }

    /// Normalised genres of one movie, studio labels removed.
    pub fn movie_genres(&self, metadata: &MovieMetadata) -> BTreeSet<String> {
        metadata
            .genre
            .as_deref()
            .map(|genre| {
                split_list(genre, &self.delimiter, &self.placeholder)
                    .into_iter()
                    .map(title_case)
                    .filter(|g| !self.is_studio(g))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the vocabulary found in the metadata together with the studio
    /// labels that were filtered out of it.
    pub fn extract_genres<'a, I>(&self, metadata: I) -> (BTreeSet<String>, BTreeSet<String>)
    where
        I: IntoIterator<Item = &'a MovieMetadata>,
    {
        let mut vocabulary = BTreeSet::new();
        for record in metadata {
            vocabulary.extend(self.movie_genres(record));
        }
        (vocabulary, self.studios.clone())
    }

    /// Walks up from `node` through first-seen parents, stopping at a
    /// structural label, and collects every ancestor that is not itself a
    /// franchise, a movie or a studio.
    pub fn extract_ancestry_genres(
        &self,
        graph: &PathGraph,
        classification: &Classification,
        excluded: &ExcludedNames,
        node: &str,
    ) -> BTreeSet<String> {
        let mut genres = BTreeSet::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(node);

        let mut current = graph.parents(node).into_iter().next();
        while let Some(ancestor) = current {
            if excluded.is_structural(ancestor) || !seen.insert(ancestor) {
                break;
            }
            let skip = matches!(
                classification.kind_of(ancestor),
                Some(NodeKind::Franchise) | Some(NodeKind::Movie)
            ) || is_movie(ancestor)
                || self.is_studio(ancestor);
            if !skip {
                genres.insert(ancestor.to_string());
            }
            current = graph.parents(ancestor).into_iter().next();
        }

        genres
    }

    /// Genre set of every classified node: a movie gets its metadata genres
    /// and its ancestry, a franchise the union of its movies plus its own
    /// ancestry, and a genre folder its own name.
    pub fn resolve_genres(
        &self,
        graph: &PathGraph,
        classification: &Classification,
        excluded: &ExcludedNames,
        metadata: &MetadataIndex,
    ) -> BTreeMap<String, BTreeSet<String>> {
        let mut resolved: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for name in classification.of_kind(NodeKind::Movie) {
            let mut genres = metadata
                .get(name)
                .map(|record| self.movie_genres(record))
                .unwrap_or_default();
            genres.extend(self.extract_ancestry_genres(graph, classification, excluded, name));
            resolved.insert(name.to_string(), genres);
        }

        for name in classification.of_kind(NodeKind::Franchise) {
            let mut genres = self.extract_ancestry_genres(graph, classification, excluded, name);
            for node in graph.descendants(name) {
                if let Some(movie_genres) = resolved.get(node) {
                    genres.extend(movie_genres.iter().cloned());
                }
            }
            resolved.insert(name.to_string(), genres);
        }

        for name in classification.of_kind(NodeKind::Genre) {
            resolved.insert(name.to_string(), BTreeSet::from([name.to_string()]));
        }

        resolved
    }

    /// Full vocabulary for this run: stored names, metadata genres, category
    /// folders found by the classifier, and inferred ancestor names. Studio
    /// labels and movie-like names never enter it.
    pub fn build_vocabulary<'a, I>(
        &self,
        stored: &BTreeSet<String>,
        metadata_genres: &BTreeSet<String>,
        classification: &Classification,
        inferred: I,
    ) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a BTreeSet<String>>,
    {
        let mut vocabulary: BTreeSet<String> = stored.clone();
        vocabulary.extend(metadata_genres.iter().cloned());
        vocabulary.extend(classification.discovered_genres().iter().cloned());
        for names in inferred {
            vocabulary.extend(names.iter().cloned());
        }

        vocabulary.retain(|name| {
            let keep = !self.is_studio(name)
                && !is_movie(name)
                && !classification.is_kind(name, NodeKind::Franchise);
            if !keep {
                debug!("Leaving {} out of the genre vocabulary", name);
            }
            keep
        });
        vocabulary
    }
}

/// Joins a genre set into the stored form.
pub fn join_genres(genres: &BTreeSet<String>) -> String {
    genres.iter().cloned().collect::<Vec<_>>().join(", ")
}
