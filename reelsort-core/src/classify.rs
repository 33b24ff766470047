// Structural classification of folder nodes

use crate::graph::PathGraph;
use crate::model::NodeKind;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use tracing::debug;

static YEAR_IN_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d{4}\)").expect("year pattern is valid"));

/// A folder is a movie release when its name carries a year in parentheses,
/// e.g. `Hancock (2008)`.
pub fn is_movie(name: &str) -> bool {
    YEAR_IN_PARENS.is_match(name)
}

/// A non-movie folder whose direct children are all movies. Folders without
/// children are never franchises.
pub fn is_franchise(graph: &PathGraph, name: &str) -> bool {
    if is_movie(name) {
        return false;
    }
    let children = graph.children(name);
    !children.is_empty() && children.iter().all(|child| is_movie(child))
}

/// Names kept out of classification.
///
/// Structural labels (volumes, media-type folders) are skipped entirely and
/// stop upward genre inference. Known genres are skipped as candidates but
/// still reported as `Genre` so they never turn into movies or franchises.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExcludedNames {
    structural: BTreeSet<String>,
    genres: BTreeSet<String>,
}

impl ExcludedNames {
    pub fn new(structural: BTreeSet<String>, genres: BTreeSet<String>) -> Self {
        Self { structural, genres }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.is_structural(name) || self.is_known_genre(name)
    }

    pub fn is_structural(&self, name: &str) -> bool {
        self.structural.contains(name)
    }

    pub fn is_known_genre(&self, name: &str) -> bool {
        self.genres.contains(name)
    }

    pub fn structural(&self) -> &BTreeSet<String> {
        &self.structural
    }

    pub fn genres(&self) -> &BTreeSet<String> {
        &self.genres
    }
}

/// Outcome of one classification pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    kinds: BTreeMap<String, NodeKind>,
    discovered_genres: BTreeSet<String>,
}

impl Classification {
    pub fn kind_of(&self, name: &str) -> Option<NodeKind> {
        self.kinds.get(name).copied()
    }

    pub fn is_kind(&self, name: &str, kind: NodeKind) -> bool {
        self.kind_of(name) == Some(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeKind)> {
        self.kinds.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    pub fn of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(move |(_, k)| *k == kind)
            .map(|(name, _)| name)
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.kinds.values().filter(|k| **k == kind).count()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Category folders found by the fallback rule during this pass.
    pub fn discovered_genres(&self) -> &BTreeSet<String> {
        &self.discovered_genres
    }
}

/// Assigns every non-structural node exactly one kind.
pub fn classify(graph: &PathGraph, excluded: &ExcludedNames) -> Classification {
    let mut kinds: BTreeMap<String, NodeKind> = BTreeMap::new();
    let mut discovered = BTreeSet::new();

    // Folders with children
    for name in graph.nodes() {
        if excluded.is_structural(name) {
            continue;
        }
        if excluded.is_known_genre(name) {
            kinds.insert(name.to_string(), NodeKind::Genre);
            continue;
        }
        if !graph.has_children(name) {
            continue;
        }

        let kind = if is_movie(name) {
            NodeKind::Movie
        } else if is_franchise(graph, name) {
            NodeKind::Franchise
        } else {
            discovered.insert(name.to_string());
            NodeKind::Genre
        };
        debug!("Classified {} as {}", name, kind);
        kinds.insert(name.to_string(), kind);
    }

    // Children not reached above, tested on the leaf rule alone
    for name in graph.nodes() {
        for child in graph.children(name) {
            if kinds.contains_key(child) || excluded.contains(child) {
                continue;
            }
            if is_movie(child) {
                debug!("Classified {} as movie", child);
                kinds.insert(child.to_string(), NodeKind::Movie);
            }
        }
    }

    for name in graph.nodes() {
        if !excluded.is_structural(name) && !kinds.contains_key(name) {
            kinds.insert(name.to_string(), NodeKind::Genre);
        }
    }

    Classification {
        kinds,
        discovered_genres: discovered,
    }
}
