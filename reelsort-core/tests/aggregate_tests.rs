// Tests for franchise aggregation

use reelsort_core::aggregate::{
    Aggregator, FranchiseIndex, FranchiseMembers, MetadataIndex, STORABLE_MAX, franchise_path,
};
use reelsort_core::classify::{ExcludedNames, classify};
use reelsort_core::config::Config;
use reelsort_core::graph::PathGraph;
use reelsort_core::model::{AggregateField, MovieMetadata};

fn aggregator() -> Aggregator {
    Aggregator::new(&Config::default())
}

fn blank(file_id: i64, folder: &str) -> MovieMetadata {
    MovieMetadata {
        file_id,
        file_path: format!("/media/E/Movies/Saga/{}/movie.mkv", folder),
        ..Default::default()
    }
}

fn refs(movies: &[MovieMetadata]) -> Vec<&MovieMetadata> {
    movies.iter().collect()
}

fn with<F: Fn(&mut MovieMetadata, &str)>(values: &[&str], set: F) -> Vec<MovieMetadata> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let mut movie = blank(i as i64 + 1, &format!("Part {} ({})", i + 1, 2000 + i));
            set(&mut movie, value);
            movie
        })
        .collect()
}

// ============================================================================
// Field Rule Tests
// ============================================================================

#[test]
fn test_highest_rating() {
    let movies = with(&["PG", "R", "PG-13"], |m, v| m.rated = Some(v.to_string()));
    assert_eq!(aggregator().highest_rating(&refs(&movies)), Some("R".to_string()));
}

#[test]
fn test_unknown_rating_never_outranks_known() {
    let movies = with(&["Unrated", "G", "Not Rated"], |m, v| {
        m.rated = Some(v.to_string())
    });
    assert_eq!(aggregator().highest_rating(&refs(&movies)), Some("G".to_string()));

    let unknown_only = with(&["Unrated", "Not Rated"], |m, v| {
        m.rated = Some(v.to_string())
    });
    assert_eq!(
        aggregator().highest_rating(&refs(&unknown_only)),
        Some("Unrated".to_string())
    );

    let placeholders = with(&["N/A"], |m, v| m.rated = Some(v.to_string()));
    assert_eq!(aggregator().highest_rating(&refs(&placeholders)), None);
}

#[test]
fn test_total_runtime_skips_placeholder() {
    let movies = with(&["120 min", "95 min", "N/A"], |m, v| {
        m.runtime = Some(v.to_string())
    });
    let mut exclusions = Vec::new();

    assert_eq!(aggregator().total_runtime(&refs(&movies), &mut exclusions), 215);
    assert!(exclusions.is_empty());
}

#[test]
fn test_total_runtime_records_malformed_values() {
    let movies = with(&["120 min", "about two hours"], |m, v| {
        m.runtime = Some(v.to_string())
    });
    let mut exclusions = Vec::new();

    assert_eq!(aggregator().total_runtime(&refs(&movies), &mut exclusions), 120);
    assert_eq!(exclusions.len(), 1);
    assert_eq!(exclusions[0].field, AggregateField::Runtime);
    assert_eq!(exclusions[0].movie, "Part 2 (2001)");
    assert_eq!(exclusions[0].value, "about two hours");
}

#[test]
fn test_total_votes() {
    let movies = with(&["1,234", "N/A", "5,678"], |m, v| {
        m.imdb_votes = Some(v.to_string())
    });
    let mut exclusions = Vec::new();

    assert_eq!(aggregator().total_votes(&refs(&movies), &mut exclusions), 6912);
}

#[test]
fn test_total_box_office() {
    let movies = with(&["$1,000,000", "N/A", "$500"], |m, v| {
        m.box_office = Some(v.to_string())
    });
    let mut exclusions = Vec::new();

    assert_eq!(
        aggregator().total_box_office(&refs(&movies), &mut exclusions),
        1_000_500
    );
}

#[test]
fn test_total_runtime_overflow_is_excluded() {
    let movies = with(&["4000000000 min", "4000000000 min", "90 min"], |m, v| {
        m.runtime = Some(v.to_string())
    });
    let mut exclusions = Vec::new();

    assert_eq!(
        aggregator().total_runtime(&refs(&movies), &mut exclusions),
        4_000_000_090
    );
    assert_eq!(exclusions.len(), 1);
    assert_eq!(exclusions[0].field, AggregateField::Runtime);
    assert_eq!(exclusions[0].movie, "Part 2 (2001)");
    assert_eq!(exclusions[0].value, "4000000000 min");
}

#[test]
fn test_box_office_total_stays_storable() {
    let movies = with(&["$10,000,000,000,000,000,000", "$500"], |m, v| {
        m.box_office = Some(v.to_string())
    });
    let mut exclusions = Vec::new();

    let total = aggregator().total_box_office(&refs(&movies), &mut exclusions);

    assert_eq!(total, 500);
    assert!(total <= STORABLE_MAX);
    assert_eq!(exclusions.len(), 1);
    assert_eq!(exclusions[0].field, AggregateField::BoxOffice);
    assert_eq!(exclusions[0].value, "$10,000,000,000,000,000,000");
}

#[test]
fn test_total_votes_overflow_is_excluded() {
    let max = u64::MAX.to_string();
    let movies = with(&["1,000", max.as_str()], |m, v| {
        m.imdb_votes = Some(v.to_string())
    });
    let mut exclusions = Vec::new();

    assert_eq!(aggregator().total_votes(&refs(&movies), &mut exclusions), 1000);
    assert_eq!(exclusions.len(), 1);
    assert_eq!(exclusions[0].field, AggregateField::Votes);
}

#[test]
fn test_mean_rating_divides_by_contributors() {
    let movies = with(&["7.0", "8.0", "N/A"], |m, v| {
        m.imdb_rating = Some(v.to_string())
    });
    let mut exclusions = Vec::new();

    assert_eq!(
        aggregator().mean_rating(&refs(&movies), &mut exclusions),
        Some(7.5)
    );
}

#[test]
fn test_mean_rating_empty_is_none() {
    let movies = with(&["N/A", ""], |m, v| m.imdb_rating = Some(v.to_string()));
    let mut exclusions = Vec::new();

    assert_eq!(aggregator().mean_rating(&refs(&movies), &mut exclusions), None);
    assert_eq!(aggregator().mean_rating(&[], &mut exclusions), None);
}

#[test]
fn test_mean_critic_score_strips_percent() {
    let movies = with(&["87%", "93%"], |m, v| {
        m.rotten_tomatoes = Some(v.to_string())
    });
    let mut exclusions = Vec::new();

    assert_eq!(
        aggregator().mean_critic_score(&refs(&movies), &mut exclusions),
        Some(90.0)
    );
}

#[test]
fn test_earliest_year() {
    let movies = with(&["2008", "2001–2003", "N/A"], |m, v| {
        m.year = Some(v.to_string())
    });
    let mut exclusions = Vec::new();

    assert_eq!(
        aggregator().earliest_year(&refs(&movies), &mut exclusions),
        Some(2001)
    );
}

#[test]
fn test_release_dates_and_poster() {
    let mut movies = with(&["10 Jun 2005", "02 Jan 2001", "15 Mar 2010"], |m, v| {
        m.released = Some(v.to_string())
    });
    for (i, movie) in movies.iter_mut().enumerate() {
        movie.poster = Some(format!("https://img.example/{}.jpg", i));
    }
    let mut exclusions = Vec::new();
    let aggregator = aggregator();

    assert_eq!(
        aggregator.earliest_release(&refs(&movies), &mut exclusions),
        Some("02 Jan 2001".to_string())
    );
    assert_eq!(
        aggregator.latest_poster(&refs(&movies)),
        Some("https://img.example/2.jpg".to_string())
    );
}

#[test]
fn test_latest_poster_tie_keeps_first() {
    let mut movies = with(&["15 Mar 2010", "15 Mar 2010"], |m, v| {
        m.released = Some(v.to_string())
    });
    movies[0].poster = Some("first.jpg".to_string());
    movies[1].poster = Some("second.jpg".to_string());

    assert_eq!(
        aggregator().latest_poster(&refs(&movies)),
        Some("first.jpg".to_string())
    );
}

#[test]
fn test_unparsable_release_date_is_excluded() {
    let movies = with(&["sometime in 2004", "02 Jan 2001"], |m, v| {
        m.released = Some(v.to_string())
    });
    let mut exclusions = Vec::new();

    assert_eq!(
        aggregator().earliest_release(&refs(&movies), &mut exclusions),
        Some("02 Jan 2001".to_string())
    );
    assert_eq!(exclusions.len(), 1);
    assert_eq!(exclusions[0].field, AggregateField::Released);
}

#[test]
fn test_union_sorted_and_deduplicated() {
    let movies = with(&["Nolan, Jonathan Nolan", "Jonathan Nolan,  Goyer", "N/A"], |m, v| {
        m.director = Some(v.to_string())
    });

    assert_eq!(
        aggregator().union(&refs(&movies), |m| m.director.as_deref()),
        "Goyer, Jonathan Nolan, Nolan"
    );
    assert_eq!(aggregator().union(&[], |m| m.director.as_deref()), "");
}

#[test]
fn test_franchise_path_drops_two_components() {
    let movies = vec![blank(1, "Part 1 (2001)")];
    assert_eq!(
        franchise_path(&refs(&movies)),
        Some("/media/E/Movies/Saga".to_string())
    );

    let windows = vec![MovieMetadata {
        file_path: "E:\\Movies\\Saga\\Part 1 (2001)\\movie.mkv".to_string(),
        ..Default::default()
    }];
    assert_eq!(
        franchise_path(&refs(&windows)),
        Some("E:\\Movies\\Saga".to_string())
    );

    assert_eq!(franchise_path(&[]), None);
}

#[test]
fn test_franchise_path_samples_first_movie_only() {
    let movies = vec![
        MovieMetadata {
            file_path: "/disk1/Saga/A (2001)/a.mkv".to_string(),
            ..Default::default()
        },
        MovieMetadata {
            file_path: "/disk2/Saga/B (2004)/b.mkv".to_string(),
            ..Default::default()
        },
    ];

    assert_eq!(franchise_path(&refs(&movies)), Some("/disk1/Saga".to_string()));
}

// ============================================================================
// Index and Record Tests
// ============================================================================

#[test]
fn test_metadata_index_first_row_wins() {
    let mut first = blank(1, "Heat (1995)");
    first.title = Some("Heat".to_string());
    let mut second = blank(2, "Heat (1995)");
    second.title = Some("Heat (extended)".to_string());

    let index = MetadataIndex::new(vec![first, second]);

    assert_eq!(index.len(), 2);
    assert_eq!(
        index.get("Heat (1995)").and_then(|m| m.title.as_deref()),
        Some("Heat")
    );
    assert!(index.get("Ronin (1998)").is_none());
}

#[test]
fn test_franchise_index_owners() {
    let graph = PathGraph::build([
        ("Movies", "Saga"),
        ("Saga", "A (2001)"),
        ("Saga", "B (2004)"),
        ("Movies", "Solo (2010)"),
    ]);
    let excluded = ExcludedNames::new(Config::default().excluded_folders, Default::default());
    let classification = classify(&graph, &excluded);
    let metadata = MetadataIndex::new(vec![blank(1, "A (2001)"), blank(2, "B (2004)")]);

    let index = FranchiseIndex::build(&graph, &classification, &metadata);
    let owners = index.owners();

    assert_eq!(owners.get("A (2001)"), Some(&"Saga"));
    assert_eq!(owners.get("B (2004)"), Some(&"Saga"));
    assert!(owners.get("Solo (2010)").is_none());
}

#[test]
fn test_movie_record_parses_own_fields() {
    let mut movie = blank(4, "Heat (1995)");
    movie.title = Some("Heat".to_string());
    movie.year = Some("1995".to_string());
    movie.runtime = Some("170 min".to_string());
    movie.director = Some("Michael Mann".to_string());
    movie.actors = Some("Robert De Niro, Al Pacino, Robert De Niro".to_string());
    movie.imdb_rating = Some("8.3".to_string());
    movie.imdb_votes = Some("700,000".to_string());
    movie.rotten_tomatoes = Some("88%".to_string());
    movie.box_office = Some("$10,000,000,000,000,000,000".to_string());
    movie.plot = Some("N/A".to_string());

    let record = aggregator().movie_record("Heat (1995)", &movie, Some("Saga"), "Crime".to_string());

    assert_eq!(record.file_id, 4);
    assert_eq!(record.folder, "Heat (1995)");
    assert_eq!(record.franchise.as_deref(), Some("Saga"));
    assert_eq!(record.genres, "Crime");
    assert_eq!(record.year, Some(1995));
    assert_eq!(record.runtime, Some(170));
    assert_eq!(record.cast, "Al Pacino, Robert De Niro");
    assert_eq!(record.imdb_rating, Some(8.3));
    assert_eq!(record.imdb_votes, Some(700_000));
    assert_eq!(record.rotten_tomatoes, Some(88.0));
    // Too large for an INTEGER column
    assert!(record.box_office.is_none());
    assert!(record.plot.is_none());
}

#[test]
fn test_franchise_index_collects_descendants() {
    let graph = PathGraph::build([
        ("Movies", "Saga"),
        ("Saga", "A (2001)"),
        ("Saga", "B (2004)"),
        ("Movies", "Other"),
        ("Other", "C (2010)"),
        ("Other", "Notes"),
    ]);
    let excluded = ExcludedNames::new(Config::default().excluded_folders, Default::default());
    let classification = classify(&graph, &excluded);
    let metadata = MetadataIndex::new(vec![blank(1, "A (2001)")]);

    let index = FranchiseIndex::build(&graph, &classification, &metadata);

    assert_eq!(index.len(), 1);
    let saga = index.get("Saga").unwrap();
    assert_eq!(saga.movies.len(), 1);
    assert_eq!(saga.missing, vec!["B (2004)".to_string()]);
    assert_eq!(saga.movie_count(), 2);
    assert!(index.get("Other").is_none());
}

#[test]
fn test_aggregate_record() {
    let mut movies = with(&["PG-13", "R"], |m, v| m.rated = Some(v.to_string()));
    movies[0].runtime = Some("100 min".to_string());
    movies[1].runtime = Some("110 min".to_string());
    movies[0].released = Some("01 May 2001".to_string());
    movies[1].released = Some("01 May 2004".to_string());
    movies[1].poster = Some("b.jpg".to_string());
    movies[0].language = Some("English, French".to_string());
    movies[1].language = Some("English".to_string());
    movies[0].imdb_votes = Some("oops".to_string());

    let members = FranchiseMembers {
        movies: refs(&movies),
        missing: vec!["C (2008)".to_string()],
    };
    let record = aggregator().aggregate("Saga", &members);

    assert_eq!(record.folder, "Saga");
    assert_eq!(record.path.as_deref(), Some("/media/E/Movies/Saga"));
    assert_eq!(record.rated.as_deref(), Some("R"));
    assert_eq!(record.runtime, 210);
    assert_eq!(record.released.as_deref(), Some("01 May 2001"));
    assert_eq!(record.poster.as_deref(), Some("b.jpg"));
    assert_eq!(record.languages, "English, French");
    assert_eq!(record.movie_count, 3);
    assert_eq!(record.missing_metadata, vec!["C (2008)".to_string()]);
    assert_eq!(record.imdb_votes, 0);
    assert_eq!(record.exclusions.len(), 1);
    assert_eq!(record.exclusions[0].field, AggregateField::Votes);
    assert!(record.plot.is_none());
}

#[test]
fn test_aggregate_empty_franchise_defaults() {
    let members = FranchiseMembers::default();
    let record = aggregator().aggregate("Empty", &members);

    assert_eq!(record.year, None);
    assert_eq!(record.rated, None);
    assert_eq!(record.runtime, 0);
    assert_eq!(record.imdb_votes, 0);
    assert_eq!(record.box_office, 0);
    assert_eq!(record.imdb_rating, None);
    assert_eq!(record.directors, "");
    assert_eq!(record.path, None);
    assert_eq!(record.poster, None);
    assert_eq!(record.movie_count, 0);
}

#[test]
fn test_pooled_text_skips_placeholders() {
    let mut movies = with(&["A heist.", "N/A", ""], |m, v| m.plot = Some(v.to_string()));
    movies[0].awards = Some("1 win".to_string());

    let pooled = aggregator().pooled_text(&refs(&movies));

    assert_eq!(pooled.plots, vec!["A heist.".to_string()]);
    assert_eq!(pooled.awards, vec!["1 win".to_string()]);
}
