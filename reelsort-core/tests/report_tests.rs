// Tests for report generation

use reelsort_core::data::Database;
use reelsort_core::graph::PathGraph;
use reelsort_core::model::{AggregateRecord, ClassificationRow, MovieMetadata, NodeKind};
use reelsort_core::report::*;
use std::collections::BTreeSet;
use tempfile::TempDir;

fn create_test_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path).unwrap();
    (temp_dir, db)
}

fn seeded_db() -> (TempDir, Database) {
    let (temp_dir, db) = create_test_db();

    let id = db
        .insert_file_path("E:/Movies/Saga/Part One (2001)/one.mkv", "one.mkv", "Part One")
        .unwrap();
    db.insert_step(id, "E:", "Movies").unwrap();
    db.insert_step(id, "Movies", "Saga").unwrap();
    db.insert_step(id, "Saga", "Part One (2001)").unwrap();
    db.insert_metadata(&MovieMetadata {
        file_id: id,
        title: Some("Part One".to_string()),
        ..Default::default()
    })
    .unwrap();

    let id = db
        .insert_file_path("E:/Movies/Saga/Part Two (2004)/two.mkv", "two.mkv", "Part Two")
        .unwrap();
    db.insert_step(id, "Saga", "Part Two (2004)").unwrap();

    let rows = vec![
        ClassificationRow {
            folder: "Part One (2001)".to_string(),
            kind: NodeKind::Movie,
            genre: "Action".to_string(),
        },
        ClassificationRow {
            folder: "Part Two (2004)".to_string(),
            kind: NodeKind::Movie,
            genre: String::new(),
        },
        ClassificationRow {
            folder: "Saga".to_string(),
            kind: NodeKind::Franchise,
            genre: "Action".to_string(),
        },
    ];
    let franchise = AggregateRecord {
        folder: "Saga".to_string(),
        path: Some("E:/Movies/Saga".to_string()),
        genres: "Action".to_string(),
        year: Some(2001),
        rated: Some("R".to_string()),
        runtime: 215,
        directors: "Doe, Roe".to_string(),
        imdb_rating: Some(7.5),
        imdb_votes: 6912,
        box_office: 1_234_567,
        plot: Some("Two heists, one crew, \"no\" mercy.".to_string()),
        movie_count: 2,
        missing_metadata: vec!["Part Two (2004)".to_string()],
        ..Default::default()
    };
    let genres: BTreeSet<String> = ["Action".to_string()].into_iter().collect();
    db.save_results(&rows, &[], &[franchise], &genres).unwrap();

    let run_id = db.create_run().unwrap();
    db.complete_run(&run_id, "{\"movies\":2}").unwrap();

    (temp_dir, db)
}

// ============================================================================
// Format Tests
// ============================================================================

#[test]
fn test_report_format_from_str() {
    assert_eq!(ReportFormat::from_str("text"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
    assert_eq!(ReportFormat::from_str("csv"), Some(ReportFormat::Csv));
    assert_eq!(ReportFormat::from_str("md"), Some(ReportFormat::Markdown));
    assert_eq!(ReportFormat::from_str("html"), None);
}

// ============================================================================
// Report Data Tests
// ============================================================================

#[test]
fn test_gather_report_data() {
    let (_temp_dir, db) = seeded_db();
    let data = gather_report_data(&db).unwrap();

    assert_eq!(data.counts.movies, 2);
    assert_eq!(data.counts.franchises, 1);
    assert_eq!(data.counts.genres, 0);
    assert_eq!(data.franchises.len(), 1);
    assert_eq!(data.genres, vec!["Action".to_string()]);
    assert_eq!(data.missing_metadata, vec!["Part Two (2004)".to_string()]);
    assert!(data.run.is_some());
}

#[test]
fn test_gather_report_data_empty_store() {
    let (_temp_dir, db) = create_test_db();
    let data = gather_report_data(&db).unwrap();

    assert!(data.run.is_none());
    assert!(data.franchises.is_empty());
    assert!(generate_text_report(&data).contains("No classification run recorded."));
}

#[test]
fn test_text_report() {
    let (_temp_dir, db) = seeded_db();
    let data = gather_report_data(&db).unwrap();
    let report = generate_text_report(&data);

    assert!(report.contains("REELSORT LIBRARY REPORT"));
    assert!(report.contains("Status:       Completed"));
    assert!(report.contains("[1] Saga"));
    assert!(report.contains("Runtime:      215 min"));
    assert!(report.contains("Box Office:   $1,234,567"));
    assert!(report.contains("MOVIES WITHOUT METADATA"));
    assert!(report.contains("End of Report"));
}

#[test]
fn test_json_report() {
    let (_temp_dir, db) = seeded_db();
    let data = gather_report_data(&db).unwrap();
    let report = generate_json_report(&data).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&report).unwrap();
    let body = &parsed["report"];
    assert_eq!(body["metadata"]["generator"], "reelsort");
    assert_eq!(body["run"]["status"], "completed");
    assert_eq!(body["run"]["summary"]["movies"], 2);
    assert_eq!(body["summary"]["franchises"], 1);
    assert_eq!(body["franchises"][0]["folder"], "Saga");
    assert_eq!(body["missing_metadata"][0], "Part Two (2004)");
}

#[test]
fn test_csv_report_escapes_fields() {
    let (_temp_dir, db) = seeded_db();
    let data = gather_report_data(&db).unwrap();
    let report = generate_csv_report(&data);

    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("folder,path,genres,year"));
    assert!(lines[1].starts_with("Saga,E:/Movies/Saga,Action,2001,R,"));
    assert!(lines[1].contains("\"Doe, Roe\""));
    assert!(lines[1].contains("\"Two heists, one crew, \"\"no\"\" mercy.\""));
}

#[test]
fn test_markdown_report() {
    let (_temp_dir, db) = seeded_db();
    let data = gather_report_data(&db).unwrap();
    let report = generate_markdown_report(&data);

    assert!(report.starts_with("# reelsort library report"));
    assert!(report.contains("| Saga | 2001 | R | 2 | 215 min | 7.5 | Action |"));
    assert!(report.contains("## Movies without metadata"));
    assert!(report.contains("- Part Two (2004)"));
}

#[test]
fn test_render_dispatches_on_format() {
    let (_temp_dir, db) = seeded_db();
    let data = gather_report_data(&db).unwrap();

    assert!(render(&data, ReportFormat::Json).unwrap().starts_with('{'));
    assert!(render(&data, ReportFormat::Csv).unwrap().starts_with("folder,"));
}

#[test]
fn test_save_report() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("report.txt");

    save_report("hello", &path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
}

// ============================================================================
// Tree Export Tests
// ============================================================================

#[test]
fn test_export_tree_json() {
    let (_temp_dir, db) = seeded_db();
    let json = export_tree_json(&db).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let saga = &parsed["Root"]["E:"]["Movies"]["Saga"];
    assert!(saga["Part One (2001)"].is_object());
    assert!(saga["Part Two (2004)"].is_object());
}

#[test]
fn test_render_tree_text() {
    let graph = PathGraph::build([("Movies", "Saga"), ("Saga", "A (2001)"), ("Movies", "Docs")]);
    let rows = vec![ClassificationRow {
        folder: "Saga".to_string(),
        kind: NodeKind::Franchise,
        genre: String::new(),
    }];

    let text = render_tree_text(&graph.to_tree(), &rows);

    assert_eq!(
        text,
        "Root\n└── Movies\n    ├── Saga  [franchise]\n    │   └── A (2001)\n    └── Docs\n"
    );
}

#[test]
fn test_render_tree_text_empty() {
    let text = render_tree_text(&PathGraph::new().to_tree(), &[]);
    assert_eq!(text, "Root\n  (empty)\n");
}

// ============================================================================
// Helper Tests
// ============================================================================

#[test]
fn test_wrap_text() {
    let wrapped = wrap_text("one two three four", 12, "  ");
    assert_eq!(wrapped, "  one two\n  three four\n");
}

#[test]
fn test_format_thousands() {
    assert_eq!(format_thousands(0), "0");
    assert_eq!(format_thousands(999), "999");
    assert_eq!(format_thousands(1_234_567), "1,234,567");
}
