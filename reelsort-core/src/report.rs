// Report generation from database

use crate::aggregate::MetadataIndex;
use crate::data::{Database, RunRecord, RunStatus};
use crate::error::Result;
use crate::graph::{PathGraph, TreeNode};
use crate::model::{AggregateRecord, ClassificationRow, NodeKind};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const HEAVY_RULE: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
const LIGHT_RULE: &str =
    "────────────────────────────────────────────────────────────────────────────────";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Markdown => "md",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindCounts {
    pub movies: usize,
    pub franchises: usize,
    pub genres: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunRecord>,
    pub counts: KindCounts,
    pub classifications: Vec<ClassificationRow>,
    pub franchises: Vec<AggregateRecord>,
    pub genres: Vec<String>,
    /// Movie folders with no metadata row.
    pub missing_metadata: Vec<String>,
}

pub fn gather_report_data(db: &Database) -> Result<ReportData> {
    let classifications = db.get_classifications()?;
    let franchises = db.get_franchises()?;
    let genres: Vec<String> = db.load_genres()?.into_iter().collect();
    let metadata = MetadataIndex::new(db.load_metadata()?);

    let mut counts = KindCounts::default();
    let mut missing_metadata = Vec::new();
    for row in &classifications {
        match row.kind {
            NodeKind::Movie => {
                counts.movies += 1;
                if metadata.get(&row.folder).is_none() {
                    missing_metadata.push(row.folder.clone());
                }
            }
            NodeKind::Franchise => counts.franchises += 1,
            NodeKind::Genre => counts.genres += 1,
        }
    }

    Ok(ReportData {
        run: db.latest_run()?,
        counts,
        classifications,
        franchises,
        genres,
        missing_metadata,
    })
}

pub fn render(data: &ReportData, format: ReportFormat) -> Result<String> {
    Ok(match format {
        ReportFormat::Text => generate_text_report(data),
        ReportFormat::Json => generate_json_report(data)?,
        ReportFormat::Csv => generate_csv_report(data),
        ReportFormat::Markdown => generate_markdown_report(data),
    })
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str(HEAVY_RULE);
    report.push('\n');
    report.push_str("                         REELSORT LIBRARY REPORT\n");
    report.push_str(HEAVY_RULE);
    report.push_str("\n\n");

    if let Some(ref run) = data.run {
        report.push_str(&format!("Run ID:       {}\n", run.id));
        report.push_str(&format!("Status:       {}\n", status_to_string(run.status)));
        report.push_str(&format!("Run Date:     {}\n", format_timestamp(run.started_at)));
        if let Some(finished_at) = run.finished_at {
            report.push_str(&format!(
                "Duration:     {} seconds\n",
                finished_at - run.started_at
            ));
        }
    } else {
        report.push_str("No classification run recorded.\n");
    }
    report.push('\n');

    section(&mut report, "SUMMARY");
    report.push_str(&format!("  Movies:      {}\n", data.counts.movies));
    report.push_str(&format!("  Franchises:  {}\n", data.counts.franchises));
    report.push_str(&format!("  Genres:      {}\n", data.counts.genres));
    report.push_str(&format!("  Vocabulary:  {}\n", data.genres.len()));
    if !data.missing_metadata.is_empty() {
        report.push_str(&format!(
            "  [!] {} movies without metadata\n",
            data.missing_metadata.len()
        ));
    }
    report.push('\n');

    if !data.franchises.is_empty() {
        section(&mut report, "FRANCHISES");

        for (idx, franchise) in data.franchises.iter().enumerate() {
            report.push_str(&format!("[{}] {}\n", idx + 1, franchise.folder));
            push_field(&mut report, "Path", franchise.path.as_deref());
            push_field(&mut report, "Genres", Some(&franchise.genres));
            push_field(
                &mut report,
                "Year",
                franchise.year.map(|y| y.to_string()).as_deref(),
            );
            push_field(&mut report, "Rated", franchise.rated.as_deref());
            push_field(&mut report, "Released", franchise.released.as_deref());
            report.push_str(&format!("Movies:       {}\n", franchise.movie_count));
            report.push_str(&format!("Runtime:      {} min\n", franchise.runtime));
            push_field(&mut report, "Directors", Some(&franchise.directors));
            push_field(&mut report, "Languages", Some(&franchise.languages));
            push_field(
                &mut report,
                "IMDb",
                franchise
                    .imdb_rating
                    .map(|r| format!("{:.1} ({} votes)", r, franchise.imdb_votes))
                    .as_deref(),
            );
            push_field(
                &mut report,
                "Critics",
                franchise.rotten_tomatoes.map(|r| format!("{:.0}%", r)).as_deref(),
            );
            if franchise.box_office > 0 {
                report.push_str(&format!(
                    "Box Office:   ${}\n",
                    format_thousands(franchise.box_office)
                ));
            }

            if !franchise.cast.is_empty() {
                report.push_str("\nCast:\n");
                report.push_str(&wrap_text(&franchise.cast, 80, "  "));
            }
            if let Some(ref plot) = franchise.plot {
                report.push_str("\nPlot:\n");
                report.push_str(&wrap_text(plot, 80, "  "));
            }
            if let Some(ref awards) = franchise.awards {
                report.push_str("\nAwards:\n");
                report.push_str(&wrap_text(awards, 80, "  "));
            }
            if !franchise.missing_metadata.is_empty() {
                report.push_str("\nWithout metadata:\n");
                for movie in &franchise.missing_metadata {
                    report.push_str(&format!("  - {}\n", movie));
                }
            }
            if !franchise.exclusions.is_empty() {
                report.push_str("\nExcluded values:\n");
                for exclusion in &franchise.exclusions {
                    report.push_str(&format!(
                        "  - {} {}: {:?}\n",
                        exclusion.movie,
                        exclusion.field.as_str(),
                        exclusion.value
                    ));
                }
            }

            report.push('\n');
            report.push_str(LIGHT_RULE);
            report.push_str("\n\n");
        }
    }

    if !data.missing_metadata.is_empty() {
        section(&mut report, "MOVIES WITHOUT METADATA");
        for movie in &data.missing_metadata {
            report.push_str(&format!("  {}\n", movie));
        }
        report.push('\n');
    }

    report.push_str(HEAVY_RULE);
    report.push('\n');
    report.push_str("                              End of Report\n");
    report.push_str(HEAVY_RULE);
    report.push_str("\n\nGenerated by reelsort\n");

    report
}

pub fn generate_json_report(data: &ReportData) -> std::result::Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "reelsort",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "run": data.run.as_ref().map(|run| serde_json::json!({
                "id": run.id,
                "status": run.status.as_str(),
                "started_at": format_iso8601_timestamp(run.started_at),
                "finished_at": run.finished_at.map(format_iso8601_timestamp),
                "summary": run
                    .summary
                    .as_deref()
                    .and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok()),
            })),
            "summary": data.counts,
            "genres": data.genres,
            "classifications": data.classifications,
            "franchises": data.franchises,
            "missing_metadata": data.missing_metadata,
        }
    });

    serde_json::to_string_pretty(&json_report)
}

const CSV_HEADER: &[&str] = &[
    "folder",
    "path",
    "genres",
    "year",
    "rated",
    "released",
    "runtime",
    "directors",
    "writers",
    "cast",
    "languages",
    "countries",
    "imdb_rating",
    "imdb_votes",
    "rotten_tomatoes",
    "box_office",
    "movie_count",
    "poster",
    "plot",
    "awards",
];

/// One row per franchise.
pub fn generate_csv_report(data: &ReportData) -> String {
    let mut out = String::new();
    out.push_str(&CSV_HEADER.join(","));
    out.push('\n');

    for f in &data.franchises {
        let fields = [
            f.folder.clone(),
            f.path.clone().unwrap_or_default(),
            f.genres.clone(),
            f.year.map(|y| y.to_string()).unwrap_or_default(),
            f.rated.clone().unwrap_or_default(),
            f.released.clone().unwrap_or_default(),
            f.runtime.to_string(),
            f.directors.clone(),
            f.writers.clone(),
            f.cast.clone(),
            f.languages.clone(),
            f.countries.clone(),
            f.imdb_rating.map(|r| format!("{:.2}", r)).unwrap_or_default(),
            f.imdb_votes.to_string(),
            f.rotten_tomatoes
                .map(|r| format!("{:.2}", r))
                .unwrap_or_default(),
            f.box_office.to_string(),
            f.movie_count.to_string(),
            f.poster.clone().unwrap_or_default(),
            f.plot.clone().unwrap_or_default(),
            f.awards.clone().unwrap_or_default(),
        ];
        let line: Vec<String> = fields.iter().map(|v| csv_escape(v)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }

    out
}

pub fn generate_markdown_report(data: &ReportData) -> String {
    let mut md = String::new();
    md.push_str("# reelsort library report\n\n");

    if let Some(ref run) = data.run {
        md.push_str(&format!(
            "Run `{}` ({}) on {}\n\n",
            run.id,
            run.status.as_str(),
            format_timestamp(run.started_at)
        ));
    }

    md.push_str("## Summary\n\n");
    md.push_str("| Kind | Count |\n|---|---|\n");
    md.push_str(&format!("| Movies | {} |\n", data.counts.movies));
    md.push_str(&format!("| Franchises | {} |\n", data.counts.franchises));
    md.push_str(&format!("| Genres | {} |\n\n", data.counts.genres));

    if !data.franchises.is_empty() {
        md.push_str("## Franchises\n\n");
        md.push_str("| Franchise | Year | Rated | Movies | Runtime | IMDb | Genres |\n");
        md.push_str("|---|---|---|---|---|---|---|\n");
        for f in &data.franchises {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} min | {} | {} |\n",
                md_escape(&f.folder),
                f.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string()),
                f.rated.as_deref().unwrap_or("-"),
                f.movie_count,
                f.runtime,
                f.imdb_rating
                    .map(|r| format!("{:.1}", r))
                    .unwrap_or_else(|| "-".to_string()),
                md_escape(&f.genres),
            ));
        }
        md.push('\n');
    }

    if !data.genres.is_empty() {
        md.push_str("## Genre vocabulary\n\n");
        md.push_str(&data.genres.join(", "));
        md.push_str("\n\n");
    }

    if !data.missing_metadata.is_empty() {
        md.push_str("## Movies without metadata\n\n");
        for movie in &data.missing_metadata {
            md.push_str(&format!("- {}\n", movie));
        }
        md.push('\n');
    }

    md
}

/// Nested JSON tree of the stored folder hierarchy, keyed by `Root`.
pub fn export_tree_json(db: &Database) -> Result<String> {
    let graph = PathGraph::build(db.load_edges()?);
    Ok(tree_to_json(&graph.to_tree())?)
}

/// `{"Root": {"A": {"B": {}}}}` form. Sibling names that repeat collapse
/// into one key.
pub fn tree_to_json(tree: &TreeNode) -> serde_json::Result<String> {
    fn nest(node: &TreeNode) -> serde_json::Value {
        let children: serde_json::Map<String, serde_json::Value> = node
            .children
            .iter()
            .map(|child| (child.name.clone(), nest(child)))
            .collect();
        serde_json::Value::Object(children)
    }

    let mut root = serde_json::Map::new();
    root.insert(tree.name.clone(), nest(tree));
    serde_json::to_string_pretty(&serde_json::Value::Object(root))
}

/// Box-drawing rendition of the hierarchy, optionally tagged with kinds.
pub fn render_tree_text(tree: &TreeNode, classifications: &[ClassificationRow]) -> String {
    fn walk(
        node: &TreeNode,
        prefix: &str,
        classifications: &[ClassificationRow],
        out: &mut String,
    ) {
        for (i, child) in node.children.iter().enumerate() {
            let is_last = i == node.children.len() - 1;
            let branch = if is_last { "└── " } else { "├── " };
            let kind = classifications
                .iter()
                .find(|row| row.folder == child.name)
                .map(|row| format!("  [{}]", row.kind))
                .unwrap_or_default();
            out.push_str(&format!("{}{}{}{}\n", prefix, branch, child.name, kind));

            let next_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
            walk(child, &next_prefix, classifications, out);
        }
    }

    let mut out = String::new();
    out.push_str(&tree.name);
    out.push('\n');
    if tree.children.is_empty() {
        out.push_str("  (empty)\n");
        return out;
    }
    walk(tree, "", classifications, &mut out);
    out
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

// Helper functions
fn section(report: &mut String, title: &str) {
    report.push_str(HEAVY_RULE);
    report.push('\n');
    report.push_str(title);
    report.push('\n');
    report.push_str(HEAVY_RULE);
    report.push_str("\n\n");
}

fn push_field(report: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        report.push_str(&format!("{:<14}{}\n", format!("{}:", label), value));
    }
}

fn status_to_string(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Completed => "Completed",
        RunStatus::Failed => "Failed",
        RunStatus::Running => "Running",
    }
}

fn format_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_iso8601_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.to_rfc3339()
}

pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut result = String::new();
    let mut current_line = String::new();
    let limit = width.saturating_sub(indent.len());

    for word in text.split_whitespace() {
        if current_line.len() + word.len() + 1 > limit && !current_line.is_empty() {
            result.push_str(indent);
            result.push_str(&current_line);
            result.push('\n');
            current_line.clear();
        }

        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        result.push_str(indent);
        result.push_str(&current_line);
        result.push('\n');
    }

    result
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn md_escape(value: &str) -> String {
    value.replace('|', "\\|")
}
