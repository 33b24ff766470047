use crate::aggregate::{Aggregator, FranchiseIndex, MetadataIndex, PooledText};
use crate::classify::{ExcludedNames, classify, is_movie};
use crate::config::Config;
use crate::data::Database;
use crate::error::Result;
use crate::genre::{GenreExtractor, join_genres};
use crate::graph::PathGraph;
use crate::model::{AggregateRecord, ClassificationRow, MovieMetadata, MovieRecord, NodeKind};
use indicatif::{ProgressBar, ProgressStyle};
use reelsort_augment::{Augmentor, TextGenerator};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Options for configuring a classification run
pub struct PipelineOptions {
    pub config: Config,
    pub show_progress_bars: bool,
}

/// Callback for reporting pipeline progress
pub type PipelineProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Everything a run reads from the store.
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub edges: Vec<(String, String)>,
    pub metadata: Vec<MovieMetadata>,
    pub stored_genres: BTreeSet<String>,
}

impl PipelineInputs {
    pub fn load(db: &Database) -> Result<Self> {
        Ok(Self {
            edges: db.load_edges()?,
            metadata: db.load_metadata()?,
            stored_genres: db.load_genres()?,
        })
    }
}

/// Everything a run writes back, before augmentation.
#[derive(Debug, Clone, Default)]
pub struct StageOutput {
    pub classifications: Vec<ClassificationRow>,
    /// One row per movie folder that has metadata.
    pub movies: Vec<MovieRecord>,
    pub franchises: Vec<AggregateRecord>,
    /// Descendant plot and awards text per franchise folder.
    pub pooled: BTreeMap<String, PooledText>,
    pub vocabulary: BTreeSet<String>,
    /// Vocabulary entries not yet in the store.
    pub new_genres: BTreeSet<String>,
    /// Movie folders with no metadata row.
    pub missing_metadata: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub nodes: usize,
    pub edges: usize,
    pub movies: usize,
    pub franchises: usize,
    pub genres: usize,
    pub new_genres: usize,
    pub missing_metadata: usize,
    pub exclusions: usize,
    pub augmented: usize,
}

/// Builds the graph, classifies it, resolves genres and aggregates every
/// franchise. Pure over its inputs; nothing here touches the store.
pub fn run_stages(inputs: &PipelineInputs, config: &Config) -> StageOutput {
    let graph = PathGraph::build(inputs.edges.iter().map(|(p, c)| (p.as_str(), c.as_str())));
    debug!(
        "Graph built: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    let metadata = MetadataIndex::new(inputs.metadata.clone());
    let extractor = GenreExtractor::from_config(config);
    let (metadata_genres, _studios) = extractor.extract_genres(metadata.iter());

    let known_genres: BTreeSet<String> = inputs
        .stored_genres
        .iter()
        .chain(metadata_genres.iter())
        .filter(|name| !extractor.is_studio(name) && !is_movie(name))
        .cloned()
        .collect();
    let excluded = ExcludedNames::new(config.excluded_folders.clone(), known_genres);

    let classification = classify(&graph, &excluded);
    info!(
        "Classified {} folders: {} movies, {} franchises, {} genres",
        classification.len(),
        classification.count(NodeKind::Movie),
        classification.count(NodeKind::Franchise),
        classification.count(NodeKind::Genre)
    );

    let resolved = extractor.resolve_genres(&graph, &classification, &excluded, &metadata);
    let inferred = resolved
        .iter()
        .filter(|(name, _)| !classification.is_kind(name, NodeKind::Genre))
        .map(|(_, genres)| genres);
    let vocabulary = extractor.build_vocabulary(
        &inputs.stored_genres,
        &metadata_genres,
        &classification,
        inferred,
    );
    let new_genres: BTreeSet<String> = vocabulary
        .difference(&inputs.stored_genres)
        .cloned()
        .collect();

    let genre_string = |name: &str| resolved.get(name).map(join_genres).unwrap_or_default();

    let classifications = classification
        .iter()
        .map(|(name, kind)| ClassificationRow {
            folder: name.to_string(),
            kind,
            genre: genre_string(name),
        })
        .collect();

    let index = FranchiseIndex::build(&graph, &classification, &metadata);
    let aggregator = Aggregator::new(config);
    let mut franchises = Vec::with_capacity(index.len());
    let mut pooled = BTreeMap::new();
    for (folder, members) in index.iter() {
        let mut record = aggregator.aggregate(folder, members);
        record.genres = genre_string(folder);
        franchises.push(record);
        pooled.insert(folder.to_string(), aggregator.pooled_text(&members.movies));
    }

    let owners = index.owners();
    let movies: Vec<MovieRecord> = classification
        .of_kind(NodeKind::Movie)
        .filter_map(|folder| metadata.get(folder).map(|record| (folder, record)))
        .filter(|(folder, record)| {
            let is_movie_type = record
                .media_type
                .as_deref()
                .is_none_or(|t| t.eq_ignore_ascii_case("movie"));
            if !is_movie_type {
                debug!("Skipping {} with media type {:?}", folder, record.media_type);
            }
            is_movie_type
        })
        .map(|(folder, record)| {
            aggregator.movie_record(
                folder,
                record,
                owners.get(folder).copied(),
                genre_string(folder),
            )
        })
        .collect();

    let missing_metadata: Vec<String> = classification
        .of_kind(NodeKind::Movie)
        .filter(|movie| metadata.get(movie).is_none())
        .map(String::from)
        .collect();
    if !missing_metadata.is_empty() {
        warn!("{} movies have no metadata", missing_metadata.len());
    }

    StageOutput {
        classifications,
        movies,
        franchises,
        pooled,
        vocabulary,
        new_genres,
        missing_metadata,
    }
}

/// Fills plot and awards from pooled descendant text. Returns how many
/// franchises received at least one generated field.
pub async fn augment_records<G: TextGenerator + Sync>(
    augmentor: &Augmentor<G>,
    output: &mut StageOutput,
    progress_bar: Option<&ProgressBar>,
) -> usize {
    let total = output.franchises.len();
    let mut augmented = 0;

    for (idx, record) in output.franchises.iter_mut().enumerate() {
        if let Some(pb) = progress_bar {
            pb.set_message(format!(
                "Augmenting franchise {}/{}: {}",
                idx + 1,
                total,
                record.folder
            ));
        }
        let Some(text) = output.pooled.get(&record.folder) else {
            continue;
        };
        record.plot = augmentor.franchise_plot(&text.plots).await;
        record.awards = augmentor.franchise_awards(&text.awards).await;
        if record.plot.is_some() || record.awards.is_some() {
            augmented += 1;
        }
    }

    augmented
}

/// Execute a full classification run against the store.
///
/// A `runs` row tracks the attempt; any store failure marks it failed and
/// is returned. Classification and aggregation problems never abort.
pub async fn execute_pipeline<G: TextGenerator + Sync>(
    db: &Database,
    options: PipelineOptions,
    augmentor: Option<&Augmentor<G>>,
    progress_callback: Option<PipelineProgressCallback>,
) -> Result<RunSummary> {
    let run_id = db.create_run()?;
    info!("Starting run {}", run_id);

    match run_pipeline(db, &run_id, &options, augmentor, progress_callback).await {
        Ok(summary) => {
            db.complete_run(&run_id, &serde_json::to_string(&summary)?)?;
            Ok(summary)
        }
        Err(e) => {
            warn!("Run {} failed: {}", run_id, e);
            if let Err(mark_err) = db.fail_run(&run_id, &e.to_string()) {
                warn!("Could not mark run {} as failed: {}", run_id, mark_err);
            }
            Err(e)
        }
    }
}

async fn run_pipeline<G: TextGenerator + Sync>(
    db: &Database,
    run_id: &str,
    options: &PipelineOptions,
    augmentor: Option<&Augmentor<G>>,
    progress_callback: Option<PipelineProgressCallback>,
) -> Result<RunSummary> {
    let report = |message: String| {
        if let Some(ref callback) = progress_callback {
            callback(message);
        }
    };

    let progress_bar = if options.show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Loading folder steps and metadata...");
        Some(pb)
    } else {
        None
    };

    let inputs = PipelineInputs::load(db)?;
    report(format!(
        "Loaded {} edges, {} metadata rows, {} stored genres",
        inputs.edges.len(),
        inputs.metadata.len(),
        inputs.stored_genres.len()
    ));

    if let Some(ref pb) = progress_bar {
        pb.set_message("Classifying folders...");
    }
    let mut output = run_stages(&inputs, &options.config);

    let augmented = match augmentor {
        Some(augmentor) => {
            report(format!(
                "Augmenting {} franchises",
                output.franchises.len()
            ));
            augment_records(augmentor, &mut output, progress_bar.as_ref()).await
        }
        None => 0,
    };

    if let Some(ref pb) = progress_bar {
        pb.set_message("Saving results...");
    }
    db.save_results(
        &output.classifications,
        &output.movies,
        &output.franchises,
        &output.new_genres,
    )?;

    let count = |kind: NodeKind| output.classifications.iter().filter(|r| r.kind == kind).count();
    let graph_nodes: BTreeSet<&str> = inputs
        .edges
        .iter()
        .flat_map(|(p, c)| [p.as_str(), c.as_str()])
        .collect();
    let unique_edges: BTreeSet<&(String, String)> = inputs.edges.iter().collect();

    let summary = RunSummary {
        run_id: run_id.to_string(),
        nodes: graph_nodes.len(),
        edges: unique_edges.len(),
        movies: count(NodeKind::Movie),
        franchises: count(NodeKind::Franchise),
        genres: count(NodeKind::Genre),
        new_genres: output.new_genres.len(),
        missing_metadata: output.missing_metadata.len(),
        exclusions: output.franchises.iter().map(|f| f.exclusions.len()).sum(),
        augmented,
    };

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Run complete! {} movies, {} franchises, {} genres",
            summary.movies, summary.franchises, summary.genres
        ));
    }

    Ok(summary)
}
