//! Inspect binary entry point.
//!
//! Prints an overview of an article corpus: size, clustering runs, year
//! bounds, the clusters of each run with their most common tags, how many
//! tags articles carry, and the most common tags overall.
//!
//! # Examples
//!
//! Overview of every run:
//! ```bash
//! inspect --data out/merged_for_app.jsonl
//! ```
//!
//! One run, JSON output:
//! ```bash
//! inspect --run leaf_0.55 --format json
//! ```

use anyhow::{Context, Result};
use article_explorer::{
    aggregate::{aggregate, cluster_tag_profiles, tags_per_record, ClusterProfile, TagCount},
    config::ExplorerConfig,
    corpus::Corpus,
    provider::jsonl::JsonlFileProvider,
};
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output format for the report
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-friendly tables
    Table,
    /// Machine-readable JSON report
    Json,
}

/// Corpus overview CLI
#[derive(Parser, Debug)]
#[command(
    name = "inspect",
    version,
    about = "Summarize an article corpus: runs, clusters, years and tags"
)]
struct InspectArgs {
    /// JSONL corpus file (overrides the config file)
    #[arg(long, value_name = "PATH")]
    data: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Only report this clustering run (repeatable; default: every run)
    #[arg(long = "run", value_name = "RUN")]
    runs: Vec<String>,

    /// Number of tags shown per cluster
    #[arg(long, value_name = "N", default_value = "5")]
    cluster_tags: usize,

    /// Number of tags shown in the global ranking
    #[arg(long, value_name = "N", default_value = "20")]
    top_tags: usize,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Logging verbosity level
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

/// Everything the report shows, in serializable form
#[derive(Debug, Serialize)]
struct CorpusReport {
    articles: usize,
    runs: Vec<String>,
    year_bounds: Option<(i32, i32)>,
    articles_without_year: usize,
    distinct_tags: usize,
    finto_only_tags: usize,
    manual_only_tags: usize,
    dual_evidence_tags: usize,
    clusters: BTreeMap<String, Vec<ClusterProfile>>,
    tags_per_article: BTreeMap<usize, usize>,
    top_tags: Vec<TagCount>,
}

impl CorpusReport {
    fn build(corpus: &Corpus, runs: &[String], cluster_tags: usize, top_tags: usize) -> Self {
        let catalog = corpus.tag_catalog();
        let aggregates = aggregate(corpus.entries());

        let clusters = runs
            .iter()
            .map(|run| {
                (
                    run.clone(),
                    cluster_tag_profiles(corpus.entries(), run, cluster_tags),
                )
            })
            .collect();

        Self {
            articles: corpus.len(),
            runs: corpus.runs().map(str::to_string).collect(),
            year_bounds: corpus.year_bounds(),
            articles_without_year: corpus.len() - aggregates.years.total(),
            distinct_tags: catalog.len(),
            finto_only_tags: catalog.iter().filter(|t| t.finto && !t.manual).count(),
            manual_only_tags: catalog.iter().filter(|t| t.manual && !t.finto).count(),
            dual_evidence_tags: catalog.iter().filter(|t| t.finto && t.manual).count(),
            clusters,
            tags_per_article: tags_per_record(corpus.entries()),
            top_tags: aggregates.tags.top(top_tags).to_vec(),
        }
    }
}

/// Initialize logging subsystem with the specified level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn new_table(columns: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            columns
                .iter()
                .map(|c| Cell::new(c).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

fn print_summary_box(report: &CorpusReport, elapsed: std::time::Duration) {
    let years = match report.year_bounds {
        Some((first, last)) => format!("{} - {}", first, last),
        None => "-".to_string(),
    };
    println!("\n╔════════════════════════════════════════╗");
    println!("║      Corpus Overview                   ║");
    println!("╠════════════════════════════════════════╣");
    println!("║ Articles:             {:>16} ║", report.articles);
    println!("║ Without year:         {:>16} ║", report.articles_without_year);
    println!("║ Years:                {:>16} ║", years);
    println!("║ Clustering runs:      {:>16} ║", report.runs.len());
    println!("║ Distinct tags:        {:>16} ║", report.distinct_tags);
    println!("║   Finto only:         {:>16} ║", report.finto_only_tags);
    println!("║   Manual only:        {:>16} ║", report.manual_only_tags);
    println!("║   Both:               {:>16} ║", report.dual_evidence_tags);
    println!("║ Load time:            {:>13.2?} ║", elapsed);
    println!("╚════════════════════════════════════════╝");
}

fn print_report(report: &CorpusReport) {
    for (run, profiles) in &report.clusters {
        println!("\nRun: {} ({} clusters)", run, profiles.len());
        let mut table = new_table(&["Label", "Name", "Articles", "Top tags"]);
        for profile in profiles {
            let tags = profile
                .top_tags
                .iter()
                .map(|t| format!("{} {:.0}%", t.label, t.prevalence * 100.0))
                .collect::<Vec<_>>()
                .join(", ");
            table.add_row(vec![
                Cell::new(profile.cluster.label).set_alignment(CellAlignment::Right),
                Cell::new(truncate(&profile.cluster.name, 40)),
                Cell::new(profile.cluster.size).set_alignment(CellAlignment::Right),
                Cell::new(truncate(&tags, 80)),
            ]);
        }
        println!("{}", table);
    }

    println!("\nTags per article");
    let mut table = new_table(&["Tags", "Articles"]);
    for (tags, articles) in &report.tags_per_article {
        table.add_row(vec![
            Cell::new(tags).set_alignment(CellAlignment::Right),
            Cell::new(articles).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}", table);

    println!("\nMost common tags");
    let mut table = new_table(&["Rank", "Tag", "Articles"]);
    for (idx, tag) in report.top_tags.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1).set_alignment(CellAlignment::Right),
            Cell::new(&tag.label),
            Cell::new(tag.count).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}", table);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = InspectArgs::parse();

    init_logging(&args.log_level);
    debug!("CLI arguments: {:?}", args);

    let mut config = match &args.config {
        Some(path) => ExplorerConfig::from_file(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ExplorerConfig::default(),
    };
    if let Some(data) = &args.data {
        config.data_path = data.clone();
    }

    let start_time = Instant::now();
    info!("Loading corpus from {}", config.data_path.display());
    let provider = JsonlFileProvider::new(config.data_path.clone());
    let corpus = Corpus::load(&provider)
        .await
        .with_context(|| format!("Failed to load corpus from {}", config.data_path.display()))?;
    let elapsed = start_time.elapsed();

    if corpus.is_empty() {
        warn!("Corpus is empty");
    }

    let runs: Vec<String> = if args.runs.is_empty() {
        corpus.runs().map(str::to_string).collect()
    } else {
        for run in args.runs.iter().filter(|run| !corpus.has_run(run)) {
            warn!("Run '{}' does not occur in the corpus", run);
        }
        args.runs.clone()
    };

    let report = CorpusReport::build(&corpus, &runs, args.cluster_tags, args.top_tags);

    match args.format {
        OutputFormat::Table => {
            print_summary_box(&report, elapsed);
            print_report(&report);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .context("Failed to serialize report to JSON")?;
            println!("{}", json);
        }
    }

    Ok(())
}
