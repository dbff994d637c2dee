//! Explore binary entry point.
//!
//! This binary loads an article corpus and runs exploration queries against
//! it. It supports single-query and interactive REPL modes, with table or JSON
//! output. A query can also be read from a JSON request file.
//!
//! # Examples
//!
//! Text query restricted to a year window:
//! ```bash
//! explore --data out/merged_for_app.jsonl --query "arctic" --year-start 2015 --year-end 2020
//! ```
//!
//! Best match on two tags, JSON output:
//! ```bash
//! explore --tag NATO --tag "security policy" --tag-mode or --order best-match --format json
//! ```
//!
//! Interactive mode:
//! ```bash
//! explore --interactive
//! ```

use anyhow::{Context, Result};
use article_explorer::{
    api::{ClusterRef, ExploreRequest, ExploreResponse},
    config::ExplorerConfig,
    corpus::{fold_case, strip_manual_suffix, Corpus, CorpusEntry, MANUAL_TAG_SUFFIX},
    provider::jsonl::JsonlFileProvider,
    query::{ClusterSelection, CorpusSearchEngine, OrderKey, SearchEngine, TagMode},
};
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, CellAlignment, ContentArrangement, Table};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output format for query results
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-friendly tables
    Table,
    /// Machine-readable JSON response
    Json,
}

/// How multiple --tag values combine
#[derive(Debug, Clone, Copy, ValueEnum)]
enum TagModeArg {
    /// Every tag must be present
    And,
    /// Any tag may be present
    Or,
}

impl From<TagModeArg> for TagMode {
    fn from(mode: TagModeArg) -> Self {
        match mode {
            TagModeArg::And => TagMode::And,
            TagModeArg::Or => TagMode::Or,
        }
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrderArg {
    /// Most recent first
    NewestFirst,
    /// Oldest first
    OldestFirst,
    /// Highest tag score first (needs --tag)
    BestMatch,
}

impl From<OrderArg> for OrderKey {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::NewestFirst => OrderKey::NewestFirst,
            OrderArg::OldestFirst => OrderKey::OldestFirst,
            OrderArg::BestMatch => OrderKey::BestMatch,
        }
    }
}

/// Explore CLI for querying a tagged, clustered article corpus
#[derive(Parser, Debug)]
#[command(
    name = "explore",
    version,
    about = "Filter, search and rank articles in a tagged, clustered corpus",
    long_about = "Query an article corpus by clustering run, cluster, publication year, tags and \
                  free text. Supports single-query and interactive modes with table or JSON output.

EXAMPLES:
  Text query:
    explore --data out/merged_for_app.jsonl --query \"quantum\"

  Noise cluster of a run:
    explore --run leaf_0.55 --cluster \"Noise / Unclustered\"

  Best match on tags, JSON output:
    explore --tag NATO --tag BRICS --tag-mode or --order best-match --format json

  Request file:
    explore --request query.json

  Interactive mode:
    explore --interactive"
)]
struct Args {
    /// JSONL corpus file (overrides the config file)
    #[arg(long, value_name = "PATH")]
    data: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Free-text query matched against titles, abstracts, translations and tags
    #[arg(long, value_name = "TEXT")]
    query: Option<String>,

    /// Clustering run (defaults to the first preferred run in the corpus)
    #[arg(long, value_name = "RUN")]
    run: Option<String>,

    /// Cluster label or name within the run, or "all"
    #[arg(long, value_name = "CLUSTER")]
    cluster: Option<String>,

    /// Keep articles from this year onwards (inclusive)
    #[arg(long, value_name = "YEAR")]
    year_start: Option<i32>,

    /// Keep articles up to this year (inclusive)
    #[arg(long, value_name = "YEAR")]
    year_end: Option<i32>,

    /// Tag label to filter on (repeatable)
    #[arg(long = "tag", value_name = "LABEL")]
    tags: Vec<String>,

    /// How multiple tags combine
    #[arg(long, value_enum, default_value = "and")]
    tag_mode: TagModeArg,

    /// Result ordering (defaults to the configured order)
    #[arg(long, value_enum)]
    order: Option<OrderArg>,

    /// Maximum number of articles to show
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Tag rank window for the tag summary, e.g. 1-20
    #[arg(long, value_name = "START-END", value_parser = parse_rank_window)]
    tag_ranks: Option<[usize; 2]>,

    /// Read the query from a JSON request file instead of flags
    #[arg(long, value_name = "FILE", conflicts_with = "interactive")]
    request: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Enable interactive REPL mode
    #[arg(long, short = 'i')]
    interactive: bool,

    /// Logging verbosity level
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: String,
}

/// Parse a `START-END` tag rank window.
fn parse_rank_window(input: &str) -> std::result::Result<[usize; 2], String> {
    let (start, end) = input
        .split_once('-')
        .ok_or_else(|| format!("expected START-END, got '{}'", input))?;
    let start: usize = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid start rank '{}'", start))?;
    let end: usize = end
        .trim()
        .parse()
        .map_err(|_| format!("invalid end rank '{}'", end))?;
    if start == 0 || start > end {
        return Err("ranks must satisfy 1 <= START <= END".to_string());
    }
    Ok([start, end])
}

/// Setup logging with the specified level
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

/// Truncate on character boundaries, marking the cut with an ellipsis.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(label).add_attribute(Attribute::Bold))
        .collect()
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format the articles of a response as a table
fn format_articles_table(response: &ExploreResponse) -> String {
    if response.articles.is_empty() {
        return "No articles found.".to_string();
    }

    let with_score = response.order == OrderKey::BestMatch;
    let mut columns = vec!["#", "Title", "Year", "Cluster", "Tags"];
    if with_score {
        columns.push("Score");
    }

    let mut table = new_table();
    table.set_header(header(&columns));

    for (idx, article) in response.articles.iter().enumerate() {
        let year = article
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "-".to_string());
        let tags = article
            .tags
            .iter()
            .take(4)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        let mut row = vec![
            Cell::new(idx + 1).set_alignment(CellAlignment::Right),
            Cell::new(truncate(&article.title, 60)),
            Cell::new(year),
            Cell::new(truncate(article.cluster.as_deref().unwrap_or("-"), 30)),
            Cell::new(truncate(&tags, 40)),
        ];
        if with_score {
            row.push(Cell::new(format!("{:.2}", article.score.unwrap_or(0.0))));
        }
        table.add_row(row);
    }

    table.to_string()
}

/// Format the tag window of a response as a table
fn format_tags_table(response: &ExploreResponse) -> String {
    if response.top_tags.is_empty() {
        return "No tags in range.".to_string();
    }
    let mut table = new_table();
    table.set_header(header(&["Rank", "Tag", "Articles"]));
    for tag in &response.top_tags {
        table.add_row(vec![
            Cell::new(tag.rank).set_alignment(CellAlignment::Right),
            Cell::new(&tag.label),
            Cell::new(tag.count).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

/// Format the year histogram of a response as a bar chart
fn format_year_histogram(response: &ExploreResponse) -> String {
    let max = response.year_histogram.values().copied().max().unwrap_or(0);
    if max == 0 {
        return "No publication years in result.".to_string();
    }
    response
        .year_histogram
        .iter()
        .map(|(year, count)| {
            let width = (count * 40).div_ceil(max);
            format!("{} {:>6} {}", year, count, "█".repeat(width))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a response as JSON
fn format_response_json(response: &ExploreResponse) -> Result<String> {
    serde_json::to_string_pretty(response).with_context(|| "Failed to serialize response to JSON")
}

fn print_response(response: &ExploreResponse, format: OutputFormat, elapsed_ms: f64) -> Result<()> {
    match format {
        OutputFormat::Table => {
            for warning in &response.warnings {
                eprintln!("warning: {}", warning);
            }
            println!("{}", format_articles_table(response));
            println!(
                "\nShowing {} of {} matching articles ({} in corpus, {} order) in {:.2}ms",
                response.articles.len(),
                response.matched,
                response.total,
                response.order,
                elapsed_ms
            );
        }
        OutputFormat::Json => {
            println!("{}", format_response_json(response)?);
        }
    }
    Ok(())
}

/// Render every field of one article
fn format_article_detail(entry: &CorpusEntry, rank: usize) -> String {
    let record = entry.record();
    let rule = "═".repeat(80);
    let mut lines = vec![
        String::new(),
        rule.clone(),
        format!("Rank: {}", rank),
        format!("ID: {}", record.id),
        format!("Title: {}", record.title),
    ];
    if let Some(title) = record.translated_title() {
        lines.push(format!("Title (en): {}", title));
    }
    lines.push(match entry.year() {
        Some(year) => format!("Year: {}", year),
        None => "Year: -".to_string(),
    });
    for (run, assignment) in &record.cluster_memberships {
        lines.push(format!("Cluster [{}]: {} ({})", run, assignment.name, assignment.label));
    }

    let finto = record.tags_by_score();
    let tags: Vec<String> = finto
        .iter()
        .map(|tag| format!("{} ({:.2})", tag.label, tag.score))
        .chain(
            record
                .manual_tags
                .iter()
                .map(|label| format!("{}{}", label, MANUAL_TAG_SUFFIX)),
        )
        .collect();
    lines.push(format!(
        "Tags: {}",
        if tags.is_empty() { "-".to_string() } else { tags.join(", ") }
    ));
    for tag in finto.iter().filter(|tag| !tag.uri.is_empty()) {
        lines.push(format!("  {}: {}", tag.label, tag.uri));
    }

    lines.push(format!("\nAbstract:\n{}", record.abstract_text));
    if let Some(text) = record.translated_abstract() {
        lines.push(format!("\nAbstract (en):\n{}", text));
    }

    if !record.metadata.is_empty() {
        if let Ok(json) = serde_json::to_string_pretty(record.metadata.as_value()) {
            lines.push(format!("\nMetadata:\n{}", json));
        }
    }
    lines.push(rule);
    lines.join("\n")
}

/// Display every field of one article
fn display_article_detail(corpus: &Corpus, id: &str, rank: usize) {
    match corpus.get_by_id(id) {
        Some(entry) => println!("{}", format_article_detail(entry, rank)),
        None => eprintln!("Article {} is no longer in the corpus", id),
    }
}

/// Run one request against the engine
fn execute(
    engine: &CorpusSearchEngine,
    config: &ExplorerConfig,
    request: &ExploreRequest,
) -> (ExploreResponse, f64) {
    debug!("Executing request: {:?}", request);
    let start = Instant::now();
    let outcome = engine.search(&request.to_query(config));
    let response = ExploreResponse::from_outcome(
        &outcome,
        request.run.as_deref(),
        request.tag_window(config),
    );
    (response, start.elapsed().as_secs_f64() * 1000.0)
}

const HELP: &str = "Commands:
  <text>               - Search for articles containing <text>
  /query [TEXT]        - Set the text query (no TEXT clears it)
  /run RUN | clear     - Select the clustering run
  /cluster SEL         - Select a cluster by label or name, or 'all'
  /year START END      - Filter by year range
  /year clear          - Clear year filter
  /tag LABEL           - Toggle a tag filter
  /tags clear          - Clear tag filters
  /catalog [TEXT]      - List tag labels containing TEXT
  /mode and|or         - Combine tags with AND or OR
  /order newest|oldest|best - Set result ordering
  /limit N             - Show at most N articles
  /ranks START END     - Set the tag rank window for /stats
  /format table|json   - Set output format
  /show                - Show current criteria
  /detail N            - Show full details for result rank N
  /stats               - Year histogram and tag ranking of the last result
  /runs                - List clustering runs
  /clusters            - List clusters of the selected run
  /help                - Show this help
  Ctrl+D or Ctrl+C     - Exit";

/// REPL state: current criteria plus the last response
struct Session<'a> {
    engine: &'a CorpusSearchEngine,
    config: &'a ExplorerConfig,
    request: ExploreRequest,
    format: OutputFormat,
    last: Option<ExploreResponse>,
}

impl<'a> Session<'a> {
    fn corpus(&self) -> &'a Corpus {
        self.engine.corpus()
    }

    fn run_query(&mut self) {
        let (response, elapsed_ms) = execute(self.engine, self.config, &self.request);
        if let Err(e) = print_response(&response, self.format, elapsed_ms) {
            eprintln!("Error formatting output: {}", e);
        }
        self.last = Some(response);
    }

    fn show_criteria(&self) {
        let r = &self.request;
        println!("Query:    {}", if r.query.is_empty() { "-" } else { r.query.as_str() });
        println!("Run:      {}", r.run.as_deref().unwrap_or("-"));
        let cluster: ClusterSelection = r
            .cluster
            .clone()
            .map(ClusterSelection::from)
            .unwrap_or_default();
        println!("Cluster:  {}", cluster);
        println!(
            "Years:    {} - {}",
            r.year_min.map(|y| y.to_string()).unwrap_or_else(|| "*".to_string()),
            r.year_max.map(|y| y.to_string()).unwrap_or_else(|| "*".to_string())
        );
        println!("Tags:     {} ({})", r.tags.join(", "), r.tag_mode);
        println!("Order:    {}", r.order.unwrap_or(self.config.default_order));
        println!("Limit:    {}", r.limit.unwrap_or(self.config.max_results));
        let (start, end) = r.tag_window(self.config);
        println!("Ranks:    {}-{}", start, end);
    }

    fn show_stats(&self) {
        match &self.last {
            Some(response) => {
                println!("{}", format_year_histogram(response));
                println!();
                println!("{}", format_tags_table(response));
            }
            None => eprintln!("No query has been run yet"),
        }
    }

    fn show_runs(&self) {
        let corpus = self.corpus();
        let mut table = new_table();
        table.set_header(header(&["Run", "Clusters", "Articles"]));
        for run in corpus.runs() {
            let clusters = article_explorer::aggregate::cluster_overview(corpus.entries(), run);
            let members: usize = clusters.iter().map(|c| c.size).sum();
            table.add_row(vec![
                Cell::new(run),
                Cell::new(clusters.len()).set_alignment(CellAlignment::Right),
                Cell::new(members).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{}", table);
    }

    fn show_catalog(&self, filter: &str) {
        let needle = fold_case(filter);
        let labels: Vec<String> = self
            .corpus()
            .tag_catalog()
            .iter()
            .filter(|entry| fold_case(&entry.label).contains(&needle))
            .map(|entry| entry.display_label())
            .collect();
        if labels.is_empty() {
            println!("No tags match '{}'.", filter);
            return;
        }
        for label in &labels {
            println!("  {}", label);
        }
        println!("{} tags", labels.len());
    }

    fn show_clusters(&self) {
        let Some(run) = self.request.run.as_deref() else {
            eprintln!("No run selected. Use /run RUN first.");
            return;
        };
        let clusters = article_explorer::aggregate::cluster_overview(self.corpus().entries(), run);
        if clusters.is_empty() {
            println!("Run '{}' has no clusters.", run);
            return;
        }
        let mut table = new_table();
        table.set_header(header(&["Label", "Name", "Articles"]));
        for cluster in clusters {
            table.add_row(vec![
                Cell::new(cluster.label).set_alignment(CellAlignment::Right),
                Cell::new(truncate(&cluster.name, 60)),
                Cell::new(cluster.size).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{}", table);
    }

    /// Apply one slash command. Returns true if the query should be re-run.
    fn command(&mut self, line: &str) -> bool {
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let parts: Vec<&str> = rest.split_whitespace().collect();

        match name {
            "/help" => println!("{}", HELP),
            "/query" => {
                self.request.query = rest.to_string();
                return true;
            }
            "/run" => {
                if rest.is_empty() {
                    eprintln!("Usage: /run RUN  or  /run clear");
                } else if rest == "clear" {
                    self.request.run = None;
                    return true;
                } else {
                    if !self.corpus().has_run(rest) {
                        eprintln!("Run '{}' does not occur in the corpus", rest);
                    }
                    self.request.run = Some(rest.to_string());
                    return true;
                }
            }
            "/cluster" => {
                if rest.is_empty() {
                    eprintln!("Usage: /cluster LABEL|NAME|all");
                } else {
                    self.request.cluster = match ClusterSelection::parse(rest) {
                        ClusterSelection::All => None,
                        ClusterSelection::Label(label) => Some(ClusterRef::Label(label)),
                        ClusterSelection::Name(name) => Some(ClusterRef::Name(name)),
                    };
                    return true;
                }
            }
            "/year" => {
                if parts.len() == 1 && parts[0] == "clear" {
                    self.request.year_min = None;
                    self.request.year_max = None;
                    return true;
                } else if parts.len() == 2 {
                    match (parts[0].parse::<i32>(), parts[1].parse::<i32>()) {
                        (Ok(start), Ok(end)) if start <= end => {
                            self.request.year_min = Some(start);
                            self.request.year_max = Some(end);
                            return true;
                        }
                        _ => eprintln!("Invalid year range: START must be <= END"),
                    }
                } else {
                    eprintln!("Usage: /year START END  or  /year clear");
                }
            }
            "/tag" => {
                let label = strip_manual_suffix(rest);
                if label.is_empty() {
                    eprintln!("Usage: /tag LABEL");
                } else if let Some(pos) = self.request.tags.iter().position(|t| t == label) {
                    self.request.tags.remove(pos);
                    println!("Removed tag '{}'", label);
                    return true;
                } else {
                    self.request.tags.push(label.to_string());
                    println!("Added tag '{}'", label);
                    return true;
                }
            }
            "/catalog" => self.show_catalog(rest),
            "/tags" => {
                if rest == "clear" {
                    self.request.tags.clear();
                    return true;
                }
                eprintln!("Usage: /tags clear");
            }
            "/mode" => match rest {
                "and" => {
                    self.request.tag_mode = TagMode::And;
                    return true;
                }
                "or" => {
                    self.request.tag_mode = TagMode::Or;
                    return true;
                }
                _ => eprintln!("Invalid mode: must be 'and' or 'or'"),
            },
            "/order" => {
                let order = match rest {
                    "newest" => Some(OrderKey::NewestFirst),
                    "oldest" => Some(OrderKey::OldestFirst),
                    "best" => Some(OrderKey::BestMatch),
                    _ => None,
                };
                match order {
                    Some(order) => {
                        self.request.order = Some(order);
                        return true;
                    }
                    None => eprintln!("Invalid order: must be 'newest', 'oldest' or 'best'"),
                }
            }
            "/limit" => match rest.parse::<usize>() {
                Ok(n) if n > 0 => {
                    self.request.limit = Some(n);
                    return true;
                }
                _ => eprintln!("Invalid number: must be a positive integer"),
            },
            "/ranks" => {
                if parts.len() != 2 {
                    eprintln!("Usage: /ranks START END");
                } else {
                    match (parts[0].parse::<usize>(), parts[1].parse::<usize>()) {
                        (Ok(start), Ok(end)) if start >= 1 && start <= end => {
                            self.request.tag_window = Some([start, end]);
                            return true;
                        }
                        _ => eprintln!("Invalid rank window: need 1 <= START <= END"),
                    }
                }
            }
            "/format" => match rest {
                "table" => {
                    self.format = OutputFormat::Table;
                    println!("Set output format to table");
                }
                "json" => {
                    self.format = OutputFormat::Json;
                    println!("Set output format to JSON");
                }
                _ => eprintln!("Invalid format: must be 'table' or 'json'"),
            },
            "/show" => self.show_criteria(),
            "/detail" => {
                let Some(response) = &self.last else {
                    eprintln!("No query has been run yet");
                    return false;
                };
                match rest.parse::<usize>() {
                    Ok(rank) if rank > 0 && rank <= response.articles.len() => {
                        display_article_detail(self.corpus(), &response.articles[rank - 1].id, rank);
                    }
                    Ok(rank) if rank > response.articles.len() => {
                        eprintln!(
                            "Rank {} out of range (last query showed {} articles)",
                            rank,
                            response.articles.len()
                        );
                    }
                    _ => eprintln!("Invalid rank: must be a positive integer"),
                }
            }
            "/stats" => self.show_stats(),
            "/runs" => self.show_runs(),
            "/clusters" => self.show_clusters(),
            _ => eprintln!("Unknown command: {}. Type /help for available commands.", name),
        }
        false
    }
}

/// Run interactive REPL mode
fn run_interactive(
    engine: &CorpusSearchEngine,
    config: &ExplorerConfig,
    request: ExploreRequest,
    format: OutputFormat,
) -> Result<()> {
    println!(
        "Interactive Article Explorer ({} articles)",
        engine.corpus().len()
    );
    println!("{}", HELP);
    println!();

    let mut rl = DefaultEditor::new().with_context(|| "Failed to create readline editor")?;
    let mut session = Session {
        engine,
        config,
        request,
        format,
        last: None,
    };

    loop {
        match rl.readline("Explore> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line).ok();

                let rerun = if line.starts_with('/') {
                    session.command(line)
                } else {
                    session.request.query = line.to_string();
                    true
                };
                if rerun {
                    session.run_query();
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                error!("Error reading input: {}", err);
                break;
            }
        }
    }

    Ok(())
}

/// Build a request from command-line flags
fn request_from_args(args: &Args) -> ExploreRequest {
    ExploreRequest {
        query: args.query.clone().unwrap_or_default(),
        run: args.run.clone(),
        cluster: args
            .cluster
            .as_deref()
            .map(ClusterSelection::parse)
            .and_then(|selection| match selection {
                ClusterSelection::All => None,
                ClusterSelection::Label(label) => Some(ClusterRef::Label(label)),
                ClusterSelection::Name(name) => Some(ClusterRef::Name(name)),
            }),
        year_range: None,
        year_min: args.year_start,
        year_max: args.year_end,
        tags: args
            .tags
            .iter()
            .map(|t| strip_manual_suffix(t).to_string())
            .collect(),
        tag_mode: args.tag_mode.into(),
        order: args.order.map(OrderKey::from),
        limit: args.limit,
        tag_window: args.tag_ranks,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level);

    let mut config = match &args.config {
        Some(path) => ExplorerConfig::from_file(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ExplorerConfig::default(),
    };
    if let Some(data) = &args.data {
        config.data_path = data.clone();
    }

    if !config.data_path.exists() {
        anyhow::bail!(
            "Corpus file not found: {}\n\
             Pass --data or set data_path in the config file.",
            config.data_path.display()
        );
    }

    info!("Loading corpus from: {}", config.data_path.display());
    let provider = JsonlFileProvider::new(config.data_path.clone());
    let corpus = Corpus::load(&provider)
        .await
        .with_context(|| format!("Failed to load corpus from {}", config.data_path.display()))?;

    if corpus.is_empty() {
        anyhow::bail!("Corpus is empty (0 articles in {})", config.data_path.display());
    }

    let mut request = match &args.request {
        Some(path) => {
            let contents = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read request file {}", path.display()))?;
            serde_json::from_str::<ExploreRequest>(&contents)
                .with_context(|| format!("Failed to parse request file {}", path.display()))?
        }
        None => request_from_args(&args),
    };
    if request.run.is_none() {
        request.run = config.pick_default_run(&corpus).map(str::to_string);
        debug!("Using default run: {:?}", request.run);
    }

    let engine = CorpusSearchEngine::new(Arc::new(corpus));

    if args.interactive {
        run_interactive(&engine, &config, request, args.format)?;
    } else {
        let (response, elapsed_ms) = execute(&engine, &config, &request);
        print_response(&response, args.format, elapsed_ms)?;
        if matches!(args.format, OutputFormat::Table) {
            println!("\n{}", format_tags_table(&response));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use article_explorer::models::ArticleRecord;
    use serde_json::json;

    #[test]
    fn test_article_detail_shows_uris_and_metadata() {
        let record = ArticleRecord::new("art_1", "原标题", "摘要")
            .with_finto_tag("NATO", 0.8)
            .with_manual_tag("BRICS")
            .with_metadata(json!({"article": {"year": 2021, "source": "cnki"}}));
        let corpus = Corpus::from_records(vec![record]).unwrap();

        let detail = format_article_detail(corpus.get_by_id("art_1").unwrap(), 1);

        assert!(detail.contains("Year: 2021"));
        assert!(detail.contains("NATO (0.80)"));
        assert!(detail.contains("NATO: http://www.yso.fi/onto/yso/nato"));
        assert!(detail.contains(&format!("BRICS{}", MANUAL_TAG_SUFFIX)));
        assert!(detail.contains("Metadata:"));
        assert!(detail.contains("\"source\": \"cnki\""));
    }

    #[test]
    fn test_article_detail_omits_empty_metadata() {
        let corpus = Corpus::from_records(vec![ArticleRecord::new("a", "t", "")]).unwrap();
        let detail = format_article_detail(corpus.get_by_id("a").unwrap(), 3);

        assert!(detail.contains("Rank: 3"));
        assert!(detail.contains("Tags: -"));
        assert!(!detail.contains("Metadata:"));
    }
}
