use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use immoscope_core::filters::{self, SelectionFilter};
use immoscope_core::search::{self, SearchQuery};
use immoscope_core::tabular::to_rows;
use immoscope_core::{AppConfig, Loader, PropertyTable, TableCache, ViewCache, ViewKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod render;
mod shell;

use render::OutputFormat;

#[derive(Parser, Debug)]
#[command(author, version, about = "Real-estate market dashboard", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults to $IMMOSCOPE_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory of Parquet transaction files, overriding the configuration
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Output format for tables
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and clean the sources, then print the per-file and per-stage report
    Load,
    /// List the departments and property types available for filtering
    Filters,
    /// Transaction count and average prices for a selection
    Summary(SelectionArgs),
    /// Render one aggregation view
    View(ViewArgs),
    /// Find properties by postal code, optionally within a radius
    Search(SearchArgs),
    /// Interactive session reusing the loaded table between commands
    Shell(SelectionArgs),
}

#[derive(Args, Debug, Default, Clone)]
struct SelectionArgs {
    /// Restrict to a department (repeatable)
    #[arg(long = "department")]
    departments: Vec<String>,
    /// Restrict to a property type (repeatable)
    #[arg(long = "type")]
    property_types: Vec<String>,
}

impl SelectionArgs {
    fn filter(&self) -> SelectionFilter {
        SelectionFilter {
            departments: self.departments.clone(),
            property_types: self.property_types.clone(),
        }
    }
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// View name, e.g. commune_prices, market_trends, property_features
    view: ViewKind,
    #[command(flatten)]
    selection: SelectionArgs,
    /// Show at most this many rows
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    #[arg(long)]
    postal_code: String,
    /// Radius around the postal code's centroid; 0 searches the postal code only
    #[arg(long, default_value_t = 0.0)]
    radius_km: f64,
    #[arg(long, default_value_t = 0.0)]
    min_price: f64,
    /// 0 means no upper bound
    #[arg(long, default_value_t = 0.0)]
    max_price: f64,
    #[arg(long, default_value_t = 0.0)]
    min_surface: f64,
    /// 0 means no upper bound
    #[arg(long, default_value_t = 0.0)]
    max_surface: f64,
    #[command(flatten)]
    selection: SelectionArgs,
    #[arg(long)]
    limit: Option<usize>,
}

/// Loader and table cache shared by every command of a process.
pub struct Session {
    pub config: AppConfig,
    pub loader: Loader,
    pub cache: TableCache,
}

impl Session {
    fn new(config: AppConfig) -> Self {
        let loader = Loader::from_config(&config);
        let cache = TableCache::new(config.cache_ttl());
        Self {
            config,
            loader,
            cache,
        }
    }

    pub fn table(&self) -> Result<Arc<PropertyTable>> {
        self.cache
            .get_or_load(|| self.loader.load().map(|outcome| outcome.table))
            .context("failed to load transaction data")
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let session = Session::new(config);
    let format = cli.format;

    match cli.command {
        Command::Load => handle_load(&session, format),
        Command::Filters => handle_filters(&session, format),
        Command::Summary(args) => handle_summary(&session, &args, format),
        Command::View(args) => handle_view(&session, &args, format),
        Command::Search(args) => handle_search(&session, &args, format),
        Command::Shell(args) => shell::run(&session, args.filter(), format),
    }
}

fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let config_path = cli
        .config
        .clone()
        .or_else(|| env::var_os("IMMOSCOPE_CONFIG").map(PathBuf::from));
    let mut config = AppConfig::load(config_path.as_deref())
        .with_context(|| format!("failed to load configuration {config_path:?}"))?;

    if let Some(dir) = env::var_os("IMMOSCOPE_DATA_DIR") {
        config.data.dir = PathBuf::from(dir);
    }
    if let Ok(ttl) = env::var("IMMOSCOPE_CACHE_TTL_SECS") {
        config.cache.ttl_seconds = ttl
            .parse()
            .with_context(|| format!("IMMOSCOPE_CACHE_TTL_SECS must be an integer, got {ttl}"))?;
    }
    if let Some(dir) = &cli.data_dir {
        config.data.dir = dir.clone();
        config.data.files = None;
    }

    info!(data_dir = %config.data.dir.display(), "configuration resolved");
    Ok(config)
}

fn handle_load(session: &Session, format: OutputFormat) -> Result<()> {
    let outcome = session
        .loader
        .load()
        .context("failed to load transaction data")?;

    render::print_rows("Source files", &to_rows(&outcome.report.files)?, format, None)?;
    render::print_rows("Cleaning stages", &to_rows(&outcome.report.stages)?, format, None)?;

    if let Some(stage) = outcome.report.emptied_at {
        warn!(stage = stage.as_str(), "no transactions left after cleaning");
    }
    println!(
        "{} transactions loaded ({} rows before cleaning)",
        outcome.table.len(),
        outcome.report.concatenated_rows
    );
    Ok(())
}

fn handle_filters(session: &Session, format: OutputFormat) -> Result<()> {
    let table = session.table()?;
    let departments = filters::available_departments(&table);
    let types = filters::available_property_types(&table);
    render::print_list("Departments", &departments, format)?;
    render::print_list("Property types", &types, format)?;
    Ok(())
}

fn handle_summary(session: &Session, args: &SelectionArgs, format: OutputFormat) -> Result<()> {
    let table = session.table()?;
    let selected = args.filter().apply(&table);
    let summary = filters::market_summary(&selected);
    render::print_rows("Summary", &to_rows(&[summary])?, format, None)
}

fn handle_view(session: &Session, args: &ViewArgs, format: OutputFormat) -> Result<()> {
    let table = session.table()?;
    let selected = Arc::new(args.selection.filter().apply(&table));
    let mut views = ViewCache::new(selected, session.config.views.clone());
    let rows = views.get(args.view);
    if rows.is_empty() {
        warn!(view = args.view.as_str(), "view produced no rows");
    }
    render::print_rows(args.view.as_str(), &rows, format, args.limit)
}

fn handle_search(session: &Session, args: &SearchArgs, format: OutputFormat) -> Result<()> {
    let table = session.table()?;
    let selected = args.selection.filter().apply(&table);
    let query = SearchQuery::postal_code(args.postal_code.clone())
        .with_radius_km(args.radius_km)
        .with_price_range(args.min_price, args.max_price)
        .with_surface_range(args.min_surface, args.max_surface);

    let result = search::search(&selected, &query);
    if let Some((lat, lon)) = result.center {
        println!("center: {lat:.5}, {lon:.5}");
    }
    println!("{} properties found", result.matches.len());
    render::print_rows("Properties", &to_rows(&result.matches)?, format, args.limit)
}
