use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use immoscope_core::choropleth;
use immoscope_core::{AppConfig, Loader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Immoscope administrative tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write commune boundaries annotated with the number of properties sold
    GeojsonSales(GeojsonSalesArgs),
    /// List the source files the configuration resolves to
    Sources(SourcesArgs),
}

#[derive(Args, Debug)]
struct GeojsonSalesArgs {
    /// Commune boundaries (GeoJSON FeatureCollection with a `code` property)
    #[arg(long)]
    geojson: PathBuf,
    /// Annotated output file
    #[arg(long)]
    output: PathBuf,
    /// Raw sales CSV with a `code_commune` column, one row per sale
    #[arg(long, conflicts_with = "from_data")]
    sales: Option<PathBuf>,
    /// Count sales from the cleaned Parquet sources instead of a CSV
    #[arg(long)]
    from_data: bool,
    /// TOML configuration used with --from-data
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct SourcesArgs {
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::GeojsonSales(args) => handle_geojson_sales(args),
        Command::Sources(args) => handle_sources(args),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let path = path.or_else(|| env::var_os("IMMOSCOPE_CONFIG").map(PathBuf::from));
    let mut config = AppConfig::load(path.as_deref())
        .with_context(|| format!("failed to load configuration {path:?}"))?;
    if let Some(dir) = env::var_os("IMMOSCOPE_DATA_DIR") {
        config.data.dir = PathBuf::from(dir);
    }
    Ok(config)
}

fn handle_geojson_sales(args: GeojsonSalesArgs) -> Result<()> {
    let counts = match (&args.sales, args.from_data) {
        (Some(path), false) => choropleth::sales_by_commune_csv(path)
            .with_context(|| format!("failed to count sales in {}", path.display()))?,
        (None, true) => {
            let config = load_config(args.config.clone())?;
            let outcome = Loader::from_config(&config)
                .load()
                .context("failed to load transaction data")?;
            choropleth::sales_by_commune(&outcome.table)
        }
        _ => bail!("pass exactly one of --sales <csv> or --from-data"),
    };

    let mut collection = choropleth::read_feature_collection(&args.geojson)?;
    let summary = choropleth::annotate_properties_sold(&mut collection, &counts);
    choropleth::write_feature_collection(&args.output, &collection)?;

    info!(
        features = summary.features,
        matched = summary.matched,
        properties_sold = summary.properties_sold,
        "annotated commune boundaries"
    );
    println!(
        "Wrote {} ({} of {} communes with sales, {} properties sold).",
        args.output.display(),
        summary.matched,
        summary.features,
        summary.properties_sold
    );
    Ok(())
}

fn handle_sources(args: SourcesArgs) -> Result<()> {
    let config = load_config(args.config)?;
    let paths = config.sources().resolve()?;

    if paths.is_empty() {
        println!("No source files found under {}.", config.data.dir.display());
        return Ok(());
    }
    println!("Found {} source files:", paths.len());
    for path in &paths {
        println!("  {}", path.display());
    }
    Ok(())
}
