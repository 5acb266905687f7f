use chargemap_ingest::cache::DatasetCache;
use chargemap_ingest::config::Config;
use chargemap_ingest::db::Repository;
use chargemap_ingest::fetcher::Fetcher;
use chargemap_ingest::models::{PointsCategory, PowerRange};
use chargemap_ingest::normalize::Normalizer;
use chargemap_ingest::{loader, report, writer};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "chargemap-ingest", about = "EV charging station ingestion and normalization")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config/config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download stations from Open Charge Map and write the data file
    Fetch,
    /// Normalize the data file and insert the stations into PostgreSQL
    Export,
    /// Print statistics for the data file, optionally filtered
    Summary {
        /// Only stations in this city (after normalization)
        #[arg(long)]
        city: Option<String>,
        /// Total power ranges to keep: 0-50, 51-100, 100+
        #[arg(long = "power-range", value_parser = parse_power_range)]
        power_ranges: Vec<PowerRange>,
        /// Point buckets to keep: "1 point", "2 points", "3-4 points", "5+ points"
        #[arg(long = "points", value_parser = parse_points_category)]
        points_categories: Vec<PointsCategory>,
        /// List the cities available for --city and exit
        #[arg(long)]
        list_cities: bool,
    },
}

fn parse_power_range(s: &str) -> Result<PowerRange, String> {
    PowerRange::parse(s).ok_or_else(|| format!("unknown power range '{}'", s))
}

fn parse_points_category(s: &str) -> Result<PointsCategory, String> {
    PointsCategory::parse(s).ok_or_else(|| format!("unknown points category '{}'", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,chargemap_ingest=debug,sqlx=warn")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration: {}\n\n\
             Make sure:\n\
             1. {} exists\n\
             2. All required environment variables are set (check .env.example)\n\
             3. Create a .env file if needed",
            e,
            cli.config.display()
        )
    })?;
    info!("Configuration loaded");

    match cli.command {
        Command::Fetch => fetch(&config).await,
        Command::Export => export(&config).await,
        Command::Summary {
            city,
            power_ranges,
            points_categories,
            list_cities,
        } => {
            summary(&config, city, power_ranges, points_categories, list_cities);
            Ok(())
        }
    }
}

async fn fetch(config: &Config) -> anyhow::Result<()> {
    let fetcher = Fetcher::new(&config.source)?;
    let fetched_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let records = fetcher.fetch_stations(&fetched_at).await.map_err(|e| {
        anyhow::anyhow!("Could not fetch charging stations, no data file written: {}", e)
    })?;

    writer::save_json(&config.data.json_path, &records)?;
    if let Some(csv_path) = &config.data.csv_path {
        writer::save_csv(csv_path, &records)?;
    }

    Ok(())
}

async fn export(config: &Config) -> anyhow::Result<()> {
    let database = config.require_database()?;

    let records = loader::load_records(&config.data.json_path)?;
    let (stations, _) = Normalizer::normalize(&records);

    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .connect(&database.connection_string())
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to connect to database: {}\n\n\
                 Host: {}:{}\n\
                 Database: {}\n\
                 User: {}\n\n\
                 Common fixes:\n\
                 1. Ensure PostgreSQL is running\n\
                 2. Check username/password are correct (DB_USER, DB_PASSWORD)\n\
                 3. Verify database exists: createdb {}\n\
                 4. Check host and port (DB_HOST, DB_PORT)",
                e,
                database.host,
                database.port,
                database.name,
                database.user,
                database.name
            )
        })?;

    info!(
        "Connected to database: {}@{}:{}/{}",
        database.user, database.host, database.port, database.name
    );

    let repository = Repository::new(pool);
    repository.run_migrations().await?;

    let result = repository.insert_stations(&stations).await?;
    let total = repository.count_stations().await?;
    info!(
        "{} stations inserted, {} skipped, {} now in table",
        result.inserted, result.skipped, total
    );

    Ok(())
}

fn summary(
    config: &Config,
    city: Option<String>,
    power_ranges: Vec<PowerRange>,
    points_categories: Vec<PointsCategory>,
    list_cities: bool,
) {
    let mut filter = match config.filter.to_station_filter() {
        Ok(filter) => filter,
        Err(e) => {
            warn!("Ignoring configured filter: {}", e);
            Default::default()
        }
    };
    if city.is_some() {
        filter.city = city.filter(|c| !c.eq_ignore_ascii_case("all"));
    }
    if !power_ranges.is_empty() {
        filter.power_ranges = power_ranges;
    }
    if !points_categories.is_empty() {
        filter.points_categories = points_categories;
    }

    let mut cache = DatasetCache::new();
    let dataset = match cache.load(&config.data.json_path) {
        Ok(dataset) => dataset.clone(),
        Err(e) => {
            error!("Could not load charging stations data: {}", e);
            println!(
                "Could not load charging stations data from '{}'. \
                 Run `chargemap-ingest fetch` first or check the file permissions.",
                config.data.json_path.display()
            );
            Default::default()
        }
    };

    if list_cities {
        for city in dataset.cities() {
            println!("{}", city);
        }
        return;
    }

    print!("{}", report::render_summary(&dataset, &filter));
}
