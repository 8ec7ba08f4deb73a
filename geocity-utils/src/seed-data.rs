use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geocity_utils::{seed, settings, SourceFetcher, SourceFetcherSettings, SourcesMetadata};

use clap::Parser;

/// Fetch geonames dumps, seed city data and query it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
enum Args {
    Fetch(Fetch),
    Seed(Seed),
    Nearest(Nearest),
    Suggest(Suggest),
    City(CityArgs),
    Languages(Languages),
}

/// Download geonames dumps
#[derive(clap::Args, Debug)]
#[command(version, about)]
struct Fetch {
    /// Source directory, overrides SEEDER_SOURCE_DIR
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Download even if ETags are unchanged
    #[arg(short, long)]
    force: bool,
}

/// Parse dumps and write JSON lines tables
#[derive(clap::Args, Debug)]
#[command(version, about)]
struct Seed {
    /// Source directory, overrides SEEDER_SOURCE_DIR
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Translations per batch
    #[arg(short, long)]
    batch_size: Option<i64>,

    /// Minimum city population
    #[arg(short, long)]
    min_population: Option<u64>,

    /// Languages, comma separated
    #[arg(short, long)]
    languages: Option<String>,
}

/// Find the nearest city in seeded data
#[derive(clap::Args, Debug)]
#[command(version, about)]
struct Nearest {
    /// Seeded data directory
    #[arg(short, long)]
    data: PathBuf,

    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Language of names
    #[arg(short, long, default_value = "en")]
    lang: String,
}

/// Search cities by name
#[derive(clap::Args, Debug)]
#[command(version, about)]
struct Suggest {
    /// Seeded data directory
    #[arg(short, long)]
    data: PathBuf,

    /// Part of a city name in any language
    #[arg(short, long)]
    query: String,

    /// Language of names
    #[arg(short, long, default_value = "en")]
    lang: String,

    #[arg(short = 'n', long, default_value_t = 10)]
    limit: usize,
}

/// Show a city by geonames id
#[derive(clap::Args, Debug)]
#[command(version, about)]
struct CityArgs {
    /// Seeded data directory
    #[arg(short, long)]
    data: PathBuf,

    #[arg(short, long)]
    id: u32,

    /// Language of names
    #[arg(short, long, default_value = "en")]
    lang: String,
}

/// List languages of seeded translations
#[derive(clap::Args, Debug)]
#[command(version, about)]
struct Languages {
    /// Seeded data directory
    #[arg(short, long)]
    data: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer());
    subscriber.init();

    match Args::parse() {
        Args::Fetch(args) => {
            let mut settings =
                settings::load().map_err(|e| anyhow::anyhow!("Failed to load settings: {e}"))?;
            if let Some(dir) = args.dir {
                settings.source_dir = dir;
            }

            let fetcher = SourceFetcher::new(SourceFetcherSettings::default())?;

            if !args.force {
                if let Some(metadata) = SourcesMetadata::load(&settings.source_dir)? {
                    let has_updates = fetcher
                        .has_updates(&metadata)
                        .await
                        .map_err(|e| anyhow::anyhow!("Failed to check updates: {e}"))?;
                    if !has_updates {
                        tracing::info!("Sources are up to date");
                        return Ok(());
                    }
                }
            }

            fetcher
                .fetch_all(&settings.source_dir)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to fetch sources: {e}"))?;
        }

        Args::Seed(args) => {
            let mut settings =
                settings::load().map_err(|e| anyhow::anyhow!("Failed to load settings: {e}"))?;
            if let Some(dir) = args.dir {
                settings.source_dir = dir;
            }
            if let Some(batch_size) = args.batch_size {
                settings.batch_size = batch_size;
            }
            if let Some(min_population) = args.min_population {
                settings.min_population = min_population;
            }
            if let Some(languages) = &args.languages {
                settings.allowed_languages = settings::parse_languages(languages);
            }

            tracing::info!("Seed with {settings:?}");

            let report = seed::run(&settings, &args.output)?;

            tracing::info!(
                "Seeded {} countries, {} cities, {} city translations, {} country translations",
                report.countries,
                report.cities,
                report.names.city_translations,
                report.names.country_translations,
            );
        }

        Args::Nearest(args) => {
            let catalog = seed::load_catalog(&args.data)?;
            let item = catalog
                .nearest((args.lat, args.lon), &args.lang)
                .ok_or_else(|| anyhow::anyhow!("No cities in {}", args.data.display()))?;

            println!("{}", serde_json::to_string(&item)?);
        }

        Args::Suggest(args) => {
            let catalog = seed::load_catalog(&args.data)?;
            let items = catalog.suggest(&args.query, &args.lang, args.limit)?;

            println!("{}", serde_json::to_string(&items)?);
        }

        Args::City(args) => {
            let catalog = seed::load_catalog(&args.data)?;
            let item = catalog
                .city(args.id, &args.lang)
                .ok_or_else(|| anyhow::anyhow!("City {} not found", args.id))?;

            println!("{}", serde_json::to_string(&item)?);
        }

        Args::Languages(args) => {
            let catalog = seed::load_catalog(&args.data)?;

            println!("{}", serde_json::to_string(&catalog.languages())?);
        }
    };

    Ok(())
}
