use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use nearcity::config::Settings;
use nearcity::{CityCatalog, FilterCache, LocationQuery, NearbyCityPipeline, RadiusResolver, StalenessPolicy};

#[derive(Parser)]
#[command(name = "nearcity", about = "Nearby-city lookups and buyer filters")]
struct Cli {
    /// City dataset (.json records or .bin snapshot); overrides CITY_DATASET_PATH
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cities within a radius, via the full fallback chain
    Nearby {
        city: String,
        state: String,
        #[arg(long)]
        radius: Option<f64>,
        /// Street address to geocode if the name lookup fails
        #[arg(long)]
        address: Option<String>,
    },
    /// Generate the stored filter for a buyer location
    Filter {
        city: String,
        state: String,
        #[arg(long)]
        radius: Option<f64>,
    },
    /// Distance between two catalog cities
    Distance {
        from_city: String,
        from_state: String,
        to_city: String,
        to_state: String,
    },
    /// Search city names
    Search {
        query: String,
        #[arg(long)]
        state: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Catalog statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // `.env` is applied before any runtime thread exists.
    dotenvy::dotenv().ok();
    let settings = Settings::from_lookup(|key| match (key, &cli.dataset) {
        ("CITY_DATASET_PATH", Some(path)) => Ok(path.display().to_string()),
        _ => std::env::var(key),
    })
    .context("loading settings")?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting tokio runtime")?
        .block_on(run(cli.command, settings))
}

async fn run(command: Command, settings: Settings) -> anyhow::Result<()> {
    let catalog = CityCatalog::load(&settings.dataset_path)
        .with_context(|| format!("loading city dataset {}", settings.dataset_path.display()))?;
    let catalog = nearcity::catalog::init_global(catalog);
    let resolver = RadiusResolver::new(Arc::clone(&catalog));

    let mut pipeline = NearbyCityPipeline::new(resolver.clone(), settings.pipeline_config());
    if let Some(geocoder) = settings.build_geocoder().context("building geocoder")? {
        pipeline = pipeline.with_geocoder(geocoder);
    }

    match command {
        Command::Nearby {
            city,
            state,
            radius,
            address,
        } => {
            let mut query = LocationQuery::new(city, state);
            if let Some(address) = address {
                query = query.with_address(address);
            }
            let outcome = pipeline
                .resolve(&query, radius.unwrap_or(settings.default_radius_miles))
                .await;

            if outcome.is_failed() {
                println!("No nearby cities found");
            } else {
                println!(
                    "{} cities within {} miles (source: {:?}{})",
                    outcome.cities.len(),
                    outcome.radius_miles,
                    outcome.source(),
                    if outcome.escalated { ", escalated" } else { "" }
                );
                for found in &outcome.cities {
                    println!("  {:<30} {:>6.1} mi", found.city.name, found.distance_miles);
                }
            }
        }
        Command::Filter { city, state, radius } => {
            let cache = FilterCache::new(
                pipeline,
                StalenessPolicy::with_max_age_days(settings.filter_max_age_days),
            );
            let filter = cache
                .generate(&city, &state, radius.unwrap_or(settings.default_radius_miles))
                .await;
            println!("{}", serde_json::to_string_pretty(&filter)?);
            println!("{}", nearcity::filter::stats(Some(&filter)));
        }
        Command::Distance {
            from_city,
            from_state,
            to_city,
            to_state,
        } => match resolver.distance_between(&from_city, &from_state, &to_city, &to_state) {
            Some(miles) => println!("{miles} miles"),
            None => println!("Unknown city"),
        },
        Command::Search { query, state, limit } => {
            for city in catalog.search(&query, state.as_deref(), limit) {
                println!("{}, {} ({}, {})", city.name, city.state, city.lat, city.lng);
            }
        }
        Command::Stats => {
            let stats = catalog.stats();
            println!("Total cities: {}", stats.total_cities);
            println!("States: {}", stats.cities_by_state.len());
            for (state, count) in &stats.largest_states {
                println!("  {state}: {count}");
            }
        }
    }

    Ok(())
}
