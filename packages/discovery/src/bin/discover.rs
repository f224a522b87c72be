//! Developer CLI for running a discovery search
//!
//! Reads user profiles from a JSON file (or calls a remote directory), geocodes
//! the home place through Nominatim, runs one search and optionally loads more
//! pages.

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use discovery::geocoding::{NominatimGeocoder, RateLimitedGeocoder};
use discovery::{
    DiscoveryConfig, DiscoveryOrchestrator, GeoCoordinates, GeocodeCache, GeocodingConfig,
    HomeLocation, HttpDirectory, MemoryDirectory, SearchFilters, SearchOutcome,
    SessionSnapshot, UserDirectory, UserProfile,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "discover")]
#[command(about = "Run a geo-expanding user discovery search")]
struct Cli {
    /// JSON file with an array of user profiles
    #[arg(long, conflicts_with = "endpoint")]
    users: Option<PathBuf>,

    /// Remote discoverUsers endpoint instead of a local file
    #[arg(long, env = "DISCOVERY_ENDPOINT")]
    endpoint: Option<String>,

    /// ID token for the remote endpoint
    #[arg(long, env = "DISCOVERY_ID_TOKEN", requires = "endpoint")]
    id_token: Option<String>,

    /// Home place name to geocode (e.g. "Utrecht, NL")
    #[arg(long)]
    home: Option<String>,

    /// Home coordinates as LAT,LNG (skips geocoding)
    #[arg(long, value_parser = parse_coordinates, conflicts_with = "home")]
    coords: Option<GeoCoordinates>,

    /// Exclude this uid from local results (the searching user)
    #[arg(long)]
    exclude: Option<String>,

    #[arg(long)]
    max_distance_km: Option<u32>,

    #[arg(long)]
    min_age: Option<u32>,

    #[arg(long)]
    max_age: Option<u32>,

    #[arg(long)]
    event_type: Option<String>,

    /// Additional pages to load after the first
    #[arg(long, default_value_t = 0)]
    more: usize,

    /// Print the final session as JSON
    #[arg(long)]
    json: bool,
}

fn parse_coordinates(value: &str) -> Result<GeoCoordinates, String> {
    let (lat, lng) = value
        .split_once(',')
        .ok_or_else(|| "expected LAT,LNG".to_string())?;
    let lat = lat.trim().parse().map_err(|_| format!("invalid latitude: {lat}"))?;
    let lng = lng.trim().parse().map_err(|_| format!("invalid longitude: {lng}"))?;
    Ok(GeoCoordinates::new(lat, lng))
}

fn load_directory(cli: &Cli) -> Result<Arc<dyn UserDirectory>> {
    if let Some(endpoint) = &cli.endpoint {
        let mut directory = HttpDirectory::new(endpoint);
        if let Some(token) = &cli.id_token {
            directory = directory.with_id_token(token);
        }
        return Ok(Arc::new(directory));
    }

    let Some(path) = &cli.users else {
        bail!("either --users or --endpoint is required");
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let profiles: Vec<UserProfile> =
        serde_json::from_str(&raw).context("Failed to parse user profiles")?;
    tracing::info!(count = profiles.len(), "Loaded user profiles");

    let mut directory = MemoryDirectory::with_profiles(profiles);
    if let Some(uid) = &cli.exclude {
        directory = directory.excluding(uid);
    }
    Ok(Arc::new(directory))
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    println!(
        "{} user(s) within {}km (expansions: {}, more available: {})",
        snapshot.results.len(),
        snapshot.current_radius_km,
        snapshot.expansion_attempt,
        snapshot.has_more
    );
    for found in &snapshot.results {
        let name = found.user.display_name.as_deref().unwrap_or("-");
        match found.distance_km {
            Some(distance) => println!("  {:<24} {:<20} {:>8.1} km", found.uid(), name, distance),
            None => println!("  {:<24} {:<20} {:>11}", found.uid(), name, "?"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,discovery=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = DiscoveryConfig::from_env().context("Failed to load discovery configuration")?;
    let geo_config = GeocodingConfig::from_env().context("Failed to load geocoding configuration")?;

    let requests_per_second = NonZeroU32::new(geo_config.requests_per_second)
        .context("GEOCODER_REQUESTS_PER_SECOND must be greater than zero")?;
    let cache_ttl = geo_config.cache_ttl;
    let provider = RateLimitedGeocoder::new(NominatimGeocoder::new(geo_config), requests_per_second);
    let geocoder = Arc::new(GeocodeCache::new(Arc::new(provider)).with_ttl(cache_ttl));

    let directory = load_directory(&cli)?;
    let orchestrator = DiscoveryOrchestrator::new(directory, geocoder.clone(), config);

    if let Some(coordinates) = cli.coords {
        orchestrator.set_home_location(HomeLocation::new("(coordinates)", coordinates));
    } else if let Some(home) = cli.home.as_deref().map(str::trim) {
        match geocoder.resolve(home).await {
            Some(coordinates) => {
                orchestrator.set_home_location(HomeLocation::new(home, coordinates));
            }
            None => tracing::warn!(home = %home, "Could not geocode home; searching without distance"),
        }
    }

    let filters = SearchFilters {
        max_distance_km: cli.max_distance_km,
        min_age: cli.min_age,
        max_age: cli.max_age,
        event_type_id: cli.event_type.clone(),
    };

    let mut outcome = orchestrator
        .search(filters)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    for _ in 0..cli.more {
        match orchestrator.load_more().await {
            Ok(SearchOutcome::Skipped) => break,
            Ok(next) => outcome = next,
            Err(e) => bail!(e.user_message()),
        }
    }

    let snapshot = match outcome {
        SearchOutcome::Completed(snapshot) => snapshot,
        _ => orchestrator.snapshot(),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }

    Ok(())
}
