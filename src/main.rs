//! polymap command line entry point.
//!
//! ```text
//! polymap query <polygon.geojson>
//! polymap sync <polygon.geojson> [name]
//! polymap config [--write]
//! ```

use std::error::Error;
use std::path::Path;
use std::rc::Rc;

use geojson::{FeatureCollection, GeoJson, Geometry};
use polymap::model::{FeaturesChangeEvent, SyncFailure, TaggedFeature};
use polymap::{
    AppConfig, FeatureQuery, FixedName, MemoryDraw, OverpassClient, PolygonFeatureSync, SyncDriver,
};
use polymap_map::InMemorySurface;
use tokio::sync::Notify;

const USAGE: &str = "usage: polymap <query FILE | sync FILE [NAME] | config [--write]>";

type CliResult<T> = Result<T, Box<dyn Error>>;

fn main() {
    let config = AppConfig::load_from_default_path()
        .unwrap_or_default()
        .with_env_overrides();

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["query", path] => run_query(&config, Path::new(path)),
        ["sync", path] => run_sync(&config, Path::new(path), None),
        ["sync", path, name] => run_sync(&config, Path::new(path), Some(*name)),
        ["config"] => print_config(&config, false),
        ["config", "--write"] => print_config(&config, true),
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Read the polygon to query from a GeoJSON file. Accepts a bare geometry,
/// a feature, or the first feature of a collection.
fn load_polygon(path: &Path) -> CliResult<Geometry> {
    let text = std::fs::read_to_string(path)?;
    let geometry = match text.parse::<GeoJson>()? {
        GeoJson::Geometry(geometry) => Some(geometry),
        GeoJson::Feature(feature) => feature.geometry,
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .find_map(|feature| feature.geometry),
    };
    geometry.ok_or_else(|| format!("{} contains no geometry", path.display()).into())
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn run_query(config: &AppConfig, path: &Path) -> CliResult<()> {
    let polygon = load_polygon(path)?;
    let client = OverpassClient::new(&config.overpass, &config.sync.category_key)?;
    log::info!("Querying {}", client.endpoint());

    let features = runtime()?.block_on(client.query_features(&polygon))?;
    let collection = FeatureCollection {
        bbox: None,
        features: features.iter().map(TaggedFeature::to_geojson).collect(),
        foreign_members: None,
    };
    println!("{}", serde_json::to_string_pretty(&collection)?);
    Ok(())
}

fn run_sync(config: &AppConfig, path: &Path, name: Option<&str>) -> CliResult<()> {
    let polygon = load_polygon(path)?;
    let client = OverpassClient::new(&config.overpass, &config.sync.category_key)?;
    let names = FixedName::new(name.unwrap_or(&config.sync.default_name));

    let draw = MemoryDraw::new();
    let sync = PolygonFeatureSync::new(InMemorySurface::new(), draw.clone(), config.sync_settings());

    // Signalled whenever the polygon settles, successfully or not.
    let settled = Rc::new(Notify::new());
    let notify = Rc::clone(&settled);
    sync.features_change().add(move |event: &FeaturesChangeEvent| {
        match serde_json::to_string(event) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to encode change event: {}", e),
        }
        notify.notify_one();
    });
    let notify = Rc::clone(&settled);
    sync.sync_failed().add(move |failure: &SyncFailure| {
        eprintln!("{:?} {}: {}", failure.kind, failure.id, failure.reason);
        notify.notify_one();
    });

    let (driver, handle) = SyncDriver::new(sync, client, names);
    let local = tokio::task::LocalSet::new();
    let sync = runtime()?.block_on(local.run_until(async move {
        let run = tokio::task::spawn_local(driver.run());

        let created = draw.insert(polygon);
        handle.draw_event(created)?;

        settled.notified().await;
        for id in draw.ids() {
            handle.delete_draw(id)?;
        }
        drop(handle);

        Ok::<_, Box<dyn Error>>(run.await?)
    }))?;

    log::info!(
        "Sync finished: {} records, draw controller holds {} polygons",
        sync.len(),
        sync.draw().ids().len()
    );
    Ok(())
}

fn print_config(config: &AppConfig, write: bool) -> CliResult<()> {
    println!("{}", config.to_json()?);
    if write {
        let path = config.save_to_default_path()?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}
