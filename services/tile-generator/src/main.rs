//! Bulk WMTS tile generation CLI.
//!
//! Walks a layer's configured bounding box at one or more zoom levels and
//! fills the local tile cache through the meta-tile worker pool.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tile_engine::{build_client, BulkGenerator, GeneratorOptions, HttpClientConfig};
use wmts_core::env::{self, LogOutput};
use wmts_core::{BBox, Config, Grid};

const DEFAULT_BUFFER_SIZE: u32 = 50;

#[derive(Parser, Debug)]
#[command(name = "tile-generator")]
#[command(about = "Save all PNG tiles of a layer for a zoom range into the local cache")]
struct Args {
    /// Layer configuration file
    #[arg(long, default_value = "wmtsConfig.yaml")]
    config: String,

    /// Layer to generate
    #[arg(long, default_value = "fonds_geo_osm_bdcad_couleur")]
    layer: String,

    /// Single zoom level to process
    #[arg(long, default_value_t = 3)]
    zoom: u32,

    /// First zoom level of a range (with --max-zoom; overrides --zoom)
    #[arg(long)]
    min_zoom: Option<u32>,

    /// Last zoom level of a range (with --min-zoom; overrides --zoom)
    #[arg(long)]
    max_zoom: Option<u32>,

    /// Number of concurrent workers
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Tiles per meta-tile side (e.g. 4 for a 4x4 block per request)
    #[arg(long, default_value_t = 4)]
    metatile: u32,

    /// Pixel buffer around rendered blocks (defaults to BUFFER_SIZE env)
    #[arg(long)]
    buffer: Option<u32>,

    /// Upstream request timeout in seconds
    #[arg(long, default_value_t = 30)]
    client_timeout: u64,

    /// Verbose output (dumps every configured layer)
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(level: Level, output: LogOutput) -> Result<()> {
    let builder = FmtSubscriber::builder().with_max_level(level);
    match output {
        LogOutput::Stdout => tracing::subscriber::set_global_default(
            builder.with_writer(std::io::stdout).finish(),
        )?,
        LogOutput::Stderr => tracing::subscriber::set_global_default(
            builder.with_writer(std::io::stderr).finish(),
        )?,
        LogOutput::Discard => tracing::subscriber::set_global_default(
            builder.with_writer(std::io::sink).finish(),
        )?,
        LogOutput::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening log file '{}'", path.display()))?;
            tracing::subscriber::set_global_default(
                builder.with_writer(std::sync::Mutex::new(file)).with_ansi(false).finish(),
            )?
        }
    }
    Ok(())
}

fn print_layer(layer: &wmts_core::LayerConfig) {
    println!("  Title: {}", layer.title);
    println!("  WMS Backend URL: {}", layer.defaults.wms_backend_url);
    println!("  WMS Backend prefix: {}", layer.defaults.wms_backend_prefix);
    println!("  WMTS BBox: {:?}", layer.defaults.wmts_bbox);
    println!("  WMTS URL prefix: {}", layer.defaults.wmts_url_prefix);
    println!("  WMTS URL Style: {}", layer.defaults.wmts_url_style);
    println!("  WMTS Dimension Year: {}", layer.defaults.wmts_dimension_year);
    println!("  WMTS Matrix Set: {}", layer.defaults.wmts_matrix_set);
    println!("  WMS Layers: {}", layer.wms_layers);
    println!("  Image Extension: {}", layer.defaults.image_extension);
    println!("  Image MIME Type: {}", layer.defaults.image_mime_type);
    println!("-------------------------------------------");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = env::log_level_from_env(Level::WARN)?;
    let output = env::log_output_from_env(LogOutput::Stderr)?;
    init_tracing(level, output)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config,
        layer = %args.layer,
        "starting tile-generator"
    );

    let config = Config::from_yaml_file(&args.config)?;
    if config.layers.is_empty() {
        bail!("no layers loaded from '{}'", args.config);
    }
    info!(count = config.layers.len(), "layers found in config");
    for (name, layer) in &config.layers {
        println!("Layer: {}", name);
        if args.verbose {
            print_layer(layer);
        }
    }

    let layer = config.layer(&args.layer)?.clone();
    let base_path = std::path::PathBuf::from(&config.caches.local.folder);

    let (zoom_min, zoom_max) = match (args.min_zoom, args.max_zoom) {
        (Some(min), Some(max)) => {
            warn!("--min-zoom/--max-zoom set, ignoring --zoom");
            if min > max {
                bail!("--min-zoom {} exceeds --max-zoom {}", min, max);
            }
            (min, max)
        }
        (None, None) => (args.zoom, args.zoom),
        _ => bail!("--min-zoom and --max-zoom must be given together"),
    };

    let buffer = match args.buffer {
        Some(buffer) => buffer,
        None => env::buffer_size_from_env(DEFAULT_BUFFER_SIZE)?,
    };

    let grid = Arc::new(Grid::lausanne(
        layer.defaults.wms_backend_url.clone(),
        layer.defaults.wms_backend_prefix.clone(),
    )?);
    let bbox = BBox::from_array(&layer.defaults.wmts_bbox)
        .with_context(|| format!("wmts_bbox of layer '{}'", args.layer))?;

    let client = build_client(&HttpClientConfig {
        timeout_secs: args.client_timeout,
        ..Default::default()
    })?;

    let generator = BulkGenerator::new(
        client,
        Arc::clone(&grid),
        layer,
        base_path,
        GeneratorOptions {
            workers: args.workers,
            meta_tile_size: args.metatile,
            buffer,
        },
    );

    // Progress over all zoom levels inside the grid's range.
    let mut total_tiles = 0u64;
    for zoom in zoom_min..=zoom_max {
        if zoom >= grid.min_zoom() && zoom <= grid.max_zoom() {
            total_tiles += generator.total_tiles(&bbox, zoom)?;
        }
    }

    let bar = ProgressBar::new(total_tiles);
    bar.set_style(
        ProgressStyle::with_template(
            "{msg} [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta})",
        )?
        .progress_chars("=>-"),
    );
    bar.set_message(format!(
        "layer {} zoom {}..={}",
        args.layer, zoom_min, zoom_max
    ));

    let progress = generator.progress();
    let bar_updater = {
        let bar = bar.clone();
        tokio::spawn(async move {
            loop {
                bar.set_position(progress.load(Ordering::Relaxed));
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        })
    };

    let report = generator.run(bbox, zoom_min, zoom_max).await?;

    bar_updater.abort();
    bar.set_position(generator.progress().load(Ordering::Relaxed));
    bar.finish();

    if report.meta_tiles_failed > 0 {
        warn!(
            failed = report.meta_tiles_failed,
            "some meta-tiles failed; re-run to fill the gaps"
        );
    }
    info!(tiles = report.tiles_done, "all tiles processed");
    println!(
        "Done: {} tiles written, {} meta-tiles failed",
        report.tiles_done, report.meta_tiles_failed
    );
    Ok(())
}
