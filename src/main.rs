use chrono::Datelike;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod idw;
mod layer;
mod model;
mod render;
mod season;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "sewershed-capture")]
#[command(about = "Stormwater capture and water-quality analysis for combined sewer areas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map the rain height each sewershed's green infrastructure can manage.
    RainHeight {
        /// Green infrastructure assets (GeoJSON or shapefile).
        #[arg(long)]
        assets: PathBuf,

        #[arg(long)]
        sewersheds: PathBuf,

        /// Combined sewer drainage areas.
        #[arg(long)]
        csa: PathBuf,

        #[arg(short = 'o', long)]
        out: PathBuf,

        /// JSON settings (column names, status marker, overlap policy).
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum)]
        overlap: Option<config::OverlapPolicy>,
    },

    /// Create (or drop) per-year/per-season water-quality tables.
    SeasonTables {
        #[arg(long, default_value = "localhost")]
        host: String,

        #[arg(long, default_value_t = 5432)]
        port: u16,

        #[arg(long, default_value = "postgres")]
        user: String,

        #[arg(long, env = "PGPASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[arg(long, default_value = "alu")]
        database: String,

        #[arg(long, default_value = "nyc")]
        schema: String,

        #[arg(long, default_value = "wq_o2perc_season")]
        source_table: String,

        #[arg(long, default_value = "o2perc")]
        table_prefix: String,

        /// A season needs strictly more samples than this.
        #[arg(long, default_value_t = 20)]
        min_samples: u32,

        #[arg(long, default_value_t = 2000)]
        first_year: i32,

        /// Defaults to the current year.
        #[arg(long)]
        last_year: Option<i32>,

        /// Drop the tables instead of creating them.
        #[arg(long)]
        drop: bool,
    },

    /// Interpolate each sample layer with IDW and clip it to a coastline mask.
    Idw {
        /// Mask layer; its extent fixes the output grid.
        #[arg(long)]
        mask: PathBuf,

        /// Directory of point layers forming the group.
        #[arg(long)]
        samples_dir: PathBuf,

        #[arg(long, default_value = "o2perc_by_season")]
        group: String,

        #[arg(long)]
        attribute: String,

        #[arg(long)]
        out_dir: PathBuf,

        #[arg(long, default_value_t = 100.0)]
        resolution: f64,

        #[arg(long, default_value_t = 2.0)]
        power: f64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::RainHeight {
            assets,
            sewersheds,
            csa,
            out,
            config,
            overlap,
        } => {
            // 1) Settings: file (if any), then CLI overrides.
            let mut settings = match config {
                Some(path) => config::Settings::load(&path)?,
                None => config::Settings::default(),
            };
            if let Some(policy) = overlap {
                settings.overlap = policy;
            }

            // 2) Load layers.
            let asset_layer = layer::read_layer(
                &assets,
                &[
                    settings.asset_id_column.as_str(),
                    settings.capacity_column.as_str(),
                    settings.status_column.as_str(),
                ],
            )?;
            let sewershed_layer = layer::read_layer(&sewersheds, &[settings.sewershed_key_column.as_str()])?;
            let csa_layer = layer::read_layer(&csa, &[settings.csa_key_column.as_str()])?;

            // 3) Aggregate.
            let summaries =
                model::build_rain_heights(&asset_layer, &sewershed_layer, &csa_layer, &settings)?;
            for s in &summaries {
                tracing::info!(
                    sewershed = %s.key,
                    volume = s.total_captured_volume,
                    cso_area = s.cso_area,
                    label = %model::rain_height_label(s.rain_height),
                    "rain height"
                );
            }

            // 4) Render HTML.
            let view =
                render::build_map_view(&sewershed_layer, &settings.sewershed_key_column, &summaries);
            let html = render::render_html_map(&view)?;
            std::fs::write(&out, html)?;
            println!("Wrote {}", out.display());
        }

        Commands::SeasonTables {
            host,
            port,
            user,
            password,
            database,
            schema,
            source_table,
            table_prefix,
            min_samples,
            first_year,
            last_year,
            drop,
        } => {
            let db = season::DbConfig {
                host,
                port,
                user,
                password,
                database,
            };
            let spec = season::TableSpec {
                schema,
                source_table,
                table_prefix,
                min_samples,
            };
            let last_year = last_year.unwrap_or_else(|| chrono::Local::now().year());
            let plan = season::build_plan(first_year, last_year);

            let session = season::PgSession::open(&db)?;
            let report = season::run_in(session, &spec, &plan, drop)?;
            println!(
                "Created {}, skipped {}, dropped {} tables",
                report.created.len(),
                report.skipped.len(),
                report.dropped.len()
            );
        }

        Commands::Idw {
            mask,
            samples_dir,
            group,
            attribute,
            out_dir,
            resolution,
            power,
        } => {
            let mut host = idw::NativeHost::from_files(&mask, &group, &samples_dir, &attribute)?;
            let mask_layer = mask
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let options = idw::IdwOptions {
                mask_layer,
                group,
                attribute,
                resolution,
                power,
                out_dir,
            };
            let outputs = idw::run_batch(&mut host, &options)?;
            for o in &outputs {
                println!(
                    "{}: wrote {} and {}",
                    o.layer,
                    o.raster.display(),
                    o.clipped.display()
                );
            }
            println!("Registered {} raster layers", host.rasters().len());
        }
    }

    Ok(())
}
