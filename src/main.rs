use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::{info, warn};
use tracksmith::{AssemblerConfig, TrackModel, TracksmithError, load_track, writer};
use uom::si::length::kilometer;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble a track document and print a summary of the model
    Inspect {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        zoom: Option<u8>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Assemble a track document and write the model as JSON
    Export {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        zoom: Option<u8>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>, zoom: Option<u8>) -> Result<AssemblerConfig, TracksmithError> {
    let mut config = match path {
        Some(path) => AssemblerConfig::from_path(path)?,
        None => AssemblerConfig::from_local_file()?.unwrap_or_default(),
    };
    if let Some(zoom) = zoom {
        config.zoom = zoom;
    }
    Ok(config)
}

fn assemble(input: &Path, config: AssemblerConfig) -> Result<TrackModel, TracksmithError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TracksmithError::RuntimeError { source: e })?;
    runtime.block_on(load_track(input, config))
}

fn print_summary(model: &TrackModel) {
    let (width, height) = model.dimensions;
    println!(
        "Track: {} points ({}), {:.3} km",
        model.track.len(),
        if model.track.closed { "closed" } else { "open" },
        model.track_length().get::<kilometer>()
    );
    match &model.pit {
        Some(pit) => println!("Pit lane: {} points", pit.len()),
        None => println!("Pit lane: none"),
    }
    println!("Zoom {}, dimensions {:.1} x {:.1} px", model.zoom(), width, height);
    println!("Start/finish at index {}", model.start_finish_index);
    println!(
        "Grid slots: {}, pit-stop slots: {}",
        model.grid_slots.len(),
        model.pit_stop_slots.len()
    );

    println!("Sectors: {}", model.sectors.len());
    for sector in &model.sectors {
        println!(
            "  {}: {} -> {} ({} points)",
            sector.id,
            sector.start,
            sector.end,
            sector.center.len()
        );
    }

    println!("DRS zones: {}", model.drs.len());
    for zone in &model.drs {
        println!(
            "  detect {} start {} finish {} ({} points)",
            zone.detect,
            zone.start,
            zone.finish,
            zone.center.len()
        );
    }

    if !model.diagnostics.is_empty() {
        println!("Diagnostics: {}", model.diagnostics.len());
        for diagnostic in &model.diagnostics {
            println!("  {}", diagnostic);
        }
    }
}

fn inspect(
    input: &Path,
    zoom: Option<u8>,
    config: Option<&Path>,
) -> Result<(), TracksmithError> {
    let config = load_config(config, zoom)?;
    let model = assemble(input, config)?;
    print_summary(&model);
    Ok(())
}

fn export(
    input: &Path,
    output: &Path,
    zoom: Option<u8>,
    config: Option<&Path>,
) -> Result<(), TracksmithError> {
    let config = load_config(config, zoom)?;
    let model = assemble(input, config)?;
    if !model.diagnostics.is_empty() {
        warn!(
            "Exporting track with {} diagnostics",
            model.diagnostics.len()
        );
    }
    writer::write_model(output, &model)?;
    info!("Wrote track model to {:?}", output);
    Ok(())
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    let result = match &cli.command {
        Commands::Inspect {
            input,
            zoom,
            config,
        } => inspect(input, *zoom, config.as_deref()),
        Commands::Export {
            input,
            output,
            zoom,
            config,
        } => export(input, output, *zoom, config.as_deref()),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
