use std::{path::PathBuf, sync::mpsc, thread};

use clap::{Parser, Subcommand};
use egui::Vec2;
use wayfarer::{
    Coordinate, PositionSource, WatchEvent, WayfarerError,
    geolocation::{gpsd::{DEFAULT_GPSD_ADDRESS, GpsdSource}, replay::ReplaySource},
    ui::track::{TrackerApp, config::{AppConfig, parse_landmark}, controller::SourceFactory},
    writer,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch live positions from a gpsd daemon
    Track {
        #[arg(short, long, default_value = DEFAULT_GPSD_ADDRESS)]
        gpsd: String,

        /// Record the watch events to a JSONL trace file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Landmark for the distance readout, as "latitude,longitude"
        #[arg(short, long)]
        landmark: Option<String>,
    },
    /// Replay a recorded trace file
    Replay {
        #[arg(short, long)]
        input: PathBuf,

        /// Landmark for the distance readout, as "latitude,longitude"
        #[arg(short, long)]
        landmark: Option<String>,
    },
}

fn run_app(
    source_factory: SourceFactory,
    output: Option<PathBuf>,
    landmark_override: Option<Coordinate>,
) -> Result<(), WayfarerError> {
    let (event_tx, event_rx) = mpsc::channel::<WatchEvent>();

    // when recording, the watcher sends to both the UI and writer channels
    let trace_tx = if let Some(output_file) = output {
        let (trace_tx, trace_rx) = mpsc::channel::<WatchEvent>();
        thread::spawn(move || writer::write_trace(&output_file, trace_rx));
        Some(trace_tx)
    } else {
        None
    };

    let app_config = AppConfig::from_local_file().unwrap_or_default();
    let window_position = app_config.window_position.clone();

    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_inner_size(Vec2::new(900., 700.))
        .with_position(window_position);

    eframe::run_native(
        "Wayfarer",
        native_options,
        Box::new(|cc| {
            Ok(Box::new(TrackerApp::new(
                source_factory,
                event_rx,
                event_tx,
                trace_tx,
                app_config,
                landmark_override,
                cc,
            )))
        }),
    )
    .expect("could not start app");
    Ok(())
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");
    match &cli.command {
        Commands::Track {
            gpsd,
            output,
            landmark,
        } => {
            let landmark = landmark
                .as_deref()
                .map(parse_landmark)
                .transpose()
                .expect("Invalid landmark value");
            let address = gpsd.clone();
            let factory: SourceFactory = Box::new(move || {
                Ok(Box::new(GpsdSource::new(&address)?) as Box<dyn PositionSource + Send>)
            });
            run_app(factory, output.clone(), landmark).expect("Error while tracking positions");
        }
        Commands::Replay { input, landmark } => {
            let landmark = landmark
                .as_deref()
                .map(parse_landmark)
                .transpose()
                .expect("Invalid landmark value");
            let input_path = input.clone();
            let factory: SourceFactory = Box::new(move || {
                Ok(Box::new(ReplaySource::from_file(&input_path)?) as Box<dyn PositionSource + Send>)
            });
            run_app(factory, None, landmark).expect("Error while replaying trace");
        }
    };
}
