use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use fyreware::{Config, Playlist};

/// Audio-reactive fireworks.
#[derive(Parser)]
#[command(name = "fyreware")]
#[command(version)]
#[command(about = "Launch fireworks in time with a song")]
struct Cli {
    /// Song file, or a directory to play every song in
    song: Option<PathBuf>,

    /// Directory with posx.jpg .. negz.jpg for the sky
    #[arg(long)]
    sky_dir: Option<PathBuf>,

    /// Seed the launches and star patterns
    #[arg(long)]
    seed: Option<u64>,

    /// Start with the FPS graph hidden
    #[arg(long)]
    no_fps_graph: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let playlist = match &cli.song {
        Some(path) => match Playlist::from_arg(path) {
            Ok(playlist) => playlist,
            Err(e) => {
                log::error!("Could not read {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Playlist::new(),
    };
    if playlist.is_empty() {
        log::warn!("No songs to play");
    }

    let mut config = Config::default();
    if let Some(dir) = cli.sky_dir {
        config = config.with_sky_dir(dir);
    }
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    config.show_fps_graph = !cli.no_fps_graph;

    match fyreware::run(config, playlist) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
