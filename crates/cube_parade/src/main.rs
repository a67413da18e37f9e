//! Headless parade runner
//!
//! ```text
//! cube_parade [PARAMS.ron|PARAMS.toml] [--seconds N] [--step DT] [--autopilot]
//! ```
//!
//! Runs the simulation at a fixed step and logs what happens. With
//! `--autopilot` the player is pushed toward the goal twice a second.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use cube_engine::foundation::logging;
use cube_engine::foundation::time::Stopwatch;
use cube_parade::{Game, GameParams, KeyCode};

#[derive(Parser, Debug)]
#[command(name = "cube_parade", about = "Run the cube parade headless at a fixed step")]
struct Options {
    /// Parameter file (.ron or .toml); built-in defaults when omitted
    params: Option<PathBuf>,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 30.0)]
    seconds: f64,

    /// Fixed tick length in seconds
    #[arg(long, default_value_t = 1.0 / 60.0, value_parser = positive_seconds)]
    step: f64,

    /// Push the player toward the goal twice a second
    #[arg(long)]
    autopilot: bool,
}

fn positive_seconds(value: &str) -> Result<f64, String> {
    let seconds: f64 = value.parse().map_err(|e| format!("{value}: {e}"))?;
    if seconds > 0.0 {
        Ok(seconds)
    } else {
        Err(format!("{value} is not a positive number of seconds"))
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();
    let options = Options::parse();

    let params = match &options.params {
        Some(path) => {
            log::info!("loading parameters from {}", path.display());
            GameParams::load(path)?
        }
        None => GameParams::default(),
    };

    let mut game = Game::new(params)?;
    let ticks = (options.seconds / options.step).ceil() as u64;
    let autopilot_every = (0.5 / options.step).round().max(1.0) as u64;
    let mut wall = Stopwatch::start();

    log::info!("running {ticks} ticks of {:.4}s", options.step);
    for tick in 0..ticks {
        if options.autopilot && tick % autopilot_every == 0 {
            game.key_down(KeyCode::Up);
        }
        game.tick(options.step);
        wall.lap();
    }

    log::info!(
        "simulated {:.1}s in {:.3}s wall time ({:.0} ticks/s), {} restarts, {} entities alive",
        game.elapsed(),
        wall.elapsed(),
        wall.laps_per_second(),
        game.restarts(),
        game.manager().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::try_parse_from(["cube_parade"]).expect("no arguments");
        assert!(options.params.is_none());
        assert_eq!(options.seconds, 30.0);
        assert_eq!(options.step, 1.0 / 60.0);
        assert!(!options.autopilot);
    }

    #[test]
    fn test_params_path_and_flags() {
        let options = Options::try_parse_from([
            "cube_parade",
            "parade.toml",
            "--seconds",
            "5",
            "--step",
            "0.1",
            "--autopilot",
        ])
        .expect("valid arguments");
        assert_eq!(options.params, Some(PathBuf::from("parade.toml")));
        assert_eq!(options.seconds, 5.0);
        assert_eq!(options.step, 0.1);
        assert!(options.autopilot);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(Options::try_parse_from(["cube_parade", "--speed", "2"]).is_err());
        assert!(Options::try_parse_from(["cube_parade", "--step", "0"]).is_err());
        assert!(Options::try_parse_from(["cube_parade", "--step", "-1"]).is_err());
        assert!(Options::try_parse_from(["cube_parade", "--seconds"]).is_err());
    }
}
