use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use log::LevelFilter;

use crate::board::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKind {
    Human,
    Random,
}

impl PlayerKind {
    fn parse(text: &str) -> Result<Self> {
        match text {
            "human" => Ok(PlayerKind::Human),
            "random" | "ai" => Ok(PlayerKind::Random),
            other => Err(anyhow!("unknown player kind '{}' (expected human or random)", other)),
        }
    }
}

/// Settings for the terminal driver.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayConfig {
    pub white: PlayerKind,
    pub black: PlayerKind,
    pub seed: Option<u64>,
    pub max_plies: Option<u32>,
    pub fen: Option<String>,
    pub log_level: LevelFilter,
    pub log_file: Option<PathBuf>,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            white: PlayerKind::Human,
            black: PlayerKind::Random,
            seed: None,
            max_plies: None,
            fen: None,
            log_level: LevelFilter::Warn,
            log_file: None,
        }
    }
}

impl PlayConfig {
    /// Parses `key=value` arguments (`white=`, `black=`, `seed=`, `plies=`,
    /// `fen=`, `log=`) and the `--verbose` / `--trace` flags.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = PlayConfig::default();
        for arg in args {
            let arg = arg.as_ref();
            match arg {
                "--verbose" => config.log_level = LevelFilter::Debug,
                "--trace" => config.log_level = LevelFilter::Trace,
                _ => {
                    let (key, value) = arg
                        .split_once('=')
                        .ok_or_else(|| anyhow!("unrecognised argument '{}'", arg))?;
                    match key {
                        "white" => config.white = PlayerKind::parse(value)?,
                        "black" => config.black = PlayerKind::parse(value)?,
                        "seed" => config.seed = Some(value.parse()?),
                        "plies" => config.max_plies = Some(value.parse()?),
                        "fen" => config.fen = Some(value.to_string()),
                        "log" => config.log_file = Some(PathBuf::from(value)),
                        _ => bail!("unrecognised option '{}'", key),
                    }
                }
            }
        }
        Ok(config)
    }

    pub fn player(&self, color: Color) -> PlayerKind {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }
}
