use anyhow::{Context, Result};
use dotenv::dotenv;
use log::info;
use serde::Deserialize;
use std::{env::var, fs::File, path::PathBuf};

/// Candidate config locations, tried in order. The absolute path comes first
/// so a mounted /config.json wins over one in the working directory.
const CONFIG_PATHS: &[&str] = &["/config.json", "config.json", "./config.json"];

#[derive(Deserialize)]
struct ConfigFile {
    pocketbase_url: String,
}

#[derive(Debug)]
pub struct Config {
    pub pocketbase_url: String,
    pub port: u16,
    pub image_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_PATHS)
    }

    fn load_from(paths: &[&str]) -> Result<Self> {
        dotenv().ok();

        let (path, file) = paths
            .iter()
            .find_map(|path| File::open(path).ok().map(|file| (*path, file)))
            .with_context(|| format!("could not open config.json in any of {paths:?}"))?;

        info!("Loading config from: {path}");

        let config: ConfigFile =
            serde_json::from_reader(file).with_context(|| format!("could not parse {path}"))?;

        Ok(Self {
            pocketbase_url: config.pocketbase_url,
            port: var("FLOPPA_PORT")
                .ok()
                .and_then(|port| port.trim().parse::<u16>().ok())
                .unwrap_or(8080),
            image_dir: var("FLOPPA_IMAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("floppa")),
        })
    }
}
