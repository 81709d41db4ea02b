use anyhow::Result;
use floppa_api::{config::Config, server::FloppaServer};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;

    FloppaServer::bind(config)?.run()
}
