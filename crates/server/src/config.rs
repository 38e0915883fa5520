use std::path::PathBuf;

use anyhow::{Context, Result};
use blitz::content::GameTables;
use blitz::WorldConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// JSON tables to load instead of the built-in content.
    pub tables: Option<PathBuf>,
    pub world: WorldConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let world = WorldConfig::default();
        Self {
            bind: String::from("0.0.0.0"),
            port: world.public_port,
            data_dir: PathBuf::from("data"),
            tables: None,
            world,
        }
    }
}

impl ServerConfig {
    pub fn load_tables(&self) -> Result<GameTables> {
        match &self.tables {
            Some(path) => GameTables::load(path)
                .with_context(|| format!("loading tables from {}", path.display())),
            None => Ok(GameTables::builtin()),
        }
    }
}
