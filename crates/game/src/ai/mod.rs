mod brain;
mod config;
mod runner;

pub use brain::{nearest_target, think, AiEvent};
pub use config::AiConfig;
pub use runner::{LevelAi, NpcCommand, NpcTable};
