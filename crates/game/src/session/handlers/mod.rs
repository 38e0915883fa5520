pub mod combat;
pub mod debug;
pub mod level;
pub mod login;
pub mod look;
pub mod loot;
pub mod social;
pub mod timed;

use glam::Vec2;

use crate::error::HandlerError;
use crate::net::packets::EnterWorld;
use crate::service::WorldService;
use crate::world::is_hard;

fn to_point(at: Vec2) -> (i32, i32) {
    (at.x.round() as i32, at.y.round() as i32)
}

/// The redirect a client follows into `destination`: reconnect to the
/// announced host, then present `token` in a world join.
fn enter_world(
    world: &WorldService,
    token: u32,
    origin: Option<&str>,
    old_position: Option<Vec2>,
    destination: &str,
    position: Option<Vec2>,
) -> Result<EnterWorld, HandlerError> {
    let info = world
        .tables
        .level(destination)
        .ok_or_else(|| HandlerError::unknown("level", destination))?;
    let old_swf = origin
        .and_then(|name| world.tables.level(name))
        .map(|l| l.swf.clone())
        .unwrap_or_default();
    Ok(EnterWorld {
        token,
        old_swf,
        old_position: old_position.map(to_point),
        host: world.config.public_host.clone(),
        port: world.config.public_port,
        swf: info.swf.clone(),
        map_id: info.map_id,
        base_id: info.base_id,
        level: destination.to_string(),
        hard: is_hard(destination),
        dungeon: info.dungeon,
        position: position.map(to_point),
    })
}
