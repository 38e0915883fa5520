use std::sync::{Arc, PoisonError};

use glam::Vec2;

use super::enter_world;
use crate::error::HandlerError;
use crate::net::packets::{
    DoorState, DoorStateRequest, DoorTarget, LevelTransferRequest, OpenDoor, PlayerMove,
    PlayerSpawned, WorldJoin, DOOR_CLOSED, DOOR_STATIC,
};
use crate::service::WorldService;
use crate::session::{EntitySnapshot, Session};
use crate::world::{door_destination, record_move, resolve_spawn, Avatar, BroadcastScope, Transfer};

/// The level a dungeon's exit leads back to after moving `origin` →
/// `destination`. `carried` is whatever the previous hop already knew.
pub fn entry_after_move(
    world: &WorldService,
    origin: &str,
    destination: &str,
    carried: Option<String>,
) -> Option<String> {
    let tables = &world.tables;
    if !tables.is_dungeon(destination) {
        return None;
    }
    if tables.is_dungeon(origin) {
        carried
    } else {
        Some(origin.to_string())
    }
}

pub async fn join(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: WorldJoin,
) -> Result<(), HandlerError> {
    let transfer = world
        .tokens
        .redeem(request.token)
        .ok_or_else(|| HandlerError::unknown("token", request.token))?;
    if session.account.is_some_and(|a| a != transfer.account) {
        return Err(HandlerError::Rejected("token issued to another account"));
    }
    let character = world
        .store
        .character(transfer.account, &transfer.character)
        .await?;

    session.account = Some(transfer.account);
    session.character = Some(character.name.clone());
    session.level = Some(transfer.destination.clone());
    session.entry_level = transfer.entry_level.clone().or_else(|| {
        // Characters resumed inside a dungeon exit to where they came from.
        let previous = character.previous_level.as_ref()?;
        entry_after_move(world, &previous.name, &transfer.destination, None)
    });
    session.token = Some(request.token);
    session.last_position = None;
    session.entities.clear();
    session.loot.clear_pending();
    session.cache_character(character);

    world.registry.update(session.id, |p| {
        p.account = Some(transfer.account);
        p.character = Some(transfer.character.clone());
        p.level = Some(transfer.destination.clone());
        p.spawned = false;
        p.entity_id = 0;
    });
    log::info!(
        "session {}: {} joined {}",
        session.id,
        transfer.character,
        transfer.destination
    );
    Ok(())
}

/// The client finished loading: spawn its avatar and start the level's NPCs.
pub fn level_loaded(world: &Arc<WorldService>, session: &mut Session) -> Result<(), HandlerError> {
    let (_, name) = session.require_character()?;
    let level = session.require_level()?;

    let position = session
        .cached_character(&name)
        .and_then(|c| c.current_level.as_ref())
        .filter(|at| at.name == level)
        .map(|at| Vec2::new(at.x, at.y))
        .or_else(|| world.tables.spawn_point(&level))
        .unwrap_or(Vec2::ZERO);
    let max_hp = world.tables.default_max_hp.max(1) as i32;
    let entity_id = world.next_entity_id();

    world.registry.update(session.id, |p| {
        p.spawned = true;
        p.entity_id = entity_id;
        p.avatar = Avatar {
            position,
            hp: max_hp,
            max_hp,
            max_hp_known: false,
        };
    });
    session.entity_id = Some(entity_id);

    session.entities.clear();
    if let Some(npcs) = world.ai.ensure(&level) {
        let npcs = npcs.read().unwrap_or_else(PoisonError::into_inner);
        session.entities.extend(npcs.values().map(|npc| {
            (
                npc.id,
                EntitySnapshot {
                    name: npc.name.clone(),
                    position: npc.position,
                    hp: npc.hp,
                },
            )
        }));
    }

    session.send(&PlayerSpawned {
        entity_id,
        x: position.x.round() as i32,
        y: position.y.round() as i32,
        hp: max_hp as u32,
        max_hp: max_hp as u32,
    })
}

pub fn player_move(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: PlayerMove,
) -> Result<(), HandlerError> {
    let own = session.entity_id.ok_or(HandlerError::NotInLevel)?;
    if request.entity_id != own {
        return Err(HandlerError::Rejected("move for an entity the session does not own"));
    }
    let at = Vec2::new(request.x as f32, request.y as f32);
    world.registry.update(session.id, |p| p.avatar.position = at);
    world.broadcast(session.id, &request, BroadcastScope::OTHERS)?;
    Ok(())
}

pub fn open_door(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: OpenDoor,
) -> Result<(), HandlerError> {
    let level = session.require_level()?;
    let target = door_destination(
        &world.tables,
        &level,
        request.door_id,
        session.entry_level.as_deref(),
    )
    .ok_or_else(|| HandlerError::unknown("door", request.door_id))?;

    // The avatar is on its way out: stop level traffic before the reply.
    session.leave_level(&world.registry);
    log::debug!("session {}: door {} -> {}", session.id, request.door_id, target);
    session.send(&DoorTarget {
        door_id: request.door_id,
        level: target,
    })
}

pub fn door_state(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: DoorStateRequest,
) -> Result<(), HandlerError> {
    let level = session.require_level()?;
    let target = door_destination(
        &world.tables,
        &level,
        request.door_id,
        session.entry_level.as_deref(),
    );
    session.send(&DoorState {
        door_id: request.door_id,
        state: if target.is_some() { DOOR_STATIC } else { DOOR_CLOSED },
        target: target.unwrap_or_default(),
    })
}

pub async fn transfer(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: LevelTransferRequest,
) -> Result<(), HandlerError> {
    let (account, name) = session.require_character()?;
    if session.token != Some(request.token) {
        return Err(HandlerError::Rejected("stale transfer token"));
    }
    let origin = session.require_level()?;
    let destination = request.level;
    if world.tables.level(&destination).is_none() {
        return Err(HandlerError::unknown("level", destination));
    }

    // Usually already out of the level via the door; either way this
    // leaves the avatar's last position behind.
    session.leave_level(&world.registry);
    let last_seen = session.last_position.take();

    let tables = Arc::clone(&world.tables);
    let (old_position, spawn, updated) = world
        .store
        .update_character(account, &name, |c| {
            if let (Some(at), Some(current)) = (last_seen, c.current_level.as_mut()) {
                if current.name == origin {
                    current.x = at.x;
                    current.y = at.y;
                }
            }
            let old_position = c.current_level.as_ref().map(|l| Vec2::new(l.x, l.y));
            let spawn = resolve_spawn(&tables, c, &origin, &destination);
            record_move(c, &origin, &destination, spawn);
            Ok::<_, HandlerError>((old_position, spawn, c.clone()))
        })
        .await?;

    let entry_level =
        entry_after_move(world, &origin, &destination, session.entry_level.take());
    let token = world.tokens.issue(Transfer {
        account,
        character: name.clone(),
        destination: destination.clone(),
        origin: origin.clone(),
        entry_level,
    });
    let redirect = enter_world(world, token, Some(&origin), old_position, &destination, spawn)?;

    session.token = Some(token);
    session.level = None;
    world.registry.update(session.id, |p| p.level = None);
    session.cache_character(updated);
    log::info!("session {}: {} leaving {} for {}", session.id, name, origin, destination);
    session.send(&redirect)
}
