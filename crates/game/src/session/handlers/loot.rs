use std::sync::{Arc, PoisonError};

use glam::Vec2;

use crate::ai::NpcCommand;
use crate::error::HandlerError;
use crate::net::packets::{
    GrantReward, HpUpdate, PickupLoot, RewardGranted, GRANTED_GEAR, GRANTED_GOLD, GRANTED_HEALTH,
    GRANTED_MATERIAL,
};
use crate::service::WorldService;
use crate::session::Session;
use crate::world::Reward;

/// Where a defeated source stood: the session's snapshot first, then the
/// live NPC table, then whatever the client reported.
fn drop_position(world: &WorldService, session: &Session, level: &str, request: &GrantReward) -> Vec2 {
    if let Some(entity) = session.entities.get(&request.source) {
        return entity.position;
    }
    let live = world.ai.npcs(level).and_then(|npcs| {
        let npcs = npcs.read().unwrap_or_else(PoisonError::into_inner);
        npcs.get(&request.source).map(|npc| npc.position)
    });
    live.unwrap_or(Vec2::new(request.x as f32, request.y as f32))
}

pub fn grant(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: GrantReward,
) -> Result<(), HandlerError> {
    let (_, name) = session.require_character()?;
    let level = session.require_level()?;

    let at = drop_position(world, session, &level, &request);
    let class = session
        .cached_character(&name)
        .map(|c| c.class_name.clone())
        .unwrap_or_default();
    let tables = &world.tables;
    let gear_pool = tables.gear_drops.get(&class).map(Vec::as_slice).unwrap_or(&[]);

    let drops = session
        .loot
        .grant(&level, &request, at, gear_pool, &tables.material_drops);
    if drops.is_empty() {
        log::debug!(
            "session {}: no drops for source {} in {}",
            session.id,
            request.source,
            level
        );
        return Ok(());
    }
    for loot in &drops {
        session.send(loot)?;
    }
    session.entities.remove(&request.source);
    world
        .ai
        .send(&level, NpcCommand::Defeated { npc_id: request.source });
    Ok(())
}

fn granted(reward: Reward) -> RewardGranted {
    let (kind, value, tier) = match reward {
        Reward::Gold(amount) => (GRANTED_GOLD, amount, 0),
        Reward::Health(amount) => (GRANTED_HEALTH, amount, 0),
        Reward::Gear { gear_id, tier } => (GRANTED_GEAR, gear_id, tier),
        Reward::Material(id) => (GRANTED_MATERIAL, id, 0),
    };
    RewardGranted { kind, value, tier }
}

pub async fn pickup(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: PickupLoot,
) -> Result<(), HandlerError> {
    let (account, name) = session.require_character()?;
    let entity_id = session.entity_id.ok_or(HandlerError::NotInLevel)?;
    let loot_id = request.loot_id;
    let reward = session
        .loot
        .take(loot_id)
        .ok_or_else(|| HandlerError::unknown("loot", loot_id))?;

    if let Reward::Health(amount) = reward {
        let amount = i32::try_from(amount).unwrap_or(i32::MAX);
        let healed = world
            .registry
            .update(session.id, |p| {
                let avatar = &mut p.avatar;
                if avatar.max_hp_known && avatar.hp >= avatar.max_hp {
                    return None;
                }
                let before = avatar.hp;
                avatar.hp = before.saturating_add(amount);
                if avatar.max_hp_known {
                    avatar.hp = avatar.hp.min(avatar.max_hp);
                }
                Some(avatar.hp - before)
            })
            .flatten();
        let Some(delta) = healed else {
            // Full health: the globe stays on the ground.
            session.loot.restore(loot_id, reward);
            return Ok(());
        };
        session.send(&HpUpdate { entity_id, delta })?;
        return session.send(&granted(Reward::Health(delta.max(0) as u32)));
    }

    let stored = world
        .store
        .update_character(account, &name, |c| {
            match reward {
                Reward::Gold(amount) => c.gold = c.gold.saturating_add(amount),
                Reward::Gear { gear_id, tier } => c.add_gear(gear_id, tier),
                Reward::Material(id) => c.add_material(id, 1),
                Reward::Health(_) => {}
            }
            Ok::<_, HandlerError>(c.clone())
        })
        .await;
    match stored {
        Ok(character) => session.cache_character(character),
        Err(e) => {
            session.loot.restore(loot_id, reward);
            return Err(e);
        }
    }
    session.send(&granted(reward))
}
