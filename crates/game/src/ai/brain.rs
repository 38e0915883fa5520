//! One NPC's decision and physics for one tick, free of I/O.

use std::time::Instant;

use glam::Vec2;

use super::config::AiConfig;
use crate::net::packets::MoveFlags;
use crate::world::{Brain, Entity, PlayerView};

/// Velocities below this many units per second snap to rest.
const REST_SPEED: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub enum AiEvent {
    BuffExpired {
        buff_type: u32,
        instance: u32,
    },
    Attack {
        target: PlayerView,
        power: u32,
        damage: i32,
    },
    Moved {
        dx: i32,
        dy: i32,
        dvx: i32,
        flags: MoveFlags,
    },
}

/// Nearest living player inside the aggro radius. Ties keep the first.
pub fn nearest_target<'a>(
    npc: &Entity,
    players: &'a [PlayerView],
    aggro_radius: f32,
) -> Option<(&'a PlayerView, f32)> {
    let mut best: Option<(&PlayerView, f32)> = None;
    for player in players.iter().filter(|p| p.hp > 0) {
        let distance = npc.position.distance(player.position);
        if distance > aggro_radius {
            continue;
        }
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((player, distance));
        }
    }
    best
}

fn steer(velocity: Vec2, desired: Vec2, max_change: f32) -> Vec2 {
    velocity + (desired - velocity).clamp_length_max(max_change)
}

fn snap(v: f32) -> f32 {
    if v.abs() < REST_SPEED { 0.0 } else { v }
}

/// Advance one NPC by one tick.
pub fn think(
    npc: &mut Entity,
    players: &[PlayerView],
    config: &AiConfig,
    now: Instant,
) -> Vec<AiEvent> {
    let mut events = Vec::new();
    if !npc.is_alive() {
        return events;
    }

    for buff in npc.expire_buffs(now) {
        events.push(AiEvent::BuffExpired {
            buff_type: buff.buff_type,
            instance: buff.instance,
        });
    }

    let mut desired = None;
    match nearest_target(npc, players, config.aggro_radius) {
        Some((target, distance)) if distance <= config.attack_range => {
            npc.brain = Brain::Attacking;
            npc.velocity = Vec2::ZERO;
            npc.facing_left = target.position.x < npc.position.x;
            let cooled = npc
                .last_attack
                .is_none_or(|at| now.duration_since(at) >= config.attack_cooldown);
            if cooled {
                npc.last_attack = Some(now);
                events.push(AiEvent::Attack {
                    target: *target,
                    power: npc.attack_power(),
                    damage: config.damage_for(npc.level),
                });
            }
        }
        Some((target, distance)) => {
            npc.brain = Brain::Chasing;
            let offset = target.position - npc.position;
            npc.facing_left = offset.x < 0.0;
            let mut speed = config.max_speed;
            if distance < config.stop_distance {
                speed *= distance / config.stop_distance;
            }
            desired = Some(offset.normalize_or_zero() * speed);
        }
        None => {
            npc.brain = Brain::Idle;
            npc.velocity = Vec2::ZERO;
        }
    }

    for _ in 0..config.substeps() {
        if let Some(desired) = desired {
            npc.velocity = steer(npc.velocity, desired, config.acceleration);
        }
        npc.velocity *= config.friction;
        npc.velocity = Vec2::new(snap(npc.velocity.x), snap(npc.velocity.y));
        npc.position += npc.velocity * config.timestep;
    }

    let dx = (npc.position.x - npc.sent_position.x).trunc() as i32;
    let dy = (npc.position.y - npc.sent_position.y).trunc() as i32;
    let dvx = (npc.velocity.x - npc.sent_vx).trunc() as i32;
    if dx != 0 || dy != 0 || dvx != 0 {
        // Advance by what was sent so sub-unit drift is carried forward.
        npc.sent_position += Vec2::new(dx as f32, dy as f32);
        npc.sent_vx += dvx as f32;

        let mut flags = MoveFlags::empty();
        flags.set(MoveFlags::FACING_LEFT, npc.facing_left);
        flags.set(MoveFlags::RUNNING, npc.brain == Brain::Chasing);
        flags.set(MoveFlags::ATTACKING, npc.brain == Brain::Attacking);
        events.push(AiEvent::Moved { dx, dy, dvx, flags });
    }
    events
}
