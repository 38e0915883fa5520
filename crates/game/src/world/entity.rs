use std::time::Instant;

use glam::Vec2;

use crate::content::NpcSpawn;

/// A timed effect on an NPC, removed by the level loop once it lapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buff {
    pub buff_type: u32,
    pub instance: u32,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Brain {
    #[default]
    Idle,
    Chasing,
    Attacking,
}

/// Server-driven NPC state. Only the owning level loop mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: u32,
    pub name: String,
    pub team: u32,
    pub level: u32,
    pub power_id: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub hp: i32,
    pub max_hp: i32,
    pub buffs: Vec<Buff>,
    pub brain: Brain,
    pub facing_left: bool,
    pub last_attack: Option<Instant>,
    /// What the clients were last told, for delta encoding.
    pub sent_position: Vec2,
    pub sent_vx: f32,
}

/// Team id of hostile NPCs.
pub const HOSTILE_TEAM: u32 = 2;

impl Entity {
    pub fn from_spawn(spawn: &NpcSpawn) -> Self {
        let position = Vec2::new(spawn.x, spawn.y);
        let hp = spawn.hp as i32;
        Self {
            id: spawn.id,
            name: spawn.name.clone(),
            team: spawn.team,
            level: spawn.level,
            power_id: spawn.power_id,
            position,
            velocity: Vec2::ZERO,
            hp,
            max_hp: hp,
            buffs: Vec::new(),
            brain: Brain::Idle,
            facing_left: false,
            last_attack: None,
            sent_position: position,
            sent_vx: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn is_hostile(&self) -> bool {
        self.team == HOSTILE_TEAM
    }

    /// Power used for melee, never zero on the wire.
    pub fn attack_power(&self) -> u32 {
        if self.power_id == 0 { 2 } else { self.power_id }
    }

    /// Drop buffs that lapsed by `now`, returning them.
    pub fn expire_buffs(&mut self, now: Instant) -> Vec<Buff> {
        let (expired, kept): (Vec<Buff>, Vec<Buff>) =
            self.buffs.iter().copied().partition(|b| b.expires_at <= now);
        self.buffs = kept;
        expired
    }
}
