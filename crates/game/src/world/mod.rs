mod entity;
mod group;
mod loot;
mod registry;
mod transfer;

pub use entity::{Brain, Buff, Entity, HOSTILE_TEAM};
pub use group::{Group, GroupError, GroupId, GroupManager, MAX_GROUP_SIZE};
pub use loot::{LootTable, Reward, DROP_GEAR_TIER};
pub use registry::{Avatar, BroadcastRegistry, BroadcastScope, PlayerView, Presence, SessionId};
pub use transfer::{
    door_destination, is_hard, record_move, resolve_spawn, TokenRegistry, Transfer, HOME_DOOR,
    HOME_LEVEL,
};

/// Player avatars are numbered above every NPC id the tables can hold.
pub const FIRST_PLAYER_ENTITY: u32 = 0x10000;
