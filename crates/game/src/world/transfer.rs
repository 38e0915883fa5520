//! Level transitions: where a character lands and the single-use tokens
//! that carry it across the reconnect.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use glam::Vec2;
use rand::Rng;

use crate::character::{AccountId, Character, LevelPosition};
use crate::content::GameTables;

pub const HARD_SUFFIX: &str = "Hard";

/// Door id every level uses to send the player home.
pub const HOME_DOOR: u32 = 999;
pub const HOME_LEVEL: &str = "CraftTown";

/// Spawn coordinate for `destination`, or `None` when the client should
/// use the level's own entrance.
///
/// Order: the fixed `(origin, destination)` table, then for dungeons a
/// stored coordinate already recorded for that level, then the static
/// per-level spawn point.
pub fn resolve_spawn(
    tables: &GameTables,
    character: &Character,
    origin: &str,
    destination: &str,
) -> Option<Vec2> {
    if let Some(point) = tables.special_spawn(origin, destination) {
        return Some(point);
    }
    if tables.is_dungeon(destination) {
        let stored = [&character.current_level, &character.previous_level]
            .into_iter()
            .flatten()
            .find(|at| at.name == destination);
        if let Some(at) = stored {
            return Some(Vec2::new(at.x, at.y));
        }
    }
    tables.spawn_point(destination)
}

pub fn is_hard(level: &str) -> bool {
    level.ends_with(HARD_SUFFIX)
}

/// Where an open door leads from `level`, if anywhere.
pub fn door_destination(
    tables: &GameTables,
    level: &str,
    door_id: u32,
    entry_level: Option<&str>,
) -> Option<String> {
    if let Some(target) = tables.door_target(level, door_id) {
        return Some(target.to_string());
    }
    if tables.is_dungeon(level) {
        return entry_level.map(str::to_string);
    }
    (door_id == HOME_DOOR).then(|| HOME_LEVEL.to_string())
}

/// Record a move on the character: the old current level becomes the
/// previous one and the destination becomes current.
pub fn record_move(character: &mut Character, origin: &str, destination: &str, at: Option<Vec2>) {
    let (old_x, old_y) = character
        .current_level
        .as_ref()
        .map(|l| (l.x, l.y))
        .unwrap_or_default();
    character.previous_level = Some(LevelPosition::new(origin, old_x, old_y));
    let at = at.unwrap_or(Vec2::ZERO);
    character.current_level = Some(LevelPosition::new(destination, at.x, at.y));
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub account: AccountId,
    pub character: String,
    pub destination: String,
    pub origin: String,
    /// Where a dungeon's exit door leads once the client arrives.
    pub entry_level: Option<String>,
}

/// Opaque transfer tokens. A token is issued for one destination and can be
/// redeemed exactly once. A character holds at most one outstanding token.
#[derive(Default)]
pub struct TokenRegistry {
    pending: Mutex<HashMap<u32, Transfer>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for `transfer`, superseding any token the same
    /// character still holds.
    pub fn issue(&self, transfer: Transfer) -> u32 {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|_, t| {
            !(t.account == transfer.account && t.character == transfer.character)
        });
        let mut rng = rand::thread_rng();
        // Keep tokens small enough to stay cheap on the wire.
        let token = loop {
            let candidate = rng.gen_range(1..=0x00FF_FFFF);
            if !pending.contains_key(&candidate) {
                break candidate;
            }
        };
        pending.insert(token, transfer);
        token
    }

    pub fn redeem(&self, token: u32) -> Option<Transfer> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&token)
    }

    pub fn outstanding(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_spawn_wins() {
        let tables = GameTables::builtin();
        let mut c = Character::new("Ada", "Rogue");
        c.current_level = Some(LevelPosition::new("NewbieRoad", 5.0, 6.0));
        assert_eq!(
            resolve_spawn(&tables, &c, "SwampRoadNorth", "NewbieRoad"),
            Some(Vec2::new(20298.0, 639.0))
        );
    }

    #[test]
    fn test_dungeon_carries_stored_coordinates() {
        let tables = GameTables::builtin();
        let mut c = Character::new("Ada", "Rogue");
        c.previous_level = Some(LevelPosition::new("Castle", -900.0, -1940.0));
        assert_eq!(
            resolve_spawn(&tables, &c, "CraftTown", "Castle"),
            Some(Vec2::new(-900.0, -1940.0))
        );

        c.previous_level = None;
        assert_eq!(
            resolve_spawn(&tables, &c, "CraftTown", "Castle"),
            Some(Vec2::new(-1280.0, -1941.01))
        );
    }

    #[test]
    fn test_open_world_uses_static_spawn() {
        let tables = GameTables::builtin();
        let mut c = Character::new("Ada", "Rogue");
        c.current_level = Some(LevelPosition::new("NewbieRoad", 5.0, 6.0));
        assert_eq!(
            resolve_spawn(&tables, &c, "CraftTown", "NewbieRoad"),
            Some(Vec2::new(1421.25, 826.615))
        );
        assert_eq!(resolve_spawn(&tables, &c, "CraftTown", "Nowhere"), None);
    }

    #[test]
    fn test_door_destinations() {
        let tables = GameTables::builtin();
        assert_eq!(
            door_destination(&tables, "NewbieRoad", 1, None).as_deref(),
            Some("SwampRoadNorth")
        );
        assert_eq!(
            door_destination(&tables, "NewbieRoad", HOME_DOOR, None).as_deref(),
            Some(HOME_LEVEL)
        );
        assert_eq!(
            door_destination(&tables, "Castle", 42, Some("BridgeTown")).as_deref(),
            Some("BridgeTown")
        );
        assert_eq!(door_destination(&tables, "NewbieRoad", 42, None), None);
    }

    #[test]
    fn test_record_move_shifts_levels() {
        let mut c = Character::new("Ada", "Rogue");
        c.current_level = Some(LevelPosition::new("NewbieRoad", 10.0, 20.0));
        record_move(&mut c, "NewbieRoad", "CraftTown", Some(Vec2::new(360.0, 1458.99)));
        assert_eq!(
            c.previous_level,
            Some(LevelPosition::new("NewbieRoad", 10.0, 20.0))
        );
        assert_eq!(c.current_level.unwrap().name, "CraftTown");
    }

    #[test]
    fn test_tokens_are_single_use() {
        let tokens = TokenRegistry::new();
        let transfer = Transfer {
            account: 1,
            character: "Ada".into(),
            destination: "CraftTown".into(),
            origin: "NewbieRoad".into(),
            entry_level: None,
        };
        let token = tokens.issue(transfer.clone());
        assert_ne!(token, 0);
        assert_eq!(tokens.redeem(token), Some(transfer));
        assert_eq!(tokens.redeem(token), None);
    }

    #[test]
    fn test_new_token_supersedes_old() {
        let tokens = TokenRegistry::new();
        let issue = |account, character: &str| {
            tokens.issue(Transfer {
                account,
                character: character.into(),
                destination: "CraftTown".into(),
                origin: "NewbieRoad".into(),
                entry_level: None,
            })
        };
        let stale = issue(1, "Ada");
        let fresh = issue(1, "Ada");
        issue(1, "Bo");
        issue(2, "Ada");
        assert_eq!(tokens.outstanding(), 3);
        assert_eq!(tokens.redeem(stale), None);
        assert!(tokens.redeem(fresh).is_some());
    }
}
