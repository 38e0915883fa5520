//! Per-session pending loot.
//!
//! Every drop the server announces is remembered here until picked up, and
//! every `(level, source)` that already produced drops is remembered so a
//! repeated reward request yields nothing. Pending drops live for one level
//! visit; the rewarded set lives as long as the session.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec2;
use rand::Rng;

use crate::net::packets::{GrantReward, LootContents, LootDrop};

/// Tier given to gear that drops from monsters.
pub const DROP_GEAR_TIER: u32 = 2;

static NEXT_LOOT_ID: AtomicU32 = AtomicU32::new(1);

fn next_loot_id() -> u32 {
    NEXT_LOOT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reward {
    Gold(u32),
    Health(u32),
    Gear { gear_id: u32, tier: u32 },
    Material(u32),
}

impl Reward {
    fn contents(self) -> LootContents {
        match self {
            Self::Gold(amount) => LootContents::Gold(amount),
            Self::Health(amount) => LootContents::Health(amount),
            Self::Gear { gear_id, tier } => LootContents::Gear { gear_id, tier },
            Self::Material(id) => LootContents::Material(id),
        }
    }
}

#[derive(Debug, Default)]
pub struct LootTable {
    pending: HashMap<u32, Reward>,
    rewarded: HashSet<(String, u32)>,
}

impl LootTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn a reward request into drops. Returns nothing when this source
    /// has already paid out in this level.
    pub fn grant(
        &mut self,
        level: &str,
        request: &GrantReward,
        at: Vec2,
        gear_pool: &[u32],
        material_pool: &[u32],
    ) -> Vec<LootDrop> {
        if !self.rewarded.insert((level.to_string(), request.source)) {
            return Vec::new();
        }

        let mut rng = rand::thread_rng();
        let mut drops = Vec::new();
        let mut emit = |reward: Reward, spread: (i32, i32)| {
            let loot_id = next_loot_id();
            let offset = if spread == (0, 0) {
                (0, 0)
            } else {
                (
                    rng.gen_range(-spread.0..=spread.0),
                    rng.gen_range(-spread.1..=spread.1),
                )
            };
            self.pending.insert(loot_id, reward);
            drops.push(LootDrop {
                loot_id,
                x: at.x as i32 + offset.0,
                y: at.y as i32 + offset.1,
                contents: reward.contents(),
            });
        };

        if request.gold > 0 {
            emit(Reward::Gold(request.gold), (0, 0));
        }
        if request.hp_gain > 0 {
            emit(Reward::Health(request.hp_gain), (15, 15));
        }
        if request.drop_gear {
            if let Some(&gear_id) = pick(gear_pool) {
                emit(
                    Reward::Gear {
                        gear_id,
                        tier: DROP_GEAR_TIER,
                    },
                    (20, 10),
                );
            }
        }
        if request.drop_material {
            if let Some(&id) = pick(material_pool) {
                emit(Reward::Material(id), (20, 10));
            }
        }
        drops
    }

    /// Single-consume pickup.
    pub fn take(&mut self, loot_id: u32) -> Option<Reward> {
        self.pending.remove(&loot_id)
    }

    /// Put a reward back, for pickups that could not be applied.
    pub fn restore(&mut self, loot_id: u32, reward: Reward) {
        self.pending.insert(loot_id, reward);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Level change: drops from the old level can no longer be picked up.
    /// Sources that already paid out stay recorded, keyed by level.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }
}

fn pick(pool: &[u32]) -> Option<&u32> {
    if pool.is_empty() {
        None
    } else {
        pool.get(rand::thread_rng().gen_range(0..pool.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(source: u32) -> GrantReward {
        GrantReward {
            receiver: 0x10001,
            source,
            gold: 25,
            hp_gain: 10,
            drop_gear: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_duplicate_source_drops_once() {
        let mut loot = LootTable::new();
        let at = Vec2::new(100.0, 200.0);
        let first = loot.grant("NewbieRoad", &request(1001), at, &[7], &[]);
        assert_eq!(first.len(), 3);
        let second = loot.grant("NewbieRoad", &request(1001), at, &[7], &[]);
        assert!(second.is_empty());
        assert_eq!(loot.pending_len(), 3);

        let other_level = loot.grant("CraftTown", &request(1001), at, &[7], &[]);
        assert_eq!(other_level.len(), 3);
    }

    #[test]
    fn test_gold_lands_on_source() {
        let mut loot = LootTable::new();
        let drops = loot.grant("NewbieRoad", &request(1), Vec2::new(100.0, 200.0), &[], &[]);
        assert_eq!(drops.len(), 2);
        assert_eq!((drops[0].x, drops[0].y), (100, 200));
        assert_eq!(drops[0].contents, LootContents::Gold(25));
        assert!((85..=115).contains(&drops[1].x));
    }

    #[test]
    fn test_pickup_is_single_consume() {
        let mut loot = LootTable::new();
        let drops = loot.grant("NewbieRoad", &request(1), Vec2::ZERO, &[9], &[]);
        let gear = drops
            .iter()
            .find(|d| matches!(d.contents, LootContents::Gear { .. }))
            .unwrap();
        assert_eq!(
            loot.take(gear.loot_id),
            Some(Reward::Gear {
                gear_id: 9,
                tier: DROP_GEAR_TIER
            })
        );
        assert_eq!(loot.take(gear.loot_id), None);
    }

    #[test]
    fn test_level_change_keeps_dedup() {
        let mut loot = LootTable::new();
        loot.grant("NewbieRoad", &request(1), Vec2::ZERO, &[], &[]);
        loot.clear_pending();
        assert_eq!(loot.pending_len(), 0);
        assert!(loot
            .grant("NewbieRoad", &request(1), Vec2::ZERO, &[], &[])
            .is_empty());
    }
}
