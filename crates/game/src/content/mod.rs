//! Static game content consumed as lookup tables.

mod builtin;

use std::collections::HashMap;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::timed::{ActionCost, TimedActionKind};

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to read tables: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tables: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub swf: String,
    pub map_id: u32,
    pub base_id: u32,
    #[serde(default)]
    pub dungeon: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialSpawn {
    pub from: String,
    pub to: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorLink {
    pub level: String,
    pub door_id: u32,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcSpawn {
    pub id: u32,
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub team: u32,
    #[serde(default = "default_npc_level")]
    pub level: u32,
    pub hp: u32,
    #[serde(default)]
    pub power_id: u32,
}

fn default_npc_level() -> u32 {
    1
}

/// Cost of one step. `target: None` applies to every target without a
/// dedicated entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEntry {
    #[serde(default)]
    pub target: Option<u32>,
    pub result: u32,
    #[serde(flatten)]
    pub cost: ActionCost,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameTables {
    pub start_level: String,
    pub default_max_hp: u32,
    pub levels: HashMap<String, LevelInfo>,
    pub spawn_points: HashMap<String, [f32; 2]>,
    pub special_spawns: Vec<SpecialSpawn>,
    pub doors: Vec<DoorLink>,
    pub npcs: HashMap<String, Vec<NpcSpawn>>,
    pub costs: HashMap<TimedActionKind, Vec<CostEntry>>,
    /// Per character level, price of one changed dye channel.
    pub dye_gold_cost: Vec<u32>,
    pub dye_idol_cost: Vec<u32>,
    pub dye_colors: HashMap<u32, u32>,
    pub starter_gear: HashMap<String, Vec<u32>>,
    pub gear_drops: HashMap<String, Vec<u32>>,
    pub material_drops: Vec<u32>,
}

impl GameTables {
    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn level(&self, name: &str) -> Option<&LevelInfo> {
        self.levels.get(name)
    }

    pub fn is_dungeon(&self, name: &str) -> bool {
        self.level(name).is_some_and(|l| l.dungeon)
    }

    pub fn spawn_point(&self, level: &str) -> Option<Vec2> {
        self.spawn_points.get(level).map(|&[x, y]| Vec2::new(x, y))
    }

    pub fn special_spawn(&self, from: &str, to: &str) -> Option<Vec2> {
        self.special_spawns
            .iter()
            .find(|s| s.from == from && s.to == to)
            .map(|s| Vec2::new(s.x, s.y))
    }

    pub fn door_target(&self, level: &str, door_id: u32) -> Option<&str> {
        self.doors
            .iter()
            .find(|d| d.level == level && d.door_id == door_id)
            .map(|d| d.target.as_str())
    }

    pub fn npc_spawns(&self, level: &str) -> &[NpcSpawn] {
        self.npcs.get(level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Exact `(target, result)` entry first, then the wildcard for `result`.
    pub fn cost(&self, kind: TimedActionKind, target: u32, result: u32) -> Option<ActionCost> {
        let entries = self.costs.get(&kind)?;
        entries
            .iter()
            .find(|e| e.target == Some(target) && e.result == result)
            .or_else(|| {
                entries
                    .iter()
                    .find(|e| e.target.is_none() && e.result == result)
            })
            .map(|e| e.cost)
    }

    pub fn dye_cost(&self, character_level: u32, with_idols: bool) -> u32 {
        let table = if with_idols {
            &self.dye_idol_cost
        } else {
            &self.dye_gold_cost
        };
        let index = (character_level as usize).min(table.len().saturating_sub(1));
        table.get(index).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_cost_beats_wildcard() {
        let mut tables = GameTables::default();
        let cost = |gold| ActionCost {
            gold,
            idols: 1,
            duration_secs: 10,
        };
        tables.costs.insert(
            TimedActionKind::Building,
            vec![
                CostEntry {
                    target: None,
                    result: 1,
                    cost: cost(100),
                },
                CostEntry {
                    target: Some(4),
                    result: 1,
                    cost: cost(250),
                },
            ],
        );
        assert_eq!(tables.cost(TimedActionKind::Building, 4, 1).unwrap().gold, 250);
        assert_eq!(tables.cost(TimedActionKind::Building, 2, 1).unwrap().gold, 100);
        assert!(tables.cost(TimedActionKind::Building, 2, 2).is_none());
        assert!(tables.cost(TimedActionKind::Skill, 2, 1).is_none());
    }

    #[test]
    fn test_dye_cost_clamps_level() {
        let tables = GameTables {
            dye_gold_cost: vec![0, 10, 20],
            ..Default::default()
        };
        assert_eq!(tables.dye_cost(1, false), 10);
        assert_eq!(tables.dye_cost(50, false), 20);
        assert_eq!(tables.dye_cost(1, true), 0);
    }

    #[test]
    fn test_tables_load_from_json() {
        let json = r#"{
            "start_level": "NewbieRoad",
            "levels": {"NewbieRoad": {"swf": "a.swf", "map_id": 1, "base_id": 1}},
            "spawn_points": {"NewbieRoad": [1421.25, 826.615]},
            "costs": {"building": [{"result": 1, "gold": 5, "idols": 1, "duration_secs": 3}]}
        }"#;
        let tables: GameTables = serde_json::from_str(json).unwrap();
        assert!(!tables.is_dungeon("NewbieRoad"));
        assert_eq!(
            tables.spawn_point("NewbieRoad"),
            Some(Vec2::new(1421.25, 826.615))
        );
        assert_eq!(
            tables.cost(TimedActionKind::Building, 9, 1).unwrap().duration_secs,
            3
        );
    }
}
