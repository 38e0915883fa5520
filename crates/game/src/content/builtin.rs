use std::collections::HashMap;

use super::{CostEntry, DoorLink, GameTables, LevelInfo, NpcSpawn, SpecialSpawn};
use crate::timed::{ActionCost, TimedActionKind};

const SPAWNS: &[(&str, f32, f32)] = &[
    ("CraftTown", 360.0, 1458.99),
    ("NewbieRoad", 1421.25, 826.615),
    ("SwampRoadNorth", 4360.5, 595.615),
    ("SwampRoadConnection", 325.0, 368.0),
    ("BridgeTown", 3944.0, 838.99),
    ("CemeteryHill", 0.0, 0.0),
    ("OldMineMountain", 189.25, 1335.99),
    ("EmeraldGlades", -1433.75, -1883.6237),
    ("Castle", -1280.0, -1941.01),
    ("ShazariDesert", 618.25, 647.4692),
    ("JadeCity", 10430.5, 1058.99),
];

const SPECIAL: &[(&str, &str, f32, f32)] = &[
    ("SwampRoadNorth", "NewbieRoad", 20298.0, 639.0),
    ("SwampRoadConnection", "SwampRoadNorth", 193.0, 511.0),
    ("EmeraldGlades", "OldMineMountain", 18552.0, 4021.0),
    ("SwampRoadNorth", "SwampRoadConnection", 325.0, 368.0),
    ("BridgeTown", "SwampRoadConnection", 10533.0, 461.0),
    ("OldMineMountain", "BridgeTown", 16986.0, -296.01),
    ("Castle", "BridgeTown", 10566.0, 492.99),
    ("JadeCity", "ShazariDesert", 25857.25, 1298.4692),
];

const DUNGEONS: &[&str] = &["Castle", "SwampRoadConnection"];

const DOORS: &[(&str, u32, &str)] = &[
    ("NewbieRoad", 1, "SwampRoadNorth"),
    ("SwampRoadNorth", 1, "NewbieRoad"),
    ("SwampRoadNorth", 2, "SwampRoadConnection"),
    ("SwampRoadConnection", 1, "SwampRoadNorth"),
    ("SwampRoadConnection", 2, "BridgeTown"),
    ("BridgeTown", 1, "SwampRoadConnection"),
    ("BridgeTown", 2, "Castle"),
    ("BridgeTown", 3, "OldMineMountain"),
    ("OldMineMountain", 1, "BridgeTown"),
    ("OldMineMountain", 2, "EmeraldGlades"),
    ("EmeraldGlades", 1, "OldMineMountain"),
    ("ShazariDesert", 1, "JadeCity"),
    ("JadeCity", 1, "ShazariDesert"),
];

fn npc(id: u32, name: &str, x: f32, y: f32, level: u32, hp: u32) -> NpcSpawn {
    NpcSpawn {
        id,
        name: name.to_string(),
        x,
        y,
        team: 2,
        level,
        hp,
        power_id: 2,
    }
}

/// Formula-driven step costs: each rank is pricier and slower than the last.
fn step_costs(max_result: u32, gold: u32, idols: u32, secs: u64) -> Vec<CostEntry> {
    (1..=max_result)
        .map(|result| CostEntry {
            target: None,
            result,
            cost: ActionCost {
                gold: gold * result * result,
                idols: idols * result,
                duration_secs: secs * result as u64,
            },
        })
        .collect()
}

impl GameTables {
    /// A small playable world used when no tables file is configured.
    pub fn builtin() -> Self {
        let mut levels = HashMap::new();
        let mut spawn_points = HashMap::new();
        let mut map_id = 1;
        for &(name, x, y) in SPAWNS {
            for variant in [name.to_string(), format!("{name}Hard")] {
                if name == "CraftTown" && variant != name {
                    continue;
                }
                levels.insert(
                    variant.clone(),
                    LevelInfo {
                        swf: format!("LevelsNR.swf/a_Level_{name}"),
                        map_id,
                        base_id: map_id,
                        dungeon: DUNGEONS.contains(&name),
                    },
                );
                spawn_points.insert(variant, [x, y]);
                map_id += 1;
            }
        }

        let mut special_spawns = Vec::new();
        for &(from, to, x, y) in SPECIAL {
            special_spawns.push(SpecialSpawn {
                from: from.into(),
                to: to.into(),
                x,
                y,
            });
            special_spawns.push(SpecialSpawn {
                from: format!("{from}Hard"),
                to: format!("{to}Hard"),
                x,
                y,
            });
        }

        let doors = DOORS
            .iter()
            .map(|&(level, door_id, target)| DoorLink {
                level: level.into(),
                door_id,
                target: target.into(),
            })
            .collect();

        let mut npcs = HashMap::new();
        npcs.insert(
            "NewbieRoad".to_string(),
            vec![
                npc(1001, "GoblinScout", 2100.0, 826.0, 1, 60),
                npc(1002, "GoblinScout", 2600.0, 826.0, 1, 60),
                npc(1003, "GoblinBrute", 3400.0, 810.0, 3, 140),
            ],
        );
        npcs.insert(
            "SwampRoadNorth".to_string(),
            vec![
                npc(1101, "MireLurker", 5200.0, 600.0, 5, 180),
                npc(1102, "MireLurker", 5900.0, 590.0, 5, 180),
            ],
        );
        npcs.insert(
            "Castle".to_string(),
            vec![npc(1201, "CastleGuard", -600.0, -1940.0, 12, 400)],
        );

        let mut costs = HashMap::new();
        costs.insert(TimedActionKind::Building, step_costs(10, 500, 10, 3_600));
        costs.insert(TimedActionKind::Skill, step_costs(10, 250, 5, 1_800));
        costs.insert(TimedActionKind::Talent, step_costs(30, 100, 3, 900));
        costs.insert(TimedActionKind::PetTraining, step_costs(20, 200, 4, 1_200));
        costs.insert(
            TimedActionKind::EggHatch,
            vec![CostEntry {
                target: None,
                result: 0,
                cost: ActionCost {
                    gold: 1_000,
                    idols: 20,
                    duration_secs: 7_200,
                },
            }],
        );
        // Hatch cost does not depend on the pet type.
        if let Some(eggs) = costs.get_mut(&TimedActionKind::EggHatch) {
            let base = eggs[0];
            eggs.extend((1..128).map(|result| CostEntry { result, ..base }));
        }

        let mut starter_gear = HashMap::new();
        starter_gear.insert("Paladin".to_string(), vec![1, 13]);
        starter_gear.insert("Rogue".to_string(), vec![27, 39]);
        starter_gear.insert("Mage".to_string(), vec![53, 65]);

        let mut gear_drops = HashMap::new();
        gear_drops.insert("Paladin".to_string(), (2..=12).collect());
        gear_drops.insert("Rogue".to_string(), (28..=38).collect());
        gear_drops.insert("Mage".to_string(), (54..=64).collect());

        Self {
            start_level: "NewbieRoad".into(),
            default_max_hp: 100,
            levels,
            spawn_points,
            special_spawns,
            doors,
            npcs,
            costs,
            dye_gold_cost: (0..=50).map(|level| 50 + level * 25).collect(),
            dye_idol_cost: (0..=50).map(|level| 1 + level / 10).collect(),
            dye_colors: (1..=64).map(|id| (id, id * 0x03_05_07)).collect(),
            starter_gear,
            gear_drops,
            material_drops: vec![1, 2, 3, 4, 5, 6],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_builtin_levels_resolve() {
        let tables = GameTables::builtin();
        assert!(tables.level("NewbieRoad").is_some());
        assert!(tables.level("NewbieRoadHard").is_some());
        assert!(tables.level("CraftTownHard").is_none());
        assert!(tables.is_dungeon("Castle"));
        assert_eq!(
            tables.special_spawn("SwampRoadNorthHard", "NewbieRoadHard"),
            Some(Vec2::new(20298.0, 639.0))
        );
        assert_eq!(tables.door_target("BridgeTown", 2), Some("Castle"));
    }

    #[test]
    fn test_builtin_costs_cover_first_steps() {
        let tables = GameTables::builtin();
        for kind in TimedActionKind::ALL {
            assert!(tables.cost(kind, 1, 1).is_some(), "{kind:?}");
        }
        let first = tables.cost(TimedActionKind::Building, 3, 1).unwrap();
        assert_eq!(first.gold, 500);
        assert_eq!(first.duration_secs, 3_600);
    }
}
