use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::timed::TimedActionKind;

/// Number of visible gear slots on a character.
pub const GEAR_SLOTS: usize = 6;
/// Number of pets a character can bring into a level.
pub const PET_SLOTS: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Appearance {
    pub gender: String,
    pub head: String,
    pub hair: String,
    pub mouth: String,
    pub face: String,
    pub hair_color: u32,
    pub skin_color: u32,
    pub shirt_color: u32,
    pub pant_color: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearItem {
    pub gear_id: u32,
    #[serde(default)]
    pub tier: u32,
    #[serde(default)]
    pub colors: [u8; 2],
}

/// One inventory entry. Stackable kinds carry a count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InventoryItem {
    Gear(GearItem),
    Material { id: u32, count: u32 },
    Charm { id: u32, count: u32 },
    Consumable { id: u32, count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub unique_id: u32,
    pub pet_type: u32,
    pub rank: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetSlot {
    pub pet_type: u32,
    pub unique_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Egg {
    pub egg_id: u32,
    pub pet_type: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelPosition {
    pub name: String,
    pub x: f32,
    pub y: f32,
}

impl LevelPosition {
    pub fn new(name: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            name: name.into(),
            x,
            y,
        }
    }
}

/// Persisted state of one deferred action. `ready_at` is absolute unix time
/// in seconds so an elapsed slot can be recognised after a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedSlot {
    pub target_id: u32,
    pub result_value: u32,
    pub ready_at: u64,
    pub done: bool,
}

impl TimedSlot {
    pub fn is_ready(&self, now: u64) -> bool {
        self.done || self.ready_at <= now
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimedSlots {
    pub building: Option<TimedSlot>,
    pub skill: Option<TimedSlot>,
    pub talent: Option<TimedSlot>,
    pub pet_training: Option<TimedSlot>,
    pub egg_hatch: Option<TimedSlot>,
}

impl TimedSlots {
    pub fn get(&self, kind: TimedActionKind) -> Option<&TimedSlot> {
        match kind {
            TimedActionKind::Building => self.building.as_ref(),
            TimedActionKind::Skill => self.skill.as_ref(),
            TimedActionKind::Talent => self.talent.as_ref(),
            TimedActionKind::PetTraining => self.pet_training.as_ref(),
            TimedActionKind::EggHatch => self.egg_hatch.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, kind: TimedActionKind) -> &mut Option<TimedSlot> {
        match kind {
            TimedActionKind::Building => &mut self.building,
            TimedActionKind::Skill => &mut self.skill,
            TimedActionKind::Talent => &mut self.talent,
            TimedActionKind::PetTraining => &mut self.pet_training,
            TimedActionKind::EggHatch => &mut self.egg_hatch,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TimedActionKind, &TimedSlot)> {
        TimedActionKind::ALL
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|slot| (kind, slot)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Character {
    pub name: String,
    pub class_name: String,
    pub level: u32,
    pub appearance: Appearance,
    pub gold: u32,
    pub idols: u32,
    pub equipped: [Option<GearItem>; GEAR_SLOTS],
    pub inventory: Vec<InventoryItem>,
    pub pets: Vec<Pet>,
    pub equipped_pets: Vec<PetSlot>,
    pub eggs: Vec<Egg>,
    pub building_ranks: BTreeMap<u32, u32>,
    pub abilities: BTreeMap<u32, u32>,
    pub talent_points: BTreeMap<u32, u32>,
    pub current_level: Option<LevelPosition>,
    pub previous_level: Option<LevelPosition>,
    pub timed: TimedSlots,
}

impl Character {
    pub fn new(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            level: 1,
            ..Default::default()
        }
    }

    pub fn building_rank(&self, building_id: u32) -> u32 {
        self.building_ranks.get(&building_id).copied().unwrap_or(0)
    }

    pub fn ability_rank(&self, ability_id: u32) -> u32 {
        self.abilities.get(&ability_id).copied().unwrap_or(0)
    }

    pub fn talent_points(&self, class_index: u32) -> u32 {
        self.talent_points.get(&class_index).copied().unwrap_or(0)
    }

    pub fn pet(&self, unique_id: u32) -> Option<&Pet> {
        self.pets.iter().find(|p| p.unique_id == unique_id)
    }

    pub fn pet_mut(&mut self, unique_id: u32) -> Option<&mut Pet> {
        self.pets.iter_mut().find(|p| p.unique_id == unique_id)
    }

    pub fn next_pet_id(&self) -> u32 {
        self.pets.iter().map(|p| p.unique_id).max().unwrap_or(0) + 1
    }

    pub fn add_gear(&mut self, gear_id: u32, tier: u32) {
        self.inventory.push(InventoryItem::Gear(GearItem {
            gear_id,
            tier,
            colors: [0, 0],
        }));
    }

    /// Stack a material onto an existing entry or start a new one.
    pub fn add_material(&mut self, material_id: u32, count: u32) {
        for item in &mut self.inventory {
            if let InventoryItem::Material { id, count: have } = item {
                if *id == material_id {
                    *have = have.saturating_add(count);
                    return;
                }
            }
        }
        self.inventory.push(InventoryItem::Material {
            id: material_id,
            count,
        });
    }

    pub fn gear_ids(&self) -> [u32; GEAR_SLOTS] {
        let mut ids = [0; GEAR_SLOTS];
        for (slot, gear) in ids.iter_mut().zip(self.equipped.iter()) {
            *slot = gear.map(|g| g.gear_id).unwrap_or(0);
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materials_stack() {
        let mut c = Character::new("Ada", "Rogue");
        c.add_material(4, 1);
        c.add_material(4, 2);
        c.add_material(9, 1);
        assert_eq!(
            c.inventory,
            vec![
                InventoryItem::Material { id: 4, count: 3 },
                InventoryItem::Material { id: 9, count: 1 },
            ]
        );
    }

    #[test]
    fn test_record_survives_json() {
        let mut c = Character::new("Ada", "Mage");
        c.building_ranks.insert(3, 2);
        c.add_gear(53, 1);
        c.timed.building = Some(TimedSlot {
            target_id: 3,
            result_value: 3,
            ready_at: 1_700_000_000,
            done: false,
        });
        let json = serde_json::to_string(&c).unwrap();
        let back: Character = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_sparse_record_loads_with_defaults() {
        let c: Character = serde_json::from_str(r#"{"name":"Old","gold":5}"#).unwrap();
        assert_eq!(c.gold, 5);
        assert_eq!(c.building_rank(1), 0);
        assert!(c.timed.iter().next().is_none());
    }
}
