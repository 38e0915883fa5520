use crate::net::codec::{BitReader, BitWriter, CodecError};
use crate::net::protocol::{Message, PacketType, Payload};

use super::login::GEAR_ID_BITS;

/// Kill or event reward reported by the client for one source entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrantReward {
    pub receiver: u32,
    pub source: u32,
    pub drop_item: bool,
    pub item_mult: u32,
    pub drop_gear: bool,
    pub gear_mult: u32,
    pub drop_material: bool,
    pub drop_trove: bool,
    pub exp: u32,
    pub pet_exp: u32,
    pub hp_gain: u32,
    pub gold: u32,
    pub x: i32,
    pub y: i32,
    /// Present only on the killing blow.
    pub combo: Option<u32>,
}

impl Payload for GrantReward {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.receiver);
        w.write_var_u32(self.source);
        w.write_bool(self.drop_item);
        w.write_var_u32(self.item_mult);
        w.write_bool(self.drop_gear);
        w.write_var_u32(self.gear_mult);
        w.write_bool(self.drop_material);
        w.write_bool(self.drop_trove);
        w.write_var_u32(self.exp);
        w.write_var_u32(self.pet_exp);
        w.write_var_u32(self.hp_gain);
        w.write_var_u32(self.gold);
        w.write_i32(self.x);
        w.write_i32(self.y);
        w.write_bool(self.combo.is_some());
        if let Some(combo) = self.combo {
            w.write_var_u32(combo);
        }
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            receiver: r.read_var_u32()?,
            source: r.read_var_u32()?,
            drop_item: r.read_bool()?,
            item_mult: r.read_var_u32()?,
            drop_gear: r.read_bool()?,
            gear_mult: r.read_var_u32()?,
            drop_material: r.read_bool()?,
            drop_trove: r.read_bool()?,
            exp: r.read_var_u32()?,
            pet_exp: r.read_var_u32()?,
            hp_gain: r.read_var_u32()?,
            gold: r.read_var_u32()?,
            x: r.read_i32()?,
            y: r.read_i32()?,
            combo: if r.read_bool()? {
                Some(r.read_var_u32()?)
            } else {
                None
            },
        })
    }
}

impl Message for GrantReward {
    const TYPE: PacketType = PacketType::GrantReward;
}

/// What a dropped globe or chest holds, in wire branch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LootContents {
    Gear { gear_id: u32, tier: u32 },
    Material(u32),
    Gold(u32),
    Health(u32),
    Trove(u32),
    Dye(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LootDrop {
    pub loot_id: u32,
    pub x: i32,
    pub y: i32,
    pub contents: LootContents,
}

impl Payload for LootDrop {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.loot_id);
        w.write_i32(self.x);
        w.write_i32(self.y);

        // Each branch is announced by a true flag after all earlier ones
        // were false; the dye branch is the unflagged fallback.
        let branch = match self.contents {
            LootContents::Gear { .. } => 0,
            LootContents::Material(_) => 1,
            LootContents::Gold(_) => 2,
            LootContents::Health(_) => 3,
            LootContents::Trove(_) => 4,
            LootContents::Dye(_) => 5,
        };
        for _ in 0..branch {
            w.write_bool(false);
        }
        match self.contents {
            LootContents::Gear { gear_id, tier } => {
                w.write_bool(true);
                w.write_bits(gear_id, GEAR_ID_BITS);
                w.write_bits(tier, GEAR_ID_BITS);
            }
            LootContents::Material(v)
            | LootContents::Gold(v)
            | LootContents::Health(v)
            | LootContents::Trove(v) => {
                w.write_bool(true);
                w.write_var_u32(v);
            }
            LootContents::Dye(v) => w.write_var_u32(v),
        }
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        let loot_id = r.read_var_u32()?;
        let x = r.read_i32()?;
        let y = r.read_i32()?;

        let contents = if r.read_bool()? {
            LootContents::Gear {
                gear_id: r.read_bits(GEAR_ID_BITS)?,
                tier: r.read_bits(GEAR_ID_BITS)?,
            }
        } else if r.read_bool()? {
            LootContents::Material(r.read_var_u32()?)
        } else if r.read_bool()? {
            LootContents::Gold(r.read_var_u32()?)
        } else if r.read_bool()? {
            LootContents::Health(r.read_var_u32()?)
        } else if r.read_bool()? {
            LootContents::Trove(r.read_var_u32()?)
        } else {
            LootContents::Dye(r.read_var_u32()?)
        };

        Ok(Self {
            loot_id,
            x,
            y,
            contents,
        })
    }
}

impl Message for LootDrop {
    const TYPE: PacketType = PacketType::LootDrop;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickupLoot {
    pub loot_id: u32,
}

impl Payload for PickupLoot {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.loot_id);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            loot_id: r.read_var_u32()?,
        })
    }
}

impl Message for PickupLoot {
    const TYPE: PacketType = PacketType::PickupLoot;
}

pub const GRANTED_GOLD: u32 = 0;
pub const GRANTED_HEALTH: u32 = 1;
pub const GRANTED_GEAR: u32 = 2;
pub const GRANTED_MATERIAL: u32 = 3;

/// Confirmation of a picked-up reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardGranted {
    pub kind: u32,
    pub value: u32,
    pub tier: u32,
}

impl Payload for RewardGranted {
    fn encode(&self, w: &mut BitWriter) {
        w.write_bits(self.kind, 2);
        w.write_var_u32(self.value);
        w.write_var_u32(self.tier);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            kind: r.read_bits(2)?,
            value: r.read_var_u32()?,
            tier: r.read_var_u32()?,
        })
    }
}

impl Message for RewardGranted {
    const TYPE: PacketType = PacketType::RewardGranted;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loot_branches() {
        for contents in [
            LootContents::Gear {
                gear_id: 1200,
                tier: 2,
            },
            LootContents::Material(31),
            LootContents::Gold(250),
            LootContents::Health(40),
            LootContents::Trove(1),
            LootContents::Dye(17),
        ] {
            let drop = LootDrop {
                loot_id: 9,
                x: -10,
                y: 300,
                contents,
            };
            assert_eq!(LootDrop::from_payload(&drop.to_payload()).unwrap(), drop);
        }
    }

    #[test]
    fn test_grant_reward_combo_only_on_kill() {
        let grant = GrantReward {
            receiver: 40_000,
            source: 12,
            gold: 15,
            x: 100,
            y: -20,
            ..Default::default()
        };
        let plain = grant.to_payload();
        let with_combo = GrantReward {
            combo: Some(3),
            ..grant
        }
        .to_payload();
        assert!(with_combo.len() >= plain.len());
        assert_eq!(GrantReward::from_payload(&plain).unwrap(), grant);
        assert_eq!(
            GrantReward::from_payload(&with_combo).unwrap().combo,
            Some(3)
        );
    }
}
