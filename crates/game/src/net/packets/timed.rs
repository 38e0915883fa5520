//! Request and completion packets of the deferred-action subsystems.
//!
//! Claims and cancels carry no fields ([`NoFields`](crate::net::NoFields)) and
//! speed-ups carry only the idol cost ([`SpeedUp`](crate::net::SpeedUp)).

use crate::net::codec::{BitReader, BitWriter, CodecError};
use crate::net::protocol::{Message, PacketType, Payload};

use super::social::PET_TYPE_BITS;

pub const BUILDING_ID_BITS: u32 = 5;
pub const BUILDING_RANK_BITS: u32 = 5;
pub const ABILITY_ID_BITS: u32 = 7;
pub const ABILITY_RANK_BITS: u32 = 4;
pub const CLASS_INDEX_BITS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingRequest {
    pub building_id: u32,
    pub rank: u32,
    pub pay_with_idols: bool,
}

impl Payload for BuildingRequest {
    fn encode(&self, w: &mut BitWriter) {
        w.write_bits(self.building_id, BUILDING_ID_BITS);
        w.write_bits(self.rank, BUILDING_RANK_BITS);
        w.write_bool(self.pay_with_idols);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            building_id: r.read_bits(BUILDING_ID_BITS)?,
            rank: r.read_bits(BUILDING_RANK_BITS)?,
            pay_with_idols: r.read_bool()?,
        })
    }
}

impl Message for BuildingRequest {
    const TYPE: PacketType = PacketType::BuildingRequest;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingComplete {
    pub building_id: u32,
    pub rank: u32,
    pub done: bool,
}

impl Payload for BuildingComplete {
    fn encode(&self, w: &mut BitWriter) {
        w.write_bits(self.building_id, BUILDING_ID_BITS);
        w.write_bits(self.rank, BUILDING_RANK_BITS);
        w.write_bool(self.done);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            building_id: r.read_bits(BUILDING_ID_BITS)?,
            rank: r.read_bits(BUILDING_RANK_BITS)?,
            done: r.read_bool()?,
        })
    }
}

impl Message for BuildingComplete {
    const TYPE: PacketType = PacketType::BuildingComplete;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillRequest {
    pub ability_id: u32,
    pub rank: u32,
    pub pay_with_idols: bool,
}

impl Payload for SkillRequest {
    fn encode(&self, w: &mut BitWriter) {
        w.write_bits(self.ability_id, ABILITY_ID_BITS);
        w.write_bits(self.rank, ABILITY_RANK_BITS);
        w.write_bool(self.pay_with_idols);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            ability_id: r.read_bits(ABILITY_ID_BITS)?,
            rank: r.read_bits(ABILITY_RANK_BITS)?,
            pay_with_idols: r.read_bool()?,
        })
    }
}

impl Message for SkillRequest {
    const TYPE: PacketType = PacketType::SkillRequest;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillComplete {
    pub ability_id: u32,
}

impl Payload for SkillComplete {
    fn encode(&self, w: &mut BitWriter) {
        w.write_bits(self.ability_id, ABILITY_ID_BITS);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            ability_id: r.read_bits(ABILITY_ID_BITS)?,
        })
    }
}

impl Message for SkillComplete {
    const TYPE: PacketType = PacketType::SkillComplete;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TalentRequest {
    pub class_index: u32,
    pub pay_with_idols: bool,
}

impl Payload for TalentRequest {
    fn encode(&self, w: &mut BitWriter) {
        w.write_bits(self.class_index, CLASS_INDEX_BITS);
        w.write_bool(self.pay_with_idols);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            class_index: r.read_bits(CLASS_INDEX_BITS)?,
            pay_with_idols: r.read_bool()?,
        })
    }
}

impl Message for TalentRequest {
    const TYPE: PacketType = PacketType::TalentRequest;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TalentComplete {
    pub class_index: u32,
    pub done: bool,
}

impl Payload for TalentComplete {
    fn encode(&self, w: &mut BitWriter) {
        w.write_bits(self.class_index, CLASS_INDEX_BITS);
        w.write_bool(self.done);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            class_index: r.read_bits(CLASS_INDEX_BITS)?,
            done: r.read_bool()?,
        })
    }
}

impl Message for TalentComplete {
    const TYPE: PacketType = PacketType::TalentComplete;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PetTrainRequest {
    pub pet_id: u32,
    pub rank: u32,
    pub pay_with_idols: bool,
}

impl Payload for PetTrainRequest {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.pet_id);
        w.write_var_u32(self.rank);
        w.write_bool(self.pay_with_idols);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            pet_id: r.read_var_u32()?,
            rank: r.read_var_u32()?,
            pay_with_idols: r.read_bool()?,
        })
    }
}

impl Message for PetTrainRequest {
    const TYPE: PacketType = PacketType::PetTrainRequest;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PetTrainComplete {
    pub pet_id: u32,
    pub rank: u32,
}

impl Payload for PetTrainComplete {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.pet_id);
        w.write_var_u32(self.rank);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            pet_id: r.read_var_u32()?,
            rank: r.read_var_u32()?,
        })
    }
}

impl Message for PetTrainComplete {
    const TYPE: PacketType = PacketType::PetTrainComplete;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EggHatchRequest {
    pub egg_id: u32,
    pub pet_type: u32,
    pub pay_with_idols: bool,
}

impl Payload for EggHatchRequest {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.egg_id);
        w.write_bits(self.pet_type, PET_TYPE_BITS);
        w.write_bool(self.pay_with_idols);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            egg_id: r.read_var_u32()?,
            pet_type: r.read_bits(PET_TYPE_BITS)?,
            pay_with_idols: r.read_bool()?,
        })
    }
}

impl Message for EggHatchRequest {
    const TYPE: PacketType = PacketType::EggHatchRequest;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EggHatchComplete {
    pub egg_id: u32,
    pub pet_type: u32,
}

impl Payload for EggHatchComplete {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.egg_id);
        w.write_bits(self.pet_type, PET_TYPE_BITS);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            egg_id: r.read_var_u32()?,
            pet_type: r.read_bits(PET_TYPE_BITS)?,
        })
    }
}

impl Message for EggHatchComplete {
    const TYPE: PacketType = PacketType::EggHatchComplete;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PremiumPurchase {
    pub label: String,
    pub cost: u32,
}

impl Payload for PremiumPurchase {
    fn encode(&self, w: &mut BitWriter) {
        w.write_string(&self.label);
        w.write_var_u32(self.cost);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            label: r.read_string()?,
            cost: r.read_var_u32()?,
        })
    }
}

impl Message for PremiumPurchase {
    const TYPE: PacketType = PacketType::PremiumPurchase;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_building_request_is_eleven_bits() {
        let request = BuildingRequest {
            building_id: 31,
            rank: 1,
            pay_with_idols: true,
        };
        let payload = request.to_payload();
        assert_eq!(payload, vec![0b1111_1000, 0b0110_0000]);
        assert_eq!(BuildingRequest::from_payload(&payload).unwrap(), request);
    }

    #[test]
    fn test_skill_request_widths() {
        let request = SkillRequest {
            ability_id: 127,
            rank: 15,
            pay_with_idols: false,
        };
        assert_eq!(
            SkillRequest::from_payload(&request.to_payload()).unwrap(),
            request
        );
        assert!(SkillRequest::from_payload(&[0xFF]).is_err());
    }
}
