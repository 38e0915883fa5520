use crate::net::codec::{BitReader, BitWriter, CodecError};
use crate::net::protocol::{read_small, Message, PacketType, Payload};

use super::login::COLOR_BITS;

pub const DYE_BITS: u32 = 8;
pub const DYE_SLOTS: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Look {
    pub head: String,
    pub hair: String,
    pub mouth: String,
    pub face: String,
    pub gender: String,
    pub hair_color: u32,
    pub skin_color: u32,
}

impl Look {
    fn write(&self, w: &mut BitWriter) {
        for part in [&self.head, &self.hair, &self.mouth, &self.face, &self.gender] {
            w.write_string(part);
        }
        w.write_bits(self.hair_color, COLOR_BITS);
        w.write_bits(self.skin_color, COLOR_BITS);
    }

    fn read(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            head: r.read_string()?,
            hair: r.read_string()?,
            mouth: r.read_string()?,
            face: r.read_string()?,
            gender: r.read_string()?,
            hair_color: r.read_bits(COLOR_BITS)?,
            skin_color: r.read_bits(COLOR_BITS)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeLook(pub Look);

impl Payload for ChangeLook {
    fn encode(&self, w: &mut BitWriter) {
        self.0.write(w);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self(Look::read(r)?))
    }
}

impl Message for ChangeLook {
    const TYPE: PacketType = PacketType::ChangeLook;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookUpdate {
    pub entity_id: u32,
    pub look: Look,
}

impl Payload for LookUpdate {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.entity_id);
        self.look.write(w);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            entity_id: r.read_var_u32()?,
            look: Look::read(r)?,
        })
    }
}

impl Message for LookUpdate {
    const TYPE: PacketType = PacketType::LookUpdate;
}

pub type DyePair = (u8, u8);

fn write_dye_slots(w: &mut BitWriter, slots: &[Option<DyePair>; DYE_SLOTS]) {
    for slot in slots {
        w.write_bool(slot.is_some());
        if let Some((first, second)) = slot {
            w.write_bits(*first as u32, DYE_BITS);
            w.write_bits(*second as u32, DYE_BITS);
        }
    }
}

fn read_dye_slots(r: &mut BitReader<'_>) -> Result<[Option<DyePair>; DYE_SLOTS], CodecError> {
    let mut slots = [None; DYE_SLOTS];
    for slot in &mut slots {
        if r.read_bool()? {
            *slot = Some((read_small(r, DYE_BITS)?, read_small(r, DYE_BITS)?));
        }
    }
    Ok(slots)
}

fn read_optional(r: &mut BitReader<'_>, width: u32) -> Result<Option<u32>, CodecError> {
    if r.read_bool()? {
        Ok(Some(r.read_bits(width)?))
    } else {
        Ok(None)
    }
}

fn write_optional(w: &mut BitWriter, value: Option<u32>, width: u32) {
    w.write_bool(value.is_some());
    if let Some(v) = value {
        w.write_bits(v, width);
    }
}

/// Dye request: per gear slot an optional pair of dye ids, then shirt and
/// pants as dye ids resolved to colors server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyDyes {
    pub entity_id: u32,
    pub slots: [Option<DyePair>; DYE_SLOTS],
    pub pay_with_idols: bool,
    pub shirt_dye: Option<u32>,
    pub pants_dye: Option<u32>,
}

impl Payload for ApplyDyes {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.entity_id);
        write_dye_slots(w, &self.slots);
        w.write_bool(self.pay_with_idols);
        write_optional(w, self.shirt_dye, DYE_BITS);
        write_optional(w, self.pants_dye, DYE_BITS);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            entity_id: r.read_var_u32()?,
            slots: read_dye_slots(r)?,
            pay_with_idols: r.read_bool()?,
            shirt_dye: read_optional(r, DYE_BITS)?,
            pants_dye: read_optional(r, DYE_BITS)?,
        })
    }
}

impl Message for ApplyDyes {
    const TYPE: PacketType = PacketType::ApplyDyes;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DyeSync {
    pub entity_id: u32,
    pub slots: [Option<DyePair>; DYE_SLOTS],
    pub shirt_color: Option<u32>,
    pub pant_color: Option<u32>,
}

impl Payload for DyeSync {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.entity_id);
        write_dye_slots(w, &self.slots);
        write_optional(w, self.shirt_color, COLOR_BITS);
        write_optional(w, self.pant_color, COLOR_BITS);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            entity_id: r.read_var_u32()?,
            slots: read_dye_slots(r)?,
            shirt_color: read_optional(r, COLOR_BITS)?,
            pant_color: read_optional(r, COLOR_BITS)?,
        })
    }
}

impl Message for DyeSync {
    const TYPE: PacketType = PacketType::DyeSync;
}
