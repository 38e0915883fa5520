use crate::net::codec::{BitReader, BitWriter, CodecError};
use crate::net::protocol::{read_point, write_point, Message, PacketType, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuffApplied {
    pub target: u32,
    pub buff_type: u32,
    pub instance: u32,
    pub duration_ms: u32,
}

impl Payload for BuffApplied {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.target);
        w.write_var_u32(self.buff_type);
        w.write_var_u32(self.instance);
        w.write_var_u32(self.duration_ms);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            target: r.read_var_u32()?,
            buff_type: r.read_var_u32()?,
            instance: r.read_var_u32()?,
            duration_ms: r.read_var_u32()?,
        })
    }
}

impl Message for BuffApplied {
    const TYPE: PacketType = PacketType::BuffApplied;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveBuff {
    pub entity_id: u32,
    pub buff_type: u32,
    pub instance: u32,
}

impl Payload for RemoveBuff {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.entity_id);
        w.write_var_u32(self.buff_type);
        w.write_var_u32(self.instance);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            entity_id: r.read_var_u32()?,
            buff_type: r.read_var_u32()?,
            instance: r.read_var_u32()?,
        })
    }
}

impl Message for RemoveBuff {
    const TYPE: PacketType = PacketType::RemoveBuff;
}

/// Client-reported combat totals. The server only trusts `max_hp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatStats {
    pub melee: u32,
    pub magic: u32,
    pub max_hp: u32,
    pub scale: u8,
    pub revision: u32,
}

impl Payload for CombatStats {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.melee);
        w.write_var_u32(self.magic);
        w.write_var_u32(self.max_hp);
        w.write_bits(self.scale as u32, 8);
        w.write_var_u32(self.revision);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            melee: r.read_var_u32()?,
            magic: r.read_var_u32()?,
            max_hp: r.read_var_u32()?,
            scale: r.read_bits(8)? as u8,
            revision: r.read_var_u32()?,
        })
    }
}

impl Message for CombatStats {
    const TYPE: PacketType = PacketType::CombatStats;
}

/// Power activation. Projectile, charge and extra-data sections are never
/// emitted by the server and are rejected on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerCast {
    pub caster: u32,
    pub power: u32,
    pub target_entity: Option<u32>,
    pub target_position: Option<(i32, i32)>,
}

impl Payload for PowerCast {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.caster);
        w.write_var_u32(self.power);
        w.write_bool(self.target_entity.is_some());
        if let Some(target) = self.target_entity {
            w.write_var_u32(target);
        }
        write_point(w, self.target_position);
        for _ in 0..4 {
            w.write_bool(false);
        }
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        let caster = r.read_var_u32()?;
        let power = r.read_var_u32()?;
        let target_entity = if r.read_bool()? {
            Some(r.read_var_u32()?)
        } else {
            None
        };
        let target_position = read_point(r)?;
        for _ in 0..4 {
            if r.read_bool()? {
                return Err(CodecError::OutOfRange {
                    field: "power cast extension",
                    value: 1,
                });
            }
        }
        Ok(Self {
            caster,
            power,
            target_entity,
            target_position,
        })
    }
}

impl Message for PowerCast {
    const TYPE: PacketType = PacketType::PowerCast;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerHit {
    pub target: u32,
    pub source: u32,
    pub damage: i32,
    pub power: u32,
    pub critical: bool,
}

impl Payload for PowerHit {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.target);
        w.write_var_u32(self.source);
        w.write_i32(self.damage);
        w.write_var_u32(self.power);
        w.write_bool(false);
        w.write_bool(false);
        w.write_bool(self.critical);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        let target = r.read_var_u32()?;
        let source = r.read_var_u32()?;
        let damage = r.read_i32()?;
        let power = r.read_var_u32()?;
        r.read_bool()?;
        r.read_bool()?;
        Ok(Self {
            target,
            source,
            damage,
            power,
            critical: r.read_bool()?,
        })
    }
}

impl Message for PowerHit {
    const TYPE: PacketType = PacketType::PowerHit;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpUpdate {
    pub entity_id: u32,
    pub delta: i32,
}

impl Payload for HpUpdate {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.entity_id);
        w.write_i32(self.delta);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            entity_id: r.read_var_u32()?,
            delta: r.read_i32()?,
        })
    }
}

impl Message for HpUpdate {
    const TYPE: PacketType = PacketType::HpUpdate;
}
