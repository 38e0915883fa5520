use bitflags::bitflags;

use crate::net::codec::{BitReader, BitWriter, CodecError};
use crate::net::protocol::{read_point, write_point, Message, PacketType, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldJoin {
    pub token: u32,
}

impl Payload for WorldJoin {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.token);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            token: r.read_var_u32()?,
        })
    }
}

impl Message for WorldJoin {
    const TYPE: PacketType = PacketType::WorldJoin;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnterWorld {
    pub token: u32,
    pub old_swf: String,
    pub old_position: Option<(i32, i32)>,
    pub host: String,
    pub port: u16,
    pub swf: String,
    pub map_id: u32,
    pub base_id: u32,
    pub level: String,
    pub hard: bool,
    pub dungeon: bool,
    pub position: Option<(i32, i32)>,
}

impl Payload for EnterWorld {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.token);
        w.write_string(&self.old_swf);
        write_point(w, self.old_position);
        w.write_string(&self.host);
        w.write_bits(self.port as u32, 16);
        w.write_string(&self.swf);
        w.write_var_u32(self.map_id);
        w.write_var_u32(self.base_id);
        w.write_string(&self.level);
        w.write_bool(self.hard);
        w.write_bool(self.dungeon);
        write_point(w, self.position);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            token: r.read_var_u32()?,
            old_swf: r.read_string()?,
            old_position: read_point(r)?,
            host: r.read_string()?,
            port: r.read_bits(16)? as u16,
            swf: r.read_string()?,
            map_id: r.read_var_u32()?,
            base_id: r.read_var_u32()?,
            level: r.read_string()?,
            hard: r.read_bool()?,
            dungeon: r.read_bool()?,
            position: read_point(r)?,
        })
    }
}

impl Message for EnterWorld {
    const TYPE: PacketType = PacketType::EnterWorld;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTransferRequest {
    pub token: u32,
    pub level: String,
}

impl Payload for LevelTransferRequest {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.token);
        w.write_string(&self.level);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            token: r.read_var_u32()?,
            level: r.read_string()?,
        })
    }
}

impl Message for LevelTransferRequest {
    const TYPE: PacketType = PacketType::LevelTransferRequest;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenDoor {
    pub door_id: u32,
}

impl Payload for OpenDoor {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.door_id);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            door_id: r.read_var_u32()?,
        })
    }
}

impl Message for OpenDoor {
    const TYPE: PacketType = PacketType::OpenDoor;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorTarget {
    pub door_id: u32,
    pub level: String,
}

impl Payload for DoorTarget {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.door_id);
        w.write_string(&self.level);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            door_id: r.read_var_u32()?,
            level: r.read_string()?,
        })
    }
}

impl Message for DoorTarget {
    const TYPE: PacketType = PacketType::DoorTarget;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorStateRequest {
    pub door_id: u32,
}

impl Payload for DoorStateRequest {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.door_id);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            door_id: r.read_var_u32()?,
        })
    }
}

impl Message for DoorStateRequest {
    const TYPE: PacketType = PacketType::DoorStateRequest;
}

pub const DOOR_CLOSED: u32 = 0;
pub const DOOR_STATIC: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorState {
    pub door_id: u32,
    pub state: u32,
    pub target: String,
}

impl Payload for DoorState {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.door_id);
        w.write_var_u32(self.state);
        w.write_string(&self.target);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            door_id: r.read_var_u32()?,
            state: r.read_var_u32()?,
            target: r.read_string()?,
        })
    }
}

impl Message for DoorState {
    const TYPE: PacketType = PacketType::DoorState;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSpawned {
    pub entity_id: u32,
    pub x: i32,
    pub y: i32,
    pub hp: u32,
    pub max_hp: u32,
}

impl Payload for PlayerSpawned {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.entity_id);
        w.write_i32(self.x);
        w.write_i32(self.y);
        w.write_var_u32(self.hp);
        w.write_var_u32(self.max_hp);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            entity_id: r.read_var_u32()?,
            x: r.read_i32()?,
            y: r.read_i32()?,
            hp: r.read_var_u32()?,
            max_hp: r.read_var_u32()?,
        })
    }
}

impl Message for PlayerSpawned {
    const TYPE: PacketType = PacketType::PlayerSpawned;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerMove {
    pub entity_id: u32,
    pub x: i32,
    pub y: i32,
    pub vx: i32,
}

impl Payload for PlayerMove {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.entity_id);
        w.write_i32(self.x);
        w.write_i32(self.y);
        w.write_i32(self.vx);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            entity_id: r.read_var_u32()?,
            x: r.read_i32()?,
            y: r.read_i32()?,
            vx: r.read_i32()?,
        })
    }
}

impl Message for PlayerMove {
    const TYPE: PacketType = PacketType::PlayerMove;
}

bitflags! {
    /// Six state bits trailing an NPC move, most significant first.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MoveFlags: u8 {
        const FACING_LEFT = 1 << 5;
        const RUNNING = 1 << 4;
        const ATTACKING = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpcMove {
    pub entity_id: u32,
    pub dx: i32,
    pub dy: i32,
    pub dvx: i32,
    pub flags: MoveFlags,
}

impl Payload for NpcMove {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.entity_id);
        w.write_i32(self.dx);
        w.write_i32(self.dy);
        w.write_i32(self.dvx);
        w.write_bits(0, 2);
        w.write_bits(self.flags.bits() as u32, 6);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        let entity_id = r.read_var_u32()?;
        let dx = r.read_i32()?;
        let dy = r.read_i32()?;
        let dvx = r.read_i32()?;
        r.read_bits(2)?;
        let flags = MoveFlags::from_bits_truncate(r.read_bits(6)? as u8);
        Ok(Self {
            entity_id,
            dx,
            dy,
            dvx,
            flags,
        })
    }
}

impl Message for NpcMove {
    const TYPE: PacketType = PacketType::NpcMove;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_world_optional_coordinates() {
        let packet = EnterWorld {
            token: 77,
            old_swf: "Levels/NewbieRoad.swf".into(),
            old_position: Some((1421, 826)),
            host: "127.0.0.1".into(),
            port: 8080,
            swf: "Levels/Castle.swf".into(),
            map_id: 12,
            base_id: 4,
            level: "CastleHard".into(),
            hard: true,
            dungeon: true,
            position: None,
        };
        let decoded = EnterWorld::from_payload(&packet.to_payload()).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_npc_move_flag_bits() {
        let packet = NpcMove {
            entity_id: 5,
            dx: -3,
            dy: 0,
            dvx: 12,
            flags: MoveFlags::FACING_LEFT | MoveFlags::RUNNING,
        };
        let payload = packet.to_payload();
        // id (4 + 4 bits) + 3 * 32 + 2 + 6
        assert_eq!(payload.len(), 14);
        let decoded = NpcMove::from_payload(&payload).unwrap();
        assert_eq!(decoded, packet);
        assert!(!decoded.flags.contains(MoveFlags::ATTACKING));
    }

    #[test]
    fn test_truncated_transfer_request() {
        let full = LevelTransferRequest {
            token: 9,
            level: "BridgeTown".into(),
        }
        .to_payload();
        let cut = &full[..full.len() - 3];
        assert!(matches!(
            LevelTransferRequest::from_payload(cut),
            Err(CodecError::Truncated { .. })
        ));
    }
}
