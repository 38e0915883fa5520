use crate::net::codec::{BitReader, BitWriter, CodecError};
use crate::net::protocol::{Message, PacketType, Payload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicChat {
    pub entity_id: u32,
    pub message: String,
}

impl Payload for PublicChat {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.entity_id);
        w.write_string(&self.message);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            entity_id: r.read_var_u32()?,
            message: r.read_string()?,
        })
    }
}

impl Message for PublicChat {
    const TYPE: PacketType = PacketType::PublicChat;
}

/// Two-string packets that only differ by id.
macro_rules! name_and_text {
    ($name:ident, $first:ident, $type:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub $first: String,
            pub message: String,
        }

        impl Payload for $name {
            fn encode(&self, w: &mut BitWriter) {
                w.write_string(&self.$first);
                w.write_string(&self.message);
            }

            fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
                Ok(Self {
                    $first: r.read_string()?,
                    message: r.read_string()?,
                })
            }
        }

        impl Message for $name {
            const TYPE: PacketType = PacketType::$type;
        }
    };
}

name_and_text!(PrivateMessage, recipient, PrivateMessage);
name_and_text!(PrivateDelivered, sender, PrivateDelivered);
name_and_text!(PrivateEcho, recipient, PrivateEcho);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub message: String,
}

impl Payload for ErrorMessage {
    fn encode(&self, w: &mut BitWriter) {
        w.write_string(&self.message);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            message: r.read_string()?,
        })
    }
}

impl Message for ErrorMessage {
    const TYPE: PacketType = PacketType::ErrorMessage;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInvite {
    pub name: String,
}

impl Payload for GroupInvite {
    fn encode(&self, w: &mut BitWriter) {
        w.write_string(&self.name);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            name: r.read_string()?,
        })
    }
}

impl Message for GroupInvite {
    const TYPE: PacketType = PacketType::GroupInvite;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInvitePopup {
    pub inviter_entity: u32,
    pub inviter_name: String,
    pub text: String,
}

impl Payload for GroupInvitePopup {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.inviter_entity);
        w.write_string(&self.inviter_name);
        w.write_string(&self.text);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            inviter_entity: r.read_var_u32()?,
            inviter_name: r.read_string()?,
            text: r.read_string()?,
        })
    }
}

impl Message for GroupInvitePopup {
    const TYPE: PacketType = PacketType::GroupInvitePopup;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInviteAnswer {
    pub inviter_entity: u32,
    pub inviter_name: String,
    pub accepted: bool,
}

impl Payload for GroupInviteAnswer {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.inviter_entity);
        w.write_string(&self.inviter_name);
        w.write_bool(self.accepted);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            inviter_entity: r.read_var_u32()?,
            inviter_name: r.read_string()?,
            accepted: r.read_bool()?,
        })
    }
}

impl Message for GroupInviteAnswer {
    const TYPE: PacketType = PacketType::GroupInviteAnswer;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMemberView {
    pub leader: bool,
    pub online: bool,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub same_level: bool,
}

/// Full party roster. `exists == false` tells the client it has no party.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupUpdate {
    pub exists: bool,
    pub locked: bool,
    pub members: Vec<GroupMemberView>,
}

impl Payload for GroupUpdate {
    fn encode(&self, w: &mut BitWriter) {
        w.write_bool(self.exists);
        w.write_bool(self.locked);
        w.write_var_u32(self.members.len() as u32);
        for m in &self.members {
            w.write_bool(m.leader);
            w.write_bool(m.online);
            w.write_string(&m.name);
            w.write_i32(m.x);
            w.write_i32(m.y);
            w.write_bool(m.same_level);
        }
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        let exists = r.read_bool()?;
        let locked = r.read_bool()?;
        let count = r.read_var_u32()?;
        let mut members = Vec::new();
        for _ in 0..count {
            members.push(GroupMemberView {
                leader: r.read_bool()?,
                online: r.read_bool()?,
                name: r.read_string()?,
                x: r.read_i32()?,
                y: r.read_i32()?,
                same_level: r.read_bool()?,
            });
        }
        Ok(Self {
            exists,
            locked,
            members,
        })
    }
}

impl Message for GroupUpdate {
    const TYPE: PacketType = PacketType::GroupUpdate;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapLocation {
    pub x: i32,
    pub y: i32,
}

impl Payload for MapLocation {
    fn encode(&self, w: &mut BitWriter) {
        w.write_i32(self.x);
        w.write_i32(self.y);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            x: r.read_i32()?,
            y: r.read_i32()?,
        })
    }
}

impl Message for MapLocation {
    const TYPE: PacketType = PacketType::MapLocation;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupmateMap {
    pub name: String,
    pub x: i32,
    pub y: i32,
}

impl Payload for GroupmateMap {
    fn encode(&self, w: &mut BitWriter) {
        w.write_string(&self.name);
        w.write_i32(self.x);
        w.write_i32(self.y);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            name: r.read_string()?,
            x: r.read_i32()?,
            y: r.read_i32()?,
        })
    }
}

impl Message for GroupmateMap {
    const TYPE: PacketType = PacketType::GroupmateMap;
}

pub const PET_TYPE_BITS: u32 = 7;

/// Active pet plus three resting pets as `(pet_type, unique_id)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EquipPets {
    pub pets: [(u32, u32); 4],
}

impl Payload for EquipPets {
    fn encode(&self, w: &mut BitWriter) {
        for (pet_type, unique_id) in self.pets {
            w.write_bits(pet_type, PET_TYPE_BITS);
            w.write_var_u32(unique_id);
        }
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        let mut pets = [(0, 0); 4];
        for pet in &mut pets {
            *pet = (r.read_bits(PET_TYPE_BITS)?, r.read_var_u32()?);
        }
        Ok(Self { pets })
    }
}

impl Message for EquipPets {
    const TYPE: PacketType = PacketType::EquipPets;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_update_roster() {
        let update = GroupUpdate {
            exists: true,
            locked: false,
            members: vec![
                GroupMemberView {
                    leader: true,
                    online: true,
                    name: "Ada".into(),
                    x: 10,
                    y: -4,
                    same_level: true,
                },
                GroupMemberView {
                    leader: false,
                    online: true,
                    name: "Bo".into(),
                    x: 0,
                    y: 0,
                    same_level: false,
                },
            ],
        };
        assert_eq!(
            GroupUpdate::from_payload(&update.to_payload()).unwrap(),
            update
        );
    }

    #[test]
    fn test_private_message_pair() {
        let pm = PrivateMessage {
            recipient: "Bo".into(),
            message: "hi".into(),
        };
        let decoded = PrivateMessage::from_payload(&pm.to_payload()).unwrap();
        assert_eq!(decoded, pm);
        assert_eq!(PrivateEcho::TYPE.id(), 0x48);
    }
}
