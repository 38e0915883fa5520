use bytes::Bytes;

use super::codec::{BitReader, BitWriter, CodecError};
use super::frame::{Frame, FrameError};

pub const DEFAULT_PORT: u16 = 8080;
pub const MAX_CHARACTERS: u32 = 8;

macro_rules! packet_types {
    ($($name:ident = $id:literal,)*) => {
        /// Every packet id the server reads or writes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum PacketType {
            $($name = $id,)*
        }

        impl PacketType {
            pub fn from_id(id: u16) -> Option<Self> {
                match id {
                    $($id => Some(Self::$name),)*
                    _ => None,
                }
            }
        }
    };
}

packet_types! {
    NpcMove = 0x07,
    PlayerMove = 0x09,
    BuffApplied = 0x0B,
    RemoveBuff = 0x0C,
    CombatStats = 0x0D,
    Authenticate = 0x13,
    CharacterList = 0x15,
    SelectCharacter = 0x16,
    CreateCharacter = 0x17,
    PaperdollRequest = 0x19,
    Paperdoll = 0x1A,
    Popup = 0x1B,
    LevelTransferRequest = 0x1D,
    WorldJoin = 0x1F,
    LevelLoaded = 0x20,
    EnterWorld = 0x21,
    PlayerSpawned = 0x22,
    PowerHit = 0x2A,
    PowerCast = 0x2B,
    PublicChat = 0x2C,
    OpenDoor = 0x2D,
    DoorTarget = 0x2E,
    GrantReward = 0x31,
    LootDrop = 0x32,
    PickupLoot = 0x33,
    RewardGranted = 0x34,
    HpUpdate = 0x3A,
    ChangeLook = 0x3F,
    ApplyDyes = 0x40,
    DoorStateRequest = 0x41,
    DoorState = 0x42,
    ErrorMessage = 0x44,
    PrivateMessage = 0x46,
    PrivateDelivered = 0x47,
    PrivateEcho = 0x48,
    GroupInvite = 0x57,
    GroupInvitePopup = 0x58,
    GroupInviteAnswer = 0x59,
    GroupLeave = 0x5A,
    GroupUpdate = 0x75,
    EquipPets = 0x7E,
    MapLocation = 0x8B,
    GroupmateMap = 0x8C,
    LookUpdate = 0x8F,
    DyeSync = 0x111,
    PremiumPurchase = 0xB5,
    SkillRequest = 0xBE,
    SkillComplete = 0xBF,
    SkillClaim = 0xD1,
    TalentRequest = 0xD4,
    TalentComplete = 0xD5,
    TalentClaim = 0xD6,
    BuildingRequest = 0xD7,
    BuildingComplete = 0xD8,
    BuildingClaim = 0xD9,
    BuildingCancel = 0xDB,
    BuildingSpeedUp = 0xDC,
    SkillCancel = 0xDD,
    SkillSpeedUp = 0xDE,
    TalentCancel = 0xDF,
    TalentSpeedUp = 0xE0,
    PetTrainRequest = 0xE2,
    PetTrainComplete = 0xE3,
    PetTrainClaim = 0xE4,
    PetTrainCancel = 0xE5,
    PetTrainSpeedUp = 0xE6,
    EggHatchRequest = 0xE7,
    EggHatchComplete = 0xE8,
    EggHatchClaim = 0xE9,
    EggHatchCancel = 0xEA,
    EggHatchSpeedUp = 0xEB,
    DebugInject = 0xF0,
}

impl PacketType {
    pub fn id(self) -> u16 {
        self as u16
    }
}

/// A fixed field layout built from codec primitives.
pub trait Payload: Sized {
    fn encode(&self, w: &mut BitWriter);
    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError>;

    fn from_payload(payload: &[u8]) -> Result<Self, CodecError> {
        Self::decode(&mut BitReader::new(payload))
    }

    fn to_payload(&self) -> Vec<u8> {
        let mut w = BitWriter::new();
        self.encode(&mut w);
        w.into_bytes()
    }
}

/// A payload bound to one packet id.
pub trait Message: Payload {
    const TYPE: PacketType;

    fn to_frame(&self) -> Frame {
        Frame::new(Self::TYPE.id(), self.to_payload())
    }

    fn to_bytes(&self) -> Result<Bytes, FrameError> {
        self.to_frame().to_bytes()
    }
}

/// Packets with no fields (claims, cancels, acknowledgements).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoFields;

impl Payload for NoFields {
    fn encode(&self, _w: &mut BitWriter) {}

    fn decode(_r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self)
    }
}

/// Premium-currency completion of a pending timed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedUp {
    pub cost: u32,
}

impl Payload for SpeedUp {
    fn encode(&self, w: &mut BitWriter) {
        w.write_var_u32(self.cost);
    }

    fn decode(r: &mut BitReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            cost: r.read_var_u32()?,
        })
    }
}

pub(crate) fn write_point(w: &mut BitWriter, point: Option<(i32, i32)>) {
    w.write_bool(point.is_some());
    if let Some((x, y)) = point {
        w.write_i32(x);
        w.write_i32(y);
    }
}

pub(crate) fn read_point(r: &mut BitReader<'_>) -> Result<Option<(i32, i32)>, CodecError> {
    if r.read_bool()? {
        Ok(Some((r.read_i32()?, r.read_i32()?)))
    } else {
        Ok(None)
    }
}

pub(crate) fn read_small(r: &mut BitReader<'_>, width: u32) -> Result<u8, CodecError> {
    debug_assert!(width <= 8);
    Ok(r.read_bits(width)? as u8)
}
