mod combat;
mod debug;
mod login;
mod look;
mod loot;
mod social;
mod timed;
mod world;

pub use combat::{BuffApplied, CombatStats, HpUpdate, PowerCast, PowerHit, RemoveBuff};
pub use debug::DebugInject;
pub use login::{
    Authenticate, CharacterList, CharacterSummary, CreateCharacter, Paperdoll, PaperdollRequest,
    PaperdollView, Popup, SelectCharacter, COLOR_BITS, GEAR_ID_BITS,
};
pub use look::{ApplyDyes, ChangeLook, DyePair, DyeSync, Look, LookUpdate, DYE_SLOTS};
pub use loot::{
    GrantReward, LootContents, LootDrop, PickupLoot, RewardGranted, GRANTED_GEAR, GRANTED_GOLD,
    GRANTED_HEALTH, GRANTED_MATERIAL,
};
pub use social::{
    EquipPets, ErrorMessage, GroupInvite, GroupInviteAnswer, GroupInvitePopup, GroupMemberView,
    GroupUpdate, GroupmateMap, MapLocation, PrivateDelivered, PrivateEcho, PrivateMessage,
    PublicChat,
};
pub use timed::{
    BuildingComplete, BuildingRequest, EggHatchComplete, EggHatchRequest, PetTrainComplete,
    PetTrainRequest, PremiumPurchase, SkillComplete, SkillRequest, TalentComplete, TalentRequest,
};
pub use world::{
    DoorState, DoorStateRequest, DoorTarget, EnterWorld, LevelTransferRequest, MoveFlags,
    NpcMove, OpenDoor, PlayerMove, PlayerSpawned, WorldJoin, DOOR_CLOSED, DOOR_STATIC,
};
