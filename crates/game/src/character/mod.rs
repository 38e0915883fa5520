mod record;
mod store;

pub use record::{
    Appearance, Character, Egg, GearItem, InventoryItem, LevelPosition, Pet, PetSlot, TimedSlot,
    TimedSlots, GEAR_SLOTS, PET_SLOTS,
};
pub use store::{Account, AccountId, AccountStore, StoreError};
