//! The deferred-action state machine.
//!
//! `Idle -> Pending(ready_at) -> Done -> Idle`, with cancel allowed from
//! `Pending` and `Done`. Every transition works on a [`Character`] value so
//! callers can run it inside a store update and get rollback for free.

use serde::{Deserialize, Serialize};

use crate::character::{Character, Pet, TimedSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimedActionKind {
    Building,
    Skill,
    Talent,
    PetTraining,
    EggHatch,
}

impl TimedActionKind {
    pub const ALL: [Self; 5] = [
        Self::Building,
        Self::Skill,
        Self::Talent,
        Self::PetTraining,
        Self::EggHatch,
    ];

    /// Label shown on the client's premium purchase receipt.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Building => "BuildingSpeedup",
            Self::Skill => "SkillSpeedup",
            Self::Talent => "TalentSpeedup",
            Self::PetTraining => "PetTrainingSpeedup",
            Self::EggHatch => "EggHatchSpeedup",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Gold,
    Idols,
}

impl Currency {
    pub fn from_idols_flag(pay_with_idols: bool) -> Self {
        if pay_with_idols {
            Self::Idols
        } else {
            Self::Gold
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCost {
    pub gold: u32,
    pub idols: u32,
    pub duration_secs: u64,
}

impl ActionCost {
    pub fn price(&self, currency: Currency) -> u32 {
        match currency {
            Currency::Gold => self.gold,
            Currency::Idols => self.idols,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedRequest {
    pub kind: TimedActionKind,
    pub target: u32,
    pub result: u32,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimedActionError {
    #[error("{kind:?} step {requested} requested, only {expected} allowed")]
    WrongStep {
        kind: TimedActionKind,
        requested: u32,
        expected: u32,
    },
    #[error("{0:?} slot is already in use")]
    SlotBusy(TimedActionKind),
    #[error("no {kind:?} cost for target {target} result {result}")]
    UnknownCost {
        kind: TimedActionKind,
        target: u32,
        result: u32,
    },
    #[error("{kind:?} target {target} does not exist")]
    UnknownTarget { kind: TimedActionKind, target: u32 },
    #[error("insufficient {currency:?}: need {needed}, have {available}")]
    InsufficientFunds {
        currency: Currency,
        needed: u32,
        available: u32,
    },
    #[error("{0:?} has nothing pending")]
    NotPending(TimedActionKind),
    #[error("{0:?} is not ready yet")]
    NotReady(TimedActionKind),
}

/// Deduct `amount` or fail without touching the balance.
pub fn charge(c: &mut Character, currency: Currency, amount: u32) -> Result<(), TimedActionError> {
    let balance = match currency {
        Currency::Gold => &mut c.gold,
        Currency::Idols => &mut c.idols,
    };
    *balance = balance
        .checked_sub(amount)
        .ok_or(TimedActionError::InsufficientFunds {
            currency,
            needed: amount,
            available: *balance,
        })?;
    Ok(())
}

/// The only result a new request for `target` may ask for.
pub fn expected_result(
    c: &Character,
    kind: TimedActionKind,
    target: u32,
) -> Result<u32, TimedActionError> {
    let unknown = TimedActionError::UnknownTarget { kind, target };
    match kind {
        TimedActionKind::Building => Ok(c.building_rank(target) + 1),
        TimedActionKind::Skill => Ok(c.ability_rank(target) + 1),
        TimedActionKind::Talent => Ok(c.talent_points(target) + 1),
        TimedActionKind::PetTraining => c.pet(target).map(|p| p.rank + 1).ok_or(unknown),
        // An egg always hatches into the pet type it was found as.
        TimedActionKind::EggHatch => c
            .eggs
            .iter()
            .find(|e| e.egg_id == target)
            .map(|e| e.pet_type)
            .ok_or(unknown),
    }
}

/// Validate, charge and start a request. Returns the new pending slot.
pub fn begin(
    c: &mut Character,
    request: &TimedRequest,
    lookup: impl FnOnce(TimedActionKind, u32, u32) -> Option<ActionCost>,
    now: u64,
) -> Result<TimedSlot, TimedActionError> {
    let kind = request.kind;
    let expected = expected_result(c, kind, request.target)?;
    if request.result != expected {
        return Err(TimedActionError::WrongStep {
            kind,
            requested: request.result,
            expected,
        });
    }
    if c.timed.get(kind).is_some() {
        return Err(TimedActionError::SlotBusy(kind));
    }
    let cost = lookup(kind, request.target, request.result).ok_or(
        TimedActionError::UnknownCost {
            kind,
            target: request.target,
            result: request.result,
        },
    )?;
    charge(c, request.currency, cost.price(request.currency))?;

    let slot = TimedSlot {
        target_id: request.target,
        result_value: request.result,
        ready_at: now.saturating_add(cost.duration_secs),
        done: false,
    };
    *c.timed.slot_mut(kind) = Some(slot);
    Ok(slot)
}

/// Finish a pending action immediately for `idol_cost` idols.
pub fn speed_up(
    c: &mut Character,
    kind: TimedActionKind,
    idol_cost: u32,
    now: u64,
) -> Result<TimedSlot, TimedActionError> {
    match c.timed.get(kind) {
        Some(slot) if !slot.done => {}
        _ => return Err(TimedActionError::NotPending(kind)),
    }
    charge(c, Currency::Idols, idol_cost)?;
    let slot = c
        .timed
        .slot_mut(kind)
        .as_mut()
        .ok_or(TimedActionError::NotPending(kind))?;
    slot.done = true;
    slot.ready_at = slot.ready_at.min(now);
    Ok(*slot)
}

/// Clear the slot without applying anything. Spent currency is kept.
pub fn cancel(c: &mut Character, kind: TimedActionKind) -> Option<TimedSlot> {
    c.timed.slot_mut(kind).take()
}

/// Timer completion. Only marks the slot that was scheduled: a slot that was
/// cancelled, re-requested or already finished is left alone.
pub fn complete(c: &mut Character, kind: TimedActionKind, ready_at: u64) -> bool {
    match c.timed.slot_mut(kind) {
        Some(slot) if !slot.done && slot.ready_at == ready_at => {
            slot.done = true;
            true
        }
        _ => false,
    }
}

/// Apply a finished action and reset the slot. Claiming an idle slot is a
/// no-op returning `None`.
pub fn claim(
    c: &mut Character,
    kind: TimedActionKind,
    now: u64,
) -> Result<Option<TimedSlot>, TimedActionError> {
    let Some(slot) = c.timed.get(kind).copied() else {
        return Ok(None);
    };
    if !slot.is_ready(now) {
        return Err(TimedActionError::NotReady(kind));
    }

    let target = slot.target_id;
    let result = slot.result_value;
    match kind {
        TimedActionKind::Building => {
            c.building_ranks.insert(target, result);
        }
        TimedActionKind::Skill => {
            c.abilities.insert(target, result);
        }
        TimedActionKind::Talent => {
            c.talent_points.insert(target, result);
        }
        TimedActionKind::PetTraining => {
            let pet = c
                .pet_mut(target)
                .ok_or(TimedActionError::UnknownTarget { kind, target })?;
            pet.rank = result;
        }
        TimedActionKind::EggHatch => {
            let index = c
                .eggs
                .iter()
                .position(|e| e.egg_id == target)
                .ok_or(TimedActionError::UnknownTarget { kind, target })?;
            c.eggs.remove(index);
            let unique_id = c.next_pet_id();
            c.pets.push(Pet {
                unique_id,
                pet_type: result,
                rank: 1,
            });
        }
    }
    *c.timed.slot_mut(kind) = None;
    Ok(Some(slot))
}

/// Startup pass over stored slots: elapsed ones become done, the rest are
/// returned so they can be rescheduled.
pub fn recover(c: &mut Character, now: u64) -> Vec<(TimedActionKind, TimedSlot)> {
    let mut pending = Vec::new();
    for kind in TimedActionKind::ALL {
        if let Some(slot) = c.timed.slot_mut(kind) {
            if slot.done {
                continue;
            }
            if slot.ready_at <= now {
                slot.done = true;
            } else {
                pending.push((kind, *slot));
            }
        }
    }
    pending
}
