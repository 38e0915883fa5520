use std::sync::Arc;

use super::handlers::{combat, debug, level, login, look, loot, social, timed};
use super::Session;
use crate::error::HandlerError;
use crate::net::packets::*;
use crate::net::{Frame, NoFields, PacketType, Payload, SpeedUp};
use crate::service::WorldService;
use crate::timed::TimedActionKind;

/// Route one inbound frame to its handler.
///
/// Nothing a handler returns closes the connection: failures are logged and
/// the packet is dropped.
pub async fn dispatch(world: &Arc<WorldService>, session: &mut Session, frame: Frame) {
    let Some(packet_type) = PacketType::from_id(frame.packet_type) else {
        log::debug!(
            "session {}: ignoring unknown packet 0x{:02X} ({} bytes)",
            session.id,
            frame.packet_type,
            frame.payload.len()
        );
        return;
    };

    if let Err(e) = route(world, session, packet_type, &frame.payload).await {
        if e.is_quiet() {
            log::debug!("session {}: {:?} dropped: {}", session.id, packet_type, e);
        } else {
            log::warn!("session {}: {:?} failed: {}", session.id, packet_type, e);
        }
    }
}

async fn route(
    world: &Arc<WorldService>,
    session: &mut Session,
    packet_type: PacketType,
    payload: &[u8],
) -> Result<(), HandlerError> {
    use PacketType as P;
    use TimedActionKind as K;

    match packet_type {
        P::Authenticate => {
            login::authenticate(world, session, Authenticate::from_payload(payload)?).await
        }
        P::CreateCharacter => {
            login::create_character(world, session, CreateCharacter::from_payload(payload)?).await
        }
        P::SelectCharacter => {
            login::select_character(world, session, SelectCharacter::from_payload(payload)?).await
        }
        P::PaperdollRequest => {
            login::paperdoll(world, session, PaperdollRequest::from_payload(payload)?).await
        }

        P::WorldJoin => level::join(world, session, WorldJoin::from_payload(payload)?).await,
        P::LevelLoaded => {
            NoFields::from_payload(payload)?;
            level::level_loaded(world, session)
        }
        P::PlayerMove => level::player_move(world, session, PlayerMove::from_payload(payload)?),
        P::OpenDoor => level::open_door(world, session, OpenDoor::from_payload(payload)?),
        P::DoorStateRequest => {
            level::door_state(world, session, DoorStateRequest::from_payload(payload)?)
        }
        P::LevelTransferRequest => {
            let request = LevelTransferRequest::from_payload(payload)?;
            level::transfer(world, session, request).await
        }

        P::CombatStats => combat::stats(world, session, CombatStats::from_payload(payload)?),
        P::BuffApplied => combat::buff(world, session, BuffApplied::from_payload(payload)?),

        P::GrantReward => loot::grant(world, session, GrantReward::from_payload(payload)?),
        P::PickupLoot => loot::pickup(world, session, PickupLoot::from_payload(payload)?).await,

        P::ChangeLook => look::change(world, session, ChangeLook::from_payload(payload)?).await,
        P::ApplyDyes => look::dyes(world, session, ApplyDyes::from_payload(payload)?).await,

        P::PublicChat => social::chat(world, session, PublicChat::from_payload(payload)?),
        P::PrivateMessage => {
            social::whisper(world, session, PrivateMessage::from_payload(payload)?)
        }
        P::GroupInvite => social::invite(world, session, GroupInvite::from_payload(payload)?),
        P::GroupInviteAnswer => {
            social::answer(world, session, GroupInviteAnswer::from_payload(payload)?)
        }
        P::GroupLeave => {
            NoFields::from_payload(payload)?;
            world.leave_group(session.id);
            Ok(())
        }
        P::MapLocation => social::map_location(world, session, MapLocation::from_payload(payload)?),
        P::EquipPets => social::equip_pets(world, session, EquipPets::from_payload(payload)?).await,

        P::BuildingRequest => {
            let r = BuildingRequest::from_payload(payload)?;
            timed::request(world, session, K::Building, r.building_id, Some(r.rank), r.pay_with_idols)
                .await
        }
        P::SkillRequest => {
            let r = SkillRequest::from_payload(payload)?;
            timed::request(world, session, K::Skill, r.ability_id, Some(r.rank), r.pay_with_idols)
                .await
        }
        P::TalentRequest => {
            let r = TalentRequest::from_payload(payload)?;
            timed::request(world, session, K::Talent, r.class_index, None, r.pay_with_idols).await
        }
        P::PetTrainRequest => {
            let r = PetTrainRequest::from_payload(payload)?;
            timed::request(world, session, K::PetTraining, r.pet_id, Some(r.rank), r.pay_with_idols)
                .await
        }
        P::EggHatchRequest => {
            let r = EggHatchRequest::from_payload(payload)?;
            timed::request(world, session, K::EggHatch, r.egg_id, Some(r.pet_type), r.pay_with_idols)
                .await
        }

        P::BuildingClaim => claim(world, session, payload, K::Building).await,
        P::SkillClaim => claim(world, session, payload, K::Skill).await,
        P::TalentClaim => claim(world, session, payload, K::Talent).await,
        P::PetTrainClaim => claim(world, session, payload, K::PetTraining).await,
        P::EggHatchClaim => claim(world, session, payload, K::EggHatch).await,

        P::BuildingCancel => cancel(world, session, payload, K::Building).await,
        P::SkillCancel => cancel(world, session, payload, K::Skill).await,
        P::TalentCancel => cancel(world, session, payload, K::Talent).await,
        P::PetTrainCancel => cancel(world, session, payload, K::PetTraining).await,
        P::EggHatchCancel => cancel(world, session, payload, K::EggHatch).await,

        P::BuildingSpeedUp => speed_up(world, session, payload, K::Building).await,
        P::SkillSpeedUp => speed_up(world, session, payload, K::Skill).await,
        P::TalentSpeedUp => speed_up(world, session, payload, K::Talent).await,
        P::PetTrainSpeedUp => speed_up(world, session, payload, K::PetTraining).await,
        P::EggHatchSpeedUp => speed_up(world, session, payload, K::EggHatch).await,

        P::DebugInject => debug::inject(world, session, DebugInject::from_payload(payload)?),

        // Server-to-client packets have no inbound meaning.
        other => {
            log::debug!("session {}: unexpected inbound {:?}", session.id, other);
            Ok(())
        }
    }
}

async fn claim(
    world: &Arc<WorldService>,
    session: &mut Session,
    payload: &[u8],
    kind: TimedActionKind,
) -> Result<(), HandlerError> {
    NoFields::from_payload(payload)?;
    timed::claim(world, session, kind).await
}

async fn cancel(
    world: &Arc<WorldService>,
    session: &mut Session,
    payload: &[u8],
    kind: TimedActionKind,
) -> Result<(), HandlerError> {
    NoFields::from_payload(payload)?;
    timed::cancel(world, session, kind).await
}

async fn speed_up(
    world: &Arc<WorldService>,
    session: &mut Session,
    payload: &[u8],
    kind: TimedActionKind,
) -> Result<(), HandlerError> {
    let SpeedUp { cost } = SpeedUp::from_payload(payload)?;
    timed::speed_up(world, session, kind, cost).await
}
