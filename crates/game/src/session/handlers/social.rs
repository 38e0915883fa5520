use std::sync::Arc;

use crate::character::{PetSlot, PET_SLOTS};
use crate::error::HandlerError;
use crate::net::packets::{
    EquipPets, ErrorMessage, GroupInvite, GroupInviteAnswer, GroupInvitePopup, GroupmateMap,
    MapLocation, PrivateDelivered, PrivateEcho, PrivateMessage, PublicChat,
};
use crate::net::Message;
use crate::service::WorldService;
use crate::session::Session;
use crate::world::{BroadcastScope, GroupError, SessionId};

fn tell(world: &WorldService, recipient: SessionId, message: &impl Message) -> Result<bool, HandlerError> {
    Ok(world.registry.send_to(recipient, message.to_bytes()?))
}

fn error_message(session: &Session, text: String) -> Result<(), HandlerError> {
    session.send(&ErrorMessage { message: text })
}

pub fn chat(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: PublicChat,
) -> Result<(), HandlerError> {
    let entity_id = session.entity_id.ok_or(HandlerError::NotInLevel)?;
    let chat = PublicChat {
        entity_id,
        message: request.message,
    };
    world.broadcast(session.id, &chat, BroadcastScope::OTHERS)?;
    Ok(())
}

pub fn whisper(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: PrivateMessage,
) -> Result<(), HandlerError> {
    let (_, sender) = session.require_character()?;
    let Some(target) = world.registry.find_by_character(&request.recipient) else {
        return error_message(session, format!("{} is not online.", request.recipient));
    };
    tell(
        world,
        target,
        &PrivateDelivered {
            sender,
            message: request.message.clone(),
        },
    )?;
    session.send(&PrivateEcho {
        recipient: request.recipient,
        message: request.message,
    })
}

pub fn invite(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: GroupInvite,
) -> Result<(), HandlerError> {
    let (_, inviter) = session.require_character()?;
    if request.name == inviter {
        return Err(HandlerError::Rejected("self invite"));
    }
    let Some(target) = world.registry.find_by_character(&request.name) else {
        return error_message(session, format!("{} is not online.", request.name));
    };
    if world.groups().group_of(target).is_some() {
        return error_message(session, format!("{} is already in a party.", request.name));
    }
    let popup = GroupInvitePopup {
        inviter_entity: session.entity_id.unwrap_or_default(),
        text: format!("{inviter} has invited you to join a party."),
        inviter_name: inviter,
    };
    tell(world, target, &popup)?;
    Ok(())
}

pub fn answer(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: GroupInviteAnswer,
) -> Result<(), HandlerError> {
    let (_, me) = session.require_character()?;
    let inviter = world
        .registry
        .find_by_character(&request.inviter_name)
        .ok_or_else(|| HandlerError::unknown("player", &request.inviter_name))?;

    if !request.accepted {
        let declined = ErrorMessage {
            message: format!("{me} declined your invitation."),
        };
        tell(world, inviter, &declined)?;
        return Ok(());
    }

    let joined = world.groups().accept_invite(inviter, session.id);
    let group_id = match joined {
        Ok(id) => id,
        Err(GroupError::Full) => {
            return error_message(session, String::from("That party is full."));
        }
        Err(e) => {
            log::debug!("session {}: invite from {} failed: {}", session.id, inviter, e);
            return Err(HandlerError::Rejected("invite could not be accepted"));
        }
    };
    world.registry.update(inviter, |p| p.group = Some(group_id));
    world.registry.update(session.id, |p| p.group = Some(group_id));

    let group = world.groups().group_of(session.id).cloned();
    if let Some(group) = group {
        log::info!("{} joined party {} ({} members)", me, group.id, group.members.len());
        world.send_group_update(&group);
    }
    Ok(())
}

pub fn map_location(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: MapLocation,
) -> Result<(), HandlerError> {
    let (_, name) = session.require_character()?;
    let update = GroupmateMap {
        name,
        x: request.x,
        y: request.y,
    };
    world.broadcast(session.id, &update, BroadcastScope::GROUP_OTHERS)?;
    Ok(())
}

pub async fn equip_pets(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: EquipPets,
) -> Result<(), HandlerError> {
    let (account, name) = session.require_character()?;
    let character = world
        .store
        .update_character(account, &name, |c| {
            let mut equipped = Vec::with_capacity(PET_SLOTS);
            for &(pet_type, unique_id) in request.pets.iter().take(PET_SLOTS) {
                if unique_id == 0 {
                    continue;
                }
                if c.pet(unique_id).is_none() {
                    return Err(HandlerError::unknown("pet", unique_id));
                }
                equipped.push(PetSlot { pet_type, unique_id });
            }
            c.equipped_pets = equipped;
            Ok(c.clone())
        })
        .await?;
    session.cache_character(character);
    Ok(())
}
