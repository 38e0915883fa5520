use std::sync::Arc;

use glam::Vec2;

use super::enter_world;
use crate::character::{Character, GearItem, LevelPosition, StoreError, GEAR_SLOTS};
use crate::error::HandlerError;
use crate::net::packets::{
    Authenticate, CharacterList, CharacterSummary, CreateCharacter, Paperdoll, PaperdollRequest,
    PaperdollView, Popup, SelectCharacter,
};
use crate::net::MAX_CHARACTERS;
use crate::service::WorldService;
use crate::session::Session;
use crate::world::Transfer;

fn character_list(session: &Session) -> Result<CharacterList, HandlerError> {
    Ok(CharacterList {
        user_id: session.require_account()?,
        max_characters: MAX_CHARACTERS,
        characters: session
            .characters
            .iter()
            .map(|c| CharacterSummary {
                name: c.name.clone(),
                class_name: c.class_name.clone(),
                level: c.level,
            })
            .collect(),
    })
}

pub async fn authenticate(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: Authenticate,
) -> Result<(), HandlerError> {
    if request.email.trim().is_empty() {
        return Err(HandlerError::Rejected("empty login"));
    }
    let account = world.store.login(&request.email).await?;
    session.account = Some(account);
    session.characters = world.store.characters(account).await?;
    world.registry.update(session.id, |p| p.account = Some(account));
    log::info!(
        "session {} authenticated as account {} ({} characters)",
        session.id,
        account,
        session.characters.len()
    );
    session.send(&character_list(session)?)
}

pub async fn create_character(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: CreateCharacter,
) -> Result<(), HandlerError> {
    let account = session.require_account()?;
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(HandlerError::Rejected("empty character name"));
    }
    let starter = world
        .tables
        .starter_gear
        .get(&request.class_name)
        .ok_or_else(|| HandlerError::unknown("class", &request.class_name))?;

    let mut character = Character::new(name, request.class_name.clone());
    character.appearance = request.appearance;
    for (slot, &gear_id) in character.equipped.iter_mut().zip(starter).take(GEAR_SLOTS) {
        *slot = Some(GearItem {
            gear_id,
            tier: 0,
            colors: [0, 0],
        });
    }
    let start = world.tables.start_level.as_str();
    let at = world.tables.spawn_point(start).unwrap_or(Vec2::ZERO);
    character.current_level = Some(LevelPosition::new(start, at.x, at.y));

    match world.store.create_character(account, character.clone()).await {
        Ok(()) => {
            log::info!("account {} created {}", account, character.name);
            session.cache_character(character);
        }
        Err(e @ (StoreError::NameTaken(_) | StoreError::AccountFull(_))) => {
            log::debug!("session {}: {}", session.id, e);
            let message = match e {
                StoreError::NameTaken(_) => "That name is already taken.",
                _ => "You have no free character slots.",
            };
            return session.send(&Popup {
                message: message.to_string(),
                disconnect: false,
            });
        }
        Err(e) => return Err(e.into()),
    }
    session.send(&character_list(session)?)
}

pub async fn select_character(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: SelectCharacter,
) -> Result<(), HandlerError> {
    let account = session.require_account()?;
    let character = world.store.character(account, &request.name).await?;

    let (destination, position) = match &character.current_level {
        Some(at) if world.tables.level(&at.name).is_some() => {
            (at.name.clone(), Some(Vec2::new(at.x, at.y)))
        }
        _ => {
            let start = world.tables.start_level.clone();
            let at = world.tables.spawn_point(&start);
            (start, at)
        }
    };

    let token = world.tokens.issue(Transfer {
        account,
        character: character.name.clone(),
        destination: destination.clone(),
        origin: destination.clone(),
        entry_level: None,
    });
    let redirect = enter_world(world, token, None, None, &destination, position)?;
    session.character = Some(character.name.clone());
    session.token = Some(token);
    session.cache_character(character);
    session.send(&redirect)
}

pub async fn paperdoll(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: PaperdollRequest,
) -> Result<(), HandlerError> {
    let account = session.require_account()?;
    let view = match world.store.character(account, &request.name).await {
        Ok(c) => Some(PaperdollView {
            gear: c.gear_ids(),
            name: c.name,
            class_name: c.class_name,
            appearance: c.appearance,
        }),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e.into()),
    };
    session.send(&Paperdoll(view))
}
