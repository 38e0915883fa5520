use std::sync::Arc;

use crate::error::HandlerError;
use crate::net::packets::{ApplyDyes, ChangeLook, DyeSync, LookUpdate, PremiumPurchase};
use crate::service::WorldService;
use crate::session::Session;
use crate::timed::{charge, Currency};
use crate::world::BroadcastScope;

pub async fn change(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: ChangeLook,
) -> Result<(), HandlerError> {
    let (account, name) = session.require_character()?;
    let look = request.0;
    let character = world
        .store
        .update_character(account, &name, |c| {
            let a = &mut c.appearance;
            a.head = look.head.clone();
            a.hair = look.hair.clone();
            a.mouth = look.mouth.clone();
            a.face = look.face.clone();
            a.gender = look.gender.clone();
            a.hair_color = look.hair_color;
            a.skin_color = look.skin_color;
            Ok::<_, HandlerError>(c.clone())
        })
        .await?;
    session.cache_character(character);

    let update = LookUpdate {
        entity_id: session.entity_id.unwrap_or_default(),
        look,
    };
    world.broadcast(session.id, &update, BroadcastScope::LEVEL)?;
    Ok(())
}

/// Recolor gear and clothes. Each channel that actually changes costs one
/// dye at the character's level; nothing is applied unless all of it can
/// be paid for.
pub async fn dyes(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: ApplyDyes,
) -> Result<(), HandlerError> {
    let (account, name) = session.require_character()?;
    let tables = Arc::clone(&world.tables);
    let resolve = |dye: Option<u32>| -> Result<Option<u32>, HandlerError> {
        dye.map(|d| {
            tables
                .dye_colors
                .get(&d)
                .copied()
                .ok_or_else(|| HandlerError::unknown("dye", d))
        })
        .transpose()
    };
    let shirt_color = resolve(request.shirt_dye)?;
    let pant_color = resolve(request.pants_dye)?;
    let currency = Currency::from_idols_flag(request.pay_with_idols);

    let (character, cost) = world
        .store
        .update_character(account, &name, |c| {
            let mut changed = 0u32;
            for (slot, pair) in c.equipped.iter().zip(&request.slots) {
                let (Some(gear), Some((first, second))) = (slot, pair) else {
                    continue;
                };
                for (old, new) in gear.colors.iter().zip([*first, *second]) {
                    if new != 0 && *old != new {
                        changed += 1;
                    }
                }
            }
            changed += u32::from(shirt_color.is_some_and(|col| col != c.appearance.shirt_color));
            changed += u32::from(pant_color.is_some_and(|col| col != c.appearance.pant_color));

            let cost = tables
                .dye_cost(c.level, request.pay_with_idols)
                .saturating_mul(changed);
            charge(c, currency, cost)?;

            for (slot, pair) in c.equipped.iter_mut().zip(&request.slots) {
                let (Some(gear), Some((first, second))) = (slot.as_mut(), pair) else {
                    continue;
                };
                for (old, new) in gear.colors.iter_mut().zip([*first, *second]) {
                    if new != 0 {
                        *old = new;
                    }
                }
            }
            if let Some(color) = shirt_color {
                c.appearance.shirt_color = color;
            }
            if let Some(color) = pant_color {
                c.appearance.pant_color = color;
            }
            Ok::<_, HandlerError>((c.clone(), cost))
        })
        .await?;
    session.cache_character(character);

    if currency == Currency::Idols && cost > 0 {
        session.send(&PremiumPurchase {
            label: String::from("Dye"),
            cost,
        })?;
    }
    let sync = DyeSync {
        entity_id: session.entity_id.unwrap_or(request.entity_id),
        slots: request.slots,
        shirt_color,
        pant_color,
    };
    world.broadcast(session.id, &sync, BroadcastScope::LEVEL)?;
    Ok(())
}
