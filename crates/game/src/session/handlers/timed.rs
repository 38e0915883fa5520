//! Requests, speed-ups, cancels and claims for the five timed action kinds.
//!
//! Every change runs as one serialized store update, so a completion timer
//! and a client packet for the same slot never interleave.

use std::sync::Arc;

use crate::error::HandlerError;
use crate::net::packets::PremiumPurchase;
use crate::service::{completion_frame, WorldService};
use crate::session::Session;
use crate::timed::{self, expected_result, unix_now, Currency, TimedActionKind, TimedRequest};

/// Start a timed action. `result: None` asks for the next step, for kinds
/// whose request carries no explicit rank.
pub async fn request(
    world: &Arc<WorldService>,
    session: &mut Session,
    kind: TimedActionKind,
    target: u32,
    result: Option<u32>,
    pay_with_idols: bool,
) -> Result<(), HandlerError> {
    let (account, name) = session.require_character()?;
    let currency = Currency::from_idols_flag(pay_with_idols);
    let tables = Arc::clone(&world.tables);
    let now = unix_now();

    let (slot, character) = world
        .store
        .update_character(account, &name, |c| {
            let result = match result {
                Some(result) => result,
                None => expected_result(c, kind, target)?,
            };
            let request = TimedRequest {
                kind,
                target,
                result,
                currency,
            };
            let slot = timed::begin(c, &request, |k, t, r| tables.cost(k, t, r), now)?;
            Ok::<_, HandlerError>((slot, c.clone()))
        })
        .await?;
    session.cache_character(character);
    log::info!(
        "{} started {:?} {} -> {} (ready at {})",
        name,
        kind,
        slot.target_id,
        slot.result_value,
        slot.ready_at
    );
    world.schedule_completion(account, &name, kind, slot);
    Ok(())
}

/// Finish a pending action for idols. The price is whatever the client
/// quotes: the client computes it from the time left and the server takes
/// it as given, so a zero quote finishes the action for free.
pub async fn speed_up(
    world: &Arc<WorldService>,
    session: &mut Session,
    kind: TimedActionKind,
    cost: u32,
) -> Result<(), HandlerError> {
    let (account, name) = session.require_character()?;
    let now = unix_now();
    let (slot, character) = world
        .store
        .update_character(account, &name, |c| {
            let slot = timed::speed_up(c, kind, cost, now)?;
            Ok::<_, HandlerError>((slot, c.clone()))
        })
        .await?;
    session.cache_character(character);
    world.cancel_completion(account, &name, kind);

    if cost > 0 {
        session.send(&PremiumPurchase {
            label: kind.label().to_string(),
            cost,
        })?;
    }
    session.send_bytes(completion_frame(kind, &slot)?);
    Ok(())
}

pub async fn cancel(
    world: &Arc<WorldService>,
    session: &mut Session,
    kind: TimedActionKind,
) -> Result<(), HandlerError> {
    let (account, name) = session.require_character()?;
    let (cancelled, character) = world
        .store
        .update_character(account, &name, |c| {
            Ok::<_, HandlerError>((timed::cancel(c, kind), c.clone()))
        })
        .await?;
    session.cache_character(character);
    world.cancel_completion(account, &name, kind);
    if cancelled.is_none() {
        log::debug!("{} cancelled an idle {:?} slot", name, kind);
    }
    Ok(())
}

pub async fn claim(
    world: &Arc<WorldService>,
    session: &mut Session,
    kind: TimedActionKind,
) -> Result<(), HandlerError> {
    let (account, name) = session.require_character()?;
    let now = unix_now();
    let (claimed, character) = world
        .store
        .update_character(account, &name, |c| {
            let claimed = timed::claim(c, kind, now)?;
            Ok::<_, HandlerError>((claimed, c.clone()))
        })
        .await?;
    session.cache_character(character);
    if let Some(slot) = claimed {
        // A claim may beat the timer when the clock already passed ready_at.
        world.cancel_completion(account, &name, kind);
        log::info!("{} claimed {:?} {} -> {}", name, kind, slot.target_id, slot.result_value);
    }
    Ok(())
}
