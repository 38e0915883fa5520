use std::sync::Arc;
use std::time::Duration;

use crate::ai::NpcCommand;
use crate::error::HandlerError;
use crate::net::packets::{BuffApplied, CombatStats};
use crate::service::WorldService;
use crate::session::Session;
use crate::world::BroadcastScope;

/// The client's own derived stats. Only max hp matters to the server: from
/// now on heals clamp to it.
pub fn stats(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: CombatStats,
) -> Result<(), HandlerError> {
    if request.max_hp == 0 {
        return Err(HandlerError::Rejected("zero max hp"));
    }
    let max_hp = i32::try_from(request.max_hp).unwrap_or(i32::MAX);
    world.registry.update(session.id, |p| {
        p.avatar.max_hp = max_hp;
        p.avatar.max_hp_known = true;
        p.avatar.hp = p.avatar.hp.min(max_hp);
    });
    log::debug!(
        "session {}: stats rev {} max hp {}",
        session.id,
        request.revision,
        max_hp
    );
    Ok(())
}

pub fn buff(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: BuffApplied,
) -> Result<(), HandlerError> {
    let level = session.require_level()?;
    world.broadcast(session.id, &request, BroadcastScope::OTHERS)?;

    if session.entities.contains_key(&request.target) {
        world.ai.send(
            &level,
            NpcCommand::ApplyBuff {
                npc_id: request.target,
                buff_type: request.buff_type,
                instance: request.instance,
                duration: Duration::from_millis(u64::from(request.duration_ms)),
            },
        );
    }
    Ok(())
}
