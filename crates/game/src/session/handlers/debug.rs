use std::sync::Arc;

use crate::error::HandlerError;
use crate::net::packets::DebugInject;
use crate::net::Frame;
use crate::service::WorldService;
use crate::session::Session;
use crate::world::BroadcastScope;

/// Echo an arbitrary frame back, or to the whole level. Only honoured when
/// the server runs with debug packets enabled.
pub fn inject(
    world: &Arc<WorldService>,
    session: &mut Session,
    request: DebugInject,
) -> Result<(), HandlerError> {
    if !world.config.allow_debug_packets {
        return Err(HandlerError::Rejected("debug packets are disabled"));
    }
    let frame = Frame::new(request.packet_type, request.payload).to_bytes()?;
    log::debug!(
        "session {}: injecting 0x{:02X} (broadcast: {})",
        session.id,
        request.packet_type,
        request.broadcast
    );
    if request.broadcast {
        world
            .registry
            .broadcast(session.id, frame, BroadcastScope::LEVEL);
    } else {
        session.send_bytes(frame);
    }
    Ok(())
}
