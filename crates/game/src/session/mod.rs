//! Per-connection state and the connection task that owns it.

mod dispatch;
mod handlers;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use glam::Vec2;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::character::{AccountId, Character};
use crate::error::HandlerError;
use crate::net::{FrameError, FrameReader, FrameWriter, Message};
use crate::service::WorldService;
use crate::world::{BroadcastRegistry, LootTable, Presence, SessionId};

pub use dispatch::dispatch;

/// What this session last learned about an NPC in its level.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub name: String,
    pub position: Vec2,
    pub hp: i32,
}

/// Mutable state of one client connection. Only the connection task touches
/// it; anything other sessions need goes through the registry.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub peer: SocketAddr,
    tx: UnboundedSender<Bytes>,
    pub account: Option<AccountId>,
    pub characters: Vec<Character>,
    pub character: Option<String>,
    pub level: Option<String>,
    /// The non-dungeon level a dungeon was entered from.
    pub entry_level: Option<String>,
    pub token: Option<u32>,
    pub entity_id: Option<u32>,
    /// Where the avatar stood when it last left a level.
    pub last_position: Option<Vec2>,
    pub entities: HashMap<u32, EntitySnapshot>,
    pub loot: LootTable,
}

impl Session {
    pub fn new(id: SessionId, peer: SocketAddr, tx: UnboundedSender<Bytes>) -> Self {
        Self {
            id,
            peer,
            tx,
            account: None,
            characters: Vec::new(),
            character: None,
            level: None,
            entry_level: None,
            token: None,
            entity_id: None,
            last_position: None,
            entities: HashMap::new(),
            loot: LootTable::new(),
        }
    }

    /// Queue a message for this client, behind everything queued before it.
    pub fn send<M: Message>(&self, message: &M) -> Result<(), HandlerError> {
        let frame = message.to_bytes()?;
        if self.tx.send(frame).is_err() {
            log::debug!("session {} writer is gone, dropping {:?}", self.id, M::TYPE);
        }
        Ok(())
    }

    pub fn send_bytes(&self, frame: Bytes) {
        let _ = self.tx.send(frame);
    }

    pub fn require_account(&self) -> Result<AccountId, HandlerError> {
        self.account.ok_or(HandlerError::NotAuthenticated)
    }

    pub fn require_character(&self) -> Result<(AccountId, String), HandlerError> {
        let account = self.require_account()?;
        let name = self.character.clone().ok_or(HandlerError::NoCharacter)?;
        Ok((account, name))
    }

    pub fn require_level(&self) -> Result<String, HandlerError> {
        self.level.clone().ok_or(HandlerError::NotInLevel)
    }

    pub fn cached_character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    /// Replace the cached copy of a character after a store write.
    pub fn cache_character(&mut self, character: Character) {
        match self.characters.iter_mut().find(|c| c.name == character.name) {
            Some(slot) => *slot = character,
            None => self.characters.push(character),
        }
    }

    /// Stop receiving level traffic and forget everything level-scoped.
    pub fn leave_level(&mut self, registry: &BroadcastRegistry) {
        let left_at = registry
            .update(self.id, |p| {
                let at = p.spawned.then_some(p.avatar.position);
                p.spawned = false;
                at
            })
            .flatten();
        if left_at.is_some() {
            self.last_position = left_at;
        }
        self.entities.clear();
        self.loot.clear_pending();
        self.entity_id = None;
    }
}

/// Drive one client until it disconnects.
///
/// Reads are handled strictly in arrival order. Writes go through a
/// dedicated task fed by the session's channel, so a slow peer never
/// stalls a broadcaster.
pub async fn serve(world: Arc<WorldService>, stream: TcpStream) -> Result<(), FrameError> {
    let peer = stream.peer_addr()?;
    let (read_half, write_half) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();

    let id = world.next_session_id();
    world.registry.insert(id, Presence::new(tx.clone()));
    log::info!("session {} connected from {}", id, peer);

    let writer = tokio::spawn(async move {
        let mut out = FrameWriter::new(write_half);
        while let Some(frame) = rx.recv().await {
            if let Err(e) = out.write_encoded(&frame).await {
                log::debug!("session {} write failed: {}", id, e);
                break;
            }
        }
    });

    let mut reader = FrameReader::new(read_half).max_frame_len(world.config.max_frame_len);
    let mut session = Session::new(id, peer, tx);
    let result = loop {
        match reader.read_frame().await {
            Ok(Some(frame)) => dispatch(&world, &mut session, frame).await,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    world.disconnect(id);
    // The registry held the other sender; dropping ours lets the writer
    // drain what is queued and stop.
    drop(session);
    if let Err(e) = writer.await {
        log::debug!("session {} writer ended abnormally: {}", id, e);
    }
    log::info!("session {} closed", id);
    result
}
