//! Live sessions and the derived broadcast scopes over them.
//!
//! Membership is never stored per level: a broadcast walks every presence
//! and keeps the ones that are spawned in the source's level (or share its
//! group). Each presence owns one outbound channel, so frames reach a given
//! recipient in the order they were queued.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use glam::Vec2;
use tokio::sync::mpsc::UnboundedSender;

use super::group::GroupId;
use crate::character::AccountId;

pub type SessionId = u64;

/// Where and how healthy a session's avatar is, as last reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Avatar {
    pub position: Vec2,
    pub hp: i32,
    pub max_hp: i32,
    /// Until the client reports its stats the server does not clamp heals.
    pub max_hp_known: bool,
}

impl Default for Avatar {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            hp: 100,
            max_hp: 100,
            max_hp_known: false,
        }
    }
}

pub struct Presence {
    tx: UnboundedSender<Bytes>,
    pub account: Option<AccountId>,
    pub character: Option<String>,
    pub level: Option<String>,
    pub spawned: bool,
    pub entity_id: u32,
    pub group: Option<GroupId>,
    pub avatar: Avatar,
}

impl Presence {
    pub fn new(tx: UnboundedSender<Bytes>) -> Self {
        Self {
            tx,
            account: None,
            character: None,
            level: None,
            spawned: false,
            entity_id: 0,
            group: None,
            avatar: Avatar::default(),
        }
    }

    fn in_level(&self, level: &str) -> bool {
        self.spawned && self.level.as_deref() == Some(level)
    }

    /// Queue one frame. A closed peer only costs this recipient.
    fn deliver(&self, id: SessionId, frame: &Bytes) -> bool {
        match self.tx.send(frame.clone()) {
            Ok(()) => true,
            Err(_) => {
                log::debug!("session {} is gone, dropping frame", id);
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastScope {
    pub exclude_source: bool,
    pub group_only: bool,
}

impl BroadcastScope {
    pub const LEVEL: Self = Self {
        exclude_source: false,
        group_only: false,
    };
    pub const OTHERS: Self = Self {
        exclude_source: true,
        group_only: false,
    };
    pub const GROUP_OTHERS: Self = Self {
        exclude_source: true,
        group_only: true,
    };
}

/// A living player as the AI loop sees it for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerView {
    pub session: SessionId,
    pub entity_id: u32,
    pub position: Vec2,
    pub hp: i32,
}

#[derive(Default)]
pub struct BroadcastRegistry {
    sessions: Mutex<HashMap<SessionId, Presence>>,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Presence>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, id: SessionId, presence: Presence) {
        self.lock().insert(id, presence);
    }

    /// Drop a session from every scope. Returns what it was, so the caller
    /// can tidy up groups and levels it belonged to.
    pub fn remove(&self, id: SessionId) -> Option<Presence> {
        self.lock().remove(&id)
    }

    pub fn update<T>(&self, id: SessionId, f: impl FnOnce(&mut Presence) -> T) -> Option<T> {
        self.lock().get_mut(&id).map(f)
    }

    pub fn read<T>(&self, id: SessionId, f: impl FnOnce(&Presence) -> T) -> Option<T> {
        self.lock().get(&id).map(f)
    }

    pub fn send_to(&self, id: SessionId, frame: Bytes) -> bool {
        self.lock()
            .get(&id)
            .is_some_and(|p| p.deliver(id, &frame))
    }

    /// Fan a pre-encoded frame out to the source's scope. Returns the number
    /// of recipients it was queued for.
    pub fn broadcast(&self, source: SessionId, frame: Bytes, scope: BroadcastScope) -> usize {
        let sessions = self.lock();
        let Some(origin) = sessions.get(&source) else {
            return 0;
        };
        let Some(level) = origin.level.as_deref() else {
            return 0;
        };
        let group = origin.group;

        let mut sent = 0;
        for (&id, presence) in sessions.iter() {
            if scope.exclude_source && id == source {
                continue;
            }
            let in_scope = if scope.group_only {
                group.is_some() && presence.group == group
            } else {
                presence.in_level(level)
            };
            if in_scope && presence.deliver(id, &frame) {
                sent += 1;
            }
        }
        sent
    }

    /// Fan out to everyone spawned in `level`, for senders that are not a
    /// session (the AI loop).
    pub fn broadcast_level(&self, level: &str, frame: Bytes) -> usize {
        self.lock()
            .iter()
            .filter(|(_, p)| p.in_level(level))
            .filter(|(id, p)| p.deliver(**id, &frame))
            .count()
    }

    pub fn spawned_count(&self, level: &str) -> usize {
        self.lock().values().filter(|p| p.in_level(level)).count()
    }

    pub fn players_in(&self, level: &str) -> Vec<PlayerView> {
        self.lock()
            .iter()
            .filter(|(_, p)| p.in_level(level) && p.entity_id != 0)
            .map(|(&session, p)| PlayerView {
                session,
                entity_id: p.entity_id,
                position: p.avatar.position,
                hp: p.avatar.hp,
            })
            .collect()
    }

    pub fn find_by_character(&self, name: &str) -> Option<SessionId> {
        self.lock()
            .iter()
            .find(|(_, p)| p.character.as_deref() == Some(name))
            .map(|(&id, _)| id)
    }

    /// Server-side damage to an avatar. Returns the applied delta (never
    /// below zero hp) or `None` when the session is gone.
    pub fn damage(&self, id: SessionId, amount: i32) -> Option<i32> {
        self.update(id, |p| {
            let before = p.avatar.hp;
            p.avatar.hp = (before - amount).max(0);
            p.avatar.hp - before
        })
    }
}
