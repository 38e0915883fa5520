//! The shared world every connection task works against.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bytes::Bytes;

use crate::ai::{AiConfig, LevelAi};
use crate::character::{AccountId, AccountStore, StoreError, TimedSlot};
use crate::content::GameTables;
use crate::error::HandlerError;
use crate::net::packets::{
    BuildingComplete, EggHatchComplete, GroupMemberView, GroupUpdate, PetTrainComplete,
    SkillComplete, TalentComplete,
};
use crate::net::{Message, DEFAULT_PORT, MAX_PAYLOAD_LEN};
use crate::timed::{self, unix_now, unix_to_system_time, TimedActionKind, TimerHandle, TimerService};
use crate::world::{
    BroadcastRegistry, BroadcastScope, Group, GroupManager, SessionId, TokenRegistry,
    FIRST_PLAYER_ENTITY,
};

#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Host and port announced to clients for the post-transfer reconnect.
    pub public_host: String,
    pub public_port: u16,
    pub ai: AiConfig,
    pub allow_debug_packets: bool,
    pub max_frame_len: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            public_host: String::from("127.0.0.1"),
            public_port: DEFAULT_PORT,
            ai: AiConfig::default(),
            allow_debug_packets: false,
            max_frame_len: MAX_PAYLOAD_LEN,
        }
    }
}

type TimedKey = (AccountId, String, TimedActionKind);

pub struct WorldService {
    pub config: WorldConfig,
    pub tables: Arc<GameTables>,
    pub store: Arc<AccountStore>,
    pub registry: Arc<BroadcastRegistry>,
    pub tokens: TokenRegistry,
    pub timers: TimerService,
    pub ai: Arc<LevelAi>,
    groups: Mutex<GroupManager>,
    timed_handles: Mutex<HashMap<TimedKey, TimerHandle>>,
    next_session: AtomicU64,
    next_entity: AtomicU32,
}

/// The packet that tells a client a timed action is ready to claim.
pub fn completion_frame(kind: TimedActionKind, slot: &TimedSlot) -> Result<Bytes, HandlerError> {
    let target = slot.target_id;
    let result = slot.result_value;
    let frame = match kind {
        TimedActionKind::Building => BuildingComplete {
            building_id: target,
            rank: result,
            done: true,
        }
        .to_bytes(),
        TimedActionKind::Skill => SkillComplete { ability_id: target }.to_bytes(),
        TimedActionKind::Talent => TalentComplete {
            class_index: target,
            done: true,
        }
        .to_bytes(),
        TimedActionKind::PetTraining => PetTrainComplete {
            pet_id: target,
            rank: result,
        }
        .to_bytes(),
        TimedActionKind::EggHatch => EggHatchComplete {
            egg_id: target,
            pet_type: result,
        }
        .to_bytes(),
    };
    Ok(frame?)
}

impl WorldService {
    pub fn new(config: WorldConfig, tables: GameTables, store: AccountStore) -> Arc<Self> {
        let tables = Arc::new(tables);
        let registry = Arc::new(BroadcastRegistry::new());
        let ai = LevelAi::new(config.ai.clone(), Arc::clone(&tables), Arc::clone(&registry));
        Arc::new(Self {
            config,
            tables,
            store: Arc::new(store),
            registry,
            tokens: TokenRegistry::new(),
            timers: TimerService::new(),
            ai,
            groups: Mutex::new(GroupManager::new()),
            timed_handles: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(1),
            next_entity: AtomicU32::new(FIRST_PLAYER_ENTITY),
        })
    }

    pub fn next_session_id(&self) -> SessionId {
        self.next_session.fetch_add(1, Ordering::Relaxed)
    }

    pub fn next_entity_id(&self) -> u32 {
        self.next_entity.fetch_add(1, Ordering::Relaxed)
    }

    pub fn groups(&self) -> MutexGuard<'_, GroupManager> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<TimedKey, TimerHandle>> {
        self.timed_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the completion timer for a pending slot, replacing any
    /// earlier timer for the same character and kind.
    pub fn schedule_completion(
        self: &Arc<Self>,
        account: AccountId,
        character: &str,
        kind: TimedActionKind,
        slot: TimedSlot,
    ) {
        let key = (account, character.to_string(), kind);
        let world: Weak<Self> = Arc::downgrade(self);
        let name = character.to_string();
        let handle = self
            .timers
            .register(unix_to_system_time(slot.ready_at), move || async move {
                if let Some(world) = world.upgrade() {
                    world.finish_timed(account, name, kind, slot).await;
                }
            });
        log::debug!(
            "{:?} for {}/{} due at {} ({:?})",
            kind,
            account,
            character,
            slot.ready_at,
            handle
        );
        if let Some(previous) = self.handles().insert(key, handle) {
            self.timers.cancel(previous);
        }
    }

    pub fn cancel_completion(&self, account: AccountId, character: &str, kind: TimedActionKind) {
        if let Some(handle) = self.handles().remove(&(account, character.to_string(), kind)) {
            self.timers.cancel(handle);
        }
    }

    async fn finish_timed(
        &self,
        account: AccountId,
        character: String,
        kind: TimedActionKind,
        slot: TimedSlot,
    ) {
        self.handles().remove(&(account, character.clone(), kind));
        let completed = self
            .store
            .update_character::<_, StoreError>(account, &character, |c| {
                Ok(timed::complete(c, kind, slot.ready_at))
            })
            .await;
        match completed {
            Ok(true) => {
                log::info!("{:?} finished for {}", kind, character);
                match completion_frame(kind, &slot) {
                    Ok(frame) => {
                        self.notify_character(account, &character, frame);
                    }
                    Err(e) => log::warn!("completion frame for {}: {}", character, e),
                }
            }
            Ok(false) => log::debug!("{:?} for {} was already settled", kind, character),
            Err(e) => log::warn!("could not complete {:?} for {}: {}", kind, character, e),
        }
    }

    /// Startup pass: elapsed slots become done, the rest are scheduled.
    /// Returns how many timers were registered.
    pub async fn recover_timed_actions(self: &Arc<Self>) -> Result<usize, StoreError> {
        let now = unix_now();
        let mut scheduled = 0;
        for account in self.store.account_ids().await {
            let pending = self
                .store
                .update_all(account, |c| timed::recover(c, now))
                .await?;
            for (name, slots) in pending {
                for (kind, slot) in slots {
                    self.schedule_completion(account, &name, kind, slot);
                    scheduled += 1;
                }
            }
        }
        log::info!("recovered {} pending timed actions", scheduled);
        Ok(scheduled)
    }

    /// Queue a frame for whichever session is playing this character.
    pub fn notify_character(&self, account: AccountId, character: &str, frame: Bytes) -> bool {
        let Some(session) = self.registry.find_by_character(character) else {
            return false;
        };
        let owner = self.registry.read(session, |p| p.account).flatten();
        owner == Some(account) && self.registry.send_to(session, frame)
    }

    pub fn broadcast<M: Message>(
        &self,
        source: SessionId,
        message: &M,
        scope: BroadcastScope,
    ) -> Result<usize, HandlerError> {
        Ok(self.registry.broadcast(source, message.to_bytes()?, scope))
    }

    /// Send every member its own view of the roster.
    pub fn send_group_update(&self, group: &Group) {
        let members: Vec<_> = group
            .members
            .iter()
            .filter_map(|&id| {
                self.registry.read(id, |p| {
                    (
                        id,
                        p.character.clone().unwrap_or_default(),
                        p.avatar.position,
                        p.level.clone(),
                    )
                })
            })
            .collect();

        for (recipient, _, _, recipient_level) in &members {
            let update = GroupUpdate {
                exists: true,
                locked: group.locked,
                members: members
                    .iter()
                    .map(|(id, name, at, level)| GroupMemberView {
                        leader: *id == group.leader,
                        online: true,
                        name: name.clone(),
                        x: at.x as i32,
                        y: at.y as i32,
                        same_level: level.is_some() && level == recipient_level,
                    })
                    .collect(),
            };
            match update.to_bytes() {
                Ok(frame) => {
                    self.registry.send_to(*recipient, frame);
                }
                Err(e) => log::warn!("group update: {}", e),
            }
        }
    }

    /// Remove a session from its party and refresh whoever is left.
    pub fn leave_group(&self, session: SessionId) {
        let Some(group) = self.groups().leave(session) else {
            return;
        };
        self.registry.update(session, |p| p.group = None);
        if let Ok(frame) = GroupUpdate::default().to_bytes() {
            self.registry.send_to(session, frame);
        }

        let dissolved = group.members.len() <= 1;
        if dissolved {
            for &member in &group.members {
                self.registry.update(member, |p| p.group = None);
                if let Ok(frame) = GroupUpdate::default().to_bytes() {
                    self.registry.send_to(member, frame);
                }
            }
        } else {
            self.send_group_update(&group);
        }
    }

    /// Drop a closed session from every registry it joined. Outstanding
    /// transfer tokens stay valid: the client reconnects with one.
    pub fn disconnect(&self, session: SessionId) {
        self.leave_group(session);
        if let Some(presence) = self.registry.remove(session) {
            if let Some(name) = presence.character.as_deref() {
                log::debug!("{} left {:?}", name, presence.level);
            }
        }
    }

    pub fn shutdown(&self) {
        self.ai.shutdown();
        for (_, handle) in self.handles().drain() {
            self.timers.cancel(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Character;
    use crate::timed::{begin, ActionCost, Currency, TimedRequest};

    fn world(dir: &std::path::Path) -> Arc<WorldService> {
        let store = AccountStore::open(dir).unwrap();
        WorldService::new(WorldConfig::default(), GameTables::builtin(), store)
    }

    #[tokio::test]
    async fn test_recovery_marks_elapsed_and_schedules_pending() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = AccountStore::open(dir.path()).unwrap();
            let id = store.login("ada@example.com").await.unwrap();
            let mut c = Character::new("Ada", "Rogue");
            c.gold = 10_000;
            let past = unix_now() - 3_600;
            let quick = |_: TimedActionKind, _: u32, _: u32| {
                Some(ActionCost {
                    gold: 1,
                    idols: 0,
                    duration_secs: 60,
                })
            };
            let slow = |_: TimedActionKind, _: u32, _: u32| {
                Some(ActionCost {
                    gold: 1,
                    idols: 0,
                    duration_secs: 3_600 * 48,
                })
            };
            let building = TimedRequest {
                kind: TimedActionKind::Building,
                target: 1,
                result: 1,
                currency: Currency::Gold,
            };
            let skill = TimedRequest {
                kind: TimedActionKind::Skill,
                target: 2,
                result: 1,
                currency: Currency::Gold,
            };
            begin(&mut c, &building, quick, past).unwrap();
            begin(&mut c, &skill, slow, past).unwrap();
            store.create_character(id, c).await.unwrap();
        }

        let world = world(dir.path());
        assert_eq!(world.recover_timed_actions().await.unwrap(), 1);
        assert_eq!(world.timers.pending_count(), 1);

        let id = world.store.login("ada@example.com").await.unwrap();
        let c = world.store.character(id, "Ada").await.unwrap();
        assert!(c.timed.building.unwrap().done);
        assert!(!c.timed.skill.unwrap().done);
        world.shutdown();
        assert_eq!(world.timers.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_rescheduling_replaces_timer() {
        let dir = tempfile::tempdir().unwrap();
        let world = world(dir.path());
        let slot = TimedSlot {
            target_id: 1,
            result_value: 1,
            ready_at: unix_now() + 3_600,
            done: false,
        };
        world.schedule_completion(1, "Ada", TimedActionKind::Building, slot);
        world.schedule_completion(1, "Ada", TimedActionKind::Building, slot);
        assert_eq!(world.timers.pending_count(), 1);
        world.cancel_completion(1, "Ada", TimedActionKind::Building);
        assert_eq!(world.timers.pending_count(), 0);
    }

    #[test]
    fn test_completion_frames_carry_slot() {
        let slot = TimedSlot {
            target_id: 4,
            result_value: 3,
            ready_at: 0,
            done: true,
        };
        for kind in TimedActionKind::ALL {
            let frame = completion_frame(kind, &slot).unwrap();
            assert!(frame.len() > 4);
        }
    }
}
