//! One task per occupied level drives that level's NPCs.
//!
//! NPC state is written only by its level task. Handlers read the table for
//! positions and push [`NpcCommand`]s for anything that should change it;
//! commands are applied at the start of the next tick.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

use super::brain::{think, AiEvent};
use super::config::AiConfig;
use crate::content::GameTables;
use crate::net::packets::{HpUpdate, NpcMove, PowerCast, PowerHit, RemoveBuff};
use crate::net::Message;
use crate::world::{Buff, BroadcastRegistry, Entity};

pub type NpcTable = Arc<RwLock<HashMap<u32, Entity>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NpcCommand {
    Defeated {
        npc_id: u32,
    },
    ApplyBuff {
        npc_id: u32,
        buff_type: u32,
        instance: u32,
        duration: Duration,
    },
}

struct LevelHandle {
    npcs: NpcTable,
    commands: UnboundedSender<NpcCommand>,
    task: AbortHandle,
}

pub struct LevelAi {
    config: AiConfig,
    tables: Arc<GameTables>,
    registry: Arc<BroadcastRegistry>,
    levels: Mutex<HashMap<String, LevelHandle>>,
}

fn encode<M: Message>(message: &M) -> Option<Bytes> {
    match message.to_bytes() {
        Ok(frame) => Some(frame),
        Err(e) => {
            log::warn!("failed to frame {:?}: {}", M::TYPE, e);
            None
        }
    }
}

impl LevelAi {
    pub fn new(
        config: AiConfig,
        tables: Arc<GameTables>,
        registry: Arc<BroadcastRegistry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            tables,
            registry,
            levels: Mutex::new(HashMap::new()),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, LevelHandle>> {
        self.levels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the level's loop unless it is already running. Levels without
    /// NPCs get no loop and return `None`.
    pub fn ensure(self: &Arc<Self>, level: &str) -> Option<NpcTable> {
        let mut levels = self.lock();
        if let Some(handle) = levels.get(level) {
            return Some(Arc::clone(&handle.npcs));
        }

        let spawns = self.tables.npc_spawns(level);
        if spawns.is_empty() {
            return None;
        }
        let npcs: NpcTable = Arc::new(RwLock::new(
            spawns
                .iter()
                .map(|spawn| (spawn.id, Entity::from_spawn(spawn)))
                .collect(),
        ));
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Arc::clone(self).run(level.to_string(), Arc::clone(&npcs), rx));
        levels.insert(
            level.to_string(),
            LevelHandle {
                npcs: Arc::clone(&npcs),
                commands: tx,
                task: task.abort_handle(),
            },
        );
        log::info!("AI loop started for {} ({} npcs)", level, spawns.len());
        Some(npcs)
    }

    pub fn npcs(&self, level: &str) -> Option<NpcTable> {
        self.lock().get(level).map(|h| Arc::clone(&h.npcs))
    }

    /// Queue a change for the level's loop. Returns `false` when the level
    /// has no loop.
    pub fn send(&self, level: &str, command: NpcCommand) -> bool {
        self.lock()
            .get(level)
            .is_some_and(|h| h.commands.send(command).is_ok())
    }

    pub fn is_running(&self, level: &str) -> bool {
        self.lock().contains_key(level)
    }

    pub fn running_count(&self) -> usize {
        self.lock().len()
    }

    pub fn shutdown(&self) {
        for (level, handle) in self.lock().drain() {
            handle.task.abort();
            log::debug!("AI loop for {} aborted", level);
        }
    }

    /// Emptiness is checked under the level map lock, the same lock a
    /// joining session takes to ensure the loop, so a join either sees this
    /// loop still registered or starts a fresh one.
    fn retire_if_empty(&self, level: &str) -> bool {
        let mut levels = self.lock();
        if self.registry.spawned_count(level) > 0 {
            return false;
        }
        levels.remove(level);
        true
    }

    async fn run(
        self: Arc<Self>,
        level: String,
        npcs: NpcTable,
        mut commands: UnboundedReceiver<NpcCommand>,
    ) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if self.retire_if_empty(&level) {
                break;
            }
            let now = Instant::now();
            let players = self.registry.players_in(&level);

            let mut events = Vec::new();
            {
                let mut table = npcs.write().unwrap_or_else(PoisonError::into_inner);
                while let Ok(command) = commands.try_recv() {
                    apply_command(&mut table, command, now);
                }
                for npc in table.values_mut().filter(|n| n.is_hostile()) {
                    let id = npc.id;
                    events.extend(
                        think(npc, &players, &self.config, now)
                            .into_iter()
                            .map(|event| (id, event)),
                    );
                }
            }

            for (npc_id, event) in events {
                self.emit(&level, npc_id, event);
            }
        }
        log::info!("AI loop stopped for {}", level);
    }

    fn emit(&self, level: &str, npc_id: u32, event: AiEvent) {
        match event {
            AiEvent::BuffExpired {
                buff_type,
                instance,
            } => {
                let removal = RemoveBuff {
                    entity_id: npc_id,
                    buff_type,
                    instance,
                };
                if let Some(frame) = encode(&removal) {
                    self.registry.broadcast_level(level, frame);
                }
            }
            AiEvent::Attack {
                target,
                power,
                damage,
            } => {
                let cast = PowerCast {
                    caster: npc_id,
                    power,
                    target_entity: None,
                    target_position: Some((
                        target.position.x as i32,
                        target.position.y as i32,
                    )),
                };
                let hit = PowerHit {
                    target: target.entity_id,
                    source: npc_id,
                    damage,
                    power,
                    critical: false,
                };
                if let (Some(cast), Some(hit)) = (encode(&cast), encode(&hit)) {
                    self.registry.broadcast_level(level, cast);
                    self.registry.broadcast_level(level, hit);
                }
                if let Some(delta) = self.registry.damage(target.session, damage) {
                    log::debug!(
                        "npc {} hit entity {} for {} in {}",
                        npc_id,
                        target.entity_id,
                        damage,
                        level
                    );
                    let update = HpUpdate {
                        entity_id: target.entity_id,
                        delta,
                    };
                    if let Some(frame) = encode(&update) {
                        self.registry.send_to(target.session, frame);
                    }
                }
            }
            AiEvent::Moved { dx, dy, dvx, flags } => {
                let movement = NpcMove {
                    entity_id: npc_id,
                    dx,
                    dy,
                    dvx,
                    flags,
                };
                if let Some(frame) = encode(&movement) {
                    self.registry.broadcast_level(level, frame);
                }
            }
        }
    }
}

fn apply_command(table: &mut HashMap<u32, Entity>, command: NpcCommand, now: Instant) {
    match command {
        NpcCommand::Defeated { npc_id } => {
            if let Some(npc) = table.get_mut(&npc_id) {
                npc.hp = 0;
                npc.velocity = glam::Vec2::ZERO;
            }
        }
        NpcCommand::ApplyBuff {
            npc_id,
            buff_type,
            instance,
            duration,
        } => {
            if let Some(npc) = table.get_mut(&npc_id) {
                npc.buffs.push(Buff {
                    buff_type,
                    instance,
                    expires_at: now + duration,
                });
            }
        }
    }
}
