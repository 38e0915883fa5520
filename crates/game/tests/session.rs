use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use blitz::character::{AccountStore, Appearance, Pet, PetSlot};
use blitz::content::GameTables;
use blitz::net::packets::*;
use blitz::net::{Frame, FrameReader, FrameWriter, Message, PacketType, Payload, SpeedUp};
use blitz::session;
use blitz::timed::{begin, unix_now, ActionCost, Currency, TimedActionKind, TimedRequest};
use blitz::world::FIRST_PLAYER_ENTITY;
use blitz::{HandlerError, WorldConfig, WorldService};

const WAIT: Duration = Duration::from_secs(3);

struct TestServer {
    world: Arc<WorldService>,
    addr: SocketAddr,
    _dir: tempfile::TempDir,
}

async fn start(config: WorldConfig) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let store = AccountStore::open(dir.path()).unwrap();
    let world = WorldService::new(config, GameTables::builtin(), store);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepting = Arc::clone(&world);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(session::serve(Arc::clone(&accepting), stream));
        }
    });
    TestServer {
        world,
        addr,
        _dir: dir,
    }
}

struct Client {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, write) = stream.into_split();
        Self {
            reader: FrameReader::new(read),
            writer: FrameWriter::new(write),
        }
    }

    async fn send<M: Message>(&mut self, message: &M) {
        self.writer.write_frame(&message.to_frame()).await.unwrap();
    }

    async fn send_raw(&mut self, packet_type: PacketType, payload: Vec<u8>) {
        self.writer
            .write_frame(&Frame::new(packet_type.id(), payload))
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> Option<Frame> {
        timeout(WAIT, self.reader.read_frame())
            .await
            .expect("timed out waiting for a frame")
            .unwrap()
    }

    /// Next message of type `M`, with the ids of everything skipped on the
    /// way (NPC chatter and the like).
    async fn expect_with_skipped<M: Message>(&mut self) -> (M, Vec<u16>) {
        let mut skipped = Vec::new();
        loop {
            let frame = self.recv().await.expect("connection closed");
            if frame.packet_type == M::TYPE.id() {
                return (M::from_payload(&frame.payload).unwrap(), skipped);
            }
            skipped.push(frame.packet_type);
        }
    }

    async fn expect<M: Message>(&mut self) -> M {
        self.expect_with_skipped().await.0
    }

    /// Handlers run in arrival order, so a paperdoll reply proves every
    /// earlier packet has been handled.
    async fn barrier(&mut self) -> Vec<u16> {
        self.send(&PaperdollRequest {
            name: String::from("nobody"),
        })
        .await;
        self.expect_with_skipped::<Paperdoll>().await.1
    }
}

/// Log in, create a character and follow the redirect into its level.
/// Returns the connected client, its spawn and the token it joined with.
async fn enter(server: &TestServer, email: &str, name: &str) -> (Client, PlayerSpawned, u32) {
    let mut lobby = Client::connect(server.addr).await;
    lobby
        .send(&Authenticate {
            email: email.to_string(),
        })
        .await;
    lobby.expect::<CharacterList>().await;
    lobby
        .send(&CreateCharacter {
            name: name.to_string(),
            class_name: String::from("Rogue"),
            appearance: Appearance::default(),
        })
        .await;
    let list = lobby.expect::<CharacterList>().await;
    assert!(list.characters.iter().any(|c| c.name == name));

    lobby
        .send(&SelectCharacter {
            name: name.to_string(),
        })
        .await;
    let redirect = lobby.expect::<EnterWorld>().await;
    drop(lobby);

    let mut client = Client::connect(server.addr).await;
    client
        .send(&WorldJoin {
            token: redirect.token,
        })
        .await;
    client.send_raw(PacketType::LevelLoaded, Vec::new()).await;
    let spawned = client.expect::<PlayerSpawned>().await;
    (client, spawned, redirect.token)
}

#[tokio::test]
async fn test_login_to_spawn() {
    let server = start(WorldConfig::default()).await;
    let (_client, spawned, _) = enter(&server, "ada@example.com", "Ada").await;
    assert!(spawned.entity_id >= FIRST_PLAYER_ENTITY);
    assert_eq!(spawned.hp, spawned.max_hp);
    // NewbieRoad has NPCs, so joining it starts the level loop.
    assert!(server.world.ai.is_running("NewbieRoad"));
}

#[tokio::test]
async fn test_tokens_are_single_use() {
    let server = start(WorldConfig::default()).await;
    let mut lobby = Client::connect(server.addr).await;
    lobby
        .send(&Authenticate {
            email: String::from("bo@example.com"),
        })
        .await;
    lobby.expect::<CharacterList>().await;
    lobby
        .send(&CreateCharacter {
            name: String::from("Bo"),
            class_name: String::from("Mage"),
            appearance: Appearance::default(),
        })
        .await;
    lobby.expect::<CharacterList>().await;
    let select = SelectCharacter {
        name: String::from("Bo"),
    };
    lobby.send(&select).await;
    let stale = lobby.expect::<EnterWorld>().await;
    lobby.send(&select).await;
    let redirect = lobby.expect::<EnterWorld>().await;
    assert_eq!(server.world.tokens.outstanding(), 1);

    // Selecting again superseded the first token.
    let mut early = Client::connect(server.addr).await;
    early.send(&WorldJoin { token: stale.token }).await;
    early.send_raw(PacketType::LevelLoaded, Vec::new()).await;
    early
        .send(&Authenticate {
            email: String::from("bo@example.com"),
        })
        .await;
    let (_, skipped) = early.expect_with_skipped::<CharacterList>().await;
    assert!(!skipped.contains(&PacketType::PlayerSpawned.id()));

    let mut first = Client::connect(server.addr).await;
    first.send(&WorldJoin { token: redirect.token }).await;
    first.send_raw(PacketType::LevelLoaded, Vec::new()).await;
    first.expect::<PlayerSpawned>().await;
    assert_eq!(server.world.tokens.outstanding(), 0);

    let mut second = Client::connect(server.addr).await;
    second.send(&WorldJoin { token: redirect.token }).await;
    second.send_raw(PacketType::LevelLoaded, Vec::new()).await;
    // The failed join leaves the session unauthenticated, so log in to
    // flush the queue.
    second
        .send(&Authenticate {
            email: String::from("bo@example.com"),
        })
        .await;
    let (_, skipped) = second.expect_with_skipped::<CharacterList>().await;
    assert!(!skipped.contains(&PacketType::PlayerSpawned.id()));
}

#[tokio::test]
async fn test_character_names_are_global() {
    let server = start(WorldConfig::default()).await;
    let _ada = enter(&server, "ada@example.com", "Ada").await;

    let mut other = Client::connect(server.addr).await;
    other
        .send(&Authenticate {
            email: String::from("impostor@example.com"),
        })
        .await;
    other.expect::<CharacterList>().await;
    other
        .send(&CreateCharacter {
            name: String::from("ada"),
            class_name: String::from("Mage"),
            appearance: Appearance::default(),
        })
        .await;
    let popup = other.expect::<Popup>().await;
    assert!(!popup.disconnect);

    let account = server.world.store.login("impostor@example.com").await.unwrap();
    assert!(server.world.store.characters(account).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_arrives_in_order() {
    let server = start(WorldConfig::default()).await;
    let (mut ada, ada_spawn, _) = enter(&server, "ada@example.com", "Ada").await;
    let (mut bo, _, _) = enter(&server, "bo@example.com", "Bo").await;

    for i in 0..5 {
        ada.send(&PublicChat {
            entity_id: 0,
            message: format!("line {i}"),
        })
        .await;
    }
    for i in 0..5 {
        let chat = bo.expect::<PublicChat>().await;
        assert_eq!(chat.entity_id, ada_spawn.entity_id);
        assert_eq!(chat.message, format!("line {i}"));
    }

    // The sender never hears its own chat.
    let skipped = ada.barrier().await;
    assert!(!skipped.contains(&PacketType::PublicChat.id()));
}

#[tokio::test]
async fn test_malformed_and_unknown_packets_are_dropped() {
    let server = start(WorldConfig::default()).await;
    let mut client = Client::connect(server.addr).await;
    client.writer.write_frame(&Frame::new(0x7777, vec![1, 2, 3])).await.unwrap();
    client.send_raw(PacketType::Authenticate, vec![0xFF]).await;
    client.send_raw(PacketType::BuildingClaim, Vec::new()).await;
    client
        .send(&Authenticate {
            email: String::from("cy@example.com"),
        })
        .await;
    let list = client.expect::<CharacterList>().await;
    assert!(list.characters.is_empty());
}

#[tokio::test]
async fn test_oversized_frame_closes_connection() {
    let server = start(WorldConfig {
        max_frame_len: 16,
        ..WorldConfig::default()
    })
    .await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(&[0x00, 0x13, 0x00, 0x40]).await.unwrap();
    let mut reader = FrameReader::new(stream);
    let closed = timeout(WAIT, reader.read_frame()).await.unwrap();
    assert!(matches!(closed, Ok(None) | Err(_)));
}

#[tokio::test]
async fn test_reward_pays_out_once() {
    let server = start(WorldConfig::default()).await;
    let (mut client, _, _) = enter(&server, "ada@example.com", "Ada").await;

    let reward = GrantReward {
        source: 1001,
        gold: 50,
        x: 2100,
        y: 826,
        ..GrantReward::default()
    };
    client.send(&reward).await;
    let drop = client.expect::<LootDrop>().await;
    assert_eq!(drop.contents, LootContents::Gold(50));
    assert_eq!((drop.x, drop.y), (2100, 826));

    client.send(&reward).await;
    let skipped = client.barrier().await;
    assert!(!skipped.contains(&PacketType::LootDrop.id()));

    client.send(&PickupLoot { loot_id: drop.loot_id }).await;
    let granted = client.expect::<RewardGranted>().await;
    assert_eq!((granted.kind, granted.value), (GRANTED_GOLD, 50));

    // A second pickup of the same drop pays nothing.
    client.send(&PickupLoot { loot_id: drop.loot_id }).await;
    let skipped = client.barrier().await;
    assert!(!skipped.contains(&PacketType::RewardGranted.id()));

    let account = server.world.store.login("ada@example.com").await.unwrap();
    let ada = server.world.store.character(account, "Ada").await.unwrap();
    assert_eq!(ada.gold, 50);
}

#[tokio::test]
async fn test_reward_stays_paid_after_leaving_level() {
    let server = start(WorldConfig::default()).await;
    let (mut client, _, _) = enter(&server, "ada@example.com", "Ada").await;

    let reward = GrantReward {
        source: 1001,
        gold: 50,
        x: 2100,
        y: 826,
        ..GrantReward::default()
    };
    client.send(&reward).await;
    client.expect::<LootDrop>().await;

    client.send(&OpenDoor { door_id: 1 }).await;
    client.expect::<DoorTarget>().await;

    client.send(&reward).await;
    let skipped = client.barrier().await;
    assert!(!skipped.contains(&PacketType::LootDrop.id()));
}

#[tokio::test]
async fn test_building_speed_up_then_claim() {
    let server = start(WorldConfig::default()).await;
    let (mut client, _, _) = enter(&server, "ada@example.com", "Ada").await;
    let store = &server.world.store;
    let account = store.login("ada@example.com").await.unwrap();
    store
        .update_character::<_, blitz::character::StoreError>(account, "Ada", |c| {
            c.gold = 1_000;
            c.idols = 20;
            Ok(())
        })
        .await
        .unwrap();

    client
        .send(&BuildingRequest {
            building_id: 3,
            rank: 1,
            pay_with_idols: false,
        })
        .await;
    client.barrier().await;
    assert_eq!(server.world.timers.pending_count(), 1);

    client
        .send_raw(PacketType::BuildingSpeedUp, SpeedUp { cost: 10 }.to_payload())
        .await;
    let purchase = client.expect::<PremiumPurchase>().await;
    assert_eq!(purchase.cost, 10);
    let done = client.expect::<BuildingComplete>().await;
    assert_eq!((done.building_id, done.rank, done.done), (3, 1, true));
    assert_eq!(server.world.timers.pending_count(), 0);

    client.send_raw(PacketType::BuildingClaim, Vec::new()).await;
    client.barrier().await;
    let ada = store.character(account, "Ada").await.unwrap();
    assert_eq!(ada.building_rank(3), 1);
    assert_eq!(ada.gold, 500);
    assert_eq!(ada.idols, 10);
    assert!(ada.timed.building.is_none());
}

#[tokio::test]
async fn test_timer_completion_reaches_the_player() {
    let server = start(WorldConfig::default()).await;
    let (mut client, _, _) = enter(&server, "ada@example.com", "Ada").await;
    let store = &server.world.store;
    let account = store.login("ada@example.com").await.unwrap();

    let request = TimedRequest {
        kind: TimedActionKind::Skill,
        target: 7,
        result: 1,
        currency: Currency::Gold,
    };
    let instant = |_: TimedActionKind, _: u32, _: u32| {
        Some(ActionCost {
            gold: 0,
            idols: 0,
            duration_secs: 0,
        })
    };
    let slot = store
        .update_character(account, "Ada", |c| {
            begin(c, &request, instant, unix_now()).map_err(HandlerError::from)
        })
        .await
        .unwrap();
    server
        .world
        .schedule_completion(account, "Ada", TimedActionKind::Skill, slot);

    let done = client.expect::<SkillComplete>().await;
    assert_eq!(done.ability_id, 7);
    let ada = store.character(account, "Ada").await.unwrap();
    assert!(ada.timed.skill.unwrap().done);
}

#[tokio::test]
async fn test_transfer_through_door() {
    let server = start(WorldConfig::default()).await;
    let (mut client, _, token) = enter(&server, "ada@example.com", "Ada").await;

    client.send(&DoorStateRequest { door_id: 1 }).await;
    let state = client.expect::<DoorState>().await;
    assert_eq!(state.state, DOOR_STATIC);
    assert_eq!(state.target, "SwampRoadNorth");

    client.send(&OpenDoor { door_id: 1 }).await;
    let door = client.expect::<DoorTarget>().await;
    assert_eq!(door.level, "SwampRoadNorth");

    client
        .send(&LevelTransferRequest {
            token: token.wrapping_add(1),
            level: door.level.clone(),
        })
        .await;
    let skipped = client.barrier().await;
    assert!(!skipped.contains(&PacketType::EnterWorld.id()));

    client
        .send(&LevelTransferRequest {
            token,
            level: door.level.clone(),
        })
        .await;
    let redirect = client.expect::<EnterWorld>().await;
    assert_eq!(redirect.level, "SwampRoadNorth");
    assert_eq!(redirect.old_swf, "LevelsNR.swf/a_Level_NewbieRoad");
    assert_eq!(redirect.position, Some((4361, 596)));
    assert!(!redirect.hard);
    assert!(!redirect.dungeon);
    assert_ne!(redirect.token, token);

    let mut next = Client::connect(server.addr).await;
    next.send(&WorldJoin {
        token: redirect.token,
    })
    .await;
    next.send_raw(PacketType::LevelLoaded, Vec::new()).await;
    let spawned = next.expect::<PlayerSpawned>().await;
    assert_eq!((spawned.x, spawned.y), (4361, 596));

    let account = server.world.store.login("ada@example.com").await.unwrap();
    let ada = server.world.store.character(account, "Ada").await.unwrap();
    assert_eq!(ada.current_level.unwrap().name, "SwampRoadNorth");
    assert_eq!(ada.previous_level.unwrap().name, "NewbieRoad");
}

#[tokio::test]
async fn test_transfer_remembers_last_position() {
    let server = start(WorldConfig::default()).await;
    let (mut client, spawned, token) = enter(&server, "ada@example.com", "Ada").await;

    client
        .send(&PlayerMove {
            entity_id: spawned.entity_id,
            x: 777,
            y: 333,
            vx: 0,
        })
        .await;
    client.send(&OpenDoor { door_id: 1 }).await;
    let door = client.expect::<DoorTarget>().await;
    client
        .send(&LevelTransferRequest {
            token,
            level: door.level,
        })
        .await;
    let redirect = client.expect::<EnterWorld>().await;
    assert_eq!(redirect.old_position, Some((777, 333)));

    let account = server.world.store.login("ada@example.com").await.unwrap();
    let ada = server.world.store.character(account, "Ada").await.unwrap();
    let previous = ada.previous_level.unwrap();
    assert_eq!(previous.name, "NewbieRoad");
    assert_eq!((previous.x, previous.y), (777.0, 333.0));
}

#[tokio::test]
async fn test_whisper() {
    let server = start(WorldConfig::default()).await;
    let (mut ada, _, _) = enter(&server, "ada@example.com", "Ada").await;
    let (mut bo, _, _) = enter(&server, "bo@example.com", "Bo").await;

    ada.send(&PrivateMessage {
        recipient: String::from("Nobody"),
        message: String::from("hello?"),
    })
    .await;
    let error = ada.expect::<ErrorMessage>().await;
    assert_eq!(error.message, "Nobody is not online.");

    ada.send(&PrivateMessage {
        recipient: String::from("Bo"),
        message: String::from("psst"),
    })
    .await;
    let echo = ada.expect::<PrivateEcho>().await;
    assert_eq!((echo.recipient.as_str(), echo.message.as_str()), ("Bo", "psst"));
    let delivered = bo.expect::<PrivateDelivered>().await;
    assert_eq!((delivered.sender.as_str(), delivered.message.as_str()), ("Ada", "psst"));
}

#[tokio::test]
async fn test_party_roster_and_map_pings() {
    let server = start(WorldConfig::default()).await;
    let (mut ada, _, _) = enter(&server, "ada@example.com", "Ada").await;
    let (mut bo, _, _) = enter(&server, "bo@example.com", "Bo").await;
    let (mut cy, _, _) = enter(&server, "cy@example.com", "Cy").await;

    ada.send(&GroupInvite {
        name: String::from("Bo"),
    })
    .await;
    let popup = bo.expect::<GroupInvitePopup>().await;
    assert_eq!(popup.inviter_name, "Ada");
    bo.send(&GroupInviteAnswer {
        inviter_entity: popup.inviter_entity,
        inviter_name: popup.inviter_name,
        accepted: true,
    })
    .await;

    for client in [&mut ada, &mut bo] {
        let roster = client.expect::<GroupUpdate>().await;
        assert!(roster.exists);
        let names: Vec<_> = roster.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Ada", "Bo"]);
        assert!(roster.members[0].leader);
        assert!(roster.members.iter().all(|m| m.same_level));
    }

    ada.send(&MapLocation { x: 12, y: 34 }).await;
    let ping = bo.expect::<GroupmateMap>().await;
    assert_eq!((ping.name.as_str(), ping.x, ping.y), ("Ada", 12, 34));
    let skipped = cy.barrier().await;
    assert!(!skipped.contains(&PacketType::GroupmateMap.id()));
    let skipped = ada.barrier().await;
    assert!(!skipped.contains(&PacketType::GroupmateMap.id()));

    // Bo dropping out leaves Ada alone, which dissolves the party.
    drop(bo);
    let roster = ada.expect::<GroupUpdate>().await;
    assert!(!roster.exists);
    assert!(roster.members.is_empty());
}

#[tokio::test]
async fn test_dyes_are_charged_per_changed_channel() {
    let server = start(WorldConfig::default()).await;
    let (mut client, spawned, _) = enter(&server, "ada@example.com", "Ada").await;
    let store = &server.world.store;
    let account = store.login("ada@example.com").await.unwrap();
    store
        .update_character::<_, blitz::character::StoreError>(account, "Ada", |c| {
            c.gold = 25;
            c.equipped[0].as_mut().unwrap().colors = [3, 0];
            Ok(())
        })
        .await
        .unwrap();

    // Slot 0 keeps its first channel and changes the second: one dye.
    let mut slots = [None; DYE_SLOTS];
    slots[0] = Some((3, 9));
    client
        .send(&ApplyDyes {
            entity_id: spawned.entity_id,
            slots,
            pay_with_idols: false,
            shirt_dye: None,
            pants_dye: None,
        })
        .await;
    let sync = client.expect::<DyeSync>().await;
    assert_eq!(sync.entity_id, spawned.entity_id);
    assert_eq!(sync.slots[0], Some((3, 9)));
    let ada = store.character(account, "Ada").await.unwrap();
    assert_eq!(ada.gold, 15);
    assert_eq!(ada.equipped[0].unwrap().colors, [3, 9]);

    // Two more channels cost 20 with only 15 left: nothing changes.
    slots[0] = Some((4, 5));
    client
        .send(&ApplyDyes {
            entity_id: spawned.entity_id,
            slots,
            pay_with_idols: false,
            shirt_dye: None,
            pants_dye: None,
        })
        .await;
    let skipped = client.barrier().await;
    assert!(!skipped.contains(&PacketType::DyeSync.id()));
    let ada = store.character(account, "Ada").await.unwrap();
    assert_eq!(ada.gold, 15);
    assert_eq!(ada.equipped[0].unwrap().colors, [3, 9]);
}

#[tokio::test]
async fn test_debug_inject_needs_switch() {
    let inject = DebugInject {
        broadcast: false,
        packet_type: PacketType::ErrorMessage.id(),
        payload: ErrorMessage {
            message: String::from("injected"),
        }
        .to_payload(),
    };

    let server = start(WorldConfig::default()).await;
    let (mut client, _, _) = enter(&server, "ada@example.com", "Ada").await;
    client.send(&inject).await;
    let skipped = client.barrier().await;
    assert!(!skipped.contains(&PacketType::ErrorMessage.id()));

    let server = start(WorldConfig {
        allow_debug_packets: true,
        ..WorldConfig::default()
    })
    .await;
    let (mut client, _, _) = enter(&server, "ada@example.com", "Ada").await;
    client.send(&inject).await;
    let echoed = client.expect::<ErrorMessage>().await;
    assert_eq!(echoed.message, "injected");
}

#[tokio::test]
async fn test_equipped_pets_are_saved() {
    let server = start(WorldConfig::default()).await;
    let (mut client, _, _) = enter(&server, "ada@example.com", "Ada").await;
    let store = &server.world.store;
    let account = store.login("ada@example.com").await.unwrap();
    store
        .update_character::<_, blitz::character::StoreError>(account, "Ada", |c| {
            c.pets.push(Pet {
                unique_id: 41,
                pet_type: 5,
                rank: 1,
            });
            Ok(())
        })
        .await
        .unwrap();

    // Pet 99 is not owned, so the whole request is refused.
    client
        .send(&EquipPets {
            pets: [(5, 41), (6, 99), (0, 0), (0, 0)],
        })
        .await;
    client.barrier().await;
    assert!(store.character(account, "Ada").await.unwrap().equipped_pets.is_empty());

    client
        .send(&EquipPets {
            pets: [(5, 41), (0, 0), (0, 0), (0, 0)],
        })
        .await;
    client.barrier().await;
    let ada = store.character(account, "Ada").await.unwrap();
    assert_eq!(
        ada.equipped_pets,
        vec![PetSlot {
            pet_type: 5,
            unique_id: 41
        }]
    );
}
