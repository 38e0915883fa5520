use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedSender;

use blitz::character::AccountStore;
use blitz::{session, WorldService};

use crate::config::ServerConfig;
use crate::events::{DisconnectReason, ServerEvent};

pub struct GameServer {
    listener: TcpListener,
    world: Arc<WorldService>,
    events: UnboundedSender<ServerEvent>,
}

impl GameServer {
    /// Load content and saves, recover timed actions, then bind.
    pub async fn bind(config: ServerConfig, events: UnboundedSender<ServerEvent>) -> Result<Self> {
        let tables = config.load_tables()?;
        let store = AccountStore::open(&config.data_dir)
            .with_context(|| format!("opening saves in {}", config.data_dir.display()))?;
        let world = WorldService::new(config.world.clone(), tables, store);
        world
            .recover_timed_actions()
            .await
            .context("recovering timed actions")?;

        let listener = TcpListener::bind((config.bind.as_str(), config.port))
            .await
            .with_context(|| format!("binding {}:{}", config.bind, config.port))?;
        Ok(Self {
            listener,
            world,
            events,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept until `shutdown` resolves. Each client gets its own task.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.spawn_client(stream, addr),
                    Err(e) => {
                        let _ = self.events.send(ServerEvent::Error {
                            message: format!("accept failed: {e}"),
                        });
                    }
                },
                () = &mut shutdown => break,
            }
        }
        self.world.shutdown();
    }

    fn spawn_client(&self, stream: tokio::net::TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            log::debug!("set_nodelay for {}: {}", addr, e);
        }
        let _ = self.events.send(ServerEvent::ClientConnected { addr });
        let world = Arc::clone(&self.world);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = session::serve(world, stream).await;
            if let Err(e) = &result {
                log::debug!("{}: {}", addr, e);
            }
            let reason = DisconnectReason::from_result(&result);
            let _ = events.send(ServerEvent::ClientDisconnected { addr, reason });
        });
    }
}
