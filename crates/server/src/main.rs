mod config;
mod events;
mod server;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;

use blitz::ai::AiConfig;
use blitz::net::{DEFAULT_PORT, MAX_PAYLOAD_LEN};
use blitz::WorldConfig;
use config::ServerConfig;
use events::ServerEvent;
use server::GameServer;

#[derive(Parser)]
#[command(name = "blitz-server")]
#[command(about = "Dungeon Blitz game server")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    #[arg(long, help = "JSON content tables (defaults to the built-in set)")]
    tables: Option<PathBuf>,

    #[arg(long, default_value = "127.0.0.1", help = "Host clients reconnect to after a level transfer")]
    public_host: String,

    #[arg(long, default_value_t = 125, help = "NPC tick interval in ms")]
    ai_interval_ms: u64,

    #[arg(long, help = "Honour debug packet injection")]
    allow_debug_packets: bool,

    #[arg(long, default_value_t = MAX_PAYLOAD_LEN)]
    max_frame_len: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let interval = Duration::from_millis(args.ai_interval_ms.max(1));
    let config = ServerConfig {
        bind: args.bind,
        port: args.port,
        data_dir: args.data_dir,
        tables: args.tables,
        world: WorldConfig {
            public_host: args.public_host,
            public_port: args.port,
            ai: AiConfig::with_interval(interval),
            allow_debug_packets: args.allow_debug_packets,
            max_frame_len: args.max_frame_len,
        },
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let server = GameServer::bind(config, tx).await?;
    log::info!("Server started on {}", server.local_addr()?);

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ServerEvent::ClientConnected { addr } => {
                    log::info!("Connection from {}", addr);
                }
                ServerEvent::ClientDisconnected { addr, reason } => {
                    log::info!("Client {} {}", addr, reason.as_str());
                }
                ServerEvent::Error { message } => log::error!("{}", message),
            }
        }
    });

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("waiting for ctrl-c: {}", e);
            }
        })
        .await;
    log::info!("Server shutting down");
    Ok(())
}
