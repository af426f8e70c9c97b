use std::io::BufRead;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use clap::Parser;
use pit_core::game::Game;
use pit_core::types::{Asset, NUM_ASSETS};
use pit_core::worker::{BookHandle, spawn_workers};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

mod http;
mod messages;
mod registry;
mod ws;

use messages::OutgoingMessage;
use registry::UserRegistry;

/// How many published events a book topic buffers for slow clients.
const TOPIC_CAPACITY: usize = 1024;

/// Trading-game server: one WebSocket feed per asset book plus the
/// login, state, and leaderboard API. Trading is closed until the
/// operator types `start` on stdin, and closes again on `end`.
#[derive(Parser)]
#[command(name = "pit-server")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:3000")]
    listen: SocketAddr,
}

/// Everything the handlers share.
#[derive(Clone)]
pub struct AppState {
    pub game: Arc<Game>,
    pub handles: Arc<[BookHandle]>,
    pub registry: Arc<UserRegistry>,
    pub topics: Arc<[broadcast::Sender<String>]>,
    accepting: Arc<AtomicBool>,
}

impl AppState {
    /// The writer handle for one book.
    pub fn handle(&self, asset: Asset) -> &BookHandle {
        &self.handles[asset.index()]
    }

    /// Whether the operator has opened trading.
    pub fn accepting(&self) -> bool {
        self.accepting.load(Ordering::Relaxed)
    }

    /// Publishes a message to every client subscribed to `asset`.
    pub fn publish(&self, asset: Asset, outgoing: &OutgoingMessage) {
        // Send only fails with no subscribers, which is fine.
        let _ = self.topics[asset.index()].send(outgoing.to_json());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let game = Arc::new(Game::new());
    let handles: Arc<[BookHandle]> = spawn_workers(&game).into();
    let topics: Arc<[broadcast::Sender<String>]> = (0..NUM_ASSETS)
        .map(|_| broadcast::channel(TOPIC_CAPACITY).0)
        .collect::<Vec<_>>()
        .into();
    let accepting = Arc::new(AtomicBool::new(false));
    let state = AppState {
        game,
        handles,
        registry: Arc::new(UserRegistry::new()),
        topics,
        accepting: Arc::clone(&accepting),
    };

    std::thread::Builder::new()
        .name("operator-gate".into())
        .spawn(move || operator_gate(&accepting))
        .context("failed to spawn operator gate")?;

    let router = Router::new()
        .route("/asset/{asset}", get(ws::asset_ws))
        .route("/api/login", post(http::login))
        .route("/api/state", get(http::state))
        .route("/api/leaderboard", get(http::leaderboard))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    tracing::info!(listen = %args.listen, "serving; type `start` to open trading");
    axum::serve(listener, router).await.context("server error")
}

/// Reads operator commands from stdin. `start` opens trading, `end`
/// closes it; orders and cancels are dropped while closed.
fn operator_gate(accepting: &AtomicBool) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        match line.trim() {
            "start" => {
                accepting.store(true, Ordering::Relaxed);
                tracing::info!("trading open");
            }
            "end" => {
                accepting.store(false, Ordering::Relaxed);
                tracing::info!("trading closed");
            }
            "" => {}
            other => tracing::warn!(command = other, "unknown operator command"),
        }
    }
}
