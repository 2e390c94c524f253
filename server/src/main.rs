use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::{
    net::TcpListener,
    signal::unix::{signal, SignalKind},
    sync::broadcast,
    task::JoinSet,
};
use tracing_subscriber::EnvFilter;

use crate::{
    joke::{DadJokeClient, JokeProvider, DAD_JOKE_URL},
    room::RoomRegistry,
};

mod joke;
mod room;
mod session;

#[derive(Debug, Parser)]
#[command(about = "A room-based group chat server")]
struct Args {
    /// Address to listen on for client connections
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: String,
    /// Endpoint of the plain-text joke provider
    #[arg(long, default_value = DAD_JOKE_URL)]
    joke_url: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let registry = RoomRegistry::new();
    let jokes: Arc<dyn JokeProvider> =
        Arc::new(DadJokeClient::new(&args.joke_url).expect("could not build the joke client"));

    let mut join_set: JoinSet<anyhow::Result<()>> = JoinSet::new();
    let mut interrupt =
        signal(SignalKind::interrupt()).expect("failed to create interrupt signal stream");
    let server = TcpListener::bind(&args.listen)
        .await
        .expect("could not bind to the port");
    let (quit_tx, quit_rx) = broadcast::channel::<()>(1);

    tracing::info!("listening on {}", args.listen);
    loop {
        tokio::select! {
            _ = interrupt.recv() => {
                tracing::info!("server interrupted, gracefully shutting down");
                quit_tx.send(()).context("failed to send quit signal").unwrap();
                break;
            }
            Ok((socket, _)) = server.accept() => {
                join_set.spawn(session::handle_session(
                    registry.clone(),
                    jokes.clone(),
                    quit_rx.resubscribe(),
                    socket,
                ));
            }
        }
    }

    while join_set.join_next().await.is_some() {}
    tracing::info!("server shut down");
}
