use clap::Parser;
use client::bot::{self, Outcome};
use client::network::{Client, RetryPolicy};
use log::{info, warn};
use shared::{NetError, DEFAULT_PORT};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))]
    server: SocketAddr,

    /// Connection attempts before giving up
    #[arg(short = 'r', long, default_value = "50")]
    retries: u32,

    /// Pause between connection attempts in milliseconds
    #[arg(long, default_value = "200")]
    retry_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Connecting to: {}", args.server);
    let retry = RetryPolicy {
        attempts: args.retries,
        delay: Duration::from_millis(args.retry_delay_ms),
    };
    let mut client = Client::connect(args.server, retry).await?;

    let outcome = tokio::select! {
        outcome = bot::play_game(&mut client) => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };

    let Some(outcome) = outcome else {
        println!("Received Ctrl+C, leaving the game...");
        client.disconnect().await?;
        return Ok(());
    };

    match outcome {
        Ok(Outcome::Won) => println!("You win!"),
        Ok(Outcome::Lost) => println!("You lose."),
        Err(NetError::Disconnected) => warn!("Server closed the connection"),
        Err(e) => return Err(e.into()),
    }

    if let Err(e) = client.disconnect().await {
        info!("Connection already closed: {}", e);
    }
    Ok(())
}
