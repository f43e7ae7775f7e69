use clap::Parser;
use log::{error, info};
use server::game::{Direction, GameConfig};
use server::network::{Server, ServerConfig};
use shared::DEFAULT_PORT;
use std::time::Duration;

/// Main-method of the application.
/// Parses command-line arguments, opens the lobby and hosts one game.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Players to wait for before dealing (2-4)
        #[clap(short = 'n', long, default_value = "2")]
        players: usize,
        /// Shuffle seed for a reproducible game
        #[clap(short, long)]
        seed: Option<u64>,
        /// Start with play running in reverse
        #[clap(short, long)]
        reverse: bool,
        /// Lobby poll interval in milliseconds
        #[clap(long, default_value = "250", value_parser = clap::value_parser!(u64).range(1..))]
        poll_ms: u64,
    }

    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ServerConfig {
        addr: format!("{}:{}", args.host, args.port),
        players: args.players,
        seed: args.seed,
        game: GameConfig {
            direction: if args.reverse {
                Direction::Reverse
            } else {
                Direction::Forward
            },
            ..GameConfig::default()
        },
        poll_interval: Duration::from_millis(args.poll_ms),
    };

    // A bind failure here usually means another host is already running
    let server = Server::new(config).await?;
    info!("Hosting on {}", server.local_addr());

    tokio::select! {
        result = server.run() => {
            match result {
                Ok(Some(winner)) => info!("Player {} won the game", winner),
                Ok(None) => info!("Game ended without a winner"),
                Err(e) => {
                    error!("Could not start the game: {}", e);
                    return Err(e.into());
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}
