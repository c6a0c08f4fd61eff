//! Player-facing CLI over the game hosting platform's HTTP surface:
//! register, log in, browse games, manage rooms, and rate a game.
//! Implements no business rules of its own — every
//! check happens server-side.

use std::time::Duration;

use clap::{Parser, Subcommand};
use platform_client::PlatformClient;

#[derive(Parser)]
#[command(name = "player-cli", about = "Player CLI for the game hosting platform")]
struct Cli {
    /// Base URL of the platform server.
    #[arg(short, long, global = true, default_value = "http://localhost:5000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a player account.
    Register { username: String, password: String },
    /// Log in, establishing a session.
    Login { username: String, password: String },
    /// Log out.
    Logout { username: String },
    /// Show a player's profile and played-game counts.
    Me { username: String },
    /// List active games available to play.
    Games,
    /// List rooms (waiting, in-game and recently-finished).
    Rooms,
    /// Show one room's detail.
    Room { room_id: u64 },
    /// Create a room for a game, becoming its host.
    Create { player: String, game_id: String },
    /// Join an existing room.
    Join { player: String, room_id: u64 },
    /// Leave a room.
    Leave { player: String, room_id: u64 },
    /// Host-only: start the room's game server.
    Start { player: String, room_id: u64 },
    /// Host-only: close a waiting room.
    Close { player: String, room_id: u64 },
    /// Stay in a room, heartbeating every 5s until it finishes or Ctrl-C —
    /// this is what keeps a room from being reaped as abandoned while a
    /// real player would be connected to it.
    Watch { player: String, room_id: u64 },
    /// Rate a game after playing it.
    Rate {
        player: String,
        game_id: String,
        score: u8,
        #[arg(long, default_value = "")]
        comment: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    let client = PlatformClient::new(cli.server)?;

    if let Err(e) = run(&client, cli.command).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
    Ok(())
}

fn print_room(room: &platform_client::types::Room) {
    println!(
        "room {} | game {} v{} | status {:?} | players {}/{} | host {}",
        room.id,
        room.game_id,
        room.version,
        room.status,
        room.players.len(),
        room.max_players,
        room.host,
    );
    if let Some(addr) = &room.game_server {
        println!("  game server: {}:{}", addr.host, addr.port);
    }
    if let Some(reason) = &room.ended_reason {
        println!("  ended: {reason}");
    }
}

async fn run(client: &PlatformClient, command: Commands) -> Result<(), platform_client::ClientError> {
    match command {
        Commands::Register { username, password } => {
            client.register_player(&username, &password).await?;
            println!("registered player '{username}'");
        }
        Commands::Login { username, password } => {
            client.login_player(&username, &password).await?;
            println!("logged in as '{username}'");
        }
        Commands::Logout { username } => {
            client.logout_player(&username).await?;
            println!("logged out '{username}'");
        }
        Commands::Me { username } => {
            let profile = client.player_me(&username).await?;
            println!("{} (online: {})", profile.username, profile.online);
            for (game_id, count) in &profile.played_games {
                println!("  played {game_id}: {count} time(s)");
            }
        }
        Commands::Games => {
            let games = client.list_games(false).await?;
            for game in games {
                println!(
                    "{:<16} {:<24} players {}-{}",
                    game.id, game.name, game.min_players, game.max_players
                );
            }
        }
        Commands::Rooms => {
            for room in client.list_rooms().await? {
                print_room(&room);
            }
        }
        Commands::Room { room_id } => {
            print_room(&client.get_room(room_id).await?);
        }
        Commands::Create { player, game_id } => {
            let room = client.create_room(&player, &game_id).await?;
            println!("created room {}", room.id);
            print_room(&room);
        }
        Commands::Join { player, room_id } => {
            print_room(&client.join_room(room_id, &player).await?);
        }
        Commands::Leave { player, room_id } => {
            print_room(&client.leave_room(room_id, &player).await?);
        }
        Commands::Start { player, room_id } => {
            print_room(&client.start_room(room_id, &player).await?);
        }
        Commands::Close { player, room_id } => {
            print_room(&client.close_room(room_id, &player).await?);
        }
        Commands::Watch { player, room_id } => watch(client, &player, room_id).await?,
        Commands::Rate {
            player,
            game_id,
            score,
            comment,
        } => {
            client.add_rating(&player, &game_id, score, &comment).await?;
            println!("rated '{game_id}' {score}/5");
        }
    }
    Ok(())
}

async fn watch(client: &PlatformClient, player: &str, room_id: u64) -> Result<(), platform_client::ClientError> {
    let mut interval = tokio::time::interval(Duration::from_secs(5));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                // The server refuses a heartbeat on a room that's already
                // finished (it isn't a member action anymore), so a failed
                // heartbeat here doesn't necessarily mean something's wrong —
                // fall back to a plain fetch to see whether that's why.
                let room = match client.room_heartbeat(room_id, player).await {
                    Ok(room) => room,
                    Err(_) => client.get_room(room_id).await?,
                };
                print_room(&room);
                if room.status == platform_client::types::RoomStatus::Finished {
                    client.mark_room_played(room_id, player).await.ok();
                    println!("room finished, stopping watch");
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("stopping watch");
                return Ok(());
            }
        }
    }
}
