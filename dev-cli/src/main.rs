//! Developer-facing CLI over the game hosting platform's HTTP surface:
//! register, log in, upload and update game bundles, remove a game, and
//! list what's published. Implements no business rules
//! of its own — every check happens server-side; this shim just renders
//! `platform-client`'s typed errors to the terminal.

use std::path::PathBuf;

use base64::Engine;
use clap::{Parser, Subcommand};
use platform_client::PlatformClient;

#[derive(Parser)]
#[command(name = "dev-cli", about = "Developer CLI for the game hosting platform")]
struct Cli {
    /// Base URL of the platform server.
    #[arg(short, long, global = true, default_value = "http://localhost:5000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a developer account.
    Register { username: String, password: String },
    /// Log in, establishing a session.
    Login { username: String, password: String },
    /// Log out.
    Logout { username: String },
    /// List published games.
    List {
        #[arg(long)]
        all: bool,
    },
    /// Upload a new game from a zip bundle.
    Upload {
        developer: String,
        name: String,
        version: String,
        bundle: PathBuf,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Publish a new version of an existing game.
    Update {
        developer: String,
        game_id: String,
        version: String,
        bundle: PathBuf,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Deactivate a game.
    Remove { developer: String, game_id: String },
    /// Download a bundle to disk.
    Download {
        game_id: String,
        out: PathBuf,
        #[arg(long)]
        version: Option<String>,
    },
    /// Print the per-file integrity manifest for a bundle.
    Integrity {
        game_id: String,
        #[arg(long)]
        version: Option<String>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] platform_client::ClientError),
    #[error("failed to read bundle {path}: {source}")]
    ReadBundle { path: PathBuf, source: std::io::Error },
    #[error("failed to write {path}: {source}")]
    WriteBundle { path: PathBuf, source: std::io::Error },
    #[error("failed to decode downloaded bundle: {0}")]
    DecodeBundle(base64::DecodeError),
}

fn read_bundle_base64(path: &std::path::Path) -> Result<String, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::ReadBundle {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
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

async fn run(client: &PlatformClient, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Register { username, password } => {
            client.register_developer(&username, &password).await?;
            println!("registered developer '{username}'");
        }
        Commands::Login { username, password } => {
            client.login_developer(&username, &password).await?;
            println!("logged in as '{username}'");
        }
        Commands::Logout { username } => {
            client.logout_developer(&username).await?;
            println!("logged out '{username}'");
        }
        Commands::List { all } => {
            let games = client.list_games(all).await?;
            for game in games {
                println!(
                    "{:<16} {:<24} v{:<10} players {}-{} active={}",
                    game.id, game.name, game.latest_version, game.min_players, game.max_players, game.active
                );
            }
        }
        Commands::Upload {
            developer,
            name,
            version,
            bundle,
            description,
        } => {
            let file_data = read_bundle_base64(&bundle)?;
            let game = client.create_game(&developer, &name, &description, &version, &file_data).await?;
            println!("published '{}' as game id '{}'", game.name, game.id);
        }
        Commands::Update {
            developer,
            game_id,
            version,
            bundle,
            notes,
        } => {
            let file_data = read_bundle_base64(&bundle)?;
            let game = client.update_game(&developer, &game_id, &version, &file_data, &notes).await?;
            println!("'{}' now at version '{}'", game.id, game.latest_version);
        }
        Commands::Remove { developer, game_id } => {
            let outcome = client.remove_game(&developer, &game_id).await?;
            println!(
                "deactivated '{game_id}' ({} room(s) still active will keep running)",
                outcome.active_rooms
            );
        }
        Commands::Download { game_id, out, version } => {
            let blob = client.download_game(&game_id, version.as_deref()).await?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(&blob.file_data)
                .map_err(CliError::DecodeBundle)?;
            std::fs::write(&out, bytes).map_err(|source| CliError::WriteBundle {
                path: out.clone(),
                source,
            })?;
            println!("wrote '{}' v{} to {}", blob.name, blob.version, out.display());
        }
        Commands::Integrity { game_id, version } => {
            let manifest = client.game_integrity(&game_id, version.as_deref()).await?;
            println!("{} v{}:", manifest.game_id, manifest.version);
            for (path, hash) in &manifest.files {
                println!("  {hash}  {path}");
            }
        }
    }
    Ok(())
}
