//! Headless consumer for the vitals tracker: logs in, shows what's
//! playing, identifies a cover photo, starts/stops playback, and runs the
//! Discogs sync flow. All state handling lives in `vitals-core`; this
//! binary only triggers mutations and renders the derived view state.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::error;
use vitals_core::listening::{album_display, side_label, AlbumDisplay};
use vitals_core::models::DiscogsSyncPlan;
use vitals_core::{ClientConfig, MutationKey, VitalsApi};

/// Command-line client for the vitals "now playing" tracker.
#[derive(Parser)]
#[command(name = "vitals")]
struct Args {
    /// Server origin (without the api/v1 prefix).
    #[arg(long, default_value = "http://localhost:5000", env = "VITALS_SERVER_URL")]
    server: String,

    /// Username for the session.
    #[arg(long, env = "VITALS_USERNAME")]
    username: Option<String>,

    /// Password for the session.
    #[arg(long, env = "VITALS_PASSWORD")]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show who is logged in.
    Whoami,
    /// Show the album currently playing.
    Status,
    /// Identify an album from a cover photo and play it.
    Play {
        /// Path to a cover photo (jpeg/png).
        image: PathBuf,
        /// Side to play (0 = Side A).
        #[arg(long, default_value_t = 0)]
        side: u32,
    },
    /// Stop playback.
    Stop,
    /// Create an account.
    SignUp {
        #[arg(long)]
        new_username: String,
        #[arg(long)]
        new_password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Discogs collection sync.
    Discogs {
        #[command(subcommand)]
        command: DiscogsCommand,
    },
}

#[derive(Subcommand)]
enum DiscogsCommand {
    /// Show the linked Discogs account.
    Identity,
    /// Show what a sync would change.
    Plan,
    /// Plan and execute a sync.
    Run,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let api = VitalsApi::new(ClientConfig::new(args.server.clone()));

    if let (Some(username), Some(password)) = (&args.username, &args.password) {
        api.login(username, password).await.unwrap_or_else(|e| {
            error!("login failed: {e}");
            std::process::exit(1);
        });
    }

    match args.command {
        Command::Whoami => whoami(&api).await,
        Command::Status => status(&api).await,
        Command::Play { image, side } => play(&api, &image, side).await,
        Command::Stop => stop(&api).await,
        Command::SignUp {
            new_username,
            new_password,
            confirm_password,
        } => sign_up(&api, &new_username, &new_password, &confirm_password).await,
        Command::Discogs { command } => discogs(&api, command).await,
    }
}

fn fail(err: impl std::fmt::Display) -> ! {
    error!("{err}");
    std::process::exit(1);
}

async fn whoami(api: &VitalsApi) {
    let identity = api.user_identity().await.unwrap_or_else(|e| fail(e));
    match identity.username {
        Some(username) => println!("Logged in as {username}"),
        None => println!("Not logged in"),
    }
}

async fn status(api: &VitalsApi) {
    let current = api.current_album().await.unwrap_or_else(|e| fail(e));
    match album_display(&api.selection().snapshot(), Some(&current), false) {
        AlbumDisplay::Album(album) => {
            println!("{} by {}", album.title, album.artist);
            if let Some(side) = current.side {
                println!("{}", side_label(side));
            }
        }
        AlbumDisplay::NotPlaying => println!("Not playing"),
        AlbumDisplay::Loading => println!("Loading..."),
    }
}

async fn play(api: &VitalsApi, image: &Path, side: u32) {
    let bytes = std::fs::read(image)
        .unwrap_or_else(|e| fail(format!("could not read {}: {e}", image.display())));
    let file_name = image
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("query")
        .to_string();

    let matches = api
        .album_match(bytes, &file_name)
        .await
        .unwrap_or_else(|e| fail(e));
    if matches.albums.is_empty() {
        fail("no matching album found");
    }
    for (rank, album) in matches.albums.iter().enumerate() {
        println!("{}. {} by {}", rank + 1, album.title, album.artist);
    }

    // The settlement hook already selected the best match.
    let album = api
        .selection()
        .selected_album()
        .unwrap_or_else(|| fail("no album selected"));
    api.selection().set_selected_side(Some(side));

    api.set_album(&album, side).await.unwrap_or_else(|e| {
        for line in api.listening_page_errors() {
            eprintln!("{line}");
        }
        fail(e)
    });

    // Confirmed: dismiss the match flow (the selection clears with it).
    api.reset_mutation(MutationKey::AlbumMatch);
    println!("Playing {} ({})", album.title, side_label(side));
}

async fn stop(api: &VitalsApi) {
    api.stop_play().await.unwrap_or_else(|e| fail(e));
    println!("Stopped");
}

async fn sign_up(api: &VitalsApi, username: &str, password: &str, confirm_password: &str) {
    match api.sign_up(username, password, confirm_password).await {
        Ok(()) => println!("Signed up {username}; you can now log in"),
        Err(err) => fail(err),
    }
}

async fn discogs(api: &VitalsApi, command: DiscogsCommand) {
    match command {
        DiscogsCommand::Identity => {
            let response = api.discogs_identity().await.unwrap_or_else(|e| fail(e));
            match response.discogs_identity {
                Some(identity) => println!("Logged in to discogs as {}", identity.username),
                None => println!(
                    "Not linked to discogs; log in at {}?vitals_callback=/",
                    response.login_url
                ),
            }
        }
        DiscogsCommand::Plan => {
            let plan = api.discogs_sync_plan().await.unwrap_or_else(|e| fail(e));
            print_plan(&plan);
        }
        DiscogsCommand::Run => {
            let plan = api.discogs_sync_plan().await.unwrap_or_else(|e| fail(e));
            print_plan(&plan);
            api.execute_discogs_sync()
                .await
                .unwrap_or_else(|e| fail(e));
            api.reset_mutation(MutationKey::DiscogsSyncPlan);
            println!("Sync succeeded");
        }
    }
}

fn print_plan(plan: &DiscogsSyncPlan) {
    println!("Add albums:");
    for album in &plan.add_collection {
        println!("  {}", album.display_name());
    }
    println!("Remove albums:");
    for album in &plan.rm_collection {
        println!("  {}", album.display_name());
    }
    for message in &plan.error_messages {
        eprintln!("sync warning: {message}");
    }
}
