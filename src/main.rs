//! PDF Chat command-line client
//!
//! Drives the client store from the terminal: list rooms, upload and track
//! a PDF, chat with a document, and generate its podcast.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pdfchat_client::auth::{EnvToken, StaticToken, TokenProvider};
use pdfchat_client::config::{LogFormat, TOKEN_VAR};
use pdfchat_client::models::{MessageEntry, PodcastState, PodcastStatus, RoomEntry, UploadStatus};
use pdfchat_client::scheduler::TokioScheduler;
use pdfchat_client::store::{follow_upload, poll_until, PollError, PollStep};
use pdfchat_client::{ApiError, Config, HttpApi, Store, UploadFile};

#[derive(Parser)]
#[command(name = "pdfchat", version, about = "Chat with your PDF documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List chat rooms, most recent first
    Rooms,
    /// Upload a PDF and wait until it has been processed
    Upload { path: PathBuf },
    /// Show the message history of a room
    Messages { room_id: String },
    /// Ask a question in a room
    Ask { room_id: String, text: String },
    /// Generate the audio summary of a room's document
    Podcast {
        room_id: String,
        /// Save the audio to this file once generated
        #[arg(long)]
        download: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }

    tracing::debug!("API base URL: {}", config.api_base_url);

    // Prefer the live environment value so a rotated token is used per call
    let tokens: Arc<dyn TokenProvider> = if config.api_token.is_some() {
        Arc::new(EnvToken::new(TOKEN_VAR))
    } else {
        tracing::warn!("No API token configured ({}). Requests will be rejected.", TOKEN_VAR);
        Arc::new(StaticToken::new(None))
    };

    let api = HttpApi::new(&config.api_base_url, tokens, config.request_timeout)?;
    let store = Store::new(
        Arc::new(api.clone()),
        Arc::new(TokioScheduler),
        config.store_settings(),
    );

    match cli.command {
        Command::Rooms => {
            store.fetch_chat_rooms().await;
            print_rooms(&store.chat_rooms());
        }
        Command::Upload { path } => {
            let file = UploadFile::from_path(&path).await?;

            let watcher = tokio::spawn(follow_upload(store.subscribe(), |status| {
                println!("upload: {}", status.as_str())
            }));

            store.upload_and_track_document(file).await.wait().await;
            let outcome = watcher.await?;

            print_rooms(&store.chat_rooms());
            match outcome {
                Some(UploadStatus::Success) => println!("{} is ready", path.display()),
                Some(UploadStatus::Failed) => {
                    return Err(format!("Upload of {} failed", path.display()).into())
                }
                _ => println!("upload finished"),
            }
        }
        Command::Messages { room_id } => {
            open_room(&store, &room_id).await;
            print_messages(&store.messages());
        }
        Command::Ask { room_id, text } => {
            open_room(&store, &room_id).await;
            store.post_message(&room_id, &text).await;
            print_messages(&store.messages());
        }
        Command::Podcast { room_id, download } => {
            open_room(&store, &room_id).await;
            let document_id = store
                .chat_rooms()
                .iter()
                .filter_map(RoomEntry::as_room)
                .find(|room| room.id == room_id)
                .map(|room| room.document_id.clone());
            let Some(document_id) = document_id else {
                return Err(format!("Chat room {} not found", room_id).into());
            };

            let mut podcast = store.podcast();
            match podcast.status {
                PodcastStatus::Completed => {}
                PodcastStatus::Generating => {
                    println!("podcast: generation already in progress, waiting");
                    podcast = wait_for_podcast(&api, &config, &document_id).await?;
                }
                PodcastStatus::None | PodcastStatus::Failed => {
                    if let Some(job) = store.generate_podcast(&document_id).await {
                        job.wait().await;
                    }
                    podcast = store.podcast();
                }
            }

            println!("podcast: {}", podcast.status.as_str());
            match (podcast.url, download) {
                (Some(url), Some(dest)) => {
                    let bytes = api.download_podcast(&url, &dest).await?;
                    println!("saved {} bytes to {}", bytes, dest.display());
                }
                (Some(url), None) => println!("{}", url),
                (None, _) => {}
            }
        }
    }

    store.cancel_background_jobs();
    Ok(())
}

/// Load rooms so the document id is known, then activate the room.
async fn open_room(store: &Store, room_id: &str) {
    store.fetch_chat_rooms().await;
    store.set_active_chat_room_id(Some(room_id)).await;
}

/// Poll a generation started elsewhere until it settles.
async fn wait_for_podcast(
    api: &HttpApi,
    config: &Config,
    document_id: &str,
) -> Result<PodcastState, PollError> {
    poll_until(
        &TokioScheduler,
        config.poll_interval,
        config.max_poll_attempts,
        || async move {
            let resp = api.podcast_status(document_id).await?;
            let status = resp.podcast_status();
            Ok::<_, ApiError>(match status {
                PodcastStatus::Completed | PodcastStatus::Failed => PollStep::Ready(PodcastState {
                    status,
                    url: resp.url,
                }),
                _ => PollStep::Pending(resp.status),
            })
        },
    )
    .await
}

fn print_rooms(rooms: &[RoomEntry]) {
    if rooms.is_empty() {
        println!("No recent chats");
        return;
    }
    for room in rooms {
        match room {
            RoomEntry::Room(r) => println!("{}  {}", r.id, r.title),
            RoomEntry::Placeholder(p) => println!("{}  {} ({})", p.temp_id, p.title, p.status),
        }
    }
}

fn print_messages(messages: &[MessageEntry]) {
    for entry in messages {
        let message = entry.message();
        let marker = match entry {
            MessageEntry::Pending { .. } => " (not sent)",
            _ => "",
        };
        println!("[{}]{} {}", message.role.as_str(), marker, message.content);
    }
}
