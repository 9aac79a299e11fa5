use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::error;

use ephemera::capture::{CapturePipeline, FileFrameSource};
use ephemera::configuration::config::{BackendKind, Config};
use ephemera::error_handling::types::{CaptureError, StorageError};
use ephemera::expiry::policy::ExpirySelection;
use ephemera::gallery::renderer::{format_relative_expiry, format_taken_at, Gallery};
use ephemera::storage::database_storage::DatabaseStorage;
use ephemera::storage::file_storage::FileStorage;
use ephemera::storage::storage_trait::Storage;

#[derive(Parser)]
#[command(name = "ephemera")]
#[command(version)]
#[command(about = "Self-destructing photo capture and storage")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Storage backend (overrides the configuration file)
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Directory holding the photo store (overrides the configuration file)
    #[arg(long, env = "EPHEMERA_STORAGE_DIR")]
    storage_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture a photo from an image file and store it with an expiry
    Capture {
        /// Image file standing in for the camera frame
        #[arg(long)]
        input: PathBuf,

        /// How long the photo lives (defaults to the configured selection)
        #[arg(long, value_enum)]
        expires_in: Option<ExpirySelection>,

        /// Absolute expiry instant (RFC 3339), required with `--expires-in custom`
        #[arg(long)]
        expires_at: Option<DateTime<Utc>>,
    },
    /// List stored photos, newest first, with their remaining lifetime
    List,
    /// Delete a photo by id
    Delete { id: String },
    /// Export a photo's image bytes into a directory
    Export {
        id: String,

        /// Directory receiving the exported image
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Remove every photo past its expiry instant
    Sweep,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Unable to import configuration from file: {}", e);
                exit(1);
            }
        },
        None => Config::default(),
    };
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(path) = args.storage_path {
        config.storage_path = Some(path);
    }

    let storage = match open_storage(&config).await {
        Ok(storage) => storage,
        Err(e) => {
            error!("Unable to open photo storage: {}", e);
            exit(1);
        }
    };

    let code = run(args.command, &config, storage).await;
    if code != 0 {
        exit(code);
    }
}

/// One store instance per run, handed by `Arc` to whichever component
/// needs it.
async fn open_storage(config: &Config) -> Result<Arc<dyn Storage>, StorageError> {
    Ok(match (config.backend, &config.storage_path) {
        (BackendKind::Sqlite, Some(dir)) => Arc::new(DatabaseStorage::new_in_dir(dir).await?),
        (BackendKind::Sqlite, None) => Arc::new(DatabaseStorage::new_default().await?),
        (BackendKind::File, Some(dir)) => Arc::new(FileStorage::new(dir)?),
        (BackendKind::File, None) => Arc::new(FileStorage::new_default()?),
    })
}

async fn run(command: Command, config: &Config, storage: Arc<dyn Storage>) -> i32 {
    match command {
        Command::Capture {
            input,
            expires_in,
            expires_at,
        } => {
            let selection = expires_in.unwrap_or(config.default_expiry);
            let now = Utc::now();
            // The policy passes custom instants through untouched; the
            // lower bound belongs here, at presentation time.
            if selection == ExpirySelection::Custom {
                match expires_at {
                    None => {
                        eprintln!("--expires-in custom requires --expires-at <RFC 3339 instant>");
                        return 1;
                    }
                    Some(instant) if instant <= now => {
                        eprintln!("The custom expiry instant must lie in the future.");
                        return 1;
                    }
                    Some(_) => {}
                }
            }

            let pipeline = CapturePipeline::new(storage);
            let source = FileFrameSource::new(&input);
            match pipeline.capture(&source, selection, expires_at, now).await {
                Ok(photo) => {
                    println!(
                        "Captured photo {} (expires in {})",
                        photo.id,
                        format_relative_expiry(photo.expiry_date, now)
                    );
                    0
                }
                Err(CaptureError::StorageError(StorageError::QuotaExceeded)) => {
                    eprintln!("Not enough storage space. Please delete some photos and try again.");
                    1
                }
                Err(CaptureError::StorageError(StorageError::DuplicateId)) => {
                    eprintln!("A photo with this id already exists; nothing was stored.");
                    1
                }
                Err(CaptureError::StorageError(StorageError::Unavailable)) => {
                    eprintln!("Photo storage is unavailable. Check the storage path and try again.");
                    1
                }
                Err(e) => {
                    error!("Error saving photo: {}", e);
                    1
                }
            }
        }
        Command::List => {
            let gallery = Gallery::new(storage);
            match gallery.load(Utc::now()).await {
                Ok(entries) if entries.is_empty() => {
                    println!("No photos stored.");
                    0
                }
                Ok(entries) => {
                    for entry in entries {
                        println!(
                            "{}  taken {}  expires in {}",
                            entry.photo.id,
                            format_taken_at(entry.photo.timestamp),
                            entry.expires_in
                        );
                    }
                    0
                }
                Err(StorageError::Unavailable) => {
                    eprintln!("Photo storage is unavailable. Check the storage path and try again.");
                    1
                }
                Err(e) => {
                    error!("Failed to load gallery: {}", e);
                    1
                }
            }
        }
        Command::Delete { id } => {
            let gallery = Gallery::new(storage);
            match gallery.delete(&id).await {
                Ok(()) => {
                    println!("Deleted {}", id);
                    0
                }
                Err(e) => {
                    error!("Error deleting photo: {}", e);
                    1
                }
            }
        }
        Command::Export { id, output_dir } => {
            let gallery = Gallery::new(storage);
            let entries = match gallery.load(Utc::now()).await {
                Ok(entries) => entries,
                Err(e) => {
                    error!("Failed to load gallery: {}", e);
                    return 1;
                }
            };
            let Some(entry) = entries.into_iter().find(|e| e.photo.id == id) else {
                eprintln!("No photo with id {}", id);
                return 1;
            };
            match gallery.export_photo(&entry.photo, &output_dir) {
                Ok(path) => {
                    println!("Exported to {}", path.display());
                    0
                }
                Err(e) => {
                    error!("Error exporting photo: {}", e);
                    1
                }
            }
        }
        Command::Sweep => match storage.sweep_expired(Utc::now()).await {
            Ok(removed) => {
                println!("Removed {} expired photo(s)", removed);
                0
            }
            Err(e) => {
                error!("Expiry sweep failed: {}", e);
                1
            }
        },
    }
}
