//! Course Tree Daemon - cached mirror of a cloud-drive course hierarchy
//!
//! This daemon lists a Drive folder tree (courses, subjects, chapters,
//! lectures), caches it with a fixed TTL and serves it to the browser as JSON.

mod api;
mod cache;
mod config;
mod drive;
mod sync;
mod tree;

#[cfg(test)]
mod testing;

use anyhow::{anyhow, Result};
use std::env;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use api::AppState;
use config::Config;
use drive::DriveClient;
use sync::{SyncOptions, TreeCacheSync};

/// CLI command
#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// Run HTTP server mode (default)
    Server,
    /// Print the complete structure below a folder (CLI mode)
    Tree { folder_id: String },
    /// Print one level of a folder (CLI mode)
    Ls { folder_id: String },
    /// Show help
    Help,
}

fn print_help() {
    eprintln!(
        r#"Course Tree Daemon - Serve a cached Drive course hierarchy over HTTP

USAGE:
    course-tree-daemon                   # Run HTTP server (default)
    course-tree-daemon tree <folder_id>
    course-tree-daemon ls <folder_id>
    course-tree-daemon help

COMMANDS:
    (none)  Run HTTP server mode
    tree    Print the full structure below a folder as JSON (CLI mode)
    ls      Print the immediate contents of a folder as JSON (CLI mode)
    help    Show this help message

ENDPOINTS:
    GET  /courses             Full structure below DRIVE_ROOT_FOLDER_ID
    GET  /folder/<folder_id>  Immediate contents of one folder
    POST /cache/clear         Drop every cached listing
    GET  /status              Cache statistics and upstream health

ENVIRONMENT:
    DRIVE_ROOT_FOLDER_ID   Root folder served by /courses
    DRIVE_API_KEY          Drive API key
    DRIVE_ACCESS_TOKEN     OAuth access token (alternative to API key)
    DRIVE_API_BASE         API base URL (default https://www.googleapis.com)
    PORT                   HTTP port (default 8080)
    BIND_ADDR              HTTP bind address (default 0.0.0.0)
    CACHE_TTL_SECS         Cache time-to-live in seconds (default 300)
    TRAVERSAL_CONCURRENCY  Max in-flight listing calls (default 8)
    CACHE_DEGRADED_TREES   Cache trees with failed branches (default true)
    RUST_LOG               Log filter (trace, debug, info, warn, error)
"#
    );
}

fn parse_args(args: &[String]) -> Result<Command> {
    if args.len() < 2 {
        return Ok(Command::Server);
    }

    match args[1].as_str() {
        "tree" | "ls" => {
            let folder_id = args
                .get(2)
                .cloned()
                .ok_or_else(|| anyhow!("Usage: course-tree-daemon {} <folder_id>", args[1]))?;
            if args[1] == "tree" {
                Ok(Command::Tree { folder_id })
            } else {
                Ok(Command::Ls { folder_id })
            }
        }
        "serve" => Ok(Command::Server),
        "help" | "--help" | "-h" => Ok(Command::Help),
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            Ok(Command::Help)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Parse command
    let args: Vec<String> = env::args().collect();
    let command = match parse_args(&args) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    if command == Command::Help {
        print_help();
        return Ok(());
    }

    let config = Config::from_env()?;

    let drive_client = match DriveClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to create Drive client");
            return Err(e.into());
        }
    };

    let sync = Arc::new(TreeCacheSync::new(
        Arc::new(drive_client),
        SyncOptions::from(&config),
    ));

    match command {
        Command::Server => {
            info!("Starting course tree daemon in HTTP server mode");
            if let Err(e) = config.root_folder_id() {
                error!(error = %e, "/courses will fail until the root folder is configured");
            }

            let address = config.listen_addr();
            let state = AppState {
                sync,
                config: Arc::new(config),
            };
            api::serve(&address, state).await?;

            info!("Shutdown complete.");
        }
        Command::Tree { folder_id } => {
            let nodes = sync.get_complete_structure(&folder_id).await?;
            println!("{}", serde_json::to_string_pretty(&*nodes)?);
        }
        Command::Ls { folder_id } => {
            let nodes = sync.get_folder_contents(&folder_id).await?;
            println!("{}", serde_json::to_string_pretty(&*nodes)?);
        }
        Command::Help => print_help(),
    }

    Ok(())
}
