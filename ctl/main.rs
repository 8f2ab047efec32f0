#![forbid(unsafe_code)]

//! `quest-passer-ctl`: local CLI companion for `quest-passer`.
//!
//! Connects to the IPC socket and sends JSON commands to the supervisor.

use std::io::{BufRead, BufReader, Write};

use clap::{Parser, Subcommand};
use interprocess::local_socket::{traits::Stream as _, GenericNamespaced, Stream, ToNsName};

#[derive(Debug, Parser)]
#[command(
    name = "quest-passer-ctl",
    about = "Local CLI for the quest-passer supervisor",
    version,
    long_about = None
)]
struct Cli {
    /// IPC socket name (must match the server's `ipc_name` config).
    #[arg(long, default_value = "quest-passer")]
    ipc_name: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the running session, the queue, and settings.
    Status,

    /// Search the catalog and custom games by name.
    Search {
        /// Case-insensitive name fragment.
        query: String,
    },

    /// Start a game now.
    Play {
        /// Catalog identifier.
        id: String,
        /// Display name override.
        #[arg(long)]
        name: Option<String>,
    },

    /// Stop the running game.
    Stop,

    /// Add a game to the queue, starting it if nothing is running.
    Enqueue {
        /// Catalog identifier.
        id: String,
    },

    /// Remove a game from the queue.
    Remove {
        /// Catalog identifier.
        id: String,
    },

    /// Empty the queue.
    Clear,

    /// Advance the queue automatically.
    Arm,

    /// Stop advancing the queue.
    Disarm,

    /// Show or change settings.
    Settings {
        /// Per-session run time in seconds (60 to 3600).
        #[arg(long)]
        duration: Option<u64>,
        /// Announce when a session reaches the quest threshold.
        #[arg(long)]
        notify: Option<bool>,
    },

    /// Save a custom game.
    AddCustom {
        /// Catalog identifier.
        id: String,
        /// Display name.
        name: String,
    },

    /// Delete a custom game.
    RemoveCustom {
        /// Catalog identifier.
        id: String,
    },
}

fn main() {
    let args = Cli::parse();

    let request_json = match &args.command {
        Command::Status => serde_json::json!({ "command": "status" }),
        Command::Search { query } => {
            serde_json::json!({ "command": "search", "query": query })
        }
        Command::Play { id, name } => {
            let mut req = serde_json::json!({ "command": "play", "id": id });
            if let Some(n) = name {
                req["name"] = serde_json::Value::String(n.clone());
            }
            req
        }
        Command::Stop => serde_json::json!({ "command": "stop" }),
        Command::Enqueue { id } => {
            serde_json::json!({ "command": "enqueue", "id": id })
        }
        Command::Remove { id } => {
            serde_json::json!({ "command": "remove", "id": id })
        }
        Command::Clear => serde_json::json!({ "command": "clear" }),
        Command::Arm => serde_json::json!({ "command": "arm" }),
        Command::Disarm => serde_json::json!({ "command": "disarm" }),
        Command::Settings { duration, notify } => {
            let mut req = serde_json::json!({ "command": "settings" });
            if let Some(d) = duration {
                req["duration"] = serde_json::Value::from(*d);
            }
            if let Some(n) = notify {
                req["notify"] = serde_json::Value::Bool(*n);
            }
            req
        }
        Command::AddCustom { id, name } => {
            serde_json::json!({ "command": "add-custom", "id": id, "name": name })
        }
        Command::RemoveCustom { id } => {
            serde_json::json!({ "command": "remove-custom", "id": id })
        }
    };

    match send_ipc_command(&args.ipc_name, &request_json) {
        Ok(response) => {
            if let Some(obj) = response.as_object() {
                let ok = obj
                    .get("ok")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false);
                if ok {
                    match obj.get("data") {
                        Some(serde_json::Value::Null) | None => println!("OK"),
                        Some(data) => {
                            println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
                        }
                    }
                } else {
                    let err_msg = obj
                        .get("error")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown error");
                    eprintln!("Error: {err_msg}");
                    std::process::exit(1);
                }
            } else {
                println!("{response}");
            }
        }
        Err(err) => {
            eprintln!("Failed to connect to server: {err}");
            eprintln!("Is quest-passer running with ipc_name '{}'?", args.ipc_name);
            std::process::exit(1);
        }
    }
}

/// Connect to the IPC socket, send a JSON command, and read the response.
fn send_ipc_command(
    ipc_name: &str,
    request: &serde_json::Value,
) -> std::result::Result<serde_json::Value, Box<dyn std::error::Error>> {
    let name = ipc_name.to_ns_name::<GenericNamespaced>()?;
    let mut stream = Stream::connect(name)?;

    let mut request_line = serde_json::to_string(request)?;
    request_line.push('\n');
    stream.write_all(request_line.as_bytes())?;
    stream.flush()?;

    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader.read_line(&mut response_line)?;

    let response: serde_json::Value = serde_json::from_str(response_line.trim())?;
    Ok(response)
}
