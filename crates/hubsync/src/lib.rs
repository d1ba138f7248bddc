use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod hub;
pub mod notify;
pub mod server;
pub mod service;
pub mod sync;
pub mod utils;

use crate::config::{compute_socket_path, load_config};
use crate::hub::Hub;

/// hubsync - keeps a configuration repository in sync and starts its service,
/// on command from a local socket.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
  /// Extra config file merged over the defaults and the global config
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
  /// Run the command server in the foreground
  Serve,
  /// Send one command (pull, push, emacs) to a running server
  Send { command: String },
}

pub fn parse() -> Cli {
  Cli::parse()
}

pub fn run() -> Result<()> {
  let cli = parse();

  match cli.command {
    Commands::Serve => {
      let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .try_init();
      let cfg = load_config(cli.config.as_deref())?;
      let socket = compute_socket_path(&cfg);
      let hub = Hub::from_config(&cfg);
      match server::start(&socket, &hub)? {}
    }
    Commands::Send { command } => {
      let cfg = load_config(cli.config.as_deref())?;
      client::send_command(&compute_socket_path(&cfg), &command)?;
    }
  }

  Ok(())
}
