use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::core::config::SessionConfig;
use crate::core::lobby::Role;
use crate::core::network::WireFormat;

#[derive(Parser, Debug)]
#[command(name = "lanterm-gomoku")]
#[command(about = "Five-in-a-row for two terminals over one TCP connection")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub options: SessionOptions,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Host a game and wait for one opponent (you play X and move first)
    Host {
        /// Address to listen on (e.g., "0.0.0.0:4000")
        #[arg(short, long, default_value = "0.0.0.0:4000")]
        addr: String,
    },
    /// Join a hosted game (you play O)
    Join {
        /// Host address to connect to (e.g., "127.0.0.1:4000")
        addr: String,
    },
}

impl Commands {
    pub fn role(&self) -> Role {
        match self {
            Commands::Host { .. } => Role::Host,
            Commands::Join { .. } => Role::Guest,
        }
    }
}

/// Session tunables shared by both subcommands.
#[derive(Args, Debug)]
pub struct SessionOptions {
    /// Redraw tick in milliseconds
    #[arg(long, global = true, env = "GOMOKU_TICK_MS", default_value_t = 100)]
    pub tick_ms: u64,

    /// Framing on the wire; both sides must agree
    #[arg(long, global = true, env = "GOMOKU_WIRE", value_enum, default_value_t = WireFormat::Json)]
    pub wire: WireFormat,

    /// Seconds to wait for the host when joining
    #[arg(long, global = true, env = "GOMOKU_CONNECT_TIMEOUT", default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Milliseconds a finished game waits for its last messages to leave
    #[arg(long, global = true, env = "GOMOKU_LINGER_MS", default_value_t = 500)]
    pub linger_ms: u64,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, env = "GOMOKU_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, env = "GOMOKU_LOG", default_value = "warn")]
    pub log_level: String,
}

impl SessionOptions {
    pub fn to_config(&self) -> SessionConfig {
        SessionConfig {
            tick_interval: Duration::from_millis(self.tick_ms.max(1)),
            wire: self.wire,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            linger: Duration::from_millis(self.linger_ms),
            ..SessionConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_defaults() {
        let cli = Cli::try_parse_from(["lanterm-gomoku", "host"]).unwrap();
        assert!(matches!(&cli.command, Commands::Host { addr } if addr == "0.0.0.0:4000"));
        assert_eq!(cli.command.role(), Role::Host);

        let config = cli.options.to_config();
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.wire, WireFormat::Json);
        assert_eq!(config.chat_capacity, SessionConfig::default().chat_capacity);
    }

    #[test]
    fn join_with_overrides() {
        let cli = Cli::try_parse_from([
            "lanterm-gomoku",
            "join",
            "10.0.0.2:4000",
            "--wire",
            "postcard",
            "--tick-ms",
            "50",
        ])
        .unwrap();
        assert!(matches!(&cli.command, Commands::Join { addr } if addr == "10.0.0.2:4000"));
        assert_eq!(cli.command.role(), Role::Guest);
        let config = cli.options.to_config();
        assert_eq!(config.wire, WireFormat::Postcard);
        assert_eq!(config.tick_interval, Duration::from_millis(50));
    }

    #[test]
    fn join_requires_an_address() {
        assert!(Cli::try_parse_from(["lanterm-gomoku", "join"]).is_err());
    }
}
