pub mod core {
	pub mod config;
	pub mod error;
	pub mod lobby;
	pub mod network;
	pub mod renderer;
	pub mod shutdown;
	pub mod terminal;
}

pub mod cli;
pub mod engine;
pub mod games;

// Re-export for convenience
pub use crate::core::config::SessionConfig;
pub use crate::core::shutdown::Shutdown;
pub use crate::engine::{run_session, SessionOutcome, SessionReport};
