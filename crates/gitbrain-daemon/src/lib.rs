//! A per-agent daemon: a poll loop that dispatches received messages to a
//! [`MessageHandler`] and a heartbeat loop that reports liveness to a peer.

pub mod config;
pub mod daemon;
pub mod error;
pub mod handler;
pub mod lock;

pub use config::DaemonConfig;
pub use daemon::{Daemon, DaemonStatus, PollSummary};
pub use error::DaemonError;
pub use handler::MessageHandler;
