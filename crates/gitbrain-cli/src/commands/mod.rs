pub mod clear;
pub mod count;
pub mod daemon;
pub mod inbox;
pub mod init;
pub mod migrate;
pub mod send;
pub mod session;
pub mod validate;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize GitBrain in the current Git repository
    Init(init::InitArgs),
    /// Send a message to the peer agent
    Send(send::SendArgs),
    /// List messages waiting for this agent
    Inbox(inbox::InboxArgs),
    /// Count messages waiting for this agent
    Count,
    /// Delete every message waiting for this agent
    Clear,
    /// Poll the mailbox and send heartbeats until interrupted
    Daemon(daemon::DaemonArgs),
    /// Copy knowledge and brain state between two GitBrain homes
    Migrate(migrate::MigrateArgs),
    /// Count what a GitBrain home holds
    Validate(validate::ValidateArgs),
}
