//! Mailbox transports: file-lock, shared worktree, repository cache and
//! external issue tracker, plus the [`Mailbox`] pipeline that validates and
//! transforms content around whichever one is injected.

pub mod cache;
pub mod error;
pub mod file;
pub mod mailbox;
pub mod tracker;
pub mod transport;
pub mod worktree;

pub use cache::CacheMailbox;
pub use error::{MailboxError, TransportError};
pub use file::FileMailbox;
pub use mailbox::{Delivery, Mailbox};
pub use tracker::TrackerMailbox;
pub use transport::{MailboxTransport, MessageLocation};
pub use worktree::WorktreeMailbox;
