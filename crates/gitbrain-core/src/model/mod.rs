pub mod brain_state;
pub mod kind;
pub mod message;
pub mod payload;
pub mod review;
pub mod value;

pub use brain_state::{BrainState, BrainStateId, Role, BRAIN_STATE_VERSION};
pub use kind::MessageKind;
pub use message::{DeliveryStatus, Message, MessageId, Priority};
pub use payload::{
    CodeMessage, FeedbackMessage, FeedbackType, HeartbeatMessage, HeartbeatStatus, Payload,
    ReviewMessage, ScoreMessage, TaskMessage, TaskType,
};
pub use review::{CommentSeverity, CommentType, GitFileReference, ReviewComment};
pub use value::{Content, Value};
