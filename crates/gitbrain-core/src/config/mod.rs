pub mod settings;

pub use settings::{GitBrainConfig, TransportKind};
