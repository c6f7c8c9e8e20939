pub mod brain;
pub mod config;
pub mod error;
pub mod model;
pub mod plugin;
pub mod repository;
pub mod status;
pub mod validation;

pub use brain::BrainStateManager;
pub use error::CoreError;
