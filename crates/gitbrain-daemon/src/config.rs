use std::path::PathBuf;
use std::time::Duration;

use gitbrain_core::config::settings::{
    DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_PEER, DEFAULT_POLL_INTERVAL,
};
use gitbrain_core::config::GitBrainConfig;
use gitbrain_core::model::Role;

#[derive(Debug, Clone, PartialEq)]
pub struct DaemonConfig {
    pub ai_name: String,
    pub role: Role,
    /// Recipient of heartbeats.
    pub peer: String,
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    pub auto_heartbeat: bool,
    /// When false the poll loop is not started; heartbeats still go out.
    pub process_messages: bool,
    /// Process-wide lock taken on start so only one daemon runs per file.
    pub lock_file: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn new(ai_name: impl Into<String>, role: Role) -> Self {
        Self {
            ai_name: ai_name.into(),
            role,
            peer: DEFAULT_PEER.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            auto_heartbeat: true,
            process_messages: true,
            lock_file: None,
        }
    }

    pub fn with_lock_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_file = Some(path.into());
        self
    }
}

impl From<&GitBrainConfig> for DaemonConfig {
    fn from(config: &GitBrainConfig) -> Self {
        Self {
            peer: config.peer.clone(),
            poll_interval: config.poll_interval,
            heartbeat_interval: config.heartbeat_interval,
            auto_heartbeat: config.auto_heartbeat,
            ..Self::new(config.ai_name.clone(), config.role)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DaemonConfig::new("claude", Role::Coder);
        assert_eq!(config.peer, "monitor");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert!(config.auto_heartbeat);
        assert!(config.process_messages);
        assert!(config.lock_file.is_none());
    }

    #[test]
    fn test_from_gitbrain_config() {
        let mut base = GitBrainConfig::default_init();
        base.ai_name = "reviewer".into();
        base.role = Role::Overseer;
        base.peer = "coder".into();
        base.poll_interval = Duration::from_millis(250);
        let config = DaemonConfig::from(&base);
        assert_eq!(config.ai_name, "reviewer");
        assert_eq!(config.role, Role::Overseer);
        assert_eq!(config.peer, "coder");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert!(config.process_messages);
    }
}
