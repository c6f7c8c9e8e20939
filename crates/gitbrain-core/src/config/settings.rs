use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use git2::Config;

use crate::error::CoreError;
use crate::model::Role;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_PEER: &str = "monitor";
pub const DEFAULT_HOME: &str = ".GitBrain";

/// Which mailbox backend an agent talks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    File,
    Worktree,
    Cache,
    Tracker,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::File => "file",
            TransportKind::Worktree => "worktree",
            TransportKind::Cache => "cache",
            TransportKind::Tracker => "tracker",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(TransportKind::File),
            "worktree" => Ok(TransportKind::Worktree),
            "cache" => Ok(TransportKind::Cache),
            "tracker" => Ok(TransportKind::Tracker),
            other => Err(CoreError::Config(format!("unknown transport: {other}"))),
        }
    }
}

/// Explicit per-agent configuration. Components take the pieces they need
/// as constructor arguments; nothing reads the process environment.
#[derive(Debug, Clone, PartialEq)]
pub struct GitBrainConfig {
    pub ai_name: String,
    pub role: Role,
    pub peer: String,
    /// Root of the shared mailbox and knowledge tree.
    pub home: PathBuf,
    pub transport: TransportKind,
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    pub auto_heartbeat: bool,
}

impl GitBrainConfig {
    /// Read config from the repo's .git/config [gitbrain] section.
    pub fn load(config: &Config) -> Result<Self, CoreError> {
        let defaults = Self::default_init();
        let role = match config.get_string("gitbrain.role") {
            Ok(role) => role.parse()?,
            Err(_) => defaults.role,
        };
        let transport = match config.get_string("gitbrain.transport") {
            Ok(kind) => kind.parse()?,
            Err(_) => defaults.transport,
        };
        Ok(Self {
            ai_name: config
                .get_string("gitbrain.aiName")
                .unwrap_or_else(|_| role.to_string()),
            role,
            peer: config
                .get_string("gitbrain.peer")
                .unwrap_or(defaults.peer),
            home: config
                .get_path("gitbrain.home")
                .unwrap_or(defaults.home),
            transport,
            poll_interval: read_millis(config, "gitbrain.pollIntervalMs")?
                .unwrap_or(defaults.poll_interval),
            heartbeat_interval: read_millis(config, "gitbrain.heartbeatIntervalMs")?
                .unwrap_or(defaults.heartbeat_interval),
            auto_heartbeat: config
                .get_bool("gitbrain.autoHeartbeat")
                .unwrap_or(defaults.auto_heartbeat),
        })
    }

    /// Write config to the repo's .git/config [gitbrain] section.
    pub fn save(&self, config: &mut Config) -> Result<(), CoreError> {
        config.set_str("gitbrain.aiName", &self.ai_name)?;
        config.set_str("gitbrain.role", self.role.as_str())?;
        config.set_str("gitbrain.peer", &self.peer)?;
        config.set_str("gitbrain.home", &self.home.to_string_lossy())?;
        config.set_str("gitbrain.transport", self.transport.as_str())?;
        config.set_i64(
            "gitbrain.pollIntervalMs",
            self.poll_interval.as_millis() as i64,
        )?;
        config.set_i64(
            "gitbrain.heartbeatIntervalMs",
            self.heartbeat_interval.as_millis() as i64,
        )?;
        config.set_bool("gitbrain.autoHeartbeat", self.auto_heartbeat)?;
        Ok(())
    }

    /// Default config for `gitbrain init`.
    pub fn default_init() -> Self {
        Self {
            ai_name: Role::Coder.to_string(),
            role: Role::Coder,
            peer: DEFAULT_PEER.to_string(),
            home: PathBuf::from(DEFAULT_HOME),
            transport: TransportKind::File,
            poll_interval: DEFAULT_POLL_INTERVAL,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            auto_heartbeat: true,
        }
    }

    /// Directory of the file mailbox.
    pub fn mailbox_dir(&self) -> PathBuf {
        self.home.join("Messages")
    }

    /// Directory of the shared worktree mailbox.
    pub fn worktree_dir(&self) -> PathBuf {
        self.home.join("Worktree")
    }
}

fn read_millis(config: &Config, key: &str) -> Result<Option<Duration>, CoreError> {
    match config.get_i64(key) {
        Ok(ms) if ms > 0 => Ok(Some(Duration::from_millis(ms as u64))),
        Ok(ms) => Err(CoreError::Config(format!("{key} must be positive, got {ms}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scratch_config(tmp: &TempDir) -> Config {
        let path = tmp.path().join("config");
        std::fs::write(&path, "").unwrap();
        Config::open(&path).unwrap()
    }

    #[test]
    fn test_save_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut config = scratch_config(&tmp);

        let settings = GitBrainConfig {
            ai_name: "claude-overseer".into(),
            role: Role::Overseer,
            peer: "coder".into(),
            home: PathBuf::from("/srv/gitbrain"),
            transport: TransportKind::Worktree,
            poll_interval: Duration::from_millis(250),
            heartbeat_interval: Duration::from_secs(10),
            auto_heartbeat: false,
        };
        settings.save(&mut config).unwrap();

        let loaded = GitBrainConfig::load(&scratch_reopen(&tmp)).unwrap();
        assert_eq!(loaded, settings);
    }

    fn scratch_reopen(tmp: &TempDir) -> Config {
        Config::open(&tmp.path().join("config")).unwrap()
    }

    #[test]
    fn test_load_empty_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = scratch_config(&tmp);
        let loaded = GitBrainConfig::load(&config).unwrap();
        assert_eq!(loaded, GitBrainConfig::default_init());
        assert_eq!(loaded.mailbox_dir(), PathBuf::from(".GitBrain/Messages"));
    }

    #[test]
    fn test_rejects_unknown_transport() {
        let tmp = TempDir::new().unwrap();
        let mut config = scratch_config(&tmp);
        config.set_str("gitbrain.transport", "carrier-pigeon").unwrap();
        assert!(matches!(
            GitBrainConfig::load(&config),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let tmp = TempDir::new().unwrap();
        let mut config = scratch_config(&tmp);
        config.set_i64("gitbrain.pollIntervalMs", 0).unwrap();
        assert!(GitBrainConfig::load(&config).is_err());
    }
}
