use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use git2::Repository;
use gitbrain_core::config::{GitBrainConfig, TransportKind};
use gitbrain_core::plugin::{MessageTransformPlugin, PluginPipeline};
use gitbrain_mailbox::{FileMailbox, Mailbox, MailboxTransport, WorktreeMailbox};
use tokio::runtime::Runtime;

pub const ENABLED_KEY: &str = "gitbrain.enabled";

/// Per-invocation overrides of the `[gitbrain]` git config.
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Act as this role instead of the configured one (coder or overseer)
    #[arg(long, global = true, env = "GITBRAIN_ROLE")]
    pub role: Option<String>,

    /// Agent name to use instead of the configured one
    #[arg(long, global = true, env = "GITBRAIN_AI_NAME")]
    pub ai_name: Option<String>,
}

impl Overrides {
    fn apply(&self, config: &mut GitBrainConfig) -> Result<()> {
        if let Some(role) = &self.role {
            config.role = role.parse().context("Invalid --role")?;
        }
        if let Some(name) = &self.ai_name {
            config.ai_name = name.clone();
        }
        Ok(())
    }
}

/// An initialized repository plus its resolved configuration.
pub struct Session {
    root: PathBuf,
    pub config: GitBrainConfig,
}

impl Session {
    pub fn discover(overrides: &Overrides) -> Result<Self> {
        let repo = Repository::discover(".")
            .context("Not inside a Git repository. Run `git init` first.")?;
        let root = repo
            .workdir()
            .context("GitBrain needs a repository with a working tree")?
            .to_path_buf();
        let git_config = repo.config().context("Failed to open git config")?;
        if !git_config.get_bool(ENABLED_KEY).unwrap_or(false) {
            anyhow::bail!("GitBrain is not initialized. Run `gitbrain init` first.");
        }
        let mut config =
            GitBrainConfig::load(&git_config).context("Invalid [gitbrain] section in git config")?;
        overrides.apply(&mut config)?;
        tracing::debug!(
            ai_name = %config.ai_name,
            role = %config.role,
            transport = %config.transport,
            "Loaded GitBrain config from {}",
            root.display()
        );
        Ok(Self { root, config })
    }

    /// The GitBrain home, resolved against the working tree when relative.
    pub fn home(&self) -> PathBuf {
        self.resolve(&self.config.home)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    pub fn transport(&self) -> Result<Arc<dyn MailboxTransport>> {
        match self.config.transport {
            TransportKind::File => Ok(Arc::new(FileMailbox::new(
                self.resolve(&self.config.mailbox_dir()),
            ))),
            TransportKind::Worktree => Ok(Arc::new(WorktreeMailbox::new(
                self.resolve(&self.config.worktree_dir()),
            ))),
            other => anyhow::bail!(
                "The {other} transport needs an external store; the CLI only drives file and worktree mailboxes"
            ),
        }
    }

    /// Mailbox for the configured role, stamping send and receive metadata.
    pub async fn mailbox(&self) -> Result<Mailbox> {
        let plugins = Arc::new(PluginPipeline::new());
        plugins
            .register(Arc::new(MessageTransformPlugin))
            .await
            .context("Failed to register message plugins")?;
        plugins
            .initialize_all()
            .await
            .context("Failed to initialize message plugins")?;
        Ok(Mailbox::new(self.config.role.as_str(), self.transport()?).with_plugins(plugins))
    }
}

pub fn runtime() -> Result<Runtime> {
    Runtime::new().context("Failed to create async runtime")
}
