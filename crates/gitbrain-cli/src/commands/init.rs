use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use git2::Repository;
use gitbrain_core::config::{GitBrainConfig, TransportKind};
use gitbrain_core::model::Role;
use gitbrain_core::repository::file::FileBrainStateRepository;
use gitbrain_core::BrainStateManager;
use gitbrain_mailbox::worktree::ensure_shared_worktree;
use gitbrain_mailbox::WorktreeMailbox;

use super::session::{runtime, Overrides, ENABLED_KEY};

/// Branch checked out in the shared mailbox worktree.
const MAILBOX_BRANCH: &str = "gitbrain/mailbox";

#[derive(Args)]
pub struct InitArgs {
    /// Force re-initialization
    #[arg(long)]
    pub force: bool,

    /// Who heartbeats are sent to (defaults to the other role)
    #[arg(long)]
    pub peer: Option<String>,

    /// Mailbox backend: file or worktree
    #[arg(long, default_value = "file")]
    pub transport: String,

    /// GitBrain home, relative to the working tree
    #[arg(long)]
    pub home: Option<PathBuf>,
}

pub fn run(args: &InitArgs, overrides: &Overrides) -> Result<()> {
    let repo = Repository::discover(".")
        .context("Not inside a Git repository. Run `git init` first.")?;
    let root = repo
        .workdir()
        .context("GitBrain needs a repository with a working tree")?
        .to_path_buf();
    let mut git_config = repo.config().context("Failed to open git config")?;

    if git_config.get_bool(ENABLED_KEY).unwrap_or(false) && !args.force {
        println!("GitBrain is already initialized in this repository.");
        println!("Use --force to re-initialize.");
        return Ok(());
    }

    let role: Role = match &overrides.role {
        Some(role) => role.parse().context("Invalid --role")?,
        None => Role::Coder,
    };
    let mut config = GitBrainConfig::default_init();
    config.role = role;
    config.ai_name = overrides
        .ai_name
        .clone()
        .unwrap_or_else(|| role.to_string());
    config.peer = args
        .peer
        .clone()
        .unwrap_or_else(|| role.counterpart().to_string());
    config.transport = args.transport.parse().context("Invalid --transport")?;
    if let Some(home) = &args.home {
        config.home = home.clone();
    }

    let home = root.join(&config.home);
    match config.transport {
        TransportKind::File => {
            for r in [Role::Coder, Role::Overseer] {
                let dir = root.join(config.mailbox_dir()).join(r.as_str());
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
        }
        TransportKind::Worktree => {
            let path = root.join(config.worktree_dir());
            let path = ensure_shared_worktree(&root, &path, MAILBOX_BRANCH)
                .context("Failed to set up the shared mailbox worktree (does HEAD have a commit?)")?;
            let mailbox = WorktreeMailbox::new(path);
            for r in [Role::Coder, Role::Overseer] {
                mailbox
                    .setup_role_directory(r.as_str())
                    .context("Failed to create mailbox directories")?;
            }
        }
        other => anyhow::bail!("The {other} transport cannot be initialized from the CLI"),
    }

    let brain = BrainStateManager::new(Arc::new(FileBrainStateRepository::new(&home)));
    runtime()?
        .block_on(brain.load_or_create(&config.ai_name, config.role))
        .context("Failed to create brain state")?;

    config
        .save(&mut git_config)
        .context("Failed to write [gitbrain] git config")?;
    git_config
        .set_bool(ENABLED_KEY, true)
        .context("Failed to write [gitbrain] git config")?;

    println!(
        "GitBrain initialized: {} as {} via the {} mailbox.",
        config.ai_name, config.role, config.transport
    );
    println!();
    println!("Next steps:");
    println!("  gitbrain send '{{\"type\":\"feedback\",...}}'   Message {}", config.peer);
    println!("  gitbrain inbox                              See what is waiting");
    println!("  gitbrain daemon                             Process messages until Ctrl-C");
    Ok(())
}
