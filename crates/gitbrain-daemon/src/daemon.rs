use std::sync::Arc;
use std::time::Duration;

use gitbrain_core::model::{
    Content, HeartbeatMessage, HeartbeatStatus, Message, MessageKind, Payload, Priority, Role,
    Value,
};
use gitbrain_core::BrainStateManager;
use gitbrain_mailbox::Mailbox;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::DaemonConfig;
use crate::error::DaemonError;
use crate::handler::{dispatch, MessageHandler};
use crate::lock::DaemonLock;

/// Brain state key read into each heartbeat.
pub const CURRENT_TASK_KEY: &str = "current_task";

/// Snapshot returned by [`Daemon::status`].
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonStatus {
    pub ai_name: String,
    pub role: Role,
    pub is_running: bool,
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
}

/// Outcome of one poll tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub dispatched: usize,
    pub failed: usize,
}

struct Shared {
    config: DaemonConfig,
    mailbox: Mailbox,
    handler: Arc<dyn MessageHandler>,
    brain: Option<BrainStateManager>,
}

struct RunningLoops {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    _lock: Option<DaemonLock>,
}

/// Drives one agent's mailbox. `start` spawns the poll and heartbeat loops;
/// `stop` signals them and waits for the tick in progress to finish.
pub struct Daemon {
    shared: Arc<Shared>,
    running: Mutex<Option<RunningLoops>>,
}

impl Daemon {
    pub fn new(config: DaemonConfig, mailbox: Mailbox, handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                mailbox,
                handler,
                brain: None,
            }),
            running: Mutex::new(None),
        }
    }

    /// Attach brain state, used for heartbeat context and the
    /// `*_brain_state` accessors. Must be called before `start`.
    pub fn with_brain_state(mut self, manager: BrainStateManager) -> Self {
        match Arc::get_mut(&mut self.shared) {
            Some(shared) => shared.brain = Some(manager),
            None => tracing::warn!("Ignoring brain state attached to a started daemon"),
        }
        self
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.shared.config
    }

    pub async fn start(&self) -> Result<(), DaemonError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(DaemonError::AlreadyRunning);
        }
        let config = &self.shared.config;
        if config.process_messages && config.poll_interval.is_zero() {
            return Err(DaemonError::ConfigurationError(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        if config.auto_heartbeat && config.heartbeat_interval.is_zero() {
            return Err(DaemonError::ConfigurationError(
                "heartbeat_interval must be greater than zero".to_string(),
            ));
        }
        let lock = config
            .lock_file
            .as_deref()
            .map(DaemonLock::acquire)
            .transpose()?;
        if let Some(brain) = &self.shared.brain {
            // Dropping `lock` on error releases it.
            brain.load_or_create(&config.ai_name, config.role).await?;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();
        if config.process_messages {
            tasks.push(tokio::spawn(poll_loop(
                self.shared.clone(),
                shutdown_rx.clone(),
            )));
        }
        if config.auto_heartbeat {
            tasks.push(tokio::spawn(heartbeat_loop(self.shared.clone(), shutdown_rx)));
        }
        *running = Some(RunningLoops {
            shutdown,
            tasks,
            _lock: lock,
        });
        tracing::info!(
            ai_name = %config.ai_name,
            role = %config.role,
            "Daemon started"
        );
        Ok(())
    }

    /// Signal both loops and wait for them. The run slot stays locked until
    /// they have finished, so a concurrent `start` cannot overlap a tick.
    pub async fn stop(&self) -> Result<(), DaemonError> {
        let mut running = self.running.lock().await;
        let loops = running.take().ok_or(DaemonError::NotRunning)?;
        let _ = loops.shutdown.send(true);
        for task in loops.tasks {
            if let Err(e) = task.await {
                tracing::warn!("Daemon loop ended abnormally: {e}");
            }
        }
        drop(loops._lock);
        drop(running);
        tracing::info!(ai_name = %self.shared.config.ai_name, "Daemon stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    pub async fn status(&self) -> DaemonStatus {
        let config = &self.shared.config;
        DaemonStatus {
            ai_name: config.ai_name.clone(),
            role: config.role,
            is_running: self.is_running().await,
            poll_interval: config.poll_interval,
            heartbeat_interval: config.heartbeat_interval,
        }
    }

    /// Run a single poll tick now, independent of the loops.
    pub async fn poll_once(&self) -> PollSummary {
        self.shared.poll().await
    }

    pub async fn send_heartbeat(&self) -> Result<(), DaemonError> {
        self.shared.heartbeat().await
    }

    pub async fn update_brain_state(&self, key: &str, value: Value) -> Result<(), DaemonError> {
        let brain = self.shared.brain_manager()?;
        let ai_name = &self.shared.config.ai_name;
        if !brain.update_key(ai_name, key, value).await? {
            return Err(DaemonError::DatabaseError(format!(
                "no brain state for {ai_name}"
            )));
        }
        Ok(())
    }

    pub async fn brain_state_value(&self, key: &str) -> Result<Option<Value>, DaemonError> {
        let brain = self.shared.brain_manager()?;
        Ok(brain.get_key(&self.shared.config.ai_name, key).await?)
    }
}

impl Shared {
    fn brain_manager(&self) -> Result<&BrainStateManager, DaemonError> {
        self.brain.as_ref().ok_or_else(|| {
            DaemonError::ConfigurationError("no brain state manager attached".into())
        })
    }

    async fn report(&self, error: anyhow::Error) {
        tracing::error!(ai_name = %self.config.ai_name, "{error:#}");
        self.handler.on_error(&error).await;
    }

    async fn poll(&self) -> PollSummary {
        let mut summary = PollSummary::default();
        let messages = match self.mailbox.receive().await {
            Ok(messages) => messages,
            Err(e) => {
                self.report(anyhow::Error::new(e).context("receiving messages"))
                    .await;
                summary.failed += 1;
                return summary;
            }
        };

        let mut decoded: Vec<(Payload, Message)> = Vec::with_capacity(messages.len());
        for message in messages {
            match message.payload() {
                Ok(payload) => decoded.push((payload, message)),
                Err(e) => {
                    summary.failed += 1;
                    let context = format!("decoding message {} from {}", message.id(), message.from());
                    self.report(anyhow::Error::new(e).context(context)).await;
                    // Reported once; left in place it would come back every tick.
                    tracing::warn!(id = %message.id(), "Dropping undecodable message");
                    if let Err(e) = self.mailbox.acknowledge(&message).await {
                        let context = format!("dropping message {}", message.id());
                        self.report(anyhow::Error::new(e).context(context)).await;
                    }
                }
            }
        }
        // Stable, so each kind keeps the transport's oldest-first order.
        decoded.sort_by_key(|(payload, _)| dispatch_rank(payload.kind()));

        for (payload, message) in decoded {
            let kind = payload.kind();
            tracing::debug!(kind = %kind, id = %message.id(), "Dispatching");
            if let Err(e) = dispatch(self.handler.as_ref(), payload).await {
                summary.failed += 1;
                let context = format!("handling {kind} message {}", message.id());
                self.report(e.context(context)).await;
                continue;
            }
            summary.dispatched += 1;
            if let Err(e) = self.mailbox.acknowledge(&message).await {
                let context = format!("acknowledging message {}", message.id());
                self.report(anyhow::Error::new(e).context(context)).await;
            }
        }
        if summary.dispatched > 0 || summary.failed > 0 {
            tracing::debug!(
                dispatched = summary.dispatched,
                failed = summary.failed,
                "Poll tick done"
            );
        }
        summary
    }

    async fn heartbeat(&self) -> Result<(), DaemonError> {
        let current_task = match &self.brain {
            Some(brain) => brain
                .get_key(&self.config.ai_name, CURRENT_TASK_KEY)
                .await?
                .and_then(|v| v.as_str().map(str::to_string)),
            None => None,
        };
        let metadata = Content::new()
            .with("ai_name", self.config.ai_name.as_str())
            .with("role", self.config.role.as_str());
        let payload = Payload::Heartbeat(HeartbeatMessage {
            status: HeartbeatStatus::Active,
            current_task,
            metadata: Some(metadata),
        });
        self.mailbox
            .send(&self.config.peer, &payload, Priority::Low)
            .await?;
        tracing::debug!(ai_name = %self.config.ai_name, peer = %self.config.peer, "Heartbeat sent");
        Ok(())
    }
}

fn dispatch_rank(kind: MessageKind) -> usize {
    MessageKind::DISPATCH_ORDER
        .iter()
        .position(|k| *k == kind)
        .unwrap_or(MessageKind::DISPATCH_ORDER.len())
}

async fn poll_loop(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(shared.config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                shared.poll().await;
            }
        }
    }
    tracing::debug!("Poll loop stopped");
}

async fn heartbeat_loop(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(shared.config.heartbeat_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if let Err(e) = shared.heartbeat().await {
                    shared.report(anyhow::Error::new(e).context("sending heartbeat")).await;
                }
            }
        }
    }
    tracing::debug!("Heartbeat loop stopped");
}
