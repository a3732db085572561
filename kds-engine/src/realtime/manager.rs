//! Realtime Connection Manager
//!
//! A single worker task owns all connection state and is driven by a
//! `select!` loop over commands, the retry deadline, the health-check
//! interval, incoming feed events, and shutdown:
//!
//! ```text
//! RealtimeManager (handle, Clone)
//!     │ mpsc commands                 broadcast events
//!     ▼                                    ▲
//! worker task ── subscribe/ping ──► ChangeFeed
//!     │                                    │ mpsc sink
//!     └── invalidate tags ──► CacheService ┘
//! ```
//!
//! Accepted events first invalidate the derived cache tags, then fan out
//! to downstream subscribers, so no subscriber can read a view staler
//! than the event it was just told about.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use shared::util::now_millis;
use shared::ChangeEvent;

use crate::cache::{keys, CacheService};
use crate::core::{EngineError, EngineResult, RealtimeConfig};
use crate::store::{ChangeFeed, FeedTopic, SubscriptionId};

use super::dedup::DedupWindow;
use super::state::{retry_delay, CircuitBreaker, ConnectionState, ConnectionStatus};

/// Downstream event fan-out capacity
const EVENT_CHANNEL_CAPACITY: usize = 1024;
/// Buffer between the feed and the worker task
const FEED_BUFFER: usize = 256;

enum Command {
    Watch {
        topic: FeedTopic,
        reply: oneshot::Sender<EngineResult<()>>,
    },
    Reconnect {
        reply: oneshot::Sender<EngineResult<()>>,
    },
}

/// Handle to the connection manager; cheap to clone.
#[derive(Clone)]
pub struct RealtimeManager {
    cmd_tx: mpsc::Sender<Command>,
    state: Arc<RwLock<ConnectionState>>,
    event_tx: broadcast::Sender<ChangeEvent>,
}

impl RealtimeManager {
    /// Spawn the worker task; `shutdown` tears it down.
    pub fn start(
        feed: Arc<dyn ChangeFeed>,
        cache: CacheService,
        config: RealtimeConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = Arc::new(RwLock::new(ConnectionState::new()));

        let worker = Worker {
            feed,
            cache,
            config,
            state: Arc::clone(&state),
            event_tx: event_tx.clone(),
            shutdown,
        };
        tokio::spawn(worker.run(cmd_rx));

        Self {
            cmd_tx,
            state,
            event_tx,
        }
    }

    /// Subscribe the engine to a feed topic.
    ///
    /// Fails fast with [`EngineError::CircuitOpen`] while the breaker is
    /// open; a transient failure is returned but the worker keeps
    /// retrying in the background.
    pub async fn watch(&self, topic: FeedTopic) -> EngineResult<()> {
        self.send(|reply| Command::Watch { topic, reply }).await
    }

    /// Manual reconnect: resets the retry counter and resubscribes
    /// every watched topic.
    pub async fn reconnect(&self) -> EngineResult<()> {
        self.send(|reply| Command::Reconnect { reply }).await
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.read().status
    }

    pub fn state(&self) -> ConnectionState {
        self.state.read().clone()
    }

    /// Deduplicated change events; a lagging consumer skips ahead.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ChangeEvent> {
        self.event_tx.subscribe()
    }

    async fn send(
        &self,
        make: impl FnOnce(oneshot::Sender<EngineResult<()>>) -> Command,
    ) -> EngineResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(make(reply_tx))
            .await
            .map_err(|_| EngineError::store("connection manager stopped"))?;
        reply_rx
            .await
            .map_err(|_| EngineError::store("connection manager stopped"))?
    }
}

struct Worker {
    feed: Arc<dyn ChangeFeed>,
    cache: CacheService,
    config: RealtimeConfig,
    state: Arc<RwLock<ConnectionState>>,
    event_tx: broadcast::Sender<ChangeEvent>,
    shutdown: CancellationToken,
}

impl Worker {
    async fn run(self, mut cmd_rx: mpsc::Receiver<Command>) {
        tracing::info!("Realtime connection manager started");

        let (feed_tx, mut feed_rx) = mpsc::channel::<ChangeEvent>(FEED_BUFFER);
        let mut desired: Vec<FeedTopic> = Vec::new();
        let mut live: HashMap<FeedTopic, SubscriptionId> = HashMap::new();
        let mut breaker = CircuitBreaker::new(&self.config);
        let mut dedup = DedupWindow::new(self.config.dedup_window);
        let mut retry_deadline: Option<Instant> = None;

        let mut health = tokio::time::interval(self.config.health_check_interval);
        health.tick().await; // skip immediate tick

        loop {
            let sleep_until =
                retry_deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    self.teardown(&mut live).await;
                    break;
                }

                Some(cmd) = cmd_rx.recv() => match cmd {
                    Command::Watch { topic, reply } => {
                        if !desired.contains(&topic) {
                            desired.push(topic);
                        }
                        self.connect_all(&feed_tx, &desired, &mut live, &mut breaker, &mut retry_deadline)
                            .await;
                        let result = if live.contains_key(&topic) {
                            Ok(())
                        } else if let Some(open_until) = breaker.open_until() {
                            Err(EngineError::CircuitOpen { open_until })
                        } else {
                            Err(EngineError::store(format!(
                                "subscription to {topic} failed; retrying in background"
                            )))
                        };
                        let _ = reply.send(result);
                    }
                    Command::Reconnect { reply } => {
                        tracing::info!("Manual reconnect requested");
                        self.state.write().retry_attempts = 0;
                        retry_deadline = None;
                        self.drop_subscriptions(&mut live).await;
                        self.connect_all(&feed_tx, &desired, &mut live, &mut breaker, &mut retry_deadline)
                            .await;
                        let result = if desired.len() == live.len() {
                            Ok(())
                        } else if let Some(open_until) = breaker.open_until() {
                            Err(EngineError::CircuitOpen { open_until })
                        } else {
                            Err(EngineError::store("reconnect failed; retrying in background"))
                        };
                        let _ = reply.send(result);
                    }
                },

                _ = tokio::time::sleep_until(sleep_until), if retry_deadline.is_some() => {
                    retry_deadline = None;
                    self.connect_all(&feed_tx, &desired, &mut live, &mut breaker, &mut retry_deadline)
                        .await;
                }

                _ = health.tick() => {
                    if self.state.read().status == ConnectionStatus::Connected {
                        if let Err(e) = self.feed.ping().await {
                            tracing::warn!(error = %e, "Health check failed, resubscribing all topics");
                            self.drop_subscriptions(&mut live).await;
                            self.transition(ConnectionStatus::Reconnecting);
                            self.connect_all(&feed_tx, &desired, &mut live, &mut breaker, &mut retry_deadline)
                                .await;
                        }
                    }
                }

                Some(event) = feed_rx.recv() => {
                    if !dedup.accept(event.record_id()) {
                        tracing::debug!(record_id = %event.record_id(), "Duplicate event dropped");
                        continue;
                    }
                    // invalidate before fan-out: subscribers must never
                    // read a view staler than the event they just saw
                    self.cache.invalidate_by_tags(&keys::tags_for_event(&event));
                    let _ = self.event_tx.send(event);
                }
            }
        }

        tracing::info!("Realtime connection manager stopped");
    }

    /// Subscribe every desired topic not currently live.
    ///
    /// All-success connects the manager and closes the breaker; any
    /// failure schedules a backoff retry, or parks the manager in
    /// `Failed` once the attempt budget is spent.
    async fn connect_all(
        &self,
        feed_tx: &mpsc::Sender<ChangeEvent>,
        desired: &[FeedTopic],
        live: &mut HashMap<FeedTopic, SubscriptionId>,
        breaker: &mut CircuitBreaker,
        retry_deadline: &mut Option<Instant>,
    ) {
        if desired.is_empty() {
            return;
        }
        if let Err(open_until) = breaker.check() {
            tracing::warn!(open_until, "Circuit open, subscription attempt rejected");
            let wait = (open_until - now_millis()).max(0) as u64;
            *retry_deadline = Some(Instant::now() + Duration::from_millis(wait));
            return;
        }

        self.transition(ConnectionStatus::Connecting);

        let mut failed = false;
        for topic in desired {
            if live.contains_key(topic) {
                continue;
            }
            let attempt = tokio::time::timeout(
                self.config.subscribe_timeout,
                self.feed.subscribe(*topic, feed_tx.clone()),
            )
            .await;
            match attempt {
                Ok(Ok(id)) => {
                    tracing::debug!(topic = %topic, subscription_id = id, "Subscribed");
                    live.insert(*topic, id);
                }
                Ok(Err(e)) => {
                    tracing::warn!(topic = %topic, error = %e, "Subscribe failed");
                    breaker.record_failure();
                    failed = true;
                }
                Err(_) => {
                    tracing::warn!(topic = %topic, "Subscribe timed out");
                    breaker.record_failure();
                    failed = true;
                }
            }
        }

        if failed {
            self.schedule_retry(retry_deadline);
        } else {
            breaker.record_success();
            let mut state = self.state.write();
            state.retry_attempts = 0;
            state.last_connected_at = Some(now_millis());
            if state.status != ConnectionStatus::Connected {
                tracing::info!(from = ?state.status, "Connection status changed to CONNECTED");
                state.status = ConnectionStatus::Connected;
            }
            *retry_deadline = None;
        }
    }

    /// Count a failed round and either arm the backoff timer or give up.
    fn schedule_retry(&self, retry_deadline: &mut Option<Instant>) {
        let mut state = self.state.write();
        state.retry_attempts += 1;
        if state.retry_attempts >= self.config.max_retries {
            if state.status != ConnectionStatus::Failed {
                tracing::error!(
                    attempts = state.retry_attempts,
                    "Retry budget exhausted, giving up until manual reconnect"
                );
                state.status = ConnectionStatus::Failed;
            }
            *retry_deadline = None;
            return;
        }
        let delay = retry_delay(&self.config, state.retry_attempts);
        state.status = ConnectionStatus::Reconnecting;
        tracing::warn!(
            attempt = state.retry_attempts,
            max_retries = self.config.max_retries,
            delay_ms = delay.as_millis() as u64,
            "Connection attempt failed, retry scheduled"
        );
        *retry_deadline = Some(Instant::now() + delay);
    }

    fn transition(&self, status: ConnectionStatus) {
        let mut state = self.state.write();
        if state.status != status {
            tracing::info!(from = ?state.status, to = ?status, "Connection status changed");
            state.status = status;
        }
    }

    async fn drop_subscriptions(&self, live: &mut HashMap<FeedTopic, SubscriptionId>) {
        for (topic, id) in live.drain() {
            if let Err(e) = self.feed.unsubscribe(id).await {
                tracing::debug!(topic = %topic, error = %e, "Unsubscribe failed");
            }
        }
    }

    async fn teardown(&self, live: &mut HashMap<FeedTopic, SubscriptionId>) {
        self.drop_subscriptions(live).await;
        self.transition(ConnectionStatus::Disconnected);
    }
}
