//! Session orchestrator - registry, tick loops and the control surface
//!
//! Each running session gets one tokio task:
//!
//! ```text
//!   interval ──tick──► lock session ──► step() ──► encode ──► unlock
//!      ▲                                                        │
//!      │                                      persist (timeout + retries)
//!      └──────────────── until Ended or shutdown signal ◄───────┘
//! ```
//!
//! Control operations take the same per-session lock, so ticks, agent trades
//! and user actions never interleave. A failing store only costs durability:
//! the loop logs and keeps ticking.

use banana_core::{AgentId, SessionId, Side, UserId};
use banana_execution::Fill;
use banana_ports::{Clock, SessionStore, StrategySupplier, TransactionRecorder};
use banana_strategy::{AgentSummary, Strategy, StrategyKind, register_custom};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::SessionConfig;
use crate::error::{Result, RunnerError};
use crate::session::{LeaderboardEntry, Session, SessionReport, SessionStatus, UserAccount};
use crate::snapshot::{self, SessionSnapshot};

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

/// Timeout and retry budget for snapshot writes
#[derive(Debug, Clone, Copy)]
struct PersistPolicy {
    timeout: Duration,
    retries: u32,
}

impl PersistPolicy {
    fn from_config(config: &SessionConfig) -> Self {
        Self {
            timeout: config.persist_timeout(),
            retries: config.persist_retries,
        }
    }
}

/// Outcome of a bot purchase
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseReceipt {
    pub agent_id: AgentId,
    /// Kind the bot actually runs (random when custom code was rejected)
    pub kind: StrategyKind,
    pub fallback_reason: Option<String>,
}

/// Runs any number of independent sessions
pub struct SessionOrchestrator {
    sessions: Arc<DashMap<SessionId, SessionEntry>>,
    store: Arc<dyn SessionStore>,
    recorder: Arc<dyn TransactionRecorder>,
    clock: Arc<dyn Clock>,
    supplier: Option<Arc<dyn StrategySupplier>>,
}

impl SessionOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        recorder: Arc<dyn TransactionRecorder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            store,
            recorder,
            clock,
            supplier: None,
        }
    }

    /// Generator used for custom bots; without one they fall back to random
    pub fn with_supplier(mut self, supplier: Arc<dyn StrategySupplier>) -> Self {
        self.supplier = Some(supplier);
        self
    }

    /// Create a session with a fresh id and start ticking it
    pub async fn start_session(&self, config: SessionConfig) -> Result<SessionId> {
        let id = SessionId::generate();
        self.start_session_with_id(id.clone(), config).await?;
        Ok(id)
    }

    pub async fn start_session_with_id(&self, id: SessionId, config: SessionConfig) -> Result<()> {
        if self.is_running(&id).await {
            return Err(RunnerError::SessionAlreadyRunning(id));
        }
        let session = Session::new(id.clone(), config, self.recorder.clone(), self.clock.clone())?;
        log::info!(
            "[{}] Session started: {} ticks every {} ms, price {}",
            id,
            session.config().duration_ticks,
            session.config().tick_interval_ms,
            session.config().market.initial_price
        );
        let policy = PersistPolicy::from_config(session.config());
        if let Ok(snapshot) = snapshot::encode(&session) {
            persist(self.store.as_ref(), &snapshot, policy).await;
        }
        self.spawn(session);
        Ok(())
    }

    fn spawn(&self, session: Session) {
        let id = session.id().clone();
        let interval = session.config().tick_interval();
        let policy = PersistPolicy::from_config(session.config());
        let session = Arc::new(Mutex::new(session));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_loop(
            id.clone(),
            session.clone(),
            self.store.clone(),
            interval,
            policy,
            shutdown_rx,
        ));

        self.sessions.insert(
            id,
            SessionEntry {
                session,
                shutdown,
                task: Some(task),
            },
        );
    }

    fn session(&self, id: &SessionId) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .get(id)
            .map(|e| e.session.clone())
            .ok_or_else(|| RunnerError::SessionNotFound(id.clone()))
    }

    async fn is_running(&self, id: &SessionId) -> bool {
        match self.session(id) {
            Ok(session) => session.lock().await.is_running(),
            Err(_) => false,
        }
    }

    /// Cancel the tick loop, mark the session stopped and persist it
    pub async fn stop_session(&self, id: &SessionId) -> Result<SessionReport> {
        let (session, task) = {
            let mut entry = self
                .sessions
                .get_mut(id)
                .ok_or_else(|| RunnerError::SessionNotFound(id.clone()))?;
            let _ = entry.shutdown.send(true);
            (entry.session.clone(), entry.task.take())
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                log::warn!("[{}] Tick loop ended abnormally: {}", id, e);
            }
        }

        let mut session = session.lock().await;
        if session.is_running() {
            session.set_status(SessionStatus::Stopped);
        }
        let policy = PersistPolicy::from_config(session.config());
        match snapshot::encode(&session) {
            Ok(snapshot) => {
                persist(self.store.as_ref(), &snapshot, policy).await;
            }
            Err(e) => log::warn!("[{}] Final snapshot failed: {}", id, e),
        }
        log::info!("[{}] Session stopped at tick {}", id, session.engine().tick_count());
        Ok(session.report())
    }

    /// Wait until a session's tick loop exits on its own
    pub async fn join(&self, id: &SessionId) -> Result<SessionReport> {
        let (session, task) = {
            let mut entry = self
                .sessions
                .get_mut(id)
                .ok_or_else(|| RunnerError::SessionNotFound(id.clone()))?;
            (entry.session.clone(), entry.task.take())
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                log::warn!("[{}] Tick loop ended abnormally: {}", id, e);
            }
        }
        let session = session.lock().await;
        Ok(session.report())
    }

    /// Load a persisted session and resume ticking where it left off
    pub async fn restore_session(&self, id: &SessionId) -> Result<SessionReport> {
        if self.is_running(id).await {
            return Err(RunnerError::SessionAlreadyRunning(id.clone()));
        }
        let decoded = snapshot::load(self.store.as_ref(), id)
            .await?
            .ok_or_else(|| RunnerError::SessionNotFound(id.clone()))?;

        let ended = decoded.status == SessionStatus::Ended;
        let status = if ended {
            SessionStatus::Ended
        } else {
            SessionStatus::Running
        };
        let session = Session::restore(
            decoded.session_id,
            decoded.config,
            decoded.market,
            decoded.agents,
            decoded.users,
            status,
            self.recorder.clone(),
            self.clock.clone(),
        )?;
        let report = session.report();
        log::info!(
            "[{}] Session restored at tick {} with {} agents",
            id,
            report.tick,
            session.agents().len()
        );

        if ended {
            let (shutdown, _) = watch::channel(true);
            self.sessions.insert(
                id.clone(),
                SessionEntry {
                    session: Arc::new(Mutex::new(session)),
                    shutdown,
                    task: None,
                },
            );
        } else {
            self.spawn(session);
        }
        Ok(report)
    }

    pub async fn status(&self, id: &SessionId) -> Result<SessionReport> {
        let session = self.session(id)?;
        let session = session.lock().await;
        Ok(session.report())
    }

    /// Reports for every known session
    pub async fn list_sessions(&self) -> Vec<SessionReport> {
        let sessions: Vec<_> = self.sessions.iter().map(|e| e.session.clone()).collect();
        let mut reports = Vec::with_capacity(sessions.len());
        for session in sessions {
            reports.push(session.lock().await.report());
        }
        reports.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        reports
    }

    pub async fn list_agents(&self, id: &SessionId) -> Result<Vec<AgentSummary>> {
        let session = self.session(id)?;
        let session = session.lock().await;
        Ok(session.list_agents())
    }

    pub async fn toggle_agent(&self, id: &SessionId, agent: &AgentId) -> Result<bool> {
        let session = self.session(id)?;
        let mut session = session.lock().await;
        session.toggle_agent(agent)
    }

    pub async fn user_trade(
        &self,
        id: &SessionId,
        user: &UserId,
        side: Side,
        amount: f64,
    ) -> Result<Fill> {
        let session = self.session(id)?;
        let mut session = session.lock().await;
        session.user_trade(user, side, amount)
    }

    pub async fn join_user(&self, id: &SessionId, user: UserId, name: &str) -> Result<UserAccount> {
        let session = self.session(id)?;
        let mut session = session.lock().await;
        Ok(session.join_user(user, name).clone())
    }

    pub async fn leave_user(&self, id: &SessionId, user: &UserId) -> Result<()> {
        let session = self.session(id)?;
        let mut session = session.lock().await;
        session.leave_user(user)
    }

    /// A user buys a bot of `kind` (kind names and storefront aliases)
    ///
    /// Custom bots are generated from `description` by the supplier, outside
    /// the session lock. Rejected or missing code yields a random bot.
    pub async fn purchase_agent(
        &self,
        id: &SessionId,
        owner: &UserId,
        kind: &str,
        cost: f64,
        description: Option<&str>,
    ) -> Result<PurchaseReceipt> {
        let kind: StrategyKind = kind.parse()?;
        let session = self.session(id)?;

        let (strategy, fallback_reason) = if kind == StrategyKind::Custom {
            let description = description.unwrap_or_default();
            let generated = self.generate(id, description).await;
            let registration = register_custom(description, &generated);
            let reason = registration.fallback_reason.map(|e| e.to_string());
            (registration.strategy, reason)
        } else {
            (Strategy::default_for(kind), None)
        };

        let effective = strategy.kind();
        let mut session = session.lock().await;
        let agent_id = session.purchase_agent(owner, strategy, cost)?;
        Ok(PurchaseReceipt {
            agent_id,
            kind: effective,
            fallback_reason,
        })
    }

    async fn generate(&self, id: &SessionId, description: &str) -> String {
        let Some(supplier) = &self.supplier else {
            log::warn!("[{}] No strategy generator configured", id);
            return String::new();
        };
        match supplier.generate(description).await {
            Ok(code) => code,
            Err(e) => {
                log::warn!("[{}] Strategy generation failed: {}", id, e);
                String::new()
            }
        }
    }

    /// Add an unowned market bot with an explicit allocation
    pub async fn add_market_agent(
        &self,
        id: &SessionId,
        strategy: Strategy,
        currency: f64,
        coins: f64,
    ) -> Result<AgentId> {
        let session = self.session(id)?;
        let mut session = session.lock().await;
        Ok(session.add_market_agent(strategy, currency, coins))
    }

    pub async fn remove_agent(&self, id: &SessionId, agent: &AgentId) -> Result<()> {
        let session = self.session(id)?;
        let mut session = session.lock().await;
        session.remove_agent(agent).map(|_| ())
    }

    pub async fn leaderboard(&self, id: &SessionId) -> Result<Vec<LeaderboardEntry>> {
        let session = self.session(id)?;
        let session = session.lock().await;
        Ok(session.leaderboard())
    }

    /// Stop every running session
    pub async fn shutdown(&self) {
        let ids: Vec<_> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Err(e) = self.stop_session(&id).await {
                log::warn!("[{}] Shutdown failed: {}", id, e);
            }
        }
    }
}

async fn run_loop(
    id: SessionId,
    session: Arc<Mutex<Session>>,
    store: Arc<dyn SessionStore>,
    interval: Duration,
    policy: PersistPolicy,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick of an interval completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    log::debug!("[{}] Tick loop cancelled", id);
                    break;
                }
                continue;
            }
        }

        let (snapshot, finished) = {
            let mut session = session.lock().await;
            if let Some(step) = session.step() {
                log::debug!(
                    "[{}] tick {} price {:.4}: {} fills, {} rejected",
                    id,
                    step.market.tick,
                    step.market.price,
                    step.fills,
                    step.rejected
                );
            }
            (snapshot::encode(&session), !session.is_running())
        };

        match snapshot {
            Ok(snapshot) => {
                persist(store.as_ref(), &snapshot, policy).await;
            }
            Err(e) => log::warn!("[{}] Snapshot failed: {}", id, e),
        }

        if finished {
            log::info!("[{}] Tick loop finished", id);
            break;
        }
    }
}

/// Write a snapshot with a per-attempt timeout; failures are logged only
async fn persist(store: &dyn SessionStore, snapshot: &SessionSnapshot, policy: PersistPolicy) -> bool {
    for attempt in 0..=policy.retries {
        match tokio::time::timeout(policy.timeout, snapshot::save(store, snapshot)).await {
            Ok(Ok(())) => return true,
            Ok(Err(e)) => log::warn!(
                "[{}] Persist attempt {} failed: {}",
                snapshot.session_id,
                attempt + 1,
                e
            ),
            Err(_) => log::warn!(
                "[{}] Persist attempt {} timed out after {:?}",
                snapshot.session_id,
                attempt + 1,
                policy.timeout
            ),
        }
    }
    log::warn!("[{}] Snapshot not persisted; continuing in memory", snapshot.session_id);
    false
}
