//! One game session: market, agents, users and the per-tick step
//!
//! A `Session` is plain synchronous state. The orchestrator owns it behind a
//! single lock, so every mutation for a session is serialized:
//!
//! ```text
//!   step()
//!     │
//!     ├─► MarketEngine::tick        shock, synthetic flow, append price
//!     ├─► shuffle agent order
//!     ├─► for each active agent:
//!     │      decide(history, price) ──► TradeExecutor (pool + wallets)
//!     └─► refloor pool
//! ```

use banana_core::{AgentId, SessionId, Side, TradeError, UserId, Wallet};
use banana_execution::{Counterparty, Fill, TradeExecutor};
use banana_market::{MarketEngine, MarketState, ShockTransition, TickReport, resume_seed};
use banana_ports::{Clock, TransactionRecorder};
use banana_strategy::{AgentSummary, Strategy, TradingAgent};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::SessionConfig;
use crate::error::{Result, RunnerError};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    /// Stopped from outside; can be restored
    Stopped,
    /// Ran for its full duration
    Ended,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Stopped => write!(f, "stopped"),
            SessionStatus::Ended => write!(f, "ended"),
        }
    }
}

/// A human player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    pub wallet: Wallet,
    /// Cleared when the user leaves; the wallet is kept
    pub active: bool,
}

/// Shock banner as shown to players
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockBanner {
    pub title: String,
    pub active: bool,
    pub positive: bool,
    /// 0 → 1 → 0 over the decay window
    pub intensity: f64,
}

/// Answer to a status query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub tick: u64,
    pub duration_ticks: u64,
    pub remaining_ticks: u64,
    pub price: f64,
    pub volatility: f64,
    pub currency_reserve: f64,
    pub coin_reserve: f64,
    /// Present once the shock has fired
    pub shock: Option<ShockBanner>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: UserId,
    pub name: String,
    pub currency: f64,
    pub coins: f64,
    /// `currency + coins * price`
    pub value: f64,
}

/// What one call to [`Session::step`] did
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub market: TickReport,
    pub fills: u32,
    /// Agent trades refused for lack of funds or holdings
    pub rejected: u32,
}

pub struct Session {
    id: SessionId,
    config: SessionConfig,
    engine: MarketEngine,
    agents: Vec<TradingAgent>,
    users: BTreeMap<UserId, UserAccount>,
    executor: TradeExecutor,
    status: SessionStatus,
    /// Agent ordering and decisions; separate from the market's generator
    rng: StdRng,
}

fn agent_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    }
}

impl Session {
    pub fn new(
        id: SessionId,
        config: SessionConfig,
        recorder: Arc<dyn TransactionRecorder>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let engine = MarketEngine::new(config.market.clone(), config.duration_ticks, config.seed)?;
        Ok(Self {
            executor: TradeExecutor::new(id.clone(), recorder, clock),
            rng: agent_rng(config.seed),
            id,
            config,
            engine,
            agents: Vec::new(),
            users: BTreeMap::new(),
            status: SessionStatus::Running,
        })
    }

    /// Rebuild a session from persisted parts
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: SessionId,
        config: SessionConfig,
        market: MarketState,
        agents: Vec<TradingAgent>,
        users: Vec<UserAccount>,
        status: SessionStatus,
        recorder: Arc<dyn TransactionRecorder>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let tick = market.series.tick();
        let engine = MarketEngine::restore(config.market.clone(), market, config.seed)?;
        Ok(Self {
            executor: TradeExecutor::new(id.clone(), recorder, clock),
            rng: agent_rng(config.seed.map(|seed| resume_seed(seed, tick))),
            id,
            config,
            engine,
            agents,
            users: users.into_iter().map(|u| (u.id.clone(), u)).collect(),
            status,
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> &MarketEngine {
        &self.engine
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn agents(&self) -> &[TradingAgent] {
        &self.agents
    }

    pub fn agent(&self, id: &AgentId) -> Option<&TradingAgent> {
        self.agents.iter().find(|a| &a.id == id)
    }

    pub fn users(&self) -> impl Iterator<Item = &UserAccount> {
        self.users.values()
    }

    pub fn user(&self, id: &UserId) -> Option<&UserAccount> {
        self.users.get(id)
    }

    /// Advance one tick and let every active agent act once
    ///
    /// Returns `None` without touching anything once the session is not
    /// running or has reached its duration.
    pub fn step(&mut self) -> Option<StepReport> {
        if !self.is_running() {
            return None;
        }
        if self.engine.is_finished() {
            self.status = SessionStatus::Ended;
            return None;
        }

        let market = self.engine.tick();
        match &market.shock {
            Some(ShockTransition::Triggered { title, signed_pct }) => log::debug!(
                "[{}] Shock '{}' at tick {} ({:+.1}%)",
                self.id,
                title,
                market.tick,
                signed_pct * 100.0
            ),
            Some(ShockTransition::Cleared { title }) => {
                log::debug!("[{}] Shock '{}' cleared", self.id, title)
            }
            None => {}
        }

        let price = market.price;
        let tick = market.tick;
        let mut order: Vec<usize> = (0..self.agents.len()).collect();
        order.shuffle(&mut self.rng);

        let (mut fills, mut rejected) = (0, 0);
        for idx in order {
            let agent = &mut self.agents[idx];
            if !agent.active {
                continue;
            }
            let decision = agent.decide(self.engine.series().prices(), price, &mut self.rng);
            let Some(side) = decision.side() else {
                continue;
            };

            let owner_wallet = match &agent.owner {
                Some(owner) => self.users.get_mut(owner).map(|u| &mut u.wallet),
                None => None,
            };
            let party = Counterparty::agent(agent.id.as_str(), &agent.name, &mut agent.wallet)
                .on_behalf_of(owner_wallet);

            match self
                .executor
                .execute(self.engine.pool_mut(), party, side, decision.amount, price, tick)
            {
                Ok(_) => fills += 1,
                Err(e) => {
                    log::debug!("[{}] {} skipped trade: {}", self.id, agent.id, e);
                    rejected += 1;
                }
            }
        }

        self.engine.refloor();
        if self.engine.is_finished() {
            self.status = SessionStatus::Ended;
            log::info!(
                "[{}] Session ended at tick {} (price {:.4})",
                self.id,
                tick,
                price
            );
        }

        Some(StepReport {
            market,
            fills,
            rejected,
        })
    }

    /// A user trades directly at the current price
    pub fn user_trade(&mut self, user_id: &UserId, side: Side, amount: f64) -> Result<Fill> {
        if !self.is_running() {
            return Err(RunnerError::SessionNotRunning(self.id.clone()));
        }
        let user = self
            .users
            .get_mut(user_id)
            .filter(|u| u.active)
            .ok_or_else(|| RunnerError::UserNotFound(user_id.clone()))?;

        let price = self.engine.current_price();
        let tick = self.engine.tick_count();
        let party = Counterparty::user(user.id.as_str(), &user.name, &mut user.wallet);
        let fill = self
            .executor
            .execute(self.engine.pool_mut(), party, side, amount, price, tick)?;
        Ok(fill)
    }

    /// Add a user with the starting allocation, or reactivate a returning one
    pub fn join_user(&mut self, user_id: UserId, name: impl Into<String>) -> &UserAccount {
        let starting = self.config.starting_user_currency;
        let name = name.into();
        let user = self
            .users
            .entry(user_id.clone())
            .or_insert_with(|| UserAccount {
                wallet: Wallet::new(user_id.as_str(), starting, 0.0),
                id: user_id,
                name: name.clone(),
                active: true,
            });
        user.active = true;
        user.name = name;
        user
    }

    pub fn leave_user(&mut self, user_id: &UserId) -> Result<()> {
        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| RunnerError::UserNotFound(user_id.clone()))?;
        user.active = false;
        Ok(())
    }

    /// Register an unowned agent with an explicit allocation
    pub fn add_market_agent(&mut self, strategy: Strategy, currency: f64, coins: f64) -> AgentId {
        let agent = TradingAgent::new(AgentId::generate(), None, strategy, currency, coins);
        self.add_agent(agent)
    }

    pub fn add_agent(&mut self, agent: TradingAgent) -> AgentId {
        log::info!(
            "[{}] Agent {} ({}) joined, personality {:.3}",
            self.id,
            agent.id,
            agent.kind(),
            agent.personality.value()
        );
        let id = agent.id.clone();
        self.agents.push(agent);
        id
    }

    /// A user buys a bot
    ///
    /// `cost` is debited from the owner; the bot starts with
    /// `bot_funding_fraction * cost` currency and no coin.
    pub fn purchase_agent(&mut self, owner: &UserId, strategy: Strategy, cost: f64) -> Result<AgentId> {
        if !cost.is_finite() || cost <= 0.0 {
            return Err(RunnerError::InvalidPurchase(format!("cost must be positive, got {}", cost)));
        }
        let user = self
            .users
            .get_mut(owner)
            .filter(|u| u.active)
            .ok_or_else(|| RunnerError::UserNotFound(owner.clone()))?;
        if !user.wallet.can_afford(cost) {
            return Err(TradeError::InsufficientFunds {
                required: cost,
                available: user.wallet.currency,
            }
            .into());
        }
        user.wallet.apply_delta(-cost, 0.0);

        let funding = cost * self.config.bot_funding_fraction;
        let agent = TradingAgent::new(AgentId::generate(), Some(owner.clone()), strategy, funding, 0.0);
        Ok(self.add_agent(agent))
    }

    pub fn remove_agent(&mut self, id: &AgentId) -> Result<TradingAgent> {
        let idx = self
            .agents
            .iter()
            .position(|a| &a.id == id)
            .ok_or_else(|| RunnerError::AgentNotFound(id.clone()))?;
        let agent = self.agents.remove(idx);
        log::info!("[{}] Agent {} removed", self.id, agent.id);
        Ok(agent)
    }

    /// Flip an agent's active flag, returning the new state
    pub fn toggle_agent(&mut self, id: &AgentId) -> Result<bool> {
        let agent = self
            .agents
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| RunnerError::AgentNotFound(id.clone()))?;
        let active = agent.toggle();
        log::info!(
            "[{}] Agent {} {}",
            self.id,
            id,
            if active { "activated" } else { "paused" }
        );
        Ok(active)
    }

    pub fn list_agents(&self) -> Vec<AgentSummary> {
        let price = self.engine.current_price();
        self.agents.iter().map(|a| a.summary(price)).collect()
    }

    /// Users ranked by mark-to-market value, best first
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let price = self.engine.current_price();
        let mut rows: Vec<_> = self
            .users
            .values()
            .map(|u| (u, u.wallet.value_at(price)))
            .collect();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1));
        rows.into_iter()
            .enumerate()
            .map(|(i, (u, value))| LeaderboardEntry {
                rank: i + 1,
                user_id: u.id.clone(),
                name: u.name.clone(),
                currency: u.wallet.currency,
                coins: u.wallet.coins,
                value,
            })
            .collect()
    }

    pub fn report(&self) -> SessionReport {
        let tick = self.engine.tick_count();
        let duration = self.engine.duration_ticks();
        let shock = self
            .engine
            .shock()
            .filter(|s| !s.is_pending())
            .map(|s| ShockBanner {
                title: s.title.clone(),
                active: s.triggered,
                positive: s.is_positive().unwrap_or(false),
                intensity: s.intensity(tick),
            });
        SessionReport {
            session_id: self.id.clone(),
            status: self.status,
            tick,
            duration_ticks: duration,
            remaining_ticks: duration.saturating_sub(tick),
            price: self.engine.current_price(),
            volatility: self.engine.volatility(),
            currency_reserve: self.engine.pool().currency_reserve,
            coin_reserve: self.engine.pool().coin_reserve,
            shock,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use banana_clock::FixedClock;
    use banana_market::ShockConfig;
    use banana_ports::NullRecorder;
    use banana_strategy::StrategyKind;

    fn config() -> SessionConfig {
        let mut config = SessionConfig {
            duration_ticks: 30,
            seed: Some(11),
            ..Default::default()
        };
        config.market.shock = ShockConfig {
            enabled: false,
            ..Default::default()
        };
        config
    }

    fn session() -> Session {
        Session::new(
            SessionId::new("s1"),
            config(),
            Arc::new(NullRecorder),
            Arc::new(FixedClock::epoch()),
        )
        .unwrap()
    }

    #[test]
    fn test_step_until_duration() {
        let mut s = session();
        s.add_market_agent(Strategy::default_for(StrategyKind::Random), 1_000.0, 1_000.0);

        let mut steps = 0;
        while s.step().is_some() {
            steps += 1;
        }
        assert_eq!(steps, 30);
        assert_eq!(s.status(), SessionStatus::Ended);
        assert_eq!(s.engine().series().len(), 31);
        // no more ticks past the duration
        assert!(s.step().is_none());
        assert_eq!(s.engine().tick_count(), 30);
    }

    #[test]
    fn test_stopped_session_does_not_tick() {
        let mut s = session();
        s.set_status(SessionStatus::Stopped);
        assert!(s.step().is_none());
        assert_eq!(s.engine().tick_count(), 0);
    }

    #[test]
    fn test_join_and_trade() {
        let mut s = session();
        let alice = UserId::new("alice");
        s.join_user(alice.clone(), "Alice");
        assert_eq!(s.user(&alice).unwrap().wallet.currency, 1_000.0);

        let fill = s.user_trade(&alice, Side::Buy, 100.0).unwrap();
        assert_relative_eq!(fill.total, 100.0);
        let wallet = &s.user(&alice).unwrap().wallet;
        assert_relative_eq!(wallet.currency, 900.0);
        assert_relative_eq!(wallet.coins, 100.0);

        let err = s.user_trade(&alice, Side::Sell, 500.0).unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Trade(TradeError::InsufficientHoldings { .. })
        ));
    }

    #[test]
    fn test_rejoin_keeps_wallet() {
        let mut s = session();
        let bob = UserId::new("bob");
        s.join_user(bob.clone(), "Bob");
        s.user_trade(&bob, Side::Buy, 10.0).unwrap();
        s.leave_user(&bob).unwrap();
        assert!(matches!(
            s.user_trade(&bob, Side::Buy, 1.0),
            Err(RunnerError::UserNotFound(_))
        ));

        s.join_user(bob.clone(), "Bob");
        assert_relative_eq!(s.user(&bob).unwrap().wallet.coins, 10.0);
    }

    #[test]
    fn test_purchase_debits_owner_and_funds_bot() {
        let mut s = session();
        let carol = UserId::new("carol");
        s.join_user(carol.clone(), "Carol");

        let id = s
            .purchase_agent(&carol, Strategy::default_for(StrategyKind::Hedger), 500.0)
            .unwrap();
        assert_relative_eq!(s.user(&carol).unwrap().wallet.currency, 500.0);
        let bot = s.agent(&id).unwrap();
        assert_relative_eq!(bot.wallet.currency, 100.0);
        assert_eq!(bot.wallet.coins, 0.0);
        assert_eq!(bot.owner.as_ref(), Some(&carol));

        let err = s
            .purchase_agent(&carol, Strategy::default_for(StrategyKind::Momentum), 600.0)
            .unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Trade(TradeError::InsufficientFunds { .. })
        ));
        assert_eq!(s.agents().len(), 1);
    }

    #[test]
    fn test_toggle_and_remove() {
        let mut s = session();
        let id = s.add_market_agent(Strategy::fallback(), 10.0, 10.0);
        assert!(!s.toggle_agent(&id).unwrap());
        assert!(!s.list_agents()[0].active);
        assert!(s.toggle_agent(&id).unwrap());

        s.remove_agent(&id).unwrap();
        assert!(s.list_agents().is_empty());
        assert!(matches!(s.toggle_agent(&id), Err(RunnerError::AgentNotFound(_))));
    }

    #[test]
    fn test_leaderboard_orders_by_value() {
        let mut s = session();
        for (id, name) in [("a", "A"), ("b", "B"), ("c", "C")] {
            s.join_user(UserId::new(id), name);
        }
        s.purchase_agent(&UserId::new("a"), Strategy::fallback(), 400.0).unwrap();
        s.purchase_agent(&UserId::new("c"), Strategy::fallback(), 100.0).unwrap();

        let board = s.leaderboard();
        let order: Vec<_> = board.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
        assert_eq!(board[0].rank, 1);
        assert_relative_eq!(board[2].value, 600.0);
    }

    #[test]
    fn test_report_hides_pending_shock() {
        let mut config = config();
        config.market.shock.enabled = true;
        let s = Session::new(
            SessionId::new("s2"),
            config,
            Arc::new(NullRecorder),
            Arc::new(FixedClock::epoch()),
        )
        .unwrap();
        let report = s.report();
        assert_eq!(report.tick, 0);
        assert_eq!(report.remaining_ticks, 30);
        assert!(report.shock.is_none());
        assert_eq!(report.status, SessionStatus::Running);
    }
}
