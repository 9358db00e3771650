//! End-to-end session scenarios: agents, users, custom bots, persistence

use approx::assert_relative_eq;
use async_trait::async_trait;
use banana_clock::{FixedClock, SystemClock};
use banana_core::{SessionId, Side, UserId};
use banana_market::{SHOCK_TITLES, ShockConfig};
use banana_ports::{StrategySupplier, SupplierError};
use banana_runner::{
    InMemoryStore, RunnerError, Session, SessionConfig, SessionOrchestrator, SessionStatus,
    TransactionLog, snapshot,
};
use banana_strategy::{Strategy, StrategyKind};
use std::sync::Arc;
use std::time::Duration;

struct CannedSupplier(Result<String, SupplierError>);

#[async_trait]
impl StrategySupplier for CannedSupplier {
    async fn generate(&self, _description: &str) -> Result<String, SupplierError> {
        self.0.clone()
    }
}

fn config(ticks: u64, shock: bool) -> SessionConfig {
    let mut config = SessionConfig {
        duration_ticks: ticks,
        tick_interval_ms: 10,
        seed: Some(2024),
        ..Default::default()
    };
    config.market.shock = ShockConfig {
        enabled: shock,
        ..Default::default()
    };
    config
}

fn orchestrator(store: InMemoryStore, log: Arc<TransactionLog>) -> SessionOrchestrator {
    let _ = env_logger::try_init();
    SessionOrchestrator::new(Arc::new(store), log, Arc::new(SystemClock))
}

async fn seed_agents(orch: &SessionOrchestrator, id: &SessionId) {
    for kind in StrategyKind::BUILT_IN {
        orch.add_market_agent(id, Strategy::default_for(kind), 2_000.0, 2_000.0)
            .await
            .unwrap();
    }
}

#[test]
fn test_every_tick_appends_one_price() {
    let mut session = Session::new(
        SessionId::new("series"),
        config(60, true),
        Arc::new(TransactionLog::new()),
        Arc::new(FixedClock::epoch()),
    )
    .unwrap();
    for kind in StrategyKind::BUILT_IN {
        session.add_market_agent(Strategy::default_for(kind), 1_000.0, 1_000.0);
    }

    while let Some(step) = session.step() {
        let engine = session.engine();
        assert_eq!(engine.series().len() as u64, step.market.tick + 1);
        assert!(engine.pool().is_above_floor());
        assert!(engine.current_price() >= 0.10);
        for agent in session.agents() {
            assert!(agent.wallet.currency >= 0.0 && agent.wallet.coins >= 0.0);
        }
    }
    assert_eq!(session.status(), SessionStatus::Ended);
    assert_eq!(session.engine().series().len(), 61);
}

#[tokio::test]
async fn test_restored_session_continues_series() {
    let store = InMemoryStore::new();
    let mut session = Session::new(
        SessionId::new("resume"),
        config(40, false),
        Arc::new(TransactionLog::new()),
        Arc::new(FixedClock::epoch()),
    )
    .unwrap();
    session.add_market_agent(Strategy::default_for(StrategyKind::MeanReversion), 500.0, 500.0);
    for _ in 0..10 {
        session.step();
    }

    let snap = snapshot::encode(&session).unwrap();
    snapshot::save(&store, &snap).await.unwrap();
    let decoded = snapshot::load(&store, session.id()).await.unwrap().unwrap();
    let mut restored = Session::restore(
        decoded.session_id,
        decoded.config,
        decoded.market,
        decoded.agents,
        decoded.users,
        decoded.status,
        Arc::new(TransactionLog::new()),
        Arc::new(FixedClock::epoch()),
    )
    .unwrap();

    assert_eq!(restored.engine().series(), session.engine().series());
    assert_eq!(restored.engine().current_price(), session.engine().current_price());
    assert_eq!(restored.agents(), session.agents());

    restored.step().unwrap();
    assert_eq!(restored.engine().tick_count(), 11);
    assert_eq!(restored.engine().series().len(), 12);
    assert_eq!(
        &restored.engine().series().prices()[..11],
        session.engine().series().prices()
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_and_restore_through_orchestrator() {
    let store = InMemoryStore::new();
    let orch = orchestrator(store.clone(), Arc::new(TransactionLog::new()));
    let id = SessionId::new("game-1");
    orch.start_session_with_id(id.clone(), config(500, false))
        .await
        .unwrap();
    seed_agents(&orch, &id).await;

    tokio::time::sleep(Duration::from_millis(205)).await;
    let stopped = orch.stop_session(&id).await.unwrap();
    assert_eq!(stopped.status, SessionStatus::Stopped);
    assert!(stopped.tick > 0);

    // no ticks while stopped
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(orch.status(&id).await.unwrap().tick, stopped.tick);

    let restored = orch.restore_session(&id).await.unwrap();
    assert_eq!(restored.tick, stopped.tick);
    assert_eq!(restored.price, stopped.price);
    assert_eq!(restored.status, SessionStatus::Running);
    assert_eq!(orch.list_agents(&id).await.unwrap().len(), 5);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(orch.status(&id).await.unwrap().tick > stopped.tick);
    orch.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_user_trades_and_transactions() {
    let log = Arc::new(TransactionLog::new());
    let orch = orchestrator(InMemoryStore::new(), log.clone());
    let id = orch.start_session(config(30, false)).await.unwrap();
    seed_agents(&orch, &id).await;

    let user = UserId::new("alice");
    let account = orch.join_user(&id, user.clone(), "Alice").await.unwrap();
    assert_eq!(account.wallet.currency, 1_000.0);

    let fill = orch.user_trade(&id, &user, Side::Buy, 50.0).await.unwrap();
    assert_eq!(fill.side, Side::Buy);

    let err = orch
        .user_trade(&id, &user, Side::Buy, 1_000_000.0)
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("Insufficient funds"));
    let err = orch
        .user_trade(&SessionId::new("missing"), &user, Side::Buy, 1.0)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Market not found: missing");

    orch.join(&id).await.unwrap();

    let mine = log.by_actor(&id, "alice", 10);
    assert_eq!(mine.len(), 1);
    assert!(!mine[0].is_agent);
    assert_eq!(mine[0].actor_name, "Alice");
    assert!(log.agent_trades(&id, 100).iter().all(|r| r.is_agent));

    let stats = log.stats(&id);
    assert_eq!(stats.count, stats.buys + stats.sells);
    assert!(stats.agent_trades > 0);

    // trading after the end is refused
    assert!(matches!(
        orch.user_trade(&id, &user, Side::Sell, 1.0).await,
        Err(RunnerError::SessionNotRunning(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_paused_agent_does_not_trade() {
    let orch = orchestrator(InMemoryStore::new(), Arc::new(TransactionLog::new()));
    let id = orch.start_session(config(25, false)).await.unwrap();
    let agent = orch
        .add_market_agent(&id, Strategy::fallback(), 300.0, 300.0)
        .await
        .unwrap();
    assert!(!orch.toggle_agent(&id, &agent).await.unwrap());

    orch.join(&id).await.unwrap();
    let summary = orch.list_agents(&id).await.unwrap().remove(0);
    assert!(!summary.active);
    assert_eq!(summary.currency, 300.0);
    assert_eq!(summary.coins, 300.0);
}

#[tokio::test(start_paused = true)]
async fn test_custom_bot_purchase() {
    let code = "```\nfn decide(history, price) {\n  if price < mean(history) { return buy(1); }\n  return hold();\n}\n```";
    let orch = orchestrator(InMemoryStore::new(), Arc::new(TransactionLog::new()))
        .with_supplier(Arc::new(CannedSupplier(Ok(code.to_string()))));
    let id = orch.start_session(config(100, false)).await.unwrap();
    let owner = UserId::new("bob");
    orch.join_user(&id, owner.clone(), "Bob").await.unwrap();

    let receipt = orch
        .purchase_agent(&id, &owner, "prompt", 400.0, Some("buy below average"))
        .await
        .unwrap();
    assert_eq!(receipt.kind, StrategyKind::Custom);
    assert!(receipt.fallback_reason.is_none());

    let agents = orch.list_agents(&id).await.unwrap();
    assert_eq!(agents[0].owner.as_ref(), Some(&owner));
    assert_relative_eq!(agents[0].currency, 80.0);
    let board = orch.leaderboard(&id).await.unwrap();
    assert_relative_eq!(board[0].currency, 600.0);
    orch.stop_session(&id).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_rejected_custom_code_falls_back_to_random() {
    for supplier in [
        CannedSupplier(Ok("fn strategy(h, p) { return buy(1); }".to_string())),
        CannedSupplier(Err(SupplierError::Unavailable("offline".to_string()))),
    ] {
        let orch = orchestrator(InMemoryStore::new(), Arc::new(TransactionLog::new()))
            .with_supplier(Arc::new(supplier));
        let id = orch.start_session(config(100, false)).await.unwrap();
        let owner = UserId::new("carol");
        orch.join_user(&id, owner.clone(), "Carol").await.unwrap();

        let receipt = orch
            .purchase_agent(&id, &owner, "custom", 100.0, Some("anything"))
            .await
            .unwrap();
        assert_eq!(receipt.kind, StrategyKind::Random);
        assert!(receipt.fallback_reason.is_some());
        orch.stop_session(&id).await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_unknown_kind_and_unaffordable_bot() {
    let orch = orchestrator(InMemoryStore::new(), Arc::new(TransactionLog::new()));
    let id = orch.start_session(config(100, false)).await.unwrap();
    let owner = UserId::new("dave");
    orch.join_user(&id, owner.clone(), "Dave").await.unwrap();

    assert!(matches!(
        orch.purchase_agent(&id, &owner, "oracle", 10.0, None).await,
        Err(RunnerError::UnknownKind(_))
    ));
    assert!(matches!(
        orch.purchase_agent(&id, &owner, "hodler", 5_000.0, None).await,
        Err(RunnerError::Trade(_))
    ));
    assert!(orch.list_agents(&id).await.unwrap().is_empty());
    orch.stop_session(&id).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shock_fires_inside_window() {
    let orch = orchestrator(InMemoryStore::new(), Arc::new(TransactionLog::new()));
    let id = orch.start_session(config(20, true)).await.unwrap();

    let report = orch.join(&id).await.unwrap();
    let banner = report.shock.expect("shock should have fired by the end");
    assert!(SHOCK_TITLES.contains(&banner.title.as_str()));
    assert!((0.0..=1.0).contains(&banner.intensity));
}
