use banana_clock::SystemClock;
use banana_core::{Side, UserId};
use banana_runner::{InMemoryStore, SessionConfig, SessionOrchestrator, TransactionLog};
use banana_strategy::{Strategy, StrategyKind};
use std::sync::Arc;

fn print_help() {
    eprintln!(
        r#"BananaCoin market simulator

USAGE:
    banana-sim [OPTIONS]

OPTIONS:
    --config <PATH>     Load session configuration from a JSON file
    --agents <N>        Market bots per built-in strategy (default: 2)
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)
"#
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut agents_per_kind = 2usize;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                let Some(path) = args.get(i) else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                };
                config_path = Some(path.clone());
            }
            "--agents" => {
                i += 1;
                let Some(n) = args.get(i).and_then(|n| n.parse().ok()) else {
                    eprintln!("Error: --agents requires a number");
                    std::process::exit(1);
                };
                agents_per_kind = n;
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            log::info!("Loading configuration from: {}", path);
            SessionConfig::from_file(&path)?
        }
        None => SessionConfig {
            duration_ticks: 120,
            tick_interval_ms: 20,
            ..Default::default()
        },
    };

    let store = InMemoryStore::new();
    let log = Arc::new(TransactionLog::new());
    let orchestrator =
        SessionOrchestrator::new(Arc::new(store), log.clone(), Arc::new(SystemClock));

    let id = orchestrator.start_session(config).await?;
    for kind in StrategyKind::BUILT_IN {
        for _ in 0..agents_per_kind {
            orchestrator
                .add_market_agent(&id, Strategy::default_for(kind), 5_000.0, 5_000.0)
                .await?;
        }
    }

    let player = UserId::new("player-1");
    orchestrator.join_user(&id, player.clone(), "Player One").await?;
    orchestrator.user_trade(&id, &player, Side::Buy, 100.0).await?;
    let receipt = orchestrator
        .purchase_agent(&id, &player, "scalper", 250.0, None)
        .await?;
    log::info!("Player bought a {} bot ({})", receipt.kind, receipt.agent_id);

    let report = orchestrator.join(&id).await?;
    log::info!(
        "Final: tick {}/{} price {:.4} volatility {:.5} reserves {:.0}/{:.0} ({})",
        report.tick,
        report.duration_ticks,
        report.price,
        report.volatility,
        report.currency_reserve,
        report.coin_reserve,
        report.status
    );
    if let Some(shock) = &report.shock {
        log::info!("Shock of the session: {}", shock.title);
    }

    for agent in orchestrator.list_agents(&id).await? {
        log::info!(
            "  {:<20} {:>12.2} value (personality {:.3})",
            agent.name,
            agent.value,
            agent.personality
        );
    }
    for entry in orchestrator.leaderboard(&id).await? {
        log::info!("#{} {} {:.2}", entry.rank, entry.name, entry.value);
    }

    let stats = log.stats(&id);
    log::info!(
        "{} trades ({} buys / {} sells, {} by bots), volume {:.2} coins",
        stats.count,
        stats.buys,
        stats.sells,
        stats.agent_trades,
        stats.volume
    );

    Ok(())
}
