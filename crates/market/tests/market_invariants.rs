//! Market invariants under randomized order flow
//!
//! Runs many seeded sessions end to end and checks, after every tick:
//! - both reserves stay at or above the floor
//! - the price series has exactly `tick + 1` entries
//! - the quoted price never drops under the price floor

use banana_market::{
    FlowConfig, LiquidityPool, MarketConfig, MarketEngine, PoolLimits, ShockConfig,
    ShockTransition,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn no_shock() -> ShockConfig {
    ShockConfig {
        enabled: false,
        ..Default::default()
    }
}

#[test]
fn test_fifty_ticks_from_unit_price() {
    let _ = env_logger::try_init();

    let config = MarketConfig {
        initial_price: 1.0,
        initial_currency_reserve: 1_000_000.0,
        initial_coin_reserve: 1_000_000.0,
        shock: no_shock(),
        ..Default::default()
    };
    let mut engine = MarketEngine::new(config, 50, Some(2024)).expect("valid config");

    while !engine.is_finished() {
        engine.tick();
    }

    assert_eq!(engine.series().len(), 51, "seed + 50 ticks");
    assert!(engine.current_price() >= 0.10);
    assert!(engine.series().prices().iter().all(|p| *p >= 0.10));
}

#[test]
fn test_invariants_hold_across_random_sessions() {
    let _ = env_logger::try_init();
    let mut meta = StdRng::seed_from_u64(77);

    for run in 0..40 {
        let floor = 10_000.0;
        let config = MarketConfig {
            initial_price: meta.gen_range(0.2..5.0),
            initial_currency_reserve: meta.gen_range(floor..200_000.0),
            initial_coin_reserve: meta.gen_range(floor..200_000.0),
            flow: FlowConfig {
                trades_per_tick: meta.gen_range(1..60),
                ..Default::default()
            },
            ..Default::default()
        };
        let duration = meta.gen_range(10..150);
        let mut engine = MarketEngine::new(config, duration, Some(run)).expect("valid config");

        while !engine.is_finished() {
            let report = engine.tick();
            let pool = engine.pool();
            assert!(
                pool.currency_reserve >= floor && pool.coin_reserve >= floor,
                "run {} tick {}: reserves {} / {}",
                run,
                report.tick,
                pool.currency_reserve,
                pool.coin_reserve
            );
            assert_eq!(engine.series().len() as u64, report.tick + 1);
            assert!(report.price >= 0.10);
        }
        assert_eq!(engine.tick_count(), duration);
    }
}

#[test]
fn test_shock_near_the_floor_is_refloored() {
    // Tiny pool: a 25% drain would breach the floor without the re-clamp
    let config = MarketConfig {
        initial_currency_reserve: 10_500.0,
        initial_coin_reserve: 10_500.0,
        shock: ShockConfig {
            min_magnitude: 0.25,
            max_magnitude: 0.25,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut engine = MarketEngine::new(config, 20, Some(5)).expect("valid config");
    let mut saw_shock = false;

    while !engine.is_finished() {
        let report = engine.tick();
        if matches!(report.shock, Some(ShockTransition::Triggered { .. })) {
            saw_shock = true;
        }
        assert!(engine.pool().is_above_floor());
    }
    assert!(saw_shock);
}

#[test]
fn test_agent_trades_between_ticks_are_refloored() {
    let mut pool = LiquidityPool::new(10_000.0, 10_000.0, PoolLimits::default());
    pool.apply_trade(banana_core::Side::Buy, 500.0, 1.0);
    assert!(!pool.is_above_floor());
    pool.refloor();
    assert!(pool.is_above_floor());
}
