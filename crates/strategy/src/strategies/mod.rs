//! Built-in strategies and the closed set of strategy kinds
//!
//! Every strategy maps `(price history, current price, wallet)` to a
//! [`Decision`]. Built-ins are perturbed by the agent's personality;
//! custom strategies run a validated script.

pub mod custom;
pub mod hedger;
pub mod market_maker;
pub mod mean_reversion;
pub mod momentum;
pub mod random;

use banana_core::{Decision, Wallet};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::personality::Personality;
pub use custom::{CustomConfig, Registration};
pub use hedger::HedgerConfig;
pub use market_maker::MarketMakerConfig;
pub use mean_reversion::MeanReversionConfig;
pub use momentum::MomentumConfig;
pub use random::RandomConfig;

/// Read-only inputs to a decision
#[derive(Debug, Clone, Copy)]
pub struct MarketView<'a> {
    /// Prices from the seed up to and including the current tick
    pub history: &'a [f64],
    pub price: f64,
    pub wallet: &'a Wallet,
}

impl<'a> MarketView<'a> {
    pub fn new(history: &'a [f64], price: f64, wallet: &'a Wallet) -> Self {
        Self {
            history,
            price,
            wallet,
        }
    }
}

/// Strategy kind labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Random,
    Momentum,
    MeanReversion,
    MarketMaker,
    Hedger,
    Custom,
}

impl StrategyKind {
    pub const BUILT_IN: [StrategyKind; 5] = [
        StrategyKind::Random,
        StrategyKind::Momentum,
        StrategyKind::MeanReversion,
        StrategyKind::MarketMaker,
        StrategyKind::Hedger,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Random => "random",
            StrategyKind::Momentum => "momentum",
            StrategyKind::MeanReversion => "mean_reversion",
            StrategyKind::MarketMaker => "market_maker",
            StrategyKind::Hedger => "hedger",
            StrategyKind::Custom => "custom",
        }
    }

    /// Display name for agents of this kind
    pub fn display_name(&self) -> &'static str {
        match self {
            StrategyKind::Random => "Random Bot",
            StrategyKind::Momentum => "Momentum Bot",
            StrategyKind::MeanReversion => "Mean Reversion Bot",
            StrategyKind::MarketMaker => "Market Maker Bot",
            StrategyKind::Hedger => "Hedger Bot",
            StrategyKind::Custom => "Custom Bot",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown strategy kind '{0}'")]
pub struct UnknownStrategyKind(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategyKind;

    /// Accepts kind names and the storefront bot names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "random" | "premade" => Ok(StrategyKind::Random),
            "momentum" | "scalper" | "swing" => Ok(StrategyKind::Momentum),
            "mean_reversion" | "hodler" | "dip" => Ok(StrategyKind::MeanReversion),
            "market_maker" | "arbitrage" => Ok(StrategyKind::MarketMaker),
            "hedger" | "hedge" => Ok(StrategyKind::Hedger),
            "custom" | "prompt" => Ok(StrategyKind::Custom),
            _ => Err(UnknownStrategyKind(s.to_string())),
        }
    }
}

/// A strategy and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    Random(RandomConfig),
    Momentum(MomentumConfig),
    MeanReversion(MeanReversionConfig),
    MarketMaker(MarketMakerConfig),
    Hedger(HedgerConfig),
    Custom(CustomConfig),
}

impl Strategy {
    /// Default parameters for a built-in kind
    ///
    /// `Custom` has no defaults without code and yields the fallback.
    pub fn default_for(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Random | StrategyKind::Custom => Strategy::Random(RandomConfig::default()),
            StrategyKind::Momentum => Strategy::Momentum(MomentumConfig::default()),
            StrategyKind::MeanReversion => Strategy::MeanReversion(MeanReversionConfig::default()),
            StrategyKind::MarketMaker => Strategy::MarketMaker(MarketMakerConfig::default()),
            StrategyKind::Hedger => Strategy::Hedger(HedgerConfig::default()),
        }
    }

    /// Safe default used when custom code is rejected
    pub fn fallback() -> Self {
        Strategy::Random(RandomConfig::default())
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Random(_) => StrategyKind::Random,
            Strategy::Momentum(_) => StrategyKind::Momentum,
            Strategy::MeanReversion(_) => StrategyKind::MeanReversion,
            Strategy::MarketMaker(_) => StrategyKind::MarketMaker,
            Strategy::Hedger(_) => StrategyKind::Hedger,
            Strategy::Custom(_) => StrategyKind::Custom,
        }
    }

    /// Whether proposals are capped against the wallet before execution
    pub fn is_balance_sized(&self) -> bool {
        matches!(
            self,
            Strategy::Momentum(_)
                | Strategy::MeanReversion(_)
                | Strategy::MarketMaker(_)
                | Strategy::Hedger(_)
        )
    }

    /// Raw decision, before balance sizing
    pub fn decide<R: Rng + ?Sized>(
        &self,
        view: &MarketView<'_>,
        personality: Personality,
        rng: &mut R,
    ) -> Decision {
        match self {
            Strategy::Random(c) => random::decide(c, view, personality, rng),
            Strategy::Momentum(c) => momentum::decide(c, view, personality, rng),
            Strategy::MeanReversion(c) => mean_reversion::decide(c, view, personality, rng),
            Strategy::MarketMaker(c) => market_maker::decide(c, view, personality, rng),
            Strategy::Hedger(c) => hedger::decide(c, view, personality, rng),
            Strategy::Custom(c) => custom::decide(c, view, rng),
        }
    }
}
