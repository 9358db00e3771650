use banana_core::{AgentId, Decision, UserId, Wallet};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::personality::Personality;
use crate::sizing;
use crate::strategies::{MarketView, Strategy, StrategyKind};

/// A bot: wallet, strategy and personality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingAgent {
    pub id: AgentId,
    pub name: String,
    /// User the agent trades on behalf of, if any
    pub owner: Option<UserId>,
    pub strategy: Strategy,
    /// Fixed at creation from `id`
    pub personality: Personality,
    pub active: bool,
    pub wallet: Wallet,
}

impl TradingAgent {
    pub fn new(
        id: AgentId,
        owner: Option<UserId>,
        strategy: Strategy,
        currency: f64,
        coins: f64,
    ) -> Self {
        let personality = Personality::from_id(id.as_str());
        let name = strategy.kind().display_name().to_string();
        let wallet = Wallet::new(id.as_str(), currency, coins);
        Self {
            id,
            name,
            owner,
            strategy,
            personality,
            active: true,
            wallet,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the derived personality (tests and calibration)
    pub fn with_personality(mut self, personality: Personality) -> Self {
        self.personality = personality;
        self
    }

    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Flip the active flag and return the new state
    pub fn toggle(&mut self) -> bool {
        self.active = !self.active;
        self.active
    }

    /// This tick's decision, sized against the wallet
    ///
    /// Inactive agents always hold.
    pub fn decide<R: Rng + ?Sized>(&self, history: &[f64], price: f64, rng: &mut R) -> Decision {
        if !self.active {
            return Decision::hold();
        }
        let view = MarketView::new(history, price, &self.wallet);
        let decision = self.strategy.decide(&view, self.personality, rng);
        if self.strategy.is_balance_sized() {
            sizing::cap_to_wallet(decision, &self.wallet, price)
        } else {
            decision
        }
    }

    pub fn summary(&self, price: f64) -> AgentSummary {
        AgentSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            owner: self.owner.clone(),
            kind: self.kind(),
            active: self.active,
            personality: self.personality.value(),
            currency: self.wallet.currency,
            coins: self.wallet.coins,
            value: self.wallet.value_at(price),
        }
    }
}

/// Listing row for an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub name: String,
    pub owner: Option<UserId>,
    pub kind: StrategyKind,
    pub active: bool,
    pub personality: f64,
    pub currency: f64,
    pub coins: f64,
    /// Mark-to-market value at the current price
    pub value: f64,
}
