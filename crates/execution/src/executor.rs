use banana_core::{SessionId, Side, TradeError, TradeRecord, TradeResult, Wallet};
use banana_market::LiquidityPool;
use banana_ports::{Clock, TransactionRecorder};
use std::sync::Arc;

/// The party on the trader side of a buy or sell
pub struct Counterparty<'a> {
    pub actor_id: &'a str,
    pub display_name: &'a str,
    pub is_agent: bool,
    pub wallet: &'a mut Wallet,
    /// Wallet of the user an agent trades for; receives the same deltas
    pub owner_wallet: Option<&'a mut Wallet>,
}

impl<'a> Counterparty<'a> {
    pub fn user(actor_id: &'a str, display_name: &'a str, wallet: &'a mut Wallet) -> Self {
        Self {
            actor_id,
            display_name,
            is_agent: false,
            wallet,
            owner_wallet: None,
        }
    }

    pub fn agent(actor_id: &'a str, display_name: &'a str, wallet: &'a mut Wallet) -> Self {
        Self {
            actor_id,
            display_name,
            is_agent: true,
            wallet,
            owner_wallet: None,
        }
    }

    pub fn on_behalf_of(mut self, owner_wallet: Option<&'a mut Wallet>) -> Self {
        self.owner_wallet = owner_wallet;
        self
    }
}

/// An executed trade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub side: Side,
    pub amount: f64,
    pub price: f64,
    /// Currency moved
    pub total: f64,
    pub tick: u64,
}

/// Executes buys and sells for one session
pub struct TradeExecutor {
    session_id: SessionId,
    recorder: Arc<dyn TransactionRecorder>,
    clock: Arc<dyn Clock>,
}

impl TradeExecutor {
    pub fn new(
        session_id: SessionId,
        recorder: Arc<dyn TransactionRecorder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            session_id,
            recorder,
            clock,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Buy `amount` coins at `price`
    pub fn buy(
        &self,
        pool: &mut LiquidityPool,
        party: Counterparty<'_>,
        amount: f64,
        price: f64,
        tick: u64,
    ) -> TradeResult<Fill> {
        self.execute(pool, party, Side::Buy, amount, price, tick)
    }

    /// Sell `amount` coins at `price`
    pub fn sell(
        &self,
        pool: &mut LiquidityPool,
        party: Counterparty<'_>,
        amount: f64,
        price: f64,
        tick: u64,
    ) -> TradeResult<Fill> {
        self.execute(pool, party, Side::Sell, amount, price, tick)
    }

    pub fn execute(
        &self,
        pool: &mut LiquidityPool,
        party: Counterparty<'_>,
        side: Side,
        amount: f64,
        price: f64,
        tick: u64,
    ) -> TradeResult<Fill> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(TradeError::InvalidAmount(amount));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(TradeError::InvalidPrice(price));
        }
        let total = amount * price;

        // All checks happen before the first mutation
        let (currency_delta, coin_delta) = match side {
            Side::Buy => {
                if !party.wallet.can_afford(total) {
                    return Err(TradeError::InsufficientFunds {
                        required: total,
                        available: party.wallet.currency,
                    });
                }
                (-total, amount)
            }
            Side::Sell => {
                if !party.wallet.holds(amount) {
                    return Err(TradeError::InsufficientHoldings {
                        required: amount,
                        available: party.wallet.coins,
                    });
                }
                (total, -amount)
            }
        };

        party.wallet.apply_delta(currency_delta, coin_delta);
        party.wallet.last_trade_tick = Some(tick);
        if let Some(owner) = party.owner_wallet {
            owner.apply_delta(currency_delta, coin_delta);
        }
        pool.apply_trade(side, amount, price);
        pool.refloor();

        log::debug!(
            "[{}] {} {} {:.4} @ {:.4} (tick {})",
            self.session_id,
            party.actor_id,
            side,
            amount,
            price,
            tick
        );

        let record = TradeRecord {
            session_id: self.session_id.clone(),
            side,
            actor_id: party.actor_id.to_string(),
            actor_name: party.display_name.to_string(),
            amount,
            price,
            total,
            timestamp: self.clock.now(),
            is_agent: party.is_agent,
        };
        if let Err(e) = self.recorder.record(record) {
            log::warn!("[{}] Trade not recorded: {}", self.session_id, e);
        }

        Ok(Fill {
            side,
            amount,
            price,
            total,
            tick,
        })
    }
}
