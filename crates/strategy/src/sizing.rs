use banana_core::{Decision, Side, Wallet};

/// Largest share of available currency a sized strategy spends per tick
pub const MAX_SPEND_FRACTION: f64 = 0.2;

/// Cap a proposal against what the wallet can actually support
///
/// Buys spend at most [`MAX_SPEND_FRACTION`] of the currency balance; sells
/// never exceed the coins held. A cap of zero turns the trade into a hold.
pub fn cap_to_wallet(decision: Decision, wallet: &Wallet, price: f64) -> Decision {
    let Some(side) = decision.side() else {
        return decision;
    };
    let limit = match side {
        Side::Buy if price > 0.0 => wallet.currency * MAX_SPEND_FRACTION / price,
        Side::Buy => 0.0,
        Side::Sell => wallet.coins,
    };
    Decision::trade(side, decision.amount.min(limit))
}
