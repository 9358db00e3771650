mod decision;
mod side;
mod trade;
mod wallet;

pub use decision::{Action, Decision};
pub use side::Side;
pub use trade::TradeRecord;
pub use wallet::Wallet;
