use serde::{Deserialize, Serialize};

use super::Side;
use crate::values::{SessionId, Timestamp};

/// One executed trade, as emitted to the transaction recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub session_id: SessionId,
    pub side: Side,
    /// User or agent identifier
    pub actor_id: String,
    /// Display name shown in the transaction feed
    pub actor_name: String,
    pub amount: f64,
    pub price: f64,
    /// Currency moved: amount × price
    pub total: f64,
    pub timestamp: Timestamp,
    pub is_agent: bool,
}
