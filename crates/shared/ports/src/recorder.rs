use banana_core::TradeRecord;

use crate::RecorderError;

/// Port for the transaction history
///
/// Fire-and-forget from the trade executor's point of view: an error is
/// logged and the trade stands.
pub trait TransactionRecorder: Send + Sync {
    fn record(&self, record: TradeRecord) -> Result<(), RecorderError>;
}

/// Recorder that drops every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl TransactionRecorder for NullRecorder {
    fn record(&self, _record: TradeRecord) -> Result<(), RecorderError> {
        Ok(())
    }
}
