use async_trait::async_trait;

use crate::SupplierError;

/// Port for the custom strategy generator
///
/// Given a natural-language description, returns source text for a single
/// `decide(history, price)` function in the strategy script language. The
/// output is untrusted: callers compile and validate it before use.
#[async_trait]
pub trait StrategySupplier: Send + Sync {
    async fn generate(&self, description: &str) -> Result<String, SupplierError>;
}
