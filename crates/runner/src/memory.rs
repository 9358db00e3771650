//! In-memory adapters for the persistence and transaction ports
//!
//! Thread-safe through `DashMap`. Used by the binary and the tests; a
//! deployment plugs real backends into the same traits.

use async_trait::async_trait;
use banana_core::{SessionId, Side, TradeRecord};
use banana_ports::{Fields, RecorderError, SessionStore, StoreError, StoreResult, TransactionRecorder};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Key-value store held in process memory
///
/// Can be switched offline to exercise the degraded-durability path.
#[derive(Clone)]
pub struct InMemoryStore {
    entries: Arc<DashMap<String, Fields>>,
    online: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    /// While offline every operation fails with `StoreError::Unavailable`
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check(&self) -> StoreResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store offline".to_string()))
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn put(&self, key: &str, fields: Fields) -> StoreResult<()> {
        self.check()?;
        self.entries.insert(key.to_string(), fields);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Fields>> {
        self.check()?;
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.check()?;
        Ok(self.entries.remove(key).is_some())
    }

    async fn keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.check()?;
        Ok(self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect())
    }
}

/// Aggregate figures over a session's transactions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub count: usize,
    pub buys: usize,
    pub sells: usize,
    pub agent_trades: usize,
    /// Coins traded
    pub volume: f64,
    /// Currency moved
    pub turnover: f64,
}

/// Transaction history kept per session, oldest first
#[derive(Clone, Default)]
pub struct TransactionLog {
    records: Arc<DashMap<SessionId, Vec<TradeRecord>>>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Up to `limit` most recent records, newest first
    pub fn recent(&self, session: &SessionId, limit: usize) -> Vec<TradeRecord> {
        self.query(session, limit, |_| true)
    }

    pub fn by_actor(&self, session: &SessionId, actor_id: &str, limit: usize) -> Vec<TradeRecord> {
        self.query(session, limit, |r| r.actor_id == actor_id)
    }

    pub fn agent_trades(&self, session: &SessionId, limit: usize) -> Vec<TradeRecord> {
        self.query(session, limit, |r| r.is_agent)
    }

    pub fn stats(&self, session: &SessionId) -> TransactionStats {
        let Some(records) = self.records.get(session) else {
            return TransactionStats::default();
        };
        records.iter().fold(TransactionStats::default(), |mut s, r| {
            s.count += 1;
            match r.side {
                Side::Buy => s.buys += 1,
                Side::Sell => s.sells += 1,
            }
            if r.is_agent {
                s.agent_trades += 1;
            }
            s.volume += r.amount;
            s.turnover += r.total;
            s
        })
    }

    /// Drop a session's history
    pub fn clear(&self, session: &SessionId) {
        self.records.remove(session);
    }

    fn query(
        &self,
        session: &SessionId,
        limit: usize,
        keep: impl Fn(&TradeRecord) -> bool,
    ) -> Vec<TradeRecord> {
        self.records
            .get(session)
            .map(|records| {
                records
                    .iter()
                    .rev()
                    .filter(|r| keep(r))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TransactionRecorder for TransactionLog {
    fn record(&self, record: TradeRecord) -> Result<(), RecorderError> {
        self.records
            .entry(record.session_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }
}
