//! Flat key-value form of a session
//!
//! ```text
//!   market:{session}              status, config, prices, reserves, shock, ...
//!   agent:{session}:{agent}       name, owner, strategy, personality, balances
//!   user:{session}:{user}         name, active, balances
//! ```
//!
//! `%` and `:` in the session segment are percent-escaped; agent and user
//! ids are the final segment and stored as-is.
//!
//! Scalars are stored as plain strings; structured values (config, price
//! history, shock, strategy) as JSON. Custom strategies persist their source
//! and are recompiled on load. The whole price history is kept so a restored
//! session continues without a jump.

use banana_core::{AgentId, SessionId, UserId, Wallet};
use banana_market::{LiquidityPool, MarketState, PriceSeries, ShockEvent};
use banana_ports::{Fields, SessionStore, StoreResult};
use banana_strategy::{Personality, Strategy, TradingAgent};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::str::FromStr;
use thiserror::Error;

use crate::config::SessionConfig;
use crate::session::{Session, SessionStatus, UserAccount};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Snapshot field '{field}' missing under '{key}'")]
    MissingField { key: String, field: String },
    #[error("Snapshot field '{field}' under '{key}' is invalid: {reason}")]
    InvalidField {
        key: String,
        field: String,
        reason: String,
    },
    #[error("Snapshot encoding failed: {0}")]
    Encode(String),
}

type Result<T> = std::result::Result<T, SnapshotError>;

/// Session ids are free-form, so `%` and `:` are escaped to keep one
/// session's key prefix from matching another's (`a` against `a:b`)
fn session_segment(session: &SessionId) -> String {
    let mut out = String::with_capacity(session.as_str().len());
    for c in session.as_str().chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            c => out.push(c),
        }
    }
    out
}

pub fn market_key(session: &SessionId) -> String {
    format!("market:{}", session_segment(session))
}

pub fn agent_prefix(session: &SessionId) -> String {
    format!("agent:{}:", session_segment(session))
}

pub fn agent_key(session: &SessionId, agent: &AgentId) -> String {
    format!("{}{}", agent_prefix(session), agent)
}

pub fn user_prefix(session: &SessionId) -> String {
    format!("user:{}:", session_segment(session))
}

pub fn user_key(session: &SessionId, user: &UserId) -> String {
    format!("{}{}", user_prefix(session), user)
}

/// Every key/fields pair describing one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub entries: Vec<(String, Fields)>,
}

/// A session decoded from the store, ready for [`Session::restore`]
#[derive(Debug, Clone)]
pub struct DecodedSession {
    pub session_id: SessionId,
    pub config: SessionConfig,
    pub status: SessionStatus,
    pub market: MarketState,
    pub agents: Vec<TradingAgent>,
    pub users: Vec<UserAccount>,
}

struct FieldReader<'a> {
    key: &'a str,
    fields: &'a Fields,
}

impl<'a> FieldReader<'a> {
    fn new(key: &'a str, fields: &'a Fields) -> Self {
        Self { key, fields }
    }

    fn invalid(&self, field: &str, reason: impl ToString) -> SnapshotError {
        SnapshotError::InvalidField {
            key: self.key.to_string(),
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    fn optional(&self, field: &str) -> Option<&'a str> {
        self.fields.get(field).map(String::as_str)
    }

    fn str(&self, field: &str) -> Result<&'a str> {
        self.optional(field).ok_or_else(|| SnapshotError::MissingField {
            key: self.key.to_string(),
            field: field.to_string(),
        })
    }

    fn parse<T: FromStr>(&self, field: &str) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        self.str(field)?
            .parse()
            .map_err(|e: T::Err| self.invalid(field, e))
    }

    fn parse_optional<T: FromStr>(&self, field: &str) -> Result<Option<T>>
    where
        T::Err: std::fmt::Display,
    {
        match self.optional(field) {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e: T::Err| self.invalid(field, e)),
            None => Ok(None),
        }
    }

    fn json<T: DeserializeOwned>(&self, field: &str) -> Result<T> {
        serde_json::from_str(self.str(field)?).map_err(|e| self.invalid(field, e))
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| SnapshotError::Encode(e.to_string()))
}

fn put_wallet(fields: &mut Fields, wallet: &Wallet) {
    fields.insert("currency".into(), wallet.currency.to_string());
    fields.insert("coins".into(), wallet.coins.to_string());
    if let Some(tick) = wallet.last_trade_tick {
        fields.insert("last_trade_tick".into(), tick.to_string());
    }
}

fn read_wallet(reader: &FieldReader<'_>, owner: &str) -> Result<Wallet> {
    let mut wallet = Wallet::new(owner, reader.parse("currency")?, reader.parse("coins")?);
    wallet.last_trade_tick = reader.parse_optional("last_trade_tick")?;
    Ok(wallet)
}

/// Capture the session's current state
pub fn encode(session: &Session) -> Result<SessionSnapshot> {
    let id = session.id();
    let engine = session.engine();
    let mut entries = Vec::with_capacity(1 + session.agents().len());

    let mut market = Fields::new();
    market.insert("status".into(), session.status().to_string());
    market.insert("config".into(), to_json(session.config())?);
    market.insert("duration_ticks".into(), engine.duration_ticks().to_string());
    market.insert("tick".into(), engine.tick_count().to_string());
    market.insert("price".into(), engine.current_price().to_string());
    market.insert("volatility".into(), engine.volatility().to_string());
    market.insert("prices".into(), to_json(&engine.series())?);
    market.insert("currency_reserve".into(), engine.pool().currency_reserve.to_string());
    market.insert("coin_reserve".into(), engine.pool().coin_reserve.to_string());
    market.insert("shock".into(), to_json(&engine.shock())?);
    entries.push((market_key(id), market));

    for agent in session.agents() {
        let mut fields = Fields::new();
        fields.insert("name".into(), agent.name.clone());
        if let Some(owner) = &agent.owner {
            fields.insert("owner".into(), owner.to_string());
        }
        fields.insert("kind".into(), agent.kind().to_string());
        fields.insert("strategy".into(), to_json(&agent.strategy)?);
        fields.insert("personality".into(), agent.personality.value().to_string());
        fields.insert("active".into(), agent.active.to_string());
        put_wallet(&mut fields, &agent.wallet);
        entries.push((agent_key(id, &agent.id), fields));
    }

    for user in session.users() {
        let mut fields = Fields::new();
        fields.insert("name".into(), user.name.clone());
        fields.insert("active".into(), user.active.to_string());
        put_wallet(&mut fields, &user.wallet);
        entries.push((user_key(id, &user.id), fields));
    }

    Ok(SessionSnapshot {
        session_id: id.clone(),
        entries,
    })
}

fn parse_status(reader: &FieldReader<'_>) -> Result<SessionStatus> {
    match reader.str("status")? {
        "running" => Ok(SessionStatus::Running),
        "stopped" => Ok(SessionStatus::Stopped),
        "ended" => Ok(SessionStatus::Ended),
        other => Err(reader.invalid("status", format!("unknown status '{}'", other))),
    }
}

/// Rebuild a session's parts from its stored entries
///
/// `agents` and `users` are `(key, fields)` pairs; the id is the last
/// key segment.
pub fn decode(
    session_id: &SessionId,
    market: &Fields,
    agents: &[(String, Fields)],
    users: &[(String, Fields)],
) -> Result<DecodedSession> {
    let key = market_key(session_id);
    let reader = FieldReader::new(&key, market);

    let config: SessionConfig = reader.json("config")?;
    let series: PriceSeries = reader.json("prices")?;
    let shock: Option<ShockEvent> = reader.json("shock")?;
    let pool = LiquidityPool {
        currency_reserve: reader.parse("currency_reserve")?,
        coin_reserve: reader.parse("coin_reserve")?,
        limits: config.market.limits,
    };
    let market_state = MarketState {
        series,
        pool,
        shock,
        volatility: reader.parse("volatility")?,
        duration_ticks: reader.parse("duration_ticks")?,
    };
    let status = parse_status(&reader)?;

    let prefix = agent_prefix(session_id);
    let mut decoded_agents = Vec::with_capacity(agents.len());
    for (key, fields) in agents {
        let reader = FieldReader::new(key, fields);
        let id = AgentId::new(key.strip_prefix(&prefix).unwrap_or(key));
        let strategy: Strategy = reader.json("strategy")?;
        decoded_agents.push(TradingAgent {
            wallet: read_wallet(&reader, id.as_str())?,
            name: reader.str("name")?.to_string(),
            owner: reader.optional("owner").map(UserId::new),
            strategy,
            personality: Personality::new(reader.parse("personality")?),
            active: reader.parse("active")?,
            id,
        });
    }

    let prefix = user_prefix(session_id);
    let mut decoded_users = Vec::with_capacity(users.len());
    for (key, fields) in users {
        let reader = FieldReader::new(key, fields);
        let id = UserId::new(key.strip_prefix(&prefix).unwrap_or(key));
        decoded_users.push(UserAccount {
            wallet: read_wallet(&reader, id.as_str())?,
            name: reader.str("name")?.to_string(),
            active: reader.parse("active")?,
            id,
        });
    }

    Ok(DecodedSession {
        session_id: session_id.clone(),
        config,
        status,
        market: market_state,
        agents: decoded_agents,
        users: decoded_users,
    })
}

/// Write a snapshot, dropping stored agents that no longer exist
pub async fn save(
    store: &dyn SessionStore,
    snapshot: &SessionSnapshot,
) -> StoreResult<()> {
    let prefix = agent_prefix(&snapshot.session_id);
    for stale in store.keys(&prefix).await? {
        if !snapshot.entries.iter().any(|(key, _)| key == &stale) {
            store.delete(&stale).await?;
        }
    }
    for (key, fields) in &snapshot.entries {
        store.put(key, fields.clone()).await?;
    }
    Ok(())
}

async fn read_prefixed(store: &dyn SessionStore, prefix: &str) -> StoreResult<Vec<(String, Fields)>> {
    let mut entries = Vec::new();
    for key in store.keys(prefix).await? {
        if let Some(fields) = store.get(&key).await? {
            entries.push((key, fields));
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// Read a session back; `Ok(None)` when nothing is stored for it
pub async fn load(
    store: &dyn SessionStore,
    session_id: &SessionId,
) -> crate::error::Result<Option<DecodedSession>> {
    let Some(market) = store.get(&market_key(session_id)).await? else {
        return Ok(None);
    };

    let agents = read_prefixed(store, &agent_prefix(session_id)).await?;
    let users = read_prefixed(store, &user_prefix(session_id)).await?;

    Ok(Some(decode(session_id, &market, &agents, &users)?))
}
