//! Shared primitive types used across the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stable card/account identifier. One entity = one causal timeline.
pub type EntityId = String;

/// One raw transaction. Immutable once ingested — the pipeline never
/// mutates records, it only derives features from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub card_id: EntityId,
    pub timestamp: DateTime<Utc>,
    pub amount: f64,
    pub lat: f64,
    pub long: f64,
    pub merch_lat: f64,
    pub merch_long: f64,
    pub city_pop: f64,
}
