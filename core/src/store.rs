//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database. The pipeline and monitor call
//! store methods — they never execute SQL directly.
//!
//! Artifacts: raw transactions, named feature sets (matrix + schema
//! manifest), named score sets, the fitted scaler, the frozen score
//! baseline, and the append-only metrics log.

use crate::{
    error::{PipelineError, PipelineResult},
    metrics::ScoreMetrics,
    normalizer::Scaler,
    reference::ScoreBaseline,
    schema::{FeatureFrame, FeatureSchema},
    types::TransactionRecord,
};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// Feature/score set holding the latest production batch.
pub const SET_CURRENT: &str = "current";
/// Feature set holding the frozen reference window.
pub const SET_REFERENCE: &str = "reference";

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    seq        INTEGER PRIMARY KEY,
    card_id    TEXT NOT NULL,
    ts_millis  INTEGER NOT NULL,
    amount     REAL NOT NULL,
    lat        REAL NOT NULL,
    long       REAL NOT NULL,
    merch_lat  REAL NOT NULL,
    merch_long REAL NOT NULL,
    city_pop   REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS feature_sets (
    set_name    TEXT PRIMARY KEY,
    schema_json TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS feature_rows (
    set_name    TEXT NOT NULL,
    row_idx     INTEGER NOT NULL,
    values_json TEXT NOT NULL,
    PRIMARY KEY (set_name, row_idx)
);
CREATE TABLE IF NOT EXISTS score_sets (
    set_name TEXT NOT NULL,
    row_idx  INTEGER NOT NULL,
    score    REAL NOT NULL,
    PRIMARY KEY (set_name, row_idx)
);
CREATE TABLE IF NOT EXISTS scaler_params (
    id          INTEGER PRIMARY KEY CHECK (id = 1),
    params_json TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS score_baseline (
    id            INTEGER PRIMARY KEY CHECK (id = 1),
    baseline_json TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS metrics_log (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id          TEXT NOT NULL,
    logged_at       TEXT NOT NULL,
    mean_score      REAL NOT NULL,
    std_score       REAL NOT NULL,
    p95_score       REAL NOT NULL,
    p99_score       REAL NOT NULL,
    alert_rate      REAL NOT NULL,
    feature_name    TEXT NOT NULL,
    feature_ks_stat REAL,
    feature_drift   INTEGER,
    drift_detected  INTEGER NOT NULL
);
";

/// One append-only row of the metrics log. The designated-feature columns
/// are None when that feature could not be measured for the run — an
/// unmeasured feature is never recorded as "statistic 0, no drift".
#[derive(Debug, Clone)]
pub struct MetricsLogEntry {
    pub run_id: String,
    pub logged_at: DateTime<Utc>,
    pub metrics: ScoreMetrics,
    pub alert_rate: f64,
    pub feature_name: String,
    pub feature_ks_stat: Option<f64>,
    pub feature_drift: Option<bool>,
    pub drift_detected: bool,
}

pub struct PipelineStore {
    conn: Connection,
}

impl PipelineStore {
    pub fn open(path: &str) -> PipelineResult<Self> {
        let conn = Connection::open(path)?;
        // WAL only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PipelineResult<Self> {
        Ok(Self {
            conn: Connection::open(":memory:")?,
        })
    }

    pub fn migrate(&self) -> PipelineResult<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Transactions ─────────────────────────────────────────────────────

    /// Append records in order; `seq` preserves ingest order.
    pub fn insert_transactions(&mut self, records: &[TransactionRecord]) -> PipelineResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO transactions
                   (card_id, ts_millis, amount, lat, long, merch_lat, merch_long, city_pop)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for r in records {
                stmt.execute(params![
                    r.card_id,
                    r.timestamp.timestamp_millis(),
                    r.amount,
                    r.lat,
                    r.long,
                    r.merch_lat,
                    r.merch_long,
                    r.city_pop,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// All transactions in ingest order.
    pub fn load_transactions(&self) -> PipelineResult<Vec<TransactionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT card_id, ts_millis, amount, lat, long, merch_lat, merch_long, city_pop
             FROM transactions ORDER BY seq",
        )?;
        let rows = stmt.query_map([], |row| {
            let millis: i64 = row.get(1)?;
            Ok(TransactionRecord {
                card_id: row.get(0)?,
                timestamp: Utc.timestamp_millis_opt(millis).single().unwrap_or_default(),
                amount: row.get(2)?,
                lat: row.get(3)?,
                long: row.get(4)?,
                merch_lat: row.get(5)?,
                merch_long: row.get(6)?,
                city_pop: row.get(7)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    // ── Feature sets ─────────────────────────────────────────────────────

    /// Persist a named feature set, replacing any prior version wholesale.
    /// The schema manifest is stored alongside the rows so a reload can
    /// never positionally misalign columns.
    pub fn save_feature_frame(&mut self, set_name: &str, frame: &FeatureFrame) -> PipelineResult<()> {
        let schema_json = serde_json::to_string(frame.schema())?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM feature_rows WHERE set_name = ?1",
            params![set_name],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO feature_sets (set_name, schema_json) VALUES (?1, ?2)",
            params![set_name, schema_json],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO feature_rows (set_name, row_idx, values_json) VALUES (?1, ?2, ?3)",
            )?;
            for (idx, row) in frame.rows().iter().enumerate() {
                stmt.execute(params![set_name, idx as i64, serde_json::to_string(row)?])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Load a named feature set. Absence is a fatal MissingArtifact.
    pub fn load_feature_frame(&self, set_name: &str) -> PipelineResult<FeatureFrame> {
        let schema_json: Option<String> = self
            .conn
            .query_row(
                "SELECT schema_json FROM feature_sets WHERE set_name = ?1",
                params![set_name],
                |row| row.get(0),
            )
            .optional()?;
        let schema_json = schema_json.ok_or_else(|| {
            PipelineError::missing("features", format!("no feature set named '{set_name}'"))
        })?;
        let schema: FeatureSchema = serde_json::from_str(&schema_json)?;

        let mut stmt = self.conn.prepare(
            "SELECT values_json FROM feature_rows WHERE set_name = ?1 ORDER BY row_idx",
        )?;
        let raw_rows = stmt.query_map(params![set_name], |row| row.get::<_, String>(0))?;
        let mut rows = Vec::new();
        for raw in raw_rows {
            rows.push(serde_json::from_str::<Vec<f64>>(&raw?)?);
        }
        FeatureFrame::with_rows(schema, rows)
    }

    // ── Score sets ───────────────────────────────────────────────────────

    pub fn save_scores(&mut self, set_name: &str, scores: &[f64]) -> PipelineResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM score_sets WHERE set_name = ?1",
            params![set_name],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO score_sets (set_name, row_idx, score) VALUES (?1, ?2, ?3)",
            )?;
            for (idx, s) in scores.iter().enumerate() {
                stmt.execute(params![set_name, idx as i64, s])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Load a named score set. An absent or empty set is a fatal
    /// MissingArtifact — a monitoring run cannot proceed without scores.
    pub fn load_scores(&self, set_name: &str) -> PipelineResult<Vec<f64>> {
        let mut stmt = self.conn.prepare(
            "SELECT score FROM score_sets WHERE set_name = ?1 ORDER BY row_idx",
        )?;
        let rows = stmt.query_map(params![set_name], |row| row.get::<_, f64>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        if out.is_empty() {
            return Err(PipelineError::missing(
                "scores",
                format!("no scores in set '{set_name}'"),
            ));
        }
        Ok(out)
    }

    // ── Fitted artifacts ─────────────────────────────────────────────────

    pub fn save_scaler(&self, scaler: &Scaler) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO scaler_params (id, params_json) VALUES (1, ?1)",
            params![serde_json::to_string(scaler)?],
        )?;
        Ok(())
    }

    pub fn load_scaler(&self) -> PipelineResult<Scaler> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT params_json FROM scaler_params WHERE id = 1", [], |r| {
                r.get(0)
            })
            .optional()?;
        let raw = raw.ok_or_else(|| PipelineError::missing("scaler", "no fitted scaler stored"))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save_baseline(&self, baseline: &ScoreBaseline) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO score_baseline (id, baseline_json) VALUES (1, ?1)",
            params![serde_json::to_string(baseline)?],
        )?;
        Ok(())
    }

    pub fn load_baseline(&self) -> PipelineResult<ScoreBaseline> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT baseline_json FROM score_baseline WHERE id = 1",
                [],
                |r| r.get(0),
            )
            .optional()?;
        let raw =
            raw.ok_or_else(|| PipelineError::missing("baseline", "no frozen score baseline"))?;
        Ok(serde_json::from_str(&raw)?)
    }

    // ── Metrics log ──────────────────────────────────────────────────────

    pub fn append_metrics(&self, entry: &MetricsLogEntry) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO metrics_log
               (run_id, logged_at, mean_score, std_score, p95_score, p99_score,
                alert_rate, feature_name, feature_ks_stat, feature_drift, drift_detected)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                entry.run_id,
                entry.logged_at.to_rfc3339(),
                entry.metrics.mean,
                entry.metrics.std,
                entry.metrics.p95,
                entry.metrics.p99,
                entry.alert_rate,
                entry.feature_name,
                entry.feature_ks_stat,
                entry.feature_drift.map(|d| d as i64),
                entry.drift_detected as i64,
            ],
        )?;
        Ok(())
    }

    pub fn metrics_log_count(&self) -> PipelineResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM metrics_log", [], |r| r.get(0))?;
        Ok(n)
    }

    /// Most recent metrics-log row, if any. Used for diagnostics and tests;
    /// the log itself is append-only.
    pub fn latest_metrics_entry(&self) -> PipelineResult<Option<MetricsLogEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT run_id, logged_at, mean_score, std_score, p95_score, p99_score,
                        alert_rate, feature_name, feature_ks_stat, feature_drift,
                        drift_detected
                 FROM metrics_log ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    let logged_at: String = row.get(1)?;
                    let feature_drift: Option<i64> = row.get(9)?;
                    let drift_detected: i64 = row.get(10)?;
                    Ok(MetricsLogEntry {
                        run_id: row.get(0)?,
                        logged_at: DateTime::parse_from_rfc3339(&logged_at)
                            .map(|t| t.with_timezone(&Utc))
                            .unwrap_or_default(),
                        metrics: ScoreMetrics {
                            mean: row.get(2)?,
                            std: row.get(3)?,
                            p95: row.get(4)?,
                            p99: row.get(5)?,
                        },
                        alert_rate: row.get(6)?,
                        feature_name: row.get(7)?,
                        feature_ks_stat: row.get(8)?,
                        feature_drift: feature_drift.map(|d| d != 0),
                        drift_detected: drift_detected != 0,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }
}
