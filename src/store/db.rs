//! DuckDB-backed workflow store

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};

use super::error::{StoreError, StoreResult};
use super::log::{ExecutionLog, ExecutionLogEntry};
use super::metrics::{MetricsSink, StepMetric};
use super::schema::{SCHEMA_VERSION, StoreSchema};
use super::{WorkflowFilter, WorkflowStats, WorkflowStore, success_rate};
use crate::workflow::{StepName, WorkflowRecord};

const WORKFLOW_COLUMNS: &str = "workflow_id, workflow_type, status, source_reference, \
     target_reference, target_table, initiated_by, start_time, end_time, duration_seconds, \
     step_sequence, error_message";

const EXECUTION_COLUMNS: &str = "execution_id, workflow_id, step_name, status, input_snapshot, \
     output_snapshot, start_time, end_time, duration_seconds, error_message";

/// Workflow store persisted in an embedded DuckDB database
///
/// The connection is guarded by a mutex, so concurrent runs sharing one
/// store get atomic per-row inserts and updates.
pub struct DuckDbStore {
    conn: Mutex<duckdb::Connection>,
    path: Option<String>,
}

impl DuckDbStore {
    /// Open or create a workflow database at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = duckdb::Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.display().to_string()),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn memory() -> StoreResult<Self> {
        let conn = duckdb::Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Open an existing database and verify its schema
    pub fn open_initialized(path: impl AsRef<Path>) -> StoreResult<Self> {
        let store = Self::open(path)?;
        store.check_schema()?;
        Ok(store)
    }

    /// Get the database path (if not in-memory)
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Initialize the database schema, optionally dropping existing tables
    pub fn init(&self, force: bool) -> StoreResult<()> {
        let conn = self.conn.lock()?;
        if force {
            conn.execute_batch(StoreSchema::drop_tables())?;
        }
        conn.execute_batch(StoreSchema::create_tables_duckdb())?;
        conn.execute(
            "INSERT INTO schema_info (key, value) VALUES ('version', ?1)
             ON CONFLICT (key) DO UPDATE SET value = ?1",
            [SCHEMA_VERSION.to_string()],
        )?;
        Ok(())
    }

    /// Check if the database is initialized
    pub fn is_initialized(&self) -> StoreResult<bool> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row(
            "SELECT CAST(COUNT(*) AS BIGINT) FROM information_schema.tables
             WHERE table_name = 'workflow_executions'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get the schema version
    pub fn schema_version(&self) -> StoreResult<i32> {
        let conn = self.conn.lock()?;
        let version: String =
            conn.query_row(StoreSchema::select_schema_version(), [], |row| row.get(0))?;
        version
            .parse()
            .map_err(|_| StoreError::Database(format!("Invalid schema version: {version}")))
    }

    /// Fail unless the schema exists at the current version
    pub fn check_schema(&self) -> StoreResult<()> {
        if !self.is_initialized()? {
            return Err(StoreError::NotInitialized);
        }
        let found = self.schema_version()?;
        if found != SCHEMA_VERSION {
            return Err(StoreError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found,
            });
        }
        Ok(())
    }
}

impl WorkflowStore for DuckDbStore {
    fn create_workflow(&self, record: &WorkflowRecord) -> StoreResult<()> {
        let step_sequence = serde_json::to_string(&record.step_sequence)?;
        let conn = self.conn.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO workflow_executions ({WORKFLOW_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            duckdb::params![
                record.workflow_id,
                record.workflow_type.as_str(),
                record.status.as_str(),
                record.source_reference,
                record.target_reference,
                record.target_table.as_deref(),
                record.initiated_by.as_deref(),
                timestamp(&record.start_time),
                record.end_time.as_ref().map(timestamp),
                record.duration_seconds,
                step_sequence,
                record.error_message.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn update_workflow(&self, record: &WorkflowRecord) -> StoreResult<()> {
        let step_sequence = serde_json::to_string(&record.step_sequence)?;
        let conn = self.conn.lock()?;
        let updated = conn.execute(
            "UPDATE workflow_executions SET
                status = ?2, target_table = ?3, end_time = ?4, duration_seconds = ?5,
                step_sequence = ?6, error_message = ?7
             WHERE workflow_id = ?1 AND status NOT IN ('COMPLETED', 'FAILED')",
            duckdb::params![
                record.workflow_id,
                record.status.as_str(),
                record.target_table.as_deref(),
                record.end_time.as_ref().map(timestamp),
                record.duration_seconds,
                step_sequence,
                record.error_message.as_deref(),
            ],
        )?;
        if updated > 0 {
            return Ok(());
        }

        let current = conn.query_row(
            "SELECT status FROM workflow_executions WHERE workflow_id = ?1",
            [&record.workflow_id],
            |row| row.get::<_, String>(0),
        );
        match current {
            Ok(status) => Err(StoreError::AlreadyTerminal {
                workflow_id: record.workflow_id.clone(),
                status: status.parse().map_err(StoreError::Serialization)?,
            }),
            Err(duckdb::Error::QueryReturnedNoRows) => {
                Err(StoreError::not_found("Workflow", &record.workflow_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_workflow(&self, workflow_id: &str) -> StoreResult<Option<WorkflowRecord>> {
        let conn = self.conn.lock()?;
        let result = conn.query_row(
            &format!("SELECT {WORKFLOW_COLUMNS} FROM workflow_executions WHERE workflow_id = ?1"),
            [workflow_id],
            WorkflowRow::from_row,
        );

        match result {
            Ok(row) => Ok(Some(row.decode()?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_workflows(&self, filter: &WorkflowFilter) -> StoreResult<Vec<WorkflowRecord>> {
        let mut sql = format!("SELECT {WORKFLOW_COLUMNS} FROM workflow_executions WHERE 1 = 1");
        let mut params: Vec<String> = Vec::new();

        if !filter.statuses.is_empty() {
            let placeholders = vec!["?"; filter.statuses.len()].join(", ");
            sql.push_str(&format!(" AND status IN ({placeholders})"));
            params.extend(filter.statuses.iter().map(|s| s.as_str().to_string()));
        }
        if let Some(since) = &filter.since {
            sql.push_str(" AND start_time >= ?");
            params.push(timestamp(since));
        }
        if let Some(before) = &filter.started_before {
            sql.push_str(" AND start_time < ?");
            params.push(timestamp(before));
        }
        sql.push_str(" ORDER BY start_time DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(duckdb::params_from_iter(params.iter()), WorkflowRow::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.decode()?);
        }
        Ok(records)
    }

    fn workflow_stats(&self, since: Option<DateTime<Utc>>) -> StoreResult<WorkflowStats> {
        let mut sql = String::from(
            "SELECT
                CAST(COUNT(*) AS BIGINT),
                CAST(COALESCE(SUM(CASE WHEN status = 'COMPLETED' THEN 1 ELSE 0 END), 0) AS BIGINT),
                CAST(COALESCE(SUM(CASE WHEN status = 'FAILED' THEN 1 ELSE 0 END), 0) AS BIGINT),
                CAST(COALESCE(SUM(CASE WHEN status IN ('INITIATED', 'IN_PROGRESS') THEN 1 ELSE 0 END), 0) AS BIGINT),
                AVG(duration_seconds)
             FROM workflow_executions",
        );
        let mut params: Vec<String> = Vec::new();
        if let Some(since) = &since {
            sql.push_str(" WHERE start_time >= ?");
            params.push(timestamp(since));
        }

        let conn = self.conn.lock()?;
        let (total, completed, failed, in_progress, average) = conn.query_row(
            &sql,
            duckdb::params_from_iter(params.iter()),
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                ))
            },
        )?;

        let total = total.max(0) as u64;
        let completed = completed.max(0) as u64;
        Ok(WorkflowStats {
            total,
            completed,
            failed: failed.max(0) as u64,
            in_progress: in_progress.max(0) as u64,
            average_duration_seconds: average,
            success_rate: success_rate(completed, total),
        })
    }
}

impl ExecutionLog for DuckDbStore {
    fn append(&self, entry: &ExecutionLogEntry) -> StoreResult<()> {
        let input = serde_json::to_string(&entry.input_snapshot)?;
        let output = entry
            .output_snapshot
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conn = self.conn.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO step_execution_log ({EXECUTION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            duckdb::params![
                entry.execution_id,
                entry.workflow_id,
                entry.step_name.as_str(),
                entry.status.as_str(),
                input,
                output,
                timestamp(&entry.start_time),
                entry.end_time.as_ref().map(timestamp),
                entry.duration_seconds,
                entry.error_message.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn update(&self, entry: &ExecutionLogEntry) -> StoreResult<()> {
        let output = entry
            .output_snapshot
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conn = self.conn.lock()?;
        let updated = conn.execute(
            "UPDATE step_execution_log SET
                status = ?2, output_snapshot = ?3, end_time = ?4,
                duration_seconds = ?5, error_message = ?6
             WHERE execution_id = ?1",
            duckdb::params![
                entry.execution_id,
                entry.status.as_str(),
                output,
                entry.end_time.as_ref().map(timestamp),
                entry.duration_seconds,
                entry.error_message.as_deref(),
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::not_found("Execution", &entry.execution_id));
        }
        Ok(())
    }

    fn list_executions(&self, workflow_id: &str) -> StoreResult<Vec<ExecutionLogEntry>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EXECUTION_COLUMNS} FROM step_execution_log
             WHERE workflow_id = ?1
             ORDER BY start_time ASC"
        ))?;
        let rows = stmt.query_map([workflow_id], ExecutionRow::from_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.decode()?);
        }
        Ok(entries)
    }
}

impl DuckDbStore {
    /// Metric observations of one step execution, in recording order
    pub fn list_metrics(&self, execution_id: &str) -> StoreResult<Vec<StepMetric>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT step_name, execution_id, metric_type, metric_value, outcome, recorded_at
             FROM step_metrics WHERE execution_id = ?1 ORDER BY recorded_at, metric_type",
        )?;
        let rows = stmt.query_map([execution_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut metrics = Vec::new();
        for row in rows {
            let (step_name, execution_id, kind, value, outcome, recorded_at) = row?;
            metrics.push(StepMetric {
                step_name: step_name.parse().map_err(StoreError::Serialization)?,
                execution_id,
                kind: kind.parse().map_err(StoreError::Serialization)?,
                value,
                outcome: outcome.parse().map_err(StoreError::Serialization)?,
                recorded_at: parse_timestamp(&recorded_at)?,
            });
        }
        Ok(metrics)
    }
}

impl MetricsSink for DuckDbStore {
    fn record(&self, metric: &StepMetric) -> StoreResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO step_metrics
                (step_name, execution_id, metric_type, metric_value, metric_unit, outcome, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            duckdb::params![
                metric.step_name.as_str(),
                metric.execution_id,
                metric.kind.as_str(),
                metric.value,
                metric.kind.unit(),
                metric.outcome.as_str(),
                timestamp(&metric.recorded_at),
            ],
        )?;
        Ok(())
    }
}

/// Raw workflow row as stored
struct WorkflowRow {
    workflow_id: String,
    workflow_type: String,
    status: String,
    source_reference: String,
    target_reference: String,
    target_table: Option<String>,
    initiated_by: Option<String>,
    start_time: String,
    end_time: Option<String>,
    duration_seconds: Option<f64>,
    step_sequence: String,
    error_message: Option<String>,
}

impl WorkflowRow {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            workflow_id: row.get(0)?,
            workflow_type: row.get(1)?,
            status: row.get(2)?,
            source_reference: row.get(3)?,
            target_reference: row.get(4)?,
            target_table: row.get(5)?,
            initiated_by: row.get(6)?,
            start_time: row.get(7)?,
            end_time: row.get(8)?,
            duration_seconds: row.get(9)?,
            step_sequence: row.get(10)?,
            error_message: row.get(11)?,
        })
    }

    fn decode(self) -> StoreResult<WorkflowRecord> {
        let step_sequence: Vec<StepName> = serde_json::from_str(&self.step_sequence)?;
        Ok(WorkflowRecord {
            workflow_type: self.workflow_type.parse().map_err(StoreError::Serialization)?,
            status: self.status.parse().map_err(StoreError::Serialization)?,
            source_reference: self.source_reference,
            target_reference: self.target_reference,
            target_table: self.target_table,
            initiated_by: self.initiated_by,
            start_time: parse_timestamp(&self.start_time)?,
            end_time: self.end_time.as_deref().map(parse_timestamp).transpose()?,
            duration_seconds: self.duration_seconds,
            step_sequence,
            error_message: self.error_message,
            workflow_id: self.workflow_id,
        })
    }
}

/// Raw execution log row as stored
struct ExecutionRow {
    execution_id: String,
    workflow_id: String,
    step_name: String,
    status: String,
    input_snapshot: String,
    output_snapshot: Option<String>,
    start_time: String,
    end_time: Option<String>,
    duration_seconds: Option<f64>,
    error_message: Option<String>,
}

impl ExecutionRow {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            execution_id: row.get(0)?,
            workflow_id: row.get(1)?,
            step_name: row.get(2)?,
            status: row.get(3)?,
            input_snapshot: row.get(4)?,
            output_snapshot: row.get(5)?,
            start_time: row.get(6)?,
            end_time: row.get(7)?,
            duration_seconds: row.get(8)?,
            error_message: row.get(9)?,
        })
    }

    fn decode(self) -> StoreResult<ExecutionLogEntry> {
        Ok(ExecutionLogEntry {
            execution_id: self.execution_id,
            workflow_id: self.workflow_id,
            step_name: self.step_name.parse().map_err(StoreError::Serialization)?,
            status: self.status.parse().map_err(StoreError::Serialization)?,
            input_snapshot: serde_json::from_str(&self.input_snapshot)?,
            output_snapshot: self
                .output_snapshot
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            start_time: parse_timestamp(&self.start_time)?,
            end_time: self.end_time.as_deref().map(parse_timestamp).transpose()?,
            duration_seconds: self.duration_seconds,
            error_message: self.error_message,
        })
    }
}

fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("Invalid timestamp '{value}': {e}")))
}
