//! Database schema definitions for workflow tables

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Schema for the workflow database
pub struct StoreSchema;

impl StoreSchema {
    /// Get the DDL for creating all workflow tables (DuckDB syntax)
    ///
    /// Timestamps are RFC 3339 strings with fixed microsecond precision so
    /// that lexical order matches chronological order.
    pub fn create_tables_duckdb() -> &'static str {
        r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_info (
    key VARCHAR PRIMARY KEY,
    value VARCHAR NOT NULL
);

-- One row per top-level workflow run
CREATE TABLE IF NOT EXISTS workflow_executions (
    workflow_id VARCHAR PRIMARY KEY,
    workflow_type VARCHAR NOT NULL,
    status VARCHAR NOT NULL,
    source_reference VARCHAR NOT NULL,
    target_reference VARCHAR NOT NULL,
    target_table VARCHAR,
    initiated_by VARCHAR,
    start_time VARCHAR NOT NULL,
    end_time VARCHAR,
    duration_seconds DOUBLE,
    step_sequence VARCHAR NOT NULL,
    error_message VARCHAR
);

-- One row per step attempt
CREATE TABLE IF NOT EXISTS step_execution_log (
    execution_id VARCHAR PRIMARY KEY,
    workflow_id VARCHAR NOT NULL,
    step_name VARCHAR NOT NULL,
    status VARCHAR NOT NULL,
    input_snapshot VARCHAR NOT NULL,
    output_snapshot VARCHAR,
    start_time VARCHAR NOT NULL,
    end_time VARCHAR,
    duration_seconds DOUBLE,
    error_message VARCHAR
);

-- Best-effort metric observations
CREATE TABLE IF NOT EXISTS step_metrics (
    step_name VARCHAR NOT NULL,
    execution_id VARCHAR NOT NULL,
    metric_type VARCHAR NOT NULL,
    metric_value DOUBLE NOT NULL,
    metric_unit VARCHAR NOT NULL,
    outcome VARCHAR NOT NULL,
    recorded_at VARCHAR NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_workflows_status ON workflow_executions(status);
CREATE INDEX IF NOT EXISTS idx_workflows_start ON workflow_executions(start_time);
CREATE INDEX IF NOT EXISTS idx_executions_workflow ON step_execution_log(workflow_id);
CREATE INDEX IF NOT EXISTS idx_metrics_execution ON step_metrics(execution_id);
"#
    }

    /// Get the SQL to drop all tables
    pub fn drop_tables() -> &'static str {
        r#"
DROP TABLE IF EXISTS step_metrics;
DROP TABLE IF EXISTS step_execution_log;
DROP TABLE IF EXISTS workflow_executions;
DROP TABLE IF EXISTS schema_info;
"#
    }

    /// Get the SELECT statement for schema version
    pub fn select_schema_version() -> &'static str {
        "SELECT value FROM schema_info WHERE key = 'version'"
    }
}
