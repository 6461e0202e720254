//! Workflow controller: drives a variant's step plan
//!
//! A run creates its record (INITIATED, then IN_PROGRESS), executes each
//! planned step through the [`StepExecutor`], and stops at the first
//! failure. There are no retries. The record is persisted as FAILED or
//! COMPLETED before the controller returns.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn};

use super::config::OrchestratorConfig;
use super::context::RunContext;
use super::error::{OrchestratorResult, WorkflowError};
use super::executor::{StepExecutor, StepReport, StepResult};
use super::record::WorkflowRecord;
use super::summary::{SummaryInput, synthesize_summary};
use super::types::{StepName, StepStatus, WorkflowStatus, WorkflowType};
use crate::collaborators::{
    CollaboratorError, CollaboratorResult, DictionaryGenerator, DictionaryResult, Mapper,
    MappingResult, MappingTarget, ProfileResult, Profiler, StepParameters, TargetLocation,
    dictionary_parameters, mapping_parameters, profiling_parameters,
};
use crate::llm::CompletionClient;
use crate::store::{
    ExecutionLog, ExecutionLogEntry, MetricsSink, WorkflowFilter, WorkflowStats, WorkflowStore,
};

/// The three stage collaborators a controller calls
#[derive(Clone)]
pub struct Collaborators {
    pub profiler: Arc<dyn Profiler>,
    pub dictionary: Arc<dyn DictionaryGenerator>,
    pub mapper: Arc<dyn Mapper>,
}

impl Collaborators {
    pub fn new(
        profiler: Arc<dyn Profiler>,
        dictionary: Arc<dyn DictionaryGenerator>,
        mapper: Arc<dyn Mapper>,
    ) -> Self {
        Self {
            profiler,
            dictionary,
            mapper,
        }
    }

    /// Use one client for every stage
    pub fn shared<C>(client: Arc<C>) -> Self
    where
        C: Profiler + DictionaryGenerator + Mapper + 'static,
    {
        Self {
            profiler: client.clone(),
            dictionary: client.clone(),
            mapper: client,
        }
    }
}

/// Parameters of a workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub workflow_type: WorkflowType,
    /// Input location (e.g. a stage path)
    pub source_reference: String,
    /// Mapping target schema; the configured default when absent
    pub target_schema: Option<String>,
    /// Mapping target table; chosen by the mapper when absent
    pub target_table: Option<String>,
}

impl WorkflowRequest {
    pub fn new(workflow_type: WorkflowType, source_reference: impl Into<String>) -> Self {
        Self {
            workflow_type,
            source_reference: source_reference.into(),
            target_schema: None,
            target_table: None,
        }
    }

    pub fn with_target_schema(mut self, schema: impl Into<String>) -> Self {
        self.target_schema = Some(schema.into());
        self
    }

    pub fn with_target_table(mut self, table: impl Into<String>) -> Self {
        self.target_table = Some(table.into());
        self
    }
}

/// Result of a workflow run, as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub workflow_type: WorkflowType,
    pub status: WorkflowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiling: Option<ProfileResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<DictionaryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<MappingResult>,
    pub step_results: Vec<StepReport>,
    pub step_sequence: Vec<StepName>,
    pub total_duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowResult {
    pub fn is_success(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }
}

/// Typed outputs of the steps that have succeeded so far
#[derive(Default)]
struct StageOutputs {
    profile: Option<ProfileResult>,
    dictionary: Option<DictionaryResult>,
    mapping: Option<MappingResult>,
}

enum RunOutcome {
    Completed(WorkflowResult),
    Failed {
        result: WorkflowResult,
        error: WorkflowError,
    },
}

/// Drives workflow runs and answers status queries
pub struct WorkflowController {
    config: OrchestratorConfig,
    store: Arc<dyn WorkflowStore>,
    log: Arc<dyn ExecutionLog>,
    metrics: Arc<dyn MetricsSink>,
    collaborators: Collaborators,
    completion: Option<Arc<dyn CompletionClient>>,
}

impl WorkflowController {
    /// Create a controller persisting records, log entries and metrics in one store
    pub fn new<S>(config: OrchestratorConfig, store: Arc<S>, collaborators: Collaborators) -> Self
    where
        S: WorkflowStore + ExecutionLog + MetricsSink + 'static,
    {
        Self {
            config,
            store: store.clone(),
            log: store.clone(),
            metrics: store,
            collaborators,
            completion: None,
        }
    }

    /// Use a separate execution log
    pub fn with_execution_log(mut self, log: Arc<dyn ExecutionLog>) -> Self {
        self.log = log;
        self
    }

    /// Use a separate metrics sink
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Generate summaries with a completion backend
    pub fn with_completion_client(mut self, client: Option<Arc<dyn CompletionClient>>) -> Self {
        self.completion = client;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run a workflow given its type name.
    ///
    /// Fails with `UnknownWorkflowType` before any record is created when the
    /// name does not parse.
    pub fn run(
        &self,
        workflow_type: &str,
        source_reference: &str,
        target_reference: &str,
    ) -> OrchestratorResult<WorkflowResult> {
        let workflow_type = parse_workflow_type(workflow_type)?;
        self.execute(
            WorkflowRequest::new(workflow_type, source_reference)
                .with_target_schema(target_reference),
        )
    }

    /// Run a workflow. A step failure is returned as `StepFailure` after the
    /// record has been persisted as FAILED.
    pub fn execute(&self, request: WorkflowRequest) -> OrchestratorResult<WorkflowResult> {
        match self.drive(request)? {
            RunOutcome::Completed(result) => Ok(result),
            RunOutcome::Failed { error, .. } => Err(error),
        }
    }

    /// Start a workflow and report its outcome as a result value.
    ///
    /// Unlike [`execute`](Self::execute), a step failure yields a FAILED
    /// result carrying the error text; only errors raised before any step
    /// runs are returned as `Err`.
    pub fn start_workflow(
        &self,
        source_reference: &str,
        target_schema: Option<&str>,
        target_table: Option<&str>,
        workflow_type: &str,
    ) -> OrchestratorResult<WorkflowResult> {
        let request = WorkflowRequest {
            workflow_type: parse_workflow_type(workflow_type)?,
            source_reference: source_reference.to_string(),
            target_schema: target_schema.map(str::to_string),
            target_table: target_table.map(str::to_string),
        };
        match self.drive(request)? {
            RunOutcome::Completed(result) | RunOutcome::Failed { result, .. } => Ok(result),
        }
    }

    /// Get the record of a workflow
    pub fn get_workflow_status(&self, workflow_id: &str) -> OrchestratorResult<WorkflowRecord> {
        self.store
            .get_workflow(workflow_id)?
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))
    }

    /// Most recent workflows, newest first
    pub fn list_recent_workflows(&self, limit: usize) -> OrchestratorResult<Vec<WorkflowRecord>> {
        Ok(self.store.list_workflows(&WorkflowFilter::recent(limit))?)
    }

    /// Workflows filtered by status and start time, newest first
    pub fn list_workflows_filtered(
        &self,
        statuses: &[WorkflowStatus],
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> OrchestratorResult<Vec<WorkflowRecord>> {
        let filter = WorkflowFilter::recent(limit)
            .with_statuses(statuses.to_vec())
            .with_since(since);
        Ok(self.store.list_workflows(&filter)?)
    }

    /// Execution log entries of a workflow in start order
    pub fn list_executions(&self, workflow_id: &str) -> OrchestratorResult<Vec<ExecutionLogEntry>> {
        self.get_workflow_status(workflow_id)?;
        Ok(self.log.list_executions(workflow_id)?)
    }

    /// Aggregate counts over workflows started since the given time
    pub fn workflow_stats(&self, since: Option<DateTime<Utc>>) -> OrchestratorResult<WorkflowStats> {
        Ok(self.store.workflow_stats(since)?)
    }

    /// Close workflows left non-terminal for longer than `older_than`
    pub fn reconcile_orphaned(&self, older_than: chrono::Duration) -> OrchestratorResult<Vec<String>> {
        let cutoff = Utc::now() - older_than;
        let closed = self.store.reconcile_orphaned(cutoff)?;
        if !closed.is_empty() {
            info!(count = closed.len(), "Reconciled orphaned workflows");
        }
        Ok(closed)
    }

    fn drive(&self, request: WorkflowRequest) -> OrchestratorResult<RunOutcome> {
        let workflow_type = request.workflow_type;
        if let Some(reason) = workflow_type.unsupported_reason() {
            return Err(WorkflowError::NotImplemented {
                workflow_type: workflow_type.to_string(),
                reason: reason.to_string(),
            });
        }

        let target = request
            .target_schema
            .unwrap_or_else(|| self.config.default_target_schema.clone());
        let mut record = WorkflowRecord::new(workflow_type, request.source_reference, target)
            .with_target_table(request.target_table)
            .with_initiated_by(self.config.effective_initiated_by());
        self.store.create_workflow(&record)?;

        record.start()?;
        self.persist(&record);

        let ctx = RunContext::from_record(&record);
        let _span = info_span!(
            "workflow_run",
            workflow_id = %ctx.workflow_id(),
            workflow_type = workflow_type.as_str()
        )
        .entered();
        info!(
            source = %ctx.source_reference(),
            target = %ctx.target_reference(),
            plan = ?workflow_type.plan(),
            "Starting workflow"
        );

        let executor = StepExecutor::new(self.log.clone(), self.metrics.clone());
        let started = Instant::now();
        let mut outputs = StageOutputs::default();
        let mut reports = Vec::with_capacity(workflow_type.plan().len());

        for &step in workflow_type.plan() {
            record.record_step(step)?;
            self.persist(&record);

            let report = self.run_step(&executor, &ctx, step, &mut outputs);
            let failure = (report.status == StepStatus::Failure)
                .then(|| report.error.clone().unwrap_or_default());
            reports.push(report);

            if let Some(message) = failure {
                record.fail(&message)?;
                self.persist(&record);
                error!(step = step.as_str(), error = %message, "Workflow failed");

                let result = WorkflowResult {
                    workflow_id: record.workflow_id.clone(),
                    workflow_type,
                    status: record.status,
                    profiling: None,
                    dictionary: None,
                    mapping: None,
                    step_results: reports,
                    step_sequence: record.step_sequence.clone(),
                    total_duration_seconds: record.duration_seconds.unwrap_or_default(),
                    summary: None,
                    error: Some(message.clone()),
                };
                return Ok(RunOutcome::Failed {
                    result,
                    error: WorkflowError::step_failure(&record.workflow_id, step, message),
                });
            }
        }

        let elapsed = started.elapsed();
        let summary = synthesize_summary(
            self.completion.as_deref(),
            &SummaryInput {
                profiling: outputs.profile.as_ref().and_then(|p| p.summary.as_deref()),
                dictionary: outputs.dictionary.as_ref().and_then(|d| d.summary.as_deref()),
                mapping: outputs.mapping.as_ref().and_then(|m| m.summary.as_deref()),
                steps_executed: record.step_sequence.len(),
                total_duration_seconds: elapsed.as_secs_f64(),
            },
        );

        record.complete()?;
        self.persist(&record);
        let total_duration_seconds = record.duration_seconds.unwrap_or_default();
        info!(
            duration_seconds = total_duration_seconds,
            steps = record.step_sequence.len(),
            "Workflow completed"
        );

        Ok(RunOutcome::Completed(WorkflowResult {
            workflow_id: record.workflow_id.clone(),
            workflow_type,
            status: record.status,
            profiling: outputs.profile,
            dictionary: outputs.dictionary,
            mapping: outputs.mapping,
            step_results: reports,
            step_sequence: record.step_sequence.clone(),
            total_duration_seconds,
            summary: Some(summary),
            error: None,
        }))
    }

    /// Run one step, feeding it the previous step's output
    fn run_step(
        &self,
        executor: &StepExecutor,
        ctx: &RunContext,
        step: StepName,
        outputs: &mut StageOutputs,
    ) -> StepReport {
        let config = &self.config;
        match step {
            StepName::Profiling => {
                let params = profiling_parameters(
                    ctx.source_reference(),
                    config.sample_size,
                    &config.file_format,
                );
                let result = executor.run_step(ctx, step, &params, |_| {
                    self.collaborators.profiler.profile(
                        ctx.source_reference(),
                        config.sample_size,
                        &config.file_format,
                    )
                });
                settle(result, &mut outputs.profile)
            }
            StepName::Dictionary => {
                let target = TargetLocation {
                    database: config.target_database.clone(),
                    schema: config.staging_schema.clone(),
                };
                let (params, profile) =
                    prepare(outputs.profile.as_ref(), StepName::Profiling, |p| {
                        dictionary_parameters(p, &target)
                    });
                let result = executor.run_step(ctx, step, &params, |_| {
                    self.collaborators.dictionary.generate_ddl(profile?, &target)
                });
                settle(result, &mut outputs.dictionary)
            }
            StepName::Mapping => {
                let target = MappingTarget::new(
                    ctx.target_reference(),
                    ctx.target_table().map(str::to_string),
                );
                let (params, dictionary) =
                    prepare(outputs.dictionary.as_ref(), StepName::Dictionary, |d| {
                        mapping_parameters(d, &target)
                    });
                let result = executor.run_step(ctx, step, &params, |_| {
                    self.collaborators.mapper.generate_mappings(dictionary?, &target)
                });
                settle(result, &mut outputs.mapping)
            }
        }
    }

    /// Persist a record after creation; failures are logged, not raised
    fn persist(&self, record: &WorkflowRecord) {
        if let Err(e) = self.store.update_workflow(record) {
            warn!(
                workflow_id = %record.workflow_id,
                status = %record.status,
                error = %e,
                "Failed to persist workflow record"
            );
        }
    }
}

fn parse_workflow_type(name: &str) -> OrchestratorResult<WorkflowType> {
    name.parse()
        .map_err(|_| WorkflowError::UnknownWorkflowType(name.to_string()))
}

/// Build a step's parameters from the previous step's output.
///
/// When the output is missing the step still runs through the executor, so
/// the attempt is logged, and fails with `MissingInput`.
fn prepare<'a, I>(
    input: Option<&'a I>,
    producer: StepName,
    build: impl FnOnce(&I) -> CollaboratorResult<StepParameters>,
) -> (StepParameters, CollaboratorResult<&'a I>) {
    match input {
        Some(value) => match build(value) {
            Ok(params) => (params, Ok(value)),
            Err(e) => (StepParameters::new(), Err(e)),
        },
        None => (
            StepParameters::new(),
            Err(CollaboratorError::MissingInput(format!(
                "{} output is not available",
                producer
            ))),
        ),
    }
}

fn settle<T>(result: StepResult<T>, slot: &mut Option<T>) -> StepReport {
    let (report, payload) = result.into_parts();
    *slot = payload;
    report
}
