//! Integration tests for workflow runs against the in-memory store

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use onboarding_orchestrator::collaborators::{
    AUTO_TABLE, CollaboratorError, CollaboratorResult, DictionaryGenerator, DictionaryResult,
    Mapper, MappingResult, MappingTarget, ProfileResult, Profiler, TargetLocation,
};
use onboarding_orchestrator::llm::{CompletionClient, LlmError, LlmResult};
use onboarding_orchestrator::store::{
    ExecutionLog, ExecutionLogEntry, MemoryStore, MetricsSink, ORPHANED_MESSAGE, StepMetric,
    StoreError, StoreResult, WorkflowStore,
};
use onboarding_orchestrator::workflow::{
    Collaborators, ExecutionStatus, OrchestratorConfig, StepName, StepStatus, WorkflowController,
    WorkflowError, WorkflowRecord, WorkflowRequest, WorkflowStatus, WorkflowType,
};

/// Stage stub with call counters and an optional failing step
#[derive(Default)]
struct StubStages {
    profile_calls: AtomicUsize,
    dictionary_calls: AtomicUsize,
    mapping_calls: AtomicUsize,
    fail_at: Option<StepName>,
    delay: Duration,
    seen_profile: Mutex<Option<ProfileResult>>,
    seen_location: Mutex<Option<TargetLocation>>,
    seen_target: Mutex<Option<MappingTarget>>,
}

impl StubStages {
    fn failing_at(step: StepName) -> Self {
        Self {
            fail_at: Some(step),
            ..Default::default()
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> [usize; 3] {
        [
            self.profile_calls.load(Ordering::SeqCst),
            self.dictionary_calls.load(Ordering::SeqCst),
            self.mapping_calls.load(Ordering::SeqCst),
        ]
    }

    fn enter(&self, step: StepName, counter: &AtomicUsize) -> CollaboratorResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        if self.fail_at == Some(step) {
            Err(CollaboratorError::procedure(
                step.procedure(),
                format!("{} stage unavailable", step.as_str()),
            ))
        } else {
            Ok(())
        }
    }
}

impl Profiler for StubStages {
    fn profile(
        &self,
        source_reference: &str,
        _sample_size: u64,
        _file_format: &str,
    ) -> CollaboratorResult<ProfileResult> {
        self.enter(StepName::Profiling, &self.profile_calls)?;
        Ok(ProfileResult {
            profile_id: Some("profile-1".to_string()),
            summary: Some(format!("Profiled {source_reference}")),
            ..Default::default()
        })
    }
}

impl DictionaryGenerator for StubStages {
    fn generate_ddl(
        &self,
        profile: &ProfileResult,
        target: &TargetLocation,
    ) -> CollaboratorResult<DictionaryResult> {
        self.enter(StepName::Dictionary, &self.dictionary_calls)?;
        *self.seen_profile.lock().unwrap() = Some(profile.clone());
        *self.seen_location.lock().unwrap() = Some(target.clone());
        Ok(DictionaryResult {
            ddl_text: "CREATE TABLE CUSTOMERS (ID NUMBER)".to_string(),
            table_name: Some("CUSTOMERS".to_string()),
            enrichment_status: true,
            summary: Some("1 column documented".to_string()),
            ..Default::default()
        })
    }
}

impl Mapper for StubStages {
    fn generate_mappings(
        &self,
        _dictionary: &DictionaryResult,
        target: &MappingTarget,
    ) -> CollaboratorResult<MappingResult> {
        self.enter(StepName::Mapping, &self.mapping_calls)?;
        *self.seen_target.lock().unwrap() = Some(target.clone());
        Ok(MappingResult {
            confidence_score: Some(0.92),
            summary: Some("1 field mapped".to_string()),
            ..Default::default()
        })
    }
}

/// Log and metrics sink that rejects every write
struct BrokenSink;

impl ExecutionLog for BrokenSink {
    fn append(&self, _entry: &ExecutionLogEntry) -> StoreResult<()> {
        Err(StoreError::Database("log unavailable".to_string()))
    }

    fn update(&self, _entry: &ExecutionLogEntry) -> StoreResult<()> {
        Err(StoreError::Database("log unavailable".to_string()))
    }

    fn list_executions(&self, _workflow_id: &str) -> StoreResult<Vec<ExecutionLogEntry>> {
        Ok(Vec::new())
    }
}

impl MetricsSink for BrokenSink {
    fn record(&self, _metric: &StepMetric) -> StoreResult<()> {
        Err(StoreError::Database("metrics unavailable".to_string()))
    }
}

struct FixedCompletion(LlmResult<String>);

impl CompletionClient for FixedCompletion {
    fn complete(&self, _prompt: &str) -> LlmResult<String> {
        match &self.0 {
            Ok(text) => Ok(text.clone()),
            Err(_) => Err(LlmError::EmptyCompletion("fixed".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

/// Completion backend that answers after a delay
struct SlowCompletion(Duration);

impl CompletionClient for SlowCompletion {
    fn complete(&self, _prompt: &str) -> LlmResult<String> {
        std::thread::sleep(self.0);
        Ok("Slow but fine.".to_string())
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

struct PanickingCompletion;

impl CompletionClient for PanickingCompletion {
    fn complete(&self, _prompt: &str) -> LlmResult<String> {
        panic!("model runtime aborted")
    }

    fn model_name(&self) -> &str {
        "panicking"
    }
}

fn setup(stages: StubStages) -> (WorkflowController, Arc<MemoryStore>, Arc<StubStages>) {
    let store = Arc::new(MemoryStore::new());
    let stages = Arc::new(stages);
    let config = OrchestratorConfig::new().with_initiated_by("tester");
    let controller =
        WorkflowController::new(config, store.clone(), Collaborators::shared(stages.clone()));
    (controller, store, stages)
}

fn onboarding(source: &str) -> WorkflowRequest {
    WorkflowRequest::new(WorkflowType::Onboarding, source).with_target_schema("CURATED")
}

#[test]
fn test_onboarding_runs_full_plan() {
    let (controller, store, stages) = setup(StubStages::default());

    let result = controller
        .execute(onboarding("@RAW_STAGE/customers.csv"))
        .unwrap();

    assert_eq!(result.status, WorkflowStatus::Completed);
    assert_eq!(
        result.step_sequence,
        vec![StepName::Profiling, StepName::Dictionary, StepName::Mapping]
    );
    assert_eq!(stages.calls(), [1, 1, 1]);
    assert!(result.profiling.is_some());
    assert!(result.dictionary.is_some());
    assert_eq!(result.mapping.as_ref().unwrap().confidence_score, Some(0.92));
    assert_eq!(
        result.summary.as_deref(),
        Some("Workflow completed with 3 steps executed.")
    );
    assert!(result.error.is_none());
    assert!(result.is_success());

    let record = controller.get_workflow_status(&result.workflow_id).unwrap();
    assert_eq!(record.status, WorkflowStatus::Completed);
    assert_eq!(record.step_sequence, result.step_sequence);
    assert_eq!(record.initiated_by.as_deref(), Some("tester"));
    assert!(record.end_time.is_some());
    assert!(record.duration_seconds.is_some());
    assert!(record.error_message.is_none());

    let entries = controller.list_executions(&result.workflow_id).unwrap();
    let steps: Vec<StepName> = entries.iter().map(|e| e.step_name).collect();
    assert_eq!(steps, result.step_sequence);
    assert!(entries.iter().all(|e| e.status == ExecutionStatus::Completed));
    assert_eq!(store.metrics().unwrap().len(), 6);
}

#[test]
fn test_dictionary_receives_profile_and_staging_location() {
    let (controller, _store, stages) = setup(StubStages::default());
    controller.execute(onboarding("@RAW_STAGE/orders.csv")).unwrap();

    let profile = stages.seen_profile.lock().unwrap().clone().unwrap();
    assert_eq!(profile.summary.as_deref(), Some("Profiled @RAW_STAGE/orders.csv"));

    let location = stages.seen_location.lock().unwrap().clone().unwrap();
    assert_eq!(location.database, "ANALYTICS");
    assert_eq!(location.schema, "STAGING");
}

#[test]
fn test_mapping_target_defaults() {
    let (controller, _store, stages) = setup(StubStages::default());
    controller
        .start_workflow("@RAW_STAGE/orders.csv", None, None, "ONBOARDING")
        .unwrap();

    let target = stages.seen_target.lock().unwrap().clone().unwrap();
    assert_eq!(target.schema, "CURATED");
    assert_eq!(target.table, AUTO_TABLE);

    controller
        .start_workflow("@RAW_STAGE/orders.csv", Some("MART"), Some("ORDERS"), "ONBOARDING")
        .unwrap();
    let target = stages.seen_target.lock().unwrap().clone().unwrap();
    assert_eq!(target.schema, "MART");
    assert_eq!(target.table, "ORDERS");
}

#[test]
fn test_failure_stops_at_each_step() {
    let plan = [StepName::Profiling, StepName::Dictionary, StepName::Mapping];

    for (index, &failing) in plan.iter().enumerate() {
        let (controller, store, stages) = setup(StubStages::failing_at(failing));

        let err = controller
            .execute(onboarding("@RAW_STAGE/customers.csv"))
            .unwrap_err();
        assert_eq!(err.step_name(), Some(failing));
        assert!(err.to_string().contains("stage unavailable"));

        let workflow_id = err.workflow_id().unwrap().to_string();
        let record = store.get_workflow(&workflow_id).unwrap().unwrap();
        assert_eq!(record.status, WorkflowStatus::Failed);
        assert_eq!(record.step_sequence, plan[..=index].to_vec());
        assert!(
            record
                .error_message
                .as_deref()
                .unwrap()
                .contains("stage unavailable")
        );

        // Steps after the failing one are never invoked
        let calls = stages.calls();
        for (position, count) in calls.iter().enumerate() {
            let expected = usize::from(position <= index);
            assert_eq!(*count, expected, "step {position} when failing at {failing}");
        }

        let entries = store.list_executions(&workflow_id).unwrap();
        assert_eq!(entries.len(), index + 1);
        assert_eq!(entries.last().unwrap().status, ExecutionStatus::Failed);
    }
}

#[test]
fn test_start_workflow_reports_failure_as_result() {
    let (controller, _store, _stages) = setup(StubStages::failing_at(StepName::Dictionary));

    let result = controller
        .start_workflow("@RAW_STAGE/customers.csv", Some("CURATED"), None, "ONBOARDING")
        .unwrap();

    assert_eq!(result.status, WorkflowStatus::Failed);
    assert!(!result.is_success());
    assert!(result.error.as_deref().unwrap().contains("stage unavailable"));
    assert!(result.summary.is_none());
    assert_eq!(
        result.step_sequence,
        vec![StepName::Profiling, StepName::Dictionary]
    );
    assert_eq!(result.step_results[0].status, StepStatus::Success);
    assert_eq!(result.step_results[1].status, StepStatus::Failure);
}

#[test]
fn test_profiling_only_runs_one_step() {
    let (controller, store, stages) = setup(StubStages::default());

    let result = controller
        .run("PROFILING_ONLY", "@RAW_STAGE/customers.csv", "CURATED")
        .unwrap();

    assert_eq!(result.status, WorkflowStatus::Completed);
    assert_eq!(result.step_sequence, vec![StepName::Profiling]);
    assert_eq!(stages.calls(), [1, 0, 0]);
    assert!(result.dictionary.is_none());
    assert!(result.mapping.is_none());
    assert_eq!(
        result.summary.as_deref(),
        Some("Workflow completed with 1 steps executed.")
    );
    assert_eq!(store.execution_count().unwrap(), 1);
}

#[test]
fn test_mapping_only_is_rejected_before_any_record() {
    let (controller, store, stages) = setup(StubStages::default());

    let err = controller
        .run("MAPPING_ONLY", "@RAW_STAGE/customers.csv", "CURATED")
        .unwrap_err();

    assert!(matches!(err, WorkflowError::NotImplemented { .. }));
    assert_eq!(store.workflow_count().unwrap(), 0);
    assert_eq!(store.execution_count().unwrap(), 0);
    assert_eq!(stages.calls(), [0, 0, 0]);
}

#[test]
fn test_unknown_workflow_type_creates_nothing() {
    let (controller, store, stages) = setup(StubStages::default());

    let err = controller
        .start_workflow("@RAW_STAGE/customers.csv", None, None, "BACKFILL")
        .unwrap_err();

    assert!(matches!(err, WorkflowError::UnknownWorkflowType(ref name) if name == "BACKFILL"));
    assert_eq!(store.workflow_count().unwrap(), 0);
    assert_eq!(stages.calls(), [0, 0, 0]);
}

#[test]
fn test_broken_sinks_do_not_change_outcome() {
    let (controller, store, _stages) = setup(StubStages::default());
    let sink = Arc::new(BrokenSink);
    let controller = controller
        .with_execution_log(sink.clone())
        .with_metrics(sink);

    let result = controller
        .execute(onboarding("@RAW_STAGE/customers.csv"))
        .unwrap();

    assert_eq!(result.status, WorkflowStatus::Completed);
    assert_eq!(result.step_results.len(), 3);
    assert_eq!(store.execution_count().unwrap(), 0);
    assert!(store.metrics().unwrap().is_empty());
    assert_eq!(
        store.get_workflow(&result.workflow_id).unwrap().unwrap().status,
        WorkflowStatus::Completed
    );
}

#[test]
fn test_broken_sinks_do_not_mask_step_failure() {
    let (controller, _store, stages) = setup(StubStages::failing_at(StepName::Profiling));
    let sink = Arc::new(BrokenSink);
    let controller = controller
        .with_execution_log(sink.clone())
        .with_metrics(sink);

    let err = controller
        .execute(onboarding("@RAW_STAGE/customers.csv"))
        .unwrap_err();
    assert_eq!(err.step_name(), Some(StepName::Profiling));
    assert_eq!(stages.calls(), [1, 0, 0]);
}

#[test]
fn test_total_duration_covers_steps() {
    let stages = StubStages::default().with_delay(Duration::from_millis(15));
    let (controller, store, _stages) = setup(stages);

    let result = controller
        .execute(onboarding("@RAW_STAGE/customers.csv"))
        .unwrap();

    let step_total: f64 = result.step_results.iter().map(|s| s.duration_seconds).sum();
    assert!(step_total >= 0.045);
    assert!(result.total_duration_seconds >= step_total);

    let record = store.get_workflow(&result.workflow_id).unwrap().unwrap();
    assert!(record.duration_seconds.unwrap() >= step_total);
}

#[test]
fn test_terminal_record_is_immutable() {
    let (controller, _store, _stages) = setup(StubStages::default());
    let result = controller
        .execute(onboarding("@RAW_STAGE/customers.csv"))
        .unwrap();

    let mut record = controller.get_workflow_status(&result.workflow_id).unwrap();
    let err = record.fail("late failure").unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    assert!(record.record_step(StepName::Mapping).is_err());
    assert_eq!(record.status, WorkflowStatus::Completed);
}

#[test]
fn test_summary_from_completion_backend() {
    let (controller, _store, _stages) = setup(StubStages::default());
    let controller = controller.with_completion_client(Some(Arc::new(FixedCompletion(Ok(
        "  Customers onboarded with one mapped field.  ".to_string(),
    )))));

    let result = controller
        .execute(onboarding("@RAW_STAGE/customers.csv"))
        .unwrap();
    assert_eq!(
        result.summary.as_deref(),
        Some("Customers onboarded with one mapped field.")
    );
}

#[test]
fn test_summary_falls_back_when_backend_fails() {
    let (controller, _store, _stages) = setup(StubStages::default());
    let controller = controller.with_completion_client(Some(Arc::new(FixedCompletion(Err(
        LlmError::Timeout(30),
    )))));

    let result = controller
        .execute(onboarding("@RAW_STAGE/customers.csv"))
        .unwrap();
    assert_eq!(result.status, WorkflowStatus::Completed);
    assert_eq!(
        result.summary.as_deref(),
        Some("Workflow completed with 3 steps executed.")
    );
}

#[test]
fn test_summary_falls_back_when_backend_panics() {
    let (controller, store, _stages) = setup(StubStages::default());
    let controller = controller.with_completion_client(Some(Arc::new(PanickingCompletion)));

    let result = controller
        .execute(onboarding("@RAW_STAGE/customers.csv"))
        .unwrap();
    assert_eq!(result.status, WorkflowStatus::Completed);
    assert_eq!(
        result.summary.as_deref(),
        Some("Workflow completed with 3 steps executed.")
    );

    let record = store.get_workflow(&result.workflow_id).unwrap().unwrap();
    assert_eq!(record.status, WorkflowStatus::Completed);
}

#[test]
fn test_duration_matches_timestamps_with_slow_summary() {
    let (controller, store, _stages) = setup(StubStages::default());
    let controller = controller
        .with_completion_client(Some(Arc::new(SlowCompletion(Duration::from_millis(300)))));

    let result = controller
        .execute(onboarding("@RAW_STAGE/customers.csv"))
        .unwrap();
    let record = store.get_workflow(&result.workflow_id).unwrap().unwrap();

    let end = record.end_time.unwrap();
    let span = (end - record.start_time).num_microseconds().unwrap() as f64 / 1e6;
    let duration = record.duration_seconds.unwrap();
    assert!((duration - span).abs() < 1e-3, "duration {duration} vs span {span}");
    assert!(duration >= 0.3);
    assert_eq!(result.total_duration_seconds, duration);
}

#[test]
fn test_failed_duration_matches_timestamps() {
    let stages = StubStages::failing_at(StepName::Dictionary);
    let (controller, store, _stages) = setup(stages);

    let result = controller
        .start_workflow("@RAW_STAGE/customers.csv", Some("CURATED"), None, "ONBOARDING")
        .unwrap();
    let record = store.get_workflow(&result.workflow_id).unwrap().unwrap();
    let span = (record.end_time.unwrap() - record.start_time)
        .num_microseconds()
        .unwrap() as f64
        / 1e6;
    assert!((record.duration_seconds.unwrap() - span).abs() < 1e-3);
}

#[test]
fn test_reconciled_run_stays_failed() {
    let (_controller, store, _stages) = setup(StubStages::default());

    let mut live = WorkflowRecord::new(WorkflowType::Onboarding, "@RAW_STAGE/slow.csv", "CURATED");
    live.start_time = chrono::Utc::now() - chrono::Duration::hours(2);
    store.create_workflow(&live).unwrap();
    live.start().unwrap();
    store.update_workflow(&live).unwrap();

    let closed = store
        .reconcile_orphaned(chrono::Utc::now() - chrono::Duration::minutes(30))
        .unwrap();
    assert_eq!(closed, vec![live.workflow_id.clone()]);

    // The slow run finishes after the sweep closed it
    live.complete().unwrap();
    let err = store.update_workflow(&live).unwrap_err();
    assert!(matches!(err, StoreError::AlreadyTerminal { .. }));

    let stored = store.get_workflow(&live.workflow_id).unwrap().unwrap();
    assert_eq!(stored.status, WorkflowStatus::Failed);
    assert_eq!(stored.error_message.as_deref(), Some(ORPHANED_MESSAGE));
}

#[test]
fn test_queries_on_unknown_workflow() {
    let (controller, _store, _stages) = setup(StubStages::default());

    assert!(matches!(
        controller.get_workflow_status("missing"),
        Err(WorkflowError::NotFound(_))
    ));
    assert!(matches!(
        controller.list_executions("missing"),
        Err(WorkflowError::NotFound(_))
    ));
}

#[test]
fn test_listing_and_stats() {
    let (controller, _store, _stages) = setup(StubStages::default());
    let first = controller
        .execute(onboarding("@RAW_STAGE/a.csv"))
        .unwrap();
    std::thread::sleep(Duration::from_millis(5));
    let second = controller
        .run("PROFILING_ONLY", "@RAW_STAGE/b.csv", "CURATED")
        .unwrap();

    let recent = controller.list_recent_workflows(10).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].workflow_id, second.workflow_id);
    assert_eq!(recent[1].workflow_id, first.workflow_id);
    assert_eq!(controller.list_recent_workflows(1).unwrap().len(), 1);

    let failed = controller
        .list_workflows_filtered(&[WorkflowStatus::Failed], None, 10)
        .unwrap();
    assert!(failed.is_empty());

    let stats = controller.workflow_stats(None).unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.success_rate, 100.0);
    assert!(stats.average_duration_seconds.is_some());
}

#[test]
fn test_stats_count_failures() {
    let store = Arc::new(MemoryStore::new());
    let healthy = Arc::new(StubStages::default());
    let broken = Arc::new(StubStages::failing_at(StepName::Mapping));

    let ok = WorkflowController::new(
        OrchestratorConfig::new(),
        store.clone(),
        Collaborators::shared(healthy),
    );
    let failing = WorkflowController::new(
        OrchestratorConfig::new(),
        store.clone(),
        Collaborators::shared(broken),
    );

    ok.execute(onboarding("@RAW_STAGE/a.csv")).unwrap();
    failing.execute(onboarding("@RAW_STAGE/b.csv")).unwrap_err();

    let stats = ok.workflow_stats(None).unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.success_rate, 50.0);

    let failed = ok
        .list_workflows_filtered(&[WorkflowStatus::Failed], None, 10)
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].source_reference, "@RAW_STAGE/b.csv");
}

#[test]
fn test_reconcile_closes_stale_runs() {
    let (controller, store, _stages) = setup(StubStages::default());

    let mut stale = WorkflowRecord::new(WorkflowType::Onboarding, "@RAW_STAGE/old.csv", "CURATED");
    stale.start_time = chrono::Utc::now() - chrono::Duration::hours(3);
    stale.start().unwrap();
    store.create_workflow(&stale).unwrap();

    let mut fresh = WorkflowRecord::new(WorkflowType::Onboarding, "@RAW_STAGE/new.csv", "CURATED");
    fresh.start().unwrap();
    store.create_workflow(&fresh).unwrap();

    let completed = controller
        .execute(onboarding("@RAW_STAGE/done.csv"))
        .unwrap();

    let closed = controller
        .reconcile_orphaned(chrono::Duration::minutes(60))
        .unwrap();
    assert_eq!(closed, vec![stale.workflow_id.clone()]);

    let stale = controller.get_workflow_status(&stale.workflow_id).unwrap();
    assert_eq!(stale.status, WorkflowStatus::Failed);
    assert_eq!(stale.error_message.as_deref(), Some(ORPHANED_MESSAGE));

    let fresh = controller.get_workflow_status(&fresh.workflow_id).unwrap();
    assert_eq!(fresh.status, WorkflowStatus::InProgress);
    assert_eq!(
        controller.get_workflow_status(&completed.workflow_id).unwrap().status,
        WorkflowStatus::Completed
    );

    assert!(
        controller
            .reconcile_orphaned(chrono::Duration::minutes(60))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_concurrent_runs_are_independent() {
    let (controller, store, stages) = setup(StubStages::default());

    let ids: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let controller = &controller;
                scope.spawn(move || {
                    controller
                        .execute(onboarding(&format!("@RAW_STAGE/file_{i}.csv")))
                        .unwrap()
                        .workflow_id
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(stages.calls(), [4, 4, 4]);
    assert_eq!(store.workflow_count().unwrap(), 4);
    for id in &ids {
        let entries = store.list_executions(id).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| &e.workflow_id == id));
    }
}
