/// Linear step-chain execution engine
///
/// Drives one workflow instance at a time from its start step to COMPLETED or
/// FAILED. Each trigger persists a PENDING instance and hands it to a detached
/// tokio task; the task reloads the durable copy, runs steps strictly in
/// sequence, and writes the instance back after every step.

use crate::error::{EngineError, Result};
use crate::instance::{
    store::InstanceStore,
    types::{InstanceStatus, StepExecutionRecord, StepStatus, WorkflowInstance},
};
use crate::runtime::{
    events::{EventPublisher, WorkflowEvent},
    functions::FunctionRegistry,
    path::{self, PayloadPath},
};
use crate::workflow::{
    registry::DefinitionRepository,
    types::{WorkflowDefinition, WorkflowStep},
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// Execution engine wiring the definition registry, function registry,
/// instance store and event publisher together
///
/// Cheap to clone; every collaborator is shared behind an `Arc`.
#[derive(Clone)]
pub struct ExecutionEngine {
    definitions: Arc<dyn DefinitionRepository>,
    instances: Arc<dyn InstanceStore>,
    functions: Arc<FunctionRegistry>,
    events: Arc<dyn EventPublisher>,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

impl ExecutionEngine {
    pub fn new(
        definitions: Arc<dyn DefinitionRepository>,
        instances: Arc<dyn InstanceStore>,
        functions: Arc<FunctionRegistry>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            definitions,
            instances,
            functions,
            events,
        }
    }

    pub fn definitions(&self) -> &Arc<dyn DefinitionRepository> {
        &self.definitions
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Resolve a definition by id, falling back to its name
    pub async fn resolve_definition(&self, identifier: &str) -> Result<WorkflowDefinition> {
        if let Some(definition) = self.definitions.get_by_id(identifier).await? {
            return Ok(definition);
        }

        self.definitions
            .get_by_name(identifier)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "Workflow definition with ID or Name \"{}\" not found.",
                    identifier
                ))
            })
    }

    /// Trigger a workflow and return its PENDING snapshot immediately
    ///
    /// The run loop is spawned onto the tokio runtime and not awaited; observe
    /// its progress with `get_instance` or through published events.
    pub async fn trigger(&self, identifier: &str, payload: Option<Value>) -> Result<WorkflowInstance> {
        let (instance, definition) = self.prepare_instance(identifier, payload).await?;

        let engine = self.clone();
        let instance_id = instance.instance_id.clone();
        tokio::spawn(async move {
            engine.run_detached(instance_id, Some(definition)).await;
        });

        Ok(instance)
    }

    /// Create, persist and announce a PENDING instance without running it
    ///
    /// Fails with NotFound, before anything is stored or published, when the
    /// identifier resolves to no definition.
    pub async fn prepare_instance(
        &self,
        identifier: &str,
        payload: Option<Value>,
    ) -> Result<(WorkflowInstance, WorkflowDefinition)> {
        let definition = self.resolve_definition(identifier).await?;
        let payload = payload.unwrap_or_else(|| Value::Object(Default::default()));
        let instance = WorkflowInstance::new(&definition, payload);

        self.instances.put(&instance).await?;
        tracing::info!(
            "📝 Workflow instance {} ({}) created and PENDING",
            instance.instance_id,
            definition.name
        );

        self.events.publish(WorkflowEvent::WorkflowStarted {
            instance_id: instance.instance_id.clone(),
            workflow_definition_id: definition.id.clone(),
            workflow_name: definition.name.clone(),
            started_at: instance.started_at,
            initial_payload: instance.initial_payload.clone(),
        });

        Ok((instance, definition))
    }

    /// Current persisted snapshot of an instance
    pub async fn get_instance(&self, instance_id: &str) -> Result<WorkflowInstance> {
        self.instances.get(instance_id).await?.ok_or_else(|| {
            EngineError::NotFound(format!("Workflow instance with ID \"{}\" not found.", instance_id))
        })
    }

    /// Body of the detached task started by `trigger`
    ///
    /// Nothing is returned to anyone; errors end up on the instance or in the log.
    async fn run_detached(self, instance_id: String, definition: Option<WorkflowDefinition>) {
        if let Err(e) = self.process_instance(&instance_id, definition).await {
            tracing::error!("❌ Processing of instance {} aborted: {}", instance_id, e);
            self.record_infrastructure_failure(&instance_id, &e).await;
        }
    }

    /// Run an instance from its current step until it is COMPLETED or FAILED
    ///
    /// Reloads the durable copy first and returns without touching anything if
    /// the instance is absent or already terminal, so re-invoking it is harmless. Only
    /// store failures are returned as errors; step failures become a FAILED
    /// instance.
    pub async fn process_instance(
        &self,
        instance_id: &str,
        definition: Option<WorkflowDefinition>,
    ) -> Result<()> {
        let Some(mut instance) = self.instances.get(instance_id).await? else {
            tracing::error!("Instance {} not found in store for processing", instance_id);
            return Ok(());
        };

        if !instance.status.is_runnable() {
            tracing::warn!(
                "Instance {} is not in a runnable state ({}). Aborting.",
                instance_id,
                instance.status
            );
            return Ok(());
        }

        let definition = match definition {
            Some(definition) => definition,
            None => match self.definitions.get_by_id(&instance.workflow_definition_id).await? {
                Some(definition) => definition,
                None => {
                    let err = EngineError::DefinitionMissing(instance.workflow_definition_id.clone());
                    tracing::error!("[{}] {}", instance_id, err);
                    instance.fail(err.to_string());
                    instance.ended_at = Some(Utc::now());
                    self.instances.put(&instance).await?;
                    self.publish_failed(&instance);
                    return Ok(());
                }
            },
        };

        if instance.status == InstanceStatus::Pending {
            instance.transition_to(InstanceStatus::Running)?;
            self.instances.put(&instance).await?;
        }

        while instance.status == InstanceStatus::Running {
            let Some(step_id) = instance.current_step_id.clone() else {
                break;
            };

            let Some(step) = definition.step(&step_id) else {
                let err = EngineError::StepMissing(step_id.clone());
                tracing::error!(
                    "[{}] Step {} not found in workflow {}",
                    instance_id,
                    step_id,
                    definition.name
                );
                instance.fail(err.to_string());
                break;
            };

            self.execute_step(&mut instance, &step_id, step).await;
            self.instances.put(&instance).await?;
        }

        if instance.status == InstanceStatus::Running && instance.current_step_id.is_none() {
            instance.transition_to(InstanceStatus::Completed)?;
        }

        instance.ended_at = Some(Utc::now());
        self.instances.put(&instance).await?;

        match instance.status {
            InstanceStatus::Completed => {
                tracing::info!(
                    "🎉 [{}] Workflow {} COMPLETED after {} steps",
                    instance_id,
                    definition.name,
                    instance.history.len()
                );
                self.events.publish(WorkflowEvent::WorkflowCompleted {
                    instance_id: instance.instance_id.clone(),
                    workflow_name: definition.name.clone(),
                    ended_at: instance.ended_at.unwrap_or_else(Utc::now),
                });
            }
            InstanceStatus::Failed => {
                tracing::error!(
                    "❌ [{}] Workflow {} FAILED. Final error: {}",
                    instance_id,
                    definition.name,
                    instance.error.as_deref().unwrap_or("unknown")
                );
                self.publish_failed(&instance);
            }
            _ => {}
        }

        Ok(())
    }

    /// Run one step and fold its outcome into the instance
    async fn execute_step(&self, instance: &mut WorkflowInstance, step_id: &str, step: &WorkflowStep) {
        let started_at = Utc::now();
        let input_path = PayloadPath::from_option(step.input_path.as_deref());
        let input = path::get(&instance.current_payload, &input_path)
            .cloned()
            .unwrap_or(Value::Null);

        tracing::info!(
            "📍 [{}] Executing step: {} ({})",
            instance.instance_id,
            step.name,
            step_id
        );
        tracing::debug!("📥 [{}] Step input from {}: {}", instance.instance_id, input_path, input);

        self.events.publish(WorkflowEvent::StepStarted {
            instance_id: instance.instance_id.clone(),
            step_id: step_id.to_string(),
            step_name: step.name.clone(),
            function_name: step.function_name.clone(),
            input: input.clone(),
            started_at,
        });

        let outcome = self.invoke(&step.function_name, input.clone()).await;
        let ended_at = Utc::now();

        match outcome {
            Ok(output) => {
                let result_path = PayloadPath::from_option(step.result_path.as_deref());
                let payload = std::mem::take(&mut instance.current_payload);
                instance.current_payload = path::set(payload, &result_path, output.clone());

                instance.history.push(StepExecutionRecord {
                    step_id: step_id.to_string(),
                    function_name: step.function_name.clone(),
                    status: StepStatus::Success,
                    started_at,
                    ended_at,
                    input,
                    output: Some(output.clone()),
                    error: None,
                });
                instance.current_step_id = step.next_step_id.clone();

                tracing::info!("✅ [{}] Step {} COMPLETED", instance.instance_id, step.name);
                tracing::debug!("📤 [{}] Step output to {}: {}", instance.instance_id, result_path, output);

                self.events.publish(WorkflowEvent::StepCompleted {
                    instance_id: instance.instance_id.clone(),
                    step_id: step_id.to_string(),
                    step_name: step.name.clone(),
                    output,
                    ended_at,
                });
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!("❌ [{}] Step {} FAILED: {}", instance.instance_id, step.name, message);

                instance.history.push(StepExecutionRecord {
                    step_id: step_id.to_string(),
                    function_name: step.function_name.clone(),
                    status: StepStatus::Error,
                    started_at,
                    ended_at,
                    input,
                    output: None,
                    error: Some(message.clone()),
                });
                instance.fail(format!("Error in step {}: {}", step.name, message));
                instance.current_step_id = Some(step_id.to_string());

                self.events.publish(WorkflowEvent::StepFailed {
                    instance_id: instance.instance_id.clone(),
                    step_id: step_id.to_string(),
                    step_name: step.name.clone(),
                    error: message,
                    ended_at,
                });
            }
        }
    }

    /// Resolve and call a step function in its own task
    ///
    /// A panicking handler surfaces as a step error instead of tearing down the run loop.
    async fn invoke(&self, function_name: &str, input: Value) -> Result<Value> {
        let function = self.functions.resolve(function_name).ok_or_else(|| {
            EngineError::StepExecution(format!(
                "Function \"{}\" not found in registry.",
                function_name
            ))
        })?;

        match tokio::spawn(async move { function.call(input).await }).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(EngineError::StepExecution(e.to_string())),
            Err(join_err) => Err(EngineError::StepExecution(format!(
                "Function \"{}\" aborted: {}",
                function_name, join_err
            ))),
        }
    }

    /// Best-effort FAILED marking after a store error inside the run loop
    async fn record_infrastructure_failure(&self, instance_id: &str, cause: &EngineError) {
        let mut instance = match self.instances.get(instance_id).await {
            Ok(Some(instance)) => instance,
            Ok(None) => {
                tracing::error!("No stored instance {} to record failure on", instance_id);
                return;
            }
            Err(e) => {
                tracing::error!("Could not reload instance {} to record failure: {}", instance_id, e);
                return;
            }
        };

        if !instance.status.is_runnable() {
            return;
        }

        instance.fail(format!("Infrastructure error: {}", cause));
        instance.ended_at = Some(Utc::now());
        match self.instances.put(&instance).await {
            Ok(()) => self.publish_failed(&instance),
            Err(e) => tracing::error!("Could not persist failure of instance {}: {}", instance_id, e),
        }
    }

    fn publish_failed(&self, instance: &WorkflowInstance) {
        self.events.publish(WorkflowEvent::WorkflowFailed {
            instance_id: instance.instance_id.clone(),
            workflow_name: Some(instance.workflow_definition_name.clone()),
            error: instance.error.clone().unwrap_or_default(),
            ended_at: instance.ended_at.unwrap_or_else(Utc::now),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::store::MemoryInstanceStore;
    use crate::runtime::functions::FunctionError;
    use crate::workflow::registry::DefinitionRegistry;
    use crate::workflow::types::{sample_signup_workflow, StepType};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<WorkflowEvent>>,
    }

    impl RecordingPublisher {
        fn kinds(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().iter().map(|e| e.kind()).collect()
        }
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(&self, event: WorkflowEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    /// Memory store whose next `fail_puts` writes fail
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryInstanceStore,
        fail_puts: AtomicUsize,
    }

    #[async_trait]
    impl InstanceStore for FlakyStore {
        async fn get(&self, instance_id: &str) -> Result<Option<WorkflowInstance>> {
            self.inner.get(instance_id).await
        }

        async fn put(&self, instance: &WorkflowInstance) -> Result<()> {
            let remaining = self.fail_puts.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_puts.store(remaining - 1, Ordering::SeqCst);
                return Err(EngineError::Store("connection refused".to_string()));
            }
            self.inner.put(instance).await
        }
    }

    fn step(id: &str, function: &str, result_path: Option<&str>, next: Option<&str>) -> (String, WorkflowStep) {
        (
            id.to_string(),
            WorkflowStep {
                id: id.to_string(),
                name: format!("Step {}", id),
                step_type: StepType::Function,
                function_name: function.to_string(),
                input_path: None,
                result_path: result_path.map(str::to_string),
                next_step_id: next.map(str::to_string),
            },
        )
    }

    fn four_step(functions: [&str; 4]) -> WorkflowDefinition {
        WorkflowDefinition {
            id: "wf-four".to_string(),
            name: "Four Steps".to_string(),
            description: None,
            start_at: "s1".to_string(),
            steps: BTreeMap::from([
                step("s1", functions[0], Some("$.r1"), Some("s2")),
                step("s2", functions[1], Some("$.r2"), Some("s3")),
                step("s3", functions[2], Some("$.r3"), Some("s4")),
                step("s4", functions[3], Some("$.r4"), None),
            ]),
        }
    }

    fn test_functions() -> FunctionRegistry {
        let mut functions = FunctionRegistry::new();
        functions.register_fn("ok", |_input: Value| async move {
            Ok::<_, FunctionError>(json!({"ok": true}))
        });
        functions.register_fn("boom", |_input: Value| async move {
            Err::<Value, _>(FunctionError::Failed("boom".to_string()))
        });
        functions.register_fn("echo", |input: Value| async move { Ok::<_, FunctionError>(input) });
        functions.register_fn("panics", |_input: Value| async move {
            if true {
                panic!("handler bug");
            }
            Ok::<_, FunctionError>(Value::Null)
        });
        functions
    }

    struct Harness {
        engine: ExecutionEngine,
        registry: Arc<DefinitionRegistry>,
        store: Arc<MemoryInstanceStore>,
        events: Arc<RecordingPublisher>,
    }

    async fn harness(definitions: Vec<WorkflowDefinition>) -> Harness {
        let registry = Arc::new(DefinitionRegistry::in_memory());
        for definition in definitions {
            registry.seed(definition).await.unwrap();
        }
        let store = Arc::new(MemoryInstanceStore::new());
        let events = Arc::new(RecordingPublisher::default());
        let engine = ExecutionEngine::new(
            registry.clone(),
            store.clone(),
            Arc::new(test_functions()),
            events.clone(),
        );
        Harness { engine, registry, store, events }
    }

    async fn run_to_end(h: &Harness, identifier: &str, payload: Value) -> WorkflowInstance {
        let (instance, definition) = h.engine.prepare_instance(identifier, Some(payload)).await.unwrap();
        h.engine
            .process_instance(&instance.instance_id, Some(definition))
            .await
            .unwrap();
        h.engine.get_instance(&instance.instance_id).await.unwrap()
    }

    async fn wait_for_terminal(engine: &ExecutionEngine, instance_id: &str) -> WorkflowInstance {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let instance = engine.get_instance(instance_id).await.unwrap();
                if instance.status.is_terminal() && instance.ended_at.is_some() {
                    return instance;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("instance did not finish in time")
    }

    #[tokio::test]
    async fn test_four_steps_complete() {
        let h = harness(vec![four_step(["ok", "ok", "ok", "ok"])]).await;
        let done = run_to_end(&h, "wf-four", json!({"seed": 1})).await;

        assert_eq!(done.status, InstanceStatus::Completed);
        assert_eq!(done.history.len(), 4);
        assert!(done.current_step_id.is_none());
        assert!(done.ended_at.is_some());
        assert!(done.error.is_none());
        assert!(done.history.iter().all(|r| r.status == StepStatus::Success));
        assert_eq!(done.current_payload["seed"], 1);
        assert_eq!(done.current_payload["r4"], json!({"ok": true}));
        assert_eq!(done.initial_payload, json!({"seed": 1}));

        let kinds = h.events.kinds();
        assert_eq!(kinds.first(), Some(&"WORKFLOW_STARTED"));
        assert_eq!(kinds.last(), Some(&"WORKFLOW_COMPLETED"));
        assert_eq!(kinds.iter().filter(|k| **k == "STEP_COMPLETED").count(), 4);
        assert_eq!(kinds.len(), 10);
    }

    #[tokio::test]
    async fn test_step_failure_halts_instance() {
        let h = harness(vec![four_step(["ok", "boom", "ok", "ok"])]).await;
        let failed = run_to_end(&h, "wf-four", json!({})).await;

        assert_eq!(failed.status, InstanceStatus::Failed);
        assert_eq!(failed.history.len(), 2);
        assert_eq!(failed.history[1].status, StepStatus::Error);
        assert_eq!(failed.history[1].error.as_deref(), Some("boom"));
        assert!(failed.history[1].output.is_none());
        assert_eq!(failed.current_step_id.as_deref(), Some("s2"));
        assert_eq!(failed.current_payload["r1"], json!({"ok": true}));
        assert!(failed.current_payload.get("r2").is_none());
        assert_eq!(failed.error.as_deref(), Some("Error in step Step s2: boom"));

        let kinds = h.events.kinds();
        assert!(kinds.contains(&"STEP_FAILED"));
        assert_eq!(kinds.last(), Some(&"WORKFLOW_FAILED"));
        assert!(!kinds.contains(&"WORKFLOW_COMPLETED"));
    }

    #[tokio::test]
    async fn test_unknown_identifier_creates_nothing() {
        let h = harness(vec![four_step(["ok", "ok", "ok", "ok"])]).await;

        let result = h.engine.trigger("no-such-workflow", Some(json!({}))).await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
        assert!(h.store.is_empty().await);
        assert!(h.events.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_trigger_by_name_or_id() {
        let h = harness(vec![four_step(["ok", "ok", "ok", "ok"])]).await;

        let by_id = h.engine.trigger("wf-four", None).await.unwrap();
        let by_name = h.engine.trigger("Four Steps", None).await.unwrap();

        assert_eq!(by_id.workflow_definition_id, by_name.workflow_definition_id);
        assert_ne!(by_id.instance_id, by_name.instance_id);
        assert_eq!(by_name.initial_payload, json!({}));
    }

    #[tokio::test]
    async fn test_trigger_returns_pending_then_completes() {
        let h = harness(vec![four_step(["ok", "ok", "ok", "ok"])]).await;

        let pending = h.engine.trigger("wf-four", Some(json!({"a": 1}))).await.unwrap();
        assert_eq!(pending.status, InstanceStatus::Pending);
        assert_eq!(pending.current_step_id.as_deref(), Some("s1"));
        assert!(pending.history.is_empty());

        let done = wait_for_terminal(&h.engine, &pending.instance_id).await;
        assert_eq!(done.status, InstanceStatus::Completed);
        assert_eq!(done.history.len(), 4);
    }

    #[tokio::test]
    async fn test_reprocessing_terminal_instance_is_noop() {
        let h = harness(vec![four_step(["ok", "ok", "ok", "ok"])]).await;
        let done = run_to_end(&h, "wf-four", json!({})).await;
        let events_before = h.events.kinds().len();

        h.engine.process_instance(&done.instance_id, None).await.unwrap();

        let after = h.engine.get_instance(&done.instance_id).await.unwrap();
        assert_eq!(after, done);
        assert_eq!(h.events.kinds().len(), events_before);
    }

    #[tokio::test]
    async fn test_processing_absent_instance_is_noop() {
        let h = harness(vec![four_step(["ok", "ok", "ok", "ok"])]).await;

        h.engine.process_instance("missing-instance", None).await.unwrap();
        assert!(h.store.is_empty().await);
        assert!(h.events.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_function_fails_step() {
        let h = harness(vec![four_step(["ok", "ok", "missingFn", "ok"])]).await;
        let failed = run_to_end(&h, "wf-four", json!({})).await;

        assert_eq!(failed.status, InstanceStatus::Failed);
        assert_eq!(failed.history.len(), 3);
        assert_eq!(failed.current_step_id.as_deref(), Some("s3"));
        assert!(failed.error.unwrap().contains("\"missingFn\" not found"));
    }

    #[tokio::test]
    async fn test_panicking_function_fails_step() {
        let h = harness(vec![four_step(["panics", "ok", "ok", "ok"])]).await;
        let failed = run_to_end(&h, "wf-four", json!({})).await;

        assert_eq!(failed.status, InstanceStatus::Failed);
        assert_eq!(failed.history.len(), 1);
        assert_eq!(failed.history[0].status, StepStatus::Error);
    }

    #[tokio::test]
    async fn test_missing_step_fails_instance() {
        let mut definition = four_step(["ok", "ok", "ok", "ok"]);
        definition.steps.get_mut("s2").unwrap().next_step_id = Some("ghost".to_string());
        let h = harness(vec![definition]).await;

        let failed = run_to_end(&h, "wf-four", json!({})).await;
        assert_eq!(failed.status, InstanceStatus::Failed);
        assert_eq!(failed.history.len(), 2);
        assert_eq!(failed.error.as_deref(), Some("Step definition for ghost missing."));
        assert_eq!(failed.current_step_id.as_deref(), Some("ghost"));
        assert!(failed.ended_at.is_some());
        assert_eq!(h.events.kinds().last(), Some(&"WORKFLOW_FAILED"));
    }

    #[tokio::test]
    async fn test_definition_missing_fails_instance() {
        let h = harness(vec![four_step(["ok", "ok", "ok", "ok"])]).await;
        let (instance, _) = h.engine.prepare_instance("wf-four", None).await.unwrap();

        h.registry.delete("wf-four").await.unwrap();
        h.engine.process_instance(&instance.instance_id, None).await.unwrap();

        let failed = h.engine.get_instance(&instance.instance_id).await.unwrap();
        assert_eq!(failed.status, InstanceStatus::Failed);
        assert_eq!(
            failed.error.as_deref(),
            Some("Critical: Workflow definition wf-four missing.")
        );
        assert!(failed.history.is_empty());
        assert_eq!(h.events.kinds(), vec!["WORKFLOW_STARTED", "WORKFLOW_FAILED"]);
    }

    #[tokio::test]
    async fn test_history_snapshots_do_not_alias_payload() {
        let mut definition = four_step(["echo", "ok", "ok", "ok"]);
        // s1 echoes the root into $.r1; s2 then merges into the root
        definition.steps.get_mut("s2").unwrap().result_path = None;
        let h = harness(vec![definition]).await;

        let done = run_to_end(&h, "wf-four", json!({"ok": false})).await;
        assert_eq!(done.current_payload["ok"], true);
        assert_eq!(done.history[0].input, json!({"ok": false}));
        assert_eq!(done.history[0].output, Some(json!({"ok": false})));
        assert_eq!(done.initial_payload, json!({"ok": false}));
    }

    #[tokio::test]
    async fn test_input_path_selects_subdocument() {
        let mut definition = four_step(["echo", "ok", "ok", "ok"]);
        definition.steps.get_mut("s1").unwrap().input_path = Some("$.user".to_string());
        definition.steps.get_mut("s2").unwrap().input_path = Some("$.absent".to_string());
        let h = harness(vec![definition]).await;

        let done = run_to_end(&h, "wf-four", json!({"user": {"id": 7}})).await;
        assert_eq!(done.current_payload["r1"], json!({"id": 7}));
        assert_eq!(done.history[0].input, json!({"id": 7}));
        assert_eq!(done.history[1].input, Value::Null);
    }

    #[tokio::test]
    async fn test_sample_signup_with_simulated_functions() {
        let registry = Arc::new(DefinitionRegistry::in_memory());
        registry.seed(sample_signup_workflow()).await.unwrap();
        let mut functions = FunctionRegistry::new();
        crate::runtime::simulated::register_simulated_functions(&mut functions, Duration::ZERO);
        let engine = ExecutionEngine::new(
            registry,
            Arc::new(MemoryInstanceStore::new()),
            Arc::new(functions),
            Arc::new(crate::runtime::events::NoopPublisher),
        );

        let pending = engine
            .trigger("Sample User Signup Workflow", Some(json!({"email": "a@b.c", "password": "pw"})))
            .await
            .unwrap();
        let done = wait_for_terminal(&engine, &pending.instance_id).await;

        assert_eq!(done.status, InstanceStatus::Completed);
        assert_eq!(done.history.len(), 4);
        assert_eq!(done.current_payload["emailSentResult"]["emailSent"], true);
        assert_eq!(done.current_payload["analyticsLogged"], true);
    }

    #[tokio::test]
    async fn test_store_failure_recorded_on_instance() {
        let registry = Arc::new(DefinitionRegistry::in_memory());
        registry.seed(four_step(["ok", "ok", "ok", "ok"])).await.unwrap();
        let store = Arc::new(FlakyStore::default());
        let events = Arc::new(RecordingPublisher::default());
        let engine = ExecutionEngine::new(registry, store.clone(), Arc::new(test_functions()), events.clone());

        let (instance, definition) = engine.prepare_instance("wf-four", None).await.unwrap();
        store.fail_puts.store(1, Ordering::SeqCst);

        engine.clone().run_detached(instance.instance_id.clone(), Some(definition)).await;

        let failed = engine.get_instance(&instance.instance_id).await.unwrap();
        assert_eq!(failed.status, InstanceStatus::Failed);
        assert!(failed.error.unwrap().contains("connection refused"));
        assert_eq!(events.kinds().last(), Some(&"WORKFLOW_FAILED"));
    }
}
