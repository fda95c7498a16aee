/// Function registry for step execution
///
/// Maps a step's `functionName` to an async single-argument handler. Lookup is
/// late-bound: the engine resolves the name each time a step runs, and an
/// unknown name fails that step rather than the process.

use crate::workflow::types::WorkflowDefinition;
use async_trait::async_trait;
use serde_json::Value;
use std::{collections::HashMap, fmt, future::Future, sync::Arc};
use thiserror::Error;

/// Errors a step function can fail with
#[derive(Debug, Error)]
pub enum FunctionError {
    /// The input did not satisfy the function's requirements
    #[error("{0}")]
    InvalidInput(String),

    /// The function ran and failed
    #[error("{0}")]
    Failed(String),
}

/// An invocable step operation
#[async_trait]
pub trait StepFunction: Send + Sync {
    async fn call(&self, input: Value) -> Result<Value, FunctionError>;
}

/// Adapter turning an async closure into a `StepFunction`
struct FnStepFunction<F>(F);

#[async_trait]
impl<F, Fut> StepFunction for FnStepFunction<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, FunctionError>> + Send,
{
    async fn call(&self, input: Value) -> Result<Value, FunctionError> {
        (self.0)(input).await
    }
}

/// Name -> handler table consulted by the engine on every step
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn StepFunction>>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one with the same name
    pub fn register(&mut self, name: impl Into<String>, function: Arc<dyn StepFunction>) -> &mut Self {
        self.functions.insert(name.into(), function);
        self
    }

    /// Register an async closure as a handler
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, FunctionError>> + Send + 'static,
    {
        self.register(name, Arc::new(FnStepFunction(function)))
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn StepFunction>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Function names a definition references that nothing is registered under
    pub fn unresolved_functions(&self, definition: &WorkflowDefinition) -> Vec<String> {
        definition
            .function_names()
            .into_iter()
            .filter(|name| !self.contains(name))
            .map(str::to_string)
            .collect()
    }

    /// Log a warning per unresolved function name of `definition`
    ///
    /// Unknown names are still allowed; the step fails when it runs.
    pub fn warn_unresolved(&self, definition: &WorkflowDefinition) {
        for name in self.unresolved_functions(definition) {
            tracing::warn!(
                "⚠️ Workflow '{}' references unregistered function '{}'",
                definition.name,
                name
            );
        }
    }
}
