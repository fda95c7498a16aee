/// Built-in simulated business functions
///
/// Stand-ins for the signup pipeline's real side effects. Each handler echoes
/// its input mapping with a few fields added, after an optional artificial
/// latency, and rejects inputs missing the fields it depends on.

use crate::runtime::functions::{FunctionError, FunctionRegistry, StepFunction};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::{sync::Arc, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimulatedKind {
    ValidateUserData,
    CreateUserInDb,
    SendWelcomeEmail,
    LogAnalytics,
    MakeExternalApiCall,
}

impl SimulatedKind {
    const ALL: [SimulatedKind; 5] = [
        SimulatedKind::ValidateUserData,
        SimulatedKind::CreateUserInDb,
        SimulatedKind::SendWelcomeEmail,
        SimulatedKind::LogAnalytics,
        SimulatedKind::MakeExternalApiCall,
    ];

    fn function_name(self) -> &'static str {
        match self {
            SimulatedKind::ValidateUserData => "validateUserData",
            SimulatedKind::CreateUserInDb => "createUserInDB",
            SimulatedKind::SendWelcomeEmail => "sendWelcomeEmail",
            SimulatedKind::LogAnalytics => "logAnalytics",
            SimulatedKind::MakeExternalApiCall => "makeExternalApiCall",
        }
    }
}

/// One simulated handler
#[derive(Debug, Clone)]
pub struct SimulatedFunction {
    kind: SimulatedKind,
    latency: Duration,
}

/// Loose truthiness: null, false, 0 and "" count as missing
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

#[async_trait]
impl StepFunction for SimulatedFunction {
    async fn call(&self, input: Value) -> Result<Value, FunctionError> {
        tracing::debug!("🧪 Simulated {} called with: {}", self.kind.function_name(), input);

        let mut fields: Map<String, Value> = match &input {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };

        match self.kind {
            SimulatedKind::ValidateUserData => {
                if !truthy(fields.get("email")) || !truthy(fields.get("password")) {
                    return Err(FunctionError::InvalidInput(
                        "Validation Error: Email and password are required.".to_string(),
                    ));
                }
                self.pause().await;
                fields.insert("validated".to_string(), json!(true));
                fields.insert("validationTimestamp".to_string(), json!(Utc::now().to_rfc3339()));
            }
            SimulatedKind::CreateUserInDb => {
                if !truthy(fields.get("validated")) {
                    return Err(FunctionError::InvalidInput(
                        "User data not validated before DB creation attempt.".to_string(),
                    ));
                }
                self.pause().await;
                let user_id = format!("user_{}", Utc::now().timestamp_millis());
                fields.insert("userId".to_string(), json!(user_id));
                fields.insert("dbTimestamp".to_string(), json!(Utc::now().to_rfc3339()));
            }
            SimulatedKind::SendWelcomeEmail => {
                if !truthy(fields.get("userId")) || !truthy(fields.get("email")) {
                    return Err(FunctionError::InvalidInput(
                        "Cannot send email without userId and email.".to_string(),
                    ));
                }
                self.pause().await;
                fields.insert("emailSent".to_string(), json!(true));
                fields.insert("emailSentTimestamp".to_string(), json!(Utc::now().to_rfc3339()));
            }
            SimulatedKind::LogAnalytics => {
                self.pause().await;
                fields.insert("analyticsLogged".to_string(), json!(true));
            }
            SimulatedKind::MakeExternalApiCall => {
                self.pause().await;
                fields.insert(
                    "externalResponse".to_string(),
                    json!({ "status": 200, "data": "mock_api_response" }),
                );
            }
        }

        Ok(Value::Object(fields))
    }
}

impl SimulatedFunction {
    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

/// Register every simulated function on `registry`
pub fn register_simulated_functions(registry: &mut FunctionRegistry, latency: Duration) {
    for kind in SimulatedKind::ALL {
        registry.register(kind.function_name(), Arc::new(SimulatedFunction { kind, latency }));
    }
    tracing::info!("🧪 Registered {} simulated functions", SimulatedKind::ALL.len());
}
