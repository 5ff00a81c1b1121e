/// Remote identity agent (KERIA) collaborator seam
///
/// The agent holds all key material and executes the KERI protocol on the
/// caller's behalf; this service only talks to it through the traits below.
/// Keeping the seam behind a trait lets tests substitute an isolated mock
/// agent per test run instead of sharing process-wide state.
pub mod http;

use crate::error::BffResult;
use crate::keri::IdentifierConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub use http::HttpAgentConnector;

/// Long-running operation handle created by the agent for every mutating
/// call. Owned transiently for the duration of one request; must be
/// deleted once observed done or agent-side state accumulates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Rotation request payload; only the supplied fields are sent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RotationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ncount: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wits: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adds: Option<Vec<String>>,
}

/// Session-scoped connection to the agent
///
/// Every mutating call returns an [`Operation`] handle; `wait_operation`
/// is the agent's bounded-wait primitive and `delete_operation` releases
/// the handle's server-side record.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn list_identifiers(&self) -> BffResult<Vec<Value>>;
    async fn get_identifier(&self, alias: &str) -> BffResult<Value>;
    async fn create_identifier(
        &self,
        alias: &str,
        config: &IdentifierConfig,
    ) -> BffResult<Operation>;
    async fn rotate_identifier(&self, alias: &str, config: &RotationConfig)
        -> BffResult<Operation>;
    async fn interact(&self, alias: &str, data: Value) -> BffResult<Operation>;

    async fn wait_operation(&self, name: &str, timeout: Duration) -> BffResult<Operation>;
    async fn delete_operation(&self, name: &str) -> BffResult<()>;

    async fn get_oobi(&self, alias: &str, role: &str) -> BffResult<Value>;
    async fn resolve_oobi(&self, url: &str, alias: &str) -> BffResult<Operation>;

    async fn list_registries(&self, alias: &str) -> BffResult<Vec<Value>>;
    async fn create_registry(&self, alias: &str, registry_name: &str) -> BffResult<Operation>;

    async fn issue_credential(&self, alias: &str, data: Value) -> BffResult<Operation>;
    async fn list_credentials(&self, alias: &str) -> BffResult<Vec<Value>>;
}

/// Factory for session-scoped agent connections
///
/// One connection is opened per request from the resolved bran and dropped
/// at request end; no connection state spans requests.
#[async_trait]
pub trait AgentConnector: Send + Sync {
    async fn connect(&self, bran: &str) -> BffResult<Box<dyn AgentClient>>;
}
