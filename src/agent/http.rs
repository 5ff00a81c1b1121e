/// HTTP-backed KERIA agent client
use crate::agent::{AgentClient, AgentConnector, Operation, RotationConfig};
use crate::config::AgentConfig;
use crate::error::{BffError, BffResult};
use crate::keri::IdentifierConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

/// Connects to a KERIA agent over its admin API
#[derive(Clone)]
pub struct HttpAgentConnector {
    config: AgentConfig,
    http: reqwest::Client,
}

impl HttpAgentConnector {
    pub fn new(config: AgentConfig) -> BffResult<Self> {
        // The outer request timeout stays above the operation deadline so
        // the orchestrator's own deadline fires first.
        let request_timeout = Duration::from_millis(config.operation_timeout_ms + 10_000);
        let http = reqwest::Client::builder()
            .user_agent(concat!("vlei-bff/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .map_err(|e| BffError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }
}

#[async_trait]
impl AgentConnector for HttpAgentConnector {
    /// Boot (idempotently) and connect an agent session seeded by the bran
    async fn connect(&self, bran: &str) -> BffResult<Box<dyn AgentClient>> {
        let boot_url = format!("{}/boot", self.config.boot_url);
        let response = self
            .http
            .post(&boot_url)
            .json(&json!({ "bran": bran }))
            .send()
            .await
            .map_err(|e| BffError::Agent(format!("Failed to boot agent session: {}", e)))?;

        // A conflict means this bran's agent already exists, which is the
        // normal case for a continuing session.
        if !response.status().is_success() && response.status() != StatusCode::CONFLICT {
            return Err(BffError::Agent(format!(
                "Agent boot returned error: {}",
                response.status()
            )));
        }

        Ok(Box::new(HttpAgentClient {
            admin_url: self.config.admin_url.clone(),
            http: self.http.clone(),
            bran: bran.to_string(),
        }))
    }
}

/// One session-scoped connection to the agent's admin API
struct HttpAgentClient {
    admin_url: String,
    http: reqwest::Client,
    bran: String,
}

impl HttpAgentClient {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.admin_url, path)
    }

    async fn check(&self, response: reqwest::Response, context: &str) -> BffResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(BffError::NotFound(format!("{}: {}", context, body)));
        }
        Err(BffError::Agent(format!(
            "{} returned {}: {}",
            context, status, body
        )))
    }

    async fn get_json(&self, path: &str, context: &str) -> BffResult<Value> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.bran)
            .send()
            .await
            .map_err(|e| BffError::Agent(format!("{}: {}", context, e)))?;

        self.check(response, context)
            .await?
            .json()
            .await
            .map_err(|e| BffError::Agent(format!("{} returned invalid JSON: {}", context, e)))
    }

    async fn post_operation(&self, path: &str, body: &Value, context: &str) -> BffResult<Operation> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.bran)
            .json(body)
            .send()
            .await
            .map_err(|e| BffError::Agent(format!("{}: {}", context, e)))?;

        self.check(response, context)
            .await?
            .json()
            .await
            .map_err(|e| BffError::Agent(format!("{} returned invalid operation: {}", context, e)))
    }

    /// The agent may return identifier lists either bare or wrapped in an
    /// `aids` envelope depending on version.
    fn unwrap_list(value: Value, key: &str) -> Vec<Value> {
        match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove(key) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn list_identifiers(&self) -> BffResult<Vec<Value>> {
        let value = self.get_json("/identifiers", "List identifiers").await?;
        Ok(Self::unwrap_list(value, "aids"))
    }

    async fn get_identifier(&self, alias: &str) -> BffResult<Value> {
        self.get_json(
            &format!("/identifiers/{}", alias),
            &format!("Get identifier {}", alias),
        )
        .await
    }

    async fn create_identifier(
        &self,
        alias: &str,
        config: &IdentifierConfig,
    ) -> BffResult<Operation> {
        let mut body = serde_json::to_value(config)
            .map_err(|e| BffError::Internal(format!("Failed to serialize config: {}", e)))?;
        body["name"] = json!(alias);
        self.post_operation("/identifiers", &body, &format!("Create identifier {}", alias))
            .await
    }

    async fn rotate_identifier(
        &self,
        alias: &str,
        config: &RotationConfig,
    ) -> BffResult<Operation> {
        let body = serde_json::to_value(config)
            .map_err(|e| BffError::Internal(format!("Failed to serialize rotation: {}", e)))?;
        self.post_operation(
            &format!("/identifiers/{}/rotations", alias),
            &body,
            &format!("Rotate identifier {}", alias),
        )
        .await
    }

    async fn interact(&self, alias: &str, data: Value) -> BffResult<Operation> {
        self.post_operation(
            &format!("/identifiers/{}/interactions", alias),
            &data,
            &format!("Interact with identifier {}", alias),
        )
        .await
    }

    async fn wait_operation(&self, name: &str, timeout: Duration) -> BffResult<Operation> {
        // Long poll bounded by the agent; the orchestrator applies its own
        // hard deadline on top.
        self.get_json(
            &format!("/operations/{}?wait={}", name, timeout.as_millis()),
            &format!("Wait for operation {}", name),
        )
        .await
        .and_then(|value| {
            serde_json::from_value(value)
                .map_err(|e| BffError::Agent(format!("Invalid operation payload: {}", e)))
        })
    }

    async fn delete_operation(&self, name: &str) -> BffResult<()> {
        let context = format!("Delete operation {}", name);
        let response = self
            .http
            .delete(self.url(&format!("/operations/{}", name)))
            .bearer_auth(&self.bran)
            .send()
            .await
            .map_err(|e| BffError::Agent(format!("{}: {}", context, e)))?;

        self.check(response, &context).await?;
        Ok(())
    }

    async fn get_oobi(&self, alias: &str, role: &str) -> BffResult<Value> {
        self.get_json(
            &format!("/identifiers/{}/oobis?role={}", alias, role),
            &format!("Get OOBI for {}", alias),
        )
        .await
    }

    async fn resolve_oobi(&self, url: &str, alias: &str) -> BffResult<Operation> {
        self.post_operation(
            "/oobis",
            &json!({ "url": url, "oobialias": alias }),
            &format!("Resolve OOBI {}", url),
        )
        .await
    }

    async fn list_registries(&self, alias: &str) -> BffResult<Vec<Value>> {
        let value = self
            .get_json(
                &format!("/identifiers/{}/registries", alias),
                &format!("List registries for {}", alias),
            )
            .await?;
        Ok(Self::unwrap_list(value, "registries"))
    }

    async fn create_registry(&self, alias: &str, registry_name: &str) -> BffResult<Operation> {
        self.post_operation(
            &format!("/identifiers/{}/registries", alias),
            &json!({ "name": registry_name, "noBackers": true }),
            &format!("Create registry {} for {}", registry_name, alias),
        )
        .await
    }

    async fn issue_credential(&self, alias: &str, data: Value) -> BffResult<Operation> {
        self.post_operation(
            &format!("/identifiers/{}/credentials", alias),
            &data,
            &format!("Issue credential from {}", alias),
        )
        .await
    }

    async fn list_credentials(&self, alias: &str) -> BffResult<Vec<Value>> {
        let value = self
            .get_json(
                &format!("/identifiers/{}/credentials", alias),
                &format!("List credentials for {}", alias),
            )
            .await?;
        Ok(Self::unwrap_list(value, "credentials"))
    }
}
