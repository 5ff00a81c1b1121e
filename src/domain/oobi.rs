/// OOBI resolution: introducing a remote identifier to the caller's agent
use crate::agent::AgentClient;
use crate::error::{BffError, BffResult};
use crate::operations::run_to_completion;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOobiRequest {
    pub oobi: String,
    pub alias: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OobiOperation {
    pub name: String,
    pub done: bool,
    pub response: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOobiResponse {
    pub operation: OobiOperation,
    pub success: bool,
}

/// Resolve an OOBI URL under a contact alias.
///
/// The alias is suffixed with a unique token so repeated resolutions of the
/// same contact never collide in the agent's contact store. A resolution
/// that outlives the deadline is reported as pending rather than failed;
/// the agent keeps working on it in the background.
pub async fn resolve_oobi(
    client: &dyn AgentClient,
    timeout: Duration,
    request: &ResolveOobiRequest,
) -> BffResult<ResolveOobiResponse> {
    if request.oobi.is_empty() {
        return Err(BffError::Validation(
            "Invalid OOBI URL - it cannot be empty".to_string(),
        ));
    }
    if request.alias.is_empty() {
        return Err(BffError::Validation(
            "Invalid contact alias - it cannot be empty".to_string(),
        ));
    }

    let unique_alias = format!("{}-{}", request.alias, Uuid::new_v4());
    let submitted = client.resolve_oobi(&request.oobi, &unique_alias).await?;
    let name = submitted.name.clone();

    let result = run_to_completion(
        client,
        "oobi resolution",
        async { Ok(submitted) },
        timeout,
    )
    .await;

    match result {
        Ok(operation) => Ok(ResolveOobiResponse {
            operation: OobiOperation {
                name: operation.name,
                done: operation.done,
                response: operation.response,
            },
            success: true,
        }),
        Err(BffError::OperationTimeout { .. }) => {
            tracing::warn!("OOBI resolution {} still pending after deadline", name);
            Ok(ResolveOobiResponse {
                operation: OobiOperation {
                    name,
                    done: false,
                    response: None,
                },
                success: false,
            })
        }
        Err(e) => Err(e),
    }
}
