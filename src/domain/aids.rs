/// Identifier (AID) domain operations: creation, listing, signing,
/// verification, rotation, event-log listing and OOBI generation
use crate::agent::{AgentClient, RotationConfig};
use crate::config::KeriConfig;
use crate::domain::{aid_prefix, find_aid, parse_sequence};
use crate::error::{BffError, BffResult};
use crate::keri::IdentifierConfig;
use crate::operations::run_to_completion;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAidRequest {
    pub alias: String,
    /// Explicit empty list means "no witnesses"; absent falls back to the
    /// deployment template
    pub wits: Option<Vec<String>>,
    pub transferable: Option<bool>,
    pub icount: Option<u32>,
    pub ncount: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aid {
    pub prefix: String,
    pub alias: String,
    pub transferable: bool,
    pub state: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAidsQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAidsResponse {
    pub aids: Vec<Aid>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    pub signature: String,
}

/// The signature artifact produced by signing: the interaction event
/// digest, its signature set and the signer's prefix
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSignature {
    pub event: String,
    pub sigs: Vec<String>,
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub text: String,
    pub signature: String,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub prefix: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateRequest {
    pub count: Option<u32>,
    pub ncount: Option<u32>,
    pub wits: Option<Vec<String>>,
    pub cuts: Option<Vec<String>>,
    pub adds: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateResponse {
    pub prefix: String,
    pub alias: String,
    pub sequence: u64,
    pub public_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AidEvent {
    pub sequence: u64,
    pub event_type: String,
    pub digest: String,
    pub timestamp: String,
    pub data: Value,
    pub signatures: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub alias: String,
    pub prefix: String,
    pub events: Vec<AidEvent>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOobiQuery {
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOobiResponse {
    pub oobi: String,
    pub alias: String,
    pub prefix: String,
}

/// Does this failure mean the alias was already incepted in the caller's
/// keystore? Used by the creation idempotency overlay.
fn is_already_incepted(err: &BffError) -> bool {
    match err {
        BffError::RemoteOperation { payload } => {
            payload.to_string().contains("already incepted")
        }
        BffError::Agent(message) => message.contains("already incepted"),
        _ => false,
    }
}

/// Create an identifier. Idempotent per alias: when the agent reports the
/// alias as already incepted, the existing identifier is returned as if
/// freshly created.
pub async fn create_aid(
    client: &dyn AgentClient,
    template: &KeriConfig,
    timeout: Duration,
    request: &CreateAidRequest,
) -> BffResult<Aid> {
    if request.alias.is_empty() {
        return Err(BffError::Validation(
            "Invalid AID alias - it cannot be empty".to_string(),
        ));
    }

    let config = IdentifierConfig::merged(
        template,
        request.wits.as_deref(),
        request.transferable,
        request.icount,
        request.ncount,
    );
    config.validate()?;

    let result = run_to_completion(
        client,
        "inception",
        client.create_identifier(&request.alias, &config),
        timeout,
    )
    .await;

    match result {
        Ok(_) => {}
        Err(e) if is_already_incepted(&e) => {
            tracing::info!("AID {} already incepted, returning existing", request.alias);
        }
        Err(e) => return Err(e),
    }

    // Read back the incepted (or pre-existing) identifier
    let detail = client.get_identifier(&request.alias).await?;
    let prefix = aid_prefix(&detail, &request.alias)?;

    let mut state = json!({
        "wits": config.wits,
        "icount": config.icount,
        "ncount": config.ncount,
    });
    if let Some(remote_state) = detail.get("state").and_then(|s| s.as_object()) {
        for (key, value) in remote_state {
            state[key] = value.clone();
        }
    }

    Ok(Aid {
        prefix,
        alias: request.alias.clone(),
        transferable: config.transferable,
        state,
    })
}

/// List identifiers with pagination
pub async fn list_aids(
    client: &dyn AgentClient,
    query: &ListAidsQuery,
) -> BffResult<ListAidsResponse> {
    let aids = client.list_identifiers().await?;
    let total = aids.len();

    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(100);

    let aids = aids
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|aid| {
            let alias = aid
                .get("name")
                .or_else(|| aid.get("alias"))
                .and_then(|n| n.as_str())
                .unwrap_or_default()
                .to_string();
            let prefix = aid
                .get("prefix")
                .or_else(|| aid.get("i"))
                .and_then(|p| p.as_str())
                .unwrap_or_default()
                .to_string();
            let transferable = aid
                .get("transferable")
                .and_then(|t| t.as_bool())
                .unwrap_or(true);
            Aid {
                prefix,
                alias,
                transferable,
                state: aid.get("state").cloned().unwrap_or(aid),
            }
        })
        .collect();

    Ok(ListAidsResponse { aids, total })
}

/// Sign a text message by committing to it with an interaction event.
///
/// The returned signature artifact is the event digest plus its signature
/// set, serialized as JSON; it proves a prior commitment by this service,
/// not a bare cryptographic signature over the text.
pub async fn sign_message(
    client: &dyn AgentClient,
    timeout: Duration,
    alias: &str,
    request: &SignRequest,
) -> BffResult<SignResponse> {
    if alias.is_empty() {
        return Err(BffError::Validation(
            "Invalid alias - it cannot be empty".to_string(),
        ));
    }
    if request.text.is_empty() {
        return Err(BffError::Validation(
            "Invalid text - it cannot be empty".to_string(),
        ));
    }

    let aid = find_aid(client, alias).await?;
    let prefix = aid_prefix(&aid, alias)?;

    let interaction = json!({
        "message": request.text,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    let operation = run_to_completion(
        client,
        "interaction",
        client.interact(alias, interaction),
        timeout,
    )
    .await?;

    let response = operation.response.unwrap_or_default();
    let event = response
        .get("d")
        .and_then(|d| d.as_str())
        .map(|d| d.to_string())
        .unwrap_or(operation.name);
    let sigs = response
        .get("sigs")
        .and_then(|s| s.as_array())
        .map(|sigs| {
            sigs.iter()
                .filter_map(|s| s.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let artifact = EventSignature { event, sigs, prefix };
    let signature = serde_json::to_string(&artifact)
        .map_err(|e| BffError::Internal(format!("Failed to serialize signature: {}", e)))?;

    Ok(SignResponse { signature })
}

/// Check a signature artifact for structural consistency with a prior
/// signing call: digest present, signature list present, embedded prefix
/// matching the claimed signer. Cryptographic verification against the
/// KEL remains the agent's responsibility.
pub async fn verify_message(
    client: &dyn AgentClient,
    alias: &str,
    request: &VerifyRequest,
) -> BffResult<VerifyResponse> {
    if alias.is_empty() {
        return Err(BffError::Validation(
            "Invalid alias - it cannot be empty".to_string(),
        ));
    }
    if request.text.is_empty() {
        return Err(BffError::Validation(
            "Invalid text - it cannot be empty".to_string(),
        ));
    }
    if request.signature.is_empty() {
        return Err(BffError::Validation(
            "Invalid signature - it cannot be empty".to_string(),
        ));
    }

    let aid = find_aid(client, alias).await?;
    let prefix = match &request.prefix {
        Some(prefix) => prefix.clone(),
        None => aid_prefix(&aid, alias)?,
    };

    // A malformed artifact is an invalid signature, not a request error
    let artifact: EventSignature = match serde_json::from_str(&request.signature) {
        Ok(artifact) => artifact,
        Err(_) => {
            return Ok(VerifyResponse {
                valid: false,
                prefix,
            })
        }
    };

    let valid = !artifact.event.is_empty() && artifact.prefix == prefix;

    Ok(VerifyResponse { valid, prefix })
}

/// Does the remote rejection indicate a non-transferable target?
fn is_non_transferable_rejection(err: &BffError) -> bool {
    match err {
        BffError::RemoteOperation { payload } => {
            let text = payload.to_string();
            text.contains("non-transferable") || text.contains("not transferable")
        }
        BffError::Agent(message) => {
            message.contains("non-transferable") || message.contains("not transferable")
        }
        _ => false,
    }
}

/// Rotate the signing keys of an identifier.
///
/// The post-rotation state is re-fetched because not every agent version
/// carries the new sequence number and key in the operation response;
/// re-fetched values win when both are present.
pub async fn rotate_keys(
    client: &dyn AgentClient,
    timeout: Duration,
    alias: &str,
    request: &RotateRequest,
) -> BffResult<RotateResponse> {
    if alias.is_empty() {
        return Err(BffError::Validation(
            "Invalid alias - it cannot be empty".to_string(),
        ));
    }

    let aid = find_aid(client, alias).await?;
    let prefix = aid_prefix(&aid, alias)?;

    if aid.get("transferable").and_then(|t| t.as_bool()) == Some(false) {
        return Err(BffError::RotationNotAllowed(format!(
            "AID {} is non-transferable and cannot rotate keys",
            alias
        )));
    }

    let rotation = RotationConfig {
        count: request.count,
        ncount: request.ncount,
        wits: request.wits.clone(),
        cuts: request.cuts.clone(),
        adds: request.adds.clone(),
    };

    let operation = run_to_completion(
        client,
        "rotation",
        client.rotate_identifier(alias, &rotation),
        timeout,
    )
    .await
    .map_err(|e| {
        if is_non_transferable_rejection(&e) {
            BffError::RotationNotAllowed(format!(
                "AID {} is non-transferable and cannot rotate keys",
                alias
            ))
        } else {
            e
        }
    })?;

    let updated = client.get_identifier(alias).await?;
    let updated_state = updated.get("state").cloned().unwrap_or(updated);
    let response = operation.response.unwrap_or_default();

    let sequence = parse_sequence(updated_state.get("s"))
        .or_else(|| parse_sequence(response.get("s")))
        .unwrap_or(0);
    let public_key = updated_state
        .get("k")
        .and_then(|k| k.as_array())
        .and_then(|k| k.first())
        .and_then(|k| k.as_str())
        .unwrap_or("unknown")
        .to_string();

    tracing::info!("Rotated keys for {} - new sequence {}", alias, sequence);

    Ok(RotateResponse {
        prefix,
        alias: alias.to_string(),
        sequence,
        public_key,
    })
}

/// List the key event log of an identifier with pagination. Agents that do
/// not expose the raw KEL yield a single inception summary derived from
/// current state.
pub async fn list_events(
    client: &dyn AgentClient,
    alias: &str,
    query: &EventsQuery,
) -> BffResult<EventsResponse> {
    if alias.is_empty() {
        return Err(BffError::Validation(
            "Invalid alias - it cannot be empty".to_string(),
        ));
    }

    let aid = find_aid(client, alias).await?;
    let prefix = aid_prefix(&aid, alias)?;

    let detail = client.get_identifier(alias).await?;
    let log = detail
        .get("events")
        .or_else(|| detail.get("kel"))
        .or_else(|| detail.get("log"))
        .and_then(|e| e.as_array())
        .cloned();

    let (events, total) = match log {
        Some(log) => {
            let total = log.len();
            let offset = query.offset.unwrap_or(0);
            let limit = query.limit.unwrap_or(100);

            let events = log
                .into_iter()
                .skip(offset)
                .take(limit)
                .enumerate()
                .map(|(index, event)| AidEvent {
                    sequence: parse_sequence(event.get("s").or_else(|| event.get("sequence")))
                        .unwrap_or((offset + index) as u64),
                    event_type: event
                        .get("t")
                        .or_else(|| event.get("type"))
                        .and_then(|t| t.as_str())
                        .unwrap_or("unknown")
                        .to_string(),
                    digest: event
                        .get("d")
                        .or_else(|| event.get("digest"))
                        .or_else(|| event.get("said"))
                        .and_then(|d| d.as_str())
                        .unwrap_or("unknown")
                        .to_string(),
                    timestamp: event
                        .get("dt")
                        .or_else(|| event.get("timestamp"))
                        .and_then(|t| t.as_str())
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
                    signatures: event
                        .get("sigs")
                        .or_else(|| event.get("signatures"))
                        .and_then(|s| s.as_array())
                        .map(|sigs| {
                            sigs.iter()
                                .filter_map(|s| s.as_str().map(|s| s.to_string()))
                                .collect()
                        })
                        .unwrap_or_default(),
                    data: event,
                })
                .collect();

            (events, total)
        }
        None => {
            // No raw log available; summarize the inception from state
            let state = detail.get("state").cloned().unwrap_or(detail.clone());
            let summary = AidEvent {
                sequence: parse_sequence(state.get("s")).unwrap_or(0),
                event_type: "icp".to_string(),
                digest: state
                    .get("d")
                    .and_then(|d| d.as_str())
                    .unwrap_or(&prefix)
                    .to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                data: detail,
                signatures: Vec::new(),
            };
            (vec![summary], 1)
        }
    };

    Ok(EventsResponse {
        alias: alias.to_string(),
        prefix,
        events,
        total,
    })
}

/// Generate an OOBI URL other parties can use to discover and verify this
/// identifier's key event log
pub async fn generate_oobi(
    client: &dyn AgentClient,
    alias: &str,
    query: &GenerateOobiQuery,
) -> BffResult<GenerateOobiResponse> {
    if alias.is_empty() {
        return Err(BffError::Validation(
            "Invalid alias - it cannot be empty".to_string(),
        ));
    }

    let aid = find_aid(client, alias).await?;
    let prefix = aid_prefix(&aid, alias)?;

    let role = query.role.as_deref().unwrap_or("witness");
    let result = client.get_oobi(alias, role).await?;

    let oobi = result
        .get("oobis")
        .and_then(|o| o.as_array())
        .and_then(|o| o.first())
        .and_then(|o| o.as_str())
        .or_else(|| result.get("oobi").and_then(|o| o.as_str()))
        .map(|o| o.to_string())
        .ok_or_else(|| BffError::Agent(format!("No OOBI URL generated for AID {}", alias)))?;

    Ok(GenerateOobiResponse {
        oobi,
        alias: alias.to_string(),
        prefix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::FakeAgent;

    fn template() -> KeriConfig {
        KeriConfig::default()
    }

    fn timeout() -> Duration {
        Duration::from_millis(500)
    }

    fn create_request(alias: &str) -> CreateAidRequest {
        CreateAidRequest {
            alias: alias.to_string(),
            wits: None,
            transferable: None,
            icount: None,
            ncount: None,
        }
    }

    #[tokio::test]
    async fn test_create_aid_returns_prefix_and_state() {
        let agent = FakeAgent::new();
        let aid = create_aid(&agent, &template(), timeout(), &create_request("alice"))
            .await
            .unwrap();

        assert_eq!(aid.alias, "alice");
        assert!(aid.prefix.starts_with('E'));
        assert!(aid.transferable);
        assert_eq!(aid.state["wits"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_aid_is_idempotent() {
        let agent = FakeAgent::new();
        let first = create_aid(&agent, &template(), timeout(), &create_request("alice"))
            .await
            .unwrap();
        let second = create_aid(&agent, &template(), timeout(), &create_request("alice"))
            .await
            .unwrap();

        assert_eq!(first.prefix, second.prefix);
    }

    #[tokio::test]
    async fn test_create_aid_rejects_empty_alias() {
        let agent = FakeAgent::new();
        let err = create_aid(&agent, &template(), timeout(), &create_request(""))
            .await
            .unwrap_err();
        assert!(matches!(err, BffError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_aid_with_explicit_empty_wits() {
        let agent = FakeAgent::new();
        let mut request = create_request("alice");
        request.wits = Some(Vec::new());

        let aid = create_aid(&agent, &template(), timeout(), &request)
            .await
            .unwrap();
        assert!(aid.state["wits"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_operations_are_cleaned_up() {
        let agent = FakeAgent::new();
        create_aid(&agent, &template(), timeout(), &create_request("alice"))
            .await
            .unwrap();
        assert_eq!(agent.deleted_operations().len(), 1);
    }

    #[tokio::test]
    async fn test_list_aids_paginates() {
        let agent = FakeAgent::new();
        for alias in ["a", "b", "c"] {
            create_aid(&agent, &template(), timeout(), &create_request(alias))
                .await
                .unwrap();
        }

        let page = list_aids(
            &agent,
            &ListAidsQuery {
                limit: Some(2),
                offset: Some(1),
            },
        )
        .await
        .unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.aids.len(), 2);
        assert_eq!(page.aids[0].alias, "b");
    }

    #[tokio::test]
    async fn test_sign_then_verify_round_trip() {
        let agent = FakeAgent::new();
        create_aid(&agent, &template(), timeout(), &create_request("alice"))
            .await
            .unwrap();

        let signed = sign_message(
            &agent,
            timeout(),
            "alice",
            &SignRequest {
                text: "hello".to_string(),
            },
        )
        .await
        .unwrap();

        let verified = verify_message(
            &agent,
            "alice",
            &VerifyRequest {
                text: "hello".to_string(),
                signature: signed.signature,
                prefix: None,
            },
        )
        .await
        .unwrap();

        assert!(verified.valid);
        assert!(verified.prefix.starts_with('E'));
    }

    #[tokio::test]
    async fn test_verify_rejects_malformed_signature() {
        let agent = FakeAgent::new();
        create_aid(&agent, &template(), timeout(), &create_request("alice"))
            .await
            .unwrap();

        let verified = verify_message(
            &agent,
            "alice",
            &VerifyRequest {
                text: "hello".to_string(),
                signature: "not json".to_string(),
                prefix: None,
            },
        )
        .await
        .unwrap();

        assert!(!verified.valid);
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_prefix() {
        let agent = FakeAgent::new();
        create_aid(&agent, &template(), timeout(), &create_request("alice"))
            .await
            .unwrap();

        let signed = sign_message(
            &agent,
            timeout(),
            "alice",
            &SignRequest {
                text: "hello".to_string(),
            },
        )
        .await
        .unwrap();

        let verified = verify_message(
            &agent,
            "alice",
            &VerifyRequest {
                text: "hello".to_string(),
                signature: signed.signature,
                prefix: Some("Esomeoneelse".to_string()),
            },
        )
        .await
        .unwrap();

        assert!(!verified.valid);
    }

    #[tokio::test]
    async fn test_sign_unknown_alias_is_not_found() {
        let agent = FakeAgent::new();
        let err = sign_message(
            &agent,
            timeout(),
            "ghost",
            &SignRequest {
                text: "hello".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BffError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rotate_bumps_sequence_and_key() {
        let agent = FakeAgent::new();
        create_aid(&agent, &template(), timeout(), &create_request("alice"))
            .await
            .unwrap();

        let rotated = rotate_keys(&agent, timeout(), "alice", &RotateRequest::default())
            .await
            .unwrap();

        assert_eq!(rotated.sequence, 1);
        assert!(rotated.public_key.starts_with('D'));
        assert_eq!(rotated.alias, "alice");
    }

    #[tokio::test]
    async fn test_rotate_non_transferable_is_rejected() {
        let agent = FakeAgent::new();
        let mut request = create_request("device");
        request.transferable = Some(false);
        create_aid(&agent, &template(), timeout(), &request)
            .await
            .unwrap();

        let err = rotate_keys(&agent, timeout(), "device", &RotateRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, BffError::RotationNotAllowed(_)));
    }

    #[tokio::test]
    async fn test_remote_non_transferable_rejection_is_classified() {
        // Force the remote-rejection path by hiding the transferable flag
        // from the listed identifier
        let agent = FakeAgent::new();
        let mut request = create_request("device");
        request.transferable = Some(false);
        create_aid(&agent, &template(), timeout(), &request)
            .await
            .unwrap();
        agent.hide_transferable_flag("device");

        let err = rotate_keys(&agent, timeout(), "device", &RotateRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, BffError::RotationNotAllowed(_)));
    }

    #[tokio::test]
    async fn test_events_for_fresh_aid_contains_inception() {
        let agent = FakeAgent::new();
        create_aid(&agent, &template(), timeout(), &create_request("alice"))
            .await
            .unwrap();

        let events = list_events(
            &agent,
            "alice",
            &EventsQuery {
                limit: Some(5),
                offset: Some(0),
            },
        )
        .await
        .unwrap();

        assert!(events.total >= 1);
        assert_eq!(events.events[0].event_type, "icp");
        assert!(events.prefix.starts_with('E'));
    }

    #[tokio::test]
    async fn test_generate_oobi_returns_url() {
        let agent = FakeAgent::new();
        create_aid(&agent, &template(), timeout(), &create_request("alice"))
            .await
            .unwrap();

        let oobi = generate_oobi(&agent, "alice", &GenerateOobiQuery { role: None })
            .await
            .unwrap();

        assert!(oobi.oobi.starts_with("http"));
        assert_eq!(oobi.alias, "alice");
    }
}
