/// ACDC credential issuance and listing
use crate::agent::AgentClient;
use crate::config::KeriConfig;
use crate::domain::{aid_prefix, find_aid, parse_sequence};
use crate::domain::aids::{self, CreateAidRequest};
use crate::error::{BffError, BffResult};
use crate::operations::run_to_completion;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCredentialRequest {
    pub issuer: String,
    pub subject: String,
    pub schema_said: String,
    pub claims: Map<String, Value>,
    pub edges: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCredentialResponse {
    pub id: String,
    pub acdc: Value,
    pub anchors: CredentialAnchors,
}

/// Where the credential is anchored: the issuance event in the issuer's
/// KEL and the registry in the TEL
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialAnchors {
    pub kel: String,
    pub tel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCredentialsResponse {
    pub credentials: Vec<Value>,
    pub total: usize,
}

/// Ensure the issuer identifier exists, creating a transferable
/// witness-less AID when it does not. Creation is idempotent per alias,
/// so racing requests converge on the same identifier.
async fn ensure_issuer(
    client: &dyn AgentClient,
    timeout: Duration,
    issuer: &str,
) -> BffResult<String> {
    let issuer_template = KeriConfig {
        transferable: true,
        wits: Vec::new(),
        toad: 0,
        icount: 1,
        ncount: 1,
        isith: "1".to_string(),
        nsith: "1".to_string(),
    };
    let aid = aids::create_aid(
        client,
        &issuer_template,
        timeout,
        &CreateAidRequest {
            alias: issuer.to_string(),
            wits: Some(Vec::new()),
            transferable: Some(true),
            icount: None,
            ncount: None,
        },
    )
    .await?;
    Ok(aid.prefix)
}

/// Ensure the issuer has a credential registry, returning its key.
/// One registry per issuer, named after the alias.
async fn ensure_registry(
    client: &dyn AgentClient,
    timeout: Duration,
    issuer: &str,
) -> BffResult<String> {
    let mut registries = client.list_registries(issuer).await?;

    if registries.is_empty() {
        let registry_name = format!("{}-registry", issuer);
        run_to_completion(
            client,
            "registry creation",
            client.create_registry(issuer, &registry_name),
            timeout,
        )
        .await?;
        registries = client.list_registries(issuer).await?;
    }

    registries
        .first()
        .and_then(|r| {
            r.get("regk")
                .or_else(|| r.get("name"))
                .and_then(|k| k.as_str())
        })
        .map(|k| k.to_string())
        .ok_or_else(|| {
            BffError::Agent(format!("No credential registry available for {}", issuer))
        })
}

/// Issue an ACDC credential from `issuer` to `subject`.
///
/// Bootstraps the issuer AID and its registry on first use, then drives
/// the issuance operation to completion and returns the credential SAID
/// together with its KEL and TEL anchors.
pub async fn issue_credential(
    client: &dyn AgentClient,
    timeout: Duration,
    request: &IssueCredentialRequest,
) -> BffResult<IssueCredentialResponse> {
    if request.issuer.is_empty() {
        return Err(BffError::Validation(
            "Invalid issuer alias - it cannot be empty".to_string(),
        ));
    }
    if request.subject.is_empty() {
        return Err(BffError::Validation(
            "Invalid subject - it cannot be empty".to_string(),
        ));
    }
    if request.schema_said.is_empty() {
        return Err(BffError::Validation(
            "Invalid schema SAID - it cannot be empty".to_string(),
        ));
    }

    let issuer_prefix = ensure_issuer(client, timeout, &request.issuer).await?;
    let registry_key = ensure_registry(client, timeout, &request.issuer).await?;

    let mut attributes = json!({
        "i": request.subject,
        "dt": chrono::Utc::now().to_rfc3339(),
    });
    for (key, value) in &request.claims {
        attributes[key.as_str()] = value.clone();
    }

    let mut data = json!({
        "ri": registry_key,
        "s": request.schema_said,
        "a": attributes,
    });
    if let Some(edges) = &request.edges {
        data["e"] = edges.clone();
    }

    let operation = run_to_completion(
        client,
        "credential issuance",
        client.issue_credential(&request.issuer, data.clone()),
        timeout,
    )
    .await?;

    let response = operation.response.unwrap_or_default();
    let said = response
        .get("d")
        .or_else(|| response.pointer("/acdc/d"))
        .or_else(|| response.pointer("/anchor/d"))
        .and_then(|d| d.as_str())
        .map(|d| d.to_string())
        .ok_or_else(|| {
            BffError::Agent("Credential issued but no SAID returned by agent".to_string())
        })?;

    let sequence = parse_sequence(response.get("sn").or_else(|| response.get("s")))
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    // Echo back the prefix the agent actually assigned
    let issuer_prefix = match find_aid(client, &request.issuer).await {
        Ok(aid) => aid_prefix(&aid, &request.issuer).unwrap_or(issuer_prefix),
        Err(_) => issuer_prefix,
    };

    let acdc = json!({
        "v": "ACDC10JSON000000_",
        "d": said,
        "i": issuer_prefix,
        "ri": registry_key,
        "s": request.schema_said,
        "a": data["a"],
    });

    Ok(IssueCredentialResponse {
        id: said,
        acdc,
        anchors: CredentialAnchors {
            kel: format!("sn: {}", sequence),
            tel: registry_key,
        },
    })
}

/// List the credentials issued by an identifier
pub async fn list_credentials(
    client: &dyn AgentClient,
    issuer: &str,
) -> BffResult<ListCredentialsResponse> {
    if issuer.is_empty() {
        return Err(BffError::Validation(
            "Invalid issuer alias - it cannot be empty".to_string(),
        ));
    }

    let credentials = client.list_credentials(issuer).await?;
    let total = credentials.len();

    Ok(ListCredentialsResponse { credentials, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::FakeAgent;

    fn timeout() -> Duration {
        Duration::from_millis(500)
    }

    fn request() -> IssueCredentialRequest {
        let mut claims = Map::new();
        claims.insert("LEI".to_string(), json!("5493001KJTIIGC8Y1R12"));
        IssueCredentialRequest {
            issuer: "qvi".to_string(),
            subject: "Ele-subject".to_string(),
            schema_said: "EBfdlu8R27Fbx-ehrqwImnK-8Cm79sqbAQ4MmvEAYqao".to_string(),
            claims,
            edges: None,
        }
    }

    #[tokio::test]
    async fn test_issue_bootstraps_issuer_and_registry() {
        let agent = FakeAgent::new();
        let issued = issue_credential(&agent, timeout(), &request())
            .await
            .unwrap();

        assert!(issued.id.starts_with("Ecred"));
        assert_eq!(issued.acdc["v"], "ACDC10JSON000000_");
        assert_eq!(issued.acdc["a"]["i"], "Ele-subject");
        assert_eq!(issued.acdc["a"]["LEI"], "5493001KJTIIGC8Y1R12");
        assert!(issued.anchors.tel.starts_with("Ereg"));
        assert_eq!(issued.anchors.kel, "sn: 1");
    }

    #[tokio::test]
    async fn test_second_issuance_reuses_issuer_and_registry() {
        let agent = FakeAgent::new();
        let first = issue_credential(&agent, timeout(), &request())
            .await
            .unwrap();
        let second = issue_credential(&agent, timeout(), &request())
            .await
            .unwrap();

        assert_eq!(first.anchors.tel, second.anchors.tel);
        assert_eq!(first.acdc["i"], second.acdc["i"]);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_issued_credentials_are_listed() {
        let agent = FakeAgent::new();
        issue_credential(&agent, timeout(), &request())
            .await
            .unwrap();

        let listed = list_credentials(&agent, "qvi").await.unwrap();
        assert_eq!(listed.total, 1);
    }

    #[tokio::test]
    async fn test_empty_schema_is_rejected() {
        let agent = FakeAgent::new();
        let mut bad = request();
        bad.schema_said = String::new();

        let err = issue_credential(&agent, timeout(), &bad).await.unwrap_err();
        assert!(matches!(err, BffError::Validation(_)));
    }
}
