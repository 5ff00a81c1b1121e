/// Domain operations: thin policy layers over the operation orchestrator
///
/// Each operation acquires a session-scoped agent connection, locates its
/// target by alias, builds the mode-specific payload, drives the remote
/// operation to completion and extracts a typed result.
pub mod aids;
pub mod credentials;
pub mod oobi;

use crate::error::{BffError, BffResult};
use crate::agent::AgentClient;
use serde_json::Value;

/// Locate an identifier by alias, listing the caller's identifiers and
/// matching on name
pub(crate) async fn find_aid(client: &dyn AgentClient, alias: &str) -> BffResult<Value> {
    let aids = client.list_identifiers().await?;
    aids.into_iter()
        .find(|aid| {
            aid.get("name")
                .or_else(|| aid.get("alias"))
                .and_then(|n| n.as_str())
                == Some(alias)
        })
        .ok_or_else(|| BffError::NotFound(format!("AID with alias {} not found", alias)))
}

/// Extract the identifier prefix, tolerating both field spellings the
/// agent has used across versions
pub(crate) fn aid_prefix(aid: &Value, alias: &str) -> BffResult<String> {
    aid.get("prefix")
        .or_else(|| aid.get("i"))
        .and_then(|p| p.as_str())
        .map(|p| p.to_string())
        .ok_or_else(|| {
            BffError::Internal(format!("Could not determine AID prefix for {}", alias))
        })
}

/// Read a sequence number that may arrive as a string or a number
pub(crate) fn parse_sequence(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory agent double shared by the domain tests. Behaves like a
    //! small KERIA: identifiers, registries and credentials live in a
    //! mutex-guarded table and every mutating call returns a completed
    //! operation handle.
    use crate::agent::{AgentClient, Operation, RotationConfig};
    use crate::error::{BffError, BffResult};
    use crate::keri::IdentifierConfig;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeState {
        aids: Vec<FakeAid>,
        registries: HashMap<String, Vec<Value>>,
        credentials: HashMap<String, Vec<Value>>,
        deleted: Vec<String>,
        counter: u64,
        oobi_pending: bool,
    }

    struct FakeAid {
        alias: String,
        prefix: String,
        transferable: bool,
        // Simulates older agents that omit the flag from listings
        flag_visible: bool,
        sequence: u64,
        key: String,
        wits: Vec<String>,
    }

    impl FakeAid {
        fn listed(&self) -> Value {
            let mut entry = json!({
                "name": self.alias,
                "prefix": self.prefix,
                "state": self.state(),
            });
            if self.flag_visible {
                entry["transferable"] = json!(self.transferable);
            }
            entry
        }

        fn state(&self) -> Value {
            json!({
                "s": self.sequence.to_string(),
                "d": format!("{}-digest-{}", self.prefix, self.sequence),
                "k": [self.key],
                "wits": self.wits,
            })
        }
    }

    pub(crate) struct FakeAgent {
        state: Mutex<FakeState>,
    }

    impl FakeAgent {
        pub(crate) fn new() -> Self {
            Self {
                state: Mutex::new(FakeState::default()),
            }
        }

        pub(crate) fn deleted_operations(&self) -> Vec<String> {
            self.state.lock().unwrap().deleted.clone()
        }

        pub(crate) fn hide_transferable_flag(&self, alias: &str) {
            let mut state = self.state.lock().unwrap();
            if let Some(aid) = state.aids.iter_mut().find(|a| a.alias == alias) {
                aid.flag_visible = false;
            }
        }

        pub(crate) fn set_oobi_pending(&self) {
            self.state.lock().unwrap().oobi_pending = true;
        }

        fn done(name: String, response: Value) -> Operation {
            Operation {
                name,
                done: true,
                response: Some(response),
                error: None,
            }
        }
    }

    #[async_trait]
    impl AgentClient for FakeAgent {
        async fn list_identifiers(&self) -> BffResult<Vec<Value>> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .aids
                .iter()
                .map(FakeAid::listed)
                .collect())
        }

        async fn get_identifier(&self, alias: &str) -> BffResult<Value> {
            self.state
                .lock()
                .unwrap()
                .aids
                .iter()
                .find(|a| a.alias == alias)
                .map(FakeAid::listed)
                .ok_or_else(|| BffError::NotFound(format!("identifier {} not found", alias)))
        }

        async fn create_identifier(
            &self,
            alias: &str,
            config: &IdentifierConfig,
        ) -> BffResult<Operation> {
            let mut state = self.state.lock().unwrap();
            state.counter += 1;
            let name = format!("witness.{:04}", state.counter);

            if state.aids.iter().any(|a| a.alias == alias) {
                return Ok(Operation {
                    name,
                    done: true,
                    response: None,
                    error: Some(json!({
                        "msg": format!("alias {} already incepted", alias)
                    })),
                });
            }

            let counter = state.counter;
            let aid = FakeAid {
                alias: alias.to_string(),
                prefix: format!("E{}{:04}", alias, counter),
                transferable: config.transferable,
                flag_visible: true,
                sequence: 0,
                key: format!("D{}key0", alias),
                wits: config.wits.clone(),
            };
            let response = json!({"i": aid.prefix, "t": "icp"});
            state.aids.push(aid);

            Ok(Self::done(name, response))
        }

        async fn rotate_identifier(
            &self,
            alias: &str,
            _config: &RotationConfig,
        ) -> BffResult<Operation> {
            let mut state = self.state.lock().unwrap();
            state.counter += 1;
            let name = format!("witness.{:04}", state.counter);

            let aid = state
                .aids
                .iter_mut()
                .find(|a| a.alias == alias)
                .ok_or_else(|| BffError::NotFound(format!("identifier {} not found", alias)))?;

            if !aid.transferable {
                return Ok(Operation {
                    name,
                    done: true,
                    response: None,
                    error: Some(json!({
                        "msg": format!("identifier {} is non-transferable", alias)
                    })),
                });
            }

            aid.sequence += 1;
            aid.key = format!("D{}key{}", alias, aid.sequence);
            let response = json!({"s": aid.sequence.to_string()});

            Ok(Self::done(name, response))
        }

        async fn interact(&self, alias: &str, _data: Value) -> BffResult<Operation> {
            let mut state = self.state.lock().unwrap();
            state.counter += 1;
            let name = format!("witness.{:04}", state.counter);

            if !state.aids.iter().any(|a| a.alias == alias) {
                return Err(BffError::NotFound(format!("identifier {} not found", alias)));
            }

            let counter = state.counter;
            Ok(Self::done(
                name,
                json!({
                    "d": format!("Eixn{:04}", counter),
                    "sigs": [format!("AABsig{:04}", counter)],
                }),
            ))
        }

        async fn wait_operation(&self, name: &str, _timeout: Duration) -> BffResult<Operation> {
            Ok(Operation {
                name: name.to_string(),
                done: false,
                ..Default::default()
            })
        }

        async fn delete_operation(&self, name: &str) -> BffResult<()> {
            self.state.lock().unwrap().deleted.push(name.to_string());
            Ok(())
        }

        async fn get_oobi(&self, alias: &str, role: &str) -> BffResult<Value> {
            let state = self.state.lock().unwrap();
            let aid = state
                .aids
                .iter()
                .find(|a| a.alias == alias)
                .ok_or_else(|| BffError::NotFound(format!("identifier {} not found", alias)))?;
            Ok(json!({
                "oobis": [format!("http://witness.example/oobi/{}/{}", aid.prefix, role)]
            }))
        }

        async fn resolve_oobi(&self, _url: &str, alias: &str) -> BffResult<Operation> {
            let mut state = self.state.lock().unwrap();
            state.counter += 1;
            let name = format!("oobi.{}", alias);

            if state.oobi_pending {
                return Ok(Operation {
                    name,
                    done: false,
                    ..Default::default()
                });
            }

            Ok(Self::done(name, json!({"i": "Eresolved"})))
        }

        async fn list_registries(&self, alias: &str) -> BffResult<Vec<Value>> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .registries
                .get(alias)
                .cloned()
                .unwrap_or_default())
        }

        async fn create_registry(&self, alias: &str, registry_name: &str) -> BffResult<Operation> {
            let mut state = self.state.lock().unwrap();
            state.counter += 1;
            let name = format!("registry.{:04}", state.counter);
            let counter = state.counter;

            state.registries.entry(alias.to_string()).or_default().push(json!({
                "name": registry_name,
                "regk": format!("Ereg{:04}", counter),
            }));

            Ok(Self::done(name, json!({})))
        }

        async fn issue_credential(&self, alias: &str, data: Value) -> BffResult<Operation> {
            let mut state = self.state.lock().unwrap();
            state.counter += 1;
            let name = format!("credential.{:04}", state.counter);
            let counter = state.counter;

            let said = format!("Ecred{:04}", counter);
            state
                .credentials
                .entry(alias.to_string())
                .or_default()
                .push(json!({"sad": {"d": said, "a": data.get("a")}}));

            Ok(Self::done(name, json!({"d": said, "sn": 1})))
        }

        async fn list_credentials(&self, alias: &str) -> BffResult<Vec<Value>> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .credentials
                .get(alias)
                .cloned()
                .unwrap_or_default())
        }
    }
}
