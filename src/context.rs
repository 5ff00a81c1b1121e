/// Shared application state handed to every request handler
use crate::agent::{AgentConnector, HttpAgentConnector};
use crate::config::ServerConfig;
use crate::error::BffResult;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub connector: Arc<dyn AgentConnector>,
}

impl AppContext {
    /// Build the production context: validated config plus an HTTP
    /// connector to the configured agent
    pub fn new(config: ServerConfig) -> BffResult<Self> {
        config.validate()?;
        let connector = HttpAgentConnector::new(config.agent.clone())?;
        Ok(Self {
            config: Arc::new(config),
            connector: Arc::new(connector),
        })
    }

    /// Build a context around an injected connector
    pub fn with_connector(config: ServerConfig, connector: Arc<dyn AgentConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
        }
    }

    /// Hard deadline applied to every remote operation
    pub fn operation_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.config.agent.operation_timeout_ms)
    }
}
