/// Configuration management for the vLEI BFF
use crate::error::{BffError, BffResult};
use crate::session::SessionMode;
use serde::{Deserialize, Serialize};
use std::env;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub agent: AgentConfig,
    pub session: SessionConfig,
    pub keri: KeriConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// KERIA agent connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Admin (API) URL of the KERIA agent
    pub admin_url: String,
    /// Boot URL of the KERIA agent
    pub boot_url: String,
    /// Hard deadline for remote operations, in milliseconds
    pub operation_timeout_ms: u64,
}

/// Session credential (bran) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub mode: SessionMode,
    /// Salt mixed into the HMAC input in protected mode
    pub salt: Option<String>,
    /// Server-held HMAC key for protected mode
    pub passcode: Option<String>,
}

/// Default identifier template, overridable per deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeriConfig {
    pub transferable: bool,
    pub wits: Vec<String>,
    pub toad: u32,
    pub icount: u32,
    pub ncount: u32,
    pub isith: String,
    pub nsith: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Witness pool from the KERI training deployment; the template keeps a
/// two-witness subset with toad 1.
pub const DEFAULT_WITNESSES: [&str; 3] = [
    "BBilc4-L3tFUnfM_wJr4S4OJanAv_VmF_dJNN6vkf2Ha",
    "BLskRTInXnMxWaGqcpSyMgo0nYbalW99cGZESrz3zapM",
    "BIKKuvBwpmDVA4Ds-EpL5bt9OqPzWPja2LigFYZN2YfX",
];

impl Default for KeriConfig {
    fn default() -> Self {
        Self {
            transferable: true,
            wits: DEFAULT_WITNESSES[..2].iter().map(|w| w.to_string()).collect(),
            toad: 1,
            icount: 1,
            ncount: 1,
            isith: "1".to_string(),
            nsith: "1".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> BffResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("BFF_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("BFF_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse()
            .map_err(|_| BffError::Validation("Invalid port number".to_string()))?;
        let version = env::var("BFF_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let admin_url =
            env::var("KERIA_URL").unwrap_or_else(|_| "http://localhost:3901".to_string());
        let boot_url =
            env::var("KERIA_BOOT_URL").unwrap_or_else(|_| "http://localhost:3903".to_string());
        let operation_timeout_ms = env::var("KERIA_OPERATION_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse()
            .unwrap_or(30000);

        let session_mode = match env::var("KERIA_BRAN_MODE").as_deref() {
            Ok("protected") => SessionMode::Protected,
            _ => SessionMode::Plain,
        };
        let salt = env::var("KERIA_KEYSTORE_SALT").ok();
        let passcode = env::var("KERIA_KEYSTORE_PASSCODE").ok();

        let keri = Self::keri_from_env();

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            agent: AgentConfig {
                admin_url,
                boot_url,
                operation_timeout_ms,
            },
            session: SessionConfig {
                mode: session_mode,
                salt,
                passcode,
            },
            keri,
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Build the identifier template, overlaying environment overrides on
    /// the process-wide defaults. Unparseable overrides are logged and
    /// ignored rather than failing startup.
    fn keri_from_env() -> KeriConfig {
        let mut keri = KeriConfig::default();

        if let Ok(wits) = env::var("KERI_WITNESS_IDS") {
            match serde_json::from_str::<Vec<String>>(&wits) {
                Ok(parsed) => keri.wits = parsed,
                Err(e) => {
                    tracing::warn!("Failed to parse KERI_WITNESS_IDS, using defaults: {}", e)
                }
            }
        }
        if let Ok(v) = env::var("KERI_TRANSFERABLE") {
            keri.transferable = v == "true";
        }
        if let Ok(v) = env::var("KERI_TOAD") {
            match v.parse() {
                Ok(parsed) => keri.toad = parsed,
                Err(e) => tracing::warn!("Failed to parse KERI_TOAD, using default: {}", e),
            }
        }
        if let Ok(v) = env::var("KERI_ICOUNT") {
            match v.parse() {
                Ok(parsed) => keri.icount = parsed,
                Err(e) => tracing::warn!("Failed to parse KERI_ICOUNT, using default: {}", e),
            }
        }
        if let Ok(v) = env::var("KERI_NCOUNT") {
            match v.parse() {
                Ok(parsed) => keri.ncount = parsed,
                Err(e) => tracing::warn!("Failed to parse KERI_NCOUNT, using default: {}", e),
            }
        }
        if let Ok(v) = env::var("KERI_ISITH") {
            keri.isith = v;
        }
        if let Ok(v) = env::var("KERI_NSITH") {
            keri.nsith = v;
        }

        keri
    }

    /// Validate configuration
    pub fn validate(&self) -> BffResult<()> {
        if self.service.hostname.is_empty() {
            return Err(BffError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.agent.admin_url.is_empty() {
            return Err(BffError::Validation(
                "KERIA admin URL cannot be empty".to_string(),
            ));
        }

        if self.agent.operation_timeout_ms == 0 {
            return Err(BffError::Validation(
                "Operation timeout must be greater than zero".to_string(),
            ));
        }

        // Protected mode without secrets is allowed: the session layer
        // degrades to plain framing at request time and warns.

        Ok(())
    }
}
