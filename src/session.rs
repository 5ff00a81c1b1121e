/// Session credential (bran) lifecycle
///
/// The bran is a rotating 21-character secret the caller presents on every
/// request via the `x-session-bran` header. It seeds the caller's keystore
/// inside the KERIA agent, so the server never holds a session table. In
/// protected mode the header value is framed as `<bran>.<signature>` where
/// the signature is an HMAC-SHA256 over bran + salt keyed by a server-held
/// passcode.
///
/// This module never returns an error: losing a session credential is
/// recoverable (a new identity session begins), so every failure path
/// degrades to minting a fresh bran.
use crate::config::SessionConfig;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the session credential, both inbound and outbound
pub const SESSION_HEADER: &str = "x-session-bran";

/// Length of an unprotected bran
pub const BRAN_LENGTH: usize = 21;

/// Session protection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Bran travels verbatim in the header
    Plain,
    /// Bran travels with an appended HMAC signature
    Protected,
}

/// Outcome of resolving the inbound session header
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub bran: String,
    pub newly_minted: bool,
}

/// Mint a fresh 21-character bran from the thread-local CSPRNG
pub fn generate_bran() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BRAN_LENGTH)
        .map(char::from)
        .collect()
}

/// Compute the base64url HMAC signature over bran + salt
fn sign_bran(bran: &str, salt: &str, passcode: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(passcode.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(bran.as_bytes());
    mac.update(salt.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Validate a protected header value, returning the embedded bran on an
/// exact signature match
fn validate_protected(header: &str, salt: &str, passcode: &str) -> Option<String> {
    let (bran, signature) = header.rsplit_once('.')?;
    if bran.len() != BRAN_LENGTH {
        return None;
    }

    let expected = sign_bran(bran, salt, passcode);
    if signature == expected {
        Some(bran.to_string())
    } else {
        None
    }
}

/// Resolve the inbound header value to a raw bran.
///
/// Absent header mints a fresh bran. In plain mode the value is used
/// verbatim when it is a bare 21-character bran. In protected mode the
/// signature must match; any mismatch or malformed input is treated the
/// same as an absent header. Missing server secrets degrade to plain
/// handling rather than failing the request.
pub fn resolve(header: Option<&str>, config: &SessionConfig) -> ResolvedSession {
    let bran = match header {
        Some(value) if !value.is_empty() => match config.mode {
            SessionMode::Plain => {
                if value.len() == BRAN_LENGTH && !value.contains('.') {
                    Some(value.to_string())
                } else {
                    tracing::warn!("Malformed session credential, minting a new one");
                    None
                }
            }
            SessionMode::Protected => match (&config.salt, &config.passcode) {
                (Some(salt), Some(passcode)) => {
                    let validated = validate_protected(value, salt, passcode);
                    if validated.is_none() {
                        tracing::warn!("Invalid protected session credential, minting a new one");
                    }
                    validated
                }
                _ => {
                    tracing::warn!(
                        "Protected session mode configured without salt/passcode, \
                         falling back to plain handling"
                    );
                    if value.len() == BRAN_LENGTH && !value.contains('.') {
                        Some(value.to_string())
                    } else {
                        None
                    }
                }
            },
        },
        _ => None,
    };

    match bran {
        Some(bran) => ResolvedSession {
            bran,
            newly_minted: false,
        },
        None => ResolvedSession {
            bran: generate_bran(),
            newly_minted: true,
        },
    }
}

/// Frame a bran for the outbound header per the active mode.
///
/// Protected mode appends the HMAC signature; missing server secrets fall
/// back to plain framing with a warning instead of failing the request.
pub fn present(bran: &str, config: &SessionConfig) -> String {
    match config.mode {
        SessionMode::Plain => bran.to_string(),
        SessionMode::Protected => match (&config.salt, &config.passcode) {
            (Some(salt), Some(passcode)) => {
                format!("{}.{}", bran, sign_bran(bran, salt, passcode))
            }
            _ => {
                tracing::warn!(
                    "Protected session mode configured without salt/passcode, \
                     presenting plain credential"
                );
                bran.to_string()
            }
        },
    }
}
