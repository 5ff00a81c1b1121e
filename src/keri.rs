/// Identifier configuration: template merge and invariant validation
///
/// Inception and rotation configurations are validated here, synchronously,
/// before any network call is made, so invalid requests never reach the
/// agent and cannot leave partially-applied remote state behind.
use crate::config::KeriConfig;
use crate::error::{BffError, BffResult};
use serde::{Deserialize, Serialize};

/// Full identifier configuration submitted to the agent at inception
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierConfig {
    pub transferable: bool,
    pub wits: Vec<String>,
    pub toad: u32,
    pub icount: u32,
    pub ncount: u32,
    pub isith: String,
    pub nsith: String,
}

impl IdentifierConfig {
    /// Build the inception configuration for a create request by overlaying
    /// caller-supplied fields on the deployment template.
    ///
    /// An explicit empty witness list in the request means "no witnesses";
    /// only an absent `wits` field falls back to the template. When the
    /// caller supplies witnesses the receipt threshold follows the supplied
    /// list, so a witness-less request always carries toad 0.
    pub fn merged(
        template: &KeriConfig,
        wits: Option<&[String]>,
        transferable: Option<bool>,
        icount: Option<u32>,
        ncount: Option<u32>,
    ) -> Self {
        let transferable = transferable.unwrap_or(template.transferable);

        let (wits, toad) = if !transferable {
            // Non-transferable identifiers cannot have witnesses
            (Vec::new(), 0)
        } else {
            match wits {
                Some(wits) => (wits.to_vec(), wits.len() as u32),
                None => (template.wits.clone(), template.toad),
            }
        };

        Self {
            transferable,
            wits,
            toad,
            icount: icount.unwrap_or(template.icount),
            ncount: ncount.unwrap_or(template.ncount),
            isith: template.isith.clone(),
            nsith: template.nsith.clone(),
        }
    }

    /// Check the witness/threshold invariants, raising a configuration
    /// error naming the violated invariant with the offending values.
    pub fn validate(&self) -> BffResult<()> {
        if !self.transferable && (!self.wits.is_empty() || self.toad != 0) {
            return Err(BffError::Configuration(format!(
                "Non-transferable identifiers cannot have witnesses (wits: {}, toad: {})",
                self.wits.len(),
                self.toad
            )));
        }

        if self.toad as usize > self.wits.len() {
            return Err(BffError::Configuration(format!(
                "TOAD ({}) cannot be greater than witness count ({})",
                self.toad,
                self.wits.len()
            )));
        }

        if self.toad < 1 && !self.wits.is_empty() {
            tracing::warn!(
                "TOAD is {} but {} witnesses are configured; consider setting TOAD >= 1",
                self.toad,
                self.wits.len()
            );
        }

        // Weighted thresholds (e.g. "1/2,1/2") are not numerically
        // comparable to key counts; only simple numeric thresholds are
        // checked here.
        if let Ok(isith) = self.isith.parse::<u32>() {
            if isith > self.icount {
                return Err(BffError::Configuration(format!(
                    "Initial signing threshold ({}) cannot be greater than initial key count ({})",
                    isith, self.icount
                )));
            }
        }

        if let Ok(nsith) = self.nsith.parse::<u32>() {
            if nsith > self.ncount {
                return Err(BffError::Configuration(format!(
                    "Next signing threshold ({}) cannot be greater than next key count ({})",
                    nsith, self.ncount
                )));
            }
        }

        Ok(())
    }
}
