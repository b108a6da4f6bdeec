//! External policy collaborator.
//!
//! Deployments and attachments are submitted to an optional policy engine
//! before they are registered. The gate is fail-closed: only an explicit
//! `Ok(true)` approves; a refusal or an engine fault rejects.

use std::{collections::HashSet, fmt, sync::Arc};

use log::warn;
use serde::{Deserialize, Serialize};

use forge_common::{
    asset::AssetKind,
    capability::CapabilityType,
    crypto::Address,
    domain::DeploymentMode,
    error::{ForgeError, ForgeResult},
};

/// Action submitted for approval
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PolicyRequest {
    AssetDeployment {
        factory: Address,
        asset: Address,
        kind: AssetKind,
        deployer: Address,
        mode: DeploymentMode,
    },
    CapabilityAttachment {
        factory: Address,
        asset: Address,
        kind: AssetKind,
        capability_type: CapabilityType,
        deployer: Address,
    },
}

impl PolicyRequest {
    pub fn deployer(&self) -> &Address {
        match self {
            Self::AssetDeployment { deployer, .. } => deployer,
            Self::CapabilityAttachment { deployer, .. } => deployer,
        }
    }
}

impl fmt::Display for PolicyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssetDeployment { kind, asset, .. } => {
                write!(f, "deployment of {kind} asset {asset}")
            }
            Self::CapabilityAttachment {
                capability_type,
                asset,
                ..
            } => write!(f, "attachment of {capability_type} to {asset}"),
        }
    }
}

pub trait PolicyEngine: Send + Sync {
    /// `Ok(true)` approves the request
    fn evaluate(&self, request: &PolicyRequest) -> anyhow::Result<bool>;
}

/// Outcome of a policy check
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyVerdict {
    Approved,
    Rejected(String),
}

impl PolicyVerdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Optional policy engine wrapped in fail-closed semantics.
/// Without an engine every request is approved.
#[derive(Clone, Default)]
pub struct PolicyGate {
    engine: Option<Arc<dyn PolicyEngine>>,
}

impl PolicyGate {
    pub fn new(engine: Option<Arc<dyn PolicyEngine>>) -> Self {
        Self { engine }
    }

    pub fn is_configured(&self) -> bool {
        self.engine.is_some()
    }

    pub fn verdict(&self, request: &PolicyRequest) -> PolicyVerdict {
        let Some(engine) = &self.engine else {
            return PolicyVerdict::Approved;
        };
        match engine.evaluate(request) {
            Ok(true) => PolicyVerdict::Approved,
            Ok(false) => PolicyVerdict::Rejected(format!("{request} declined")),
            Err(e) => {
                warn!("policy engine failed on {}: {:#}", request, e);
                PolicyVerdict::Rejected(format!("{request}: policy engine error: {e}"))
            }
        }
    }

    pub fn enforce(&self, request: &PolicyRequest) -> ForgeResult<()> {
        match self.verdict(request) {
            PolicyVerdict::Approved => Ok(()),
            PolicyVerdict::Rejected(reason) => Err(ForgeError::PolicyRejected(reason)),
        }
    }
}

/// Engine refusing every request made by a listed deployer
#[derive(Clone, Debug, Default)]
pub struct DenyListPolicy {
    denied: HashSet<Address>,
}

impl DenyListPolicy {
    pub fn new(denied: impl IntoIterator<Item = Address>) -> Self {
        Self {
            denied: denied.into_iter().collect(),
        }
    }
}

impl PolicyEngine for DenyListPolicy {
    fn evaluate(&self, request: &PolicyRequest) -> anyhow::Result<bool> {
        Ok(!self.denied.contains(request.deployer()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct Faulty;

    impl PolicyEngine for Faulty {
        fn evaluate(&self, _request: &PolicyRequest) -> anyhow::Result<bool> {
            Err(anyhow!("engine offline"))
        }
    }

    fn request(deployer: Address) -> PolicyRequest {
        PolicyRequest::AssetDeployment {
            factory: Address::from_label("factory"),
            asset: Address::from_label("asset"),
            kind: AssetKind::Fungible,
            deployer,
            mode: DeploymentMode::Clone,
        }
    }

    #[test]
    fn test_no_engine_approves() {
        let gate = PolicyGate::default();
        assert!(!gate.is_configured());
        assert!(gate.enforce(&request(Address::from_label("alice"))).is_ok());
    }

    #[test]
    fn test_engine_error_rejects() {
        let gate = PolicyGate::new(Some(Arc::new(Faulty)));
        let verdict = gate.verdict(&request(Address::from_label("alice")));
        assert!(!verdict.is_approved());
        assert!(matches!(
            gate.enforce(&request(Address::from_label("alice"))),
            Err(ForgeError::PolicyRejected(_))
        ));
    }

    #[test]
    fn test_deny_list() {
        let mallory = Address::from_label("mallory");
        let gate = PolicyGate::new(Some(Arc::new(DenyListPolicy::new([mallory]))));
        assert!(gate.enforce(&request(Address::from_label("alice"))).is_ok());
        assert!(matches!(
            gate.enforce(&request(mallory)),
            Err(ForgeError::PolicyRejected(_))
        ));
    }
}
