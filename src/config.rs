use serde::{Deserialize, Serialize};

use crate::types::TemplateKind;

/// what to do with the part of a payment exceeding all outstanding debt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurplusPolicy {
    /// record the remainder as a suspense entry for the member
    HoldInSuspense,
    /// fail the whole allocation
    Reject,
}

/// template used for contracts signed outside the system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalContractConfig {
    pub template_kind: TemplateKind,
    pub template_file: String,
    pub template_description: String,
    pub default_document_path: String,
}

impl Default for ExternalContractConfig {
    fn default() -> Self {
        Self {
            template_kind: TemplateKind::external(),
            template_file: "externo".to_string(),
            template_description: "Contratos firmados externamente".to_string(),
            default_document_path: "externo-manual".to_string(),
        }
    }
}

/// engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub surplus_policy: SurplusPolicy,
    pub external_contract: ExternalContractConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            surplus_policy: SurplusPolicy::HoldInSuspense,
            external_contract: ExternalContractConfig::default(),
        }
    }
}

impl EngineConfig {
    /// rejects payments larger than the member's total outstanding debt
    pub fn strict() -> Self {
        Self {
            surplus_policy: SurplusPolicy::Reject,
            ..Self::default()
        }
    }

    pub fn with_surplus_policy(mut self, policy: SurplusPolicy) -> Self {
        self.surplus_policy = policy;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
