use crate::modules::ProtocolId;
use crate::token::ChainId;
use crate::utils::config_loader::{ConfigSectionLoader, LoadConfigError, load_from_file, load_from_str};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, VariantNames};

/// Role of a contract the external indexer must watch for a deployment.
#[derive(
    Copy, Clone, Debug, Display, PartialEq, Hash, Eq, EnumString, VariantNames, Default, Deserialize, Serialize, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractKind {
    #[default]
    Unknown,
    Factory,
    Pool,
    Router,
    Vault,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedContract {
    pub address: Address,
    pub kind: ContractKind,
}

/// One chain a protocol is deployed on, with the contracts to index there.
/// The registry only declares these; indexing happens elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub chain_id: ChainId,
    pub contracts: Vec<IndexedContract>,
}

/// Registration metadata a protocol ships alongside its module.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub website: Option<String>,
    pub deployments: Vec<Deployment>,
}

impl Registration {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), website: None, deployments: Vec::new() }
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    pub fn with_deployment(mut self, deployment: Deployment) -> Self {
        self.deployments.push(deployment);
        self
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct RegistrationConfigRoot {
    pub protocol: RegistrationSection,
}

/// `[protocol]` section of a registration file.
#[derive(Clone, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct RegistrationSection {
    pub id: String,
    pub name: String,
    pub website: Option<String>,
    #[serde(default)]
    pub deployments: Vec<DeploymentSection>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct DeploymentSection {
    pub chain_id: u64,
    #[serde(default)]
    pub contracts: Vec<ContractSection>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct ContractSection {
    pub address: Address,
    pub kind: ContractKind,
}

impl RegistrationSection {
    pub fn into_registration(self) -> (ProtocolId, Registration) {
        let deployments = self
            .deployments
            .into_iter()
            .map(|section| Deployment {
                chain_id: ChainId(section.chain_id),
                contracts: section
                    .contracts
                    .into_iter()
                    .map(|contract| IndexedContract { address: contract.address, kind: contract.kind })
                    .collect(),
            })
            .collect();
        (
            ProtocolId::new(self.id),
            Registration { name: self.name, website: self.website, deployments },
        )
    }

    pub fn load_from_str(contents: &str) -> Result<Self, LoadConfigError> {
        let root: RegistrationConfigRoot = load_from_str(contents)?;
        Ok(root.protocol)
    }
}

impl ConfigSectionLoader for RegistrationSection {
    type SectionType = RegistrationSection;

    fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: RegistrationConfigRoot = load_from_file(file_name)?;
        Ok(root.protocol)
    }
}
