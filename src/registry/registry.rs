use super::registration::{Deployment, Registration};
use crate::modules::{ModuleWrapper, ProtocolId};
use crate::token::ChainId;
use dashmap::DashMap;
use tracing::{debug, warn};

/// Maps protocol identifiers to module instances and their registration
/// metadata.
///
/// Lookup tables are lock-free so the outer router can resolve modules
/// from many tasks at once; the modules themselves are stateless and
/// shared by `Arc`.
#[derive(Default)]
pub struct Registry {
    modules: DashMap<ProtocolId, ModuleWrapper>,
    registrations: DashMap<ProtocolId, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module under its protocol id. Re-registering an id
    /// replaces the previous module (latest wins) and is logged.
    pub fn register<M: Into<ModuleWrapper>>(&self, module: M, registration: Registration) {
        let module = module.into();
        let protocol = module.protocol();
        if self.modules.insert(protocol.clone(), module).is_some() {
            warn!(%protocol, "replacing previously registered module");
        } else {
            debug!(%protocol, "registered module");
        }
        self.registrations.insert(protocol, registration);
    }

    pub fn get(&self, protocol: &ProtocolId) -> Option<ModuleWrapper> {
        self.modules.get(protocol).map(|entry| entry.value().clone())
    }

    pub fn registration(&self, protocol: &ProtocolId) -> Option<Registration> {
        self.registrations.get(protocol).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, protocol: &ProtocolId) -> bool {
        self.modules.contains_key(protocol)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn protocol_ids(&self) -> Vec<ProtocolId> {
        let mut ids: Vec<ProtocolId> = self.modules.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// All registered modules, ordered by protocol id for deterministic
    /// iteration.
    pub fn modules(&self) -> Vec<ModuleWrapper> {
        let mut modules: Vec<ModuleWrapper> =
            self.modules.iter().map(|entry| entry.value().clone()).collect();
        modules.sort();
        modules
    }

    /// Deployments declared for one chain, for the external indexer.
    pub fn deployments_on(&self, chain_id: ChainId) -> Vec<(ProtocolId, Deployment)> {
        let mut deployments: Vec<(ProtocolId, Deployment)> = self
            .registrations
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .deployments
                    .iter()
                    .filter(|deployment| deployment.chain_id == chain_id)
                    .map(|deployment| (entry.key().clone(), deployment.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        deployments.sort_by(|a, b| a.0.cmp(&b.0));
        deployments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{ConstantProductModule, MockModule};
    use crate::registry::registration::{ContractKind, IndexedContract};
    use crate::utils::constants::{KnownChain, WETH};

    fn sample_registration() -> Registration {
        Registration::new("Mock Protocol").with_deployment(Deployment {
            chain_id: KnownChain::ETHEREUM,
            contracts: vec![IndexedContract { address: WETH, kind: ContractKind::Factory }],
        })
    }

    #[test]
    fn test_register_and_get() {
        let registry = Registry::new();
        registry.register(MockModule::new(KnownChain::ETHEREUM), sample_registration());

        let id = ProtocolId::new("mock");
        assert!(registry.contains(&id));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&id).unwrap().protocol(), id);
        assert_eq!(registry.registration(&id).unwrap().name, "Mock Protocol");
        assert!(registry.get(&ProtocolId::new("missing")).is_none());
    }

    #[test]
    fn test_reregistration_replaces() {
        let registry = Registry::new();
        registry.register(MockModule::new(KnownChain::ETHEREUM), sample_registration());
        registry.register(MockModule::new(KnownChain::BASE), Registration::new("Mock v2"));

        assert_eq!(registry.len(), 1);
        let id = ProtocolId::new("mock");
        assert_eq!(registry.get(&id).unwrap().chain_id(), KnownChain::BASE);
        assert_eq!(registry.registration(&id).unwrap().name, "Mock v2");
    }

    #[test]
    fn test_modules_ordering_is_deterministic() {
        let registry = Registry::new();
        registry.register(MockModule::new(KnownChain::ETHEREUM), Registration::new("Mock"));
        registry
            .register(ConstantProductModule::new(KnownChain::ETHEREUM), Registration::new("CP"));

        let ids: Vec<String> =
            registry.modules().iter().map(|module| module.protocol().to_string()).collect();
        assert_eq!(ids, vec!["constant-product".to_string(), "mock".to_string()]);
    }

    #[test]
    fn test_deployments_on() {
        let registry = Registry::new();
        registry.register(MockModule::new(KnownChain::ETHEREUM), sample_registration());

        let ethereum = registry.deployments_on(KnownChain::ETHEREUM);
        assert_eq!(ethereum.len(), 1);
        assert_eq!(ethereum[0].0, ProtocolId::new("mock"));

        assert!(registry.deployments_on(KnownChain::BASE).is_empty());
    }
}
