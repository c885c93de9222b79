pub mod registration;
#[allow(clippy::module_inception)]
pub mod registry;

pub use registration::{
    ContractKind, Deployment, IndexedContract, Registration, RegistrationConfigRoot,
    RegistrationSection,
};
pub use registry::Registry;
