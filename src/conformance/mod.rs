pub mod fixtures;
pub mod harness;
pub mod report;

pub use fixtures::{PoolFixture, default_fixtures};
pub use harness::{ConformanceHarness, HarnessConfig};
pub use report::{ConformanceReport, ModuleReport, PropertyCheck, PropertyFailure, PropertyKind};
