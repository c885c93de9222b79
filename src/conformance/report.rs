use crate::modules::ProtocolId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, VariantNames};

/// The properties every module is held to, independent of its math.
#[derive(
    Copy, Clone, Debug, StrumDisplay, PartialEq, Hash, Eq, EnumString, VariantNames, Deserialize, Serialize, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyKind {
    ZeroAmount,
    MonotonicOut,
    MonotonicIn,
    RoundTripSufficiency,
    RoundTripNoFreeOutput,
    InvalidTokenRejected,
    InsufficientLiquidityRejected,
    MalformedStateRejected,
    InvalidRequestRejected,
    TvlAdditivity,
    Conservation,
    ApyWellDefined,
}

/// One failing input, kept concrete so a protocol author can replay it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFailure {
    pub fixture: String,
    pub input: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyCheck {
    pub property: PropertyKind,
    pub failures: Vec<PropertyFailure>,
}

impl PropertyCheck {
    pub fn new(property: PropertyKind) -> Self {
        Self { property, failures: Vec::new() }
    }

    pub fn fail(&mut self, fixture: &str, input: impl Into<String>, message: impl Into<String>) {
        self.failures.push(PropertyFailure {
            fixture: fixture.to_string(),
            input: input.into(),
            message: message.into(),
        });
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReport {
    pub protocol: ProtocolId,
    pub module: String,
    pub checks: Vec<PropertyCheck>,
}

impl ModuleReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(PropertyCheck::passed)
    }

    pub fn failed_properties(&self) -> Vec<PropertyKind> {
        self.checks.iter().filter(|check| !check.passed()).map(|check| check.property).collect()
    }
}

/// Aggregate result over every registered module.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConformanceReport {
    pub modules: Vec<ModuleReport>,
}

impl ConformanceReport {
    pub fn passed(&self) -> bool {
        self.modules.iter().all(ModuleReport::passed)
    }
}

impl Display for ConformanceReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for report in &self.modules {
            writeln!(f, "{}", report.module)?;
            for check in &report.checks {
                if check.passed() {
                    writeln!(f, "  {:<34} ok", check.property.to_string())?;
                } else {
                    writeln!(f, "  {:<34} FAILED ({})", check.property.to_string(), check.failures.len())?;
                    for failure in &check.failures {
                        writeln!(f, "    [{}] {}: {}", failure.fixture, failure.input, failure.message)?;
                    }
                }
            }
        }
        Ok(())
    }
}
