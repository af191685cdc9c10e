//! crates/intake_scheduler_core/src/domain/dosage.rs
//!
//! The "how much" half of a plan.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DosageUnit {
    Mg,
    Pcs,
    Ml,
}

impl DosageUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mg => "mg",
            Self::Pcs => "pcs",
            Self::Ml => "ml",
        }
    }
}

impl FromStr for DosageUnit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mg" => Ok(Self::Mg),
            "pcs" => Ok(Self::Pcs),
            "ml" => Ok(Self::Ml),
            other => Err(DomainError::validation(format!(
                "unknown dosage unit '{other}'"
            ))),
        }
    }
}

impl fmt::Display for DosageUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable amount of medication per intake.
///
/// Fields are private so every instance has passed through [`Dosage::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dosage {
    value: f64,
    unit: DosageUnit,
}

impl Dosage {
    /// Validates and builds a dosage. The value must be finite and strictly positive.
    pub fn new(value: f64, unit: DosageUnit) -> DomainResult<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(DomainError::validation(format!(
                "dosage value must be a positive number, got {value}"
            )));
        }
        Ok(Self { value, unit })
    }

    /// Builds a dosage from primitive input, as received from an outer layer.
    pub fn parse(value: f64, unit: &str) -> DomainResult<Self> {
        Self::new(value, unit.parse()?)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> DosageUnit {
        self.unit
    }
}

impl fmt::Display for Dosage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}
