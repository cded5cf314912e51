//! Identifiers for cases and parameters
//!
//! Each identifier has its own type so a case index is never confused with a
//! group number or a sample offset.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Zero-based position of a case in generation order.
///
/// Every per-case artifact name is derived from this index alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseIndex(pub usize);

impl fmt::Display for CaseIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one configurable field: the section (input file or subsystem)
/// it belongs to and its name within that section.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParamKey {
    pub target: String,
    pub field: String,
}

impl ParamKey {
    pub fn new(target: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.field)
    }
}
