use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Derived completeness report. Recomputed on demand and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingValidation {
    pub is_valid: bool,
    pub errors: BTreeMap<String, String>,
    pub warnings: BTreeMap<String, String>,
    /// 0 to 100.
    pub completeness: u8,
}
