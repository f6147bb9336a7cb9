use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{require_text, ValidationError};

/// Catalog entry. Prescription lines copy `name` and a dosage at
/// prescribing time and never reference this row afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: i64,
    pub name: String,
    pub generic_name: Option<String>,
    pub common_dosage: Option<String>,
    pub medicine_type: Option<String>,
    pub form: Option<String>,
    pub strength: Option<String>,
    pub manufacturer: Option<String>,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MedicineInput {
    pub name: String,
    #[serde(default)]
    pub generic_name: Option<String>,
    #[serde(default)]
    pub common_dosage: Option<String>,
    #[serde(default)]
    pub medicine_type: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub strength: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl MedicineInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "Medicine name")
    }
}
