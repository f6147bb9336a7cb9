use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{require_text, ValidationError};

/// One medicine line of a prescription. A denormalized snapshot taken at
/// prescribing time; editing the catalog never changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionLine {
    pub id: i64,
    pub prescription_id: i64,
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
}

/// A prescription with its lines in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i64,
    pub patient_id: i64,
    pub diagnosis: Option<String>,
    pub additional_notes: Option<String>,
    pub next_visit_date: Option<NaiveDate>,
    pub prescribed_date: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub medicines: Vec<PrescriptionLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: i64,
    pub name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

/// `GET /api/prescriptions/:id` payload: the prescription plus who it is for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionDetail {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub patient: PatientSummary,
}

/// Submitted medicine line. `medicine_id` records which catalog entry the
/// prescriber picked; only the name and dosage snapshot are persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medicine_id: Option<i64>,
    #[serde(alias = "name")]
    pub medicine_name: String,
    pub dosage: String,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl LineInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.medicine_name, "Medicine name")?;
        require_text(&self.dosage, "Dosage")
    }
}

/// Body of `POST /api/prescriptions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPrescription {
    pub patient_id: i64,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
    #[serde(default)]
    pub next_visit_date: Option<NaiveDate>,
    #[serde(default)]
    pub medicines: Vec<LineInput>,
}

impl NewPrescription {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_lines(&self.medicines)
    }
}

/// Body of `PUT /api/prescriptions/:id`. The owning patient never changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrescriptionUpdate {
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
    #[serde(default)]
    pub next_visit_date: Option<NaiveDate>,
    #[serde(default)]
    pub medicines: Vec<LineInput>,
}

impl PrescriptionUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_lines(&self.medicines)
    }
}

fn validate_lines(lines: &[LineInput]) -> Result<(), ValidationError> {
    for (index, line) in lines.iter().enumerate() {
        line.validate()
            .map_err(|e| ValidationError(format!("Medicine line {}: {e}", index + 1)))?;
    }
    Ok(())
}
