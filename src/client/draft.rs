//! In-progress prescription form.
//!
//! Holds the editable medicine lines while a prescriber fills in a
//! prescription, and turns them into a request body. Picking a catalog
//! medicine pre-fills a weight-based dosage; that value is only a
//! suggestion and stays flagged until the prescriber edits or accepts it.

use chrono::NaiveDate;

use crate::dosage::suggest_dosage;
use crate::models::{
    LineInput, Medicine, NewPrescription, Patient, PrescriptionUpdate, ValidationError,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftLine {
    pub medicine_id: Option<i64>,
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: String,
    /// `dosage` was computed, not typed. Needs prescriber confirmation.
    pub dosage_suggested: bool,
}

impl DraftLine {
    fn is_complete(&self) -> bool {
        self.medicine_id.is_some()
            && !self.medicine_name.trim().is_empty()
            && !self.dosage.trim().is_empty()
    }

    fn to_input(&self) -> LineInput {
        LineInput {
            medicine_id: self.medicine_id,
            medicine_name: self.medicine_name.trim().to_string(),
            dosage: self.dosage.trim().to_string(),
            frequency: non_empty(&self.frequency),
            duration: non_empty(&self.duration),
            instructions: non_empty(&self.instructions),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrescriptionDraft {
    patient_id: i64,
    patient_weight: Option<f64>,
    pub diagnosis: String,
    pub additional_notes: String,
    pub next_visit_date: Option<NaiveDate>,
    lines: Vec<DraftLine>,
}

impl PrescriptionDraft {
    /// Empty draft for `patient`, starting with one blank line.
    pub fn new(patient: &Patient) -> Self {
        Self {
            patient_id: patient.id,
            patient_weight: patient.weight,
            diagnosis: String::new(),
            additional_notes: String::new(),
            next_visit_date: None,
            lines: vec![DraftLine::default()],
        }
    }

    pub fn patient_id(&self) -> i64 {
        self.patient_id
    }

    pub fn lines(&self) -> &[DraftLine] {
        &self.lines
    }

    pub fn line_mut(&mut self, index: usize) -> Option<&mut DraftLine> {
        self.lines.get_mut(index)
    }

    pub fn add_line(&mut self) {
        self.lines.push(DraftLine::default());
    }

    /// Remove line `index`. The last remaining line is never removed.
    pub fn remove_line(&mut self, index: usize) -> bool {
        if self.lines.len() <= 1 || index >= self.lines.len() {
            return false;
        }
        self.lines.remove(index);
        true
    }

    /// Fill line `index` from a catalog entry: snapshot the name and
    /// suggest a dosage from the patient's weight.
    pub fn select_medicine(&mut self, index: usize, medicine: &Medicine) -> bool {
        let weight = self.patient_weight;
        let Some(line) = self.lines.get_mut(index) else {
            return false;
        };
        line.medicine_id = Some(medicine.id);
        line.medicine_name = medicine.name.clone();
        line.dosage = suggest_dosage(medicine.common_dosage.as_deref().unwrap_or(""), weight);
        line.dosage_suggested = true;
        true
    }

    /// Prescriber-entered dosage; clears the suggestion flag.
    pub fn set_dosage(&mut self, index: usize, dosage: impl Into<String>) -> bool {
        let Some(line) = self.lines.get_mut(index) else {
            return false;
        };
        line.dosage = dosage.into();
        line.dosage_suggested = false;
        true
    }

    /// Lines still carrying an unconfirmed computed dosage.
    pub fn unconfirmed_dosages(&self) -> usize {
        self.lines.iter().filter(|l| l.dosage_suggested).count()
    }

    /// Body for `POST /api/prescriptions`. Incomplete lines are dropped;
    /// at least one complete line is required.
    pub fn submission(&self) -> Result<NewPrescription, ValidationError> {
        Ok(NewPrescription {
            patient_id: self.patient_id,
            diagnosis: non_empty(&self.diagnosis),
            additional_notes: non_empty(&self.additional_notes),
            next_visit_date: self.next_visit_date,
            medicines: self.complete_lines()?,
        })
    }

    /// Body for `PUT /api/prescriptions/:id`, same line rules.
    pub fn update_submission(&self) -> Result<PrescriptionUpdate, ValidationError> {
        Ok(PrescriptionUpdate {
            diagnosis: non_empty(&self.diagnosis),
            additional_notes: non_empty(&self.additional_notes),
            next_visit_date: self.next_visit_date,
            medicines: self.complete_lines()?,
        })
    }

    fn complete_lines(&self) -> Result<Vec<LineInput>, ValidationError> {
        let lines: Vec<LineInput> = self
            .lines
            .iter()
            .filter(|l| l.is_complete())
            .map(DraftLine::to_input)
            .collect();
        if lines.is_empty() {
            return Err(ValidationError("Please add at least one medicine".into()));
        }
        Ok(lines)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(weight: Option<f64>) -> Patient {
        Patient {
            id: 11,
            name: "Kiran".into(),
            age: Some(6),
            weight,
            gender: None,
            contact_number: None,
            email: None,
            address: None,
            blood_group: None,
            allergies: None,
            medical_history: None,
            created_at: Default::default(),
            updated_at: Default::default(),
        }
    }

    fn medicine(id: i64, name: &str, common_dosage: Option<&str>) -> Medicine {
        Medicine {
            id,
            name: name.into(),
            generic_name: None,
            common_dosage: common_dosage.map(str::to_string),
            medicine_type: None,
            form: None,
            strength: None,
            manufacturer: None,
            description: None,
            created_at: Default::default(),
        }
    }

    #[test]
    fn starts_with_one_blank_line() {
        let draft = PrescriptionDraft::new(&patient(None));
        assert_eq!(draft.lines().len(), 1);
        assert_eq!(draft.patient_id(), 11);
    }

    #[test]
    fn last_line_cannot_be_removed() {
        let mut draft = PrescriptionDraft::new(&patient(None));
        assert!(!draft.remove_line(0));
        draft.add_line();
        assert!(draft.remove_line(0));
        assert!(!draft.remove_line(0));
        assert!(!draft.remove_line(5));
        assert_eq!(draft.lines().len(), 1);
    }

    #[test]
    fn selecting_medicine_suggests_weight_based_dosage() {
        let mut draft = PrescriptionDraft::new(&patient(Some(2.0)));
        assert!(draft.select_medicine(0, &medicine(4, "Amoxicillin", Some("500mg"))));
        let line = &draft.lines()[0];
        assert_eq!(line.medicine_id, Some(4));
        assert_eq!(line.medicine_name, "Amoxicillin");
        assert_eq!(line.dosage, "1000mg");
        assert!(line.dosage_suggested);
        assert_eq!(draft.unconfirmed_dosages(), 1);

        draft.set_dosage(0, "750mg");
        assert_eq!(draft.lines()[0].dosage, "750mg");
        assert_eq!(draft.unconfirmed_dosages(), 0);
    }

    #[test]
    fn without_weight_dosage_is_catalog_value() {
        let mut draft = PrescriptionDraft::new(&patient(None));
        draft.select_medicine(0, &medicine(4, "Amoxicillin", Some("500mg")));
        assert_eq!(draft.lines()[0].dosage, "500mg");

        draft.select_medicine(0, &medicine(5, "Saline", None));
        assert_eq!(draft.lines()[0].dosage, "");
    }

    #[test]
    fn submission_keeps_only_complete_lines() {
        let mut draft = PrescriptionDraft::new(&patient(Some(10.0)));
        draft.diagnosis = "  Otitis  ".into();
        draft.select_medicine(0, &medicine(1, "Amoxicillin", Some("40mg")));
        draft.line_mut(0).unwrap().frequency = "BID".into();
        draft.add_line();
        draft.line_mut(1).unwrap().medicine_name = "Typed but not selected".into();
        draft.line_mut(1).unwrap().dosage = "5mg".into();
        draft.add_line();

        let body = draft.submission().unwrap();
        assert_eq!(body.patient_id, 11);
        assert_eq!(body.diagnosis.as_deref(), Some("Otitis"));
        assert_eq!(body.additional_notes, None);
        assert_eq!(body.medicines.len(), 1);
        assert_eq!(body.medicines[0].dosage, "400mg");
        assert_eq!(body.medicines[0].frequency.as_deref(), Some("BID"));
        assert_eq!(body.medicines[0].duration, None);
    }

    #[test]
    fn empty_draft_is_rejected() {
        let draft = PrescriptionDraft::new(&patient(None));
        assert_eq!(
            draft.submission().unwrap_err(),
            ValidationError("Please add at least one medicine".into())
        );
        assert!(draft.update_submission().is_err());
    }
}
