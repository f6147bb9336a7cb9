//! Prescriptions and their medicine lines.
//!
//! Create and replace are single transactions: the prescription row and
//! every line commit together or not at all. Replace swaps the whole line
//! set (delete then insert), so a prescription never carries a mix of old
//! and new lines. The transaction rolls back on drop, so any early return
//! through `?` leaves the database untouched.
//!
//! Both writes start with `BEGIN IMMEDIATE`: a deferred transaction that
//! reads first cannot upgrade to a writer after another pooled connection
//! commits, and that busy error skips `busy_timeout`.

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::db::DatabaseError;
use crate::models::*;

const PRESCRIPTION_COLUMNS: &str =
    "id, patient_id, diagnosis, additional_notes, next_visit_date, prescribed_date, updated_at";

/// Insert a prescription and all of its lines atomically.
///
/// Fails with `NotFound` if the patient does not exist. Zero lines is
/// allowed.
pub fn create_prescription(
    conn: &Connection,
    new: &NewPrescription,
) -> Result<Prescription, DatabaseError> {
    let tx = write_transaction(conn)?;

    let patient_exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM patients WHERE id = ?1)",
        params![new.patient_id],
        |row| row.get(0),
    )?;
    if !patient_exists {
        return Err(DatabaseError::not_found("Patient", new.patient_id));
    }

    tx.execute(
        "INSERT INTO prescriptions (patient_id, diagnosis, additional_notes, next_visit_date)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            new.patient_id,
            new.diagnosis,
            new.additional_notes,
            new.next_visit_date,
        ],
    )?;
    let id = tx.last_insert_rowid();

    insert_lines(&tx, id, &new.medicines)?;

    tx.commit()?;
    tracing::debug!(prescription_id = id, lines = new.medicines.len(), "Prescription created");

    get_prescription(conn, id)?.ok_or_else(|| DatabaseError::not_found("Prescription", id))
}

/// Replace a prescription's editable fields and its entire line set.
///
/// Fails with `NotFound` (and rolls back) if `id` matches no row.
pub fn replace_prescription(
    conn: &Connection,
    id: i64,
    update: &PrescriptionUpdate,
) -> Result<Prescription, DatabaseError> {
    let tx = write_transaction(conn)?;

    let changed = tx.execute(
        "UPDATE prescriptions
         SET diagnosis = ?1, additional_notes = ?2, next_visit_date = ?3,
             updated_at = CURRENT_TIMESTAMP
         WHERE id = ?4",
        params![
            update.diagnosis,
            update.additional_notes,
            update.next_visit_date,
            id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Prescription", id));
    }

    tx.execute(
        "DELETE FROM prescription_medicines WHERE prescription_id = ?1",
        params![id],
    )?;
    insert_lines(&tx, id, &update.medicines)?;

    tx.commit()?;
    tracing::debug!(prescription_id = id, lines = update.medicines.len(), "Prescription replaced");

    get_prescription(conn, id)?.ok_or_else(|| DatabaseError::not_found("Prescription", id))
}

fn write_transaction(conn: &Connection) -> Result<Transaction<'_>, DatabaseError> {
    Ok(Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?)
}

fn insert_lines(
    conn: &Connection,
    prescription_id: i64,
    lines: &[LineInput],
) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO prescription_medicines
         (prescription_id, medicine_name, dosage, frequency, duration, instructions)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for line in lines {
        stmt.execute(params![
            prescription_id,
            line.medicine_name.trim(),
            line.dosage.trim(),
            line.frequency,
            line.duration,
            line.instructions,
        ])?;
    }
    Ok(())
}

pub fn get_prescription(conn: &Connection, id: i64) -> Result<Option<Prescription>, DatabaseError> {
    let sql = format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = ?1");
    let prescription = conn
        .query_row(&sql, params![id], prescription_from_row)
        .optional()?;

    match prescription {
        Some(mut p) => {
            p.medicines = get_prescription_lines(conn, p.id)?;
            Ok(Some(p))
        }
        None => Ok(None),
    }
}

/// Prescription with an embedded summary of its patient.
pub fn get_prescription_detail(
    conn: &Connection,
    id: i64,
) -> Result<Option<PrescriptionDetail>, DatabaseError> {
    let Some(prescription) = get_prescription(conn, id)? else {
        return Ok(None);
    };

    let patient = conn.query_row(
        "SELECT id, name, age, gender FROM patients WHERE id = ?1",
        params![prescription.patient_id],
        |row| {
            Ok(PatientSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                age: row.get(2)?,
                gender: row.get(3)?,
            })
        },
    )?;

    Ok(Some(PrescriptionDetail {
        prescription,
        patient,
    }))
}

/// Lines of one prescription in insertion order.
pub fn get_prescription_lines(
    conn: &Connection,
    prescription_id: i64,
) -> Result<Vec<PrescriptionLine>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, prescription_id, medicine_name, dosage, frequency, duration, instructions
         FROM prescription_medicines
         WHERE prescription_id = ?1
         ORDER BY id",
    )?;
    let rows = stmt.query_map(params![prescription_id], |row| {
        Ok(PrescriptionLine {
            id: row.get(0)?,
            prescription_id: row.get(1)?,
            medicine_name: row.get(2)?,
            dosage: row.get(3)?,
            frequency: row.get(4)?,
            duration: row.get(5)?,
            instructions: row.get(6)?,
        })
    })?;

    let mut lines = Vec::new();
    for row in rows {
        lines.push(row?);
    }
    Ok(lines)
}

/// Every prescription, most recently prescribed first.
pub fn list_prescriptions(conn: &Connection) -> Result<Vec<Prescription>, DatabaseError> {
    let sql = format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions ORDER BY prescribed_date DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], prescription_from_row)?;
    with_lines(conn, rows)
}

/// A patient's prescriptions, most recently prescribed first. An unknown
/// patient simply has none.
pub fn list_patient_prescriptions(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<Prescription>, DatabaseError> {
    let sql = format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions
         WHERE patient_id = ?1
         ORDER BY prescribed_date DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id], prescription_from_row)?;
    with_lines(conn, rows)
}

/// Delete a prescription. Its lines cascade.
pub fn delete_prescription(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM prescriptions WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Prescription", id));
    }
    Ok(())
}

fn with_lines(
    conn: &Connection,
    rows: impl Iterator<Item = rusqlite::Result<Prescription>>,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut prescriptions = Vec::new();
    for row in rows {
        let mut p = row?;
        p.medicines = get_prescription_lines(conn, p.id)?;
        prescriptions.push(p);
    }
    Ok(prescriptions)
}

fn prescription_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        diagnosis: row.get(2)?,
        additional_notes: row.get(3)?,
        next_visit_date: row.get(4)?,
        prescribed_date: row.get(5)?,
        updated_at: row.get(6)?,
        medicines: Vec::new(),
    })
}
