use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, name, age, weight, gender, contact_number, email, address,
     blood_group, allergies, medical_history, created_at, updated_at";

pub fn insert_patient(conn: &Connection, input: &PatientInput) -> Result<Patient, DatabaseError> {
    conn.execute(
        "INSERT INTO patients
         (name, age, weight, gender, contact_number, email, address, blood_group,
          allergies, medical_history)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            input.name.trim(),
            input.age,
            input.weight,
            input.gender,
            input.contact_number,
            input.email,
            input.address,
            input.blood_group,
            input.allergies,
            input.medical_history,
        ],
    )?;

    let id = conn.last_insert_rowid();
    get_patient(conn, id)?.ok_or_else(|| DatabaseError::not_found("Patient", id))
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], patient_from_row).optional()?)
}

/// All patients, newest registration first.
pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients ORDER BY created_at DESC, id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], patient_from_row)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(row?);
    }
    Ok(patients)
}

/// Full-record replace of every writable field.
pub fn update_patient(
    conn: &Connection,
    id: i64,
    input: &PatientInput,
) -> Result<Patient, DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients
         SET name = ?1, age = ?2, weight = ?3, gender = ?4, contact_number = ?5,
             email = ?6, address = ?7, blood_group = ?8, allergies = ?9,
             medical_history = ?10, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?11",
        params![
            input.name.trim(),
            input.age,
            input.weight,
            input.gender,
            input.contact_number,
            input.email,
            input.address,
            input.blood_group,
            input.allergies,
            input.medical_history,
            id,
        ],
    )?;

    if changed == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    get_patient(conn, id)?.ok_or_else(|| DatabaseError::not_found("Patient", id))
}

/// Delete a patient. Their prescriptions cascade.
pub fn delete_patient(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    Ok(())
}

/// Patient registrations per month of `year`. Months with no patients
/// stay at zero.
pub fn monthly_patient_counts(conn: &Connection, year: i32) -> Result<MonthlyCounts, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT CAST(strftime('%m', created_at) AS INTEGER) AS month, COUNT(*)
         FROM patients
         WHERE strftime('%Y', created_at) = ?1
         GROUP BY month",
    )?;

    let rows = stmt.query_map(params![format!("{year:04}")], |row| {
        Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?))
    })?;

    let mut counts = MonthlyCounts::new();
    for row in rows {
        let (month, count) = row?;
        counts.set(month, count);
    }
    Ok(counts)
}

fn patient_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        weight: row.get(3)?,
        gender: row.get(4)?,
        contact_number: row.get(5)?,
        email: row.get(6)?,
        address: row.get(7)?,
        blood_group: row.get(8)?,
        allergies: row.get(9)?,
        medical_history: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}
