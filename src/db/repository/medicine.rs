use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

const MEDICINE_COLUMNS: &str = "id, name, generic_name, common_dosage, medicine_type, form,
     strength, manufacturer, description, created_at";

pub fn insert_medicine(conn: &Connection, input: &MedicineInput) -> Result<Medicine, DatabaseError> {
    conn.execute(
        "INSERT INTO medicines
         (name, generic_name, common_dosage, medicine_type, form, strength, manufacturer, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            input.name.trim(),
            input.generic_name,
            input.common_dosage,
            input.medicine_type,
            input.form,
            input.strength,
            input.manufacturer,
            input.description,
        ],
    )
    .map_err(|e| duplicate_name(e, &input.name))?;

    let id = conn.last_insert_rowid();
    get_medicine(conn, id)?.ok_or_else(|| DatabaseError::not_found("Medicine", id))
}

pub fn get_medicine(conn: &Connection, id: i64) -> Result<Option<Medicine>, DatabaseError> {
    let sql = format!("SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], medicine_from_row).optional()?)
}

/// Catalog in alphabetical order.
pub fn list_medicines(conn: &Connection) -> Result<Vec<Medicine>, DatabaseError> {
    let sql = format!("SELECT {MEDICINE_COLUMNS} FROM medicines ORDER BY name ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], medicine_from_row)?;

    let mut medicines = Vec::new();
    for row in rows {
        medicines.push(row?);
    }
    Ok(medicines)
}

/// Full-record replace. Existing prescription lines keep their snapshot.
pub fn update_medicine(
    conn: &Connection,
    id: i64,
    input: &MedicineInput,
) -> Result<Medicine, DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE medicines
             SET name = ?1, generic_name = ?2, common_dosage = ?3, medicine_type = ?4,
                 form = ?5, strength = ?6, manufacturer = ?7, description = ?8
             WHERE id = ?9",
            params![
                input.name.trim(),
                input.generic_name,
                input.common_dosage,
                input.medicine_type,
                input.form,
                input.strength,
                input.manufacturer,
                input.description,
                id,
            ],
        )
        .map_err(|e| duplicate_name(e, &input.name))?;

    if changed == 0 {
        return Err(DatabaseError::not_found("Medicine", id));
    }
    get_medicine(conn, id)?.ok_or_else(|| DatabaseError::not_found("Medicine", id))
}

pub fn delete_medicine(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM medicines WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Medicine", id));
    }
    Ok(())
}

fn duplicate_name(err: rusqlite::Error, name: &str) -> DatabaseError {
    if super::is_constraint_violation(&err) {
        DatabaseError::ConstraintViolation(format!("Medicine already exists: {}", name.trim()))
    } else {
        DatabaseError::Sqlite(err)
    }
}

fn medicine_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Medicine> {
    Ok(Medicine {
        id: row.get(0)?,
        name: row.get(1)?,
        generic_name: row.get(2)?,
        common_dosage: row.get(3)?,
        medicine_type: row.get(4)?,
        form: row.get(5)?,
        strength: row.get(6)?,
        manufacturer: row.get(7)?,
        description: row.get(8)?,
        created_at: row.get(9)?,
    })
}
