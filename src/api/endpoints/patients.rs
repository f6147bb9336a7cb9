//! Patient endpoints.
//!
//! - `GET /api/patients`: newest first
//! - `POST /api/patients`
//! - `GET|PUT|DELETE /api/patients/:id`
//! - `GET /api/patients/monthly-stats`: registrations per month, current year
//! - `GET /api/patients/:id/prescriptions`: newest first, lines embedded

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use chrono::Datelike;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Envelope};
use crate::db;
use crate::models::{MonthlyCounts, Patient, PatientInput, Prescription};

pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Envelope<Vec<Patient>>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patients = db::list_patients(&conn)?;
    Ok(Json(Envelope::ok(patients)))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Envelope<Patient>>, ApiError> {
    let Path(id) = id?;
    let conn = ctx.core.open_db()?;
    let patient = db::get_patient(&conn, id)?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;
    Ok(Json(Envelope::ok(patient)))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<PatientInput>, JsonRejection>,
) -> Result<Json<Envelope<Patient>>, ApiError> {
    let Json(input) = payload?;
    input.validate()?;

    let conn = ctx.core.open_db()?;
    let patient = db::insert_patient(&conn, &input)?;
    tracing::info!(patient_id = patient.id, "Patient created");
    Ok(Json(Envelope::ok(patient)))
}

/// Full replace: every writable field is overwritten, omitted ones become null.
pub async fn update(
    State(ctx): State<ApiContext>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PatientInput>, JsonRejection>,
) -> Result<Json<Envelope<Patient>>, ApiError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    input.validate()?;

    let conn = ctx.core.open_db()?;
    let patient = db::update_patient(&conn, id, &input)?;
    Ok(Json(Envelope::ok(patient)))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Envelope<()>>, ApiError> {
    let Path(id) = id?;
    let conn = ctx.core.open_db()?;
    db::delete_patient(&conn, id)?;
    tracing::info!(patient_id = id, "Patient deleted");
    Ok(Json(Envelope::message("Patient deleted successfully")))
}

pub async fn monthly_stats(
    State(ctx): State<ApiContext>,
) -> Result<Json<Envelope<MonthlyCounts>>, ApiError> {
    let year = chrono::Utc::now().year();
    let conn = ctx.core.open_db()?;
    let counts = db::monthly_patient_counts(&conn, year)?;
    Ok(Json(Envelope::ok(counts)))
}

/// An unknown patient id yields an empty list.
pub async fn prescriptions(
    State(ctx): State<ApiContext>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Envelope<Vec<Prescription>>>, ApiError> {
    let Path(patient_id) = id?;
    let conn = ctx.core.open_db()?;
    let prescriptions = db::list_patient_prescriptions(&conn, patient_id)?;
    Ok(Json(Envelope::ok(prescriptions)))
}
