//! Prescription endpoints.
//!
//! Create and update go through the transactional repository calls: the
//! prescription row and its whole line set commit together or not at all.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Envelope};
use crate::db;
use crate::models::{NewPrescription, Prescription, PrescriptionDetail, PrescriptionUpdate};

pub async fn list(
    State(ctx): State<ApiContext>,
) -> Result<Json<Envelope<Vec<Prescription>>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(Envelope::ok(db::list_prescriptions(&conn)?)))
}

/// `GET /api/prescriptions/:id`: lines plus a summary of the patient.
pub async fn get(
    State(ctx): State<ApiContext>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Envelope<PrescriptionDetail>>, ApiError> {
    let Path(id) = id?;
    let conn = ctx.core.open_db()?;
    let detail = db::get_prescription_detail(&conn, id)?
        .ok_or_else(|| ApiError::NotFound("Prescription not found".into()))?;
    Ok(Json(Envelope::ok(detail)))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewPrescription>, JsonRejection>,
) -> Result<Json<Envelope<Prescription>>, ApiError> {
    let Json(new) = payload?;
    new.validate()?;

    let conn = ctx.core.open_db()?;
    let prescription = db::create_prescription(&conn, &new)?;
    tracing::info!(
        prescription_id = prescription.id,
        patient_id = prescription.patient_id,
        lines = prescription.medicines.len(),
        "Prescription created"
    );
    Ok(Json(Envelope::ok(prescription)))
}

/// Replace diagnosis, notes, next visit and the entire line set.
pub async fn update(
    State(ctx): State<ApiContext>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PrescriptionUpdate>, JsonRejection>,
) -> Result<Json<Envelope<Prescription>>, ApiError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    update.validate()?;

    let conn = ctx.core.open_db()?;
    let prescription = db::replace_prescription(&conn, id, &update)?;
    Ok(Json(Envelope::ok(prescription)))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Envelope<()>>, ApiError> {
    let Path(id) = id?;
    let conn = ctx.core.open_db()?;
    db::delete_prescription(&conn, id)?;
    Ok(Json(Envelope::message("Prescription deleted successfully")))
}
