//! Medicine catalog endpoints. Listing is alphabetical.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Envelope};
use crate::db;
use crate::models::{Medicine, MedicineInput};

pub async fn list(
    State(ctx): State<ApiContext>,
) -> Result<Json<Envelope<Vec<Medicine>>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(Envelope::ok(db::list_medicines(&conn)?)))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Envelope<Medicine>>, ApiError> {
    let Path(id) = id?;
    let conn = ctx.core.open_db()?;
    let medicine = db::get_medicine(&conn, id)?
        .ok_or_else(|| ApiError::NotFound("Medicine not found".into()))?;
    Ok(Json(Envelope::ok(medicine)))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<MedicineInput>, JsonRejection>,
) -> Result<Json<Envelope<Medicine>>, ApiError> {
    let Json(input) = payload?;
    input.validate()?;

    let conn = ctx.core.open_db()?;
    let medicine = db::insert_medicine(&conn, &input)?;
    tracing::info!(medicine_id = medicine.id, "Medicine added to catalog");
    Ok(Json(Envelope::ok(medicine)))
}

/// Catalog edits never touch prescription lines already written.
pub async fn update(
    State(ctx): State<ApiContext>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<MedicineInput>, JsonRejection>,
) -> Result<Json<Envelope<Medicine>>, ApiError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    input.validate()?;

    let conn = ctx.core.open_db()?;
    Ok(Json(Envelope::ok(db::update_medicine(&conn, id, &input)?)))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Envelope<()>>, ApiError> {
    let Path(id) = id?;
    let conn = ctx.core.open_db()?;
    db::delete_medicine(&conn, id)?;
    Ok(Json(Envelope::message("Medicine deleted successfully")))
}
