use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use donorflow_core::ingestion::ingest_csv;
use donorflow_core::types::{Donor, DonorPatch, DonorSource, NewDonor};
use donorflow_core::upload::{check_upload, UploadFile, UploadRejection, UploadResponse};
use donorflow_core::upsert::UpsertKind;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadRejection::TooLarge { limit }.into()
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

async fn read_file_field(
    multipart: &mut Multipart,
    limit: usize,
) -> Result<Option<UploadFile>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| multipart_error(err, limit))?;
        return Ok(Some(UploadFile {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

pub async fn upload_donors(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let file = read_file_field(&mut multipart, state.max_upload_bytes).await?;
    let content = check_upload(file.as_ref(), state.max_upload_bytes)?;

    let report = ingest_csv(state.store.as_ref(), content, Utc::now()).await?;
    Ok(Json(report.into()))
}

pub async fn list_donors(State(state): State<AppState>) -> Result<Json<Vec<Donor>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

/// Manual entry. Goes through the same upsert as CSV rows, so a donation for
/// a known email is merged into that donor.
pub async fn create_donor(
    State(state): State<AppState>,
    Json(input): Json<NewDonor>,
) -> Result<(StatusCode, Json<Donor>), ApiError> {
    let source = input.source.unwrap_or(DonorSource::ManualEntry);
    let intent = input.into_intent();

    let upserted = state
        .store
        .upsert_donation(&intent, source, Utc::now())
        .await?;
    let status = match upserted.kind {
        UpsertKind::Created => StatusCode::CREATED,
        UpsertKind::Merged => StatusCode::OK,
    };
    Ok((status, Json(upserted.donor)))
}

pub async fn get_donor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Donor>, ApiError> {
    Ok(Json(state.store.get(id).await?))
}

pub async fn replace_donor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<NewDonor>,
) -> Result<Json<Donor>, ApiError> {
    Ok(Json(state.store.replace(id, input, Utc::now()).await?))
}

pub async fn update_donor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<DonorPatch>,
) -> Result<Json<Donor>, ApiError> {
    if patch.is_empty() {
        return Err(ApiError::BadRequest(
            "No updatable fields supplied".to_string(),
        ));
    }
    Ok(Json(state.store.update(id, patch, Utc::now()).await?))
}

pub async fn delete_donor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let donor = state.store.delete(id).await?;
    tracing::info!(donor_id = %donor.id, email = %donor.email, "donor deleted");
    Ok(Json(json!({
        "message": "Donor deleted successfully",
        "donor": donor,
    })))
}
