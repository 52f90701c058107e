//! CSV import/export HTTP handlers

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::error::AppError;
use crate::services::interchange::InterchangeService;
use crate::AppState;

/// Import orders from an uploaded CSV file (multipart field `file`)
pub async fn import_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let service = InterchangeService::new(state.db.clone());

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let data = match field.text().await {
                    Ok(text) => text,
                    Err(e) => {
                        return AppError::validation("file", format!("Unreadable upload: {}", e))
                            .into_response()
                    }
                };
                return match service.import_csv(&data).await {
                    Ok(report) => (StatusCode::OK, Json(report)).into_response(),
                    Err(e) => e.into_response(),
                };
            }
            Ok(None) => break,
            Err(e) => {
                return AppError::validation("file", format!("Malformed upload: {}", e))
                    .into_response()
            }
        }
    }

    AppError::validation("file", "Missing `file` field in upload").into_response()
}

/// Export every order as a CSV attachment
pub async fn export_csv(State(state): State<AppState>) -> impl IntoResponse {
    let service = InterchangeService::new(state.db.clone());

    match service.export_csv().await {
        Ok(csv_data) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"orders.csv\"",
                ),
            ],
            csv_data,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
