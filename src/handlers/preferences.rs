use crate::{
    error::ApiError,
    models::PreferenceImportResponse,
    services::preferences::{parse_reading_history, summarize},
};
use actix_web::{web, HttpResponse};
use tracing::info;

pub fn preferences_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/preferences/import").route(web::post().to(import_preferences)));
}

/// Import a reading-history CSV export
#[utoipa::path(
    post,
    path = "/api/preferences/import",
    tag = "Preferences",
    request_body(
        content = String,
        content_type = "text/csv",
        description = "CSV export with a header row: Title, Author, Rating, Date Read, Review, ISBN"
    ),
    responses(
        (status = 200, description = "Parsed records and the derived preference summary",
            body = PreferenceImportResponse),
        (status = 400, description = "No usable rows in the upload", body = ErrorResponse),
    )
)]
pub async fn import_preferences(body: String) -> Result<HttpResponse, ApiError> {
    let records = parse_reading_history(&body);
    if records.is_empty() {
        return Err(ApiError::InvalidInput(
            "No valid books found in the CSV file. Please check the format.".to_string(),
        ));
    }

    let summary = summarize(&records);
    info!(
        "Imported {} books, {} favorite authors",
        records.len(),
        summary.favorite_authors.len()
    );

    Ok(HttpResponse::Ok().json(PreferenceImportResponse { records, summary }))
}
