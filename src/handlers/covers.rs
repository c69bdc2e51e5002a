use crate::{
    error::ApiError,
    models::{CoverQuery, CoverResponse},
    services::CoverLookup,
};
use actix_web::{web, HttpResponse};
use std::sync::Arc;

pub fn covers_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/covers").route(web::get().to(find_cover)));
}

/// Resolve a cover image for a title and author
#[utoipa::path(
    get,
    path = "/api/covers",
    tag = "Covers",
    params(
        ("title" = String, Query, description = "Book title"),
        ("author" = Option<String>, Query, description = "Author name"),
    ),
    responses(
        (status = 200, description = "A validated cover URL or the placeholder",
            body = CoverResponse),
        (status = 400, description = "Missing title", body = ErrorResponse),
    )
)]
pub async fn find_cover(
    query: web::Query<CoverQuery>,
    covers: web::Data<Arc<dyn CoverLookup>>,
) -> Result<HttpResponse, ApiError> {
    let title = query.title.trim();
    if title.is_empty() {
        return Err(ApiError::InvalidInput("Title cannot be empty".to_string()));
    }

    let cover = covers.resolve_best_cover(title, query.author.trim()).await;
    Ok(HttpResponse::Ok().json(CoverResponse { cover }))
}
