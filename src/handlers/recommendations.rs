use crate::{
    error::ApiError,
    models::{RecommendationRequest, RecommendationResponse},
    services::RecommendationService,
};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};

pub fn recommendations_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/recommendations").route(web::post().to(get_recommendations)));
}

/// Get book recommendations
///
/// Asks the language model for books matching the request, personalized when an
/// imported preference summary and reading history are supplied, then attaches
/// metadata, a validated cover and a rating to each. Falls back to a direct
/// metadata search when the model gives nothing usable.
#[utoipa::path(
    post,
    path = "/api/recommendations",
    tag = "Recommendations",
    request_body = RecommendationRequest,
    responses(
        (status = 200, description = "Up to six enriched recommendations",
            body = RecommendationResponse),
        (status = 400, description = "Invalid input parameters", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn get_recommendations(
    request: Json<RecommendationRequest>,
    recommendation_service: web::Data<RecommendationService>,
) -> Result<HttpResponse, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::InvalidInput("Query cannot be empty".to_string()));
    }

    let recommendations = recommendation_service
        .get_recommendations(
            &request.query,
            request.preferences.as_ref(),
            request.reading_history.as_deref(),
        )
        .await;

    Ok(HttpResponse::Ok().json(RecommendationResponse { recommendations }))
}
