use actix_web::{web, HttpResponse, Scope};
use utoipa::OpenApi;

use crate::app::ApiDoc;
use crate::handlers::{covers_config, health_check, preferences_config, recommendations_config};

/// Configure all routes for the API
pub fn api_routes() -> Scope {
    web::scope("/api")
        .service(health_check)
        .configure(recommendations_config)
        .configure(preferences_config)
        .configure(covers_config)
}

/// Configure OpenAPI documentation JSON endpoint
pub fn openapi_route() -> actix_web::Resource {
    web::resource("/api-docs/openapi.json")
        .route(web::get().to(|| async { HttpResponse::Ok().json(ApiDoc::openapi()) }))
        .route(
            web::route()
                .method(actix_web::http::Method::OPTIONS)
                .to(|| async { HttpResponse::Ok().finish() }),
        )
}
