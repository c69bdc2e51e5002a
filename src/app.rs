use crate::{
    config::Config,
    error::Result,
    handlers,
    models::{
        CoverQuery, CoverResponse, EnrichedBook, ErrorResponse, HealthResponse,
        PreferenceImportResponse, PreferenceSummary, PreferredComplexity, PreferredLength,
        ReadingRecord, RecommendationRequest, RecommendationResponse,
    },
    routes::{api_routes, openapi_route},
    services::{
        CoverLookup, CoverResolver, EngineSettings, GoogleBooksClient, OpenAiClient,
        RatingResolver, RecommendationEngine, RecommendationService,
    },
};
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use log::{info, warn};
use std::net::TcpListener;
use std::sync::Arc;
use utoipa::OpenApi;

/// Largest accepted request body, enough for a long reading-history export.
const MAX_PAYLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::recommendations::get_recommendations,
        handlers::preferences::import_preferences,
        handlers::covers::find_cover,
    ),
    components(schemas(
        RecommendationRequest,
        RecommendationResponse,
        EnrichedBook,
        ReadingRecord,
        PreferenceSummary,
        PreferredLength,
        PreferredComplexity,
        PreferenceImportResponse,
        CoverQuery,
        CoverResponse,
        HealthResponse,
        ErrorResponse,
    )),
    tags(
        (name = "Recommendations", description = "Mood-based book recommendations"),
        (name = "Preferences", description = "Reading-history import"),
        (name = "Covers", description = "Cover image resolution"),
        (name = "Health", description = "Service health"),
    )
)]
pub struct ApiDoc;

/// Services shared by every worker.
#[derive(Clone)]
pub struct AppServices {
    pub recommendations: RecommendationService,
    pub covers: Arc<dyn CoverLookup>,
}

impl AppServices {
    /// Wire the production clients from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        if config.openai_api_key.trim().is_empty() {
            warn!("APP_OPENAI_API_KEY is not set, recommendations will use direct search only");
        }

        let covers: Arc<dyn CoverLookup> =
            Arc::new(CoverResolver::from_config(config, client.clone()));
        let google_books = Arc::new(GoogleBooksClient::from_config(
            config,
            client.clone(),
            covers.clone(),
        ));
        let ratings = Arc::new(RatingResolver::with_default_sources(google_books.clone()));
        let completion = Arc::new(OpenAiClient::from_config(config, client));
        let engine = RecommendationEngine::new(completion, EngineSettings::from(config));

        let recommendations =
            RecommendationService::new(engine, google_books, covers.clone(), ratings)
                .with_max_results(config.max_results);

        Ok(Self {
            recommendations,
            covers,
        })
    }
}

/// Register the shared services and routes on an actix `App`.
pub fn configure_app(services: &AppServices) -> impl FnOnce(&mut web::ServiceConfig) {
    let recommendations = web::Data::new(services.recommendations.clone());
    let covers = web::Data::new(services.covers.clone());

    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::PayloadConfig::new(MAX_PAYLOAD_BYTES))
            .app_data(recommendations)
            .app_data(covers)
            .service(api_routes())
            .service(openapi_route());
    }
}

pub struct Application {
    port: u16,
    host: String,
    config: Config,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.port,
            host: config.host.clone(),
            config: config.clone(),
        }
    }

    /// Build and run the server
    pub async fn run(&self) -> Result<()> {
        let bind_address = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&bind_address)?;
        info!("Starting server at http://{}", bind_address);

        self.run_with_listener(listener).await
    }

    /// Run the server with a specific TCP listener
    /// This is useful for testing where we want to use a random port
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let services = AppServices::from_config(&self.config)?;

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header();

            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .configure(configure_app(&services))
        })
        .listen(listener)?
        .run()
        .await?;

        Ok(())
    }
}
