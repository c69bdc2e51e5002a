use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use book::{
    external_search_url, EnrichedBook, RatingInfo, RecommendationCandidate, MAX_GENRES,
    MAX_RECOMMENDATIONS,
};
pub use preferences::{PreferenceSummary, PreferredComplexity, PreferredLength, ReadingRecord};

mod book;
mod preferences;

/// Request structure for book recommendations
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    /// Free-text description of the mood or kind of book wanted
    #[schema(example = "something cozy for a rainy weekend")]
    pub query: String,
    /// Summary returned by the preference import, if the user uploaded one
    #[serde(default)]
    pub preferences: Option<PreferenceSummary>,
    /// Records returned by the preference import
    #[serde(default)]
    pub reading_history: Option<Vec<ReadingRecord>>,
}

/// Response structure for book recommendations
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecommendationResponse {
    /// Enriched books, at most six
    pub recommendations: Vec<EnrichedBook>,
}

/// Result of importing a reading-history export
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PreferenceImportResponse {
    pub records: Vec<ReadingRecord>,
    pub summary: PreferenceSummary,
}

/// Query parameters for a direct cover lookup
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CoverQuery {
    #[schema(example = "Dune")]
    pub title: String,
    #[serde(default)]
    #[schema(example = "Frank Herbert")]
    pub author: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CoverResponse {
    /// Validated cover URL or the placeholder path
    pub cover: String,
}

/// Health check response structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Status of the service
    #[schema(example = "ok")]
    pub status: String,
    /// Current timestamp in RFC3339 format
    #[schema(example = "2024-01-15T10:30:00Z")]
    pub timestamp: String,
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    #[schema(example = "Invalid input: Query cannot be empty")]
    pub error: String,
}
