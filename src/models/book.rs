use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Maximum number of books a single recommendation request yields.
pub const MAX_RECOMMENDATIONS: usize = 6;

/// Maximum number of genre tags kept per book.
pub const MAX_GENRES: usize = 2;

/// Scores the model may emit as numbers or numeric strings.
fn deserialize_optional_score<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f32),
    }

    let score = match Option::<StringOrFloat>::deserialize(deserializer)? {
        Some(StringOrFloat::Float(f)) => Some(f),
        Some(StringOrFloat::String(s)) => s.trim().parse::<f32>().ok(),
        None => None,
    };

    Ok(score
        .filter(|s| s.is_finite())
        .map(|s| s.clamp(0.0, 100.0)))
}

/// A model-proposed title/author pair with rationale, before metadata enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationCandidate {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default, deserialize_with = "deserialize_optional_score")]
    pub confidence: Option<f32>,
    #[serde(default, deserialize_with = "deserialize_optional_score")]
    pub match_score: Option<f32>,
    #[serde(default)]
    pub mood: Option<String>,
}

/// The final record handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedBook {
    #[schema(example = "Dune")]
    pub title: String,
    #[schema(example = "Frank Herbert")]
    pub author: String,
    /// Validated remote URL or the local placeholder path, never empty
    pub cover: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Search page for the title and author pair
    pub external_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
}

impl EnrichedBook {
    pub fn has_rating(&self) -> bool {
        self.rating.is_some_and(|r| r > 0.0)
    }

    /// Copy the recommendation rationale onto a looked-up book.
    pub fn merge_candidate(&mut self, candidate: &RecommendationCandidate) {
        self.reason = Some(candidate.reason.clone()).filter(|r| !r.is_empty());
        self.confidence = candidate.confidence;
        self.match_score = candidate.match_score;
        self.mood = candidate.mood.clone();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingInfo {
    pub rating: f64,
    pub review_count: u32,
}

/// Goodreads search page for a title and author.
pub fn external_search_url(title: &str, author: &str) -> String {
    format!(
        "https://www.goodreads.com/search?q={}",
        urlencoding::encode(&format!("{} {}", title, author))
    )
}
