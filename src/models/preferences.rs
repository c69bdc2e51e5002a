use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One line of an uploaded reading-history export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRecord {
    pub title: String,
    pub author: String,
    pub rating: f64,
    pub date_read: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PreferredLength {
    Short,
    #[default]
    Medium,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PreferredComplexity {
    Simple,
    #[default]
    Moderate,
    Complex,
}

/// Aggregate view of a reading history used to bias recommendations.
///
/// Genres, goals, dislikes, length and complexity are placeholders: nothing
/// classifies books yet, so they always carry their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferenceSummary {
    /// At most ten authors, most frequent first
    pub favorite_authors: Vec<String>,
    /// `"{title} by {author}"` for every record, in upload order
    pub reading_history: Vec<String>,
    /// Mean rating, absent when there was nothing to average
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    pub preferred_length: PreferredLength,
    pub preferred_complexity: PreferredComplexity,
    pub favorite_genres: Vec<String>,
    pub reading_goals: Vec<String>,
    pub disliked_genres: Vec<String>,
    pub disliked_authors: Vec<String>,
}
