//! Turns a free-text request into model-proposed book candidates.

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{
    PreferenceSummary, ReadingRecord, RecommendationCandidate, MAX_RECOMMENDATIONS,
};
use crate::services::completion::{CompletionClient, CompletionRequest};
use crate::services::preferences::average_rating;
use std::sync::Arc;
use tracing::{info, warn};

const PROFILE_AUTHORS: usize = 5;
const PROFILE_HISTORY: usize = 10;

pub const SYSTEM_PROMPT: &str = "You are an expert book recommendation assistant with deep knowledge of literature across all genres. You prioritize well-rated, popular, and accessible books. Always recommend books with 4.0+ Goodreads ratings and 1000+ reviews when possible. Always respond with valid JSON arrays containing book recommendations.";

const EDITORIAL_POLICY: &str = "IMPORTANT: When recommending books, prioritize books that are:
1. Highly rated on Goodreads (4.0+ average rating with 1000+ ratings)
2. Popular and well-known in their genre
3. From established, respected authors
4. Available in most bookstores and libraries
5. Have received positive critical acclaim

AVOID recommending:
- Obscure, self-published books with few ratings
- Books with average ratings below 3.5 on Goodreads
- Extremely niche or experimental works unless specifically requested
- Books that are out of print or hard to find";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1500,
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            temperature: config.openai_temperature,
            max_tokens: config.openai_max_tokens,
        }
    }
}

#[derive(Clone)]
pub struct RecommendationEngine {
    client: Arc<dyn CompletionClient>,
    settings: EngineSettings,
}

impl RecommendationEngine {
    pub fn new(client: Arc<dyn CompletionClient>, settings: EngineSettings) -> Self {
        Self { client, settings }
    }

    /// Candidates for a request, at most six.
    ///
    /// An empty list means the model could not be used, whatever the reason.
    /// Callers fall back to a direct search in that case.
    pub async fn recommend(
        &self,
        user_input: &str,
        preferences: Option<&PreferenceSummary>,
        records: Option<&[ReadingRecord]>,
    ) -> Vec<RecommendationCandidate> {
        match self.try_recommend(user_input, preferences, records).await {
            Ok(candidates) => {
                info!("Model proposed {} candidates", candidates.len());
                candidates
            }
            Err(e) => {
                warn!("Error getting recommendations from model: {}", e);
                Vec::new()
            }
        }
    }

    /// Same as [`recommend`](Self::recommend) but reports why nothing came back.
    pub async fn try_recommend(
        &self,
        user_input: &str,
        preferences: Option<&PreferenceSummary>,
        records: Option<&[ReadingRecord]>,
    ) -> Result<Vec<RecommendationCandidate>> {
        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: build_prompt(user_input, preferences, records),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let content = self.client.complete(&request).await?;
        parse_candidates(&content)
    }
}

/// Build the user prompt. The profile block is only included when both a
/// summary and a non-empty record list are supplied.
pub fn build_prompt(
    user_input: &str,
    preferences: Option<&PreferenceSummary>,
    records: Option<&[ReadingRecord]>,
) -> String {
    let profile = match (preferences, records) {
        (Some(summary), Some(records)) if !records.is_empty() => Some((summary, records)),
        _ => None,
    };

    match profile {
        Some((summary, records)) => personalized_prompt(user_input, summary, records),
        None => general_prompt(user_input),
    }
}

fn personalized_prompt(
    user_input: &str,
    summary: &PreferenceSummary,
    records: &[ReadingRecord],
) -> String {
    let top_authors = summary
        .favorite_authors
        .iter()
        .take(PROFILE_AUTHORS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let recent_books = summary
        .reading_history
        .iter()
        .take(PROFILE_HISTORY)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let mean = average_rating(records).unwrap_or_default();

    format!(
        r#"User Profile:
- Favorite Authors: {top_authors}
- Recent Books Read: {recent_books}
- Average Rating: {mean:.1}/5
- Total Books Read: {total}

User Query: "{user_input}"

{EDITORIAL_POLICY}

Based on this user's reading history and preferences, suggest {MAX_RECOMMENDATIONS} books that would be perfect for them. Consider:
1. Their favorite authors and similar well-established authors
2. Books rated highly by users with similar tastes (4.0+ on Goodreads)
3. The specific request in their query
4. Avoiding books they've already read
5. Prioritizing books that are widely available and well-reviewed

For each book, provide:
1. Exact title
2. Author name
3. Detailed reason why this book matches their preferences
4. Primary genre
5. Confidence score (0-100) based on how well it matches their profile
6. Match score (0-100) for the specific query

Respond with only a JSON array, no other text:
[
  {{
    "title": "Exact Book Title",
    "author": "Author Name",
    "reason": "Detailed explanation of why this book matches their preferences",
    "genre": "Primary genre",
    "confidence": 85,
    "matchScore": 92
  }}
]"#,
        total = records.len(),
    )
}

fn general_prompt(user_input: &str) -> String {
    format!(
        r#"User Query: "{user_input}"

{EDITORIAL_POLICY}

Suggest {MAX_RECOMMENDATIONS} excellent books that fit this mood or request. Consider:
1. Popular and well-reviewed books (4.0+ Goodreads rating)
2. Books that match the query intent and mood
3. Diverse recommendations across genres
4. Books that are widely available and accessible

For each book, provide:
1. Exact title
2. Author name
3. Reason why this book matches their request
4. Primary genre
5. The mood the book suits, in one or two words

Respond with only a JSON array, no other text:
[
  {{
    "title": "Exact Book Title",
    "author": "Author Name",
    "reason": "Why this book matches their request",
    "genre": "Primary genre",
    "mood": "Uplifting"
  }}
]"#
    )
}

/// Strictly parse the model output as a JSON array of candidates.
///
/// Entries with a blank title or author are dropped and the result is capped
/// at six.
pub fn parse_candidates(content: &str) -> Result<Vec<RecommendationCandidate>> {
    let parsed: Vec<RecommendationCandidate> = serde_json::from_str(content.trim())
        .map_err(|e| {
            ApiError::SerializationError(format!("Model output is not a candidate array: {}", e))
        })?;

    Ok(parsed
        .into_iter()
        .filter(|c| !c.title.trim().is_empty() && !c.author.trim().is_empty())
        .take(MAX_RECOMMENDATIONS)
        .collect())
}
