use crate::models::{
    external_search_url, EnrichedBook, PreferenceSummary, ReadingRecord, RecommendationCandidate,
    MAX_RECOMMENDATIONS,
};
use crate::services::covers::CoverLookup;
use crate::services::google_books::BookSearch;
use crate::services::ratings::{enrich_with_rating, RatingLookup};
use crate::services::recommendation_engine::RecommendationEngine;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Only the best match is merged with a candidate, so only one is fetched.
const CANDIDATE_MATCHES: usize = 1;

/// Joins model recommendations with book metadata, covers and ratings.
#[derive(Clone)]
pub struct RecommendationService {
    engine: RecommendationEngine,
    search: Arc<dyn BookSearch>,
    covers: Arc<dyn CoverLookup>,
    ratings: Arc<dyn RatingLookup>,
    max_results: usize,
}

impl RecommendationService {
    pub fn new(
        engine: RecommendationEngine,
        search: Arc<dyn BookSearch>,
        covers: Arc<dyn CoverLookup>,
        ratings: Arc<dyn RatingLookup>,
    ) -> Self {
        Self {
            engine,
            search,
            covers,
            ratings,
            max_results: MAX_RECOMMENDATIONS,
        }
    }

    /// Page size of the direct search fallback.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// Enriched recommendations for a free-text request.
    ///
    /// This never fails. When the model yields nothing, or anything in the
    /// enrichment panics, the request text is searched directly instead. The
    /// worst case is an empty list.
    pub async fn get_recommendations(
        &self,
        user_input: &str,
        preferences: Option<&PreferenceSummary>,
        records: Option<&[ReadingRecord]>,
    ) -> Vec<EnrichedBook> {
        let query = user_input.trim();
        info!("Getting recommendations for '{}'", query);

        let outcome = AssertUnwindSafe(self.recommend_and_enrich(query, preferences, records))
            .catch_unwind()
            .await;

        match outcome {
            Ok(books) => books,
            Err(_) => {
                error!("Recommendation pipeline panicked for '{}', using direct search", query);
                AssertUnwindSafe(self.direct_search(query))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        error!("Direct search panicked for '{}'", query);
                        Vec::new()
                    })
            }
        }
    }

    async fn recommend_and_enrich(
        &self,
        query: &str,
        preferences: Option<&PreferenceSummary>,
        records: Option<&[ReadingRecord]>,
    ) -> Vec<EnrichedBook> {
        let candidates = self.engine.recommend(query, preferences, records).await;

        if candidates.is_empty() {
            warn!("No model recommendations for '{}', using direct search", query);
            return self.direct_search(query).await;
        }

        // Strictly one candidate at a time.
        let mut books = Vec::with_capacity(candidates.len());
        for candidate in candidates.iter().take(MAX_RECOMMENDATIONS) {
            books.push(self.enrich_candidate(candidate).await);
        }

        info!("Returning {} enriched recommendations", books.len());
        books
    }

    async fn enrich_candidate(&self, candidate: &RecommendationCandidate) -> EnrichedBook {
        let search_query = format!("{} {}", candidate.title, candidate.author);
        let found = self
            .search
            .search(&search_query, CANDIDATE_MATCHES)
            .await
            .into_iter()
            .next();

        let book = match found {
            Some(mut book) => {
                book.merge_candidate(candidate);
                book
            }
            None => {
                debug!(
                    "No metadata for \"{}\", building it from the recommendation",
                    candidate.title
                );
                self.book_from_candidate(candidate).await
            }
        };

        enrich_with_rating(self.ratings.as_ref(), book).await
    }

    async fn book_from_candidate(&self, candidate: &RecommendationCandidate) -> EnrichedBook {
        let cover = self
            .covers
            .resolve_best_cover(&candidate.title, &candidate.author)
            .await;
        let mut book = EnrichedBook {
            title: candidate.title.clone(),
            author: candidate.author.clone(),
            cover,
            genres: Some(vec![candidate.genre.trim().to_string()]),
            external_url: external_search_url(&candidate.title, &candidate.author),
            ..Default::default()
        };
        book.merge_candidate(candidate);
        book
    }

    /// Search the raw request text and fill in missing ratings.
    async fn direct_search(&self, query: &str) -> Vec<EnrichedBook> {
        let found = self.search.search(query, self.max_results).await;

        let mut books = Vec::with_capacity(found.len());
        for book in found.into_iter().take(MAX_RECOMMENDATIONS) {
            books.push(enrich_with_rating(self.ratings.as_ref(), book).await);
        }

        info!("Direct search returned {} books for '{}'", books.len(), query);
        books
    }
}
