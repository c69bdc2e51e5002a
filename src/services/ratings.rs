use crate::error::Attempt;
use crate::models::{EnrichedBook, RatingInfo};
use crate::services::fallback::{first_accepted, FallbackSource};
use crate::services::google_books::GoogleBooksClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Finds a positive rating for a title and author.
#[async_trait]
pub trait RatingLookup: Send + Sync {
    async fn resolve_best_rating(&self, title: &str, author: &str) -> Option<RatingInfo>;
}

/// Rating from the best Google Books match.
pub struct GoogleBooksRatingSource {
    client: Arc<GoogleBooksClient>,
}

impl GoogleBooksRatingSource {
    pub fn new(client: Arc<GoogleBooksClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FallbackSource<RatingInfo> for GoogleBooksRatingSource {
    fn name(&self) -> &str {
        "google-books"
    }

    async fn attempt(&self, title: &str, author: &str) -> Attempt<RatingInfo> {
        self.client.lookup_rating(title, author).await.into()
    }
}

/// Goodreads retired its public API, so this source never has a rating.
/// It keeps its slot in the chain for when a replacement appears.
pub struct GoodreadsRatingSource;

#[async_trait]
impl FallbackSource<RatingInfo> for GoodreadsRatingSource {
    fn name(&self) -> &str {
        "goodreads"
    }

    async fn attempt(&self, _title: &str, _author: &str) -> Attempt<RatingInfo> {
        Attempt::Empty
    }
}

pub struct RatingResolver {
    sources: Vec<Box<dyn FallbackSource<RatingInfo>>>,
}

impl RatingResolver {
    pub fn new(sources: Vec<Box<dyn FallbackSource<RatingInfo>>>) -> Self {
        Self { sources }
    }

    /// Google Books first, then the Goodreads placeholder.
    pub fn with_default_sources(google_books: Arc<GoogleBooksClient>) -> Self {
        Self::new(vec![
            Box::new(GoogleBooksRatingSource::new(google_books)),
            Box::new(GoodreadsRatingSource),
        ])
    }
}

#[async_trait]
impl RatingLookup for RatingResolver {
    async fn resolve_best_rating(&self, title: &str, author: &str) -> Option<RatingInfo> {
        first_accepted(&self.sources, title, author, |info: &RatingInfo| {
            info.rating > 0.0
        })
        .await
    }
}

/// Fill in a missing rating. Books that already carry a positive rating are
/// returned untouched.
pub async fn enrich_with_rating(
    ratings: &dyn RatingLookup,
    mut book: EnrichedBook,
) -> EnrichedBook {
    if book.has_rating() {
        return book;
    }

    if let Some(info) = ratings.resolve_best_rating(&book.title, &book.author).await {
        debug!("Rating {} for \"{}\"", info.rating, book.title);
        book.rating = Some(info.rating);
        if info.review_count > 0 {
            book.review_count = Some(info.review_count);
        }
    }
    book
}
