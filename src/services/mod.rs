pub mod completion;
pub mod covers;
pub mod fallback;
pub mod google_books;
pub mod preferences;
pub mod ratings;
pub mod recommendation;
pub mod recommendation_engine;

// Re-export public types
pub use completion::{CompletionClient, OpenAiClient};
pub use covers::{CoverLookup, CoverResolver};
pub use google_books::{BookSearch, GoogleBooksClient};
pub use ratings::{RatingLookup, RatingResolver};
pub use recommendation::RecommendationService;
pub use recommendation_engine::{EngineSettings, RecommendationEngine};
