//! Ordered fallback chains shared by the cover and rating lookups.

use crate::error::Attempt;
use async_trait::async_trait;
use tracing::{debug, warn};

/// One source in a fallback chain, keyed by a book's title and author.
#[async_trait]
pub trait FallbackSource<T>: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn attempt(&self, title: &str, author: &str) -> Attempt<T>;
}

/// Try each source in order and return the first value found.
///
/// Sources are awaited one at a time; a source that is empty or failed hands
/// over to the next one.
pub async fn first_found<T: Send>(
    sources: &[Box<dyn FallbackSource<T>>],
    title: &str,
    author: &str,
) -> Option<T> {
    first_accepted(sources, title, author, |_| true).await
}

/// Like [`first_found`], but a found value must also pass `accept`.
/// Rejected values count as empty.
pub async fn first_accepted<T: Send>(
    sources: &[Box<dyn FallbackSource<T>>],
    title: &str,
    author: &str,
    accept: impl Fn(&T) -> bool,
) -> Option<T> {
    for source in sources {
        match source.attempt(title, author).await {
            Attempt::Found(value) if accept(&value) => {
                debug!("Source '{}' resolved \"{}\"", source.name(), title);
                return Some(value);
            }
            Attempt::Found(_) => {
                debug!("Source '{}' result rejected for \"{}\"", source.name(), title);
            }
            Attempt::Empty => {
                debug!("Source '{}' had nothing for \"{}\"", source.name(), title);
            }
            Attempt::Failed(e) => {
                warn!("Source '{}' failed for \"{}\": {}", source.name(), title, e);
            }
        }
    }
    None
}
