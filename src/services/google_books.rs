//! Client for the Google Books volumes API.

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{external_search_url, EnrichedBook, RatingInfo, MAX_GENRES};
use crate::services::covers::CoverLookup;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Query parameters that add nothing to a cover image.
const STRIPPED_IMAGE_PARAMS: [&str; 6] = ["zoom", "edge", "source", "printsec", "img", "dq"];

#[derive(Debug, Deserialize)]
pub struct VolumesResponse {
    #[serde(default)]
    pub items: Option<Vec<Volume>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    #[serde(default)]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeInfo {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub image_links: Option<ImageLinks>,
    pub categories: Option<Vec<String>>,
    pub average_rating: Option<f64>,
    pub ratings_count: Option<u32>,
    pub description: Option<String>,
    pub published_date: Option<String>,
    pub page_count: Option<u32>,
    pub publisher: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageLinks {
    pub thumbnail: Option<String>,
    pub small_thumbnail: Option<String>,
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
}

impl ImageLinks {
    /// Thumbnail first, then progressively larger or alternate sizes.
    pub fn best(&self) -> Option<&str> {
        [
            &self.thumbnail,
            &self.small_thumbnail,
            &self.medium,
            &self.large,
            &self.small,
        ]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
    }
}

impl VolumeInfo {
    pub fn display_title(&self) -> String {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_TITLE)
            .to_string()
    }

    pub fn primary_author(&self) -> String {
        self.authors
            .as_ref()
            .and_then(|a| a.first())
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR)
            .to_string()
    }

    /// Everything except the cover, which needs network validation.
    pub fn to_book(&self, cover: String) -> EnrichedBook {
        let title = self.display_title();
        let author = self.primary_author();
        let external_url = external_search_url(&title, &author);

        EnrichedBook {
            title,
            author,
            cover,
            genres: self
                .categories
                .as_ref()
                .map(|c| c.iter().take(MAX_GENRES).cloned().collect()),
            rating: self.average_rating,
            review_count: self.ratings_count,
            description: self.description.clone(),
            external_url,
            published_date: self.published_date.clone(),
            page_count: self.page_count,
            publisher: self.publisher.clone(),
            ..Default::default()
        }
    }
}

/// Rewrite an API image link into a cleaner, secure URL.
///
/// The scheme is upgraded to https, low-value query parameters are dropped as
/// are parameters whose value is empty, `undefined` or `null`, and stray
/// separators left behind are collapsed.
pub fn normalize_image_url(raw: &str) -> String {
    let raw = raw.trim();
    let secure = match raw.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => raw.to_string(),
    };

    let (without_fragment, fragment) = match secure.split_once('#') {
        Some((url, fragment)) => (url, Some(fragment)),
        None => (secure.as_str(), None),
    };

    let Some((base, query)) = without_fragment.split_once('?') else {
        return secure;
    };

    let kept: Vec<&str> = query.split('&').filter(|p| keep_image_param(p)).collect();

    let mut url = base.to_string();
    if !kept.is_empty() {
        url.push('?');
        url.push_str(&kept.join("&"));
    }
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    url
}

fn keep_image_param(param: &str) -> bool {
    if param.is_empty() {
        return false;
    }
    match param.split_once('=') {
        Some((key, value)) => {
            !STRIPPED_IMAGE_PARAMS.contains(&key) && !matches!(value, "" | "undefined" | "null")
        }
        None => true,
    }
}

/// Free-text book search returning enriched records.
#[async_trait]
pub trait BookSearch: Send + Sync {
    /// Never fails: transport, status and parse errors yield an empty list.
    async fn search(&self, query: &str, max_results: usize) -> Vec<EnrichedBook>;
}

#[derive(Clone)]
pub struct GoogleBooksClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    covers: Arc<dyn CoverLookup>,
}

impl GoogleBooksClient {
    pub fn new(
        client: Client,
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
        covers: Arc<dyn CoverLookup>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
            covers,
        }
    }

    pub fn from_config(config: &Config, client: Client, covers: Arc<dyn CoverLookup>) -> Self {
        Self::new(
            client,
            &config.google_books_base_url,
            config.google_books_api_key.clone(),
            config.http_timeout(),
            covers,
        )
    }

    /// Raw volumes for a query, ordered by relevance.
    pub async fn fetch_volumes(&self, query: &str, max_results: usize) -> Result<Vec<Volume>> {
        let url = format!("{}/volumes", self.base_url);
        let max_results = max_results.to_string();

        let mut params = vec![
            ("q", query),
            ("maxResults", max_results.as_str()),
            ("orderBy", "relevance"),
        ];
        if let Some(key) = &self.api_key {
            params.push(("key", key.as_str()));
        }

        debug!(
            "Querying Google Books for '{}' (authenticated: {})",
            query,
            self.api_key.is_some()
        );

        let response = self
            .client
            .get(&url)
            .query(&params)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::ExternalServiceError(format!(
                "Google Books API returned {}",
                response.status()
            )));
        }

        let body: VolumesResponse = response.json().await?;
        Ok(body.items.unwrap_or_default())
    }

    /// Rating of the best match for a title and author.
    pub async fn lookup_rating(&self, title: &str, author: &str) -> Result<Option<RatingInfo>> {
        let volumes = self
            .fetch_volumes(&format!("{} {}", title, author), 1)
            .await?;

        Ok(volumes.into_iter().next().map(|volume| RatingInfo {
            rating: volume.volume_info.average_rating.unwrap_or(0.0),
            review_count: volume.volume_info.ratings_count.unwrap_or(0),
        }))
    }

    async fn resolve_cover(&self, info: &VolumeInfo, title: &str, author: &str) -> String {
        if let Some(link) = info.image_links.as_ref().and_then(ImageLinks::best) {
            let normalized = normalize_image_url(link);
            debug!("Cover for \"{}\": {} -> {}", title, link, normalized);

            let validation = self.covers.validate(&normalized).await;
            if validation.is_valid {
                return validation.final_url;
            }
            debug!("API cover invalid for \"{}\", trying other sources", title);
        }

        if title == UNKNOWN_TITLE {
            return self.covers.placeholder().to_string();
        }
        self.covers.resolve_best_cover(title, author).await
    }
}

#[async_trait]
impl BookSearch for GoogleBooksClient {
    async fn search(&self, query: &str, max_results: usize) -> Vec<EnrichedBook> {
        let volumes = match self.fetch_volumes(query, max_results).await {
            Ok(volumes) => volumes,
            Err(e) => {
                warn!("Google Books search failed for '{}': {}", query, e);
                return Vec::new();
            }
        };

        info!("Google Books returned {} items for '{}'", volumes.len(), query);

        let mut books = Vec::with_capacity(volumes.len());
        for volume in volumes.iter().take(max_results) {
            let info = &volume.volume_info;
            let title = info.display_title();
            let author = info.primary_author();
            let cover = self.resolve_cover(info, &title, &author).await;
            books.push(info.to_book(cover));
        }
        books
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_low_value_params_and_upgrades_scheme() {
        let url = "http://books.google.com/books/content?id=B1hSG45JCX4C\
                   &printsec=frontcover&img=1&zoom=1&edge=curl&source=gbs_api";
        assert_eq!(
            normalize_image_url(url),
            "https://books.google.com/books/content?id=B1hSG45JCX4C"
        );
    }

    #[test]
    fn drops_placeholder_values_and_collapses_separators() {
        let url =
            "https://books.google.com/books/content?id=abc&&lang=undefined&fife=null&dq=&sig=x&";
        assert_eq!(
            normalize_image_url(url),
            "https://books.google.com/books/content?id=abc&sig=x"
        );
    }

    #[test]
    fn removes_question_mark_when_nothing_is_left() {
        assert_eq!(
            normalize_image_url("http://img.test/c.jpg?zoom=1&edge=curl"),
            "https://img.test/c.jpg"
        );
        assert_eq!(
            normalize_image_url("https://img.test/c.jpg"),
            "https://img.test/c.jpg"
        );
    }

    #[test]
    fn prefers_thumbnail_then_alternates() {
        let links = ImageLinks {
            small_thumbnail: Some("small-thumb".into()),
            large: Some("large".into()),
            ..Default::default()
        };
        assert_eq!(links.best(), Some("small-thumb"));

        let links = ImageLinks {
            thumbnail: Some("  ".into()),
            medium: Some("medium".into()),
            small: Some("small".into()),
            ..Default::default()
        };
        assert_eq!(links.best(), Some("medium"));

        assert_eq!(ImageLinks::default().best(), None);
    }

    #[test]
    fn maps_volume_to_book() {
        let volume: Volume = serde_json::from_value(serde_json::json!({
            "volumeInfo": {
                "title": "Dune",
                "authors": ["Frank Herbert", "Someone Else"],
                "categories": ["Fiction", "Science Fiction", "Classics"],
                "averageRating": 4.5,
                "ratingsCount": 1200,
                "pageCount": 412,
                "publisher": "Ace",
                "publishedDate": "1990-09-01"
            }
        }))
        .unwrap();

        let book = volume.volume_info.to_book("/placeholder.svg".into());

        assert_eq!(book.title, "Dune");
        assert_eq!(book.author, "Frank Herbert");
        assert_eq!(
            book.genres,
            Some(vec!["Fiction".to_string(), "Science Fiction".to_string()])
        );
        assert_eq!(book.rating, Some(4.5));
        assert_eq!(book.review_count, Some(1200));
        assert_eq!(
            book.external_url,
            "https://www.goodreads.com/search?q=Dune%20Frank%20Herbert"
        );
    }

    #[test]
    fn missing_title_and_author_get_defaults() {
        let response: VolumesResponse =
            serde_json::from_str(r#"{"items":[{"volumeInfo":{}}, {}]}"#).unwrap();
        let items = response.items.unwrap();

        assert_eq!(items[0].volume_info.display_title(), UNKNOWN_TITLE);
        assert_eq!(items[1].volume_info.primary_author(), UNKNOWN_AUTHOR);
    }

    #[test]
    fn response_without_items_is_empty() {
        let response: VolumesResponse =
            serde_json::from_str(r#"{"kind":"books#volumes","totalItems":0}"#).unwrap();
        assert!(response.items.unwrap_or_default().is_empty());
    }

    mod search {
        use super::*;
        use crate::services::covers::Validation;
        use actix_web::{web, App, HttpResponse, HttpServer};
        use serde_json::{json, Value};
        use std::collections::HashMap;
        use std::net::TcpListener;
        use std::sync::Mutex;

        /// Accepts a fixed set of URLs, each mapped to the URL it resolves to.
        #[derive(Default)]
        struct ScriptedCovers {
            accepted: HashMap<String, String>,
            validated: Mutex<Vec<String>>,
            cascades: Mutex<Vec<String>>,
        }

        impl ScriptedCovers {
            fn accepting(pairs: &[(&str, &str)]) -> Arc<Self> {
                Arc::new(Self {
                    accepted: pairs
                        .iter()
                        .map(|(url, final_url)| (url.to_string(), final_url.to_string()))
                        .collect(),
                    ..Default::default()
                })
            }

            fn validated(&self) -> Vec<String> {
                self.validated.lock().unwrap().clone()
            }

            fn cascades(&self) -> Vec<String> {
                self.cascades.lock().unwrap().clone()
            }
        }

        #[async_trait]
        impl CoverLookup for ScriptedCovers {
            async fn validate(&self, url: &str) -> Validation {
                self.validated.lock().unwrap().push(url.to_string());
                match self.accepted.get(url) {
                    Some(final_url) => Validation {
                        is_valid: true,
                        final_url: final_url.clone(),
                    },
                    None => Validation {
                        is_valid: false,
                        final_url: url.to_string(),
                    },
                }
            }

            async fn resolve_best_cover(&self, title: &str, _author: &str) -> String {
                self.cascades.lock().unwrap().push(title.to_string());
                format!("https://archive.test/{}.jpg", title)
            }

            fn placeholder(&self) -> &str {
                "/placeholder.svg"
            }
        }

        /// Serves `body` for every volumes query on an ephemeral port.
        fn volumes_api(body: Value) -> String {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let base = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());

            let server = HttpServer::new(move || {
                let body = body.clone();
                App::new().route(
                    "/books/v1/volumes",
                    web::get().to(move || {
                        let body = body.clone();
                        async move { HttpResponse::Ok().json(body) }
                    }),
                )
            })
            .workers(1)
            .listen(listener)
            .unwrap()
            .run();
            actix_web::rt::spawn(server);

            format!("{}/books/v1", base)
        }

        fn client(base_url: &str, covers: Arc<ScriptedCovers>) -> GoogleBooksClient {
            GoogleBooksClient::new(
                Client::new(),
                base_url,
                None,
                Duration::from_secs(3),
                covers,
            )
        }

        fn dune_with_thumbnail(thumbnail: &str) -> Value {
            json!({"items": [{"volumeInfo": {
                "title": "Dune",
                "authors": ["Frank Herbert"],
                "imageLinks": {"thumbnail": thumbnail}
            }}]})
        }

        #[actix_web::test]
        async fn validated_api_image_is_kept() {
            let normalized = "https://books.test/content?id=dune";
            let covers = ScriptedCovers::accepting(&[(normalized, normalized)]);
            let base = volumes_api(dune_with_thumbnail(
                "http://books.test/content?id=dune&zoom=1&edge=curl",
            ));

            let books = client(&base, covers.clone()).search("dune", 6).await;

            assert_eq!(books.len(), 1);
            assert_eq!(books[0].cover, normalized);
            assert_eq!(covers.validated(), vec![normalized]);
            assert!(covers.cascades().is_empty());
        }

        #[actix_web::test]
        async fn relayed_api_image_uses_relay_url() {
            let normalized = "https://books.test/content?id=dune";
            let relayed = "https://relay.test/?https%3A%2F%2Fbooks.test%2Fcontent%3Fid%3Ddune";
            let covers = ScriptedCovers::accepting(&[(normalized, relayed)]);
            let base = volumes_api(dune_with_thumbnail("http://books.test/content?id=dune&img=1"));

            let books = client(&base, covers.clone()).search("dune", 6).await;

            assert_eq!(books[0].cover, relayed);
            assert!(covers.cascades().is_empty());
        }

        #[actix_web::test]
        async fn rejected_api_image_falls_back_to_cover_search() {
            let covers = ScriptedCovers::accepting(&[]);
            let base = volumes_api(dune_with_thumbnail("https://books.test/broken.jpg"));

            let books = client(&base, covers.clone()).search("dune", 6).await;

            assert_eq!(books[0].cover, "https://archive.test/Dune.jpg");
            assert_eq!(covers.validated(), vec!["https://books.test/broken.jpg"]);
            assert_eq!(covers.cascades(), vec!["Dune"]);
        }

        #[actix_web::test]
        async fn untitled_volume_gets_placeholder_without_cover_search() {
            let covers = ScriptedCovers::accepting(&[]);
            let base = volumes_api(json!({"items": [
                {"volumeInfo": {"authors": ["Anonymous"]}},
                {"volumeInfo": {"imageLinks": {"thumbnail": "https://books.test/none.jpg"}}}
            ]}));

            let books = client(&base, covers.clone()).search("anonymous", 6).await;

            assert_eq!(books.len(), 2);
            assert!(books.iter().all(|b| b.title == UNKNOWN_TITLE));
            assert!(books.iter().all(|b| b.cover == "/placeholder.svg"));
            assert_eq!(books[1].author, UNKNOWN_AUTHOR);
            assert!(covers.cascades().is_empty());
        }

        #[actix_web::test]
        async fn covers_are_resolved_only_for_kept_volumes() {
            let items: Vec<Value> = (1..=6)
                .map(|i| json!({"volumeInfo": {"title": format!("Dune {}", i)}}))
                .collect();
            let covers = ScriptedCovers::accepting(&[]);
            let base = volumes_api(json!({ "items": items }));

            let books = client(&base, covers.clone()).search("dune", 1).await;

            assert_eq!(books.len(), 1);
            assert_eq!(covers.cascades(), vec!["Dune 1"]);
        }

        #[actix_web::test]
        async fn unreachable_api_yields_no_books() {
            let covers = ScriptedCovers::accepting(&[]);
            let books = client("http://127.0.0.1:9/books/v1", covers).search("dune", 6).await;
            assert!(books.is_empty());
        }
    }
}
