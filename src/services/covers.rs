//! Cover image resolution.
//!
//! A cover URL is only accepted after a metadata-only request confirms that it
//! serves an image. When a host refuses direct access the same URL is retried
//! through an ordered list of public relay proxies. Whole-book lookups walk a
//! list of cover archives and fall back to a placeholder path.

use crate::config::Config;
use crate::error::{ApiError, Attempt};
use crate::services::fallback::{first_found, FallbackSource};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Checks whether a URL currently serves an image.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    /// `Found` when the response succeeds with an `image/*` content type,
    /// `Empty` when it succeeds with anything else, `Failed` otherwise.
    async fn probe(&self, url: &str) -> Attempt<()>;
}

/// Probe backed by an HTTP `HEAD` request.
#[derive(Debug, Clone)]
pub struct HttpImageProbe {
    client: Client,
    timeout: Duration,
}

impl HttpImageProbe {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl ImageProbe for HttpImageProbe {
    async fn probe(&self, url: &str) -> Attempt<()> {
        let response = match self.client.head(url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Failed(e.into()),
        };

        if !response.status().is_success() {
            return Attempt::Failed(ApiError::ExternalServiceError(format!(
                "Cover probe returned {}",
                response.status()
            )));
        }

        let is_image = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"));

        if is_image {
            Attempt::Found(())
        } else {
            Attempt::Empty
        }
    }
}

/// Result of validating a single cover URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub is_valid: bool,
    /// The accepted form of the URL: original or relayed. Equals the input
    /// when nothing validated.
    pub final_url: String,
}

/// Direct-then-relay validation of a cover URL.
pub struct CoverValidator {
    probe: Arc<dyn ImageProbe>,
    proxies: Vec<String>,
}

impl CoverValidator {
    pub fn new(probe: Arc<dyn ImageProbe>, proxies: Vec<String>) -> Self {
        Self { probe, proxies }
    }

    pub async fn validate(&self, url: &str) -> Validation {
        match self.probe.probe(url).await {
            Attempt::Found(()) => {
                return Validation {
                    is_valid: true,
                    final_url: url.to_string(),
                }
            }
            Attempt::Empty => debug!("Not an image: {}", url),
            Attempt::Failed(e) => debug!("Direct cover probe failed for {}: {}", url, e),
        }

        if let Some(proxied) = self.proxied_url(url).await {
            return Validation {
                is_valid: true,
                final_url: proxied,
            };
        }

        Validation {
            is_valid: false,
            final_url: url.to_string(),
        }
    }

    async fn proxied_url(&self, url: &str) -> Option<String> {
        for proxy in &self.proxies {
            let proxied = relay_url(proxy, url);
            match self.probe.probe(&proxied).await {
                Attempt::Found(()) => {
                    debug!("Cover relayed through {}", proxy);
                    return Some(proxied);
                }
                Attempt::Empty => debug!("Relay {} did not return an image for {}", proxy, url),
                Attempt::Failed(e) => debug!("Relay {} failed for {}: {}", proxy, url, e),
            }
        }
        None
    }
}

/// Relay base followed by the percent-encoded target.
pub fn relay_url(proxy: &str, target: &str) -> String {
    format!("{}{}", proxy, urlencoding::encode(target))
}

/// A cover archive described by URL templates.
///
/// Templates may use `{title}`, `{author}` and `{title_author}` placeholders,
/// which are filled in percent-encoded. Templates are tried in order.
pub struct TemplateCoverSource {
    name: String,
    templates: Vec<String>,
    validator: Arc<CoverValidator>,
}

impl TemplateCoverSource {
    pub fn new(
        name: impl Into<String>,
        templates: Vec<String>,
        validator: Arc<CoverValidator>,
    ) -> Self {
        Self {
            name: name.into(),
            templates,
            validator,
        }
    }

    pub fn candidate_urls(&self, title: &str, author: &str) -> Vec<String> {
        let title_author = format!("{} {}", title, author);
        self.templates
            .iter()
            .map(|template| {
                template
                    .replace("{title_author}", &urlencoding::encode(&title_author))
                    .replace("{title}", &urlencoding::encode(title))
                    .replace("{author}", &urlencoding::encode(author))
            })
            .collect()
    }
}

#[async_trait]
impl FallbackSource<String> for TemplateCoverSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, title: &str, author: &str) -> Attempt<String> {
        for url in self.candidate_urls(title, author) {
            let validation = self.validator.validate(&url).await;
            if validation.is_valid {
                return Attempt::Found(validation.final_url);
            }
        }
        Attempt::Empty
    }
}

/// The default archives, most reliable first.
pub fn default_cover_sources(
    validator: &Arc<CoverValidator>,
) -> Vec<Box<dyn FallbackSource<String>>> {
    vec![
        Box::new(TemplateCoverSource::new(
            "openlibrary",
            vec![
                "https://covers.openlibrary.org/b/title/{title}-M.jpg".to_string(),
                "https://covers.openlibrary.org/b/author/{author}-M.jpg".to_string(),
            ],
            validator.clone(),
        )),
        Box::new(TemplateCoverSource::new(
            "internet-archive",
            vec!["https://archive.org/services/img/{title_author}".to_string()],
            validator.clone(),
        )),
        Box::new(TemplateCoverSource::new(
            "worldcat",
            vec!["https://www.worldcat.org/title/{title}/oclc/cover".to_string()],
            validator.clone(),
        )),
        Box::new(TemplateCoverSource::new(
            "goodreads",
            vec!["https://images.gr-assets.com/books/{title}.jpg".to_string()],
            validator.clone(),
        )),
    ]
}

/// Finds a displayable cover for a title and author.
#[async_trait]
pub trait CoverLookup: Send + Sync {
    /// Validate a single candidate URL, directly and then through relays.
    async fn validate(&self, url: &str) -> Validation;

    /// Walk every cover source; never returns an empty string.
    async fn resolve_best_cover(&self, title: &str, author: &str) -> String;

    /// Path used when nothing else resolves.
    fn placeholder(&self) -> &str;
}

pub struct CoverResolver {
    validator: Arc<CoverValidator>,
    sources: Vec<Box<dyn FallbackSource<String>>>,
    placeholder: String,
}

impl CoverResolver {
    pub fn new(
        validator: Arc<CoverValidator>,
        sources: Vec<Box<dyn FallbackSource<String>>>,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            validator,
            sources,
            placeholder: placeholder.into(),
        }
    }

    /// Resolver over the default archives using HTTP probes.
    pub fn from_config(config: &Config, client: Client) -> Self {
        let probe = Arc::new(HttpImageProbe::new(client, config.image_probe_timeout()));
        let validator = Arc::new(CoverValidator::new(probe, config.cors_proxies.clone()));
        let sources = default_cover_sources(&validator);
        Self::new(validator, sources, config.placeholder_cover.clone())
    }
}

#[async_trait]
impl CoverLookup for CoverResolver {
    async fn validate(&self, url: &str) -> Validation {
        self.validator.validate(url).await
    }

    async fn resolve_best_cover(&self, title: &str, author: &str) -> String {
        debug!("Searching for cover: \"{}\" by {}", title, author);

        match first_found(&self.sources, title, author).await {
            Some(url) if !url.is_empty() => {
                info!("Found cover for \"{}\": {}", title, url);
                url
            }
            _ => {
                info!("No cover found for \"{}\", using placeholder", title);
                self.placeholder.clone()
            }
        }
    }

    fn placeholder(&self) -> &str {
        &self.placeholder
    }
}
