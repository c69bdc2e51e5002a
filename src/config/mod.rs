use crate::error::Result;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_PLACEHOLDER_COVER: &str = "/placeholder.svg";

/// Public relays used when a cover host refuses direct access.
pub const DEFAULT_CORS_PROXIES: [&str; 4] = [
    "https://cors-anywhere.herokuapp.com/",
    "https://api.allorigins.win/raw?url=",
    "https://corsproxy.io/?",
    "https://thingproxy.freeboard.io/fetch/",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,

    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_temperature: f32,
    pub openai_max_tokens: u32,
    pub completion_timeout_secs: u64,

    pub google_books_api_key: Option<String>,
    pub google_books_base_url: String,
    pub max_results: usize,

    pub http_timeout_secs: u64,
    pub image_probe_timeout_secs: u64,
    pub connect_timeout_secs: u64,

    pub placeholder_cover: String,
    pub cors_proxies: Vec<String>,
}

impl Config {
    /// Load configuration from defaults, an optional `config/app` file and
    /// `APP_`-prefixed environment variables, in increasing priority.
    pub fn load() -> Result<Self> {
        let proxies: Vec<String> = DEFAULT_CORS_PROXIES.iter().map(|p| p.to_string()).collect();

        let settings = config::Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("openai_api_key", "")?
            .set_default("openai_base_url", "https://api.openai.com/v1")?
            .set_default("openai_model", "gpt-3.5-turbo")?
            .set_default("openai_temperature", 0.7)?
            .set_default("openai_max_tokens", 1500)?
            .set_default("completion_timeout_secs", 30)?
            .set_default("google_books_base_url", "https://www.googleapis.com/books/v1")?
            .set_default("max_results", 6)?
            .set_default("http_timeout_secs", 10)?
            .set_default("image_probe_timeout_secs", 5)?
            .set_default("connect_timeout_secs", 5)?
            .set_default("placeholder_cover", DEFAULT_PLACEHOLDER_COVER)?
            .set_default("cors_proxies", proxies)?
            .add_source(config::File::with_name("config/app").required(false))
            .add_source(config::Environment::with_prefix("APP"))
            .build()?;

        let mut config: Config = settings.try_deserialize()?;

        // An empty key in the environment means "unauthenticated".
        config.google_books_api_key = config
            .google_books_api_key
            .filter(|key| !key.trim().is_empty());

        Ok(config)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn image_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.image_probe_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            openai_temperature: 0.7,
            openai_max_tokens: 1500,
            completion_timeout_secs: 30,
            google_books_api_key: None,
            google_books_base_url: "https://www.googleapis.com/books/v1".to_string(),
            max_results: 6,
            http_timeout_secs: 10,
            image_probe_timeout_secs: 5,
            connect_timeout_secs: 5,
            placeholder_cover: DEFAULT_PLACEHOLDER_COVER.to_string(),
            cors_proxies: DEFAULT_CORS_PROXIES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_limits() {
        let config = Config::default();
        assert_eq!(config.max_results, 6);
        assert_eq!(config.placeholder_cover, "/placeholder.svg");
        assert_eq!(config.cors_proxies.len(), 4);
        assert!((config.openai_temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn load_without_environment_uses_defaults() {
        let config = Config::load().expect("defaults should deserialize");
        assert!(!config.openai_base_url.is_empty());
        assert!(config.image_probe_timeout_secs > 0);
    }
}
