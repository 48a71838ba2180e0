use crate::error::TryOnError;
use std::fmt;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const UPSTREAM_URL_ENV: &str = "TRYON_UPSTREAM_URL";
pub const PROXY_URL_ENV: &str = "TRYON_PROXY_URL";

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.openai.com";
pub const DEFAULT_PROXY_URL: &str = "http://localhost:3000";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

/// Request bodies carry two base64 images of up to 10 MB each.
pub const DEFAULT_BODY_LIMIT: usize = 32 * 1024 * 1024;

/// Bearer token for the upstream service. Only the proxy ever holds one.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Settings of the credential-holding proxy.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    pub upstream_url: String,
    pub api_key: ApiKey,
    /// Models the proxy is willing to forward requests for.
    pub allowed_models: Vec<String>,
    pub body_limit: usize,
}

impl ProxyConfig {
    pub fn new(upstream_url: impl Into<String>, api_key: ApiKey) -> Self {
        Self {
            upstream_url: upstream_url.into(),
            api_key,
            allowed_models: vec![DEFAULT_CHAT_MODEL.to_string(), DEFAULT_IMAGE_MODEL.to_string()],
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Reads the key from `OPENAI_API_KEY` and the upstream from `TRYON_UPSTREAM_URL`.
    pub fn from_env() -> Result<Self, TryOnError> {
        let api_key = non_empty_env(API_KEY_ENV).ok_or(TryOnError::MissingCredential(API_KEY_ENV))?;
        let upstream_url =
            non_empty_env(UPSTREAM_URL_ENV).unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        Ok(Self::new(upstream_url, ApiKey::new(api_key)))
    }
}

/// Settings of the client side. Carries no credential: requests go to the proxy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub proxy_url: String,
    pub chat_model: String,
    pub image_model: String,
    pub max_tokens: u32,
    pub image_size: String,
    pub image_quality: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            max_tokens: 1000,
            image_size: "1024x1024".to_string(),
            image_quality: "hd".to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults, with the proxy address taken from `TRYON_PROXY_URL` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(proxy_url) = non_empty_env(PROXY_URL_ENV) {
            config.proxy_url = proxy_url;
        }
        config
    }

    pub fn with_proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = proxy_url.into();
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.proxy_url.trim_end_matches('/'), path)
    }
}
