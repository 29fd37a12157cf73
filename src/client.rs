use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::backend::Backend;
use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{AnalyzeRequest, AnalyzeResponse, BackendReply, ChatRequest, ChatResponse};

/// Environment variable consulted for the backend base URL.
pub const API_URL_ENV: &str = "MEDICARE_API_URL";

/// Base URL used when neither an explicit URL nor the environment provides one.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Language assumed by `analyze-ml` when none is given.
pub const DEFAULT_LANG: &str = "en";

/// Which backend endpoint a [`MedicareClient`] sends user messages to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST chat-combined`: conversational answer plus optional symptom result.
    #[default]
    ChatCombined,

    /// `POST analyze-ml?lang=<code>`: keyword diagnosis with translation.
    AnalyzeMl {
        /// Language code of the user's text, e.g. `en` or `es`.
        lang: String,
    },
}

impl Endpoint {
    /// The multilingual analysis endpoint for the given language.
    pub fn analyze(lang: impl Into<String>) -> Self {
        Endpoint::AnalyzeMl { lang: lang.into() }
    }

    /// The path of this endpoint relative to the base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::ChatCombined => "chat-combined",
            Endpoint::AnalyzeMl { .. } => "analyze-ml",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::ChatCombined => write!(f, "chat-combined"),
            Endpoint::AnalyzeMl { lang } => write!(f, "analyze-ml (lang={lang})"),
        }
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "chat" | "chat-combined" => Ok(Endpoint::ChatCombined),
            "analyze" | "analyze-ml" => Ok(Endpoint::analyze(DEFAULT_LANG)),
            _ => Err(Error::validation(
                format!("unknown endpoint {s:?}; expected 'chat' or 'analyze'"),
                Some("endpoint".to_string()),
            )),
        }
    }
}

/// Client for the Medicare AI backend.
#[derive(Clone)]
pub struct MedicareClient {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    endpoint: Endpoint,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl fmt::Debug for MedicareClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MedicareClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("endpoint", &self.endpoint)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl MedicareClient {
    /// Create a new Medicare client.
    ///
    /// The base URL can be provided directly or read from the
    /// `MEDICARE_API_URL` environment variable, falling back to
    /// `http://localhost:8080/api/`.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        base_url: Option<String>,
        timeout: Option<Duration>,
        endpoint: Option<Endpoint>,
    ) -> Result<Self> {
        let base_url = resolve_base_url(base_url, env::var(API_URL_ENV).ok())?;
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
            endpoint: endpoint.unwrap_or_default(),
            logger: None,
        })
    }

    /// Attach a logger that observes every request, response and failure.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Change the endpoint used by [`Backend::send`].
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Switch the endpoint in place.
    pub fn set_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoint = endpoint;
    }

    /// The resolved base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The per-request timeout applied by the HTTP client.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The endpoint used by [`Backend::send`].
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The full URL for an endpoint, including the `lang` query for `analyze-ml`.
    pub fn endpoint_url(&self, endpoint: &Endpoint) -> Result<Url> {
        let mut url = self.base_url.join(endpoint.path())?;
        if let Endpoint::AnalyzeMl { lang } = endpoint {
            url.query_pairs_mut().append_pair("lang", lang);
        }
        Ok(url)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.trim().parse::<u64>().ok());

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string()
        } else {
            body
        };

        match status_code {
            429 => Error::rate_limit(message, retry_after),
            500 => Error::internal_server(message),
            501..=599 => Error::service_unavailable(status_code, message, retry_after),
            _ => Error::api(status_code, message),
        }
    }

    fn map_transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// POST a JSON body and parse a JSON reply.
    async fn post_json<T, R>(&self, url: Url, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        CLIENT_REQUESTS.click();
        let started = Instant::now();
        let result = self.post_json_inner(&url, body).await;
        CLIENT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());
        if let Err(err) = &result {
            CLIENT_REQUEST_ERRORS.click();
            if let Some(logger) = &self.logger {
                logger.log_error(url.as_str(), err);
            }
        }
        result
    }

    async fn post_json_inner<T, R>(&self, url: &Url, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        if let Some(logger) = &self.logger {
            logger.log_request(url.as_str(), &serde_json::to_value(body)?);
        }

        let response = self
            .client
            .post(url.clone())
            .headers(self.default_headers())
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        if let Some(logger) = &self.logger {
            logger.log_response(url.as_str(), status, &text);
        }

        serde_json::from_str::<R>(&text).map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    /// Send a message to the `chat-combined` endpoint.
    pub async fn chat_combined(&self, message: &str) -> Result<ChatResponse> {
        let url = self.endpoint_url(&Endpoint::ChatCombined)?;
        self.post_json(url, &ChatRequest::new(message)).await
    }

    /// Send symptom text to the multilingual `analyze-ml` endpoint.
    pub async fn analyze_ml(&self, text: &str, lang: &str) -> Result<AnalyzeResponse> {
        let url = self.endpoint_url(&Endpoint::analyze(lang))?;
        self.post_json(url, &AnalyzeRequest::new(text)).await
    }
}

#[async_trait::async_trait]
impl Backend for MedicareClient {
    async fn send(&self, text: &str) -> Result<BackendReply> {
        match &self.endpoint {
            Endpoint::ChatCombined => self.chat_combined(text).await.map(BackendReply::from),
            Endpoint::AnalyzeMl { lang } => {
                self.analyze_ml(text, lang).await.map(BackendReply::from)
            }
        }
    }
}

/// Pick the base URL: explicit value, then environment, then the default.
///
/// The result always ends in `/` so endpoint paths join beneath it.
pub(crate) fn resolve_base_url(explicit: Option<String>, from_env: Option<String>) -> Result<Url> {
    let mut raw = explicit
        .or(from_env)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Ok(Url::parse(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = MedicareClient::new(Some("http://backend.test/api".to_string())).unwrap();
        assert_eq!(client.base_url().as_str(), "http://backend.test/api/");
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(client.endpoint(), &Endpoint::ChatCombined);

        let client = MedicareClient::with_options(
            Some("https://medicare.example.com/api/".to_string()),
            Some(Duration::from_secs(5)),
            Some(Endpoint::analyze("es")),
        )
        .unwrap();
        assert_eq!(client.base_url().as_str(), "https://medicare.example.com/api/");
        assert_eq!(client.timeout(), Duration::from_secs(5));
        assert_eq!(client.endpoint(), &Endpoint::analyze("es"));
    }

    #[test]
    fn base_url_precedence() {
        let url = resolve_base_url(
            Some("http://explicit/api".to_string()),
            Some("http://env/api".to_string()),
        )
        .unwrap();
        assert_eq!(url.as_str(), "http://explicit/api/");

        let url = resolve_base_url(None, Some("http://env/api/".to_string())).unwrap();
        assert_eq!(url.as_str(), "http://env/api/");

        let url = resolve_base_url(None, None).unwrap();
        assert_eq!(url.as_str(), DEFAULT_API_URL);

        let url = resolve_base_url(None, Some("   ".to_string())).unwrap();
        assert_eq!(url.as_str(), DEFAULT_API_URL);
    }

    #[test]
    fn invalid_base_url() {
        let err = resolve_base_url(Some("not a url".to_string()), None).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn endpoint_urls() {
        let client = MedicareClient::new(Some("http://backend.test/api/".to_string())).unwrap();
        assert_eq!(
            client.endpoint_url(&Endpoint::ChatCombined).unwrap().as_str(),
            "http://backend.test/api/chat-combined"
        );
        assert_eq!(
            client.endpoint_url(&Endpoint::analyze("fr")).unwrap().as_str(),
            "http://backend.test/api/analyze-ml?lang=fr"
        );
    }

    #[test]
    fn endpoint_parse() {
        assert_eq!("chat".parse::<Endpoint>().unwrap(), Endpoint::ChatCombined);
        assert_eq!(
            "analyze-ml".parse::<Endpoint>().unwrap(),
            Endpoint::analyze("en")
        );
        assert!("symptoms".parse::<Endpoint>().is_err());
    }
}
