//! Azure AI Content Safety image client.
//!
//! [`ContentSafetyClient`] implements [`SafetyClassifier`] against the
//! `contentsafety/image:analyze` REST endpoint: the JPEG is sent base64
//! encoded in a JSON body and the service answers with a severity for each
//! category.
//!
//! HTTP outcomes map onto [`ClassifierError`] so the batch executor can tell
//! what is worth retrying: timeouts, connection failures, 429 and 5xx are
//! transient; 401/403 and other 4xx are permanent.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    category::Category,
    classifier::{Classification, SafetyClassifier},
    config::ServiceCredentials,
    error::{ClassifierError, ScreeningError},
};

/// REST API version the client speaks.
pub const API_VERSION: &str = "2023-10-01";

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct AnalyzeImageRequest {
    image: ImageData,
}

#[derive(Debug, Serialize)]
struct ImageData {
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeImageResponse {
    #[serde(default)]
    categories_analysis: Vec<CategoryAnalysis>,
}

#[derive(Debug, Deserialize)]
struct CategoryAnalysis {
    category: String,
    #[serde(default)]
    severity: Option<u32>,
}

/// Async client for the image analysis endpoint.
#[derive(Debug, Clone)]
pub struct ContentSafetyClient {
    http: Client,
    analyze_url: Url,
    api_key: String,
    timeout: Duration,
}

impl ContentSafetyClient {
    /// Create a client with a 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built or the endpoint cannot be
    /// extended with the API path.
    pub fn new(credentials: &ServiceCredentials) -> Result<Self, ScreeningError> {
        Self::with_timeout(credentials, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Same as [`new`](ContentSafetyClient::new).
    pub fn with_timeout(
        credentials: &ServiceCredentials,
        timeout: Duration,
    ) -> Result<Self, ScreeningError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ClassifierError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            analyze_url: analyze_url(&credentials.endpoint)?,
            api_key: credentials.api_key.clone(),
            timeout,
        })
    }

    /// The full URL requests are posted to.
    pub fn analyze_url(&self) -> &Url {
        &self.analyze_url
    }

    fn transport_error(&self, error: reqwest::Error) -> ClassifierError {
        if error.is_timeout() {
            ClassifierError::Timeout(self.timeout)
        } else if error.is_decode() {
            ClassifierError::InvalidResponse(error.to_string())
        } else {
            ClassifierError::Transport(error.to_string())
        }
    }
}

impl SafetyClassifier for ContentSafetyClient {
    async fn classify(&self, jpeg: &[u8]) -> Result<Classification, ClassifierError> {
        let request = AnalyzeImageRequest {
            image: ImageData {
                content: BASE64.encode(jpeg),
            },
        };

        let response = self
            .http
            .post(self.analyze_url.clone())
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| self.transport_error(error))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| self.transport_error(error))?;

        if !status.is_success() {
            return Err(status_error(status, body));
        }

        parse_response(&body)
    }
}

/// `{endpoint}/contentsafety/image:analyze?api-version=…`
fn analyze_url(endpoint: &Url) -> Result<Url, ScreeningError> {
    let base = endpoint.as_str().trim_end_matches('/');
    Url::parse(&format!(
        "{base}/contentsafety/image:analyze?api-version={API_VERSION}"
    ))
    .map_err(|error| ScreeningError::InvalidConfiguration {
        name: crate::config::ENDPOINT_VARIABLE,
        reason: error.to_string(),
    })
}

/// Map a non-success status to a classifier error.
pub(crate) fn status_error(status: StatusCode, body: String) -> ClassifierError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ClassifierError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClassifierError::Unauthorized,
        status if status.is_server_error() => ClassifierError::Server {
            status: status.as_u16(),
            body,
        },
        status => ClassifierError::Rejected {
            status: status.as_u16(),
            body,
        },
    }
}

/// Parse an analysis body. Categories the crate does not know are ignored.
pub(crate) fn parse_response(body: &str) -> Result<Classification, ClassifierError> {
    let response: AnalyzeImageResponse = serde_json::from_str(body)
        .map_err(|error| ClassifierError::InvalidResponse(error.to_string()))?;

    Ok(response
        .categories_analysis
        .into_iter()
        .filter_map(|analysis| match analysis.category.parse::<Category>() {
            Ok(category) => Some((category, analysis.severity.unwrap_or(0))),
            Err(_) => {
                log::debug!("Ignoring unknown category {:?}", analysis.category);
                None
            }
        })
        .collect())
}
