use reqwest;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

// Shared HTTP connection pool. Timeouts are applied per request.
lazy_static::lazy_static! {
    static ref CLIENT: reqwest::Client = reqwest::Client::new();
}

/// Custom error type for HTTP requests.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Request to {0} timed out after {1:?}")]
    Timeout(reqwest::Url, Duration),
    #[error("HTTP error: {0} returned status {1}. Response body: {2}")]
    HttpError(reqwest::Url, u16, String),
    #[error("Error deserializing JSON: {0}")]
    JsonError(String),
    #[error("Malformed payload: {0}")]
    Malformed(String),
    #[error("No data: {0}")]
    NoData(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Other error: {0}")]
    Other(String),
}

/// Makes a GET request to `path` with query parameters and decodes the JSON body.
pub async fn request<T: DeserializeOwned>(
    path: &str,                   // Absolute URL of the endpoint.
    params: &[(&str, String)],    // Query parameters.
    timeout: Duration,            // Upper bound for the whole exchange.
) -> Result<T, RequestError> {
    // Construct the URL.
    let url = if !params.is_empty() {
        reqwest::Url::parse_with_params(path, params)
            .map_err(|e| RequestError::Other(e.to_string()))?
    } else {
        reqwest::Url::parse(path).map_err(|e| RequestError::Other(e.to_string()))?
    };

    log::debug!("GET {}", url);

    let response = CLIENT
        .get(url.as_str())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                RequestError::Timeout(url.clone(), timeout)
            } else {
                RequestError::Other(e.to_string())
            }
        })?;

    // Get the response status code.
    let status = response.status();

    // Handle non-success status codes.
    if !status.is_success() {
        let body = response
            .text()
            .await
            .map_err(|e| RequestError::Other(e.to_string()))?;
        return Err(RequestError::HttpError(url, status.as_u16(), body));
    }

    // Deserialize the JSON response.
    response
        .json()
        .await
        .map_err(|e| RequestError::JsonError(e.to_string()))
}
