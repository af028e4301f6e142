use log::{debug, error, info, warn};
use reqwest::{Method, Response, Url};
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;

use crate::error::{ApiError, ApiResult};

const MAX_ERROR_BODY_CHARS: usize = 300;

/// Executes an HTTP request with common configurations and error handling.
/// Retries, when wanted, are applied by the middleware of `client`.
pub async fn execute_request<T: Serialize + ?Sized>(
    client: &ClientWithMiddleware,
    method: Method,
    url: Url,
    auth_token: Option<&str>,
    json_body: Option<&T>,
) -> ApiResult<Response> {
    let mut request_builder = client.request(method.clone(), url.clone());

    if let Some(token) = auth_token {
        request_builder = request_builder.header("Authorization", format!("Bearer {}", token));
    }

    if let Some(body) = json_body {
        request_builder = request_builder
            .header("Content-Type", "application/json")
            .json(body);
    }

    info!("Sending {} request to {}", method.as_str(), url);
    let start_time = std::time::Instant::now();

    match request_builder.send().await {
        Ok(resp) => {
            info!(
                "Got response from {} after {:?} with status {}",
                url,
                start_time.elapsed(),
                resp.status()
            );
            Ok(resp)
        }
        Err(e) => {
            let error_msg = format!("Failed HTTP request to {}: {}", url, e);
            error!("{}", error_msg);
            if let Some(source) = e.source() {
                error!("Error source: {:?}", source);
            }
            if let reqwest_middleware::Error::Reqwest(inner) = &e {
                if inner.is_timeout() {
                    error!("Request timed out");
                }
                if inner.is_connect() {
                    error!("Connection error");
                }
            }
            Err(ApiError::Transport(error_msg))
        }
    }
}

/// Reads a response body as JSON. Non-2xx statuses and undecodable bodies
/// become typed errors.
pub async fn read_json(response: Response) -> ApiResult<Value> {
    let status = response.status();
    let url = response.url().clone();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Transport(format!("Failed to read body from {}: {}", url, e)))?;

    if !status.is_success() {
        warn!("{} answered {}", url, status);
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: truncate(&body),
        });
    }

    debug!("Response body from {}: {}", url, truncate(&body));
    serde_json::from_str(&body).map_err(|e| {
        ApiError::UnexpectedResponse(format!("{} returned invalid JSON: {}", url, e))
    })
}

/// Decodes a JSON value into `T`, reporting missing fields as an unexpected
/// response.
pub fn decode<T: DeserializeOwned>(value: Value, what: &str) -> ApiResult<T> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::UnexpectedResponse(format!("malformed {}: {}", what, e)))
}

/// Extracts a list either sent bare or wrapped in an object under one of
/// `keys`.
pub fn extract_list<T: DeserializeOwned>(value: Value, keys: &[&str]) -> ApiResult<Vec<T>> {
    let list = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => keys
            .iter()
            .find_map(|key| map.remove(*key))
            .ok_or_else(|| {
                ApiError::UnexpectedResponse(format!("expected one of {:?} in response", keys))
            })?,
        other => {
            return Err(ApiError::UnexpectedResponse(format!(
                "expected a list, got {}",
                other
            )))
        }
    };
    decode(list, keys.first().copied().unwrap_or("list"))
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        cut.push('…');
        cut
    }
}
