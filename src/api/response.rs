use crate::error::ChatError;
use serde_json::Value;

/// Pull a readable message out of an error response body.
///
/// The service answers failures with `{"error": "..."}`; anything else is returned as-is.
pub fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Turn a non-success response into an [`ChatError::ApiError`].
pub async fn api_error(response: reqwest::Response) -> ChatError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ChatError::ApiError {
        status,
        message: extract_error_message(&body),
    }
}
