//! Response helpers shared by the HTTP-backed capabilities.

use crate::error::CapabilityError;

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or a [`CapabilityError::Api`] containing the status
/// and body text on failure.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, CapabilityError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(CapabilityError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Parse a successful JSON response body into the expected type.
///
/// A body that does not match `T` is reported as malformed output rather
/// than as a transport failure, so it is never retried.
pub(crate) async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, CapabilityError> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| CapabilityError::Malformed(e.to_string()))
}
