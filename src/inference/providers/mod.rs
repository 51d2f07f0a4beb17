//! Provider-specific request builders and response normalizers.
//!
//! Each provider owns its wire types; the only thing they share is how a
//! JSON body is posted and how failures are classified.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::inference::TransportError;

/// Posts `body` as JSON and decodes the 2xx response into `R`.
///
/// `label` only feeds the log lines; it must never contain a secret.
pub(crate) async fn send_json<B, R>(
    request: reqwest::RequestBuilder,
    body: &B,
    label: &str,
) -> Result<R, TransportError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let json_body = serde_json::to_string(body)
        .map_err(|e| TransportError::Parse(format!("request serialization failed: {e}")))?;
    debug!("{label} request body: {} bytes", json_body.len());

    let response = request
        .header("Content-Type", "application/json")
        .body(json_body)
        .send()
        .await
        .map_err(network_error)?;

    let status = response.status();
    debug!("{label} response status: {status}");

    if !status.is_success() {
        let err_body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        warn!("{label} API error: {} - {}", status.as_u16(), err_body);
        return Err(TransportError::Api {
            status: status.as_u16(),
            message: err_body,
        });
    }

    let text = response
        .text()
        .await
        .map_err(network_error)?;
    serde_json::from_str(&text).map_err(|e| {
        warn!("{label} returned an unparseable body: {e}");
        TransportError::Parse(e.to_string())
    })
}

/// The request URL may carry a secret (Gemini's `?key=`), so it is dropped
/// before the error is turned into text.
fn network_error(e: reqwest::Error) -> TransportError {
    TransportError::Network(e.without_url().to_string())
}
