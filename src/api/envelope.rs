//! `{ "data": ... }` response envelope handling.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ClientError, ClientResult};

/// Successful response wrapper.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Error body; every field is optional.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Decode a response body into its payload, or into a `ClientError` for non-2xx statuses.
pub fn decode<T: DeserializeOwned>(
    status: u16,
    reason: Option<&str>,
    body: &[u8],
) -> ClientResult<T> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message);
        return Err(ClientError::api(status, message, reason));
    }

    let envelope: Envelope<T> = serde_json::from_slice(body)?;
    Ok(envelope.data)
}

/// Read a reqwest response and decode it.
pub async fn read<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let status = response.status();
    let body = response.bytes().await?;
    decode(status.as_u16(), status.canonical_reason(), &body)
}
