//! Ingest credential derivation
//!
//! The service hands back a single upload URL that embeds the broadcast id.
//! Encoders want it as two fields: the server URL and the stream key. The
//! URL is split at the first occurrence of the broadcast id; the key starts
//! with the id and keeps everything after it (query parameters included).

use crate::client::StreamingError;
use crate::models::{CreatedBroadcast, IngestCredentials};

/// Derive `(url, key)` from a creation response.
///
/// Pure and deterministic: the same response always yields the same pair.
pub fn derive_ingest_credentials(
    created: &CreatedBroadcast,
) -> Result<IngestCredentials, StreamingError> {
    let id = created.broadcast_id.as_str();
    if id.is_empty() {
        return Err(StreamingError::InvalidResponse(
            "Creation response has an empty broadcast id".to_string(),
        ));
    }

    let at = created.upload_url.find(id).ok_or_else(|| {
        StreamingError::InvalidResponse(format!(
            "Upload URL does not contain broadcast id {id}"
        ))
    })?;

    let (url, key) = created.upload_url.split_at(at);
    let credentials = IngestCredentials::new(url, key);

    if !credentials.is_complete() {
        return Err(StreamingError::InvalidResponse(format!(
            "Upload URL for broadcast {id} has no server part"
        )));
    }

    Ok(credentials)
}
