//! Retrieval of bot source published at a URL.

use super::BotError;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Upper bound on a single source download.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Downloads bot source text from `url`.
///
/// Non-success status codes are failures; the body is returned as-is.
#[instrument(skip(client))]
pub async fn fetch_source(client: &reqwest::Client, url: &str) -> Result<String, BotError> {
    let fetch_error = |reason: String| BotError::Fetch {
        url: url.to_string(),
        reason,
    };

    debug!("Fetching bot source");
    let response = client
        .get(url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| fetch_error(e.to_string()))?
        .error_for_status()
        .map_err(|e| fetch_error(e.to_string()))?;

    let source = response
        .text()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    info!(bytes = source.len(), "Fetched bot source");
    Ok(source)
}
