// ReturnBot Engine — Store-Owner Directory
// resolve_owner, lookup_owner
//
// Resolves which owner number a business phone-number-id belongs to. The
// remote table store is authoritative when configured; OWNER_NUMBER is the
// fallback. Read-only, no caching — every confirmation hits the store.

use crate::atoms::error::{RelayError, RelayResult};
use crate::engine::state::RelayState;
use log::warn;
use serde_json::Value;

/// Resolve the owner contact for the receiving business number.
/// Returns None when neither the directory nor the fallback yields one.
pub async fn resolve_owner(state: &RelayState, phone_number_id: &str) -> Option<String> {
    if let Some(url) = &state.config.store_directory_url {
        match lookup_owner(
            url,
            state.config.store_directory_token.as_deref(),
            phone_number_id,
        )
        .await
        {
            Ok(Some(owner)) => return Some(owner),
            Ok(None) => {
                warn!("[owners] no directory row for phone-id {}", phone_number_id);
            }
            Err(e) => {
                warn!("[owners] directory lookup failed: {}", e);
            }
        }
    }

    state.config.owner_number.clone()
}

/// One GET against the table store: `{url}/{phone_number_id}`.
/// 404 means "no row"; other failures are errors.
async fn lookup_owner(
    base_url: &str,
    token: Option<&str>,
    phone_number_id: &str,
) -> RelayResult<Option<String>> {
    let client = reqwest::Client::new();
    let url = format!("{}/{}", base_url.trim_end_matches('/'), phone_number_id);

    let mut request = client.get(&url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let resp = request.send().await?;
    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !resp.status().is_success() {
        return Err(RelayError::channel(
            "directory",
            format!("lookup failed ({})", resp.status()),
        ));
    }

    let record: Value = resp.json().await?;
    Ok(owner_from_record(&record))
}

/// Accept `owner_number` at the top level or under a `fields` wrapper
/// (Airtable-style records).
fn owner_from_record(record: &Value) -> Option<String> {
    record["owner_number"]
        .as_str()
        .or_else(|| record["fields"]["owner_number"].as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
