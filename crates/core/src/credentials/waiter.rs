//! Blocks until the login artifact files exist and parse.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use super::types::{Credentials, NotReady};

/// Polls for the two login artifact JSON files until both parse and yield a
/// complete credential set. The wait is unbounded on purpose: login is a
/// human action with no upper bound. Cancellation arrives from outside by
/// dropping the future; every retry passes through a sleep.
pub struct CredentialWaiter {
    user_data_path: PathBuf,
    user_api_key_path: PathBuf,
    poll_interval: Duration,
}

impl CredentialWaiter {
    pub fn new(
        user_data_path: PathBuf,
        user_api_key_path: PathBuf,
        poll_interval: Duration,
    ) -> Self {
        Self {
            user_data_path,
            user_api_key_path,
            poll_interval,
        }
    }

    /// Blocks until both artifacts are readable and complete.
    pub async fn wait(&self) -> Credentials {
        info!(
            "Waiting for login artifacts at {}",
            self.user_data_path.display()
        );
        loop {
            match self.try_read().await {
                Ok(credentials) => {
                    info!("Login artifacts ready");
                    return credentials;
                }
                Err(reason) => {
                    debug!("Login artifacts not ready: {}", reason);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// One poll attempt; the loop inspects the error tag rather than
    /// catching anything broader.
    async fn try_read(&self) -> Result<Credentials, NotReady> {
        let user_data = read_artifact(&self.user_data_path).await?;
        let user_api_key = read_artifact(&self.user_api_key_path).await?;
        derive_credentials(&user_data, &user_api_key)
    }
}

async fn read_artifact(path: &Path) -> Result<String, NotReady> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|_| NotReady::Missing(path.display().to_string()))
}

/// Derives credentials from the two artifact documents.
///
/// Both documents are mappings keyed by arbitrary ids, and the last entry
/// in document order is authoritative; for the API-key document the account
/// address is the last element of that entry's array. The producer appears
/// to only ever write one entry, but the last-entry rule holds if it ever
/// writes more.
pub fn derive_credentials(user_data: &str, user_api_key: &str) -> Result<Credentials, NotReady> {
    let user_data: serde_json::Map<String, Value> = serde_json::from_str(user_data)
        .map_err(|e| NotReady::Unparseable(format!("userData.json: {e}")))?;
    let api_keys: serde_json::Map<String, Value> = serde_json::from_str(user_api_key)
        .map_err(|e| NotReady::Unparseable(format!("userApiKey.json: {e}")))?;

    let mut last_user: Option<(String, String)> = None;
    for (id, entry) in &user_data {
        let org_id = entry
            .get("orgId")
            .and_then(Value::as_str)
            .ok_or_else(|| NotReady::Incomplete(format!("userData entry {id} has no orgId")))?;
        let address = entry
            .get("address")
            .and_then(Value::as_str)
            .ok_or_else(|| NotReady::Incomplete(format!("userData entry {id} has no address")))?;
        last_user = Some((org_id.to_string(), address.to_string()));
    }
    let (org_id, address_eoa) =
        last_user.ok_or_else(|| NotReady::Incomplete("userData.json has no entries".into()))?;

    let mut address_account: Option<String> = None;
    for (id, entry) in &api_keys {
        let last_key = entry
            .as_array()
            .and_then(|keys| keys.last())
            .ok_or_else(|| NotReady::Incomplete(format!("userApiKey entry {id} has no keys")))?;
        let account = last_key
            .get("accountAddress")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                NotReady::Incomplete(format!("userApiKey entry {id} has no accountAddress"))
            })?;
        address_account = Some(account.to_string());
    }
    let address_account = address_account
        .ok_or_else(|| NotReady::Incomplete("userApiKey.json has no entries".into()))?;

    Ok(Credentials {
        org_id,
        address_eoa,
        address_account,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const API_KEY_DOC: &str = r#"{
        "session": [
            {"accountAddress": "0xold"},
            {"accountAddress": "0xnew"}
        ]
    }"#;

    #[test]
    fn test_derive_single_entry() {
        let user_data = r#"{"u1": {"orgId": "org-a", "address": "0xabc"}}"#;
        let credentials = derive_credentials(user_data, API_KEY_DOC).unwrap();
        assert_eq!(credentials.org_id, "org-a");
        assert_eq!(credentials.address_eoa, "0xabc");
        assert_eq!(credentials.address_account, "0xnew");
    }

    #[test]
    fn test_derive_last_entry_wins() {
        let user_data = r#"{
            "A": {"orgId": "x1", "address": "y1"},
            "B": {"orgId": "x2", "address": "y2"}
        }"#;
        let credentials = derive_credentials(user_data, API_KEY_DOC).unwrap();
        assert_eq!(credentials.org_id, "x2");
        assert_eq!(credentials.address_eoa, "y2");
    }

    #[test]
    fn test_derive_api_key_last_of_last() {
        let user_data = r#"{"u1": {"orgId": "o", "address": "a"}}"#;
        let api_keys = r#"{
            "first": [{"accountAddress": "0x1"}],
            "second": [{"accountAddress": "0x2"}, {"accountAddress": "0x3"}]
        }"#;
        let credentials = derive_credentials(user_data, api_keys).unwrap();
        assert_eq!(credentials.address_account, "0x3");
    }

    #[test]
    fn test_derive_empty_documents_not_ready() {
        let err = derive_credentials("{}", API_KEY_DOC).unwrap_err();
        assert!(matches!(err, NotReady::Incomplete(_)));

        let user_data = r#"{"u1": {"orgId": "o", "address": "a"}}"#;
        let err = derive_credentials(user_data, "{}").unwrap_err();
        assert!(matches!(err, NotReady::Incomplete(_)));
    }

    #[test]
    fn test_derive_missing_field_not_ready() {
        let user_data = r#"{"u1": {"orgId": "o"}}"#;
        let err = derive_credentials(user_data, API_KEY_DOC).unwrap_err();
        assert!(matches!(err, NotReady::Incomplete(_)));
    }

    #[test]
    fn test_derive_empty_key_array_not_ready() {
        let user_data = r#"{"u1": {"orgId": "o", "address": "a"}}"#;
        let err = derive_credentials(user_data, r#"{"session": []}"#).unwrap_err();
        assert!(matches!(err, NotReady::Incomplete(_)));
    }

    #[test]
    fn test_derive_partial_json_not_ready() {
        // A half-written file mid-flush parses as invalid JSON.
        let err = derive_credentials(r#"{"u1": {"orgId"#, API_KEY_DOC).unwrap_err();
        assert!(matches!(err, NotReady::Unparseable(_)));
    }
}
