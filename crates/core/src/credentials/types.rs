//! Types for the login credential artifacts.

use std::collections::HashMap;

use thiserror::Error;

/// Environment key for the organization id derived from userData.json.
pub const ENV_ORG_ID: &str = "BA_ORG_ID";
/// Environment key for the EOA wallet address derived from userData.json.
pub const ENV_ADDRESS_EOA: &str = "BA_ADDRESS_EOA";
/// Environment key for the account address derived from userApiKey.json.
pub const ENV_ADDRESS_ACCOUNT: &str = "BA_ADDRESS_ACCOUNT";

const ENV_PYTHONWARNINGS: &str = "PYTHONWARNINGS";
const SUPPRESS_DEPRECATIONS: &str = "ignore::DeprecationWarning";

/// Why a poll attempt could not yet produce credentials. Every variant is
/// retried on the next tick, never surfaced as a failure by itself.
#[derive(Debug, Error)]
pub enum NotReady {
    #[error("artifact not present yet: {0}")]
    Missing(String),

    #[error("artifact not parseable yet: {0}")]
    Unparseable(String),

    #[error("artifact missing required fields: {0}")]
    Incomplete(String),
}

/// Login-derived identity. Complete by construction: the waiter keeps
/// retrying rather than ever producing a partial set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub org_id: String,
    pub address_eoa: String,
    pub address_account: String,
}

impl Credentials {
    /// Full child environment for the training command: everything this
    /// process sees plus the derived keys and the warnings-suppression
    /// override.
    pub fn to_env(&self) -> HashMap<String, String> {
        self.env_over(std::env::vars().collect())
    }

    fn env_over(&self, mut env: HashMap<String, String>) -> HashMap<String, String> {
        env.insert(ENV_ORG_ID.to_string(), self.org_id.clone());
        env.insert(ENV_ADDRESS_EOA.to_string(), self.address_eoa.clone());
        env.insert(ENV_ADDRESS_ACCOUNT.to_string(), self.address_account.clone());
        env.insert(
            ENV_PYTHONWARNINGS.to_string(),
            SUPPRESS_DEPRECATIONS.to_string(),
        );
        env
    }
}
