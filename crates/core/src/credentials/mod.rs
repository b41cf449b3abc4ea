//! Login credential artifacts: waiting, parsing and environment derivation.

mod types;
mod waiter;

pub use types::{Credentials, NotReady, ENV_ADDRESS_ACCOUNT, ENV_ADDRESS_EOA, ENV_ORG_ID};
pub use waiter::{derive_credentials, CredentialWaiter};
