/// Credential hashing and token issuance
///
/// Two independent pieces: the Argon2id password hasher and the JWT token
/// service. Session policy on top of them lives in the account manager.

pub mod password;
pub mod tokens;

pub use tokens::{AccessClaims, RefreshClaims, TokenService};
