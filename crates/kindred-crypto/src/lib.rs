/// Kindred Crypto Library
///
/// Credential hashing for stored user passwords. Token signing lives in
/// kindred-api next to the middleware that validates it.
pub mod password;
