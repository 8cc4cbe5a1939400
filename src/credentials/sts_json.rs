//! Decoding of the identity provider's assume-role response document.
//!
//! The document is the JSON printed by `aws sts assume-role --output json`
//! (and by `get-session-token`, which shares the `Credentials` shape):
//!
//! ```json
//! {
//!   "Credentials": {
//!     "AccessKeyId": "ASIA...",
//!     "SecretAccessKey": "...",
//!     "SessionToken": "...",
//!     "Expiration": "2024-05-01T12:00:00+00:00"
//!   },
//!   "AssumedRoleUser": { "Arn": "..." }
//! }
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Deserialize;

use super::CredentialRecord;

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleOutput {
    credentials: RawCredentials,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    #[serde(default)]
    expiration: Option<DateTime<Utc>>,
}

/// Decode an assume-role response into a [`CredentialRecord`].
///
/// The record is validated before it is returned, so a response with a
/// missing or empty credential field is an error.
pub fn parse_assume_role_output(json: &str) -> Result<CredentialRecord> {
    let output: AssumeRoleOutput =
        serde_json::from_str(json).context("Failed to parse assume-role response")?;
    let raw = output.credentials;

    let mut record = CredentialRecord::new(
        raw.access_key_id,
        SecretString::from(raw.secret_access_key),
        SecretString::from(raw.session_token),
    );
    if let Some(expiration) = raw.expiration {
        record = record.with_expiration(expiration);
    }

    record
        .validate()
        .context("Assume-role response contained unusable credentials")?;
    Ok(record)
}
