//! Session credentials and the seam that obtains them.
//!
//! A [`CredentialRecord`] is produced by a successful MFA-gated role
//! assumption. Anything able to perform that exchange implements
//! [`CredentialSupplier`]; the crate ships a supplier that drives the `aws`
//! command line tool and one that reads an assume-role JSON document.

mod aws_cli;
mod json_input;
mod sts_json;

pub use aws_cli::{AwsCliConfig, AwsCliSupplier};
pub use json_input::JsonInputSupplier;
pub use sts_json::parse_assume_role_output;

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::store::StoreError;

/// Short-lived credentials returned by a role assumption.
///
/// All three credential fields are supplied together at construction. The
/// secret access key and the session token are held as [`SecretString`] and
/// are redacted from `Debug` output.
pub struct CredentialRecord {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: SecretString,
    expiration: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: SecretString,
        session_token: SecretString,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key,
            session_token,
            expiration: None,
        }
    }

    /// Attach the instant the provider says these credentials stop working.
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &SecretString {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> &SecretString {
        &self.session_token
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// Reject records that cannot be written as a well-formed section.
    ///
    /// Every field must be non-empty and free of line breaks, since each one
    /// occupies exactly one line of the credentials file.
    pub fn validate(&self) -> Result<(), StoreError> {
        let fields = [
            ("access key id", self.access_key_id.as_str()),
            ("secret access key", self.secret_access_key.expose_secret()),
            ("session token", self.session_token.expose_secret()),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(StoreError::validation(field, "value is empty"));
            }
            if value.contains(['\n', '\r']) {
                return Err(StoreError::validation(field, "value contains a line break"));
            }
        }
        Ok(())
    }

    /// Whether the credentials have expired at `now`. Records without an
    /// expiration never report expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|exp| exp <= now)
    }

    /// Time left before expiry, or `None` if unknown or already expired.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expiration
            .and_then(|exp| (exp - now).to_std().ok())
            .filter(|d| !d.is_zero())
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Parameters of one MFA-gated role assumption.
#[derive(Debug, Clone)]
pub struct AssumeRoleRequest {
    /// Role name or full role ARN.
    pub role: String,
    /// MFA device serial (ARN). `None` lets the supplier look it up.
    pub mfa_serial: Option<String>,
    /// User that owns the MFA device, used when the serial must be looked up.
    pub user_name: Option<String>,
    /// One-time code shown by the MFA device.
    pub mfa_code: String,
    pub duration: Duration,
}

impl AssumeRoleRequest {
    /// Check the request before any external call is made.
    pub fn validate(&self) -> Result<()> {
        if self.role.trim().is_empty() {
            anyhow::bail!("Role must not be empty");
        }
        if self.mfa_code.len() != 6 || !self.mfa_code.chars().all(|c| c.is_ascii_digit()) {
            anyhow::bail!("MFA code must be exactly 6 digits");
        }
        if self.mfa_serial.is_none() && self.user_name.is_none() {
            anyhow::bail!("Either an MFA serial or a user name is required");
        }
        crate::duration::validate_session_duration(self.duration)?;
        Ok(())
    }
}

/// Something that can exchange an MFA code for session credentials.
///
/// Implementations perform the identity-provider exchange; the credentials
/// store only ever sees the resulting [`CredentialRecord`].
#[async_trait]
pub trait CredentialSupplier: Send + Sync {
    async fn obtain(&self, request: &AssumeRoleRequest) -> Result<CredentialRecord>;
}
