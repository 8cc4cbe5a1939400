#![allow(dead_code)]

use std::path::{Path, PathBuf};

use anyhow::Result;
use secrecy::SecretString;
use session_token::credentials::CredentialRecord;
use session_token::store::ProfileHeader;

pub fn record(access_key_id: &str, secret: &str, token: &str) -> CredentialRecord {
    CredentialRecord::new(
        access_key_id,
        SecretString::from(secret.to_string()),
        SecretString::from(token.to_string()),
    )
}

pub fn header(value: &str) -> ProfileHeader {
    ProfileHeader::parse(value).expect("valid header")
}

pub fn write_credentials(dir: &Path, content: &str) -> Result<PathBuf> {
    let path = dir.join("credentials");
    std::fs::write(&path, content)?;
    Ok(path)
}

pub fn read(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

/// Two well-formed sections, `[a]` then `[b]`, with a trailing newline.
pub const TWO_PROFILES: &str = "\
[a]
aws_access_key_id = A1
aws_secret_access_key = A2
aws_session_token = A3

[b]
aws_access_key_id = B1
aws_secret_access_key = B2
aws_session_token = B3
";
