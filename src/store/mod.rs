//! The credentials-store merge engine.
//!
//! [`ProfileStore`] owns a credentials file and rewrites one profile section
//! at a time, leaving every other line as it found it. Each write is preceded
//! by a full copy of the file to `<path>.bak`, which is left on disk as the
//! recovery path should the rewrite be interrupted.
//!
//! The store takes no lock. Concurrent writers against the same file race and
//! the last one wins; callers that need more must serialize externally.

mod document;
mod error;
mod header;

pub use document::{
    CredentialsDocument, LineEnding, SectionDefect, UpsertOutcome, SECTION_LAYOUT, SECTION_LEN,
};
pub use error::{StoreError, StoreErrorKind};
pub use header::ProfileHeader;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::credentials::CredentialRecord;

/// Suffix appended to the credentials path to name the backup copy.
pub const BACKUP_SUFFIX: &str = ".bak";

/// A credentials file organised as named profile sections.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<path>.bak`, the copy taken before every write.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(BACKUP_SUFFIX);
        PathBuf::from(name)
    }

    /// Make the file contain `header` followed by the record's three lines.
    ///
    /// The record is validated before the file is touched. The existing file
    /// is then copied to [`backup_path`](Self::backup_path) and the copy is
    /// read back as the source of truth. A section that already exists is
    /// overwritten in place; otherwise a new one is appended to the end of the
    /// file. A header followed by fewer than three lines is reported as
    /// corruption and nothing is written.
    pub fn upsert_profile(
        &self,
        header: &ProfileHeader,
        record: &CredentialRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        record.validate()?;

        let backup = self.backup()?;
        let text = std::fs::read_to_string(&backup)
            .map_err(|e| StoreError::io("read backup", &backup, e))?;
        let mut document = CredentialsDocument::parse(&text);

        let outcome = document
            .upsert(header, record)
            .map_err(|defect| self.corruption(header, defect))?;

        std::fs::write(&self.path, document.render())
            .map_err(|e| StoreError::io("write", &self.path, e))?;

        match outcome {
            UpsertOutcome::Created => tracing::info!(
                path = %self.path.display(),
                profile = %header,
                "Added profile to credentials file"
            ),
            UpsertOutcome::Updated => tracing::info!(
                path = %self.path.display(),
                profile = %header,
                "Updated profile in credentials file"
            ),
        }
        Ok(outcome)
    }

    /// Headers of all sections in the file, in file order.
    pub fn profiles(&self) -> Result<Vec<String>, StoreError> {
        let document = self.load()?;
        Ok(document.headers().into_iter().map(str::to_string).collect())
    }

    /// The record stored under `header`, or `None` if the header is absent.
    /// A present section that breaks the fixed layout is a corruption error.
    /// Expiry is not stored in the file and comes back unset.
    pub fn read_profile(
        &self,
        header: &ProfileHeader,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let document = self.load()?;
        let values = document
            .section_values(header)
            .map_err(|defect| self.corruption(header, defect))?;

        Ok(values.map(|[access_key_id, secret, token]| {
            CredentialRecord::new(
                access_key_id,
                SecretString::from(secret.to_string()),
                SecretString::from(token.to_string()),
            )
        }))
    }

    fn load(&self) -> Result<CredentialsDocument, StoreError> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| StoreError::io("read", &self.path, e))?;
        Ok(CredentialsDocument::parse(&text))
    }

    /// Copy the file to its backup path, replacing any earlier backup.
    fn backup(&self) -> Result<PathBuf, StoreError> {
        let backup = self.backup_path();
        std::fs::copy(&self.path, &backup)
            .map_err(|e| StoreError::io("back up", &self.path, e))?;
        tracing::debug!(
            path = %self.path.display(),
            backup = %backup.display(),
            "Backed up credentials file"
        );
        Ok(backup)
    }

    fn corruption(&self, header: &ProfileHeader, defect: SectionDefect) -> StoreError {
        match defect {
            SectionDefect::Truncated { found } => StoreError::Corruption {
                path: self.path.clone(),
                header: header.to_string(),
                expected: SECTION_LEN,
                found,
            },
            SectionDefect::MisplacedKey { position, expected } => StoreError::MisplacedKey {
                path: self.path.clone(),
                header: header.to_string(),
                position,
                expected,
            },
        }
    }
}

/// Upsert a profile into the credentials file at `path`.
///
/// Shorthand for [`ProfileStore::upsert_profile`] taking a raw header string
/// such as `"[myprofile]"`.
pub fn upsert_profile(
    path: impl AsRef<Path>,
    header: &str,
    record: &CredentialRecord,
) -> Result<UpsertOutcome, StoreError> {
    let header = ProfileHeader::parse(header)?;
    ProfileStore::new(path).upsert_profile(&header, record)
}
