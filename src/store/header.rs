use std::fmt;

use super::StoreError;

/// The literal marker line that opens a profile section, e.g. `[default]`.
///
/// Headers are matched against file lines by exact string equality; no
/// whitespace or case normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfileHeader(String);

impl ProfileHeader {
    /// Accept a pre-formatted header such as `[myprofile]`.
    pub fn parse(value: impl Into<String>) -> Result<Self, StoreError> {
        let value = value.into();
        let name = value
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| {
                StoreError::validation(
                    "profile header",
                    format!("{value:?} must be enclosed in '[' and ']'"),
                )
            })?;
        Self::check_name(name)?;
        Ok(Self(value))
    }

    /// Build the header for a bare profile name: `name` becomes `[name]`.
    pub fn from_name(name: &str) -> Result<Self, StoreError> {
        Self::check_name(name)?;
        Ok(Self(format!("[{name}]")))
    }

    fn check_name(name: &str) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::validation(
                "profile header",
                "profile name is empty",
            ));
        }
        if name.contains(['\n', '\r']) {
            return Err(StoreError::validation(
                "profile header",
                format!("{name:?} contains a line break"),
            ));
        }
        Ok(())
    }

    /// The profile name between the brackets.
    pub fn name(&self) -> &str {
        &self.0[1..self.0.len() - 1]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a file line could be a section header at all.
    pub(crate) fn looks_like_header(line: &str) -> bool {
        line.len() > 2 && line.starts_with('[') && line.ends_with(']')
    }
}

impl fmt::Display for ProfileHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ProfileHeader {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
