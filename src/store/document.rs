//! In-memory view of a credentials file as ordered lines.
//!
//! A profile section is a header line followed immediately by the three
//! credential lines in [`SECTION_LAYOUT`] order:
//!
//! ```text
//! [profile-name]
//! aws_access_key_id = ASIA...
//! aws_secret_access_key = ...
//! aws_session_token = ...
//! ```
//!
//! Lines are addressed by their offset from the header, never looked up by
//! key, so a section is only as good as its layout.

use secrecy::ExposeSecret;

use super::ProfileHeader;
use crate::credentials::CredentialRecord;

/// Key names of the credential lines, in the order they follow the header.
pub const SECTION_LAYOUT: [&str; 3] = [
    "aws_access_key_id",
    "aws_secret_access_key",
    "aws_session_token",
];

/// Number of credential lines that belong to a section.
pub const SECTION_LEN: usize = SECTION_LAYOUT.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    /// CRLF if the text uses it anywhere, LF otherwise.
    fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Result of writing a section into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The header was absent and a new section was appended.
    Created,
    /// An existing section's credential lines were overwritten.
    Updated,
}

/// Why a section under a known header cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionDefect {
    /// Fewer than [`SECTION_LEN`] lines follow the header.
    Truncated { found: usize },
    /// The line at `position` (1-based offset from the header) does not
    /// carry the key the layout puts there.
    MisplacedKey {
        position: usize,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsDocument {
    lines: Vec<String>,
    ending: LineEnding,
    trailing_newline: bool,
}

impl CredentialsDocument {
    pub fn parse(text: &str) -> Self {
        let ending = LineEnding::detect(text);
        let body = text
            .strip_suffix('\n')
            .map(|rest| rest.strip_suffix('\r').unwrap_or(rest));
        let trailing_newline = body.is_some();
        let body = body.unwrap_or(text);

        let lines = if text.is_empty() {
            Vec::new()
        } else {
            body.split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
                .collect()
        };

        Self {
            lines,
            ending,
            trailing_newline,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_ending(&self) -> LineEnding {
        self.ending
    }

    /// Index of the first line equal to `header`.
    pub fn find_header(&self, header: &ProfileHeader) -> Option<usize> {
        self.lines.iter().position(|line| line == header.as_str())
    }

    /// Headers of every section-looking line, in file order.
    pub fn headers(&self) -> Vec<&str> {
        self.lines
            .iter()
            .map(String::as_str)
            .filter(|line| ProfileHeader::looks_like_header(line))
            .collect()
    }

    /// The lines at fixed offsets after the header at `index`.
    fn section_slots(&self, index: usize) -> Result<std::ops::Range<usize>, SectionDefect> {
        let start = index + 1;
        let available = self.lines.len().saturating_sub(start);
        if available < SECTION_LEN {
            return Err(SectionDefect::Truncated { found: available });
        }
        Ok(start..start + SECTION_LEN)
    }

    /// Raw values of a section's credential lines.
    ///
    /// `Ok(None)` only when the header is absent. A present header whose
    /// lines are missing or out of layout order is a [`SectionDefect`].
    pub fn section_values(
        &self,
        header: &ProfileHeader,
    ) -> Result<Option<[&str; SECTION_LEN]>, SectionDefect> {
        let Some(index) = self.find_header(header) else {
            return Ok(None);
        };
        let slots = self.section_slots(index)?;

        let mut values = [""; SECTION_LEN];
        for (offset, ((value, line), key)) in values
            .iter_mut()
            .zip(&self.lines[slots])
            .zip(SECTION_LAYOUT)
            .enumerate()
        {
            *value = line
                .strip_prefix(key)
                .and_then(|rest| rest.strip_prefix(" = "))
                .ok_or(SectionDefect::MisplacedKey {
                    position: offset + 1,
                    expected: key,
                })?;
        }
        Ok(Some(values))
    }

    /// Write `record` under `header`, in place if the section exists,
    /// otherwise appended to the end of the document.
    pub fn upsert(
        &mut self,
        header: &ProfileHeader,
        record: &CredentialRecord,
    ) -> Result<UpsertOutcome, SectionDefect> {
        let formatted = format_section_lines(record);

        match self.find_header(header) {
            Some(index) => {
                let slots = self.section_slots(index)?;
                for (slot, line) in self.lines[slots].iter_mut().zip(formatted) {
                    *slot = line;
                }
                Ok(UpsertOutcome::Updated)
            }
            None => {
                self.lines.push(String::new());
                self.lines.push(header.as_str().to_string());
                self.lines.extend(formatted);
                // The blank line that closes a new section.
                self.trailing_newline = true;
                Ok(UpsertOutcome::Created)
            }
        }
    }

    /// Render the document back to text.
    pub fn render(&self) -> String {
        let sep = self.ending.as_str();
        let mut out = self.lines.join(sep);
        if self.trailing_newline {
            out.push_str(sep);
        }
        out
    }
}

/// `<key> = <value>` for each field of the record, in layout order.
fn format_section_lines(record: &CredentialRecord) -> [String; SECTION_LEN] {
    let values = [
        record.access_key_id(),
        record.secret_access_key().expose_secret(),
        record.session_token().expose_secret(),
    ];
    std::array::from_fn(|i| format!("{} = {}", SECTION_LAYOUT[i], values[i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn record(ak: &str, sk: &str, st: &str) -> CredentialRecord {
        CredentialRecord::new(
            ak,
            SecretString::from(sk.to_string()),
            SecretString::from(st.to_string()),
        )
    }

    fn header(s: &str) -> ProfileHeader {
        ProfileHeader::parse(s).unwrap()
    }

    #[test]
    fn test_parse_empty() {
        let doc = CredentialsDocument::parse("");
        assert!(doc.lines().is_empty());
        assert_eq!(doc.render(), "");
    }

    #[test]
    fn test_parse_preserves_trailing_newline() {
        let text = "[a]\nx = 1\n";
        let doc = CredentialsDocument::parse(text);
        assert_eq!(doc.lines(), ["[a]", "x = 1"]);
        assert_eq!(doc.render(), text);

        let text = "[a]\nx = 1";
        assert_eq!(CredentialsDocument::parse(text).render(), text);
    }

    #[test]
    fn test_parse_crlf() {
        let text = "[a]\r\nx = 1\r\n";
        let doc = CredentialsDocument::parse(text);
        assert_eq!(doc.line_ending(), LineEnding::CrLf);
        assert_eq!(doc.lines(), ["[a]", "x = 1"]);
        assert_eq!(doc.render(), text);
    }

    #[test]
    fn test_create_on_empty_document() {
        let mut doc = CredentialsDocument::parse("");
        let outcome = doc.upsert(&header("[new]"), &record("ak", "sk", "st")).unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);
        assert_eq!(
            doc.render(),
            "\n[new]\naws_access_key_id = ak\naws_secret_access_key = sk\naws_session_token = st\n"
        );
    }

    #[test]
    fn test_create_appends_after_existing_content() {
        let mut doc = CredentialsDocument::parse("[default]\nregion = x\n");
        doc.upsert(&header("[new]"), &record("ak", "sk", "st")).unwrap();
        assert_eq!(
            doc.lines(),
            [
                "[default]",
                "region = x",
                "",
                "[new]",
                "aws_access_key_id = ak",
                "aws_secret_access_key = sk",
                "aws_session_token = st",
            ]
        );
        assert!(doc.render().ends_with("aws_session_token = st\n"));
    }

    #[test]
    fn test_update_overwrites_fixed_offsets() {
        let mut doc = CredentialsDocument::parse(
            "[p]\naws_access_key_id = old\naws_secret_access_key = old\naws_session_token = old\n\n[q]\nk = v\n",
        );
        let outcome = doc.upsert(&header("[p]"), &record("n1", "n2", "n3")).unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(
            doc.render(),
            "[p]\naws_access_key_id = n1\naws_secret_access_key = n2\naws_session_token = n3\n\n[q]\nk = v\n"
        );
    }

    #[test]
    fn test_update_only_first_duplicate() {
        let text = "[p]\na\nb\nc\n[p]\nd\ne\nf";
        let mut doc = CredentialsDocument::parse(text);
        doc.upsert(&header("[p]"), &record("1", "2", "3")).unwrap();
        assert_eq!(&doc.lines()[4..], ["[p]", "d", "e", "f"]);
    }

    #[test]
    fn test_truncated_section() {
        let mut doc = CredentialsDocument::parse("[p]\naws_access_key_id = a\n");
        let before = doc.clone();
        let err = doc.upsert(&header("[p]"), &record("1", "2", "3")).unwrap_err();
        assert_eq!(err, SectionDefect::Truncated { found: 1 });
        assert_eq!(doc, before);
    }

    #[test]
    fn test_header_match_is_exact() {
        let mut doc = CredentialsDocument::parse("[P]\na\nb\nc\n[p ]\nd\ne\nf\n");
        let outcome = doc.upsert(&header("[p]"), &record("1", "2", "3")).unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);
    }

    #[test]
    fn test_section_values() {
        let doc = CredentialsDocument::parse(
            "[p]\naws_access_key_id = A\naws_secret_access_key = S\naws_session_token = T\n[q]\nx\ny\nz\n",
        );
        assert_eq!(doc.section_values(&header("[p]")).unwrap(), Some(["A", "S", "T"]));
        assert_eq!(
            doc.section_values(&header("[q]")),
            Err(SectionDefect::MisplacedKey {
                position: 1,
                expected: "aws_access_key_id",
            })
        );
        assert_eq!(doc.section_values(&header("[missing]")).unwrap(), None);
    }

    #[test]
    fn test_headers_in_order() {
        let doc = CredentialsDocument::parse("[b]\nx\n\n[a]\ny\n[]\n");
        assert_eq!(doc.headers(), ["[b]", "[a]"]);
    }
}
