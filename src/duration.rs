//! Session lifetimes like "1h", "90m" or a bare number of seconds.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer};

/// Shortest session the identity provider will issue.
pub const MIN_SESSION: Duration = Duration::from_secs(15 * 60);

/// Longest session the identity provider will issue.
pub const MAX_SESSION: Duration = Duration::from_secs(12 * 60 * 60);

/// Session length used when nothing else is configured.
pub const DEFAULT_SESSION: Duration = Duration::from_secs(60 * 60);

/// Parse a session length.
///
/// A bare number is taken as seconds, matching the `DurationSeconds`
/// parameter of the role-assumption call. Otherwise the number must carry one
/// of the suffixes `h`, `m` or `s`.
///
/// ```
/// use session_token::duration::parse_session_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_session_duration("3600").unwrap(), Duration::from_secs(3600));
/// assert_eq!(parse_session_duration("2h").unwrap(), Duration::from_secs(7200));
/// assert_eq!(parse_session_duration("90m").unwrap(), Duration::from_secs(5400));
/// ```
pub fn parse_session_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        anyhow::bail!("Session duration is empty");
    }

    let (digits, multiplier) = match s.chars().last() {
        Some('h') => (&s[..s.len() - 1], 60 * 60),
        Some('m') => (&s[..s.len() - 1], 60),
        Some('s') => (&s[..s.len() - 1], 1),
        Some(c) if c.is_ascii_digit() => (s.as_str(), 1),
        _ => anyhow::bail!("Session duration must be seconds or end with h, m, or s"),
    };

    let num: u64 = digits
        .parse()
        .with_context(|| format!("Invalid number in session duration: {s:?}"))?;
    let secs = num
        .checked_mul(multiplier)
        .context("Session duration is too large")?;

    Ok(Duration::from_secs(secs))
}

/// Check a session length against the provider's accepted range.
pub fn validate_session_duration(d: Duration) -> Result<Duration> {
    if d < MIN_SESSION || d > MAX_SESSION {
        anyhow::bail!(
            "Session duration {} is outside the accepted range {}..={}",
            format_duration(d),
            format_duration(MIN_SESSION),
            format_duration(MAX_SESSION)
        );
    }
    Ok(d)
}

/// Render a duration with the largest unit that divides it evenly.
///
/// ```
/// use session_token::duration::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(3600)), "1h");
/// assert_eq!(format_duration(Duration::from_secs(900)), "15m");
/// assert_eq!(format_duration(Duration::from_secs(61)), "61s");
/// ```
pub fn format_duration(d: Duration) -> String {
    const SECS_PER_HOUR: u64 = 60 * 60;
    const SECS_PER_MINUTE: u64 = 60;

    let secs = d.as_secs();
    if secs >= SECS_PER_HOUR && secs % SECS_PER_HOUR == 0 {
        format!("{}h", secs / SECS_PER_HOUR)
    } else if secs >= SECS_PER_MINUTE && secs % SECS_PER_MINUTE == 0 {
        format!("{}m", secs / SECS_PER_MINUTE)
    } else {
        format!("{secs}s")
    }
}

/// Render time left before expiry, rounded down to whole minutes.
///
/// Anything under a minute reads `"under 1m"` rather than `"0s"`.
pub fn format_remaining(d: Duration) -> String {
    let minutes = d.as_secs() / 60;
    if minutes == 0 {
        "under 1m".to_string()
    } else {
        format_duration(Duration::from_secs(minutes * 60))
    }
}

/// Serde deserializer accepting either an integer number of seconds or a
/// duration string.
///
/// Use with `#[serde(deserialize_with = "deserialize_session_duration")]`.
pub fn deserialize_session_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(s) => parse_session_duration(&s).map_err(de::Error::custom),
    }
}
