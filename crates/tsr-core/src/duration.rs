//! Duration values for environment configuration.
//!
//! Both binaries read intervals like `SESSION_TTL=60s` or
//! `PUSH_INTERVAL=10s` from the environment. Accepted forms are a bare
//! number of seconds (`"60"`) or a number with an `s`, `m`, or `h`
//! suffix.

use std::time::Duration;

use thiserror::Error;

/// Failure to interpret a duration string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("empty duration")]
    Empty,

    #[error("invalid duration {0:?} (expected forms: \"30\", \"30s\", \"5m\", \"1h\")")]
    Invalid(String),
}

/// Parses a duration string like `"60"`, `"60s"`, `"5m"`, or `"2h"`.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let (digits, multiplier) = if let Some(rest) = trimmed.strip_suffix('s') {
        (rest, 1)
    } else if let Some(rest) = trimmed.strip_suffix('m') {
        (rest, 60)
    } else if let Some(rest) = trimmed.strip_suffix('h') {
        (rest, 3600)
    } else {
        (trimmed, 1)
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| DurationParseError::Invalid(input.to_string()))?;

    Ok(Duration::from_secs(value * multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_seconds() {
        assert_eq!(parse_duration("60"), Ok(Duration::from_secs(60)));
    }

    #[test]
    fn parses_suffixed_values() {
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(parse_duration(" 10s "), Ok(Duration::from_secs(10)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_duration(""), Err(DurationParseError::Empty));
        assert!(matches!(
            parse_duration("soon"),
            Err(DurationParseError::Invalid(_))
        ));
        assert!(matches!(
            parse_duration("1.5s"),
            Err(DurationParseError::Invalid(_))
        ));
        assert!(matches!(
            parse_duration("-5s"),
            Err(DurationParseError::Invalid(_))
        ));
    }
}
