use chrono::{DateTime, FixedOffset, Utc};

/// US zone abbreviations that general date parsers resolve inconsistently,
/// with the fixed offset each one stands for.
const BOGUS_ZONES: [(&str, &str); 8] = [
    ("PST", "-0800"),
    ("PDT", "-0700"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
];

/// Formats tried after RFC 2822 and RFC 3339.
const FALLBACK_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S %z",
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S %z",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised timestamp '{raw}'")]
pub struct ParseError {
    pub raw: String,
}

/// Swap a trailing ` PST`-style abbreviation for its numeric offset.
/// Anything else is returned unchanged.
pub fn repair_zone(raw: &str) -> String {
    let trimmed = raw.trim();
    for (abbreviation, offset) in BOGUS_ZONES {
        if let Some(stem) = trimmed.strip_suffix(abbreviation) {
            if stem.ends_with(' ') {
                return format!("{}{}", stem, offset);
            }
        }
    }
    trimmed.to_string()
}

/// Parse a feed timestamp into a timezone-aware instant.
pub fn normalize(raw: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    let repaired = repair_zone(raw);

    if let Ok(parsed) = DateTime::parse_from_rfc2822(&repaired) {
        return Ok(parsed);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&repaired) {
        return Ok(parsed);
    }
    for format in FALLBACK_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&repaired, format) {
            return Ok(parsed);
        }
    }

    Err(ParseError { raw: raw.to_string() })
}

/// Timestamp hook for feed-rs, which wants UTC or nothing.
pub fn normalize_utc(raw: &str) -> Option<DateTime<Utc>> {
    normalize(raw).ok().map(|parsed| parsed.with_timezone(&Utc))
}
