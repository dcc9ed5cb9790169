use chrono::{FixedOffset, TimeZone, Utc};
use rss_alerter::timestamp::{normalize, normalize_utc, repair_zone, ParseError};

#[test]
fn test_each_us_abbreviation_gets_fixed_offset() -> Result<(), ParseError> {
    let cases = [
        ("PST", -8),
        ("PDT", -7),
        ("MST", -7),
        ("MDT", -6),
        ("CST", -6),
        ("CDT", -5),
        ("EST", -5),
        ("EDT", -4),
    ];

    for (abbreviation, hours) in cases {
        let raw = format!("Tue, 10 Jun 2025 09:15:00 {}", abbreviation);
        let parsed = normalize(&raw)?;

        assert_eq!(
            parsed.offset(),
            &FixedOffset::east_opt(hours * 3600).unwrap(),
            "{}",
            abbreviation
        );
        assert_eq!(
            parsed.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2025, 6, 10, (9 - hours) as u32, 15, 0).unwrap(),
            "{}",
            abbreviation
        );
    }
    Ok(())
}

#[test]
fn test_repair_only_touches_known_trailing_abbreviations() {
    assert_eq!(repair_zone("Tue, 10 Jun 2025 09:15:00 PST"), "Tue, 10 Jun 2025 09:15:00 -0800");
    assert_eq!(
        repair_zone("  Tue, 10 Jun 2025 09:15:00 EDT \n"),
        "Tue, 10 Jun 2025 09:15:00 -0400"
    );
    assert_eq!(repair_zone("Tue, 10 Jun 2025 09:15:00 GMT"), "Tue, 10 Jun 2025 09:15:00 GMT");
    assert_eq!(repair_zone("Tue, 10 Jun 2025 09:15:00 AEST"), "Tue, 10 Jun 2025 09:15:00 AEST");
    // no separating space, not an abbreviation of its own
    assert_eq!(repair_zone("Tue, 10 Jun 2025 09:15:00XEST"), "Tue, 10 Jun 2025 09:15:00XEST");
}

#[test]
fn test_unrecognised_abbreviation_reaches_parser() {
    // GMT is left alone and the general parser knows it
    let parsed = normalize("Tue, 10 Jun 2025 09:15:00 GMT").expect("GMT parses");
    assert_eq!(parsed.with_timezone(&Utc), Utc.with_ymd_and_hms(2025, 6, 10, 9, 15, 0).unwrap());
}

#[test]
fn test_common_feed_formats() -> Result<(), ParseError> {
    let expected = Utc.with_ymd_and_hms(2025, 6, 10, 17, 15, 0).unwrap();

    let formats = [
        "Tue, 10 Jun 2025 17:15:00 +0000",
        "Tue, 10 Jun 2025 10:15:00 -0700",
        "2025-06-10T17:15:00Z",
        "2025-06-10T19:15:00+02:00",
        "2025-06-10 09:15:00 PST",
        "2025-06-10T10:15:00 PDT",
        "Tue, 10 Jun 2025 10:15 PDT",
        "10 Jun 2025 17:15:00 +0000",
    ];

    for raw in formats {
        assert_eq!(normalize(raw)?.with_timezone(&Utc), expected, "{}", raw);
    }
    Ok(())
}

#[test]
fn test_garbage_fails_loudly() {
    let err = normalize("yesterday at noon").unwrap_err();
    assert_eq!(err.raw, "yesterday at noon");
    assert!(normalize("").is_err());
    assert!(normalize_utc("2025-13-45T99:00:00Z").is_none());
}

#[test]
fn test_utc_hook_matches_normalize() {
    let hooked = normalize_utc("Tue, 10 Jun 2025 09:15:00 CDT").expect("parses");
    assert_eq!(hooked, Utc.with_ymd_and_hms(2025, 6, 10, 14, 15, 0).unwrap());
}
