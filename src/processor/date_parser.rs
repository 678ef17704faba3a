use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Format used for every timestamp written to a cleaned file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

// Flipkart crawl timestamps carry an offset: "2016-03-25 22:59:23 +0000"
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S%:z"];

/// Lenient timestamp parse. Anything unrecognised is `None`, never an error.
///
/// Offset-bearing values are normalised to UTC; a bare date means midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }

    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(value, format) {
            return Some(parsed.naive_utc());
        }
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub fn parse_optional_timestamp(raw: Option<&str>) -> Option<NaiveDateTime> {
    raw.and_then(parse_timestamp)
}

pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Whole days from `start` to `end`, rounded toward negative infinity.
pub fn days_between(start: &NaiveDateTime, end: &NaiveDateTime) -> i64 {
    (*end - *start).num_seconds().div_euclid(86_400)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn test_parses_known_formats() {
        assert_eq!(parse_timestamp("2017-10-02 10:56:33"), Some(ts("2017-10-02 10:56:33")));
        assert_eq!(parse_timestamp(" 2017-10-02 10:56:33 "), Some(ts("2017-10-02 10:56:33")));
        assert_eq!(parse_timestamp("2017-10-02T10:56:33"), Some(ts("2017-10-02 10:56:33")));
        assert_eq!(parse_timestamp("2017-10-02"), Some(ts("2017-10-02 00:00:00")));
        assert_eq!(parse_timestamp("2017-10-02 10:56"), Some(ts("2017-10-02 10:56:00")));
    }

    #[test]
    fn test_offsets_are_normalised_to_utc() {
        assert_eq!(
            parse_timestamp("2016-03-25 22:59:23 +0000"),
            Some(ts("2016-03-25 22:59:23"))
        );
        assert_eq!(
            parse_timestamp("2016-03-25 22:59:23 +0530"),
            Some(ts("2016-03-25 17:29:23"))
        );
        assert_eq!(
            parse_timestamp("2016-03-25T22:59:23+00:00"),
            Some(ts("2016-03-25 22:59:23"))
        );
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("2017-13-45 99:00:00"), None);
        assert_eq!(parse_optional_timestamp(None), None);
    }

    #[test]
    fn test_days_between_floors() {
        let purchase = ts("2017-10-02 10:56:33");
        assert_eq!(days_between(&purchase, &ts("2017-10-10 21:25:13")), 8);
        assert_eq!(days_between(&purchase, &ts("2017-10-02 11:00:00")), 0);
        // Delivered before purchase: inconsistent data stays negative
        assert_eq!(days_between(&purchase, &ts("2017-10-01 10:56:33")), -1);
        assert_eq!(days_between(&purchase, &ts("2017-10-02 09:00:00")), -1);
    }

    #[test]
    fn test_format_round_trip() {
        let parsed = parse_timestamp("2018-01-05 07:08:09").unwrap();
        assert_eq!(format_timestamp(&parsed), "2018-01-05 07:08:09");
    }
}
