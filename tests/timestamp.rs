//! Timestamp formatting and parsing tests.

use std::time::Duration;

use framescreen::{Category, FrameTimestamp, ScreeningError};

#[test]
fn display_uses_file_name_form() {
    let timestamp = FrameTimestamp::new(Duration::from_millis(3_723_450));
    assert_eq!(timestamp.to_string(), "01-02-03.45");
    assert_eq!(timestamp.colon(), "01:02:03.45");
}

#[test]
fn hundredths_are_truncated() {
    let timestamp = FrameTimestamp::new(Duration::from_millis(1_999));
    assert_eq!(timestamp.to_string(), "00-00-01.99");
}

#[test]
fn zero_renders_all_fields() {
    assert_eq!(FrameTimestamp::ZERO.to_string(), "00-00-00.00");
}

#[test]
fn hours_grow_past_two_digits() {
    let timestamp = FrameTimestamp::new(Duration::from_secs(100 * 3600));
    assert_eq!(timestamp.to_string(), "100-00-00.00");
}

#[test]
fn parses_both_separators() {
    let expected = FrameTimestamp::new(Duration::from_millis(62_500));
    assert_eq!("00-01-02.50".parse::<FrameTimestamp>().unwrap(), expected);
    assert_eq!("00:01:02.5".parse::<FrameTimestamp>().unwrap(), expected);
    assert_eq!(
        "00:01:02".parse::<FrameTimestamp>().unwrap(),
        FrameTimestamp::new(Duration::from_secs(62))
    );
}

#[test]
fn rendered_timestamps_parse_back() {
    let timestamp = FrameTimestamp::new(Duration::from_millis(45_120));
    let parsed: FrameTimestamp = timestamp.to_string().parse().unwrap();
    assert_eq!(parsed, timestamp);
}

#[test]
fn rejects_malformed_timestamps() {
    let inputs = [
        "",
        "12",
        "00-00",
        "00-61-00.00",
        "00-00-60",
        "aa-00-00",
        "00-00-01.1234",
        "99999999999999999-00-00",
        "18446744073709551615-59-59.99",
    ];
    for input in inputs {
        let error = input.parse::<FrameTimestamp>().unwrap_err();
        assert!(
            matches!(error, ScreeningError::InvalidTimestamp(_)),
            "{input:?} gave {error}"
        );
    }
}

#[test]
fn negative_seconds_saturate_to_zero() {
    assert_eq!(FrameTimestamp::from_secs_f64(-1.0), FrameTimestamp::ZERO);
    assert_eq!(FrameTimestamp::from_secs_f64(f64::NAN), FrameTimestamp::ZERO);
}

#[test]
fn category_names_round_trip() {
    for category in Category::ALL {
        assert_eq!(category.name().parse::<Category>(), Ok(category));
    }
    assert_eq!("selfharm".parse::<Category>(), Ok(Category::SelfHarm));
    assert!("Spam".parse::<Category>().is_err());
}
