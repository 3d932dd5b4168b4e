//! Range aggregation integration tests.

use std::time::Duration;

use framescreen::{
    Category, Classification, FrameTimestamp, FrameVerdict, Observation, ScreeningError,
    UnsafeRange, aggregate, aggregate_category,
};

fn at(seconds: u64) -> FrameTimestamp {
    FrameTimestamp::new(Duration::from_secs(seconds))
}

fn observations(pattern: &str) -> Vec<(FrameTimestamp, Observation)> {
    pattern
        .chars()
        .enumerate()
        .map(|(index, symbol)| {
            let observation = match symbol {
                'U' => Observation::Unsafe,
                '.' => Observation::Safe,
                '?' => Observation::Unavailable,
                other => panic!("unknown symbol {other}"),
            };
            (at(index as u64 + 1), observation)
        })
        .collect()
}

fn rendered(ranges: &[UnsafeRange]) -> Vec<String> {
    ranges.iter().map(ToString::to_string).collect()
}

// ── Documented examples ────────────────────────────────────────────

#[test]
fn run_of_two_frames_becomes_one_range() {
    let ranges = aggregate_category(Category::Violence, observations(".UU.")).unwrap();
    assert_eq!(rendered(&ranges), ["00-00-02.00 -> 00-00-03.00: Violence"]);
}

#[test]
fn single_frame_uses_short_form() {
    let ranges = aggregate_category(Category::Hate, observations("U")).unwrap();
    assert_eq!(rendered(&ranges), ["00-00-01.00: Hate"]);
    assert!(ranges[0].is_single_frame());
}

#[test]
fn all_safe_frames_produce_no_ranges() {
    let verdicts: Vec<FrameVerdict> = (1..=5)
        .map(|second| FrameVerdict::classified(at(second), Classification::new()))
        .collect();

    let ranges = aggregate(&verdicts).unwrap();
    assert!(ranges.is_empty());
    for category in Category::ALL {
        assert!(ranges.get(category).is_empty());
    }
}

#[test]
fn unavailable_frame_splits_a_run() {
    let ranges = aggregate_category(Category::Sexual, observations("U?U")).unwrap();
    assert_eq!(
        rendered(&ranges),
        ["00-00-01.00: Sexual", "00-00-03.00: Sexual"]
    );
}

// ── Edge cases ─────────────────────────────────────────────────────

#[test]
fn empty_input_produces_no_ranges() {
    assert!(aggregate_category(Category::Hate, Vec::new()).unwrap().is_empty());
    assert!(aggregate(&[]).unwrap().is_empty());
}

#[test]
fn trailing_run_is_flushed_at_last_unsafe_frame() {
    let ranges = aggregate_category(Category::Violence, observations("..UUU")).unwrap();
    assert_eq!(rendered(&ranges), ["00-00-03.00 -> 00-00-05.00: Violence"]);
}

#[test]
fn trailing_unavailable_frames_do_not_extend_a_run() {
    let ranges = aggregate_category(Category::Violence, observations("UU??")).unwrap();
    assert_eq!(rendered(&ranges), ["00-00-01.00 -> 00-00-02.00: Violence"]);
}

#[test]
fn unavailable_frames_never_open_a_range() {
    let ranges = aggregate_category(Category::SelfHarm, observations("???")).unwrap();
    assert!(ranges.is_empty());
}

#[test]
fn alternating_frames_give_single_frame_ranges() {
    let ranges = aggregate_category(Category::Hate, observations("U.U.U")).unwrap();
    assert_eq!(ranges.len(), 3);
    assert!(ranges.iter().all(UnsafeRange::is_single_frame));
}

#[test]
fn out_of_order_timestamps_are_rejected() {
    let input = vec![
        (at(2), Observation::Unsafe),
        (at(1), Observation::Unsafe),
    ];
    let error = aggregate_category(Category::Violence, input).unwrap_err();
    assert!(matches!(
        error,
        ScreeningError::UnorderedTimestamps { previous, current }
            if previous == at(2) && current == at(1)
    ));
}

#[test]
fn duplicate_timestamps_are_rejected() {
    let input = vec![(at(1), Observation::Safe), (at(1), Observation::Safe)];
    assert!(aggregate_category(Category::Hate, input).is_err());
}

// ── Properties ─────────────────────────────────────────────────────

#[test]
fn ranges_are_ordered_and_disjoint() {
    let ranges =
        aggregate_category(Category::Violence, observations("UU.U?UUU..U.")).unwrap();

    for range in &ranges {
        assert!(range.start <= range.end);
    }
    for pair in ranges.windows(2) {
        assert!(pair[0].end < pair[1].start);
    }
}

#[test]
fn ranges_are_maximal() {
    let pattern = "UU.U?UUU..U.";
    let input = observations(pattern);
    let ranges = aggregate_category(Category::Violence, input.clone()).unwrap();

    // Every unsafe frame is covered, and no range could grow by one frame.
    for (timestamp, observation) in &input {
        let covered = ranges
            .iter()
            .any(|range| range.start <= *timestamp && *timestamp <= range.end);
        assert_eq!(covered, *observation == Observation::Unsafe, "{timestamp}");
    }
    for range in &ranges {
        let before = input.iter().rev().find(|(timestamp, _)| *timestamp < range.start);
        let after = input.iter().find(|(timestamp, _)| *timestamp > range.end);
        assert_ne!(before.map(|(_, observation)| *observation), Some(Observation::Unsafe));
        assert_ne!(after.map(|(_, observation)| *observation), Some(Observation::Unsafe));
    }
}

#[test]
fn aggregation_is_deterministic() {
    let verdicts = vec![
        FrameVerdict::classified(at(1), Classification::new().with_severity(Category::Hate, 2)),
        FrameVerdict::unavailable(at(2), "timeout"),
        FrameVerdict::classified(at(3), Classification::new().with_severity(Category::Hate, 4)),
    ];
    assert_eq!(aggregate(&verdicts).unwrap(), aggregate(&verdicts).unwrap());
}

#[test]
fn categories_are_aggregated_independently() {
    let violent = Classification::new().with_severity(Category::Violence, 4);
    let both = Classification::new()
        .with_severity(Category::Violence, 2)
        .with_severity(Category::Sexual, 6);

    let verdicts = vec![
        FrameVerdict::classified(at(1), violent.clone()),
        FrameVerdict::classified(at(2), both),
        FrameVerdict::classified(at(3), violent),
        FrameVerdict::classified(at(4), Classification::new()),
    ];

    let ranges = aggregate(&verdicts).unwrap();
    assert_eq!(
        rendered(ranges.get(Category::Violence)),
        ["00-00-01.00 -> 00-00-03.00: Violence"]
    );
    assert_eq!(rendered(ranges.get(Category::Sexual)), ["00-00-02.00: Sexual"]);
    assert!(ranges.get(Category::Hate).is_empty());
    assert!(ranges.get(Category::SelfHarm).is_empty());
    assert_eq!(ranges.len(), 2);
}

#[test]
fn report_order_follows_category_order() {
    let ranges = aggregate(&[]).unwrap();
    let order: Vec<Category> = ranges.iter().map(|(category, _)| category).collect();
    assert_eq!(order, Category::ALL);
}

#[test]
fn subsecond_timestamps_render_hundredths() {
    let input = vec![
        (FrameTimestamp::from_secs_f64(0.5), Observation::Unsafe),
        (FrameTimestamp::from_secs_f64(1.0), Observation::Unsafe),
    ];
    let ranges = aggregate_category(Category::Violence, input).unwrap();
    assert_eq!(rendered(&ranges), ["00-00-00.50 -> 00-00-01.00: Violence"]);
}
