//! Report rendering tests.

use std::{path::PathBuf, time::Duration};

use framescreen::{
    Category, Classification, FrameTimestamp, FrameVerdict, ReportFormat, ScreeningReport,
    aggregate, report,
};

fn at(seconds: u64) -> FrameTimestamp {
    FrameTimestamp::new(Duration::from_secs(seconds))
}

fn sample_report() -> ScreeningReport {
    let frames = vec![
        FrameVerdict::classified(at(1), Classification::new()),
        FrameVerdict::classified(
            at(2),
            Classification::new()
                .with_severity(Category::Violence, 4)
                .with_severity(Category::Hate, 2),
        ),
        FrameVerdict::classified(at(3), Classification::new().with_severity(Category::Violence, 2)),
        FrameVerdict::unavailable(at(4), "Rate limited by the moderation service"),
    ];

    ScreeningReport {
        video: PathBuf::from("clip.mp4"),
        samples_per_second: 1.0,
        ranges: aggregate(&frames).unwrap(),
        frames,
    }
}

#[test]
fn ranges_layout_lists_every_category() {
    let rendered = report::render(&sample_report(), ReportFormat::Ranges).unwrap();
    let expected = "\
Violence
00-00-02.00 -> 00-00-03.00: Violence

SelfHarm

Sexual

Hate
00-00-02.00: Hate

";
    assert_eq!(rendered, expected);
}

#[test]
fn frames_layout_lists_unsafe_and_unavailable_frames() {
    let rendered = report::render(&sample_report(), ReportFormat::Frames).unwrap();
    let expected = "\
00-00-02.00 Violence: 4
00-00-03.00 Violence: 2
00-00-04.00 unavailable: Rate limited by the moderation service
";
    assert_eq!(rendered, expected);
}

#[test]
fn json_layout_is_machine_readable() {
    let rendered = report::render(&sample_report(), ReportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

    assert_eq!(value["video"], "clip.mp4");
    assert_eq!(value["ranges"]["Violence"][0]["start"], "00-00-02.00");
    assert_eq!(value["ranges"]["Violence"][0]["end"], "00-00-03.00");
    assert_eq!(value["ranges"]["Sexual"].as_array().map(Vec::len), Some(0));
    assert_eq!(value["frames"][3]["outcome"]["status"], "unavailable");
}

#[test]
fn counts_summarise_frames() {
    let report = sample_report();
    assert_eq!(report.unsafe_frame_count(), 2);
    assert_eq!(report.unavailable_count(), 1);
}

#[test]
fn save_writes_rendered_report() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = directory.path().join(ReportFormat::Ranges.default_file_name());

    let report = sample_report();
    report::save(&path, &report, ReportFormat::Ranges).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, report::render_ranges(&report.ranges));
    assert!(path.ends_with("Unsafe Ranges.txt"));
}

#[test]
fn format_names_parse() {
    assert_eq!("ranges".parse::<ReportFormat>(), Ok(ReportFormat::Ranges));
    assert_eq!("Frames".parse::<ReportFormat>(), Ok(ReportFormat::Frames));
    assert_eq!("json".parse::<ReportFormat>(), Ok(ReportFormat::Json));
    assert!("xml".parse::<ReportFormat>().is_err());
    assert_eq!(ReportFormat::default(), ReportFormat::Ranges);
}
