//! UI boundary: command parsing and the metrics overlay

use iris::stats::FrameMetrics;
use iris::ui::{overlay_text, UiCommand};
use iris::FilterKind;

#[test]
fn test_text_commands() {
    assert_eq!(
        "Sepia".parse::<UiCommand>().unwrap(),
        UiCommand::SelectFilter(FilterKind::Sepia)
    );
    assert_eq!(
        "grey".parse::<UiCommand>().unwrap(),
        UiCommand::SelectFilter(FilterKind::Gray)
    );
    assert_eq!("metrics".parse::<UiCommand>().unwrap(), UiCommand::ToggleMetrics);
    assert_eq!("quit".parse::<UiCommand>().unwrap(), UiCommand::Quit);

    let err = "vivid".parse::<UiCommand>().unwrap_err();
    assert!(err.to_string().contains("vivid"));
}

#[test]
fn test_overlay_before_any_frame() {
    let text = overlay_text(FilterKind::Normal, &FrameMetrics::default());
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(
        lines,
        [
            "Filter: Normal",
            "Frame: 0.00 ms (~0 FPS)",
            "Avg: 0.00 ms (~0 FPS)",
            "Min: 0.00 ms (~0 FPS)",
            "Max: 0.00 ms (~0 FPS)",
        ]
    );
}

#[test]
fn test_overlay_with_frames() {
    let mut metrics = FrameMetrics::default();
    metrics.record(10.0);
    metrics.record(20.0);

    let text = overlay_text(FilterKind::Gray, &metrics);
    assert!(text.starts_with("Filter: Gray\n"));
    assert!(text.contains("Frame: 20.00 ms (~50 FPS)"));
    assert!(text.contains("Avg: 15.00 ms (~67 FPS)"));
    assert!(text.contains("Min: 10.00 ms (~100 FPS)"));
    assert!(text.contains("Max: 20.00 ms (~50 FPS)"));
}
