use super::*;

fn strip(s: &str) -> String {
    // Drops ANSI color sequences.
    let mut out = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            for c in chars.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[test]
fn test_format_duration_ms() {
    assert_eq!(format_duration_ms(250), "250ms");
    assert_eq!(format_duration_ms(1_500), "1.50s");
    assert_eq!(format_duration_ms(125_000), "2m 5s");
}

#[test]
fn test_format_score_keeps_text() {
    assert_eq!(strip(&format_score("0violation/12dislikes")), "0violation/12dislikes");
    assert_eq!(strip(&format_score("N/A")), "N/A");
    assert_eq!(strip(&format_score("plain")), "plain");
}

#[test]
fn test_unknown_events_are_silent() {
    let visitor = EventVisitor {
        event: Some("state_missing".to_string()),
        ..EventVisitor::default()
    };
    assert!(format_event(&visitor, Level::INFO).is_empty());
}

#[test]
fn test_step_only_at_trace() {
    let visitor = EventVisitor {
        event: Some("step".to_string()),
        step: Some(3),
        ..EventVisitor::default()
    };
    assert!(format_event(&visitor, Level::DEBUG).is_empty());
    assert!(strip(&format_event(&visitor, Level::TRACE)).contains("Step"));
}

#[test]
fn test_puzzle_state_line() {
    let visitor = EventVisitor {
        event: Some("puzzle_state".to_string()),
        puzzle: Some("#7".to_string()),
        from: Some("SOLVED".to_string()),
        to: Some("SUBMITTED".to_string()),
        ..EventVisitor::default()
    };
    let line = strip(&format_event(&visitor, Level::INFO));
    assert!(line.contains("Puzzle #7"));
    assert!(line.contains("SOLVED → SUBMITTED"));
}

#[test]
fn test_init_is_idempotent() {
    init_quiet(LevelFilter::OFF);
    init_quiet(LevelFilter::OFF);
    init();
}
