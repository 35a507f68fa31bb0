//! Tests for the chat line formatter

use chrono::Utc;
use combotcha::core::models::Commit;
use combotcha::core::services::{DEFAULT_MAX_LINE_BYTES, MessageFormatter, truncate_to_bytes};

use crate::common::fixtures::{commit, sha};

#[test]
fn test_colored_line_layout() {
    let line = MessageFormatter::new("engine").format(&commit(2));
    assert_eq!(
        line,
        format!("[engine] \x0307{}\x0f Change number 2 \x0303[Ada Lovelace]\x0f", &sha(2)[..8])
    );
}

#[test]
fn test_plain_line_with_link() {
    let formatter = MessageFormatter::new("engine")
        .with_colors(false)
        .with_link_template(Some("https://git.example/engine/commit/{hash}".to_string()));
    let line = formatter.format(&commit(2));
    assert!(line.ends_with(&format!("[Ada Lovelace] https://git.example/engine/commit/{}", sha(2))));
}

#[test]
fn test_short_link_placeholder() {
    let formatter = MessageFormatter::new("engine")
        .with_colors(false)
        .with_link_template(Some("https://c.example/{short}".to_string()));
    assert!(formatter.format(&commit(3)).ends_with(&format!("https://c.example/{}", &sha(3)[..8])));
}

#[test]
fn test_long_subject_is_shortened_not_author() {
    let long = Commit::new(sha(1), "Grace", Utc::now(), &"refactor ".repeat(100));
    let formatter = MessageFormatter::new("engine").with_colors(false).with_max_line_bytes(120);
    let line = formatter.format(&long);

    assert!(line.len() <= 120);
    assert!(line.ends_with("\u{2026} [Grace]"));
    assert!(line.starts_with("[engine] "));
}

#[test]
fn test_multibyte_subject_stays_valid() {
    let long = Commit::new(sha(1), "Zoë", Utc::now(), &"日本語のコミット".repeat(40));
    let formatter = MessageFormatter::new("engine").with_max_line_bytes(100);
    let line = formatter.format(&long);
    assert!(line.len() <= 100);
    assert!(line.contains("[Zoë]"));
}

#[test]
fn test_empty_subject_placeholder() {
    let c = Commit::new(sha(1), "Ada", Utc::now(), "");
    let line = MessageFormatter::new("engine").with_colors(false).format(&c);
    assert!(line.contains("(no message)"));
}

#[test]
fn test_control_characters_removed() {
    let c = Commit::new(sha(1), "Ada\r\nQUIT", Utc::now(), "evil\x01subject");
    let line = MessageFormatter::new("engine").with_colors(false).format(&c);
    assert!(!line.contains(['\r', '\n', '\x01']));
}

#[test]
fn test_batch_header() {
    let formatter = MessageFormatter::new("engine");
    assert_eq!(formatter.format_batch_header(1), "engine (1 new commit)");
    assert_eq!(formatter.format_batch_header(3), "engine (3 new commits)");
}

#[test]
fn test_default_bound() {
    assert_eq!(MessageFormatter::new("x").max_line_bytes(), DEFAULT_MAX_LINE_BYTES);
}

#[test]
fn test_truncate_to_bytes_on_char_boundary() {
    assert_eq!(truncate_to_bytes("héllo", 2), "h");
    assert_eq!(truncate_to_bytes("héllo", 3), "hé");
    assert_eq!(truncate_to_bytes("short", 10), "short");
}
