//! Message formatter - renders commits as chat lines
//!
//! Pure functions only. A line never exceeds the configured byte bound,
//! so the transport can frame it without cutting it again.

use crate::core::models::Commit;

/// Default byte bound for one rendered line
///
/// Leaves room for `PRIVMSG <channel> :` framing and the prefix servers
/// prepend when relaying, inside IRC's 512-byte limit.
pub const DEFAULT_MAX_LINE_BYTES: usize = 400;

const COLOR_HASH: &str = "\x0307";
const COLOR_AUTHOR: &str = "\x0303";
const RESET: &str = "\x0f";
const ELLIPSIS: char = '\u{2026}';

/// Renders commits of one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFormatter {
    repo: String,
    max_line_bytes: usize,
    colors: bool,
    link_template: Option<String>,
}

impl MessageFormatter {
    /// Formatter for `repo` with colors on and the default bound
    #[must_use]
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            colors: true,
            link_template: None,
        }
    }

    /// Set the byte bound for rendered lines
    #[must_use]
    pub const fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    /// Enable or disable mIRC color codes
    #[must_use]
    pub const fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    /// Append a link built from `template` (`{hash}` and `{short}` are replaced)
    #[must_use]
    pub fn with_link_template(mut self, template: Option<String>) -> Self {
        self.link_template = template;
        self
    }

    /// The byte bound lines are held to
    #[must_use]
    pub const fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    /// Render one commit as a single line
    ///
    /// `[repo] <short hash> <subject> [<author>] <link>`; the subject is
    /// shortened with an ellipsis when the line would exceed the bound.
    #[must_use]
    pub fn format(&self, commit: &Commit) -> String {
        let short = commit.reference.short();
        let author = sanitize(&commit.author);
        let subject = sanitize(&commit.subject);
        let subject = if subject.trim().is_empty() {
            "(no message)".to_string()
        } else {
            subject
        };

        let (hash, author) = if self.colors {
            (format!("{COLOR_HASH}{short}{RESET}"), format!("{COLOR_AUTHOR}[{author}]{RESET}"))
        } else {
            (short.to_string(), format!("[{author}]"))
        };

        let head = format!("[{}] {hash} ", sanitize(&self.repo));
        let mut tail = format!(" {author}");
        if let Some(template) = &self.link_template {
            tail.push(' ');
            tail.push_str(
                &template
                    .replace("{hash}", commit.reference.as_str())
                    .replace("{short}", short),
            );
        }

        let budget = self.max_line_bytes.saturating_sub(head.len() + tail.len());
        let line = format!("{head}{}{tail}", shorten(&subject, budget));
        truncate_to_bytes(&line, self.max_line_bytes).to_string()
    }

    /// Render the line announcing a batch of `count` commits
    #[must_use]
    pub fn format_batch_header(&self, count: usize) -> String {
        let noun = if count == 1 { "commit" } else { "commits" };
        let line = format!("{} ({count} new {noun})", sanitize(&self.repo));
        truncate_to_bytes(&line, self.max_line_bytes).to_string()
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char
#[must_use]
pub fn truncate_to_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Fit `s` into `budget` bytes, marking a cut with an ellipsis
fn shorten(s: &str, budget: usize) -> String {
    if s.len() <= budget {
        return s.to_string();
    }
    let room = budget.saturating_sub(ELLIPSIS.len_utf8());
    if room == 0 {
        return String::new();
    }
    let mut out = truncate_to_bytes(s, room).trim_end().to_string();
    out.push(ELLIPSIS);
    out
}

/// Replace control characters so user text cannot break or recolor a line
fn sanitize(s: &str) -> String {
    s.chars().map(|c| if c.is_control() { ' ' } else { c }).collect()
}
