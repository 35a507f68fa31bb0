//! IRC line codec
//!
//! Parses server lines into [`Message`]s and frames outgoing commands
//! within the 512-byte line limit of RFC 2812.

use crate::core::services::truncate_to_bytes;

/// Maximum length of one IRC line, CRLF included
pub const MAX_LINE_BYTES: usize = 512;

/// A parsed IRC line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Source of the message, without the leading `:`
    pub prefix: Option<String>,
    /// Command or three-digit numeric, upper-cased
    pub command: String,
    /// Parameters; a trailing parameter is the last element
    pub params: Vec<String>,
}

impl Message {
    /// Parse one line, with or without its line ending
    ///
    /// Returns `None` for empty lines. IRCv3 message tags are skipped.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        if rest.starts_with('@') {
            rest = rest.split_once(' ').map_or("", |(_, r)| r);
        }
        rest = rest.trim_start_matches(' ');

        let prefix = if let Some(stripped) = rest.strip_prefix(':') {
            let (prefix, r) = stripped.split_once(' ').unwrap_or((stripped, ""));
            rest = r.trim_start_matches(' ');
            Some(prefix.to_string())
        } else {
            None
        };

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            let (param, r) = rest.split_once(' ').unwrap_or((rest, ""));
            params.push(param.to_string());
            rest = r;
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Numeric reply code, if the command is one
    #[must_use]
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Parameter at `index`, or an empty string
    #[must_use]
    pub fn param(&self, index: usize) -> &str {
        self.params.get(index).map_or("", String::as_str)
    }

    /// The last parameter, usually the human-readable text
    #[must_use]
    pub fn trailing(&self) -> &str {
        self.params.last().map_or("", String::as_str)
    }
}

/// Frame a `PRIVMSG`, cutting the text so the line fits the limit
///
/// Line breaks in `text` become spaces; one line in, one line out.
#[must_use]
pub fn frame_privmsg(channel: &str, text: &str) -> String {
    let overhead = "PRIVMSG ".len() + channel.len() + " :".len() + "\r\n".len();
    let text = text.replace(['\r', '\n'], " ");
    let text = truncate_to_bytes(&text, MAX_LINE_BYTES.saturating_sub(overhead));
    format!("PRIVMSG {channel} :{text}\r\n")
}

/// Frame a command whose last parameter may contain spaces
#[must_use]
pub fn frame(command: &str, params: &[&str], trailing: Option<&str>) -> String {
    let mut line = String::from(command);
    for param in params {
        line.push(' ');
        line.push_str(param);
    }
    if let Some(trailing) = trailing {
        line.push_str(" :");
        line.push_str(&trailing.replace(['\r', '\n'], " "));
    }
    let mut line = truncate_to_bytes(&line, MAX_LINE_BYTES - 2).to_string();
    line.push_str("\r\n");
    line
}
